mod defaults;
mod prompts;


pub use prompts::load_system_prompt;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::KanaError;
use defaults::*;

/// Top-level Kana configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub kana: KanaConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub voicevox: VoicevoxConfig,
    #[serde(default)]
    pub switchbot: SwitchBotConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanaConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for KanaConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Generative-language backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key. Empty here means "take it from GEMINI_API_KEY".
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Most recent N turns sent with each model call.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            max_history: default_max_history(),
        }
    }
}

/// Persona / system prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Path to the persona prompt file. Falls back to the built-in persona
    /// when the file does not exist.
    #[serde(default = "default_prompt_path")]
    pub prompt_path: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            prompt_path: default_prompt_path(),
        }
    }
}

/// VOICEVOX speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicevoxConfig {
    #[serde(default = "default_voicevox_url")]
    pub url: String,
    #[serde(default = "default_speaker")]
    pub speaker: u32,
    #[serde(default = "default_speed_scale")]
    pub speed_scale: f64,
}

impl Default for VoicevoxConfig {
    fn default() -> Self {
        Self {
            url: default_voicevox_url(),
            speaker: default_speaker(),
            speed_scale: default_speed_scale(),
        }
    }
}

/// SwitchBot device-cloud settings. Empty token/secret disables the handler's
/// live calls (it then declines and the model answers instead).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SwitchBotConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub secret: String,
    /// Device id of the temperature/humidity/CO2 meter.
    #[serde(default)]
    pub meter: String,
    #[serde(default)]
    pub light: String,
    #[serde(default)]
    pub tv: String,
    #[serde(default)]
    pub monitor: String,
    #[serde(default)]
    pub plug: String,
}

/// Google Calendar settings. Empty access token means "not configured" —
/// the handler answers with an explicit not-configured message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            calendar_id: default_calendar_id(),
        }
    }
}

/// Local CLI tool settings (git, gh, claude).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Repository queried by the repository-status handler. Empty = none.
    #[serde(default)]
    pub repo_path: String,
    /// Timeout for the code-assistant CLI.
    #[serde(default = "default_code_timeout")]
    pub code_timeout_secs: u64,
    /// Timeout for short git/gh queries.
    #[serde(default = "default_cli_timeout")]
    pub cli_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            repo_path: String::new(),
            code_timeout_secs: default_code_timeout(),
            cli_timeout_secs: default_cli_timeout(),
        }
    }
}

/// Durable conversation log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. Secrets can be
/// supplied via environment variables instead of the file.
pub fn load(path: &str) -> Result<Config, KanaError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KanaError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| KanaError::Config(format!("failed to parse config: {e}")))?
    } else {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Fill secret fields from the environment when the file left them empty.
fn apply_env_overrides(config: &mut Config) {
    let overrides: [(&str, &mut String); 4] = [
        ("GEMINI_API_KEY", &mut config.gemini.api_key),
        ("SWITCHBOT_TOKEN", &mut config.switchbot.token),
        ("SWITCHBOT_SECRET", &mut config.switchbot.secret),
        ("GOOGLE_CALENDAR_TOKEN", &mut config.calendar.access_token),
    ];
    for (var, slot) in overrides {
        if slot.is_empty() {
            if let Ok(value) = std::env::var(var) {
                *slot = value;
            }
        }
    }
}
