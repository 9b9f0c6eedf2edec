//! Default values for config fields, referenced by serde attributes.

pub(super) fn default_name() -> String {
    "kana".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub(super) fn default_port() -> u16 {
    3000
}

pub(super) fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub(super) fn default_max_history() -> usize {
    20
}

pub(super) fn default_prompt_path() -> String {
    "prompts/persona.txt".to_string()
}

pub(super) fn default_voicevox_url() -> String {
    "http://localhost:50021".to_string()
}

// 春日部つむぎ
pub(super) fn default_speaker() -> u32 {
    8
}

pub(super) fn default_speed_scale() -> f64 {
    1.2
}

pub(super) fn default_calendar_id() -> String {
    "primary".to_string()
}

pub(super) fn default_code_timeout() -> u64 {
    120
}

pub(super) fn default_cli_timeout() -> u64 {
    10
}

pub(super) fn default_db_path() -> String {
    "~/.kana/data/conversations.db".to_string()
}
