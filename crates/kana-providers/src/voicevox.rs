//! VOICEVOX speech synthesis client.
//!
//! Two-step flow: `audio_query` builds the synthesis query from text, the
//! speaking rate is patched in, then `synthesis` renders audio bytes.
//! Failures never abort a chat response — the caller just omits audio.

use kana_core::{config::VoicevoxConfig, error::KanaError};
use tracing::debug;

#[derive(Clone)]
pub struct VoicevoxClient {
    client: reqwest::Client,
    base_url: String,
    speaker: u32,
    speed_scale: f64,
}

impl VoicevoxClient {
    pub fn from_config(config: &VoicevoxConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            speaker: config.speaker,
            speed_scale: config.speed_scale,
        }
    }

    /// Synthesize speech for `text`, returning raw audio bytes (WAV).
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, KanaError> {
        let query_url = format!(
            "{}/audio_query?text={}&speaker={}",
            self.base_url,
            urlencoding::encode(text),
            self.speaker
        );

        let resp = self
            .client
            .post(&query_url)
            .send()
            .await
            .map_err(|e| KanaError::Integration(format!("voicevox audio_query failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(KanaError::Integration(format!(
                "voicevox audio_query returned {}",
                resp.status()
            )));
        }

        let mut query: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| KanaError::Integration(format!("voicevox: bad query json: {e}")))?;

        query["speedScale"] = serde_json::json!(self.speed_scale);

        let synth_url = format!("{}/synthesis?speaker={}", self.base_url, self.speaker);
        let resp = self
            .client
            .post(&synth_url)
            .json(&query)
            .send()
            .await
            .map_err(|e| KanaError::Integration(format!("voicevox synthesis failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(KanaError::Integration(format!(
                "voicevox synthesis returned {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| KanaError::Integration(format!("voicevox: failed to read audio: {e}")))?;

        debug!("voicevox: synthesized {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    /// Probe the engine's version endpoint.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kana_core::config::VoicevoxConfig;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = VoicevoxClient::from_config(&VoicevoxConfig {
            url: "http://localhost:50021/".into(),
            speaker: 8,
            speed_scale: 1.2,
        });
        assert_eq!(client.base_url, "http://localhost:50021");
    }

    #[test]
    fn test_speed_scale_patched_into_query() {
        let mut query = serde_json::json!({"accent_phrases": [], "speedScale": 1.0});
        query["speedScale"] = serde_json::json!(1.2);
        assert_eq!(query["speedScale"], serde_json::json!(1.2));
    }
}
