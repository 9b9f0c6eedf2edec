//! SwitchBot device cloud client — HMAC-SHA256 request signing, device
//! status queries, and command execution.
//!
//! Each request carries a millisecond timestamp, a fresh uuid nonce, and a
//! base64 HMAC over token+timestamp+nonce. The API reports success with
//! `statusCode == 100` inside a 200 response.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use kana_core::{config::SwitchBotConfig, error::KanaError};
use serde::Deserialize;
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SWITCHBOT_BASE_URL: &str = "https://api.switch-bot.com/v1.1";

/// Success value of the API's embedded `statusCode`.
const STATUS_OK: i64 = 100;

#[derive(Clone)]
pub struct SwitchBotClient {
    client: reqwest::Client,
    token: String,
    secret: String,
}

/// Meter reading (temperature/humidity, CO2 on supported devices).
#[derive(Debug, Clone, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "CO2", default)]
    pub co2: Option<f64>,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(rename = "statusCode")]
    status_code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    body: Option<serde_json::Value>,
}

impl SwitchBotClient {
    /// Create from config. Returns `None` when credentials are absent so the
    /// device handler can decline instead of issuing unsigned calls.
    pub fn from_config(config: &SwitchBotConfig) -> Option<Self> {
        if config.token.is_empty() || config.secret.is_empty() {
            return None;
        }
        Some(Self {
            client: reqwest::Client::new(),
            token: config.token.clone(),
            secret: config.secret.clone(),
        })
    }

    /// Sign token+timestamp+nonce with HMAC-SHA256, base64-encoded.
    fn sign(&self, t: &str, nonce: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(format!("{}{t}{nonce}", self.token).as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    async fn call(
        &self,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, KanaError> {
        let t = chrono::Utc::now().timestamp_millis().to_string();
        let nonce = Uuid::new_v4().to_string();
        let sign = self.sign(&t, &nonce);

        let url = format!("{SWITCHBOT_BASE_URL}/{endpoint}");
        let mut req = self
            .client
            .request(
                if body.is_some() {
                    reqwest::Method::POST
                } else {
                    reqwest::Method::GET
                },
                &url,
            )
            .header("Authorization", &self.token)
            .header("sign", sign)
            .header("t", t)
            .header("nonce", nonce);

        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| KanaError::Integration(format!("switchbot request failed: {e}")))?;

        let parsed: ApiResponse = resp
            .json()
            .await
            .map_err(|e| KanaError::Integration(format!("switchbot: bad response: {e}")))?;

        if parsed.status_code != STATUS_OK {
            return Err(KanaError::Integration(format!(
                "switchbot returned statusCode {}: {}",
                parsed.status_code,
                parsed.message.as_deref().unwrap_or("")
            )));
        }

        Ok(parsed)
    }

    /// Read the meter device (temperature, humidity, CO2 where present).
    pub async fn sensor_reading(&self, device_id: &str) -> Result<SensorReading, KanaError> {
        let resp = self.call(&format!("devices/{device_id}/status"), None).await?;
        let body = resp
            .body
            .ok_or_else(|| KanaError::Integration("switchbot: empty status body".into()))?;
        serde_json::from_value(body)
            .map_err(|e| KanaError::Integration(format!("switchbot: bad meter status: {e}")))
    }

    /// Issue a live command to a device. Not idempotent — each call is a
    /// real on/off press.
    pub async fn send_command(&self, device_id: &str, command: &str) -> Result<(), KanaError> {
        info!("switchbot: sending {command} to {device_id}");
        self.call(
            &format!("devices/{device_id}/commands"),
            Some(serde_json::json!({
                "command": command,
                "parameter": "default",
                "commandType": "command",
            })),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> SwitchBotClient {
        SwitchBotClient::from_config(&SwitchBotConfig {
            token: "tok".into(),
            secret: "sec".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_missing_credentials_yields_none() {
        assert!(SwitchBotClient::from_config(&SwitchBotConfig::default()).is_none());
    }

    #[test]
    fn test_signature_is_deterministic() {
        let client = test_client();
        let a = client.sign("1700000000000", "nonce-1");
        let b = client.sign("1700000000000", "nonce-1");
        assert_eq!(a, b);
        let c = client.sign("1700000000000", "nonce-2");
        assert_ne!(a, c, "different nonce must change the signature");
    }

    #[test]
    fn test_meter_status_parses_with_and_without_co2() {
        let with: SensorReading =
            serde_json::from_value(serde_json::json!({
                "temperature": 25.5, "humidity": 48.0, "CO2": 612.0
            }))
            .unwrap();
        assert_eq!(with.co2, Some(612.0));

        let without: SensorReading =
            serde_json::from_value(serde_json::json!({
                "temperature": 22.0, "humidity": 55.0
            }))
            .unwrap();
        assert!(without.co2.is_none());
    }

    #[test]
    fn test_api_response_status_check() {
        let ok: ApiResponse =
            serde_json::from_str(r#"{"statusCode":100,"body":{},"message":"success"}"#).unwrap();
        assert_eq!(ok.status_code, STATUS_OK);
        let err: ApiResponse =
            serde_json::from_str(r#"{"statusCode":190,"message":"device offline"}"#).unwrap();
        assert_ne!(err.status_code, STATUS_OK);
    }
}
