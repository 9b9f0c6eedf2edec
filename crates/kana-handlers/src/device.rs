//! Smart-home control via the SwitchBot cloud: sensor readings and on/off
//! commands keyed by per-category keyword sets.
//!
//! A device mention without an on/off verb returns `None` so the model can
//! answer instead. Cloud failures never propagate — they become an
//! apologetic Outcome.

use crate::{contains_any, Handler};
use async_trait::async_trait;
use kana_core::{config::SwitchBotConfig, error::KanaError, outcome::Outcome};
use kana_providers::switchbot::{SensorReading, SwitchBotClient};
use tracing::warn;

/// Full trigger set for detection. Overlaps with other handlers' sets
/// (e.g. 消して) — priority order in the pipeline resolves that.
const TRIGGER_KW: &[&str] = &[
    "電気", "照明", "ライト", "灯り",
    "テレビ", "TV", "モニタ",
    "PC電源", "パソコン",
    "温度", "湿度", "室温", "CO2", "二酸化炭素",
    "つけて", "消して", "オン", "オフ",
];

const SENSOR_KW: &[&str] = &["温度", "湿度", "室温", "CO2", "二酸化炭素", "何度"];
const ON_KW: &[&str] = &["つけて", "オン"];
const OFF_KW: &[&str] = &["消して", "オフ"];

/// One controllable device category: name keywords plus its confirmations.
struct Category {
    keywords: &'static [&'static str],
    device_id: String,
    on: (&'static str, &'static str),
    off: (&'static str, &'static str),
}

pub struct DeviceControlHandler {
    client: Option<SwitchBotClient>,
    meter_id: String,
    categories: Vec<Category>,
}

impl DeviceControlHandler {
    pub fn from_config(config: &SwitchBotConfig) -> Self {
        let categories = vec![
            Category {
                keywords: &["電気", "照明", "ライト", "灯り"],
                device_id: config.light.clone(),
                on: ("照明をつけました！", "はーい、つけましたよ！"),
                off: ("照明を消しました！", "はーい、消しましたよ！"),
            },
            Category {
                keywords: &["テレビ", "TV"],
                device_id: config.tv.clone(),
                on: ("テレビをつけました！", "はーい、テレビつけましたよ！"),
                off: ("テレビを消しました！", "はーい、テレビ消しましたよ！"),
            },
            Category {
                keywords: &["モニタ", "LG"],
                device_id: config.monitor.clone(),
                on: ("モニタをつけました！", "はーい、モニタつけましたよ！"),
                off: ("モニタを消しました！", "はーい、モニタ消しましたよ！"),
            },
            Category {
                keywords: &["PC電源", "パソコン"],
                device_id: config.plug.clone(),
                on: (
                    "PC電源をONにしました！",
                    "はーい、ピーシー電源オンにしましたよ！",
                ),
                off: (
                    "PC電源をOFFにしました！",
                    "はーい、ピーシー電源オフにしましたよ！",
                ),
            },
        ];

        Self {
            client: SwitchBotClient::from_config(config),
            meter_id: config.meter.clone(),
            categories,
        }
    }
}

#[async_trait]
impl Handler for DeviceControlHandler {
    fn name(&self) -> &str {
        "device-control"
    }

    fn detect(&self, text: &str) -> bool {
        contains_any(text, TRIGGER_KW)
    }

    async fn execute(&self, text: &str) -> Result<Option<Outcome>, KanaError> {
        let Some(client) = &self.client else {
            // Not configured — decline so the model can answer.
            return Ok(None);
        };

        // Sensor query first: 温度/湿度/CO2 questions never carry a verb.
        if contains_any(text, SENSOR_KW) && !self.meter_id.is_empty() {
            return Ok(Some(match client.sensor_reading(&self.meter_id).await {
                Ok(reading) => sensor_outcome(&reading),
                Err(e) => {
                    warn!("switchbot sensor query failed: {e}");
                    apology(&e)
                }
            }));
        }

        let Some(command) = desired_command(text) else {
            // Device mentioned, but neither on nor off — fall through.
            return Ok(None);
        };

        for category in &self.categories {
            if category.device_id.is_empty() || !contains_any(text, category.keywords) {
                continue;
            }
            let (display, speak) = if command == "turnOn" {
                category.on
            } else {
                category.off
            };
            // Live command — not idempotent, one real press per call.
            return Ok(Some(
                match client.send_command(&category.device_id, command).await {
                    Ok(()) => Outcome::new(display, speak),
                    Err(e) => {
                        warn!("switchbot command failed: {e}");
                        apology(&e)
                    }
                },
            ));
        }

        Ok(None)
    }
}

/// Map on/off verbs in the utterance to a SwitchBot command.
fn desired_command(text: &str) -> Option<&'static str> {
    if contains_any(text, ON_KW) {
        Some("turnOn")
    } else if contains_any(text, OFF_KW) {
        Some("turnOff")
    } else {
        None
    }
}

fn sensor_outcome(reading: &SensorReading) -> Outcome {
    let t = reading.temperature;
    let h = reading.humidity;
    match reading.co2 {
        Some(co2) => Outcome::new(
            format!("温度: {t}℃ / 湿度: {h}% / CO2: {co2}ppm"),
            format!("今{t}度で、湿度は{h}パーセント、CO2は{co2}ピーピーエムですね！"),
        ),
        None => Outcome::new(
            format!("温度: {t}℃ / 湿度: {h}%"),
            format!("今{t}度で、湿度は{h}パーセントですね！"),
        ),
    }
}

fn apology(e: &KanaError) -> Outcome {
    Outcome::new(
        format!("SwitchBotエラー: {e}"),
        "あれ、うまくいかなかったみたいです…",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured() -> DeviceControlHandler {
        DeviceControlHandler::from_config(&SwitchBotConfig::default())
    }

    #[test]
    fn test_detects_device_and_verb_keywords() {
        let h = unconfigured();
        assert!(h.detect("照明つけて"));
        assert!(h.detect("今の室温は？"));
        assert!(h.detect("テレビ消して"));
        assert!(!h.detect("今日の天気は？"));
    }

    #[test]
    fn test_desired_command_mapping() {
        assert_eq!(desired_command("電気つけて"), Some("turnOn"));
        assert_eq!(desired_command("電気をオンにして"), Some("turnOn"));
        assert_eq!(desired_command("電気消して"), Some("turnOff"));
        assert_eq!(desired_command("電気をオフに"), Some("turnOff"));
        assert_eq!(desired_command("電気どう？"), None);
    }

    #[tokio::test]
    async fn test_unconfigured_declines() {
        let h = unconfigured();
        assert!(h.execute("照明つけて").await.unwrap().is_none());
    }

    #[test]
    fn test_sensor_outcome_formats() {
        let outcome = sensor_outcome(&SensorReading {
            temperature: 25.5,
            humidity: 48.0,
            co2: Some(612.0),
        });
        assert_eq!(outcome.display, "温度: 25.5℃ / 湿度: 48% / CO2: 612ppm");
        assert!(outcome.speak.contains("ピーピーエム"));

        let no_co2 = sensor_outcome(&SensorReading {
            temperature: 22.0,
            humidity: 55.0,
            co2: None,
        });
        assert!(!no_co2.display.contains("CO2"));
    }
}
