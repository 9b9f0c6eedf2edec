//! Date-scoped calendar lookup against the Google Calendar events API,
//! with special-casing for celebratory entries.

use crate::{contains_any, Handler};
use async_trait::async_trait;
use chrono::{Days, Local, NaiveTime, TimeZone};
use kana_core::{config::CalendarConfig, error::KanaError, outcome::Outcome};
use serde::Deserialize;
use tracing::warn;

const CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

const TRIGGER_KW: &[&str] = &["予定", "カレンダー", "スケジュール"];
const CELEBRATE_KW: &[&str] = &["誕生日", "記念日"];

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime", default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

pub struct CalendarHandler {
    client: reqwest::Client,
    config: CalendarConfig,
}

impl CalendarHandler {
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    async fn fetch_events(&self, time_min: &str, time_max: &str) -> Result<Vec<Event>, KanaError> {
        let url = format!(
            "{CALENDAR_BASE_URL}/calendars/{}/events",
            self.config.calendar_id
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .map_err(|e| KanaError::Integration(format!("calendar request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(KanaError::Integration(format!(
                "calendar returned {}",
                resp.status()
            )));
        }

        let parsed: EventsResponse = resp
            .json()
            .await
            .map_err(|e| KanaError::Integration(format!("calendar: bad response: {e}")))?;
        Ok(parsed.items)
    }
}

#[async_trait]
impl Handler for CalendarHandler {
    fn name(&self) -> &str {
        "calendar"
    }

    fn detect(&self, text: &str) -> bool {
        contains_any(text, TRIGGER_KW)
    }

    /// Always produces an Outcome — including an explicit "not configured"
    /// answer when the integration is unavailable.
    async fn execute(&self, text: &str) -> Result<Option<Outcome>, KanaError> {
        if self.config.access_token.is_empty() {
            return Ok(Some(Outcome::text(
                "カレンダーはまだ設定されていないみたいです…",
            )));
        }

        let tomorrow = text.contains("明日");
        let label = if tomorrow { "明日" } else { "今日" };

        let day = if tomorrow {
            Local::now().date_naive() + Days::new(1)
        } else {
            Local::now().date_naive()
        };
        let Some(start) = Local
            .from_local_datetime(&day.and_time(NaiveTime::MIN))
            .earliest()
        else {
            return Ok(Some(Outcome::text("予定が確認できなかったです…")));
        };
        let end = start + chrono::Duration::days(1);

        Ok(Some(
            match self
                .fetch_events(&start.to_rfc3339(), &end.to_rfc3339())
                .await
            {
                Ok(events) => events_outcome(&events, label),
                Err(e) => {
                    warn!("calendar query failed: {e}");
                    Outcome::text("予定が確認できなかったです…")
                }
            },
        ))
    }
}

fn events_outcome(events: &[Event], label: &str) -> Outcome {
    if events.is_empty() {
        return Outcome::text(format!("{label}の予定は何もないですよ！"));
    }

    let lines: Vec<String> = events
        .iter()
        .map(|e| {
            let summary = e.summary.as_deref().unwrap_or("(無題)");
            format!("・{} {summary}", start_label(e))
        })
        .collect();

    let first = events[0].summary.as_deref().unwrap_or("(無題)");
    let mut display = format!("{label}の予定:\n{}", lines.join("\n"));
    let mut speak = format!(
        "{label}の予定は{}件ですよ！最初は{first}です！",
        events.len()
    );

    // Birthdays and anniversaries get a celebratory nudge.
    let celebratory = events.iter().any(|e| {
        e.summary
            .as_deref()
            .map(|s| contains_any(s, CELEBRATE_KW))
            .unwrap_or(false)
    });
    if celebratory {
        display.push_str(" 🎉");
        speak.push_str("おめでとうございます！");
    }

    Outcome::new(display, speak)
}

/// Human label for an event start: clock time, or 終日 for all-day events.
fn start_label(event: &Event) -> String {
    match &event.start {
        Some(EventTime {
            date_time: Some(dt), ..
        }) => chrono::DateTime::parse_from_rfc3339(dt)
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|_| dt.clone()),
        Some(EventTime { date: Some(_), .. }) => "終日".to_string(),
        _ => "時刻不明".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(summary: &str, date_time: Option<&str>, date: Option<&str>) -> Event {
        Event {
            summary: Some(summary.to_string()),
            start: Some(EventTime {
                date_time: date_time.map(String::from),
                date: date.map(String::from),
            }),
        }
    }

    #[test]
    fn test_detects_calendar_queries() {
        let h = CalendarHandler::from_config(&CalendarConfig::default());
        assert!(h.detect("明日の予定ある？"));
        assert!(h.detect("カレンダー見せて"));
        assert!(!h.detect("今何時？"));
    }

    #[tokio::test]
    async fn test_not_configured_is_explicit_outcome() {
        let h = CalendarHandler::from_config(&CalendarConfig::default());
        let outcome = h.execute("今日の予定は？").await.unwrap().unwrap();
        assert_eq!(outcome.display, "カレンダーはまだ設定されていないみたいです…");
    }

    #[test]
    fn test_empty_day() {
        let outcome = events_outcome(&[], "今日");
        assert_eq!(outcome.display, "今日の予定は何もないですよ！");
    }

    #[test]
    fn test_events_listing_orders_and_counts() {
        let events = vec![
            event("打ち合わせ", Some("2026-08-30T10:00:00+09:00"), None),
            event("買い物", None, Some("2026-08-30")),
        ];
        let outcome = events_outcome(&events, "今日");
        assert!(outcome.display.contains("・10:00 打ち合わせ"));
        assert!(outcome.display.contains("・終日 買い物"));
        assert!(outcome.speak.contains("2件"));
        assert!(outcome.speak.contains("打ち合わせ"));
    }

    #[test]
    fn test_celebratory_event_gets_flourish() {
        let events = vec![event("母の誕生日", None, Some("2026-08-30"))];
        let outcome = events_outcome(&events, "今日");
        assert!(outcome.display.ends_with("🎉"));
        assert!(outcome.speak.ends_with("おめでとうございます！"));
    }

    #[test]
    fn test_events_response_parses() {
        let json = r#"{"items":[{"summary":"会議","start":{"dateTime":"2026-08-30T09:00:00+09:00"}}]}"#;
        let resp: EventsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0].summary.as_deref(), Some("会議"));
    }
}
