//! Clock, calendar-date, and year queries answered from the system clock.
//! Highest-priority handler; never makes an external call.

use crate::{contains_any, Handler};
use async_trait::async_trait;
use chrono::{Datelike, Local, Timelike, Weekday};
use kana_core::{error::KanaError, outcome::Outcome};

const TIME_KW: &[&str] = &["何時", "時間教えて"];
const DATE_KW: &[&str] = &["何曜", "何日", "今日は何"];
const YEAR_KW: &[&str] = &["何年", "今年は"];

pub struct LocalFactsHandler;

#[async_trait]
impl Handler for LocalFactsHandler {
    fn name(&self) -> &str {
        "local-facts"
    }

    fn detect(&self, text: &str) -> bool {
        contains_any(text, TIME_KW) || contains_any(text, DATE_KW) || contains_any(text, YEAR_KW)
    }

    async fn execute(&self, text: &str) -> Result<Option<Outcome>, KanaError> {
        let now = Local::now();

        if contains_any(text, TIME_KW) {
            let hour = now.hour();
            let minute = now.minute();
            return Ok(Some(Outcome::new(
                format!("今は{hour}:{minute:02}ですよ！"),
                format!("今は{hour}時{minute}分ですよ！"),
            )));
        }

        if contains_any(text, DATE_KW) {
            let date = format!(
                "{}月{}日{}曜日",
                now.month(),
                now.day(),
                weekday_ja(now.weekday())
            );
            return Ok(Some(Outcome::text(format!("今日は{date}ですね！"))));
        }

        if contains_any(text, YEAR_KW) {
            return Ok(Some(Outcome::text(format!("{}年ですよ！", now.year()))));
        }

        Ok(None)
    }
}

fn weekday_ja(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "月",
        Weekday::Tue => "火",
        Weekday::Wed => "水",
        Weekday::Thu => "木",
        Weekday::Fri => "金",
        Weekday::Sat => "土",
        Weekday::Sun => "日",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_time_date_year_queries() {
        let h = LocalFactsHandler;
        assert!(h.detect("今何時？"));
        assert!(h.detect("時間教えて"));
        assert!(h.detect("今日は何曜日？"));
        assert!(h.detect("今日何日だっけ"));
        assert!(h.detect("今年は何年？"));
        assert!(!h.detect("電気つけて"));
        assert!(!h.detect("天気は？"));
    }

    #[tokio::test]
    async fn test_time_matches_clock_within_minute() {
        let h = LocalFactsHandler;
        let before = Local::now();
        let outcome = h.execute("今何時").await.unwrap().unwrap();
        let after = Local::now();

        // Clock may roll over mid-test; accept either minute.
        let candidates = [before, after]
            .map(|t| format!("今は{}:{:02}ですよ！", t.hour(), t.minute()));
        assert!(candidates.contains(&outcome.display), "{}", outcome.display);
        assert!(outcome.speak.contains("時"));
    }

    #[tokio::test]
    async fn test_date_includes_japanese_weekday() {
        let h = LocalFactsHandler;
        let outcome = h.execute("今日は何曜日").await.unwrap().unwrap();
        assert!(outcome.display.starts_with("今日は"));
        assert!(outcome.display.contains("曜日"));
        assert_eq!(outcome.display, outcome.speak);
    }

    #[tokio::test]
    async fn test_year_query() {
        let h = LocalFactsHandler;
        let outcome = h.execute("今年は何年？").await.unwrap().unwrap();
        assert!(outcome
            .display
            .contains(&Local::now().year().to_string()));
    }

    #[tokio::test]
    async fn test_date_wins_over_year_for_kyou_wa_nani() {
        // "今日は何〜" matches both tables; the date branch is checked first.
        let h = LocalFactsHandler;
        let outcome = h.execute("今日は何の日？").await.unwrap().unwrap();
        assert!(outcome.display.contains("曜日"));
    }
}
