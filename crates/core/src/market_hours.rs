//! Trading session classification.
//!
//! A-share sessions are fixed daily windows on weekdays: the morning
//! auction-to-lunch window and the afternoon window. Exchange holidays are
//! not modeled; a holiday behaves like an idle trading day with stale
//! vendor data, which the off-session price substitution already covers.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

/// Weekday-only trading session windows.
#[derive(Clone, Debug)]
pub struct MarketHours {
    windows: Vec<(NaiveTime, NaiveTime)>,
}

impl MarketHours {
    pub fn new(windows: Vec<(NaiveTime, NaiveTime)>) -> Self {
        Self { windows }
    }

    /// Whether the given instant falls inside a trading session.
    ///
    /// Window bounds are inclusive on both ends.
    pub fn is_open(&self, at: NaiveDateTime) -> bool {
        match at.weekday() {
            Weekday::Sat | Weekday::Sun => return false,
            _ => {}
        }

        let time = at.time();
        self.windows
            .iter()
            .any(|(start, end)| *start <= time && time <= *end)
    }
}

impl Default for MarketHours {
    /// 09:00-11:30 and 13:00-15:00, Monday through Friday.
    fn default() -> Self {
        let window = |sh, sm, eh, em| {
            (
                NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or_default(),
                NaiveTime::from_hms_opt(eh, em, 0).unwrap_or_default(),
            )
        };
        Self::new(vec![window(9, 0, 11, 30), window(13, 0, 15, 0)])
    }
}
