use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// How often unanswered requests are chased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FollowUpCadence {
    #[serde(rename = "3_business_days")]
    EveryThreeBusinessDays,
    #[serde(rename = "7_days")]
    EverySevenDays,
    /// Single reminder two days before the packet deadline.
    #[serde(rename = "t_minus_2")]
    BeforeDeadline,
}

const BUSINESS_DAY_INTERVAL: u32 = 3;
const CALENDAR_DAY_INTERVAL: i64 = 7;
const DEADLINE_LEAD_DAYS: i64 = 2;

impl FollowUpCadence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EveryThreeBusinessDays => "3_business_days",
            Self::EverySevenDays => "7_days",
            Self::BeforeDeadline => "t_minus_2",
        }
    }

    pub const fn requires_deadline(self) -> bool {
        matches!(self, Self::BeforeDeadline)
    }

    /// Next follow-up instant strictly after `from`, or `None` when nothing
    /// further is scheduled.
    pub fn next_after(
        self,
        from: DateTime<Utc>,
        deadline: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match self {
            Self::EveryThreeBusinessDays => Some(add_business_days(from, BUSINESS_DAY_INTERVAL)),
            Self::EverySevenDays => Some(from + Duration::days(CALENDAR_DAY_INTERVAL)),
            Self::BeforeDeadline => deadline
                .map(|deadline| deadline - Duration::days(DEADLINE_LEAD_DAYS))
                .filter(|reminder| *reminder > from),
        }
    }
}

impl fmt::Display for FollowUpCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown follow-up cadence '{0}' (expected 3_business_days, 7_days or t_minus_2)")]
pub struct ParseCadenceError(pub String);

impl FromStr for FollowUpCadence {
    type Err = ParseCadenceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "3_business_days" | "three_business_days" => Ok(Self::EveryThreeBusinessDays),
            "7_days" | "seven_days" | "weekly" => Ok(Self::EverySevenDays),
            "t_minus_2" | "t-2" => Ok(Self::BeforeDeadline),
            _ => Err(ParseCadenceError(raw.to_string())),
        }
    }
}

/// Add `days` working days (Monday to Friday), keeping the time of day.
pub fn add_business_days(from: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let mut cursor = from;
    let mut remaining = days;
    while remaining > 0 {
        cursor += Duration::days(1);
        if !matches!(cursor.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }
    cursor
}
