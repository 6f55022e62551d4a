use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Reversed bounds are swapped.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPreset {
    #[default]
    Today,
    Week,
    Settlement,
    Custom,
}

impl PeriodPreset {
    pub const ALL: [PeriodPreset; 4] = [
        PeriodPreset::Today,
        PeriodPreset::Week,
        PeriodPreset::Settlement,
        PeriodPreset::Custom,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Settlement => "settlement",
            Self::Custom => "custom",
        }
    }
}

impl Display for PeriodPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown period: {0}")]
pub struct PeriodParseError(pub String);

impl FromStr for PeriodPreset {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "settlement" | "billing" => Ok(Self::Settlement),
            "custom" | "range" => Ok(Self::Custom),
            _ => Err(PeriodParseError(s.to_string())),
        }
    }
}

/// A preset plus the optional custom bounds. Bounds are ignored by every
/// preset except `custom`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Period {
    #[serde(default)]
    pub preset: PeriodPreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Period {
    pub fn preset(preset: PeriodPreset) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    pub fn custom(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            preset: PeriodPreset::Custom,
            start,
            end,
        }
    }
}

/// Billing-period boundaries, supplied by the host.
pub trait SettlementCalendar {
    fn period_containing(&self, day: NaiveDate) -> DateRange;
}

/// Runs from `start_day` of one month to the day before `start_day` of the
/// next. A start day past the month's end is clamped to its last day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonthlySettlement {
    pub start_day: u32,
}

impl Default for MonthlySettlement {
    fn default() -> Self {
        Self { start_day: 1 }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

impl MonthlySettlement {
    fn anchor(&self, year: i32, month: u32) -> Option<NaiveDate> {
        let day = self.start_day.clamp(1, days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

impl SettlementCalendar for MonthlySettlement {
    fn period_containing(&self, day: NaiveDate) -> DateRange {
        let (year, month) = (day.year(), day.month());
        let this_anchor = match self.anchor(year, month) {
            Some(anchor) => anchor,
            None => return DateRange::single(day),
        };
        let start_month = if day >= this_anchor {
            (year, month)
        } else {
            shift_month(year, month, -1)
        };
        let next_month = shift_month(start_month.0, start_month.1, 1);

        let start = self.anchor(start_month.0, start_month.1);
        let end = self
            .anchor(next_month.0, next_month.1)
            .and_then(|next| next.pred_opt());
        match (start, end) {
            (Some(start), Some(end)) => DateRange { start, end },
            _ => DateRange::single(day),
        }
    }
}

/// Resolves a period against `today`.
///
/// `week` runs Monday through Sunday of the current week. `custom` bounds
/// each default to the other; with neither given the range is `today`.
pub fn resolve_range(
    period: &Period,
    today: NaiveDate,
    calendar: &dyn SettlementCalendar,
) -> DateRange {
    match period.preset {
        PeriodPreset::Today => DateRange::single(today),
        PeriodPreset::Week => {
            let offset = u64::from(today.weekday().num_days_from_monday());
            let monday = today - Days::new(offset);
            DateRange {
                start: monday,
                end: monday + Days::new(6),
            }
        }
        PeriodPreset::Settlement => calendar.period_containing(today),
        PeriodPreset::Custom => match (period.start, period.end) {
            (Some(start), Some(end)) => DateRange::new(start, end),
            (Some(only), None) | (None, Some(only)) => DateRange::single(only),
            (None, None) => DateRange::single(today),
        },
    }
}
