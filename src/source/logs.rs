use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Route;

/// Fresh-bag pickup failed because nobody was home.
pub const REASON_ABSENT: &str = "absent";
/// Fresh-bag pickup failed because the bag still held products.
pub const REASON_WITH_PRODUCTS: &str = "with_products";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Numbered,
    Undelivered,
    ReturnNotCollected,
    FreshBagNotCollected,
}

impl LogKind {
    pub const ALL: [LogKind; 4] = [
        LogKind::Numbered,
        LogKind::Undelivered,
        LogKind::ReturnNotCollected,
        LogKind::FreshBagNotCollected,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Numbered => "numbered",
            Self::Undelivered => "undelivered",
            Self::ReturnNotCollected => "return_not_collected",
            Self::FreshBagNotCollected => "fresh_bag_not_collected",
        }
    }
}

impl Display for LogKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown log kind: {0}")]
pub struct LogKindParseError(pub String);

impl FromStr for LogKind {
    type Err = LogKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "numbered" => Ok(Self::Numbered),
            "undelivered" => Ok(Self::Undelivered),
            "return_not_collected" | "returns" => Ok(Self::ReturnNotCollected),
            "fresh_bag_not_collected" | "freshbag" | "fb" => Ok(Self::FreshBagNotCollected),
            _ => Err(LogKindParseError(s.to_string())),
        }
    }
}

/// One reason-tagged side entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub logged_at: DateTime<Utc>,
    pub route: Route,
    pub reason: String,
    pub quantity: u32,
}

impl LogEntry {
    pub fn new(route: Route, reason: impl Into<String>, quantity: u32) -> Self {
        Self {
            logged_at: Utc::now(),
            route,
            reason: reason.into(),
            quantity,
        }
    }
}

/// Append-only side logs for one day.
///
/// These are the only record of numbered, undelivered and not-collected
/// quantities; the matching counters are folded from them on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SideLogs {
    #[serde(default)]
    pub numbered: Vec<LogEntry>,
    #[serde(default)]
    pub undelivered: Vec<LogEntry>,
    #[serde(default)]
    pub return_not_collected: Vec<LogEntry>,
    #[serde(default)]
    pub fresh_bag_not_collected: Vec<LogEntry>,
}

impl SideLogs {
    pub fn entries(&self, kind: LogKind) -> &[LogEntry] {
        match kind {
            LogKind::Numbered => &self.numbered,
            LogKind::Undelivered => &self.undelivered,
            LogKind::ReturnNotCollected => &self.return_not_collected,
            LogKind::FreshBagNotCollected => &self.fresh_bag_not_collected,
        }
    }

    pub fn append(&mut self, kind: LogKind, entry: LogEntry) {
        let log = match kind {
            LogKind::Numbered => &mut self.numbered,
            LogKind::Undelivered => &mut self.undelivered,
            LogKind::ReturnNotCollected => &mut self.return_not_collected,
            LogKind::FreshBagNotCollected => &mut self.fresh_bag_not_collected,
        };
        log.push(entry);
    }

    /// Total quantity logged under `kind`, optionally for one route.
    pub fn total(&self, kind: LogKind, route: Option<Route>) -> i64 {
        self.entries(kind)
            .iter()
            .filter(|entry| route.map_or(true, |r| entry.route == r))
            .map(|entry| i64::from(entry.quantity))
            .sum()
    }

    /// Total quantity logged under `kind` with the given reason.
    pub fn total_for_reason(&self, kind: LogKind, reason: &str) -> i64 {
        self.entries(kind)
            .iter()
            .filter(|entry| entry.reason.eq_ignore_ascii_case(reason))
            .map(|entry| i64::from(entry.quantity))
            .sum()
    }

    pub fn numbered(&self) -> i64 {
        self.total(LogKind::Numbered, None)
    }

    pub fn returns_not_collected(&self) -> i64 {
        self.total(LogKind::ReturnNotCollected, None)
    }

    pub fn undelivered(&self, route: Route) -> i64 {
        self.total(LogKind::Undelivered, Some(route))
    }

    pub fn fresh_bag_failed_absent(&self) -> i64 {
        self.total_for_reason(LogKind::FreshBagNotCollected, REASON_ABSENT)
    }

    pub fn fresh_bag_failed_with_products(&self) -> i64 {
        self.total_for_reason(LogKind::FreshBagNotCollected, REASON_WITH_PRODUCTS)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{LogEntry, LogKind, SideLogs, REASON_ABSENT, REASON_WITH_PRODUCTS};
    use crate::types::Route;

    #[test]
    fn folds_counters_from_entries() {
        let mut logs = SideLogs::default();
        logs.append(LogKind::Undelivered, LogEntry::new(Route::R203D, "closed", 2));
        logs.append(LogKind::Undelivered, LogEntry::new(Route::R206A, "closed", 1));
        logs.append(LogKind::Undelivered, LogEntry::new(Route::R203D, "address", 3));
        logs.append(
            LogKind::ReturnNotCollected,
            LogEntry::new(Route::R206A, "not_ready", 4),
        );
        logs.append(
            LogKind::FreshBagNotCollected,
            LogEntry::new(Route::R203D, REASON_ABSENT, 2),
        );
        logs.append(
            LogKind::FreshBagNotCollected,
            LogEntry::new(Route::R206A, "With_Products", 1),
        );

        assert_eq!(logs.undelivered(Route::R203D), 5);
        assert_eq!(logs.undelivered(Route::R206A), 1);
        assert_eq!(logs.returns_not_collected(), 4);
        assert_eq!(logs.numbered(), 0);
        assert_eq!(logs.fresh_bag_failed_absent(), 2);
        assert_eq!(logs.fresh_bag_failed_with_products(), 1);
        assert_eq!(
            logs.total_for_reason(LogKind::FreshBagNotCollected, REASON_WITH_PRODUCTS),
            1
        );
    }

    #[test]
    fn parses_log_kinds() {
        assert_eq!(
            LogKind::from_str("return-not-collected").unwrap(),
            LogKind::ReturnNotCollected
        );
        assert_eq!(LogKind::from_str("fb").unwrap(), LogKind::FreshBagNotCollected);
        assert!(LogKind::from_str("lost").is_err());
    }
}
