pub mod migrations;
pub mod store;

use anyhow::Result;
use chrono::NaiveDate;

use crate::source::{LogEntry, LogKind, RawSource};

pub use store::SnapshotStore;

/// Persistence for per-day Source records. Only raw input is stored;
/// derived values are always recomputed.
pub trait SourceStore {
    fn load(&self, day: NaiveDate) -> Result<Option<RawSource>>;

    fn save(&self, day: NaiveDate, source: &RawSource) -> Result<()>;

    /// Stored days in `[start, end]`, ordered by date.
    fn load_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<(NaiveDate, RawSource)>>;

    /// Appends one side-log entry to the day, creating the day if needed.
    fn append_log(&self, day: NaiveDate, kind: LogKind, entry: LogEntry) -> Result<RawSource> {
        let mut source = self.load(day)?.unwrap_or_default();
        source.logs.append(kind, entry);
        self.save(day, &source)?;
        Ok(source)
    }
}
