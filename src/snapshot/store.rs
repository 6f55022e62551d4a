use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::snapshot::migrations::BASE_MIGRATION;
use crate::snapshot::SourceStore;
use crate::source::RawSource;

const DAY_FORMAT: &str = "%Y-%m-%d";

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed opening ledger database: {}", path.display()))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    /// Upserts the day with an explicit modification time.
    pub fn save_at(
        &self,
        day: NaiveDate,
        source: &RawSource,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            r#"
INSERT INTO source_days(day, source_json, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(day) DO UPDATE SET
    source_json = excluded.source_json,
    updated_at = excluded.updated_at
"#,
            params![
                day.format(DAY_FORMAT).to_string(),
                serde_json::to_string(source)?,
                updated_at.to_rfc3339()
            ],
        )?;
        debug!(%day, "saved source day");
        Ok(())
    }

    pub fn updated_at(&self, day: NaiveDate) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM source_days WHERE day = ?1",
                params![day.format(DAY_FORMAT).to_string()],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("invalid updated_at for {day}: {value}"))
        })
        .transpose()
    }

    pub fn delete(&self, day: NaiveDate) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM source_days WHERE day = ?1",
            params![day.format(DAY_FORMAT).to_string()],
        )?;
        Ok(removed > 0)
    }

    pub fn list_days(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT day FROM source_days ORDER BY day ASC")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raw.iter().map(|value| parse_day(value)).collect()
    }
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DAY_FORMAT)
        .with_context(|| format!("invalid stored day: {value}"))
}

impl SourceStore for SnapshotStore {
    fn load(&self, day: NaiveDate) -> Result<Option<RawSource>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT source_json FROM source_days WHERE day = ?1",
                params![day.format(DAY_FORMAT).to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(
                serde_json::from_str(&json)
                    .with_context(|| format!("corrupt source record for {day}"))?,
            )),
            None => Ok(None),
        }
    }

    fn save(&self, day: NaiveDate, source: &RawSource) -> Result<()> {
        self.save_at(day, source, Utc::now())
    }

    fn load_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<(NaiveDate, RawSource)>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT day, source_json
FROM source_days
WHERE day >= ?1 AND day <= ?2
ORDER BY day ASC
"#,
        )?;
        let rows = stmt
            .query_map(
                params![
                    start.format(DAY_FORMAT).to_string(),
                    end.format(DAY_FORMAT).to_string()
                ],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut days = Vec::with_capacity(rows.len());
        for (day, json) in rows {
            let day = parse_day(&day)?;
            let source: RawSource = serde_json::from_str(&json)
                .with_context(|| format!("corrupt source record for {day}"))?;
            days.push((day, source));
        }
        debug!(%start, %end, count = days.len(), "loaded source range");
        Ok(days)
    }
}
