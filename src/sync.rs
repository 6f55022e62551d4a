use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::aggregate::DateRange;
use crate::types::{Route, Round};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyncKey {
    pub date: NaiveDate,
    pub route: Route,
    pub round: Round,
}

/// One remotely mirrored record. `updated_at` is monotonic per key and
/// decides conflicts; `synced_at` is set when the record last reached the
/// remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRecord {
    pub key: SyncKey,
    pub payload: serde_json::Value,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncRecord {
    pub fn is_dirty(&self) -> bool {
        self.synced_at.map_or(true, |synced| synced < self.updated_at)
    }
}

#[async_trait]
pub trait SyncProvider: Send + Sync {
    async fn upsert(&self, record: SyncRecord) -> Result<()>;
    async fn fetch(&self, key: &SyncKey) -> Result<Option<SyncRecord>>;
    async fn delete(&self, key: &SyncKey) -> Result<bool>;
    async fn list(&self, range: DateRange) -> Result<Vec<SyncRecord>>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    KeepLocal,
    TakeRemote,
}

/// Last write wins on `updated_at`. A tie keeps the remote copy.
pub fn resolve_conflict(local: &SyncRecord, remote: &SyncRecord) -> Resolution {
    if local.updated_at > remote.updated_at {
        Resolution::KeepLocal
    } else {
        Resolution::TakeRemote
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SyncPlan {
    /// Local records the remote is missing or holds an older copy of.
    pub push: Vec<SyncRecord>,
    /// Remote records that replace or add to local state.
    pub pull: Vec<SyncRecord>,
}

pub fn plan_sync(local: &[SyncRecord], remote: &[SyncRecord]) -> SyncPlan {
    let remote_by_key: BTreeMap<SyncKey, &SyncRecord> =
        remote.iter().map(|record| (record.key, record)).collect();
    let local_by_key: BTreeMap<SyncKey, &SyncRecord> =
        local.iter().map(|record| (record.key, record)).collect();

    let mut plan = SyncPlan::default();
    for (key, local_record) in &local_by_key {
        match remote_by_key.get(key) {
            None => plan.push.push((*local_record).clone()),
            Some(remote_record) => match resolve_conflict(local_record, remote_record) {
                Resolution::KeepLocal => plan.push.push((*local_record).clone()),
                Resolution::TakeRemote if remote_record.updated_at != local_record.updated_at
                    || remote_record.payload != local_record.payload =>
                {
                    plan.pull.push((*remote_record).clone())
                }
                Resolution::TakeRemote => {}
            },
        }
    }
    for (key, remote_record) in &remote_by_key {
        if !local_by_key.contains_key(key) {
            plan.pull.push((*remote_record).clone());
        }
    }
    plan
}

/// Sends every record in `plan.push`, stamping `synced_at`. Returns the
/// pushed records as now stored locally.
pub async fn push_plan(
    provider: &dyn SyncProvider,
    plan: &SyncPlan,
    now: DateTime<Utc>,
) -> Result<Vec<SyncRecord>> {
    let mut pushed = Vec::with_capacity(plan.push.len());
    for record in &plan.push {
        let mut stamped = record.clone();
        stamped.synced_at = Some(now);
        provider.upsert(stamped.clone()).await?;
        debug!(date = %record.key.date, route = %record.key.route, round = %record.key.round, "pushed sync record");
        pushed.push(stamped);
    }
    Ok(pushed)
}

/// Process-local provider, used as the remote in tests and dry runs.
#[derive(Default)]
pub struct MemorySyncProvider {
    records: Mutex<BTreeMap<SyncKey, SyncRecord>>,
}

impl MemorySyncProvider {
    pub fn with_records(records: Vec<SyncRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.key, r)).collect()),
        }
    }
}

#[async_trait]
impl SyncProvider for MemorySyncProvider {
    async fn upsert(&self, record: SyncRecord) -> Result<()> {
        self.records.lock().await.insert(record.key, record);
        Ok(())
    }

    async fn fetch(&self, key: &SyncKey) -> Result<Option<SyncRecord>> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &SyncKey) -> Result<bool> {
        Ok(self.records.lock().await.remove(key).is_some())
    }

    async fn list(&self, range: DateRange) -> Result<Vec<SyncRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|record| range.contains(record.key.date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use super::{
        plan_sync, push_plan, resolve_conflict, MemorySyncProvider, Resolution, SyncKey,
        SyncProvider, SyncRecord,
    };
    use crate::aggregate::DateRange;
    use crate::types::{Route, Round};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn key(day: u32, route: Route) -> SyncKey {
        SyncKey {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            route,
            round: Round::First,
        }
    }

    fn record(key: SyncKey, value: i64, hour: u32) -> SyncRecord {
        SyncRecord {
            key,
            payload: json!({ "value": value }),
            updated_at: at(hour),
            synced_at: None,
        }
    }

    #[test]
    fn last_write_wins_and_ties_keep_remote() {
        let k = key(1, Route::R203D);
        assert_eq!(
            resolve_conflict(&record(k, 1, 10), &record(k, 2, 9)),
            Resolution::KeepLocal
        );
        assert_eq!(
            resolve_conflict(&record(k, 1, 9), &record(k, 2, 10)),
            Resolution::TakeRemote
        );
        assert_eq!(
            resolve_conflict(&record(k, 1, 10), &record(k, 2, 10)),
            Resolution::TakeRemote
        );
    }

    #[test]
    fn plans_pushes_and_pulls() {
        let local = vec![
            record(key(1, Route::R203D), 1, 12),
            record(key(1, Route::R206A), 1, 8),
            record(key(2, Route::R203D), 5, 8),
        ];
        let remote = vec![
            record(key(1, Route::R203D), 0, 9),
            record(key(1, Route::R206A), 4, 11),
            record(key(3, Route::R206A), 7, 7),
        ];
        let plan = plan_sync(&local, &remote);
        let pushed: Vec<SyncKey> = plan.push.iter().map(|r| r.key).collect();
        let pulled: Vec<SyncKey> = plan.pull.iter().map(|r| r.key).collect();
        assert_eq!(pushed, vec![key(1, Route::R203D), key(2, Route::R203D)]);
        assert_eq!(pulled, vec![key(1, Route::R206A), key(3, Route::R206A)]);
    }

    #[test]
    fn identical_copies_need_nothing() {
        let same = vec![record(key(1, Route::R203D), 1, 10)];
        let plan = plan_sync(&same, &same);
        assert!(plan.push.is_empty());
        assert!(plan.pull.is_empty());
    }

    #[test]
    fn pushes_into_a_provider_and_stamps_synced_at() {
        let provider = MemorySyncProvider::with_records(vec![record(key(3, Route::R206A), 7, 7)]);
        let local = vec![record(key(1, Route::R203D), 1, 12)];

        tokio_test::block_on(async {
            let range = DateRange::new(
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            );
            let remote = provider.list(range).await.unwrap();
            let plan = plan_sync(&local, &remote);
            let pushed = push_plan(&provider, &plan, at(13)).await.unwrap();

            assert_eq!(pushed.len(), 1);
            assert!(!pushed[0].is_dirty());
            let stored = provider.fetch(&key(1, Route::R203D)).await.unwrap().unwrap();
            assert_eq!(stored.synced_at, Some(at(13)));
            assert_eq!(plan.pull.len(), 1);

            assert!(provider.delete(&key(3, Route::R206A)).await.unwrap());
            assert!(provider.fetch(&key(3, Route::R206A)).await.unwrap().is_none());
        });
    }
}
