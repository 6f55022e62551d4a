use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Config;
use crate::engine::policy::{check_fresh_bag_partitions, find_anomalies, Anomaly, PartitionMismatch};
use crate::engine::{compute_derived, Derived};
use crate::source::{coalesce_to_zero, RawSource};

/// One day's entered values with everything derived from them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayReport {
    pub date: NaiveDate,
    pub source: RawSource,
    pub derived: Derived,
    pub anomalies: Vec<Anomaly>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_mismatch: Option<PartitionMismatch>,
}

/// Anomalies are detected before the negative policy runs, so a clamped
/// report still lists what was clamped.
pub fn day_report(date: NaiveDate, raw: RawSource, config: &Config) -> DayReport {
    let source = coalesce_to_zero(&raw);
    let computed = compute_derived(&source, &config.rates);
    let anomalies = find_anomalies(&computed);
    let partition_mismatch = if config.engine.check_fresh_bag_partitions {
        check_fresh_bag_partitions(&computed.fresh_bags)
    } else {
        None
    };
    let derived = config.engine.negative_policy.apply(computed, &config.rates);
    DayReport {
        date,
        source: raw,
        derived,
        anomalies,
        partition_mismatch,
    }
}
