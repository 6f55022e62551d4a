use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, CollectionTotals};

/// One fresh-bag category's bonus rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IncentiveRule {
    /// Minimum weighted collection rate, as a ratio.
    pub threshold: f64,
    /// Paid per completed delivery when the threshold is met.
    pub bonus_per_delivery: i64,
}

/// Each category falls back to its own defaults field by field, so a
/// partially written `[incentive.standalone]` keeps the standalone values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "IncentiveConfigFile")]
pub struct IncentiveConfig {
    pub general: IncentiveRule,
    pub standalone: IncentiveRule,
}

impl Default for IncentiveConfig {
    fn default() -> Self {
        Self {
            general: default_general_rule(),
            standalone: default_standalone_rule(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialRule {
    threshold: Option<f64>,
    bonus_per_delivery: Option<i64>,
}

impl PartialRule {
    fn over(self, defaults: IncentiveRule) -> IncentiveRule {
        IncentiveRule {
            threshold: self.threshold.unwrap_or(defaults.threshold),
            bonus_per_delivery: self.bonus_per_delivery.unwrap_or(defaults.bonus_per_delivery),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct IncentiveConfigFile {
    #[serde(default)]
    general: PartialRule,
    #[serde(default)]
    standalone: PartialRule,
}

impl From<IncentiveConfigFile> for IncentiveConfig {
    fn from(file: IncentiveConfigFile) -> Self {
        Self {
            general: file.general.over(default_general_rule()),
            standalone: file.standalone.over(default_standalone_rule()),
        }
    }
}

fn default_general_rule() -> IncentiveRule {
    IncentiveRule {
        threshold: 0.90,
        bonus_per_delivery: 30,
    }
}

fn default_standalone_rule() -> IncentiveRule {
    IncentiveRule {
        threshold: 0.70,
        bonus_per_delivery: 20,
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct IncentiveOutcome {
    pub rate: f64,
    pub threshold: f64,
    pub met: bool,
    pub bonus: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct IncentiveReport {
    pub completed_deliveries: i64,
    pub general: IncentiveOutcome,
    pub standalone: IncentiveOutcome,
    pub total_bonus: i64,
    /// Period income plus every bonus earned.
    pub net_income: i64,
}

fn outcome(line: &CollectionTotals, rule: &IncentiveRule, completed: i64) -> IncentiveOutcome {
    let rate = line.rate();
    let met = line.assigned > 0 && rate >= rule.threshold;
    IncentiveOutcome {
        rate,
        threshold: rule.threshold,
        met,
        bonus: if met { rule.bonus_per_delivery * completed } else { 0 },
    }
}

/// Period-level bonus check against the weighted category rates.
pub fn evaluate_incentives(aggregate: &Aggregate, config: &IncentiveConfig) -> IncentiveReport {
    let completed = aggregate.completed_deliveries();
    let general = outcome(&aggregate.fresh_bags.general, &config.general, completed);
    let standalone = outcome(&aggregate.fresh_bags.standalone, &config.standalone, completed);
    let total_bonus = general.bonus + standalone.bonus;
    IncentiveReport {
        completed_deliveries: completed,
        general,
        standalone,
        total_bonus,
        net_income: aggregate.income.total + total_bonus,
    }
}
