use serde::{Deserialize, Serialize};

use crate::aggregate::{Period, PeriodPreset};
use crate::report::catalog::MetricId;
use crate::report::query::Query;
use crate::types::RouteScope;

/// A saved period + route + metric selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub route: RouteScope,
    #[serde(default)]
    pub metrics: Vec<MetricId>,
}

impl Preset {
    fn builtin(name: &str, preset: PeriodPreset, route: RouteScope, metrics: &[MetricId]) -> Self {
        Self {
            name: name.to_string(),
            period: Period::preset(preset),
            route,
            metrics: metrics.to_vec(),
        }
    }

    pub fn query(&self) -> Query {
        Query {
            period: self.period,
            route: self.route,
            metrics: self.metrics.clone(),
        }
    }
}

pub fn builtin_presets() -> Vec<Preset> {
    vec![
        Preset::builtin(
            "today",
            PeriodPreset::Today,
            RouteScope::All,
            &[
                MetricId::GiftTotal,
                MetricId::ReturnsTotal,
                MetricId::FreshBagRate,
                MetricId::FreshBagGeneralRate,
                MetricId::FreshBagStandaloneRate,
                MetricId::IncomeTotal,
            ],
        ),
        Preset::builtin(
            "week-routes",
            PeriodPreset::Week,
            RouteScope::All,
            &[
                MetricId::GiftShare,
                MetricId::ReturnsShare,
                MetricId::IncomeGift,
                MetricId::IncomeReturns,
                MetricId::DeliveryCounters,
            ],
        ),
        Preset::builtin(
            "settlement",
            PeriodPreset::Settlement,
            RouteScope::All,
            &[
                MetricId::IncomeBreakdown,
                MetricId::FreshBagGeneralRate,
                MetricId::FreshBagStandaloneRate,
                MetricId::IncentiveBonus,
                MetricId::NetIncome,
            ],
        ),
        Preset::builtin(
            "shortfalls",
            PeriodPreset::Week,
            RouteScope::All,
            &[
                MetricId::UndeliveredReasons,
                MetricId::ReturnReasons,
                MetricId::FreshBagFailures,
                MetricId::IncomeDeduction,
            ],
        ),
    ]
}

/// Builtins followed by configured presets; a configured preset replaces a
/// builtin of the same name.
pub fn all_presets(configured: &[Preset]) -> Vec<Preset> {
    let mut presets: Vec<Preset> = builtin_presets()
        .into_iter()
        .filter(|builtin| !configured.iter().any(|p| p.name.eq_ignore_ascii_case(&builtin.name)))
        .collect();
    presets.extend(configured.iter().cloned());
    presets
}

pub fn find_preset(name: &str, configured: &[Preset]) -> Option<Preset> {
    all_presets(configured)
        .into_iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
}
