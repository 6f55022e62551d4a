use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    Gift,
    Returns,
    Freshbag,
    Income,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 4] = [
        MetricGroup::Gift,
        MetricGroup::Returns,
        MetricGroup::Freshbag,
        MetricGroup::Income,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Gift => "gift",
            Self::Returns => "returns",
            Self::Freshbag => "freshbag",
            Self::Income => "income",
        }
    }
}

impl Display for MetricGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown metric group: {0}")]
pub struct MetricGroupParseError(pub String);

impl FromStr for MetricGroup {
    type Err = MetricGroupParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gift" | "gifts" => Ok(Self::Gift),
            "returns" | "return" => Ok(Self::Returns),
            "freshbag" | "fresh_bag" | "fresh-bag" => Ok(Self::Freshbag),
            "income" => Ok(Self::Income),
            _ => Err(MetricGroupParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricShape {
    Value,
    Table,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricFormat {
    Count,
    Percent,
    Currency,
}

impl MetricFormat {
    /// Percent values are ratios; currency and counts are whole units.
    pub fn render(&self, value: f64) -> String {
        match self {
            Self::Count => group_thousands(value.round() as i64),
            Self::Percent => format!("{:.2}%", value * 100.0),
            Self::Currency => group_thousands(value.round() as i64),
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{out}")
    } else {
        out
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    GiftTotal,
    GiftRound1,
    GiftRound2,
    GiftShare,
    DeliveryCounters,
    UndeliveredReasons,
    ReturnsTotal,
    ReturnsRound1,
    ReturnsRound2,
    ReturnsShare,
    ReturnsNumbered,
    ReturnsNotCollected,
    ReturnsIncomplete,
    ReturnReasons,
    FreshBagAssigned,
    FreshBagUncollected,
    FreshBagRate,
    FreshBagGeneralRate,
    FreshBagStandaloneRate,
    FreshBagCategories,
    FreshBagFailures,
    FreshBagProgress,
    IncomeGift,
    IncomeReturns,
    IncomeFreshBag,
    IncomeDeduction,
    IncomeTotal,
    IncentiveBonus,
    NetIncome,
    IncomeBreakdown,
}

impl MetricId {
    pub const ALL: [MetricId; 30] = [
        MetricId::GiftTotal,
        MetricId::GiftRound1,
        MetricId::GiftRound2,
        MetricId::GiftShare,
        MetricId::DeliveryCounters,
        MetricId::UndeliveredReasons,
        MetricId::ReturnsTotal,
        MetricId::ReturnsRound1,
        MetricId::ReturnsRound2,
        MetricId::ReturnsShare,
        MetricId::ReturnsNumbered,
        MetricId::ReturnsNotCollected,
        MetricId::ReturnsIncomplete,
        MetricId::ReturnReasons,
        MetricId::FreshBagAssigned,
        MetricId::FreshBagUncollected,
        MetricId::FreshBagRate,
        MetricId::FreshBagGeneralRate,
        MetricId::FreshBagStandaloneRate,
        MetricId::FreshBagCategories,
        MetricId::FreshBagFailures,
        MetricId::FreshBagProgress,
        MetricId::IncomeGift,
        MetricId::IncomeReturns,
        MetricId::IncomeFreshBag,
        MetricId::IncomeDeduction,
        MetricId::IncomeTotal,
        MetricId::IncentiveBonus,
        MetricId::NetIncome,
        MetricId::IncomeBreakdown,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::GiftTotal => "gift_total",
            Self::GiftRound1 => "gift_round1",
            Self::GiftRound2 => "gift_round2",
            Self::GiftShare => "gift_share",
            Self::DeliveryCounters => "delivery_counters",
            Self::UndeliveredReasons => "undelivered_reasons",
            Self::ReturnsTotal => "returns_total",
            Self::ReturnsRound1 => "returns_round1",
            Self::ReturnsRound2 => "returns_round2",
            Self::ReturnsShare => "returns_share",
            Self::ReturnsNumbered => "returns_numbered",
            Self::ReturnsNotCollected => "returns_not_collected",
            Self::ReturnsIncomplete => "returns_incomplete",
            Self::ReturnReasons => "return_reasons",
            Self::FreshBagAssigned => "fresh_bag_assigned",
            Self::FreshBagUncollected => "fresh_bag_uncollected",
            Self::FreshBagRate => "fresh_bag_rate",
            Self::FreshBagGeneralRate => "fresh_bag_general_rate",
            Self::FreshBagStandaloneRate => "fresh_bag_standalone_rate",
            Self::FreshBagCategories => "fresh_bag_categories",
            Self::FreshBagFailures => "fresh_bag_failures",
            Self::FreshBagProgress => "fresh_bag_progress",
            Self::IncomeGift => "income_gift",
            Self::IncomeReturns => "income_returns",
            Self::IncomeFreshBag => "income_fresh_bag",
            Self::IncomeDeduction => "income_deduction",
            Self::IncomeTotal => "income_total",
            Self::IncentiveBonus => "incentive_bonus",
            Self::NetIncome => "net_income",
            Self::IncomeBreakdown => "income_breakdown",
        }
    }

    pub fn def(&self) -> MetricDef {
        use MetricFormat::{Count, Currency, Percent};
        use MetricGroup::{Freshbag, Gift, Income, Returns};
        use MetricShape::{Table, Value};

        let (label, group, shape, format, negative, routed) = match self {
            Self::GiftTotal => ("Gifts assigned", Gift, Value, Count, false, true),
            Self::GiftRound1 => ("Gifts round 1", Gift, Value, Count, false, true),
            Self::GiftRound2 => ("Gifts round 2 (new)", Gift, Value, Count, false, true),
            Self::GiftShare => ("Gift route share", Gift, Value, Percent, false, true),
            Self::DeliveryCounters => ("Delivery counters", Gift, Table, Count, false, true),
            Self::UndeliveredReasons => ("Undelivered by reason", Gift, Table, Count, true, true),
            Self::ReturnsTotal => ("Returns assigned", Returns, Value, Count, false, true),
            Self::ReturnsRound1 => ("Returns round 1", Returns, Value, Count, false, true),
            Self::ReturnsRound2 => ("Returns round 2 (new)", Returns, Value, Count, false, true),
            Self::ReturnsShare => ("Return route share", Returns, Value, Percent, false, true),
            Self::ReturnsNumbered => ("Numbered returns", Returns, Value, Count, false, true),
            Self::ReturnsNotCollected => {
                ("Returns not collected", Returns, Value, Count, true, true)
            }
            Self::ReturnsIncomplete => ("Returns incomplete", Returns, Value, Count, true, false),
            Self::ReturnReasons => ("Returns not collected by reason", Returns, Table, Count, true, true),
            Self::FreshBagAssigned => ("Fresh bags assigned", Freshbag, Value, Count, false, true),
            Self::FreshBagUncollected => {
                ("Fresh bags uncollected", Freshbag, Value, Count, true, true)
            }
            Self::FreshBagRate => ("Fresh-bag collection rate", Freshbag, Value, Percent, false, true),
            Self::FreshBagGeneralRate => {
                ("General fresh-bag rate", Freshbag, Value, Percent, false, false)
            }
            Self::FreshBagStandaloneRate => {
                ("Standalone fresh-bag rate", Freshbag, Value, Percent, false, false)
            }
            Self::FreshBagCategories => {
                ("Fresh bags by category", Freshbag, Table, Count, false, false)
            }
            Self::FreshBagFailures => ("Fresh-bag failures", Freshbag, Table, Count, true, true),
            Self::FreshBagProgress => {
                ("Fresh bags unvisited mid-day", Freshbag, Table, Count, false, false)
            }
            Self::IncomeGift => ("Gift income", Income, Value, Currency, false, true),
            Self::IncomeReturns => ("Return income", Income, Value, Currency, false, true),
            Self::IncomeFreshBag => ("Fresh-bag income", Income, Value, Currency, false, false),
            Self::IncomeDeduction => ("Fresh-bag deduction", Income, Value, Currency, true, false),
            Self::IncomeTotal => ("Total income", Income, Value, Currency, false, false),
            Self::IncentiveBonus => ("Incentive bonus", Income, Value, Currency, false, false),
            Self::NetIncome => ("Net income", Income, Value, Currency, false, false),
            Self::IncomeBreakdown => ("Income breakdown", Income, Table, Currency, false, false),
        };
        MetricDef {
            id: *self,
            label,
            group,
            shape,
            format,
            negative,
            routed,
        }
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

#[derive(Debug, Error)]
#[error("unknown metric: {0}")]
pub struct MetricIdParseError(pub String);

impl FromStr for MetricId {
    type Err = MetricIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        MetricId::ALL
            .into_iter()
            .find(|id| id.as_slug() == normalized)
            .ok_or_else(|| MetricIdParseError(s.to_string()))
    }
}

/// Static description of one catalog entry.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricDef {
    pub id: MetricId,
    pub label: &'static str,
    pub group: MetricGroup,
    pub shape: MetricShape,
    pub format: MetricFormat,
    /// Presented with a minus sign and warning colour.
    pub negative: bool,
    /// False when the metric has no route dimension and ignores the scope.
    pub routed: bool,
}

pub fn catalog() -> Vec<MetricDef> {
    MetricId::ALL.iter().map(MetricId::def).collect()
}

pub fn catalog_for(group: MetricGroup) -> Vec<MetricDef> {
    catalog()
        .into_iter()
        .filter(|def| def.group == group)
        .collect()
}
