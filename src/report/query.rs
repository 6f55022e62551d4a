use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    aggregate_with_policy, evaluate_incentives, resolve_range, Aggregate, DateRange, Period,
};
use crate::config::Config;
use crate::report::catalog::{MetricDef, MetricFormat, MetricId};
use crate::source::{LogKind, RawSource};
use crate::types::RouteScope;

/// Period, route scope and selected metrics. An empty metric list selects
/// the whole catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Query {
    #[serde(default)]
    pub period: Period,
    #[serde(default)]
    pub route: RouteScope,
    #[serde(default)]
    pub metrics: Vec<MetricId>,
}

impl Query {
    pub fn metric_ids(&self) -> Vec<MetricId> {
        if self.metrics.is_empty() {
            MetricId::ALL.to_vec()
        } else {
            self.metrics.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRow {
    pub label: String,
    pub value: f64,
}

impl TableRow {
    fn new(label: impl Into<String>, value: impl Into<f64>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricResult {
    Value {
        value: f64,
        format: MetricFormat,
        negative: bool,
    },
    Table {
        format: MetricFormat,
        negative: bool,
        rows: Vec<TableRow>,
    },
}

impl MetricResult {
    /// Display text. Negative-flagged values carry a leading minus.
    pub fn render(&self) -> String {
        match self {
            Self::Value {
                value,
                format,
                negative,
            } => render_value(*value, *format, *negative),
            Self::Table {
                format,
                negative,
                rows,
            } => {
                if rows.is_empty() {
                    return "-".to_string();
                }
                rows.iter()
                    .map(|row| {
                        format!("{}: {}", row.label, render_value(row.value, *format, *negative))
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
    }

    pub fn scalar(&self) -> Option<f64> {
        match self {
            Self::Value { value, .. } => Some(*value),
            Self::Table { .. } => None,
        }
    }
}

fn render_value(value: f64, format: MetricFormat, negative: bool) -> String {
    let text = format.render(value);
    if negative && value > 0.0 {
        format!("-{text}")
    } else {
        text
    }
}

fn count(value: i64) -> f64 {
    value as f64
}

fn reason_rows(aggregate: &Aggregate, kind: LogKind, scope: RouteScope) -> Vec<TableRow> {
    aggregate
        .reasons
        .rows(kind, scope)
        .into_iter()
        .map(|(reason, quantity)| TableRow::new(reason, count(quantity)))
        .collect()
}

enum Projection {
    Value(f64),
    Rows(Vec<TableRow>),
}

fn project(id: MetricId, aggregate: &Aggregate, query: &Query, config: &Config) -> Projection {
    use Projection::{Rows, Value};

    let scope = query.route;
    let fb = &aggregate.fresh_bags;
    let income = &aggregate.income;
    match id {
        MetricId::GiftTotal => Value(count(aggregate.gift_day.pick(scope))),
        MetricId::GiftRound1 => Value(count(aggregate.gift_r1.pick(scope))),
        MetricId::GiftRound2 => Value(count(aggregate.gift_r2.pick(scope))),
        MetricId::GiftShare => Value(aggregate.gift_share().pick(scope)),
        MetricId::DeliveryCounters => {
            let d = &aggregate.deliveries;
            Rows(vec![
                TableRow::new("allocated", count(d.allocated.pick(scope))),
                TableRow::new("completed", count(d.completed.pick(scope))),
                TableRow::new("cancelled", count(d.cancelled.pick(scope))),
                TableRow::new("incomplete", count(d.incomplete.pick(scope))),
                TableRow::new("transferred", count(d.transferred.pick(scope))),
                TableRow::new("added", count(d.added.pick(scope))),
                TableRow::new("first round remaining", count(d.first_round_remaining.pick(scope))),
            ])
        }
        MetricId::UndeliveredReasons => Rows(reason_rows(aggregate, LogKind::Undelivered, scope)),
        MetricId::ReturnsTotal => Value(count(aggregate.returns_day.pick(scope))),
        MetricId::ReturnsRound1 => Value(count(aggregate.returns_r1.pick(scope))),
        MetricId::ReturnsRound2 => Value(count(aggregate.returns_r2.pick(scope))),
        MetricId::ReturnsShare => Value(aggregate.returns_share().pick(scope)),
        MetricId::ReturnsNumbered => Value(count(aggregate.returns.numbered.pick(scope))),
        MetricId::ReturnsNotCollected => Value(count(aggregate.returns.not_collected.pick(scope))),
        MetricId::ReturnsIncomplete => Value(count(aggregate.returns.incomplete())),
        MetricId::ReturnReasons => Rows(reason_rows(aggregate, LogKind::ReturnNotCollected, scope)),
        MetricId::FreshBagAssigned => Value(count(fb.assigned().pick(scope))),
        MetricId::FreshBagUncollected => Value(count(fb.uncollected().pick(scope))),
        MetricId::FreshBagRate => Value(fb.route_rate().pick(scope)),
        MetricId::FreshBagGeneralRate => Value(fb.general.rate()),
        MetricId::FreshBagStandaloneRate => Value(fb.standalone.rate()),
        MetricId::FreshBagCategories => Rows(vec![
            TableRow::new("general assigned", count(fb.general.assigned)),
            TableRow::new("general uncollected", count(fb.general.uncollected)),
            TableRow::new("standalone assigned", count(fb.standalone.assigned)),
            TableRow::new("standalone uncollected", count(fb.standalone.uncollected)),
            TableRow::new("transferred", count(fb.transferred)),
            TableRow::new("added", count(fb.added)),
        ]),
        MetricId::FreshBagFailures => Rows(vec![
            TableRow::new("absent", count(fb.failed_absent.pick(scope))),
            TableRow::new("with products", count(fb.failed_with_products.pick(scope))),
        ]),
        MetricId::FreshBagProgress => Rows(vec![
            TableRow::new("203D unvisited (B)", count(fb.progress.b_203d_unvisited)),
            TableRow::new("general unvisited (C)", count(fb.progress.c_general_unvisited)),
            TableRow::new("standalone unvisited (C)", count(fb.progress.c_standalone_unvisited)),
        ]),
        MetricId::IncomeGift => Value(count(income.gift.pick(scope))),
        MetricId::IncomeReturns => Value(count(income.returns.pick(scope))),
        MetricId::IncomeFreshBag => Value(count(income.fb_assigned)),
        MetricId::IncomeDeduction => Value(count(income.fb_deduct)),
        MetricId::IncomeTotal => Value(count(income.total)),
        MetricId::IncentiveBonus => {
            Value(count(evaluate_incentives(aggregate, &config.incentive).total_bonus))
        }
        MetricId::NetIncome => {
            Value(count(evaluate_incentives(aggregate, &config.incentive).net_income))
        }
        MetricId::IncomeBreakdown => {
            let incentives = evaluate_incentives(aggregate, &config.incentive);
            Rows(vec![
                TableRow::new("gift", count(income.gift.all)),
                TableRow::new("returns", count(income.returns.all)),
                TableRow::new("fresh bags assigned", count(income.fb_assigned)),
                TableRow::new("fresh-bag deduction", count(-income.fb_deduct)),
                TableRow::new("total", count(income.total)),
                TableRow::new("incentive bonus", count(incentives.total_bonus)),
                TableRow::new("net", count(incentives.net_income)),
            ])
        }
    }
}

/// Projects one metric out of an Aggregate. Metrics without a route
/// dimension read the combined figures whatever the scope.
pub fn compute(id: MetricId, aggregate: &Aggregate, query: &Query, config: &Config) -> MetricResult {
    let def = id.def();
    match project(id, aggregate, query, config) {
        Projection::Value(value) => MetricResult::Value {
            value,
            format: def.format,
            negative: def.negative,
        },
        Projection::Rows(rows) => MetricResult::Table {
            format: def.format,
            negative: def.negative,
            rows,
        },
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricReport {
    #[serde(flatten)]
    pub def: MetricDef,
    pub result: MetricResult,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryReport {
    pub query: Query,
    pub range: DateRange,
    pub days: usize,
    pub metrics: Vec<MetricReport>,
}

/// Resolves the period, folds the stored days and projects every selected
/// metric.
pub fn run_query(
    query: &Query,
    days: &[(NaiveDate, RawSource)],
    today: NaiveDate,
    config: &Config,
) -> QueryReport {
    let range = resolve_range(&query.period, today, &config.settlement);
    let aggregate = aggregate_with_policy(days, range, &config.rates, config.engine.negative_policy);
    report_for(query, &aggregate, range, config)
}

/// Like [`run_query`], over an already folded Aggregate.
pub fn report_for(
    query: &Query,
    aggregate: &Aggregate,
    range: DateRange,
    config: &Config,
) -> QueryReport {
    let metrics = query
        .metric_ids()
        .into_iter()
        .map(|id| MetricReport {
            def: id.def(),
            result: compute(id, aggregate, query, config),
        })
        .collect();
    QueryReport {
        query: query.clone(),
        range,
        days: aggregate.days,
        metrics,
    }
}
