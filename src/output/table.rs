use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::aggregate::{DailyRow, IncentiveReport};
use crate::engine::policy::{Anomaly, PartitionMismatch};
use crate::engine::{Derived, FreshBagLine};
use crate::report::{MetricDef, MetricFormat, MetricResult, Preset, QueryReport};
use crate::source::RawSource;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn percent(ratio: f64) -> String {
    MetricFormat::Percent.render(ratio)
}

fn currency(value: i64) -> String {
    MetricFormat::Currency.render(value as f64)
}

/// Entered stage values; absent fields show as `-`.
pub fn render_source_table(raw: &RawSource) -> String {
    let mut table = new_table();
    table.set_header(vec!["Field", "Value"]);
    for (name, value) in raw.entries() {
        table.add_row(vec![
            name.to_string(),
            value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}

fn split_row(label: &str, total: i64, r203d: i64, r206a: i64) -> Row {
    let cell = |value: i64| {
        if value < 0 {
            Cell::new(value).fg(Color::Red)
        } else {
            Cell::new(value)
        }
    };
    Row::from(vec![
        Cell::new(label),
        cell(total),
        cell(r203d),
        cell(r206a),
    ])
}

fn rate_row(label: &str, line: &FreshBagLine) -> Vec<String> {
    vec![
        label.to_string(),
        line.assigned.to_string(),
        line.uncollected.to_string(),
        percent(line.rate),
    ]
}

pub fn render_derived_table(derived: &Derived) -> String {
    let gift = &derived.gift;
    let returns = &derived.returns;

    let mut splits = new_table();
    splits.set_header(vec!["Quantity", "Total", "203D", "206A"]);
    splits.add_row(split_row(
        "Gift round 1",
        gift.r1_203d + gift.r1_206a,
        gift.r1_203d,
        gift.r1_206a,
    ));
    splits.add_row(split_row(
        "Gift round 2 (new)",
        gift.r2_new_total,
        gift.r2_new_203d,
        gift.r2_new_206a,
    ));
    splits.add_row(split_row("Gift day", gift.day_total, gift.day_203d, gift.day_206a));
    splits.add_row(split_row(
        "Return round 1",
        returns.r1_203d_assigned + returns.r1_206a_assigned,
        returns.r1_203d_assigned,
        returns.r1_206a_assigned,
    ));
    splits.add_row(split_row(
        "Return round 2 (new)",
        returns.r2_new_total,
        returns.r2_new_203d,
        returns.r2_new_206a,
    ));
    splits.add_row(split_row(
        "Return day",
        returns.day_total,
        returns.day_203d,
        returns.day_206a,
    ));
    splits.add_row(vec![
        "Gift share".to_string(),
        "".to_string(),
        percent(gift.share_203d),
        percent(gift.share_206a),
    ]);
    splits.add_row(vec![
        "Return share".to_string(),
        "".to_string(),
        percent(returns.share_203d),
        percent(returns.share_206a),
    ]);

    let fb = &derived.fresh_bags;
    let mut bags = new_table();
    bags.set_header(vec!["Fresh bags", "Assigned", "Uncollected", "Rate"]);
    bags.add_row(rate_row("203D", &fb.route_203d));
    bags.add_row(rate_row("206A", &fb.route_206a));
    bags.add_row(rate_row("General", &fb.general));
    bags.add_row(rate_row("Standalone", &fb.standalone));

    let income = &derived.income;
    let mut pay = new_table();
    pay.set_header(vec!["Income", "Amount"]);
    pay.add_row(vec!["Gift".to_string(), currency(income.gift)]);
    pay.add_row(vec!["Returns".to_string(), currency(income.returns)]);
    pay.add_row(vec!["Fresh bags assigned".to_string(), currency(income.fb_assigned)]);
    pay.add_row(Row::from(vec![
        Cell::new("Fresh-bag deduction"),
        Cell::new(currency(-income.fb_deduct)).fg(Color::Red),
    ]));
    pay.add_row(vec!["Total".to_string(), currency(income.total)]);

    format!("{splits}\n{bags}\n{pay}")
}

pub fn render_day_report(
    raw: &RawSource,
    derived: &Derived,
    anomalies: &[Anomaly],
    mismatch: Option<&PartitionMismatch>,
) -> String {
    let mut out = String::new();
    out.push_str(&render_source_table(raw));
    out.push('\n');
    out.push_str(&render_derived_table(derived));
    if !anomalies.is_empty() {
        out.push_str("\nAnomalies:");
        for anomaly in anomalies {
            out.push_str(&format!("\n  {anomaly}"));
        }
    }
    if let Some(mismatch) = mismatch {
        out.push_str(&format!("\n{mismatch}"));
    }
    out
}

pub fn render_query_table(report: &QueryReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Group", "Metric", "Value"]);
    for metric in &report.metrics {
        let text = metric.result.render();
        let value_cell = match &metric.result {
            MetricResult::Value { value, negative, .. } if *negative && *value > 0.0 => {
                Cell::new(text).fg(Color::Red)
            }
            MetricResult::Value { value, .. } if *value < 0.0 => Cell::new(text).fg(Color::Red),
            _ => Cell::new(text),
        };
        table.add_row(Row::from(vec![
            Cell::new(metric.def.group.to_string()),
            Cell::new(metric.def.label),
            value_cell,
        ]));
    }
    format!(
        "{} ({}, route {}, {} day(s))\n{}",
        report.range,
        report.query.period.preset,
        report.query.route,
        report.days,
        table
    )
}

pub fn render_incentive_table(report: &IncentiveReport) -> String {
    let mut table = new_table();
    table.set_header(vec!["Category", "Rate", "Threshold", "Met", "Bonus"]);
    for (label, outcome) in [("General", &report.general), ("Standalone", &report.standalone)] {
        let met = if outcome.met {
            Cell::new("YES").fg(Color::Green)
        } else {
            Cell::new("NO").fg(Color::Red)
        };
        table.add_row(Row::from(vec![
            Cell::new(label),
            Cell::new(percent(outcome.rate)),
            Cell::new(percent(outcome.threshold)),
            met,
            Cell::new(currency(outcome.bonus)),
        ]));
    }
    format!(
        "{table}\nCompleted deliveries: {}\nNet income: {}",
        report.completed_deliveries,
        currency(report.net_income)
    )
}

pub fn render_catalog_table(defs: &[MetricDef]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Id", "Label", "Group", "Shape", "Format", "Routed"]);
    for def in defs {
        table.add_row(vec![
            def.id.to_string(),
            def.label.to_string(),
            def.group.to_string(),
            format!("{:?}", def.shape).to_lowercase(),
            format!("{:?}", def.format).to_lowercase(),
            if def.routed { "yes" } else { "no" }.to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_presets_table(presets: &[Preset]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Name", "Period", "Route", "Metrics"]);
    for preset in presets {
        let metrics = if preset.metrics.is_empty() {
            "all".to_string()
        } else {
            preset
                .metrics
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        table.add_row(vec![
            preset.name.clone(),
            preset.period.preset.to_string(),
            preset.route.to_string(),
            metrics,
        ]);
    }
    table.to_string()
}

pub fn render_daily_table(rows: &[DailyRow]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Date",
        "Gifts",
        "Returns",
        "FB 203D",
        "FB 206A",
        "FB general",
        "FB standalone",
        "Income",
    ]);
    for row in rows {
        let d = &row.derived;
        table.add_row(vec![
            row.date.to_string(),
            d.gift.day_total.to_string(),
            d.returns.day_total.to_string(),
            percent(d.fresh_bags.route_203d.rate),
            percent(d.fresh_bags.route_206a.rate),
            percent(d.fresh_bags.general.rate),
            percent(d.fresh_bags.standalone.rate),
            currency(d.income.total),
        ]);
    }
    table.to_string()
}
