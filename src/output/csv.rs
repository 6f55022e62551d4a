use anyhow::Result;

use crate::aggregate::DailyRow;
use crate::report::{MetricResult, QueryReport};
use crate::source::STAGE_FIELDS;
use crate::types::Route;

const COUNTER_COLUMNS: [&str; 6] = [
    "allocated",
    "completed",
    "cancelled",
    "transferred",
    "added",
    "first_round_remaining",
];

const DERIVED_COLUMNS: [&str; 38] = [
    "GIFT_REM_206A_R1",
    "GIFT_R1_203D",
    "GIFT_R1_206A",
    "GIFT_R2_NEW_TOTAL",
    "GIFT_R2_NEW_203D",
    "GIFT_R2_NEW_206A",
    "GIFT_DAY_TOTAL",
    "GIFT_DAY_203D",
    "GIFT_DAY_206A",
    "GIFT_SHARE_203D",
    "GIFT_SHARE_206A",
    "RET_R1_203D_ASSIGNED",
    "RET_R1_206A_ASSIGNED",
    "RET_R2_NEW_TOTAL",
    "RET_R2_NEW_203D",
    "RET_R2_NEW_206A",
    "RET_DAY_TOTAL",
    "RET_DAY_203D",
    "RET_DAY_206A",
    "RET_SHARE_203D",
    "RET_SHARE_206A",
    "FB_203D_ASSIGNED",
    "FB_203D_UNCOLLECTED",
    "FB_203D_RATE",
    "FB_206A_ASSIGNED",
    "FB_206A_UNCOLLECTED",
    "FB_206A_RATE",
    "FB_GEN_ASSIGNED",
    "FB_GEN_UNCOLLECTED",
    "FB_GEN_RATE",
    "FB_SOLO_ASSIGNED",
    "FB_SOLO_UNCOLLECTED",
    "FB_SOLO_RATE",
    "INCOME_GIFT",
    "INCOME_RET",
    "INCOME_FB_ASSIGNED",
    "INCOME_FB_DEDUCT",
    "INCOME_TOTAL",
];

fn ratio(value: f64) -> String {
    format!("{value:.6}")
}

/// One row per day: every stage field, the counters and folded log totals,
/// then the derived values. Enough to replay the engine externally: an
/// absent stage entry is an empty cell, never 0.
pub fn daily_rows_to_csv(rows: &[DailyRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = vec!["date".to_string()];
    header.extend(STAGE_FIELDS.iter().map(|name| name.to_string()));
    for route in Route::ALL {
        header.extend(
            COUNTER_COLUMNS
                .iter()
                .map(|column| format!("delivery_{}_{column}", route.as_slug())),
        );
    }
    header.extend(
        [
            "returns_allocated",
            "returns_completed",
            "fb_transferred",
            "fb_added",
            "log_numbered",
            "log_undelivered",
            "log_return_not_collected",
            "log_fb_failed_absent",
            "log_fb_failed_with_products",
        ]
        .iter()
        .map(|name| name.to_string()),
    );
    header.extend(DERIVED_COLUMNS.iter().map(|name| name.to_string()));
    writer.write_record(&header)?;

    for row in rows {
        let source = &row.source;
        let d = &row.derived;
        let mut record: Vec<String> = vec![row.date.to_string()];
        record.extend(
            row.raw
                .entries()
                .into_iter()
                .map(|(_, v)| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        for route in Route::ALL {
            let c = source.delivery(route);
            record.extend(
                [
                    c.allocated,
                    c.completed,
                    c.cancelled,
                    c.transferred,
                    c.added,
                    c.first_round_remaining,
                ]
                .iter()
                .map(|v| v.to_string()),
            );
        }
        let logs = &source.logs;
        record.extend(
            [
                source.returns.allocated,
                source.returns.completed,
                source.fresh_bags.transferred,
                source.fresh_bags.added,
                logs.numbered(),
                logs.undelivered(Route::R203D) + logs.undelivered(Route::R206A),
                logs.returns_not_collected(),
                logs.fresh_bag_failed_absent(),
                logs.fresh_bag_failed_with_products(),
            ]
            .iter()
            .map(|v| v.to_string()),
        );

        let g = &d.gift;
        let r = &d.returns;
        let fb = &d.fresh_bags;
        let income = &d.income;
        record.extend(
            [
                g.rem_206a_r1,
                g.r1_203d,
                g.r1_206a,
                g.r2_new_total,
                g.r2_new_203d,
                g.r2_new_206a,
                g.day_total,
                g.day_203d,
                g.day_206a,
            ]
            .iter()
            .map(|v| v.to_string()),
        );
        record.push(ratio(g.share_203d));
        record.push(ratio(g.share_206a));
        record.extend(
            [
                r.r1_203d_assigned,
                r.r1_206a_assigned,
                r.r2_new_total,
                r.r2_new_203d,
                r.r2_new_206a,
                r.day_total,
                r.day_203d,
                r.day_206a,
            ]
            .iter()
            .map(|v| v.to_string()),
        );
        record.push(ratio(r.share_203d));
        record.push(ratio(r.share_206a));
        for line in [&fb.route_203d, &fb.route_206a, &fb.general, &fb.standalone] {
            record.push(line.assigned.to_string());
            record.push(line.uncollected.to_string());
            record.push(ratio(line.rate));
        }
        record.extend(
            [
                income.gift,
                income.returns,
                income.fb_assigned,
                income.fb_deduct,
                income.total,
            ]
                .iter()
                .map(|v| v.to_string()),
        );
        writer.write_record(&record)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// Scalar metrics become one row; table metrics one row per label.
pub fn query_to_csv(report: &QueryReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "start", "end", "route", "group", "metric", "label", "value", "display",
    ])?;
    let start = report.range.start.to_string();
    let end = report.range.end.to_string();
    let route = report.query.route.to_string();
    for metric in &report.metrics {
        let group = metric.def.group.to_string();
        let id = metric.def.id.to_string();
        match &metric.result {
            MetricResult::Value { value, .. } => {
                writer.write_record([
                    start.as_str(),
                    end.as_str(),
                    route.as_str(),
                    group.as_str(),
                    id.as_str(),
                    metric.def.label,
                    &value.to_string(),
                    &metric.result.render(),
                ])?;
            }
            MetricResult::Table { format, rows, .. } => {
                for row in rows {
                    writer.write_record([
                        start.as_str(),
                        end.as_str(),
                        route.as_str(),
                        group.as_str(),
                        id.as_str(),
                        row.label.as_str(),
                        &row.value.to_string(),
                        &format.render(row.value),
                    ])?;
                }
            }
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
