use chrono::NaiveDate;
use courier_ledger::aggregate::{resolve_range, Period, PeriodPreset};
use courier_ledger::config::Config;
use courier_ledger::output::csv::daily_rows_to_csv;
use courier_ledger::report::{find_preset, run_query, MetricId, Query};
use courier_ledger::snapshot::{SnapshotStore, SourceStore};
use courier_ledger::source::{LogEntry, LogKind, RawSource};
use courier_ledger::types::{Route, RouteScope};

const REFERENCE_DAY: [(&str, u32); 23] = [
    ("A_FB_GEN", 20),
    ("A_FB_SOLO", 90),
    ("A_FB_206A", 30),
    ("A_GIFT_R1_TOTAL", 230),
    ("A_RET_R1_TOTAL", 30),
    ("B_FB_203D_UNVISITED", 5),
    ("B_GIFT_203D_REMAIN", 2),
    ("B_GIFT_TOTAL_REMAIN", 108),
    ("B_RET_203D_UNVISITED", 1),
    ("B_RET_206A_ASSIGNED", 10),
    ("C_GIFT_206A_REMAIN", 50),
    ("C_RET_206A_REMAIN", 4),
    ("C_FB_GEN_UNVISITED", 10),
    ("C_FB_SOLO_UNVISITED", 20),
    ("D_FB_GEN_INCREASE", 2),
    ("D_GIFT_TOTAL_NOW", 195),
    ("D_RET_TOTAL_NOW", 7),
    ("E_GIFT_REMAIN", 90),
    ("E_RET_REMAIN", 5),
    ("E_FB_203D_REMAIN", 3),
    ("F_FB_206A_REMAIN", 2),
    ("F_FB_GEN_REMAIN", 0),
    ("F_FB_SOLO_REMAIN", 8),
];

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn reference_day() -> RawSource {
    let mut raw = RawSource::default();
    for (name, value) in REFERENCE_DAY {
        raw.set_field(name, Some(value)).unwrap();
    }
    raw
}

fn seeded_store() -> SnapshotStore {
    let store = SnapshotStore::open_in_memory().unwrap();
    // Monday and Tuesday of the week of 2024-05-15, plus the following Monday.
    for d in [13, 14, 20] {
        store.save(date(d), &reference_day()).unwrap();
    }
    store
}

fn query_week(store: &SnapshotStore, route: RouteScope, metrics: Vec<MetricId>) -> Vec<f64> {
    let config = Config::default();
    let query = Query {
        period: Period::preset(PeriodPreset::Week),
        route,
        metrics,
    };
    let today = date(15);
    let range = resolve_range(&query.period, today, &config.settlement);
    let days = store.load_range(range.start, range.end).unwrap();
    let report = run_query(&query, &days, today, &config);
    assert_eq!(report.days, 2);
    report
        .metrics
        .iter()
        .map(|metric| metric.result.scalar().unwrap())
        .collect()
}

#[test]
fn single_reference_day_matches_hand_computed_income() {
    let store = seeded_store();
    let config = Config::default();
    let query = Query {
        period: Period::custom(Some(date(13)), None),
        route: RouteScope::All,
        metrics: vec![MetricId::IncomeTotal, MetricId::GiftTotal, MetricId::ReturnsTotal],
    };
    let days = store.load_range(date(13), date(13)).unwrap();
    let report = run_query(&query, &days, date(15), &config);
    let values: Vec<f64> = report
        .metrics
        .iter()
        .map(|metric| metric.result.scalar().unwrap())
        .collect();
    assert_eq!(values, vec![346_550.0, 373.0, 32.0]);
}

#[test]
fn week_query_sums_stored_days_in_range() {
    let store = seeded_store();
    let values = query_week(
        &store,
        RouteScope::All,
        vec![MetricId::GiftTotal, MetricId::IncomeTotal],
    );
    assert_eq!(values, vec![746.0, 693_100.0]);
}

#[test]
fn route_scope_selects_the_route_figure() {
    let store = seeded_store();
    let values = query_week(
        &store,
        RouteScope::R203D,
        vec![MetricId::GiftTotal, MetricId::FreshBagRate, MetricId::IncomeTotal],
    );
    assert_eq!(values[0], 454.0);
    assert!((values[1] - 0.9625).abs() < 1e-9);
    // income has no route dimension
    assert_eq!(values[2], 693_100.0);
}

#[test]
fn side_logs_flow_into_return_metrics() {
    let store = seeded_store();
    store
        .append_log(
            date(14),
            LogKind::ReturnNotCollected,
            LogEntry::new(Route::R206A, "absent", 2),
        )
        .unwrap();
    let values = query_week(&store, RouteScope::R206A, vec![MetricId::ReturnsNotCollected]);
    assert_eq!(values, vec![2.0]);
    let values = query_week(&store, RouteScope::R203D, vec![MetricId::ReturnsNotCollected]);
    assert_eq!(values, vec![0.0]);
}

#[test]
fn builtin_preset_runs_against_the_store() {
    let store = seeded_store();
    let config = Config::default();
    let preset = find_preset("week-routes", &config.presets).unwrap();
    let query = preset.query();
    let range = resolve_range(&query.period, date(15), &config.settlement);
    let days = store.load_range(range.start, range.end).unwrap();
    let report = run_query(&query, &days, date(15), &config);
    assert_eq!(report.range.start, date(13));
    assert_eq!(report.range.end, date(19));
    assert!(!report.metrics.is_empty());
}

#[test]
fn export_has_one_row_per_stored_day() {
    let store = seeded_store();
    let config = Config::default();
    let days = store.load_range(date(1), date(31)).unwrap();
    let range = resolve_range(
        &Period::preset(PeriodPreset::Settlement),
        date(15),
        &config.settlement,
    );
    let rows = courier_ledger::aggregate::daily_rows(&days, range, &config.rates);
    let csv = daily_rows_to_csv(&rows).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.contains("2024-05-20"));
    assert!(csv.contains("346550"));
}
