use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{Aggregate, CollectionTotals, DateRange, Split};
use crate::engine::policy::NegativePolicy;
use crate::engine::{compute_derived, Derived, FreshBagLine, RateTable};
use crate::source::logs::{REASON_ABSENT, REASON_WITH_PRODUCTS};
use crate::source::{coalesce_to_zero, LogKind, RawSource, Source};
use crate::types::Route;

/// One stored day with its recomputed values. `raw` keeps absent entries
/// absent so an export can be replayed.
#[derive(Debug, Clone, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub raw: RawSource,
    pub source: Source,
    pub derived: Derived,
}

fn totals(line: &FreshBagLine) -> CollectionTotals {
    CollectionTotals {
        assigned: line.assigned,
        uncollected: line.uncollected,
    }
}

impl Aggregate {
    /// Adds one day's Source and Derived values.
    pub fn absorb(&mut self, source: &Source, derived: &Derived) {
        self.days += 1;

        let gift = &derived.gift;
        self.gift_r1 += Split::from_routes(gift.r1_203d, gift.r1_206a);
        self.gift_r2 += Split::from_routes(gift.r2_new_203d, gift.r2_new_206a);
        self.gift_day += Split::from_routes(gift.day_203d, gift.day_206a);

        let returns = &derived.returns;
        self.returns_r1 += Split::from_routes(returns.r1_203d_assigned, returns.r1_206a_assigned);
        self.returns_r2 += Split::from_routes(returns.r2_new_203d, returns.r2_new_206a);
        self.returns_day += Split::from_routes(returns.day_203d, returns.day_206a);

        let fb = &derived.fresh_bags;
        let fresh = &mut self.fresh_bags;
        fresh.route_203d += totals(&fb.route_203d);
        fresh.route_206a += totals(&fb.route_206a);
        fresh.general += totals(&fb.general);
        fresh.standalone += totals(&fb.standalone);
        fresh.progress.b_203d_unvisited += fb.progress.b_203d_unvisited;
        fresh.progress.c_general_unvisited += fb.progress.c_general_unvisited;
        fresh.progress.c_standalone_unvisited += fb.progress.c_standalone_unvisited;
        fresh.transferred += source.fresh_bags.transferred;
        fresh.added += source.fresh_bags.added;

        let income = &derived.income;
        let sum = &mut self.income;
        sum.gift += Split::from_routes(income.gift_203d, income.gift_206a);
        sum.returns += Split::from_routes(income.returns_203d, income.returns_206a);
        sum.fb_general += income.fb_general;
        sum.fb_standalone += income.fb_standalone;
        sum.fb_assigned += income.fb_assigned;
        sum.fb_deduct_general += income.fb_deduct_general;
        sum.fb_deduct_standalone += income.fb_deduct_standalone;
        sum.fb_deduct += income.fb_deduct;
        sum.total += income.total;

        for route in Route::ALL {
            let counters = source.delivery(route);
            let deliveries = &mut self.deliveries;
            deliveries.allocated.add_route(route, counters.allocated);
            deliveries.completed.add_route(route, counters.completed);
            deliveries.cancelled.add_route(route, counters.cancelled);
            deliveries.transferred.add_route(route, counters.transferred);
            deliveries.added.add_route(route, counters.added);
            deliveries
                .first_round_remaining
                .add_route(route, counters.first_round_remaining);
        }
        self.returns.allocated += source.returns.allocated;
        self.returns.completed += source.returns.completed;

        // counters derived from the logs are folded here, never stored
        for kind in LogKind::ALL {
            for entry in source.logs.entries(kind) {
                let quantity = i64::from(entry.quantity);
                self.reasons.add(kind, &entry.reason, entry.route, quantity);
                match kind {
                    LogKind::Numbered => self.returns.numbered.add_route(entry.route, quantity),
                    LogKind::Undelivered => {
                        self.deliveries.incomplete.add_route(entry.route, quantity)
                    }
                    LogKind::ReturnNotCollected => {
                        self.returns.not_collected.add_route(entry.route, quantity)
                    }
                    LogKind::FreshBagNotCollected => {
                        let fresh = &mut self.fresh_bags;
                        if entry.reason.eq_ignore_ascii_case(REASON_ABSENT) {
                            fresh.failed_absent.add_route(entry.route, quantity);
                        } else if entry.reason.eq_ignore_ascii_case(REASON_WITH_PRODUCTS) {
                            fresh.failed_with_products.add_route(entry.route, quantity);
                        }
                    }
                }
            }
        }
    }
}

/// Folds every day in `range` with negative values preserved.
pub fn aggregate_period(
    days: &[(NaiveDate, RawSource)],
    range: DateRange,
    rates: &RateTable,
) -> Aggregate {
    aggregate_with_policy(days, range, rates, NegativePolicy::Preserve)
}

/// Runs the engine per day in `range` and sums the results. Rates on the
/// result are computed from the sums.
pub fn aggregate_with_policy(
    days: &[(NaiveDate, RawSource)],
    range: DateRange,
    rates: &RateTable,
    policy: NegativePolicy,
) -> Aggregate {
    let mut aggregate = Aggregate::empty(range);
    for (date, raw) in days.iter().filter(|(date, _)| range.contains(*date)) {
        let source = coalesce_to_zero(raw);
        let derived = policy.apply(compute_derived(&source, rates), rates);
        debug!(%date, income = derived.income.total, "folding day");
        aggregate.absorb(&source, &derived);
    }
    debug!(
        range = %range,
        days = aggregate.days,
        income = aggregate.income.total,
        "aggregated period"
    );
    aggregate
}

/// Per-day Source and Derived values for the days in `range`, by date.
pub fn daily_rows(
    days: &[(NaiveDate, RawSource)],
    range: DateRange,
    rates: &RateTable,
) -> Vec<DailyRow> {
    let mut rows: Vec<DailyRow> = days
        .iter()
        .filter(|(date, _)| range.contains(*date))
        .map(|(date, raw)| {
            let source = coalesce_to_zero(raw);
            let derived = compute_derived(&source, rates);
            DailyRow {
                date: *date,
                raw: raw.clone(),
                source,
                derived,
            }
        })
        .collect();
    rows.sort_by_key(|row| row.date);
    rows
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{aggregate_period, aggregate_with_policy, daily_rows};
    use crate::aggregate::DateRange;
    use crate::engine::policy::NegativePolicy;
    use crate::engine::RateTable;
    use crate::source::{LogEntry, LogKind, RawSource};
    use crate::types::{Route, RouteScope};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    /// A day whose 203D fresh-bag line is `(assigned, uncollected)`.
    fn fresh_bag_day(assigned: u32, uncollected: u32) -> RawSource {
        let mut raw = RawSource::default();
        raw.a.fb_solo = Some(assigned);
        raw.e.fb_203d_remain = Some(uncollected);
        raw
    }

    #[test]
    fn weighted_rate_is_not_an_average_of_daily_rates() {
        let days = vec![
            (date(1), fresh_bag_day(80, 3)),
            (date(2), fresh_bag_day(30, 2)),
        ];
        let aggregate =
            aggregate_period(&days, DateRange::new(date(1), date(2)), &RateTable::default());

        assert_eq!(aggregate.days, 2);
        assert_eq!(aggregate.fresh_bags.route_203d.assigned, 110);
        assert_eq!(aggregate.fresh_bags.route_203d.uncollected, 5);
        let rate = aggregate.fresh_bags.route_rate().route_203d * 100.0;
        assert!((rate - 95.45).abs() < 0.01, "got {rate}");
    }

    #[test]
    fn skips_days_outside_the_range() {
        let days = vec![
            (date(1), fresh_bag_day(10, 0)),
            (date(5), fresh_bag_day(20, 0)),
            (date(9), fresh_bag_day(40, 0)),
        ];
        let aggregate =
            aggregate_period(&days, DateRange::new(date(2), date(8)), &RateTable::default());
        assert_eq!(aggregate.days, 1);
        assert_eq!(aggregate.fresh_bags.route_203d.assigned, 20);
    }

    #[test]
    fn empty_range_has_zero_rates() {
        let aggregate = aggregate_period(&[], DateRange::single(date(1)), &RateTable::default());
        assert_eq!(aggregate.days, 0);
        assert_eq!(aggregate.fresh_bags.general.rate(), 0.0);
        assert_eq!(aggregate.gift_share().route_203d, 0.0);
        assert_eq!(aggregate.income.total, 0);
    }

    #[test]
    fn folds_log_counters_by_route() {
        let mut raw = RawSource::default();
        raw.deliveries.r203d.completed = Some(40);
        raw.deliveries.r206a.completed = Some(25);
        raw.returns.allocated = Some(12);
        raw.returns.completed = Some(8);
        raw.logs
            .append(LogKind::Undelivered, LogEntry::new(Route::R206A, "closed", 2));
        raw.logs.append(
            LogKind::ReturnNotCollected,
            LogEntry::new(Route::R203D, "absent", 3),
        );
        raw.logs.append(
            LogKind::FreshBagNotCollected,
            LogEntry::new(Route::R203D, "with_products", 1),
        );
        raw.logs.append(
            LogKind::FreshBagNotCollected,
            LogEntry::new(Route::R206A, "absent", 2),
        );

        let aggregate =
            aggregate_period(&[(date(3), raw)], DateRange::single(date(3)), &RateTable::default());
        assert_eq!(aggregate.completed_deliveries(), 65);
        assert_eq!(aggregate.deliveries.incomplete.pick(RouteScope::R206A), 2);
        assert_eq!(aggregate.deliveries.incomplete.pick(RouteScope::R203D), 0);
        assert_eq!(aggregate.returns.not_collected.all, 3);
        assert_eq!(aggregate.returns.incomplete(), 1);
        assert_eq!(aggregate.fresh_bags.failed_absent.route_206a, 2);
        assert_eq!(aggregate.fresh_bags.failed_with_products.route_203d, 1);
        assert_eq!(
            aggregate.reasons.rows(LogKind::ReturnNotCollected, RouteScope::All),
            vec![("absent".to_string(), 3)]
        );
    }

    #[test]
    fn clamp_policy_applies_per_day() {
        let mut raw = RawSource::default();
        raw.a.gift_r1_total = Some(10);
        raw.b.gift_total_remain = Some(25);
        let days = vec![(date(4), raw)];
        let range = DateRange::single(date(4));

        let preserved = aggregate_period(&days, range, &RateTable::default());
        assert!(preserved.gift_r1.route_203d < 0);

        let clamped =
            aggregate_with_policy(&days, range, &RateTable::default(), NegativePolicy::Clamp);
        assert_eq!(clamped.gift_r1.route_203d, 0);
    }

    #[test]
    fn daily_rows_are_sorted_by_date() {
        let days = vec![
            (date(7), fresh_bag_day(5, 1)),
            (date(2), fresh_bag_day(9, 0)),
        ];
        let rows = daily_rows(&days, DateRange::new(date(1), date(10)), &RateTable::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2));
        assert_eq!(rows[1].derived.fresh_bags.route_203d.uncollected, 1);
    }
}
