pub mod fold;
pub mod incentive;
pub mod period;

use std::collections::BTreeMap;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::engine::{collection_rate, route_share, FreshBagProgress};
use crate::source::LogKind;
use crate::types::{Route, RouteScope};

pub use fold::{aggregate_period, aggregate_with_policy, daily_rows, DailyRow};
pub use incentive::{
    evaluate_incentives, IncentiveConfig, IncentiveOutcome, IncentiveReport, IncentiveRule,
};
pub use period::{
    resolve_range, DateRange, MonthlySettlement, Period, PeriodParseError, PeriodPreset,
    SettlementCalendar,
};

/// A quantity kept for both routes plus their combined total.
///
/// Route scoping reads one of the three fields; nothing is recomputed per
/// route.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Split<T> {
    pub all: T,
    pub route_203d: T,
    pub route_206a: T,
}

impl<T: Copy> Split<T> {
    pub fn pick(&self, scope: RouteScope) -> T {
        match scope {
            RouteScope::All => self.all,
            RouteScope::R203D => self.route_203d,
            RouteScope::R206A => self.route_206a,
        }
    }

    pub fn route(&self, route: Route) -> T {
        self.pick(route.into())
    }
}

impl Split<i64> {
    pub fn from_routes(route_203d: i64, route_206a: i64) -> Self {
        Self {
            all: route_203d + route_206a,
            route_203d,
            route_206a,
        }
    }

    pub fn add_route(&mut self, route: Route, quantity: i64) {
        self.all += quantity;
        match route {
            Route::R203D => self.route_203d += quantity,
            Route::R206A => self.route_206a += quantity,
        }
    }
}

impl AddAssign for Split<i64> {
    fn add_assign(&mut self, rhs: Self) {
        self.all += rhs.all;
        self.route_203d += rhs.route_203d;
        self.route_206a += rhs.route_206a;
    }
}

/// Summed assigned and uncollected fresh bags for one partition line.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionTotals {
    pub assigned: i64,
    pub uncollected: i64,
}

impl CollectionTotals {
    /// Weighted over the period: computed on the sums, never averaged.
    pub fn rate(&self) -> f64 {
        collection_rate(self.assigned, self.uncollected)
    }
}

impl AddAssign for CollectionTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.assigned += rhs.assigned;
        self.uncollected += rhs.uncollected;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomeTotals {
    pub gift: Split<i64>,
    pub returns: Split<i64>,
    pub fb_general: i64,
    pub fb_standalone: i64,
    pub fb_assigned: i64,
    pub fb_deduct_general: i64,
    pub fb_deduct_standalone: i64,
    pub fb_deduct: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryTotals {
    pub allocated: Split<i64>,
    pub completed: Split<i64>,
    pub cancelled: Split<i64>,
    /// Folded from the undelivered log.
    pub incomplete: Split<i64>,
    pub transferred: Split<i64>,
    pub added: Split<i64>,
    pub first_round_remaining: Split<i64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnTotals {
    pub allocated: i64,
    pub completed: i64,
    pub numbered: Split<i64>,
    pub not_collected: Split<i64>,
}

impl ReturnTotals {
    /// Display-only remainder; may be negative on inconsistent entry.
    pub fn incomplete(&self) -> i64 {
        self.allocated - self.completed - self.not_collected.all
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FreshBagTotals {
    pub route_203d: CollectionTotals,
    pub route_206a: CollectionTotals,
    pub general: CollectionTotals,
    pub standalone: CollectionTotals,
    pub progress: FreshBagProgress,
    pub transferred: i64,
    pub added: i64,
    pub failed_absent: Split<i64>,
    pub failed_with_products: Split<i64>,
}

impl FreshBagTotals {
    pub fn assigned(&self) -> Split<i64> {
        Split::from_routes(self.route_203d.assigned, self.route_206a.assigned)
    }

    pub fn uncollected(&self) -> Split<i64> {
        Split::from_routes(self.route_203d.uncollected, self.route_206a.uncollected)
    }

    pub fn route_rate(&self) -> Split<f64> {
        let all = CollectionTotals {
            assigned: self.assigned().all,
            uncollected: self.uncollected().all,
        };
        Split {
            all: all.rate(),
            route_203d: self.route_203d.rate(),
            route_206a: self.route_206a.rate(),
        }
    }
}

/// Side-log quantities bucketed by reason, then by route.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReasonBuckets {
    pub numbered: BTreeMap<String, Split<i64>>,
    pub undelivered: BTreeMap<String, Split<i64>>,
    pub return_not_collected: BTreeMap<String, Split<i64>>,
    pub fresh_bag_not_collected: BTreeMap<String, Split<i64>>,
}

impl ReasonBuckets {
    pub fn get(&self, kind: LogKind) -> &BTreeMap<String, Split<i64>> {
        match kind {
            LogKind::Numbered => &self.numbered,
            LogKind::Undelivered => &self.undelivered,
            LogKind::ReturnNotCollected => &self.return_not_collected,
            LogKind::FreshBagNotCollected => &self.fresh_bag_not_collected,
        }
    }

    pub fn add(&mut self, kind: LogKind, reason: &str, route: Route, quantity: i64) {
        let buckets = match kind {
            LogKind::Numbered => &mut self.numbered,
            LogKind::Undelivered => &mut self.undelivered,
            LogKind::ReturnNotCollected => &mut self.return_not_collected,
            LogKind::FreshBagNotCollected => &mut self.fresh_bag_not_collected,
        };
        buckets
            .entry(reason.to_string())
            .or_default()
            .add_route(route, quantity);
    }

    /// `(reason, quantity)` rows for one log kind under a route scope.
    pub fn rows(&self, kind: LogKind, scope: RouteScope) -> Vec<(String, i64)> {
        self.get(kind)
            .iter()
            .map(|(reason, split)| (reason.clone(), split.pick(scope)))
            .filter(|(_, quantity)| *quantity != 0)
            .collect()
    }
}

/// Everything summed over one date range.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Aggregate {
    pub range: Option<DateRange>,
    /// Days in range that had a stored Source.
    pub days: usize,
    pub gift_r1: Split<i64>,
    pub gift_r2: Split<i64>,
    pub gift_day: Split<i64>,
    pub returns_r1: Split<i64>,
    pub returns_r2: Split<i64>,
    pub returns_day: Split<i64>,
    pub fresh_bags: FreshBagTotals,
    pub income: IncomeTotals,
    pub deliveries: DeliveryTotals,
    pub returns: ReturnTotals,
    pub reasons: ReasonBuckets,
}

impl Aggregate {
    pub fn empty(range: DateRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    pub fn gift_share(&self) -> Split<f64> {
        share_of(&self.gift_day)
    }

    pub fn returns_share(&self) -> Split<f64> {
        share_of(&self.returns_day)
    }

    pub fn completed_deliveries(&self) -> i64 {
        self.deliveries.completed.all
    }
}

fn share_of(split: &Split<i64>) -> Split<f64> {
    Split {
        all: route_share(split.all, split.all),
        route_203d: route_share(split.route_203d, split.all),
        route_206a: route_share(split.route_206a, split.all),
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionTotals, ReasonBuckets, Split};
    use crate::source::LogKind;
    use crate::types::{Route, RouteScope};

    #[test]
    fn pick_reads_the_scoped_field() {
        let split = Split::from_routes(7, 3);
        assert_eq!(split.pick(RouteScope::All), 10);
        assert_eq!(split.pick(RouteScope::R203D), 7);
        assert_eq!(split.pick(RouteScope::R206A), 3);
        assert_eq!(split.route(Route::R206A), 3);
    }

    #[test]
    fn weighted_rate_uses_summed_counts() {
        let mut totals = CollectionTotals {
            assigned: 80,
            uncollected: 3,
        };
        totals += CollectionTotals {
            assigned: 30,
            uncollected: 2,
        };
        assert!((totals.rate() * 100.0 - 95.4545).abs() < 1e-3);
        assert_eq!(CollectionTotals::default().rate(), 0.0);
    }

    #[test]
    fn buckets_by_reason_and_route() {
        let mut buckets = ReasonBuckets::default();
        buckets.add(LogKind::ReturnNotCollected, "absent", Route::R203D, 2);
        buckets.add(LogKind::ReturnNotCollected, "absent", Route::R206A, 1);
        buckets.add(LogKind::ReturnNotCollected, "refused", Route::R206A, 4);

        let all = buckets.rows(LogKind::ReturnNotCollected, RouteScope::All);
        assert_eq!(all, vec![("absent".to_string(), 3), ("refused".to_string(), 4)]);

        let only_203d = buckets.rows(LogKind::ReturnNotCollected, RouteScope::R203D);
        assert_eq!(only_203d, vec![("absent".to_string(), 2)]);
    }
}
