use serde::{Deserialize, Serialize};

use crate::engine::collection_rate;
use crate::source::Source;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FreshBagLine {
    pub assigned: i64,
    pub uncollected: i64,
    pub rate: f64,
}

impl FreshBagLine {
    pub fn new(assigned: i64, uncollected: i64) -> Self {
        Self {
            assigned,
            uncollected,
            rate: collection_rate(assigned, uncollected),
        }
    }
}

/// Unvisited counts seen mid-day. Reported only; rates use final figures.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FreshBagProgress {
    pub b_203d_unvisited: i64,
    pub c_general_unvisited: i64,
    pub c_standalone_unvisited: i64,
}

/// Fresh-bag assignment and collection, partitioned by route and by category.
///
/// The two partitions come from different operator fields and are not
/// expected to add up to the same totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FreshBagSummary {
    pub route_203d: FreshBagLine,
    pub route_206a: FreshBagLine,
    pub general: FreshBagLine,
    pub standalone: FreshBagLine,
    pub progress: FreshBagProgress,
}

impl FreshBagSummary {
    pub fn route_total(&self) -> FreshBagLine {
        FreshBagLine::new(
            self.route_203d.assigned + self.route_206a.assigned,
            self.route_203d.uncollected + self.route_206a.uncollected,
        )
    }

    pub fn category_total(&self) -> FreshBagLine {
        FreshBagLine::new(
            self.general.assigned + self.standalone.assigned,
            self.general.uncollected + self.standalone.uncollected,
        )
    }
}

pub fn fresh_bag_rates(source: &Source) -> FreshBagSummary {
    let a = &source.a;
    let d = &source.d;

    let assigned_206a = a.fb_206a;
    let assigned_203d = a.fb_gen + a.fb_solo - assigned_206a;

    // 203D closes out at Stage E, 206A at Stage F.
    let route_203d = FreshBagLine::new(assigned_203d, source.e.fb_203d_remain);
    let route_206a = FreshBagLine::new(assigned_206a, source.f.fb_206a_remain);

    let general_assigned = a.fb_gen + d.fb_gen_increase + d.fb_solo_to_gen - d.fb_gen_to_solo;
    let standalone_assigned = a.fb_solo + d.fb_gen_to_solo - d.fb_solo_to_gen;

    // The 203D close-out remainder is entered without a category and is
    // booked against standalone.
    let general = FreshBagLine::new(general_assigned, source.f.fb_gen_remain);
    let standalone = FreshBagLine::new(
        standalone_assigned,
        source.f.fb_solo_remain + source.e.fb_203d_remain,
    );

    FreshBagSummary {
        route_203d,
        route_206a,
        general,
        standalone,
        progress: FreshBagProgress {
            b_203d_unvisited: source.b.fb_203d_unvisited,
            c_general_unvisited: source.c.fb_gen_unvisited,
            c_standalone_unvisited: source.c.fb_solo_unvisited,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{fresh_bag_rates, FreshBagLine};
    use crate::source::{RawSource, Source};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn computes_route_and_category_rates() {
        let mut raw = RawSource::default();
        raw.a.fb_gen = Some(20);
        raw.a.fb_solo = Some(90);
        raw.a.fb_206a = Some(30);
        raw.d.fb_gen_increase = Some(2);
        raw.e.fb_203d_remain = Some(3);
        raw.f.fb_206a_remain = Some(2);
        raw.f.fb_gen_remain = Some(0);
        raw.f.fb_solo_remain = Some(8);

        let summary = fresh_bag_rates(&Source::from(&raw));
        assert_eq!(summary.route_203d.assigned, 80);
        assert!(close(summary.route_203d.rate, 0.9625));
        assert!(close(summary.route_206a.rate, 28.0 / 30.0));
        assert_eq!(summary.general.assigned, 22);
        assert!(close(summary.general.rate, 1.0));
        assert_eq!(summary.standalone.uncollected, 11);
        assert!(close(summary.standalone.rate, 79.0 / 90.0));
    }

    #[test]
    fn conversions_move_assignment_between_categories() {
        let mut raw = RawSource::default();
        raw.a.fb_gen = Some(10);
        raw.a.fb_solo = Some(10);
        raw.d.fb_gen_to_solo = Some(4);
        raw.d.fb_solo_to_gen = Some(1);

        let summary = fresh_bag_rates(&Source::from(&raw));
        assert_eq!(summary.general.assigned, 7);
        assert_eq!(summary.standalone.assigned, 13);
        assert_eq!(summary.category_total().assigned, 20);
    }

    #[test]
    fn zero_assignment_has_zero_rate() {
        let line = FreshBagLine::new(0, 0);
        assert_eq!(line.rate, 0.0);
        let negative = FreshBagLine::new(-3, 1);
        assert_eq!(negative.rate, 0.0);
    }
}
