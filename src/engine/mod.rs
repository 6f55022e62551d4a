pub mod freshbag;
pub mod gift;
pub mod income;
pub mod policy;
pub mod returns;

use serde::{Deserialize, Serialize};

use crate::source::Source;

pub use freshbag::{fresh_bag_rates, FreshBagLine, FreshBagProgress, FreshBagSummary};
pub use gift::{split_gifts, GiftSplit};
pub use income::{income_breakdown, IncomeBreakdown, RateTable};
pub use returns::{split_returns, ReturnSplit};

/// Every value computed from one day's Source. Never stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Derived {
    pub gift: GiftSplit,
    pub returns: ReturnSplit,
    pub fresh_bags: FreshBagSummary,
    pub income: IncomeBreakdown,
}

/// Runs the full formula network over one Source snapshot.
pub fn compute_derived(source: &Source, rates: &RateTable) -> Derived {
    let gift = split_gifts(source);
    let returns = split_returns(source);
    let fresh_bags = fresh_bag_rates(source);
    let income = income_breakdown(&gift, &returns, &fresh_bags, rates);
    Derived {
        gift,
        returns,
        fresh_bags,
        income,
    }
}

/// `(assigned - uncollected) / assigned`, or 0 when nothing was assigned.
pub fn collection_rate(assigned: i64, uncollected: i64) -> f64 {
    if assigned <= 0 {
        return 0.0;
    }
    (assigned - uncollected) as f64 / assigned as f64
}

pub fn route_share(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    part as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::{compute_derived, Derived, RateTable};
    use crate::source::{RawSource, Source, STAGE_FIELDS};

    const FIXTURE: [(&str, u32); 23] = [
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

    fn fixture_raw() -> RawSource {
        let mut raw = RawSource::default();
        for (name, value) in FIXTURE {
            raw.set_field(name, Some(value)).unwrap();
        }
        raw
    }

    fn derive(raw: &RawSource) -> Derived {
        compute_derived(&Source::from(raw), &RateTable::default())
    }

    fn assert_percent(actual_ratio: f64, expected_percent: f64) {
        let actual = actual_ratio * 100.0;
        assert!(
            (actual - expected_percent).abs() <= 0.01,
            "expected {expected_percent}%, got {actual}%"
        );
    }

    #[test]
    fn reproduces_reference_day() {
        let derived = derive(&fixture_raw());

        assert_eq!(derived.fresh_bags.route_203d.assigned, 80);
        assert_eq!(derived.gift.r1_203d, 124);
        assert_eq!(derived.gift.r1_206a, 106);
        assert_eq!(derived.returns.r1_203d_assigned, 20);
        assert_eq!(derived.returns.r1_206a_assigned, 10);
        assert_eq!(derived.gift.r2_new_total, 143);
        assert_eq!(derived.gift.r2_new_203d, 103);
        assert_eq!(derived.gift.r2_new_206a, 40);
        assert_eq!(derived.gift.day_total, 373);
        assert_eq!(derived.gift.day_203d, 227);
        assert_eq!(derived.gift.day_206a, 146);
        assert_eq!(derived.returns.r2_new_total, 2);
        assert_eq!(derived.returns.r2_new_203d, 1);
        assert_eq!(derived.returns.r2_new_206a, 1);
        assert_eq!(derived.returns.day_total, 32);
        assert_eq!(derived.returns.day_203d, 21);
        assert_eq!(derived.returns.day_206a, 11);

        assert_percent(derived.gift.share_203d, 60.85);
        assert_percent(derived.gift.share_206a, 39.14);
        assert_percent(derived.returns.share_203d, 65.62);
        assert_percent(derived.returns.share_206a, 34.38);

        assert_percent(derived.fresh_bags.route_203d.rate, 96.25);
        assert_percent(derived.fresh_bags.route_206a.rate, 93.33);
        assert_percent(derived.fresh_bags.general.rate, 100.0);
        assert_percent(derived.fresh_bags.standalone.rate, 87.78);
    }

    #[test]
    fn reference_day_income() {
        let income = derive(&fixture_raw()).income;
        assert_eq!(income.gift, 227 * 850 + 146 * 750);
        assert_eq!(income.returns, 21 * 850 + 11 * 750);
        assert_eq!(income.fb_assigned, 22 * 100 + 90 * 200);
        assert_eq!(income.fb_deduct, 11 * 200);
        assert_eq!(income.total, 346_550);
    }

    #[test]
    fn empty_source_yields_all_zero_derived() {
        let derived = derive(&RawSource::default());
        assert_eq!(derived, Derived::default());
        assert_eq!(derived.fresh_bags.general.rate, 0.0);
        assert_eq!(derived.gift.share_203d, 0.0);
    }

    #[test]
    fn recomputation_is_bit_identical() {
        let raw = fixture_raw();
        let first = derive(&raw);
        let second = derive(&raw);
        assert_eq!(first, second);
        assert_eq!(
            first.fresh_bags.standalone.rate.to_bits(),
            second.fresh_bags.standalone.rate.to_bits()
        );
    }

    #[test]
    fn entry_order_does_not_matter() {
        let mut reversed = RawSource::default();
        for (name, value) in FIXTURE.iter().rev() {
            reversed.set_field(name, Some(*value)).unwrap();
        }
        // overwrite one field twice; only the final value counts
        let mut rewritten = RawSource::default();
        rewritten.set_field("E_GIFT_REMAIN", Some(1)).unwrap();
        for (name, value) in FIXTURE {
            rewritten.set_field(name, Some(value)).unwrap();
        }
        let expected = derive(&fixture_raw());
        assert_eq!(derive(&reversed), expected);
        assert_eq!(derive(&rewritten), expected);
    }

    #[test]
    fn route_totals_are_conserved() {
        for (index, name) in STAGE_FIELDS.iter().enumerate() {
            let mut raw = fixture_raw();
            raw.set_field(name, Some((index as u32) * 7 % 50)).unwrap();
            let derived = derive(&raw);
            assert_eq!(
                derived.gift.day_203d + derived.gift.day_206a,
                derived.gift.day_total,
                "gift conservation after changing {name}"
            );
            assert_eq!(
                derived.returns.day_203d + derived.returns.day_206a,
                derived.returns.day_total,
                "return conservation after changing {name}"
            );
        }
    }
}
