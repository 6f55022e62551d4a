use serde::{Deserialize, Serialize};

use crate::engine::freshbag::FreshBagSummary;
use crate::engine::gift::GiftSplit;
use crate::engine::returns::ReturnSplit;
use crate::types::Route;

/// Unit pay per assigned item, in whole currency units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateTable {
    #[serde(default = "default_route_203d")]
    pub route_203d: i64,
    #[serde(default = "default_route_206a")]
    pub route_206a: i64,
    #[serde(default = "default_fb_general")]
    pub fb_general: i64,
    #[serde(default = "default_fb_standalone")]
    pub fb_standalone: i64,
}

impl RateTable {
    pub fn route(&self, route: Route) -> i64 {
        match route {
            Route::R203D => self.route_203d,
            Route::R206A => self.route_206a,
        }
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            route_203d: default_route_203d(),
            route_206a: default_route_206a(),
            fb_general: default_fb_general(),
            fb_standalone: default_fb_standalone(),
        }
    }
}

fn default_route_203d() -> i64 {
    850
}

fn default_route_206a() -> i64 {
    750
}

fn default_fb_general() -> i64 {
    100
}

fn default_fb_standalone() -> i64 {
    200
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomeBreakdown {
    pub gift_203d: i64,
    pub gift_206a: i64,
    pub gift: i64,
    pub returns_203d: i64,
    pub returns_206a: i64,
    pub returns: i64,
    pub fb_general: i64,
    pub fb_standalone: i64,
    pub fb_assigned: i64,
    pub fb_deduct_general: i64,
    pub fb_deduct_standalone: i64,
    pub fb_deduct: i64,
    pub total: i64,
}

/// Pay is per assignment: day-total assigned quantities times unit rates.
/// Uncollected fresh bags claw back their pre-counted income.
pub fn income_breakdown(
    gift: &GiftSplit,
    returns: &ReturnSplit,
    fresh_bags: &FreshBagSummary,
    rates: &RateTable,
) -> IncomeBreakdown {
    let gift_203d = gift.day_203d * rates.route(Route::R203D);
    let gift_206a = gift.day_206a * rates.route(Route::R206A);
    let returns_203d = returns.day_203d * rates.route(Route::R203D);
    let returns_206a = returns.day_206a * rates.route(Route::R206A);

    let fb_general = fresh_bags.general.assigned * rates.fb_general;
    let fb_standalone = fresh_bags.standalone.assigned * rates.fb_standalone;
    let fb_deduct_general = fresh_bags.general.uncollected * rates.fb_general;
    let fb_deduct_standalone = fresh_bags.standalone.uncollected * rates.fb_standalone;

    let gift_total = gift_203d + gift_206a;
    let returns_total = returns_203d + returns_206a;
    let fb_assigned = fb_general + fb_standalone;
    let fb_deduct = fb_deduct_general + fb_deduct_standalone;

    IncomeBreakdown {
        gift_203d,
        gift_206a,
        gift: gift_total,
        returns_203d,
        returns_206a,
        returns: returns_total,
        fb_general,
        fb_standalone,
        fb_assigned,
        fb_deduct_general,
        fb_deduct_standalone,
        fb_deduct,
        total: gift_total + returns_total + fb_assigned - fb_deduct,
    }
}

#[cfg(test)]
mod tests {
    use super::{income_breakdown, RateTable};
    use crate::engine::freshbag::{FreshBagLine, FreshBagSummary};
    use crate::engine::gift::GiftSplit;
    use crate::engine::returns::ReturnSplit;

    #[test]
    fn multiplies_assigned_quantities_by_unit_rates() {
        let gift = GiftSplit {
            day_203d: 10,
            day_206a: 4,
            ..GiftSplit::default()
        };
        let returns = ReturnSplit {
            day_203d: 2,
            day_206a: 1,
            ..ReturnSplit::default()
        };
        let fresh_bags = FreshBagSummary {
            general: FreshBagLine::new(5, 1),
            standalone: FreshBagLine::new(3, 2),
            ..FreshBagSummary::default()
        };
        let income = income_breakdown(&gift, &returns, &fresh_bags, &RateTable::default());

        assert_eq!(income.gift, 10 * 850 + 4 * 750);
        assert_eq!(income.returns, 2 * 850 + 750);
        assert_eq!(income.fb_assigned, 5 * 100 + 3 * 200);
        assert_eq!(income.fb_deduct, 100 + 2 * 200);
        assert_eq!(
            income.total,
            income.gift + income.returns + income.fb_assigned - income.fb_deduct
        );
    }

    #[test]
    fn honours_custom_rates() {
        let rates = RateTable {
            route_203d: 1_000,
            ..RateTable::default()
        };
        let gift = GiftSplit {
            day_203d: 3,
            ..GiftSplit::default()
        };
        let income = income_breakdown(
            &gift,
            &ReturnSplit::default(),
            &FreshBagSummary::default(),
            &rates,
        );
        assert_eq!(income.gift_203d, 3_000);
        assert_eq!(income.total, 3_000);
    }
}
