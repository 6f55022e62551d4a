use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::engine::{
    income_breakdown, route_share, Derived, FreshBagLine, FreshBagSummary, RateTable,
};

/// What to do with negative derived quantities at the engine boundary.
///
/// Negative values only arise from out-of-order or inconsistent entry. The
/// formula layer never clamps; this policy is applied afterwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NegativePolicy {
    #[default]
    Preserve,
    Clamp,
}

impl NegativePolicy {
    pub fn apply(self, derived: Derived, rates: &RateTable) -> Derived {
        match self {
            Self::Preserve => derived,
            Self::Clamp => clamp_negatives(&derived, rates),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Negative,
    UncollectedExceedsAssigned,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Anomaly {
    pub field: &'static str,
    pub value: i64,
    pub kind: AnomalyKind,
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            AnomalyKind::Negative => write!(f, "{} is negative ({})", self.field, self.value),
            AnomalyKind::UncollectedExceedsAssigned => write!(
                f,
                "{} uncollected exceeds assigned by {}",
                self.field, self.value
            ),
        }
    }
}

fn quantities(derived: &Derived) -> [(&'static str, i64); 18] {
    let g = &derived.gift;
    let r = &derived.returns;
    [
        ("GIFT_REM_206A_R1", g.rem_206a_r1),
        ("GIFT_R1_203D", g.r1_203d),
        ("GIFT_R1_206A", g.r1_206a),
        ("GIFT_R2_NEW_TOTAL", g.r2_new_total),
        ("GIFT_R2_NEW_203D", g.r2_new_203d),
        ("GIFT_R2_NEW_206A", g.r2_new_206a),
        ("GIFT_DAY_203D", g.day_203d),
        ("GIFT_DAY_206A", g.day_206a),
        ("GIFT_DAY_TOTAL", g.day_total),
        ("RET_R1_203D_ASSIGNED", r.r1_203d_assigned),
        ("RET_R1_206A_ASSIGNED", r.r1_206a_assigned),
        ("RET_R2_NEW_TOTAL", r.r2_new_total),
        ("RET_R2_NEW_203D", r.r2_new_203d),
        ("RET_R2_NEW_206A", r.r2_new_206a),
        ("RET_DAY_203D", r.day_203d),
        ("RET_DAY_206A", r.day_206a),
        ("RET_DAY_TOTAL", r.day_total),
        ("FB_203D_ASSIGNED", derived.fresh_bags.route_203d.assigned),
    ]
}

/// Lists every suspicious derived value. Independent of [`NegativePolicy`].
pub fn find_anomalies(derived: &Derived) -> Vec<Anomaly> {
    let mut out: Vec<Anomaly> = quantities(derived)
        .into_iter()
        .filter(|(_, value)| *value < 0)
        .map(|(field, value)| Anomaly {
            field,
            value,
            kind: AnomalyKind::Negative,
        })
        .collect();

    let fb = &derived.fresh_bags;
    for (field, line) in [
        ("FB_203D", fb.route_203d),
        ("FB_206A", fb.route_206a),
        ("FB_GEN", fb.general),
        ("FB_SOLO", fb.standalone),
    ] {
        if line.uncollected > line.assigned {
            out.push(Anomaly {
                field,
                value: line.uncollected - line.assigned,
                kind: AnomalyKind::UncollectedExceedsAssigned,
            });
        }
    }
    out
}

/// Floors every quantity at 0 and recomputes the dependent totals, shares,
/// rates and income from the floored values.
pub fn clamp_negatives(derived: &Derived, rates: &RateTable) -> Derived {
    let floor = |v: i64| v.max(0);

    let mut gift = derived.gift;
    gift.rem_206a_r1_from_b = floor(gift.rem_206a_r1_from_b);
    gift.rem_206a_r1 = floor(gift.rem_206a_r1);
    gift.r1_203d = floor(gift.r1_203d);
    gift.r1_206a = floor(gift.r1_206a);
    gift.r2_new_203d = floor(gift.r2_new_203d);
    gift.r2_new_206a = floor(gift.r2_new_206a);
    gift.r2_new_total = gift.r2_new_203d + gift.r2_new_206a;
    gift.day_203d = gift.r1_203d + gift.r2_new_203d;
    gift.day_206a = gift.r1_206a + gift.r2_new_206a;
    gift.day_total = gift.day_203d + gift.day_206a;
    gift.share_203d = route_share(gift.day_203d, gift.day_total);
    gift.share_206a = route_share(gift.day_206a, gift.day_total);

    let mut returns = derived.returns;
    returns.rem_206a_r1 = floor(returns.rem_206a_r1);
    returns.r1_203d_assigned = floor(returns.r1_203d_assigned);
    returns.r1_206a_assigned = floor(returns.r1_206a_assigned);
    returns.r2_new_203d = floor(returns.r2_new_203d);
    returns.r2_new_206a = floor(returns.r2_new_206a);
    returns.r2_new_total = returns.r2_new_203d + returns.r2_new_206a;
    returns.day_203d = returns.r1_203d_assigned + returns.r2_new_203d;
    returns.day_206a = returns.r1_206a_assigned + returns.r2_new_206a;
    returns.day_total = returns.day_203d + returns.day_206a;
    returns.share_203d = route_share(returns.day_203d, returns.day_total);
    returns.share_206a = route_share(returns.day_206a, returns.day_total);

    let clamp_line = |line: FreshBagLine| {
        let assigned = floor(line.assigned);
        FreshBagLine::new(assigned, floor(line.uncollected).min(assigned))
    };
    let fb = &derived.fresh_bags;
    let fresh_bags = FreshBagSummary {
        route_203d: clamp_line(fb.route_203d),
        route_206a: clamp_line(fb.route_206a),
        general: clamp_line(fb.general),
        standalone: clamp_line(fb.standalone),
        progress: fb.progress,
    };

    let income = income_breakdown(&gift, &returns, &fresh_bags, rates);
    Derived {
        gift,
        returns,
        fresh_bags,
        income,
    }
}

/// Route and category fresh-bag totals that disagree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionMismatch {
    pub route_assigned: i64,
    pub category_assigned: i64,
    pub route_uncollected: i64,
    pub category_uncollected: i64,
}

impl Display for PartitionMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fresh-bag partitions differ: assigned {} by route vs {} by category, uncollected {} vs {}",
            self.route_assigned,
            self.category_assigned,
            self.route_uncollected,
            self.category_uncollected
        )
    }
}

/// Reports, without rejecting, a disagreement between the two partitions.
pub fn check_fresh_bag_partitions(summary: &FreshBagSummary) -> Option<PartitionMismatch> {
    let by_route = summary.route_total();
    let by_category = summary.category_total();
    if by_route.assigned == by_category.assigned && by_route.uncollected == by_category.uncollected
    {
        return None;
    }
    Some(PartitionMismatch {
        route_assigned: by_route.assigned,
        category_assigned: by_category.assigned,
        route_uncollected: by_route.uncollected,
        category_uncollected: by_category.uncollected,
    })
}
