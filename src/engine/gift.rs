use serde::{Deserialize, Serialize};

use crate::engine::route_share;
use crate::source::Source;

/// Gift (delivery) quantities split by route and round.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct GiftSplit {
    pub rem_206a_r1_from_b: i64,
    pub rem_206a_r1: i64,
    pub r1_203d: i64,
    pub r1_206a: i64,
    pub r2_new_total: i64,
    pub r2_new_203d: i64,
    pub r2_new_206a: i64,
    pub day_203d: i64,
    pub day_206a: i64,
    pub day_total: i64,
    pub share_203d: f64,
    pub share_206a: f64,
}

pub fn split_gifts(source: &Source) -> GiftSplit {
    let a = &source.a;
    let b = &source.b;

    // 206A is not observed at Stage B; infer it from the combined remainder.
    let rem_206a_r1_from_b = b.gift_total_remain - b.gift_203d_remain;
    let rem_206a_r1 = source.c.gift_206a_remain.unwrap_or(rem_206a_r1_from_b);

    let r1_203d = a.gift_r1_total - b.gift_total_remain + b.gift_203d_remain;
    let r1_206a = a.gift_r1_total - r1_203d;

    let known_outstanding = b.gift_203d_remain + rem_206a_r1;
    let r2_new_total = source.d.gift_total_now - known_outstanding;
    let r2_new_206a = source.e.gift_remain - rem_206a_r1;
    let r2_new_203d = r2_new_total - r2_new_206a;

    let day_203d = r1_203d + r2_new_203d;
    let day_206a = r1_206a + r2_new_206a;
    let day_total = a.gift_r1_total + r2_new_total;

    GiftSplit {
        rem_206a_r1_from_b,
        rem_206a_r1,
        r1_203d,
        r1_206a,
        r2_new_total,
        r2_new_203d,
        r2_new_206a,
        day_203d,
        day_206a,
        day_total,
        share_203d: route_share(day_203d, day_total),
        share_206a: route_share(day_206a, day_total),
    }
}
