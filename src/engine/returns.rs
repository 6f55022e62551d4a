use serde::{Deserialize, Serialize};

use crate::engine::route_share;
use crate::source::Source;

/// Return (pickup) quantities split by route and round.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ReturnSplit {
    pub r1_203d_assigned: i64,
    pub r1_206a_assigned: i64,
    pub rem_206a_r1: i64,
    pub r2_new_total: i64,
    pub r2_new_203d: i64,
    pub r2_new_206a: i64,
    pub day_203d: i64,
    pub day_206a: i64,
    pub day_total: i64,
    pub share_203d: f64,
    pub share_206a: f64,
}

/// Same shape as the gift split. 206A's round-1 share is observed directly
/// at Stage B, so the fallback remainder is that assignment.
pub fn split_returns(source: &Source) -> ReturnSplit {
    let r1_206a_assigned = source.b.ret_206a_assigned;
    let r1_203d_assigned = source.a.ret_r1_total - r1_206a_assigned;
    let rem_206a_r1 = source.c.ret_206a_remain.unwrap_or(r1_206a_assigned);

    let known_outstanding = source.b.ret_203d_unvisited + rem_206a_r1;
    let r2_new_total = source.d.ret_total_now - known_outstanding;
    let r2_new_206a = source.e.ret_remain - rem_206a_r1;
    let r2_new_203d = r2_new_total - r2_new_206a;

    let day_203d = r1_203d_assigned + r2_new_203d;
    let day_206a = r1_206a_assigned + r2_new_206a;
    let day_total = source.a.ret_r1_total + r2_new_total;

    ReturnSplit {
        r1_203d_assigned,
        r1_206a_assigned,
        rem_206a_r1,
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

#[cfg(test)]
mod tests {
    use super::split_returns;
    use crate::source::{RawSource, Source};

    #[test]
    fn splits_returns_across_rounds() {
        let mut raw = RawSource::default();
        raw.a.ret_r1_total = Some(30);
        raw.b.ret_203d_unvisited = Some(1);
        raw.b.ret_206a_assigned = Some(10);
        raw.c.ret_206a_remain = Some(4);
        raw.d.ret_total_now = Some(7);
        raw.e.ret_remain = Some(5);

        let split = split_returns(&Source::from(&raw));
        assert_eq!(split.r1_203d_assigned, 20);
        assert_eq!(split.r1_206a_assigned, 10);
        assert_eq!(split.r2_new_total, 2);
        assert_eq!(split.r2_new_203d, 1);
        assert_eq!(split.r2_new_206a, 1);
        assert_eq!(split.day_total, 32);
        assert_eq!(split.day_203d, 21);
        assert_eq!(split.day_206a, 11);
    }

    #[test]
    fn uses_stage_b_assignment_when_stage_c_missing() {
        let mut raw = RawSource::default();
        raw.a.ret_r1_total = Some(12);
        raw.b.ret_206a_assigned = Some(5);
        raw.d.ret_total_now = Some(9);
        raw.e.ret_remain = Some(6);

        let split = split_returns(&Source::from(&raw));
        assert_eq!(split.rem_206a_r1, 5);
        assert_eq!(split.r2_new_total, 4);
        assert_eq!(split.r2_new_206a, 1);
        assert_eq!(split.r2_new_203d, 3);
        assert_eq!(split.day_203d + split.day_206a, split.day_total);
    }
}
