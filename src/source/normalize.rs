use crate::source::{
    DeliveryCounters, FreshBagCounters, RawDeliveryCounters, RawSource, ReturnCounters, Source,
    StageA, StageB, StageC, StageD, StageE, StageF,
};

fn zero(value: Option<u32>) -> i64 {
    value.map(i64::from).unwrap_or(0)
}

fn delivery(raw: &RawDeliveryCounters) -> DeliveryCounters {
    DeliveryCounters {
        allocated: zero(raw.allocated),
        completed: zero(raw.completed),
        cancelled: zero(raw.cancelled),
        transferred: zero(raw.transferred),
        added: zero(raw.added),
        first_round_remaining: zero(raw.first_round_remaining),
    }
}

/// Ingest pass: every absent count becomes 0.
///
/// The two Stage C 206A remainders keep their presence so the engine can
/// prefer the explicit observation.
pub fn coalesce_to_zero(raw: &RawSource) -> Source {
    Source {
        a: StageA {
            gift_r1_total: zero(raw.a.gift_r1_total),
            ret_r1_total: zero(raw.a.ret_r1_total),
            fb_gen: zero(raw.a.fb_gen),
            fb_solo: zero(raw.a.fb_solo),
            fb_206a: zero(raw.a.fb_206a),
        },
        b: StageB {
            gift_total_remain: zero(raw.b.gift_total_remain),
            gift_203d_remain: zero(raw.b.gift_203d_remain),
            fb_203d_unvisited: zero(raw.b.fb_203d_unvisited),
            ret_203d_unvisited: zero(raw.b.ret_203d_unvisited),
            ret_206a_assigned: zero(raw.b.ret_206a_assigned),
        },
        c: StageC {
            gift_206a_remain: raw.c.gift_206a_remain.map(i64::from),
            ret_206a_remain: raw.c.ret_206a_remain.map(i64::from),
            fb_gen_unvisited: zero(raw.c.fb_gen_unvisited),
            fb_solo_unvisited: zero(raw.c.fb_solo_unvisited),
        },
        d: StageD {
            gift_total_now: zero(raw.d.gift_total_now),
            ret_total_now: zero(raw.d.ret_total_now),
            fb_gen_increase: zero(raw.d.fb_gen_increase),
            fb_gen_to_solo: zero(raw.d.fb_gen_to_solo),
            fb_solo_to_gen: zero(raw.d.fb_solo_to_gen),
        },
        e: StageE {
            gift_remain: zero(raw.e.gift_remain),
            ret_remain: zero(raw.e.ret_remain),
            fb_203d_remain: zero(raw.e.fb_203d_remain),
        },
        f: StageF {
            fb_206a_remain: zero(raw.f.fb_206a_remain),
            fb_gen_remain: zero(raw.f.fb_gen_remain),
            fb_solo_remain: zero(raw.f.fb_solo_remain),
        },
        delivery_203d: delivery(&raw.deliveries.r203d),
        delivery_206a: delivery(&raw.deliveries.r206a),
        returns: ReturnCounters {
            allocated: zero(raw.returns.allocated),
            completed: zero(raw.returns.completed),
        },
        fresh_bags: FreshBagCounters {
            transferred: zero(raw.fresh_bags.transferred),
            added: zero(raw.fresh_bags.added),
        },
        logs: raw.logs.clone(),
    }
}

impl From<&RawSource> for Source {
    fn from(value: &RawSource) -> Self {
        coalesce_to_zero(value)
    }
}
