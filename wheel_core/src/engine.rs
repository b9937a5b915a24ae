use serde::{Deserialize, Serialize};

use crate::{rng::SpinSeeds, wheel::WheelConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub roll: u32,
    pub is_win: bool,
    pub landing_segment: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub seeds: SpinSeeds,
    pub hash: String,
    pub hash_int: u32,
    pub roll: u32,
    pub is_win: bool,
    pub landing_segment: u32,
}

/// Map a hash value onto the wheel.
///
/// A win is `hash_int % segments == 0`. Losses pick among the remaining
/// `segments - 1` positions and skip over the win segment, so a loss can
/// never come to rest on it.
pub fn decide(hash_int: u32, config: &WheelConfig) -> Decision {
    let roll = hash_int % config.segments;
    let is_win = roll == 0;
    let landing_segment = if is_win {
        config.win_index
    } else {
        let dud = hash_int % (config.segments - 1);
        if dud >= config.win_index {
            dud + 1
        } else {
            dud
        }
    };
    Decision {
        roll,
        is_win,
        landing_segment,
    }
}

pub fn spin_with_seeds(seeds: SpinSeeds, config: &WheelConfig) -> SpinOutcome {
    let digest = seeds.digest();
    let hash_int = crate::rng::hash_prefix_u32(&digest);
    let decision = decide(hash_int, config);
    SpinOutcome {
        seeds,
        hash: hex::encode(digest),
        hash_int,
        roll: decision.roll,
        is_win: decision.is_win,
        landing_segment: decision.landing_segment,
    }
}

/// Verify that a reported result matches what the seeds produce.
pub fn verify_outcome(
    seeds: &SpinSeeds,
    config: &WheelConfig,
    is_win: bool,
    landing_segment: u32,
) -> bool {
    let decision = decide(seeds.hash_int(), config);
    decision.is_win == is_win && decision.landing_segment == landing_segment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wheel::WIN_INDEX;

    #[test]
    fn test_spin_deterministic() {
        let config = WheelConfig::default();
        let out1 = spin_with_seeds(SpinSeeds::new("server", "client", 1), &config);
        let out2 = spin_with_seeds(SpinSeeds::new("server", "client", 1), &config);
        assert_eq!(out1, out2);
    }

    #[test]
    fn zero_hash_wins() {
        let d = decide(0, &WheelConfig::default());
        assert_eq!(d.roll, 0);
        assert!(d.is_win);
        assert_eq!(d.landing_segment, WIN_INDEX);
    }

    #[test]
    fn one_lands_on_first_dud() {
        let d = decide(1, &WheelConfig::default());
        assert_eq!(d.roll, 1);
        assert!(!d.is_win);
        assert_eq!(d.landing_segment, 1);
    }

    #[test]
    fn duds_at_or_past_win_index_shift_up() {
        let config = WheelConfig::default();
        // 7 % 19 == 7 -> skips to 8
        assert_eq!(decide(7, &config).landing_segment, 8);
        // 18 % 19 == 18 -> 19, the last segment
        assert_eq!(decide(18, &config).landing_segment, 19);
        // 6 % 19 == 6 stays below the win index
        assert_eq!(decide(6, &config).landing_segment, 6);
    }

    #[test]
    fn every_residue_respects_win_segment() {
        let config = WheelConfig::default();
        // 380 = lcm(20, 19) covers every pair of residues
        for h in 0..380u32 {
            let d = decide(h, &config);
            assert!(d.landing_segment < config.segments);
            assert_eq!(d.is_win, d.landing_segment == WIN_INDEX, "hash_int {h}");
        }
        let top = decide(u32::MAX, &config);
        assert_eq!(top.is_win, top.landing_segment == WIN_INDEX);
    }

    #[test]
    fn known_seeds_lose_on_sixteen() {
        let out = spin_with_seeds(
            SpinSeeds::new("server", "client", 1_700_000_000_000),
            &WheelConfig::default(),
        );
        assert_eq!(out.roll, 2);
        assert!(!out.is_win);
        // 2080276062 % 19 == 15, shifted past the win index
        assert_eq!(out.landing_segment, 16);
        assert!(verify_outcome(&out.seeds, &WheelConfig::default(), false, 16));
        assert!(!verify_outcome(&out.seeds, &WheelConfig::default(), true, WIN_INDEX));
    }

    #[test]
    fn known_seeds_win() {
        let out = spin_with_seeds(SpinSeeds::new("server", "client", 53), &WheelConfig::default());
        assert_eq!(
            out.hash,
            "73a0b39c992d10ae73201c48507b1a23b314b0431a2ce3dd722be23062e85e42"
        );
        assert!(out.is_win);
        assert_eq!(out.landing_segment, WIN_INDEX);
    }
}
