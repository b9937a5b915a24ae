pub mod engine;
pub mod entropy;
pub mod presentation;
pub mod rng;
pub mod role;
pub mod wheel;

pub use crate::engine::{decide, spin_with_seeds, verify_outcome, Decision, SpinOutcome};
pub use crate::entropy::{Clock, EntropySource, FixedClock, FixedEntropy, OsEntropy, SystemClock};
pub use crate::presentation::{draw_full_spins, landing_rotation, segment_under_pointer, SPIN_ANIMATION};
pub use crate::rng::{derive_hash_hex, hash_prefix_u32, SeedError, SpinSeeds};
pub use crate::role::{Role, UnknownRole};
pub use crate::wheel::{Segment, WheelConfig, SEGMENTS, WIN_INDEX};
