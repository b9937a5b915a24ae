use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, Rng, RngCore};

pub trait EntropySource: Send + Sync {
    fn fill_bytes(&self, buf: &mut [u8]);

    /// Uniform value in `min..=max`.
    fn gen_range(&self, min: u32, max: u32) -> u32;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }

    fn gen_range(&self, min: u32, max: u32) -> u32 {
        OsRng.gen_range(min..=max)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Repeats `pattern` across every requested buffer and always answers
/// `range_value` (clamped into the requested range).
#[derive(Debug, Clone)]
pub struct FixedEntropy {
    pub pattern: Vec<u8>,
    pub range_value: u32,
}

impl FixedEntropy {
    pub fn new(pattern: impl Into<Vec<u8>>, range_value: u32) -> Self {
        Self {
            pattern: pattern.into(),
            range_value,
        }
    }
}

impl EntropySource for FixedEntropy {
    fn fill_bytes(&self, buf: &mut [u8]) {
        if self.pattern.is_empty() {
            buf.fill(0);
            return;
        }
        for (dst, src) in buf.iter_mut().zip(self.pattern.iter().cycle()) {
            *dst = *src;
        }
    }

    fn gen_range(&self, min: u32, max: u32) -> u32 {
        self.range_value.clamp(min, max)
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
