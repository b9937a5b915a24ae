use serde::{Deserialize, Serialize};

pub const SEGMENTS: u32 = 20;
pub const WIN_INDEX: u32 = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Segment {
    Win,
    Dud,
}

impl Segment {
    pub fn label(self) -> &'static str {
        match self {
            Segment::Win => "WIN",
            Segment::Dud => "DUD",
        }
    }
}

/// Layout of the wheel: how many equal segments it has and which one pays out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WheelConfig {
    pub segments: u32,
    pub win_index: u32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            segments: SEGMENTS,
            win_index: WIN_INDEX,
        }
    }
}

impl WheelConfig {
    pub fn segment(&self, index: u32) -> Segment {
        if index == self.win_index {
            Segment::Win
        } else {
            Segment::Dud
        }
    }

    pub fn segments(&self) -> Vec<Segment> {
        (0..self.segments).map(|i| self.segment(i)).collect()
    }

    pub fn segment_angle(&self) -> f64 {
        360.0 / self.segments as f64
    }

    /// Probability of a win, one residue out of `segments`.
    pub fn win_odds(&self) -> f64 {
        1.0 / self.segments as f64
    }
}
