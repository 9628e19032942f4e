use std::fmt;

use crate::Ranged;
use crate::xfm::{Level, PitchLevel};

/// Envelope stage.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Attack, Stage::Decay, Stage::Sustain, Stage::Release];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Stage::Attack => "A",
            Stage::Decay => "D",
            Stage::Sustain => "S",
            Stage::Release => "R",
        })
    }
}

pub type Times = [Level; 4];

/// Envelope generator with a time and a level for each stage.
/// The levels of an operator envelope are 0...127,
/// the levels of the pitch envelope are -48...+48.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Envelope<L> {
    pub times: Times,
    pub levels: [L; 4],
}

pub type OperatorEnvelope = Envelope<Level>;
pub type PitchEnvelope = Envelope<PitchLevel>;

impl<L: Ranged + Copy> Envelope<L> {
    /// Makes a new EG with times and levels.
    pub fn new_time_level(times: Times, levels: [L; 4]) -> Self {
        Self { times, levels }
    }

    pub fn new_time_level_int(times: [i32; 4], levels: [i32; 4]) -> Self {
        Self {
            times: times.map(Level::new),
            levels: levels.map(L::new),
        }
    }

    pub fn time(&self, stage: Stage) -> Level {
        self.times[stage.index()]
    }

    pub fn level(&self, stage: Stage) -> L {
        self.levels[stage.index()]
    }

    /// Makes a new EG with random times and levels.
    pub fn random() -> Self {
        Self {
            times: [Level::random(), Level::random(), Level::random(), Level::random()],
            levels: [L::random(), L::random(), L::random(), L::random()],
        }
    }
}

impl OperatorEnvelope {
    /// Creates a new EG with the default operator envelope settings.
    pub fn new() -> Self {
        Envelope::new_time_level_int([0, 0, 0, 63], [0, 63, 127, 0])
    }
}

impl Default for OperatorEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchEnvelope {
    /// Creates a flat pitch envelope.
    pub fn new() -> Self {
        Envelope::new_time_level_int([0; 4], [0; 4])
    }
}

impl Default for PitchEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Ranged + Copy> fmt::Display for Envelope<L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let stages: Vec<String> = Stage::ALL.iter()
            .map(|stage| format!("{}: T={} L={}",
                stage, self.time(*stage).value(), self.level(*stage).value()))
            .collect();
        write!(f, "{}", stages.join(" "))
    }
}
