//! Forwarding strategies compared by the benchmark.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Upper bound of a wave level (percent).
pub const MAX_WAVE_LEVEL: u8 = 100;

/// How a peer picks the neighbors it forwards a fresh message to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "StrategyRepr")]
pub enum BroadcastStrategy {
    /// Relay to every eligible neighbor at every hop.
    #[default]
    Flood,
    /// Alternate by hop parity: even hops flood, odd hops relay to
    /// `level` percent of the eligible neighbors (at least one).
    Wave { level: u8 },
}

/// Unchecked wire form; levels are validated on conversion.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StrategyRepr {
    Flood,
    Wave { level: u8 },
}

impl TryFrom<StrategyRepr> for BroadcastStrategy {
    type Error = TypesError;

    fn try_from(repr: StrategyRepr) -> Result<Self, Self::Error> {
        match repr {
            StrategyRepr::Flood => Ok(Self::Flood),
            StrategyRepr::Wave { level } => Self::wave(level),
        }
    }
}

impl BroadcastStrategy {
    /// Construct a wave strategy, rejecting levels above 100.
    pub fn wave(level: u8) -> Result<Self, TypesError> {
        if level > MAX_WAVE_LEVEL {
            return Err(TypesError::WaveLevelOutOfRange(level as u32));
        }
        Ok(Self::Wave { level })
    }

    /// Number of neighbors a peer at `hop` forwards to when `eligible`
    /// neighbors are candidates.
    ///
    /// The hop counter is 0 at the first peer past the originator.
    pub fn fanout(&self, hop: u32, eligible: usize) -> usize {
        match *self {
            Self::Flood => eligible,
            Self::Wave { .. } if hop % 2 == 0 => eligible,
            Self::Wave { level } => {
                if eligible == 0 {
                    return 0;
                }
                let level = level.min(MAX_WAVE_LEVEL) as usize;
                (level * eligible / 100).max(1)
            }
        }
    }

    /// Whether a peer at `hop` forwards to a limited subset.
    pub fn is_selective(&self, hop: u32) -> bool {
        matches!(self, Self::Wave { .. }) && hop % 2 == 1
    }
}

impl fmt::Display for BroadcastStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flood => write!(f, "flood"),
            Self::Wave { level } => write!(f, "wave-{level}"),
        }
    }
}

/// Accepts `flood` and `wave-<level>` (also `wave:<level>`), case-insensitive.
impl FromStr for BroadcastStrategy {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower == "flood" {
            return Ok(Self::Flood);
        }
        let level = lower
            .strip_prefix("wave-")
            .or_else(|| lower.strip_prefix("wave:"))
            .ok_or_else(|| TypesError::UnknownStrategy(s.to_string()))?;
        let level: u32 = level
            .parse()
            .map_err(|_| TypesError::InvalidNumber(level.to_string()))?;
        if level > MAX_WAVE_LEVEL as u32 {
            return Err(TypesError::WaveLevelOutOfRange(level));
        }
        Ok(Self::Wave { level: level as u8 })
    }
}
