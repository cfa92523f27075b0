//! # Volume Ramping
//!
//! Large volume jumps are never sent to the player in one go. Changes bigger
//! than [`RampConfig::threshold`] are broken into evenly spaced steps that
//! move monotonically from the current level to the target; small changes
//! are applied directly.
//!
//! This module only plans the ramp and parses user input. Sending the levels
//! happens in [`crate::device::DeviceControlClient::set_volume`].
//!
//! ## Examples
//!
//! ```
//! use blue::volume::{plan_ramp, RampConfig};
//! use std::time::Duration;
//!
//! let config = RampConfig { threshold: 5, step: 10, pause: Duration::ZERO };
//! assert_eq!(plan_ramp(20, 70, &config), vec![30, 40, 50, 60, 70]);
//! assert_eq!(plan_ramp(20, 24, &config), vec![24]);
//! ```

use crate::transport::DeviceError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Highest level the player accepts.
pub const MAX_LEVEL: u8 = 100;

/// Ramp tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampConfig {
    /// Changes of at most this size are applied in a single call
    pub threshold: u8,
    /// Distance between intermediate levels; 0 is treated as 1
    pub step: u8,
    /// Sleep between consecutive level changes
    pub pause: Duration,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            step: 2,
            pause: Duration::from_millis(50),
        }
    }
}

/// Clamp any integer into the valid level range.
#[must_use]
pub fn clamp_level(level: i64) -> u8 {
    u8::try_from(level.clamp(0, i64::from(MAX_LEVEL))).unwrap_or(MAX_LEVEL)
}

/// The ordered levels to send when moving from `current` to `target`.
///
/// Both ends are clamped to `0..=100` first. The result is a single element
/// for small changes (including no change at all, which still re-asserts the
/// level), and otherwise strictly monotonic and ending exactly on `target`.
#[must_use]
pub fn plan_ramp(current: u8, target: u8, config: &RampConfig) -> Vec<u8> {
    let current = current.min(MAX_LEVEL);
    let target = target.min(MAX_LEVEL);

    if current.abs_diff(target) <= config.threshold {
        return vec![target];
    }

    let step = config.step.max(1);
    let mut levels = Vec::new();
    let mut level = current;
    while level != target {
        level = if target > level {
            level.saturating_add(step).min(target)
        } else {
            level.saturating_sub(step).max(target)
        };
        levels.push(level);
    }
    levels
}

/// A requested level: absolute (`50`) or relative to the current one (`+10`, `-5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeTarget {
    Absolute(i64),
    Relative(i64),
}

impl VolumeTarget {
    /// The clamped level this target means when the player is at `current`.
    #[must_use]
    pub fn resolve(self, current: u8) -> u8 {
        match self {
            Self::Absolute(level) => clamp_level(level),
            Self::Relative(delta) => clamp_level(i64::from(current).saturating_add(delta)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid volume `{0}`: expected a level like 40, +10 or -5")]
pub struct VolumeParseError(String);

impl FromStr for VolumeTarget {
    type Err = VolumeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || VolumeParseError(s.to_string());

        if let Some(rest) = trimmed.strip_prefix('+') {
            let delta: i64 = rest.parse().map_err(|_| invalid())?;
            return Ok(Self::Relative(delta));
        }
        if trimmed.starts_with('-') {
            let delta: i64 = trimmed.parse().map_err(|_| invalid())?;
            return Ok(Self::Relative(delta));
        }
        trimmed.parse().map(Self::Absolute).map_err(|_| invalid())
    }
}

/// A completed volume change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeChange {
    pub from: u8,
    pub to: u8,
    /// Every level that was sent, in order
    pub steps: Vec<u8>,
}

impl fmt::Display for VolumeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "Volume stays at {}", self.to)
        } else {
            write!(f, "Volume {} -> {}", self.from, self.to)
        }
    }
}

#[derive(Debug, Error)]
pub enum VolumeError {
    /// Nothing was changed on the player.
    #[error("volume unchanged: {0}")]
    Device(#[source] DeviceError),

    /// The ramp stopped part way; the player is left at `reached`.
    #[error("volume ramp stopped at {reached} (target was {target})")]
    Interrupted {
        reached: u8,
        target: u8,
        #[source]
        source: DeviceError,
    },
}

impl VolumeError {
    /// Level the player is actually at after the failure, when known.
    #[must_use]
    pub const fn reached(&self) -> Option<u8> {
        match self {
            Self::Device(_) => None,
            Self::Interrupted { reached, .. } => Some(*reached),
        }
    }
}
