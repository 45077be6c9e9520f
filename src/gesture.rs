//! Turning a horizontal drag into a decision.
//!
//! Classification and tilt both read the same offset but are otherwise
//! unrelated: tilt is cosmetic and never feeds back into a decision.

use crate::models::Direction;

/// Offset span over which the card tilts from one extreme to the other.
pub const TILT_RANGE: f64 = 200.0;
/// Maximum tilt in degrees, reached at `±TILT_RANGE`.
pub const MAX_TILT_DEG: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Accept,
    Reject,
    /// Released inside the dead zone; the card springs back.
    None,
}

impl Gesture {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Gesture::Accept => Some(Direction::Accept),
            Gesture::Reject => Some(Direction::Reject),
            Gesture::None => None,
        }
    }
}

/// Strictly beyond the threshold on either side is a decision; exactly on
/// it is not. NaN never decides anything.
pub fn classify(offset: f64, threshold: f64) -> Gesture {
    if offset > threshold {
        Gesture::Accept
    } else if offset < -threshold {
        Gesture::Reject
    } else {
        Gesture::None
    }
}

/// Card rotation in degrees for display.
pub fn tilt(offset: f64) -> f64 {
    if offset.is_nan() {
        return 0.0;
    }
    let clamped = offset.clamp(-TILT_RANGE, TILT_RANGE);
    clamped / TILT_RANGE * MAX_TILT_DEG
}
