use std::fmt;

use crate::shared::constants::CENTER_TOLERANCE;

use super::position_normalizer::NormalizedPosition;

/// Where the face sits relative to the frame center.
///
/// `MoveLeft`/`MoveRight` tell the user which way to move, in the
/// mirror-corrected view: a face left of center must move right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    NoFace,
    Centered,
    MoveLeft,
    MoveRight,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::NoFace => write!(f, "no face"),
            Classification::Centered => write!(f, "centered"),
            Classification::MoveLeft => write!(f, "move left"),
            Classification::MoveRight => write!(f, "move right"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenteringClassifier {
    tolerance: f64,
}

impl CenteringClassifier {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// The band edges `0.5 ± tolerance` count as centered.
    pub fn classify(&self, position: Option<NormalizedPosition>) -> Classification {
        let Some(x) = position else {
            return Classification::NoFace;
        };
        // Compared against the edges rather than `|x - 0.5|`, which rounds
        // past the tolerance at 0.5 + 0.06.
        if x < 0.5 - self.tolerance {
            Classification::MoveRight
        } else if x > 0.5 + self.tolerance {
            Classification::MoveLeft
        } else {
            Classification::Centered
        }
    }
}

impl Default for CenteringClassifier {
    fn default() -> Self {
        Self::new(CENTER_TOLERANCE)
    }
}
