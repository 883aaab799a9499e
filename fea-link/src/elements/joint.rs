//! Beam end-release joints

use serde::{Deserialize, Serialize};

use super::dof::DofMask;

/// End-release record referenced by beams through `Beam::joint`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Record number (> 0)
    pub id: u32,
    /// Released degrees of freedom
    pub releases: DofMask,
    /// Residual stiffness ratio per DOF in [0, 1] for partially released DOFs
    #[serde(default = "none_retained")]
    pub stiffness: [f64; 6],
}

fn none_retained() -> [f64; 6] {
    [0.0; 6]
}

impl Joint {
    pub fn new(id: u32, releases: DofMask) -> Self {
        Self {
            id,
            releases,
            stiffness: none_retained(),
        }
    }

    /// A pin joint: all rotations released
    pub fn hinge(id: u32) -> Self {
        Self::new(id, DofMask::rotations())
    }

    pub fn with_retained_stiffness(mut self, ratio: f64) -> Self {
        self.stiffness = [ratio; 6];
        self
    }

    pub fn is_valid(&self) -> bool {
        self.id > 0 && self.stiffness.iter().all(|s| (0.0..=1.0).contains(s))
    }
}
