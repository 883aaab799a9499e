//! Nodal loads - forces and moments grouped by load case

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Where a load is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LoadTarget {
    Node(u32),
    /// At the node found at this position
    Point(Point3<f64>),
}

fn no_moment() -> Vector3<f64> {
    Vector3::zeros()
}

/// A force/moment applied to a node in one load case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    /// Missing target makes the load invalid
    pub target: Option<LoadTarget>,
    /// Force vector (FX, FY, FZ)
    pub force: Vector3<f64>,
    /// Moment vector (MX, MY, MZ)
    #[serde(default = "no_moment")]
    pub moment: Vector3<f64>,
    /// Load case number (>= 1)
    pub case: u32,
}

impl Load {
    /// Create a force-only load
    pub fn force(target: LoadTarget, force: Vector3<f64>, case: u32) -> Self {
        Self {
            target: Some(target),
            force,
            moment: Vector3::zeros(),
            case,
        }
    }

    /// Create a moment-only load
    pub fn moment(target: LoadTarget, moment: Vector3<f64>, case: u32) -> Self {
        Self {
            target: Some(target),
            force: Vector3::zeros(),
            moment,
            case,
        }
    }

    /// World -Z force of the given magnitude
    pub fn gravity(target: LoadTarget, magnitude: f64, case: u32) -> Self {
        Self::force(target, Vector3::new(0.0, 0.0, -magnitude), case)
    }

    pub fn with_moment(mut self, moment: Vector3<f64>) -> Self {
        self.moment = moment;
        self
    }

    /// Get the load as an array [FX, FY, FZ, MX, MY, MZ]
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.force.x,
            self.force.y,
            self.force.z,
            self.moment.x,
            self.moment.y,
            self.moment.z,
        ]
    }

    pub fn is_valid(&self) -> bool {
        let target_ok = match self.target {
            Some(LoadTarget::Node(id)) => id > 0,
            Some(LoadTarget::Point(p)) => super::is_finite_point(&p),
            None => false,
        };
        target_ok && self.case >= 1 && self.as_array().iter().all(|v| v.is_finite())
    }

    pub(crate) fn target_label(&self) -> String {
        match self.target {
            Some(LoadTarget::Node(id)) => format!("node {id}"),
            Some(LoadTarget::Point(p)) => format!("({:.4}, {:.4}, {:.4})", p.x, p.y, p.z),
            None => "<none>".to_string(),
        }
    }
}
