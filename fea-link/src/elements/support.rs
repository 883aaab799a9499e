//! Support conditions

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use super::dof::{Dof, DofMask};

/// Where a support is applied
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SupportLocation {
    /// At an existing node id
    Node(u32),
    /// At the node found at this position
    Point(Point3<f64>),
}

/// Local coordinate frame of a support; z is `x_axis × y_axis`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalFrame {
    pub origin: Point3<f64>,
    pub x_axis: Vector3<f64>,
    pub y_axis: Vector3<f64>,
}

impl LocalFrame {
    /// World XY plane
    pub fn world() -> Self {
        Self {
            origin: Point3::origin(),
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
        }
    }

    pub fn new(origin: Point3<f64>, x_axis: Vector3<f64>, y_axis: Vector3<f64>) -> Self {
        Self {
            origin,
            x_axis,
            y_axis,
        }
    }

    pub fn z_axis(&self) -> Vector3<f64> {
        self.x_axis.cross(&self.y_axis)
    }

    /// Axes are parallel to the world axes (origin does not matter for restraints)
    pub fn is_world_aligned(&self) -> bool {
        const EPS: f64 = 1e-12;
        match (self.x_axis.try_normalize(EPS), self.y_axis.try_normalize(EPS)) {
            (Some(x), Some(y)) => {
                (x - Vector3::x()).norm() < 1e-9 && (y - Vector3::y()).norm() < 1e-9
            }
            _ => false,
        }
    }

    /// Axes are finite, non-zero and not parallel
    pub fn is_valid(&self) -> bool {
        let finite = self.origin.coords.iter().all(|c| c.is_finite())
            && self.x_axis.iter().all(|c| c.is_finite())
            && self.y_axis.iter().all(|c| c.is_finite());
        finite && self.z_axis().norm() > 1e-12
    }
}

impl Default for LocalFrame {
    fn default() -> Self {
        Self::world()
    }
}

/// Support condition: restrained DOFs at a location, optionally spring-like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Support {
    /// Missing location makes the support invalid
    pub location: Option<SupportLocation>,
    #[serde(default)]
    pub frame: LocalFrame,
    /// Restrained degrees of freedom
    pub dofs: DofMask,
    /// Stiffness ratio per DOF in [0, 1]; 1.0 is rigid
    #[serde(default = "rigid")]
    pub stiffness: [f64; 6],
}

fn rigid() -> [f64; 6] {
    [1.0; 6]
}

impl Support {
    /// Create a support with the given restraints in the world frame
    pub fn new(location: SupportLocation, dofs: DofMask) -> Self {
        Self {
            location: Some(location),
            frame: LocalFrame::world(),
            dofs,
            stiffness: rigid(),
        }
    }

    /// Create a fully fixed support (all DOFs restrained)
    pub fn fixed(location: SupportLocation) -> Self {
        Self::new(location, DofMask::fixed())
    }

    /// Create a pinned support (translations restrained, rotations free)
    pub fn pinned(location: SupportLocation) -> Self {
        Self::new(location, DofMask::pinned())
    }

    pub fn at_node(node: u32, dofs: DofMask) -> Self {
        Self::new(SupportLocation::Node(node), dofs)
    }

    pub fn with_frame(mut self, frame: LocalFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Set the stiffness ratio of the three translational DOFs
    pub fn with_translational_stiffness(mut self, ratio: f64) -> Self {
        self.stiffness[..3].fill(ratio);
        self
    }

    /// Set the stiffness ratio of the three rotational DOFs
    pub fn with_rotational_stiffness(mut self, ratio: f64) -> Self {
        self.stiffness[3..].fill(ratio);
        self
    }

    pub fn stiffness_of(&self, dof: Dof) -> f64 {
        self.stiffness[dof.index()]
    }

    /// Restrained DOFs that are not fully rigid
    pub fn partial_dofs(&self) -> impl Iterator<Item = (Dof, f64)> + '_ {
        self.dofs
            .iter()
            .map(|dof| (dof, self.stiffness_of(dof)))
            .filter(|&(_, ratio)| ratio < 1.0)
    }

    /// Check if any DOF is restrained
    pub fn is_supported(&self) -> bool {
        !self.dofs.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        let location_ok = match self.location {
            Some(SupportLocation::Node(id)) => id > 0,
            Some(SupportLocation::Point(p)) => super::is_finite_point(&p),
            None => false,
        };
        location_ok
            && self.frame.is_valid()
            && self.stiffness.iter().all(|s| (0.0..=1.0).contains(s))
    }

    pub(crate) fn location_label(&self) -> String {
        match self.location {
            Some(SupportLocation::Node(id)) => format!("node {id}"),
            Some(SupportLocation::Point(p)) => format!("({:.4}, {:.4}, {:.4})", p.x, p.y, p.z),
            None => "<none>".to_string(),
        }
    }
}
