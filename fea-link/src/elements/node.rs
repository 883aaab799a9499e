//! Node element - a point in 3D space identified by a positive id

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// How a node came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeOrigin {
    /// Built directly by the caller
    #[default]
    Explicit,
    /// Produced by the connectivity resolver from `endpoints` raw endpoints
    Merged { endpoints: u32 },
}

/// A 3D node in the structural model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Entity number (> 0)
    pub id: u32,
    pub position: Point3<f64>,
    #[serde(default)]
    pub origin: NodeOrigin,
}

impl Node {
    /// Create an explicit node at the given coordinates
    pub fn new(id: u32, x: f64, y: f64, z: f64) -> Self {
        Self::at(id, Point3::new(x, y, z))
    }

    pub fn at(id: u32, position: Point3<f64>) -> Self {
        Self {
            id,
            position,
            origin: NodeOrigin::Explicit,
        }
    }

    pub(crate) fn merged(id: u32, position: Point3<f64>, endpoints: u32) -> Self {
        Self {
            id,
            position,
            origin: NodeOrigin::Merged { endpoints },
        }
    }

    /// Get the coordinates as an array
    pub fn coords(&self) -> [f64; 3] {
        [self.position.x, self.position.y, self.position.z]
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        nalgebra::distance(&self.position, &other.position)
    }

    pub fn is_valid(&self) -> bool {
        self.id > 0 && super::is_finite_point(&self.position)
    }
}
