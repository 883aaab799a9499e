//! Plate element - a planar facet over three or more nodes

use serde::{Deserialize, Serialize};

/// A plate/shell facet referenced by node ids, in boundary order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    /// Entity number (> 0)
    pub id: u32,
    /// Corner node ids (at least three, all distinct)
    pub nodes: Vec<u32>,
    /// Property number; `None` uses the implicit property
    #[serde(default)]
    pub property: Option<u32>,
}

impl Plate {
    pub fn new(id: u32, nodes: Vec<u32>) -> Self {
        Self {
            id,
            nodes,
            property: None,
        }
    }

    pub fn with_property(mut self, property: u32) -> Self {
        self.property = Some(property);
        self
    }

    pub fn effective_property(&self) -> u32 {
        self.property.unwrap_or(super::IMPLICIT_PROPERTY)
    }

    pub fn is_valid(&self) -> bool {
        if self.id == 0 || self.nodes.len() < 3 || self.property == Some(0) {
            return false;
        }
        if self.nodes.iter().any(|&n| n == 0) {
            return false;
        }
        let mut sorted = self.nodes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.len() == self.nodes.len()
    }
}
