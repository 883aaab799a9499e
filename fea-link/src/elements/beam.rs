//! Beam element - a two-node line element

use serde::{Deserialize, Serialize};

/// Display colour carried along with a beam as metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A beam between two nodes, referenced by node id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    /// Entity number (> 0)
    pub id: u32,
    /// Start and end node ids
    pub nodes: [u32; 2],
    /// Property number; `None` uses the implicit property
    #[serde(default)]
    pub property: Option<u32>,
    /// End-release joint record
    #[serde(default)]
    pub joint: Option<u32>,
    #[serde(default)]
    pub colour: Option<Colour>,
}

impl Beam {
    pub fn new(id: u32, start: u32, end: u32) -> Self {
        Self {
            id,
            nodes: [start, end],
            property: None,
            joint: None,
            colour: None,
        }
    }

    pub fn with_property(mut self, property: u32) -> Self {
        self.property = Some(property);
        self
    }

    pub fn with_joint(mut self, joint: u32) -> Self {
        self.joint = Some(joint);
        self
    }

    pub fn with_colour(mut self, colour: Colour) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn start(&self) -> u32 {
        self.nodes[0]
    }

    pub fn end(&self) -> u32 {
        self.nodes[1]
    }

    /// Property number actually used by the engine
    pub fn effective_property(&self) -> u32 {
        self.property.unwrap_or(super::IMPLICIT_PROPERTY)
    }

    pub fn is_valid(&self) -> bool {
        self.id > 0
            && self.nodes.iter().all(|&n| n > 0)
            && self.nodes[0] != self.nodes[1]
            && self.property != Some(0)
            && self.joint != Some(0)
    }
}
