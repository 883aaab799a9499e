//! Typed element collections pushed to the engine in one mutation

use std::fmt;
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::elements::{Beam, Element, ElementType, Joint, Load, Material, Node, Plate, Support};

/// Per-kind element counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementCounts {
    pub nodes: usize,
    pub beams: usize,
    pub plates: usize,
    pub supports: usize,
    pub joints: usize,
    pub loads: usize,
    pub materials: usize,
}

impl ElementCounts {
    pub fn get(&self, kind: ElementType) -> usize {
        match kind {
            ElementType::Node => self.nodes,
            ElementType::Beam => self.beams,
            ElementType::Plate => self.plates,
            ElementType::Support => self.supports,
            ElementType::Joint => self.joints,
            ElementType::Load => self.loads,
            ElementType::Material => self.materials,
        }
    }

    pub fn total(&self) -> usize {
        ElementType::PRECEDENCE.iter().map(|&k| self.get(k)).sum()
    }
}

impl AddAssign for ElementCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes += rhs.nodes;
        self.beams += rhs.beams;
        self.plates += rhs.plates;
        self.supports += rhs.supports;
        self.joints += rhs.joints;
        self.loads += rhs.loads;
        self.materials += rhs.materials;
    }
}

impl fmt::Display for ElementCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for kind in ElementType::PRECEDENCE {
            let n = self.get(kind);
            if n == 0 {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{kind}: {n}")?;
            first = false;
        }
        if first {
            f.write_str("no elements")?;
        }
        Ok(())
    }
}

/// Typed collections for one `mutate` call, in push order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelBatch {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub beams: Vec<Beam>,
    #[serde(default)]
    pub plates: Vec<Plate>,
    #[serde(default)]
    pub supports: Vec<Support>,
    #[serde(default)]
    pub joints: Vec<Joint>,
    #[serde(default)]
    pub loads: Vec<Load>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl ModelBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one element to its bucket
    pub fn push(&mut self, element: Element) {
        match element {
            Element::Node(v) => self.nodes.push(v),
            Element::Beam(v) => self.beams.push(v),
            Element::Plate(v) => self.plates.push(v),
            Element::Support(v) => self.supports.push(v),
            Element::Joint(v) => self.joints.push(v),
            Element::Load(v) => self.loads.push(v),
            Element::Material(v) => self.materials.push(v),
        }
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn with_beams(mut self, beams: impl IntoIterator<Item = Beam>) -> Self {
        self.beams.extend(beams);
        self
    }

    pub fn with_plates(mut self, plates: impl IntoIterator<Item = Plate>) -> Self {
        self.plates.extend(plates);
        self
    }

    pub fn with_supports(mut self, supports: impl IntoIterator<Item = Support>) -> Self {
        self.supports.extend(supports);
        self
    }

    pub fn with_joints(mut self, joints: impl IntoIterator<Item = Joint>) -> Self {
        self.joints.extend(joints);
        self
    }

    pub fn with_loads(mut self, loads: impl IntoIterator<Item = Load>) -> Self {
        self.loads.extend(loads);
        self
    }

    pub fn with_materials(mut self, materials: impl IntoIterator<Item = Material>) -> Self {
        self.materials.extend(materials);
        self
    }

    pub fn counts(&self) -> ElementCounts {
        ElementCounts {
            nodes: self.nodes.len(),
            beams: self.beams.len(),
            plates: self.plates.len(),
            supports: self.supports.len(),
            joints: self.joints.len(),
            loads: self.loads.len(),
            materials: self.materials.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }
}

impl FromIterator<Element> for ModelBatch {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut batch = Self::default();
        for element in iter {
            batch.push(element);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_display() {
        let batch = ModelBatch::new()
            .with_nodes([Node::new(1, 0.0, 0.0, 0.0), Node::new(2, 1.0, 0.0, 0.0)])
            .with_beams([Beam::new(1, 1, 2)]);
        assert_eq!(batch.counts().total(), 3);
        assert_eq!(batch.counts().to_string(), "Node: 2, Beam: 1");
        assert_eq!(ModelBatch::new().counts().to_string(), "no elements");
        assert!(ModelBatch::new().is_empty());
    }

    #[test]
    fn test_from_elements() {
        let batch: ModelBatch = vec![
            Element::from(Beam::new(1, 1, 2)),
            Element::from(Node::new(1, 0.0, 0.0, 0.0)),
            Element::from(Material::steel(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(batch.counts().get(ElementType::Material), 1);
        assert_eq!(batch.nodes.len(), 1);
    }
}
