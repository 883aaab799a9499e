//! Serialized content of one model file

use std::fs;
use std::path::Path;

use nalgebra::Point3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::batch::ElementCounts;
use crate::elements::{
    Beam, Element, ElementType, Joint, Load, Material, Node, Plate, Support, IMPLICIT_PROPERTY,
};
use crate::error::LinkResult;
use crate::units::UnitSystem;

pub const DOCUMENT_VERSION: u32 = 1;

/// Layout of a model file on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentFile {
    version: u32,
    #[serde(default)]
    units: UnitSystem,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    beams: Vec<Beam>,
    #[serde(default)]
    plates: Vec<Plate>,
    #[serde(default)]
    supports: Vec<Support>,
    #[serde(default)]
    joints: Vec<Joint>,
    #[serde(default)]
    loads: Vec<Load>,
    #[serde(default)]
    materials: Vec<Material>,
}

/// Borrowed view used to write a document without copying it
#[derive(Serialize)]
struct DocumentView<'a> {
    version: u32,
    units: &'a UnitSystem,
    nodes: &'a [Node],
    beams: &'a [Beam],
    plates: &'a [Plate],
    supports: &'a [Support],
    joints: &'a [Joint],
    loads: &'a [Load],
    materials: &'a [Material],
}

/// Entity number to position in its collection; the first stored wins
#[derive(Debug, Clone, Default, PartialEq)]
struct EntityIndex {
    nodes: FxHashMap<u32, usize>,
    beams: FxHashMap<u32, usize>,
    plates: FxHashMap<u32, usize>,
    joints: FxHashMap<u32, usize>,
    materials: FxHashMap<u32, usize>,
}

impl EntityIndex {
    fn table(&self, kind: ElementType) -> Option<&FxHashMap<u32, usize>> {
        match kind {
            ElementType::Node => Some(&self.nodes),
            ElementType::Beam => Some(&self.beams),
            ElementType::Plate => Some(&self.plates),
            ElementType::Joint => Some(&self.joints),
            ElementType::Material => Some(&self.materials),
            ElementType::Support | ElementType::Load => None,
        }
    }

    fn table_mut(&mut self, kind: ElementType) -> Option<&mut FxHashMap<u32, usize>> {
        match kind {
            ElementType::Node => Some(&mut self.nodes),
            ElementType::Beam => Some(&mut self.beams),
            ElementType::Plate => Some(&mut self.plates),
            ElementType::Joint => Some(&mut self.joints),
            ElementType::Material => Some(&mut self.materials),
            ElementType::Support | ElementType::Load => None,
        }
    }

    fn record(&mut self, kind: ElementType, id: u32, position: usize) {
        if let Some(table) = self.table_mut(kind) {
            table.entry(id).or_insert(position);
        }
    }

    fn position(&self, kind: ElementType, id: u32) -> Option<usize> {
        self.table(kind).and_then(|t| t.get(&id).copied())
    }
}

/// Everything committed to a model, in commit order.
///
/// Collections only grow through [`ModelDocument::push`], which keeps the id
/// lookups in step with them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "DocumentFile")]
pub struct ModelDocument {
    pub units: UnitSystem,
    version: u32,
    nodes: Vec<Node>,
    beams: Vec<Beam>,
    plates: Vec<Plate>,
    supports: Vec<Support>,
    joints: Vec<Joint>,
    loads: Vec<Load>,
    materials: Vec<Material>,
    index: EntityIndex,
}

impl Default for ModelDocument {
    fn default() -> Self {
        Self {
            units: UnitSystem::default(),
            version: DOCUMENT_VERSION,
            nodes: Vec::new(),
            beams: Vec::new(),
            plates: Vec::new(),
            supports: Vec::new(),
            joints: Vec::new(),
            loads: Vec::new(),
            materials: Vec::new(),
            index: EntityIndex::default(),
        }
    }
}

impl From<DocumentFile> for ModelDocument {
    fn from(file: DocumentFile) -> Self {
        let mut doc = Self {
            units: file.units,
            version: file.version,
            ..Self::default()
        };
        let elements = file
            .materials
            .into_iter()
            .map(Element::from)
            .chain(file.joints.into_iter().map(Element::from))
            .chain(file.nodes.into_iter().map(Element::from))
            .chain(file.beams.into_iter().map(Element::from))
            .chain(file.plates.into_iter().map(Element::from))
            .chain(file.supports.into_iter().map(Element::from))
            .chain(file.loads.into_iter().map(Element::from));
        for element in elements {
            doc.push(element);
        }
        doc
    }
}

impl Serialize for ModelDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DocumentView {
            version: self.version,
            units: &self.units,
            nodes: &self.nodes,
            beams: &self.beams,
            plates: &self.plates,
            supports: &self.supports,
            joints: &self.joints,
            loads: &self.loads,
            materials: &self.materials,
        }
        .serialize(serializer)
    }
}

impl ModelDocument {
    pub fn load(path: &Path) -> LinkResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn store(&self, path: &Path) -> LinkResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Append an element to its collection
    pub fn push(&mut self, element: impl Into<Element>) {
        match element.into() {
            Element::Node(v) => {
                self.index.record(ElementType::Node, v.id, self.nodes.len());
                self.nodes.push(v);
            }
            Element::Beam(v) => {
                self.index.record(ElementType::Beam, v.id, self.beams.len());
                self.beams.push(v);
            }
            Element::Plate(v) => {
                self.index.record(ElementType::Plate, v.id, self.plates.len());
                self.plates.push(v);
            }
            Element::Joint(v) => {
                self.index.record(ElementType::Joint, v.id, self.joints.len());
                self.joints.push(v);
            }
            Element::Material(v) => {
                self.index.record(ElementType::Material, v.id, self.materials.len());
                self.materials.push(v);
            }
            Element::Support(v) => self.supports.push(v),
            Element::Load(v) => self.loads.push(v),
        }
    }

    pub fn with(mut self, element: impl Into<Element>) -> Self {
        self.push(element);
        self
    }

    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    pub fn supports(&self) -> &[Support] {
        &self.supports
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn loads(&self) -> &[Load] {
        &self.loads
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Whether an entity numbered `id` of `kind` is stored; supports and
    /// loads carry no number and never match
    pub fn contains(&self, kind: ElementType, id: u32) -> bool {
        self.index.position(kind, id).is_some()
    }

    pub fn node(&self, id: u32) -> Option<&Node> {
        self.index
            .position(ElementType::Node, id)
            .and_then(|i| self.nodes.get(i))
    }

    pub fn contains_node(&self, id: u32) -> bool {
        self.contains(ElementType::Node, id)
    }

    /// First-stored node within `tolerance` of `point`
    pub fn node_at(&self, point: &Point3<f64>, tolerance: f64) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| nalgebra::distance(&n.position, point) <= tolerance)
    }

    pub fn contains_beam(&self, id: u32) -> bool {
        self.contains(ElementType::Beam, id)
    }

    pub fn contains_plate(&self, id: u32) -> bool {
        self.contains(ElementType::Plate, id)
    }

    pub fn material(&self, id: u32) -> Option<&Material> {
        self.index
            .position(ElementType::Material, id)
            .and_then(|i| self.materials.get(i))
    }

    /// The implicit property always resolves, stored or not
    pub fn contains_property(&self, id: u32) -> bool {
        id == IMPLICIT_PROPERTY || self.material(id).is_some()
    }

    /// Stored record for `id`, falling back to the built-in implicit one
    pub fn property(&self, id: u32) -> Option<Material> {
        match self.material(id) {
            Some(m) => Some(m.clone()),
            None if id == IMPLICIT_PROPERTY => Some(Material::implicit()),
            None => None,
        }
    }

    pub fn contains_joint(&self, id: u32) -> bool {
        self.contains(ElementType::Joint, id)
    }

    /// Distinct load cases in ascending order
    pub fn load_cases(&self) -> Vec<u32> {
        let mut cases: Vec<u32> = self.loads.iter().map(|l| l.case).collect();
        cases.sort_unstable();
        cases.dedup();
        cases
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
}
