//! Reference engine that keeps models as JSON documents on disk

use std::path::{Path, PathBuf};

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{AddResult, Engine, EngineFault, ModelDocument, Rejection};
use crate::batch::ElementCounts;
use crate::elements::{
    Beam, Element, ElementType, Joint, Load, LoadTarget, Material, Node, Plate, Support,
    SupportLocation,
};
use crate::geometry::connectivity::DEFAULT_TOLERANCE;
use crate::model::ModelId;
use crate::results::AnalysisSummary;
use crate::units::UnitSystem;

#[derive(Debug)]
struct OpenModel {
    path: PathBuf,
    doc: ModelDocument,
}

/// Stores each open model in memory and writes it as JSON on save.
///
/// Every add checks ids and references against what is already stored and
/// stops at the first bad item; items before it stay stored, as with a
/// native engine.
#[derive(Debug)]
pub struct FileEngine {
    initialized: bool,
    tolerance: f64,
    open: FxHashMap<ModelId, OpenModel>,
}

impl Default for FileEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FileEngine {
    pub fn new() -> Self {
        Self {
            initialized: false,
            tolerance: DEFAULT_TOLERANCE,
            open: FxHashMap::default(),
        }
    }

    /// Distance within which point-located supports and loads find their node
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Content of an open model
    pub fn document(&self, id: ModelId) -> Option<&ModelDocument> {
        self.open.get(&id).map(|m| &m.doc)
    }

    fn ensure_initialized(&self) -> Result<(), EngineFault> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineFault::new("engine is not initialized"))
        }
    }

    fn model(&self, id: ModelId) -> Result<&OpenModel, EngineFault> {
        self.ensure_initialized()?;
        self.open
            .get(&id)
            .ok_or_else(|| EngineFault::new(format!("model {id} is not open")))
    }

    fn model_mut(&mut self, id: ModelId) -> Result<&mut OpenModel, EngineFault> {
        self.ensure_initialized()?;
        self.open
            .get_mut(&id)
            .ok_or_else(|| EngineFault::new(format!("model {id} is not open")))
    }

    fn doc_for_add(&mut self, id: ModelId) -> Result<&mut ModelDocument, Rejection> {
        self.model_mut(id)
            .map(|m| &mut m.doc)
            .map_err(|fault| Rejection::new(0, fault.0))
    }

    fn attach(&mut self, id: ModelId, path: &Path, doc: ModelDocument) -> Result<(), EngineFault> {
        self.ensure_initialized()?;
        if self.open.contains_key(&id) {
            return Err(EngineFault::new(format!("model {id} is already open")));
        }
        self.open.insert(
            id,
            OpenModel {
                path: path.to_path_buf(),
                doc,
            },
        );
        Ok(())
    }
}

/// Push `items` one at a time, stopping at the first that `check` refuses
fn add_each<T: Clone + Into<Element>>(
    items: &[T],
    doc: &mut ModelDocument,
    mut check: impl FnMut(&ModelDocument, &T) -> Result<(), String>,
) -> AddResult {
    for (index, item) in items.iter().enumerate() {
        check(&*doc, item).map_err(|reason| Rejection::new(index, reason))?;
        doc.push(item.clone());
    }
    Ok(())
}

fn resolve_point(doc: &ModelDocument, point: &Point3<f64>, tolerance: f64) -> Result<(), String> {
    doc.node_at(point, tolerance).map(|_| ()).ok_or_else(|| {
        format!(
            "no node at ({:.4}, {:.4}, {:.4})",
            point.x, point.y, point.z
        )
    })
}

impl Engine for FileEngine {
    fn name(&self) -> &str {
        "file"
    }

    fn init(&mut self) -> Result<(), EngineFault> {
        if self.initialized {
            return Err(EngineFault::new("engine is already initialized"));
        }
        self.initialized = true;
        log::debug!("File engine initialized");
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineFault> {
        self.ensure_initialized()?;
        if !self.open.is_empty() {
            log::warn!(
                "Releasing engine with {} open model(s); changes discarded",
                self.open.len()
            );
            self.open.clear();
        }
        self.initialized = false;
        log::debug!("File engine released");
        Ok(())
    }

    fn model_open(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault> {
        self.ensure_initialized()?;
        let doc = ModelDocument::load(path)
            .map_err(|e| EngineFault::new(format!("cannot open {}: {e}", path.display())))?;
        self.attach(id, path, doc)?;
        log::info!("Opened model {id} from {}", path.display());
        Ok(())
    }

    fn model_create(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault> {
        self.ensure_initialized()?;
        if self.open.contains_key(&id) {
            return Err(EngineFault::new(format!("model {id} is already open")));
        }
        let doc = ModelDocument::default();
        doc.store(path)
            .map_err(|e| EngineFault::new(format!("cannot create {}: {e}", path.display())))?;
        self.attach(id, path, doc)?;
        log::info!("Created model {id} at {}", path.display());
        Ok(())
    }

    fn model_save_close(&mut self, id: ModelId, discard: bool) -> Result<(), EngineFault> {
        let model = self.model(id)?;
        if !discard {
            model
                .doc
                .store(&model.path)
                .map_err(|e| {
                    EngineFault::new(format!("cannot write {}: {e}", model.path.display()))
                })?;
        }
        self.open.remove(&id);
        log::debug!("Closed model {id} (discard: {discard})");
        Ok(())
    }

    fn model_add_nodes(&mut self, id: ModelId, nodes: &[Node]) -> AddResult {
        let doc = self.doc_for_add(id)?;
        add_each(
            nodes,
            doc,
            |doc, node| {
                if !node.is_valid() {
                    return Err(format!("node {} is invalid", node.id));
                }
                if doc.contains_node(node.id) {
                    return Err(format!("node {} already exists", node.id));
                }
                Ok(())
            },
        )
    }

    fn model_add_beams(&mut self, id: ModelId, beams: &[Beam]) -> AddResult {
        let doc = self.doc_for_add(id)?;
        add_each(
            beams,
            doc,
            |doc, beam| {
                if !beam.is_valid() {
                    return Err(format!("beam {} is invalid", beam.id));
                }
                if doc.contains_beam(beam.id) {
                    return Err(format!("beam {} already exists", beam.id));
                }
                if let Some(&missing) = beam.nodes.iter().find(|&&n| !doc.contains_node(n)) {
                    return Err(format!("beam {} references missing node {missing}", beam.id));
                }
                if !doc.contains_property(beam.effective_property()) {
                    return Err(format!(
                        "beam {} references missing property {}",
                        beam.id,
                        beam.effective_property()
                    ));
                }
                match beam.joint {
                    Some(joint) if !doc.contains_joint(joint) => {
                        Err(format!("beam {} references missing joint {joint}", beam.id))
                    }
                    _ => Ok(()),
                }
            },
        )
    }

    fn model_add_plates(&mut self, id: ModelId, plates: &[Plate]) -> AddResult {
        let doc = self.doc_for_add(id)?;
        add_each(
            plates,
            doc,
            |doc, plate| {
                if !plate.is_valid() {
                    return Err(format!("plate {} is invalid", plate.id));
                }
                if doc.contains_plate(plate.id) {
                    return Err(format!("plate {} already exists", plate.id));
                }
                if let Some(&missing) = plate.nodes.iter().find(|&&n| !doc.contains_node(n)) {
                    return Err(format!("plate {} references missing node {missing}", plate.id));
                }
                if !doc.contains_property(plate.effective_property()) {
                    return Err(format!(
                        "plate {} references missing property {}",
                        plate.id,
                        plate.effective_property()
                    ));
                }
                Ok(())
            },
        )
    }

    fn model_add_supports(&mut self, id: ModelId, supports: &[Support]) -> AddResult {
        let tolerance = self.tolerance;
        let doc = self.doc_for_add(id)?;
        add_each(
            supports,
            doc,
            |doc, support| {
                if !support.is_valid() {
                    return Err("support is invalid".to_string());
                }
                match &support.location {
                    Some(SupportLocation::Node(n)) if !doc.contains_node(*n) => {
                        Err(format!("support references missing node {n}"))
                    }
                    Some(SupportLocation::Point(p)) => resolve_point(doc, p, tolerance),
                    _ => Ok(()),
                }
            },
        )
    }

    fn model_add_loads(&mut self, id: ModelId, loads: &[Load]) -> AddResult {
        let tolerance = self.tolerance;
        let doc = self.doc_for_add(id)?;
        add_each(
            loads,
            doc,
            |doc, load| {
                if !load.is_valid() {
                    return Err("load is invalid".to_string());
                }
                match &load.target {
                    Some(LoadTarget::Node(n)) if !doc.contains_node(*n) => {
                        Err(format!("load references missing node {n}"))
                    }
                    Some(LoadTarget::Point(p)) => resolve_point(doc, p, tolerance),
                    _ => Ok(()),
                }
            },
        )
    }

    fn model_add_materials(&mut self, id: ModelId, materials: &[Material]) -> AddResult {
        let doc = self.doc_for_add(id)?;
        add_each(
            materials,
            doc,
            |doc, material| {
                if !material.is_valid() {
                    return Err(format!("material {} is invalid", material.id));
                }
                if doc.material(material.id).is_some() {
                    return Err(format!("material {} already exists", material.id));
                }
                Ok(())
            },
        )
    }

    fn model_add_joints(&mut self, id: ModelId, joints: &[Joint]) -> AddResult {
        let doc = self.doc_for_add(id)?;
        add_each(
            joints,
            doc,
            |doc, joint| {
                if !joint.is_valid() {
                    return Err(format!("joint {} is invalid", joint.id));
                }
                if doc.contains_joint(joint.id) {
                    return Err(format!("joint {} already exists", joint.id));
                }
                Ok(())
            },
        )
    }

    fn model_unit_system(&self, id: ModelId) -> Result<UnitSystem, EngineFault> {
        Ok(self.model(id)?.doc.units)
    }

    fn model_set_unit_system(&mut self, id: ModelId, units: UnitSystem) -> Result<(), EngineFault> {
        self.model_mut(id)?.doc.units = units;
        Ok(())
    }

    fn model_run_linear_static(
        &mut self,
        id: ModelId,
        cases: &[u32],
    ) -> Result<AnalysisSummary, EngineFault> {
        let doc = &self.model(id)?.doc;
        let known: FxHashSet<u32> = doc.load_cases().into_iter().collect();
        if let Some(missing) = cases.iter().find(|&c| !known.contains(c)) {
            return Err(EngineFault::new(format!("load case {missing} has no loads")));
        }
        Err(EngineFault::new("the file engine has no solver attached"))
    }

    fn model_entity_exists(
        &self,
        id: ModelId,
        kind: ElementType,
        number: u32,
    ) -> Result<bool, EngineFault> {
        let doc = &self.model(id)?.doc;
        Ok(doc.contains(kind, number))
    }

    fn model_summary(&self, id: ModelId) -> Result<ElementCounts, EngineFault> {
        Ok(self.model(id)?.doc.counts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::DofMask;
    use nalgebra::Vector3;

    fn id() -> ModelId {
        ModelId::new(1).unwrap()
    }

    fn engine_with_model(dir: &tempfile::TempDir) -> FileEngine {
        let mut engine = FileEngine::new();
        engine.init().unwrap();
        engine.model_create(id(), &dir.path().join("m.json")).unwrap();
        engine
    }

    #[test]
    fn test_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = FileEngine::new();
        assert!(engine.model_create(id(), &dir.path().join("m.json")).is_err());
        assert!(engine.release().is_err());
        engine.init().unwrap();
        assert!(engine.init().is_err());
    }

    #[test]
    fn test_first_failing_index_keeps_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_model(&dir);
        let nodes = vec![
            Node::new(1, 0.0, 0.0, 0.0),
            Node::new(2, 1.0, 0.0, 0.0),
            Node::new(1, 2.0, 0.0, 0.0),
        ];
        let rejection = engine.model_add_nodes(id(), &nodes).unwrap_err();
        assert_eq!(rejection.index, 2);
        assert_eq!(engine.model_summary(id()).unwrap().nodes, 2);
    }

    #[test]
    fn test_reference_checks() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_model(&dir);
        engine
            .model_add_nodes(id(), &[Node::new(1, 0.0, 0.0, 0.0), Node::new(2, 1.0, 0.0, 0.0)])
            .unwrap();

        let beams = [Beam::new(1, 1, 2), Beam::new(2, 2, 9)];
        assert_eq!(engine.model_add_beams(id(), &beams).unwrap_err().index, 1);
        let with_property = [Beam::new(3, 1, 2).with_property(7)];
        assert!(engine.model_add_beams(id(), &with_property).is_err());
        engine.model_add_materials(id(), &[Material::steel(7)]).unwrap();
        engine.model_add_beams(id(), &with_property).unwrap();

        let supports = [
            Support::at_node(1, DofMask::fixed()),
            Support::pinned(SupportLocation::Point(Point3::new(1.0, 0.0, 0.0))),
            Support::pinned(SupportLocation::Point(Point3::new(3.0, 0.0, 0.0))),
        ];
        assert_eq!(engine.model_add_supports(id(), &supports).unwrap_err().index, 2);

        let load = Load::force(LoadTarget::Node(2), Vector3::new(0.0, 0.0, -10.0), 1);
        engine.model_add_loads(id(), &[load]).unwrap();
        let counts = engine.model_summary(id()).unwrap();
        assert_eq!((counts.beams, counts.supports, counts.loads), (2, 2, 1));
    }

    #[test]
    fn test_bulk_add_keeps_lookups_current() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_model(&dir);
        let count = 20_000u32;
        let nodes: Vec<Node> = (1..=count).map(|i| Node::new(i, f64::from(i), 0.0, 0.0)).collect();
        let beams: Vec<Beam> = (1..count).map(|i| Beam::new(i, i, i + 1)).collect();
        engine.model_add_nodes(id(), &nodes).unwrap();
        engine.model_add_beams(id(), &beams).unwrap();

        let counts = engine.model_summary(id()).unwrap();
        assert_eq!((counts.nodes, counts.beams), (count as usize, count as usize - 1));
        assert!(engine.model_entity_exists(id(), ElementType::Node, count).unwrap());
        assert!(engine.model_entity_exists(id(), ElementType::Beam, count - 1).unwrap());
        assert!(!engine.model_entity_exists(id(), ElementType::Beam, count).unwrap());

        let dangling = [Beam::new(count, count, count + 1)];
        let rejection = engine.model_add_beams(id(), &dangling).unwrap_err();
        assert_eq!(rejection.index, 0);
        assert!(engine.model_add_nodes(id(), &[Node::new(count / 2, 0.0, 1.0, 0.0)]).is_err());
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");
        let mut engine = engine_with_model(&dir);
        engine.model_set_unit_system(id(), UnitSystem::si_mm()).unwrap();
        engine.model_add_nodes(id(), &[Node::new(1, 0.0, 0.0, 0.0)]).unwrap();
        engine.model_save_close(id(), false).unwrap();

        engine.model_open(id(), &path).unwrap();
        assert_eq!(engine.model_unit_system(id()).unwrap(), UnitSystem::si_mm());
        engine.model_add_nodes(id(), &[Node::new(2, 1.0, 0.0, 0.0)]).unwrap();
        engine.model_save_close(id(), true).unwrap();

        engine.model_open(id(), &path).unwrap();
        assert_eq!(engine.model_summary(id()).unwrap().nodes, 1);
        engine.release().unwrap();
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = FileEngine::new();
        engine.init().unwrap();
        assert!(engine.model_open(id(), &dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_no_solver() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_model(&dir);
        let err = engine.model_run_linear_static(id(), &[]).unwrap_err();
        assert!(err.0.contains("no solver"));
        assert!(engine.model_run_linear_static(id(), &[4]).is_err());
    }
}
