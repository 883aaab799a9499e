//! fea-link engine backed by the CalculiX `ccx` solver.
//!
//! Models are stored as JSON documents through [`FileEngine`]; linear static
//! analysis writes an input deck, runs `ccx` in a temporary directory and
//! parses the printed displacements and reactions.

mod config;
pub mod deck;
pub mod executor;

use std::path::Path;

use fea_link::batch::ElementCounts;
use fea_link::elements::{Beam, ElementType, Joint, Load, Material, Node, Plate, Support};
use fea_link::engine::{AddResult, Engine, EngineFault, FileEngine, ModelDocument};
use fea_link::geometry::connectivity::DEFAULT_TOLERANCE;
use fea_link::model::ModelId;
use fea_link::results::AnalysisSummary;
use fea_link::units::UnitSystem;

pub use config::CalculixConfig;
pub use deck::{DeckError, InputDeck};
pub use executor::{Executor, ExecutorError};

impl From<DeckError> for EngineFault {
    fn from(err: DeckError) -> Self {
        EngineFault::new(format!("cannot build input deck: {err}"))
    }
}

impl From<ExecutorError> for EngineFault {
    fn from(err: ExecutorError) -> Self {
        EngineFault::new(err.to_string())
    }
}

/// [`Engine`] that solves with CalculiX
#[derive(Debug)]
pub struct CalculixEngine {
    store: FileEngine,
    executor: Executor,
    tolerance: f64,
}

impl CalculixEngine {
    pub fn new(config: CalculixConfig) -> Self {
        Self {
            store: FileEngine::new(),
            executor: Executor::new(config),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Configured from `CALCULIX_*` environment variables
    pub fn from_env() -> Self {
        Self::new(CalculixConfig::from_env())
    }

    /// Distance within which point locations resolve to a node
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.store = self.store.with_tolerance(tolerance);
        self.tolerance = tolerance;
        self
    }

    pub fn config(&self) -> &CalculixConfig {
        self.executor.config()
    }

    /// Content of an open model
    pub fn document(&self, id: ModelId) -> Option<&ModelDocument> {
        self.store.document(id)
    }
}

impl Engine for CalculixEngine {
    fn name(&self) -> &str {
        "CalculiX"
    }

    fn init(&mut self) -> Result<(), EngineFault> {
        self.executor.check_available()?;
        self.store.init()?;
        tracing::info!("CalculiX found at {}", self.executor.config().ccx_path.display());
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineFault> {
        self.store.release()
    }

    fn model_open(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault> {
        self.store.model_open(id, path)
    }

    fn model_create(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault> {
        self.store.model_create(id, path)
    }

    fn model_save_close(&mut self, id: ModelId, discard: bool) -> Result<(), EngineFault> {
        self.store.model_save_close(id, discard)
    }

    fn model_add_nodes(&mut self, id: ModelId, nodes: &[Node]) -> AddResult {
        self.store.model_add_nodes(id, nodes)
    }

    fn model_add_beams(&mut self, id: ModelId, beams: &[Beam]) -> AddResult {
        self.store.model_add_beams(id, beams)
    }

    fn model_add_plates(&mut self, id: ModelId, plates: &[Plate]) -> AddResult {
        self.store.model_add_plates(id, plates)
    }

    fn model_add_supports(&mut self, id: ModelId, supports: &[Support]) -> AddResult {
        self.store.model_add_supports(id, supports)
    }

    fn model_add_loads(&mut self, id: ModelId, loads: &[Load]) -> AddResult {
        self.store.model_add_loads(id, loads)
    }

    fn model_add_materials(&mut self, id: ModelId, materials: &[Material]) -> AddResult {
        self.store.model_add_materials(id, materials)
    }

    fn model_add_joints(&mut self, id: ModelId, joints: &[Joint]) -> AddResult {
        self.store.model_add_joints(id, joints)
    }

    fn model_unit_system(&self, id: ModelId) -> Result<UnitSystem, EngineFault> {
        self.store.model_unit_system(id)
    }

    fn model_set_unit_system(&mut self, id: ModelId, units: UnitSystem) -> Result<(), EngineFault> {
        self.store.model_set_unit_system(id, units)
    }

    fn model_run_linear_static(
        &mut self,
        id: ModelId,
        cases: &[u32],
    ) -> Result<AnalysisSummary, EngineFault> {
        let doc = self
            .store
            .document(id)
            .ok_or_else(|| EngineFault::new(format!("model {id} is not open")))?;
        if !doc.joints().is_empty() {
            tracing::warn!(
                "{} beam end release(s) are not written to the deck",
                doc.joints().len()
            );
        }
        let deck = InputDeck::generate_with_tolerance(doc, cases, self.tolerance)?;
        Ok(self.executor.execute(&deck)?)
    }

    fn model_entity_exists(
        &self,
        id: ModelId,
        kind: ElementType,
        number: u32,
    ) -> Result<bool, EngineFault> {
        self.store.model_entity_exists(id, kind, number)
    }

    fn model_summary(&self, id: ModelId) -> Result<ElementCounts, EngineFault> {
        self.store.model_summary(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_solver() -> CalculixEngine {
        CalculixEngine::new(CalculixConfig::default().with_ccx_path("/nonexistent/ccx"))
    }

    #[test]
    fn test_init_fails_without_solver() {
        let mut engine = missing_solver();
        let fault = engine.init().unwrap_err();
        assert!(fault.0.contains("/nonexistent/ccx"));
        // Storage stays uninitialized, so a later init is not refused as a double init
        assert!(engine.release().is_err());
    }

    #[test]
    fn test_deck_errors_become_faults() {
        let fault = EngineFault::from(DeckError::EmptyCase(3));
        assert_eq!(fault.0, "cannot build input deck: Load case 3 has no loads");
    }
}
