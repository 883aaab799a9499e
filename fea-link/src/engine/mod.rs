//! Capabilities consumed from the external finite-element engine.
//!
//! Calls are synchronous and block until the engine answers. Bulk adds report
//! the first item the engine refused; items before it may already be stored,
//! which is why [`crate::session::EngineSession`] validates batches up front
//! and rolls back on a refusal.

mod document;
mod file;

use std::path::Path;

use thiserror::Error;

pub use document::{ModelDocument, DOCUMENT_VERSION};
pub use file::FileEngine;

use crate::batch::ElementCounts;
use crate::elements::{Beam, ElementType, Joint, Load, Material, Node, Plate, Support};
use crate::model::ModelId;
use crate::results::AnalysisSummary;
use crate::units::UnitSystem;

/// A failed engine call that does not point at a single item
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct EngineFault(pub String);

impl EngineFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The first item of a bulk add that the engine refused
#[derive(Error, Debug, Clone, PartialEq)]
#[error("item {index} rejected: {reason}")]
pub struct Rejection {
    pub index: usize,
    pub reason: String,
}

impl Rejection {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Result of a bulk add
pub type AddResult = Result<(), Rejection>;

/// An external, stateful, single-instance analysis engine
pub trait Engine {
    /// Human-readable engine name for diagnostics
    fn name(&self) -> &str;

    fn init(&mut self) -> Result<(), EngineFault>;

    fn release(&mut self) -> Result<(), EngineFault>;

    fn model_open(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault>;

    /// Create a new model file at `path`, replacing any existing one
    fn model_create(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault>;

    /// Close the model, persisting it unless `discard` is set
    fn model_save_close(&mut self, id: ModelId, discard: bool) -> Result<(), EngineFault>;

    fn model_add_nodes(&mut self, id: ModelId, nodes: &[Node]) -> AddResult;

    fn model_add_beams(&mut self, id: ModelId, beams: &[Beam]) -> AddResult;

    fn model_add_plates(&mut self, id: ModelId, plates: &[Plate]) -> AddResult;

    fn model_add_supports(&mut self, id: ModelId, supports: &[Support]) -> AddResult;

    fn model_add_loads(&mut self, id: ModelId, loads: &[Load]) -> AddResult;

    fn model_add_materials(&mut self, id: ModelId, materials: &[Material]) -> AddResult;

    fn model_add_joints(&mut self, id: ModelId, joints: &[Joint]) -> AddResult;

    fn model_unit_system(&self, id: ModelId) -> Result<UnitSystem, EngineFault>;

    fn model_set_unit_system(&mut self, id: ModelId, units: UnitSystem) -> Result<(), EngineFault>;

    /// Run linear static analysis for the given load cases
    fn model_run_linear_static(
        &mut self,
        id: ModelId,
        cases: &[u32],
    ) -> Result<AnalysisSummary, EngineFault>;

    /// Whether an entity numbered `number` of `kind` is stored; kinds
    /// without entity numbers always report `false`
    fn model_entity_exists(
        &self,
        id: ModelId,
        kind: ElementType,
        number: u32,
    ) -> Result<bool, EngineFault>;

    /// Element counts currently stored for the model
    fn model_summary(&self, id: ModelId) -> Result<ElementCounts, EngineFault>;
}
