//! Engine session lifecycle.
//!
//! An [`EngineSession`] owns one [`Engine`] and moves it through
//! `initialize -> open -> mutate* -> save_and_close -> release`. The engine
//! lease taken by `initialize` lives inside the session state, so operations
//! that need the engine can only run in states that hold it, and every path
//! out of the session (including `Drop`) gives it back.

mod lease;

use std::fmt;
use std::mem;
use std::sync::Arc;

use rustc_hash::FxHashSet;

pub use lease::{EngineLease, EngineSlot};

use crate::batch::{ElementCounts, ModelBatch};
use crate::elements::{
    Beam, ElementType, Joint, LoadTarget, Material, Node, Plate, SupportLocation, IMPLICIT_PROPERTY,
};
use crate::engine::{Engine, Rejection};
use crate::error::{LinkError, LinkResult};
use crate::model::{Model, ModelId, OpenMode};
use crate::results::AnalysisSummary;

/// Observable lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Open,
    /// Open with this many successful mutations
    Mutated(usize),
    Saved,
    Released,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Initialized => f.write_str("initialized"),
            Self::Open => f.write_str("open"),
            Self::Mutated(n) => write!(f, "mutated ({n})"),
            Self::Saved => f.write_str("saved"),
            Self::Released => f.write_str("released"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

struct OpenModel {
    lease: EngineLease,
    model: Model,
    /// Batches accepted so far, replayed after a rollback
    committed: Vec<ModelBatch>,
}

enum Phase {
    Uninitialized,
    Initialized(EngineLease),
    Open(OpenModel),
    Saved(EngineLease, Model),
    Released,
    Failed(Option<EngineLease>),
}

/// Lifecycle manager for a single-instance engine
pub struct EngineSession<E: Engine> {
    engine: E,
    slot: Arc<EngineSlot>,
    phase: Phase,
}

impl<E: Engine> EngineSession<E> {
    /// A session competing for the process-wide engine slot
    pub fn new(engine: E) -> Self {
        Self::with_slot(engine, EngineSlot::global())
    }

    pub fn with_slot(engine: E, slot: Arc<EngineSlot>) -> Self {
        Self {
            engine,
            slot,
            phase: Phase::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.phase {
            Phase::Uninitialized => SessionState::Uninitialized,
            Phase::Initialized(_) => SessionState::Initialized,
            Phase::Open(open) if open.committed.is_empty() => SessionState::Open,
            Phase::Open(open) => SessionState::Mutated(open.committed.len()),
            Phase::Saved(..) => SessionState::Saved,
            Phase::Released => SessionState::Released,
            Phase::Failed(_) => SessionState::Failed,
        }
    }

    /// Whether this session currently owns the engine
    pub fn holds_engine(&self) -> bool {
        matches!(
            &self.phase,
            Phase::Initialized(_) | Phase::Open(_) | Phase::Saved(..) | Phase::Failed(Some(_))
        )
    }

    /// The open (or just saved) model
    pub fn model(&self) -> Option<&Model> {
        match &self.phase {
            Phase::Open(open) => Some(&open.model),
            Phase::Saved(_, model) => Some(model),
            _ => None,
        }
    }

    /// Element counts pushed by successful mutations of the open model
    pub fn committed(&self) -> ElementCounts {
        let mut counts = ElementCounts::default();
        if let Phase::Open(open) = &self.phase {
            for batch in &open.committed {
                counts += batch.counts();
            }
        }
        counts
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn invalid(&self, operation: &'static str) -> LinkError {
        LinkError::InvalidState {
            operation,
            state: self.state(),
        }
    }

    /// Take exclusive ownership of the engine and start it
    pub fn initialize(&mut self) -> LinkResult<()> {
        if !matches!(self.phase, Phase::Uninitialized | Phase::Released) {
            return Err(self.invalid("initialize"));
        }
        let lease = self.slot.try_acquire().ok_or(LinkError::EngineUnavailable)?;
        // On failure the lease drops here and the slot is free again
        self.engine.init().map_err(|fault| {
            LinkError::Engine(format!("{} engine failed to start: {fault}", self.engine.name()))
        })?;
        self.phase = Phase::Initialized(lease);
        log::info!("Initialized {} engine", self.engine.name());
        Ok(())
    }

    /// Open or create the model file.
    ///
    /// For an existing file the stored unit system replaces `model.units`;
    /// for a new file `model.units` is written to it. On failure the session
    /// stays initialized.
    pub fn open(&mut self, mut model: Model, mode: OpenMode) -> LinkResult<&Model> {
        let lease = match mem::replace(&mut self.phase, Phase::Failed(None)) {
            Phase::Initialized(lease) | Phase::Saved(lease, _) => lease,
            other => {
                self.phase = other;
                return Err(self.invalid("open"));
            }
        };

        let id = model.id;
        let opened = match mode {
            OpenMode::Existing => self.engine.model_open(id, &model.path),
            OpenMode::Create => self.engine.model_create(id, &model.path),
        };
        if let Err(fault) = opened {
            self.phase = Phase::Initialized(lease);
            return Err(LinkError::FileAccess {
                path: model.path,
                reason: fault.0,
            });
        }

        let units = match mode {
            OpenMode::Existing => self.engine.model_unit_system(id).map(|u| model.units = u),
            OpenMode::Create => self.engine.model_set_unit_system(id, model.units),
        };
        if let Err(fault) = units {
            if let Err(close) = self.engine.model_save_close(id, true) {
                log::error!("Could not close {model} after unit system failure: {close}");
                self.phase = Phase::Failed(Some(lease));
            } else {
                self.phase = Phase::Initialized(lease);
            }
            return Err(LinkError::Engine(format!("unit system of {model}: {fault}")));
        }

        log::info!("Opened {model} [{}]", model.units);
        self.phase = Phase::Open(OpenModel {
            lease,
            model,
            committed: Vec::new(),
        });
        match &self.phase {
            Phase::Open(open) => Ok(&open.model),
            _ => Err(self.invalid("open")),
        }
    }

    /// Push a batch to the open model, all or nothing.
    ///
    /// The batch is checked before any engine call. If the engine still
    /// refuses an item, the model is closed without saving, reopened and the
    /// earlier batches are replayed; the error names the refused item.
    pub fn mutate(&mut self, batch: &ModelBatch) -> LinkResult<ElementCounts> {
        let Phase::Open(open) = &self.phase else {
            return Err(self.invalid("mutate"));
        };
        validate_batch(&self.engine, open.model.id, batch)?;

        let id = open.model.id;
        let pushed = push_batch(&mut self.engine, id, batch);
        let Err(err) = pushed else {
            let Phase::Open(open) = &mut self.phase else {
                return Err(self.invalid("mutate"));
            };
            open.committed.push(batch.clone());
            log::debug!(
                "Committed batch {} to {}: {}",
                open.committed.len(),
                open.model,
                batch.counts()
            );
            return Ok(batch.counts());
        };

        log::warn!("Engine refused batch, rolling back: {err}");
        let Phase::Open(open) = mem::replace(&mut self.phase, Phase::Failed(None)) else {
            return Err(err);
        };
        match rollback(&mut self.engine, &open) {
            Ok(()) => self.phase = Phase::Open(open),
            Err(rollback_err) => {
                log::error!("Rollback of {} failed: {rollback_err}", open.model);
                self.phase = Phase::Failed(Some(open.lease));
            }
        }
        Err(err)
    }

    /// Run linear static analysis on the open model
    pub fn analyse(&mut self, cases: &[u32]) -> LinkResult<AnalysisSummary> {
        let Phase::Open(open) = &self.phase else {
            return Err(self.invalid("analyse"));
        };
        let id = open.model.id;
        let summary = self
            .engine
            .model_run_linear_static(id, cases)
            .map_err(|fault| LinkError::Analysis(fault.0))?;
        log::info!("Analysis of model {id} finished: {} case(s)", summary.cases.len());
        Ok(summary)
    }

    /// Persist and close the open model.
    ///
    /// If saving fails the model is closed without saving and the session
    /// drops back to initialized; either way `release` remains valid.
    pub fn save_and_close(&mut self) -> LinkResult<()> {
        let open = match mem::replace(&mut self.phase, Phase::Failed(None)) {
            Phase::Open(open) => open,
            other => {
                self.phase = other;
                return Err(self.invalid("save"));
            }
        };
        let OpenModel { lease, model, .. } = open;

        match self.engine.model_save_close(model.id, false) {
            Ok(()) => {
                log::info!("Saved {model}");
                self.phase = Phase::Saved(lease, model);
                Ok(())
            }
            Err(fault) => {
                self.phase = match self.engine.model_save_close(model.id, true) {
                    Ok(()) => Phase::Initialized(lease),
                    Err(close) => {
                        log::error!("Could not close {model} after failed save: {close}");
                        Phase::Failed(Some(lease))
                    }
                };
                Err(LinkError::Save {
                    path: model.path,
                    reason: fault.0,
                })
            }
        }
    }

    /// Close the open model without saving
    pub fn close_discarding(&mut self) -> LinkResult<()> {
        let open = match mem::replace(&mut self.phase, Phase::Failed(None)) {
            Phase::Open(open) => open,
            other => {
                self.phase = other;
                return Err(self.invalid("close"));
            }
        };
        match self.engine.model_save_close(open.model.id, true) {
            Ok(()) => {
                log::info!("Closed {} without saving", open.model);
                self.phase = Phase::Initialized(open.lease);
                Ok(())
            }
            Err(fault) => {
                self.phase = Phase::Failed(Some(open.lease));
                Err(LinkError::Engine(format!("cannot close {}: {fault}", open.model)))
            }
        }
    }

    /// Give the engine back.
    ///
    /// Closes any open model without saving first. A no-op when the session
    /// holds no engine, so it is safe on every exit path. A failed session
    /// stays failed.
    pub fn release(&mut self) -> LinkResult<()> {
        let (lease, failed) = match mem::replace(&mut self.phase, Phase::Failed(None)) {
            Phase::Uninitialized => {
                self.phase = Phase::Uninitialized;
                return Ok(());
            }
            Phase::Released => {
                self.phase = Phase::Released;
                return Ok(());
            }
            Phase::Failed(None) => return Ok(()),
            Phase::Failed(Some(lease)) => (lease, true),
            Phase::Initialized(lease) | Phase::Saved(lease, _) => (lease, false),
            Phase::Open(open) => {
                if let Err(fault) = self.engine.model_save_close(open.model.id, true) {
                    log::warn!("Discarding {} on release failed: {fault}", open.model);
                }
                (open.lease, false)
            }
        };

        let released = self.engine.release();
        drop(lease);
        match released {
            Ok(()) => {
                log::info!("Released {} engine", self.engine.name());
                if !failed {
                    self.phase = Phase::Released;
                }
                Ok(())
            }
            Err(fault) => Err(LinkError::Engine(format!(
                "{} engine failed to release: {fault}",
                self.engine.name()
            ))),
        }
    }
}

impl<E: Engine> Drop for EngineSession<E> {
    fn drop(&mut self) {
        if self.holds_engine() {
            log::warn!("Session dropped while holding the engine; releasing");
            if let Err(err) = self.release() {
                log::error!("{err}");
            }
        }
    }
}

impl<E: Engine> fmt::Debug for EngineSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("engine", &self.engine.name())
            .field("state", &self.state())
            .field("model", &self.model())
            .finish()
    }
}

/// Ids a batch defines, per kind
#[derive(Default)]
struct BatchIds {
    nodes: FxHashSet<u32>,
    joints: FxHashSet<u32>,
    materials: FxHashSet<u32>,
}

fn mutation(kind: ElementType, index: usize, reason: impl Into<String>) -> LinkError {
    LinkError::Mutation {
        kind,
        index,
        reason: reason.into(),
    }
}

/// Check ids and references of `batch` against itself and the open model
fn validate_batch<E: Engine>(engine: &E, id: ModelId, batch: &ModelBatch) -> LinkResult<()> {
    let exists = |kind: ElementType, number: u32| -> LinkResult<bool> {
        engine
            .model_entity_exists(id, kind, number)
            .map_err(|fault| LinkError::Engine(fault.0))
    };

    // Unique, positive, valid and not already stored
    fn check_ids<'a, T: 'a>(
        kind: ElementType,
        items: impl IntoIterator<Item = &'a T>,
        number: impl Fn(&T) -> u32,
        valid: impl Fn(&T) -> bool,
        exists: &impl Fn(ElementType, u32) -> LinkResult<bool>,
    ) -> LinkResult<FxHashSet<u32>> {
        let mut seen = FxHashSet::default();
        for (index, item) in items.into_iter().enumerate() {
            let n = number(item);
            if !valid(item) {
                return Err(mutation(kind, index, format!("{kind} {n} is invalid")));
            }
            if !seen.insert(n) {
                return Err(mutation(kind, index, format!("duplicate {kind} id {n} in batch")));
            }
            if exists(kind, n)? {
                let reason = format!("{kind} {n} already exists in the model");
                return Err(mutation(kind, index, reason));
            }
        }
        Ok(seen)
    }

    let ids = BatchIds {
        materials: check_ids(
            ElementType::Material,
            &batch.materials,
            |m: &Material| m.id,
            Material::is_valid,
            &exists,
        )?,
        joints: check_ids(
            ElementType::Joint,
            &batch.joints,
            |j: &Joint| j.id,
            Joint::is_valid,
            &exists,
        )?,
        nodes: check_ids(
            ElementType::Node,
            &batch.nodes,
            |n: &Node| n.id,
            Node::is_valid,
            &exists,
        )?,
    };
    check_ids(ElementType::Beam, &batch.beams, |b: &Beam| b.id, Beam::is_valid, &exists)?;
    check_ids(ElementType::Plate, &batch.plates, |p: &Plate| p.id, Plate::is_valid, &exists)?;

    let node_known = |n: u32| -> LinkResult<bool> {
        Ok(ids.nodes.contains(&n) || exists(ElementType::Node, n)?)
    };
    let property_known = |p: u32| -> LinkResult<bool> {
        Ok(p == IMPLICIT_PROPERTY
            || ids.materials.contains(&p)
            || exists(ElementType::Material, p)?)
    };

    for (index, beam) in batch.beams.iter().enumerate() {
        for &n in &beam.nodes {
            if !node_known(n)? {
                let reason = format!("beam {} references missing node {n}", beam.id);
                return Err(mutation(ElementType::Beam, index, reason));
            }
        }
        if !property_known(beam.effective_property())? {
            return Err(mutation(
                ElementType::Beam,
                index,
                format!(
                    "beam {} references missing property {}",
                    beam.id,
                    beam.effective_property()
                ),
            ));
        }
        if let Some(joint) = beam.joint {
            if !(ids.joints.contains(&joint) || exists(ElementType::Joint, joint)?) {
                let reason = format!("beam {} references missing joint {joint}", beam.id);
                return Err(mutation(ElementType::Beam, index, reason));
            }
        }
    }

    for (index, plate) in batch.plates.iter().enumerate() {
        for &n in &plate.nodes {
            if !node_known(n)? {
                let reason = format!("plate {} references missing node {n}", plate.id);
                return Err(mutation(ElementType::Plate, index, reason));
            }
        }
        if !property_known(plate.effective_property())? {
            return Err(mutation(
                ElementType::Plate,
                index,
                format!(
                    "plate {} references missing property {}",
                    plate.id,
                    plate.effective_property()
                ),
            ));
        }
    }

    for (index, support) in batch.supports.iter().enumerate() {
        if !support.is_valid() {
            return Err(mutation(ElementType::Support, index, "support is invalid"));
        }
        if let Some(SupportLocation::Node(n)) = support.location {
            if !node_known(n)? {
                let reason = format!("support references missing node {n}");
                return Err(mutation(ElementType::Support, index, reason));
            }
        }
    }

    for (index, load) in batch.loads.iter().enumerate() {
        if !load.is_valid() {
            return Err(mutation(ElementType::Load, index, "load is invalid"));
        }
        if let Some(LoadTarget::Node(n)) = load.target {
            if !node_known(n)? {
                let reason = format!("load references missing node {n}");
                return Err(mutation(ElementType::Load, index, reason));
            }
        }
    }

    Ok(())
}

/// Push every collection in dependency order; stops at the first refusal
fn push_batch<E: Engine>(engine: &mut E, id: ModelId, batch: &ModelBatch) -> LinkResult<()> {
    let refused = |kind: ElementType| {
        move |r: Rejection| mutation(kind, r.index, r.reason)
    };
    if !batch.materials.is_empty() {
        engine.model_add_materials(id, &batch.materials).map_err(refused(ElementType::Material))?;
    }
    if !batch.joints.is_empty() {
        engine.model_add_joints(id, &batch.joints).map_err(refused(ElementType::Joint))?;
    }
    if !batch.nodes.is_empty() {
        engine.model_add_nodes(id, &batch.nodes).map_err(refused(ElementType::Node))?;
    }
    if !batch.beams.is_empty() {
        engine.model_add_beams(id, &batch.beams).map_err(refused(ElementType::Beam))?;
    }
    if !batch.plates.is_empty() {
        engine.model_add_plates(id, &batch.plates).map_err(refused(ElementType::Plate))?;
    }
    if !batch.supports.is_empty() {
        engine.model_add_supports(id, &batch.supports).map_err(refused(ElementType::Support))?;
    }
    if !batch.loads.is_empty() {
        engine.model_add_loads(id, &batch.loads).map_err(refused(ElementType::Load))?;
    }
    Ok(())
}

/// Restore the engine to the committed state of `open`
fn rollback<E: Engine>(engine: &mut E, open: &OpenModel) -> LinkResult<()> {
    let model = &open.model;
    engine
        .model_save_close(model.id, true)
        .map_err(|fault| LinkError::Engine(format!("discard: {fault}")))?;
    engine.model_open(model.id, &model.path).map_err(|fault| LinkError::FileAccess {
        path: model.path.clone(),
        reason: fault.0,
    })?;
    engine
        .model_set_unit_system(model.id, model.units)
        .map_err(|fault| LinkError::Engine(format!("unit system: {fault}")))?;
    for batch in &open.committed {
        push_batch(engine, model.id, batch)?;
    }
    log::info!("Rolled {model} back to {} committed batch(es)", open.committed.len());
    Ok(())
}

/// What [`run_pipeline`] produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub model: Model,
    pub committed: ElementCounts,
    pub analysis: Option<AnalysisSummary>,
}

/// Initialize, open, push `batch`, optionally analyse `cases`, save and release.
///
/// The engine is released on every path out, successful or not.
pub fn run_pipeline<E: Engine>(
    session: &mut EngineSession<E>,
    model: Model,
    mode: OpenMode,
    batch: &ModelBatch,
    cases: &[u32],
) -> LinkResult<PipelineReport> {
    session.initialize()?;

    let result: LinkResult<PipelineReport> = (|| {
        let model = session.open(model, mode)?.clone();
        let committed = session.mutate(batch)?;
        let analysis = if cases.is_empty() {
            None
        } else {
            Some(session.analyse(cases)?)
        };
        session.save_and_close()?;
        Ok(PipelineReport {
            model,
            committed,
            analysis,
        })
    })();

    let released = session.release();
    let report = result?;
    released?;
    Ok(report)
}
