//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fea_link::batch::ElementCounts;
use fea_link::elements::{Beam, ElementType, Joint, Load, Material, Node, Plate, Support};
use fea_link::engine::{AddResult, Engine, EngineFault, FileEngine, ModelDocument, Rejection};
use fea_link::model::ModelId;
use fea_link::prelude::ModelBatch;
use fea_link::results::AnalysisSummary;
use fea_link::units::UnitSystem;

/// One-shot failures armed by a test
#[derive(Debug, Default)]
pub struct Faults {
    pub init: bool,
    pub open: bool,
    pub save: bool,
    pub release: bool,
    /// Refuse the item at this index of the next add of this kind, after
    /// storing the items before it
    pub reject: Option<(ElementType, usize)>,
}

/// Call counters and fault switches shared between a test and its engine
#[derive(Debug, Default)]
pub struct Recorder {
    pub inits: AtomicUsize,
    pub releases: AtomicUsize,
    pub opens: AtomicUsize,
    pub saves: AtomicUsize,
    pub discards: AtomicUsize,
    pub faults: Mutex<Faults>,
}

impl Recorder {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn arm(&self, set: impl FnOnce(&mut Faults)) {
        set(&mut self.faults.lock().unwrap());
    }

    /// Inits that were never matched by a release
    pub fn outstanding(&self) -> usize {
        Self::count(&self.inits) - Self::count(&self.releases)
    }

    fn take(&self, pick: impl FnOnce(&mut Faults) -> &mut bool) -> bool {
        std::mem::take(pick(&mut self.faults.lock().unwrap()))
    }

    fn take_rejection(&self, kind: ElementType) -> Option<usize> {
        let mut faults = self.faults.lock().unwrap();
        match faults.reject {
            Some((k, index)) if k == kind => {
                faults.reject = None;
                Some(index)
            }
            _ => None,
        }
    }
}

/// A [`FileEngine`] that counts lifecycle calls and fails on demand
#[derive(Debug)]
pub struct RecordingEngine {
    inner: FileEngine,
    pub recorder: Arc<Recorder>,
}

impl RecordingEngine {
    pub fn new() -> (Self, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (
            Self {
                inner: FileEngine::new(),
                recorder: Arc::clone(&recorder),
            },
            recorder,
        )
    }

    pub fn document(&self, id: ModelId) -> Option<&ModelDocument> {
        self.inner.document(id)
    }

    fn add<T>(
        &mut self,
        kind: ElementType,
        items: &[T],
        add: impl Fn(&mut FileEngine, &[T]) -> AddResult,
    ) -> AddResult {
        match self.recorder.take_rejection(kind) {
            Some(index) if index < items.len() => {
                add(&mut self.inner, &items[..index])?;
                Err(Rejection::new(index, format!("{kind} refused by test engine")))
            }
            _ => add(&mut self.inner, items),
        }
    }
}

impl Engine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn init(&mut self) -> Result<(), EngineFault> {
        if self.recorder.take(|f| &mut f.init) {
            return Err(EngineFault::new("licence check failed"));
        }
        self.inner.init()?;
        self.recorder.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineFault> {
        self.recorder.releases.fetch_add(1, Ordering::SeqCst);
        let released = self.inner.release();
        if self.recorder.take(|f| &mut f.release) {
            return Err(EngineFault::new("engine did not shut down cleanly"));
        }
        released
    }

    fn model_open(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault> {
        self.recorder.opens.fetch_add(1, Ordering::SeqCst);
        if self.recorder.take(|f| &mut f.open) {
            return Err(EngineFault::new("file is locked"));
        }
        self.inner.model_open(id, path)
    }

    fn model_create(&mut self, id: ModelId, path: &Path) -> Result<(), EngineFault> {
        self.recorder.opens.fetch_add(1, Ordering::SeqCst);
        if self.recorder.take(|f| &mut f.open) {
            return Err(EngineFault::new("directory is read-only"));
        }
        self.inner.model_create(id, path)
    }

    fn model_save_close(&mut self, id: ModelId, discard: bool) -> Result<(), EngineFault> {
        if discard {
            self.recorder.discards.fetch_add(1, Ordering::SeqCst);
        } else {
            self.recorder.saves.fetch_add(1, Ordering::SeqCst);
            if self.recorder.take(|f| &mut f.save) {
                return Err(EngineFault::new("disk full"));
            }
        }
        self.inner.model_save_close(id, discard)
    }

    fn model_add_nodes(&mut self, id: ModelId, nodes: &[Node]) -> AddResult {
        self.add(ElementType::Node, nodes, |e, items| e.model_add_nodes(id, items))
    }

    fn model_add_beams(&mut self, id: ModelId, beams: &[Beam]) -> AddResult {
        self.add(ElementType::Beam, beams, |e, items| e.model_add_beams(id, items))
    }

    fn model_add_plates(&mut self, id: ModelId, plates: &[Plate]) -> AddResult {
        self.add(ElementType::Plate, plates, |e, items| e.model_add_plates(id, items))
    }

    fn model_add_supports(&mut self, id: ModelId, supports: &[Support]) -> AddResult {
        self.add(ElementType::Support, supports, |e, items| e.model_add_supports(id, items))
    }

    fn model_add_loads(&mut self, id: ModelId, loads: &[Load]) -> AddResult {
        self.add(ElementType::Load, loads, |e, items| e.model_add_loads(id, items))
    }

    fn model_add_materials(&mut self, id: ModelId, materials: &[Material]) -> AddResult {
        self.add(ElementType::Material, materials, |e, items| e.model_add_materials(id, items))
    }

    fn model_add_joints(&mut self, id: ModelId, joints: &[Joint]) -> AddResult {
        self.add(ElementType::Joint, joints, |e, items| e.model_add_joints(id, items))
    }

    fn model_unit_system(&self, id: ModelId) -> Result<UnitSystem, EngineFault> {
        self.inner.model_unit_system(id)
    }

    fn model_set_unit_system(&mut self, id: ModelId, units: UnitSystem) -> Result<(), EngineFault> {
        self.inner.model_set_unit_system(id, units)
    }

    fn model_run_linear_static(
        &mut self,
        id: ModelId,
        cases: &[u32],
    ) -> Result<AnalysisSummary, EngineFault> {
        self.inner.model_run_linear_static(id, cases)
    }

    fn model_entity_exists(
        &self,
        id: ModelId,
        kind: ElementType,
        number: u32,
    ) -> Result<bool, EngineFault> {
        self.inner.model_entity_exists(id, kind, number)
    }

    fn model_summary(&self, id: ModelId) -> Result<ElementCounts, EngineFault> {
        self.inner.model_summary(id)
    }
}

/// Six collinear nodes joined by five beams
pub fn five_beam_frame() -> ModelBatch {
    ModelBatch::new()
        .with_nodes((1..=6).map(|i| Node::new(i, f64::from(i - 1), 0.0, 0.0)))
        .with_beams((1..=5).map(|i| Beam::new(i, i, i + 1)))
}
