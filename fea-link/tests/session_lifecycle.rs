mod common;

use std::sync::Arc;

use common::{five_beam_frame, Recorder, RecordingEngine};
use fea_link::engine::ModelDocument;
use fea_link::prelude::*;
use fea_link::session::EngineSlot;

fn model_in(dir: &tempfile::TempDir) -> Model {
    Model::new(ModelId::new(1).unwrap(), dir.path().join("frame.json"))
}

fn recording_session() -> (EngineSession<RecordingEngine>, Arc<Recorder>, Arc<EngineSlot>) {
    let (engine, recorder) = RecordingEngine::new();
    let slot = EngineSlot::new();
    (EngineSession::with_slot(engine, Arc::clone(&slot)), recorder, slot)
}

fn stored(session: &EngineSession<RecordingEngine>) -> ElementCounts {
    session
        .engine()
        .document(ModelId::new(1).unwrap())
        .map(|doc| doc.counts())
        .unwrap_or_default()
}

#[test]
fn engine_refusing_fourth_beam_leaves_model_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, recorder, _slot) = recording_session();
    session.initialize().unwrap();
    session.open(model_in(&dir), OpenMode::Create).unwrap();

    recorder.arm(|f| f.reject = Some((ElementType::Beam, 3)));
    let err = session.mutate(&five_beam_frame()).unwrap_err();
    match err {
        LinkError::Mutation { kind, index, .. } => {
            assert_eq!(kind, ElementType::Beam);
            assert_eq!(index, 3);
        }
        other => panic!("expected a mutation error, got {other:?}"),
    }
    assert_eq!(stored(&session).total(), 0);
    assert_eq!(session.state(), SessionState::Open);
    assert_eq!(session.committed().total(), 0);

    // The same batch goes through once the engine accepts it
    let counts = session.mutate(&five_beam_frame()).unwrap();
    assert_eq!(counts.beams, 5);
    assert_eq!(stored(&session).beams, 5);
    session.release().unwrap();
}

#[test]
fn rollback_replays_earlier_batches() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, recorder, _slot) = recording_session();
    session.initialize().unwrap();
    session
        .open(model_in(&dir).with_units(UnitSystem::si_mm()), OpenMode::Create)
        .unwrap();

    let frame = five_beam_frame();
    let nodes = ModelBatch::new().with_nodes(frame.nodes.clone());
    let beams = ModelBatch::new().with_beams(frame.beams.clone());
    session.mutate(&nodes).unwrap();

    recorder.arm(|f| f.reject = Some((ElementType::Beam, 2)));
    assert!(session.mutate(&beams).is_err());

    assert_eq!(session.state(), SessionState::Mutated(1));
    let after = stored(&session);
    assert_eq!(after.nodes, 6);
    assert_eq!(after.beams, 0);
    assert_eq!(
        session
            .engine()
            .document(ModelId::new(1).unwrap())
            .map(|doc| doc.units),
        Some(UnitSystem::si_mm())
    );
    assert_eq!(Recorder::count(&recorder.discards), 1);
    session.release().unwrap();
}

#[test]
fn failed_rollback_fails_session_but_frees_engine() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, recorder, slot) = recording_session();
    session.initialize().unwrap();
    session.open(model_in(&dir), OpenMode::Create).unwrap();

    recorder.arm(|f| {
        f.reject = Some((ElementType::Node, 1));
        f.open = true;
    });
    assert!(session.mutate(&five_beam_frame()).is_err());
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.holds_engine());
    assert!(matches!(session.mutate(&five_beam_frame()), Err(LinkError::InvalidState { .. })));

    session.release().unwrap();
    assert_eq!(session.state(), SessionState::Failed);
    assert!(!slot.is_held());
    assert_eq!(recorder.outstanding(), 0);
}

#[test]
fn pre_validation_sees_committed_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _recorder, _slot) = recording_session();
    session.initialize().unwrap();
    session.open(model_in(&dir), OpenMode::Create).unwrap();
    session.mutate(&five_beam_frame()).unwrap();
    session.save_and_close().unwrap();

    session.open(model_in(&dir), OpenMode::Existing).unwrap();
    let err = session.mutate(&five_beam_frame()).unwrap_err();
    assert!(matches!(
        err,
        LinkError::Mutation {
            kind: ElementType::Node,
            index: 0,
            ..
        }
    ));

    // New beams may reference nodes that only exist in the file
    let extra = ModelBatch::new().with_beams([Beam::new(6, 1, 6)]);
    session.mutate(&extra).unwrap();
    assert_eq!(stored(&session).beams, 6);
    session.release().unwrap();
}

#[test]
fn lifecycle_is_balanced_on_every_path() {
    type Arm = fn(&mut common::Faults);
    let scenarios: [(&str, Arm); 6] = [
        ("clean", |_| {}),
        ("init", |f| f.init = true),
        ("open", |f| f.open = true),
        ("reject", |f| f.reject = Some((ElementType::Beam, 3))),
        ("save", |f| f.save = true),
        ("release", |f| f.release = true),
    ];

    for (name, arm) in scenarios {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, recorder, slot) = recording_session();
        recorder.arm(arm);

        let frame = five_beam_frame();
        let result = run_pipeline(&mut session, model_in(&dir), OpenMode::Create, &frame, &[]);
        assert_eq!(result.is_ok(), name == "clean", "scenario {name}: {result:?}");
        assert!(!slot.is_held(), "scenario {name} kept the engine");
        assert!(!session.holds_engine(), "scenario {name}");
        assert_eq!(recorder.outstanding(), 0, "scenario {name}");
    }
}

#[test]
fn init_failure_leaves_slot_free() {
    let (mut session, recorder, slot) = recording_session();
    recorder.arm(|f| f.init = true);
    assert!(matches!(session.initialize(), Err(LinkError::Engine(_))));
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(!slot.is_held());

    session.initialize().unwrap();
    session.release().unwrap();
    assert_eq!(Recorder::count(&recorder.inits), 1);
    assert_eq!(Recorder::count(&recorder.releases), 1);
}

#[test]
fn open_failure_is_still_releasable() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, recorder, slot) = recording_session();
    session.initialize().unwrap();

    recorder.arm(|f| f.open = true);
    let err = session.open(model_in(&dir), OpenMode::Create).unwrap_err();
    assert!(matches!(err, LinkError::FileAccess { .. }));
    assert_eq!(session.state(), SessionState::Initialized);

    session.release().unwrap();
    assert_eq!(session.state(), SessionState::Released);
    assert!(!slot.is_held());
}

#[test]
fn save_failure_discards_and_stays_releasable() {
    let dir = tempfile::tempdir().unwrap();
    let model = model_in(&dir);
    let path = model.path.clone();
    let (mut session, recorder, slot) = recording_session();
    session.initialize().unwrap();
    session.open(model, OpenMode::Create).unwrap();
    session.mutate(&five_beam_frame()).unwrap();

    recorder.arm(|f| f.save = true);
    let err = session.save_and_close().unwrap_err();
    assert!(matches!(err, LinkError::Save { .. }));
    assert_eq!(session.state(), SessionState::Initialized);
    assert!(session.model().is_none());

    // Nothing but the empty file written on create reached disk
    assert_eq!(ModelDocument::load(&path).unwrap().counts().total(), 0);

    session.release().unwrap();
    assert!(!slot.is_held());
}

#[test]
fn release_fault_still_frees_engine() {
    let (mut session, recorder, slot) = recording_session();
    session.initialize().unwrap();
    recorder.arm(|f| f.release = true);

    assert!(matches!(session.release(), Err(LinkError::Engine(_))));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(!slot.is_held());
    // Nothing left to give back
    session.release().unwrap();
}

#[test]
fn dropping_session_releases_engine() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, recorder, slot) = recording_session();
    session.initialize().unwrap();
    session.open(model_in(&dir), OpenMode::Create).unwrap();
    drop(session);
    assert!(!slot.is_held());
    assert_eq!(recorder.outstanding(), 0);
    assert_eq!(Recorder::count(&recorder.discards), 1);
}

#[test]
fn operations_out_of_order_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _recorder, _slot) = recording_session();
    assert!(matches!(
        session.open(model_in(&dir), OpenMode::Create),
        Err(LinkError::InvalidState {
            operation: "open",
            state: SessionState::Uninitialized,
        })
    ));
    assert!(session.save_and_close().is_err());
    assert!(session.analyse(&[1]).is_err());

    session.initialize().unwrap();
    assert!(matches!(session.initialize(), Err(LinkError::InvalidState { .. })));
    session.release().unwrap();
}

#[test]
fn global_slot_admits_one_session() {
    let mut first = EngineSession::new(FileEngine::new());
    let mut second = EngineSession::new(FileEngine::new());

    first.initialize().unwrap();
    assert!(matches!(second.initialize(), Err(LinkError::EngineUnavailable)));

    first.release().unwrap();
    second.initialize().unwrap();
    assert!(matches!(first.initialize(), Err(LinkError::EngineUnavailable)));
    second.release().unwrap();
}

#[test]
fn classified_containers_flow_into_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ConnectivityResolver::new(ConnectivityOptions::default());
    let segments = [
        LineSegment::new([0.0, 0.0, 0.0].into(), [2.0, 0.0, 0.0].into()),
        LineSegment::new([2.0, 0.0, 0.0].into(), [2.0, 0.0, 3.0].into()),
    ];
    let conn = resolver.resolve_lines(&segments, None).unwrap();

    let mut items: Vec<ElementContainer> = conn
        .nodes
        .into_iter()
        .map(ElementContainer::wrap)
        .chain(conn.beams.into_iter().map(ElementContainer::wrap))
        .collect();
    items.push(ElementContainer::wrap(Support::fixed(SupportLocation::Node(1))));
    items.push(ElementContainer::empty());

    let classification = classify(&items);
    assert_eq!(classification.skipped_count, 1);
    let batch = classification.into_batch();

    let (mut session, _recorder, _slot) = recording_session();
    let report = run_pipeline(&mut session, model_in(&dir), OpenMode::Create, &batch, &[]).unwrap();
    assert_eq!(report.committed.nodes, 3);
    assert_eq!(report.committed.beams, 2);
    assert_eq!(report.committed.supports, 1);

    let saved = ModelDocument::load(&report.model.path).unwrap();
    assert_eq!(saved.counts(), report.committed);
}
