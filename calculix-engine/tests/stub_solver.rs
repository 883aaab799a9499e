//! End-to-end run against a stand-in `ccx` that prints canned results

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use approx::assert_relative_eq;
use calculix_engine::{CalculixConfig, CalculixEngine};
use fea_link::engine::ModelDocument;
use fea_link::prelude::*;
use fea_link::session::EngineSlot;
use nalgebra::{Point3, Vector3};

const STUB: &str = r#"#!/bin/sh
if [ "$1" = "-v" ]; then
    echo "This is Version 2.21"
    exit 0
fi
test -f "$1.inp" || exit 2
cat > "$1.dat" <<'DAT'

                        S T E P       1

 displacements (vx,vy,vz) for set NALL and time  0.1000000E+01

         1  0.000000E+00  0.000000E+00  0.000000E+00
         2  0.000000E+00  0.000000E+00 -2.000000E-03

 forces (fx,fy,fz) for set NALL and time  0.1000000E+01

         1  0.000000E+00  0.000000E+00  1.000000E+03
         2  0.000000E+00  0.000000E+00  0.000000E+00
DAT
"#;

fn install_stub(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("ccx");
    std::fs::write(&path, STUB).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[test]
fn cantilever_through_stub_solver() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("export");
    let config = CalculixConfig::default()
        .with_ccx_path(install_stub(dir.path()))
        .with_work_dir(dir.path().join("work"))
        .with_debug_export(&export);

    let batch = ModelBatch::new()
        .with_nodes([Node::new(1, 0.0, 0.0, 0.0), Node::new(2, 2.0, 0.0, 0.0)])
        .with_beams([Beam::new(1, 1, 2)])
        .with_supports([Support::fixed(SupportLocation::Node(1))])
        .with_loads([Load::force(
            LoadTarget::Point(Point3::new(2.0, 0.0, 0.0)),
            Vector3::new(0.0, 0.0, -1000.0),
            1,
        )]);

    let slot = EngineSlot::new();
    let mut session = EngineSession::with_slot(CalculixEngine::new(config), slot.clone());
    let model = Model::new(ModelId::new(1).unwrap(), dir.path().join("cantilever.json"));
    let report = run_pipeline(&mut session, model, OpenMode::Create, &batch, &[1]).unwrap();

    let analysis = report.analysis.unwrap();
    assert_relative_eq!(analysis.max_displacement, 2e-3, epsilon = 1e-12);
    assert_eq!(analysis.max_displacement_node, Some(2));
    assert_relative_eq!(analysis.elastic_energy, 1.0, epsilon = 1e-9);
    assert_relative_eq!(analysis.case(1).unwrap().total_reaction()[2], 1000.0, epsilon = 1e-9);
    assert!(!slot.is_held());

    let saved = ModelDocument::load(&report.model.path).unwrap();
    assert_eq!(saved.counts(), batch.counts());

    let exported: Vec<_> = std::fs::read_dir(&export).unwrap().collect();
    assert_eq!(exported.len(), 2);
}
