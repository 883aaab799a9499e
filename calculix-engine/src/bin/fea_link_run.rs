//! Run one assembly pipeline from a JSON request and print the outcome as JSON.
//!
//! Usage: `fea-link-run [request.json]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use calculix_engine::CalculixEngine;
use fea_link::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EngineKind {
    /// Store only; analysis is refused
    File,
    #[default]
    Calculix,
}

#[derive(Debug, Deserialize)]
struct AssemblyRequest {
    model_id: u32,
    path: PathBuf,
    #[serde(default = "default_mode")]
    mode: OpenMode,
    #[serde(default)]
    units: UnitSystem,
    #[serde(default)]
    engine: EngineKind,
    #[serde(default)]
    policy: ClassifyPolicy,
    /// Fully specified elements
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    beams_from_lines: Option<BeamsFromLines>,
    #[serde(default)]
    supports: Option<SupportsRequest>,
    /// DOFs for supports that carry no DOF tree; fixed when absent
    #[serde(default)]
    support_dofs: Option<DofMask>,
    #[serde(default)]
    loads: Option<LoadsRequest>,
    /// Load cases to analyse; no analysis when empty
    #[serde(default)]
    load_cases: Vec<u32>,
}

fn default_mode() -> OpenMode {
    OpenMode::Create
}

#[derive(Debug, Serialize)]
struct RunReport {
    model: Model,
    committed: ElementCounts,
    analysis: Option<AnalysisSummary>,
    finished_at: String,
}

/// Containers for everything the request describes, in request order
fn containers(request: &AssemblyRequest) -> Result<Vec<ElementContainer>> {
    let mut items: Vec<ElementContainer> =
        request.elements.iter().cloned().map(ElementContainer::wrap).collect();
    if let Some(lines) = &request.beams_from_lines {
        items.extend(lines.build().context("building beams from lines")?);
    }
    if let Some(supports) = &request.supports {
        let selector = DofSelector::new(request.support_dofs.unwrap_or(DofMask::fixed()));
        items.extend(supports.build(&selector).context("building supports")?.supports);
    }
    if let Some(loads) = &request.loads {
        items.extend(loads.build().context("building loads")?);
    }
    Ok(items)
}

fn run<E: Engine>(
    engine: E,
    model: Model,
    request: &AssemblyRequest,
    batch: &ModelBatch,
) -> Result<PipelineReport> {
    let mut session = EngineSession::new(engine);
    let report = run_pipeline(&mut session, model, request.mode, batch, &request.load_cases)
        .with_context(|| format!("pipeline failed in state {}", session.state()))?;
    Ok(report)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calculix_engine=info,fea_link=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let request_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "assembly_request.json".to_string());
    let json = std::fs::read_to_string(&request_path)
        .with_context(|| format!("reading {request_path}"))?;
    let request: AssemblyRequest =
        serde_json::from_str(&json).with_context(|| format!("parsing {request_path}"))?;

    let items = containers(&request)?;
    let classification = classify_with(&items, request.policy)?;
    tracing::info!("{}", classification);
    let batch = classification.into_batch();
    if batch.is_empty() {
        bail!("request {request_path} describes no elements");
    }

    let model =
        Model::new(ModelId::new(request.model_id)?, request.path.clone()).with_units(request.units);
    let report = match request.engine {
        EngineKind::File => run(FileEngine::new(), model, &request, &batch)?,
        EngineKind::Calculix => run(CalculixEngine::from_env(), model, &request, &batch)?,
    };
    if let Some(analysis) = &report.analysis {
        tracing::info!("{}", analysis);
    }

    let out = RunReport {
        model: report.model,
        committed: report.committed,
        analysis: report.analysis,
        finished_at: chrono::Utc::now().to_rfc3339(),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
