use std::fs;
use std::path::Path;
use std::process::Command;

use fea_link::results::{AnalysisSummary, CaseSummary, NodeDisplacement, NodeReaction};
use rustc_hash::FxHashSet;
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::CalculixConfig;
use crate::deck::{CaseLoads, InputDeck};

const JOB_NAME: &str = "analysis";

/// Runs `ccx` on generated decks and reads the printed results back
#[derive(Debug, Clone)]
pub struct Executor {
    config: CalculixConfig,
}

impl Executor {
    pub fn new(config: CalculixConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalculixConfig {
        &self.config
    }

    /// Check that the solver can be started at all
    pub fn check_available(&self) -> Result<(), ExecutorError> {
        Command::new(&self.config.ccx_path)
            .arg("-v")
            .output()
            .map(|_| ())
            .map_err(|e| {
                ExecutorError::ExecutionError(format!(
                    "{} is not runnable: {e}; set CALCULIX_PATH to the solver",
                    self.config.ccx_path.display()
                ))
            })
    }

    pub fn execute(&self, deck: &InputDeck) -> Result<AnalysisSummary, ExecutorError> {
        // A unique temporary directory for this analysis
        let analysis_id = Uuid::new_v4();
        let temp_dir = match &self.config.work_dir {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(|e| ExecutorError::IoError(e.to_string()))?;
                TempDir::new_in(parent)
            }
            None => TempDir::new(),
        }
        .map_err(|e| ExecutorError::IoError(e.to_string()))?;
        let work_path = temp_dir.path();

        tracing::info!("Starting analysis {} in {:?}", analysis_id, work_path);

        let inp_path = work_path.join(format!("{JOB_NAME}.inp"));
        fs::write(&inp_path, &deck.text)
            .map_err(|e| ExecutorError::IoError(format!("Failed to write .inp file: {}", e)))?;
        self.maybe_export_debug_file(&inp_path, &analysis_id, "inp");

        // ccx expects the job name without extension
        tracing::info!("Running command: {} {}", self.config.ccx_path.display(), JOB_NAME);
        let output = Command::new(&self.config.ccx_path)
            .arg(JOB_NAME)
            .current_dir(work_path)
            .output()
            .map_err(|e| ExecutorError::ExecutionError(format!("Failed to execute ccx: {}", e)))?;

        let dat_path = work_path.join(format!("{JOB_NAME}.dat"));
        if dat_path.exists() {
            self.maybe_export_debug_file(&dat_path, &analysis_id, "dat");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            tracing::error!("CalculiX failed. Stderr: {}\nStdout: {}", stderr, stdout);
            return Err(ExecutorError::AnalysisFailed(format!(
                "CalculiX exited with status {}",
                output.status
            )));
        }

        if !dat_path.exists() {
            return Err(ExecutorError::AnalysisFailed("No .dat file generated".to_string()));
        }
        let content = fs::read_to_string(&dat_path)
            .map_err(|e| ExecutorError::IoError(format!("Failed to read .dat file: {}", e)))?;

        let summary = parse_dat(&content, &deck.cases)?;
        tracing::info!("Analysis {} finished: {}", analysis_id, summary);
        Ok(summary)
    }

    fn maybe_export_debug_file(&self, path: &Path, analysis_id: &Uuid, extension: &str) {
        let Some(dest_dir) = &self.config.debug_export else {
            return;
        };
        if let Err(err) = fs::create_dir_all(dest_dir) {
            tracing::warn!("Failed to create debug export directory {:?}: {}", dest_dir, err);
            return;
        }

        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        let dest_file = dest_dir.join(format!("analysis_{stamp}_{analysis_id}.{extension}"));
        if let Err(err) = fs::copy(path, &dest_file) {
            tracing::warn!("Failed to export debug file {:?}: {}", dest_file, err);
        } else {
            tracing::info!("Exported debug file to {:?}", dest_file);
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Displacements,
    Forces,
}

/// Node number followed by three values, as printed in `.dat` blocks
fn parse_row(line: &str) -> Option<(u32, [f64; 3])> {
    let mut parts = line.split_whitespace();
    let id = parts.next()?.parse::<u32>().ok()?;
    let mut values = [0.0; 3];
    for v in &mut values {
        *v = parts.next()?.parse::<f64>().ok()?;
    }
    Some((id, values))
}

/// Read per-step displacement and force blocks of a `.dat` file.
///
/// Each displacement header opens the next step; steps map to `cases` in
/// order. Elastic energy is ½ Σ F·u over the loaded nodes of each case.
pub fn parse_dat(content: &str, cases: &[CaseLoads]) -> Result<AnalysisSummary, ExecutorError> {
    let mut steps: Vec<CaseSummary> = Vec::new();
    let mut section = Section::None;
    let mut seen_nodes: FxHashSet<u32> = FxHashSet::default();

    for line in content.lines() {
        let lower = line.to_lowercase();

        // Detect sections
        if lower.contains("displacements") && lower.contains("vx") {
            let Some(loads) = cases.get(steps.len()) else {
                return Err(ExecutorError::ParsingError(format!(
                    "More result steps than the {} requested case(s)",
                    cases.len()
                )));
            };
            steps.push(CaseSummary {
                case: loads.case,
                ..CaseSummary::default()
            });
            section = Section::Displacements;
            seen_nodes.clear();
            continue;
        } else if lower.contains("forces") && lower.contains("fx") && !lower.contains("total") {
            section = Section::Forces;
            seen_nodes.clear();
            continue;
        } else if lower.contains(" for set ") {
            // Some other printed variable
            section = Section::None;
            continue;
        }

        let Some(step) = steps.last_mut() else {
            continue;
        };
        let Some((node, [a, b, c])) = parse_row(line) else {
            continue;
        };
        // ccx may print a node more than once per block
        if !seen_nodes.insert(node) {
            continue;
        }
        match section {
            Section::Displacements => step
                .displacements
                .push(NodeDisplacement::from_array(node, [a, b, c, 0.0, 0.0, 0.0])),
            Section::Forces => step
                .reactions
                .push(NodeReaction::from_array(node, [a, b, c, 0.0, 0.0, 0.0])),
            Section::None => {}
        }
    }

    if steps.len() != cases.len() {
        return Err(ExecutorError::ParsingError(format!(
            "Found {} result step(s) for {} requested case(s)",
            steps.len(),
            cases.len()
        )));
    }

    for (step, loads) in steps.iter_mut().zip(cases) {
        step.elastic_energy = elastic_energy(step, loads);
    }
    Ok(AnalysisSummary::from_cases(steps))
}

fn elastic_energy(step: &CaseSummary, loads: &CaseLoads) -> f64 {
    let work: f64 = loads
        .nodal
        .iter()
        .filter_map(|(node, load)| {
            let u = step.displacements.iter().find(|d| d.node == *node)?;
            let t = u.translation();
            Some(load[0] * t[0] + load[1] * t[1] + load[2] * t[2])
        })
        .sum();
    0.5 * work
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_STEPS: &str = "
                        S T E P       1


                                INCREMENT     1


 displacements (vx,vy,vz) for set NALL and time  0.1000000E+01

         1  0.000000E+00  0.000000E+00  0.000000E+00
         2  1.000000E-03  0.000000E+00 -4.000000E-03

 forces (fx,fy,fz) for set NALL and time  0.1000000E+01

         1  0.000000E+00  0.000000E+00  1.000000E+01
         2  0.000000E+00  0.000000E+00 -1.000000E+01

                        S T E P       2


 displacements (vx,vy,vz) for set NALL and time  0.2000000E+01

         1  0.000000E+00  0.000000E+00  0.000000E+00
         2  2.000000E-03  0.000000E+00  0.000000E+00
         2  2.000000E-03  0.000000E+00  0.000000E+00

 forces (fx,fy,fz) for set NALL and time  0.2000000E+01

         1 -5.000000E+00  0.000000E+00  0.000000E+00
";

    fn loads() -> Vec<CaseLoads> {
        vec![
            CaseLoads {
                case: 1,
                nodal: vec![(2, [0.0, 0.0, -10.0, 0.0, 0.0, 0.0])],
            },
            CaseLoads {
                case: 3,
                nodal: vec![(2, [5.0, 0.0, 0.0, 0.0, 0.0, 0.0])],
            },
        ]
    }

    #[test]
    fn test_parse_two_steps() {
        let summary = parse_dat(TWO_STEPS, &loads()).unwrap();
        assert_eq!(summary.cases.len(), 2);

        let first = summary.case(1).unwrap();
        assert_eq!(first.displacements.len(), 2);
        assert_eq!(first.reactions.len(), 2);
        assert_relative_eq!(first.elastic_energy, 0.02, epsilon = 1e-12);
        assert_relative_eq!(first.total_reaction()[2], 0.0, epsilon = 1e-12);

        let second = summary.case(3).unwrap();
        assert_eq!(second.displacements.len(), 2);
        assert_relative_eq!(second.elastic_energy, 0.005, epsilon = 1e-12);

        assert_relative_eq!(summary.max_displacement, (1e-6f64 + 16e-6).sqrt(), epsilon = 1e-12);
        assert_eq!(summary.max_displacement_node, Some(2));
        assert_eq!(summary.max_displacement_case, Some(1));
    }

    #[test]
    fn test_step_count_mismatch() {
        let err = parse_dat(TWO_STEPS, &loads()[..1]).unwrap_err();
        assert!(matches!(err, ExecutorError::ParsingError(_)));

        let mut three = loads();
        three.push(CaseLoads { case: 4, nodal: vec![] });
        assert!(parse_dat(TWO_STEPS, &three).is_err());
    }

    #[test]
    fn test_missing_solver_is_unavailable() {
        let executor = Executor::new(CalculixConfig::default().with_ccx_path("/nonexistent/ccx"));
        assert!(matches!(executor.check_available(), Err(ExecutorError::ExecutionError(_))));
    }
}
