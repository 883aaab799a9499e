//! Result types returned by engine analysis

use std::fmt;

use serde::{Deserialize, Serialize};

/// Displacement results at a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDisplacement {
    pub node: u32,
    /// Displacement in X direction
    pub dx: f64,
    /// Displacement in Y direction
    pub dy: f64,
    /// Displacement in Z direction
    pub dz: f64,
    /// Rotation about X axis
    pub rx: f64,
    /// Rotation about Y axis
    pub ry: f64,
    /// Rotation about Z axis
    pub rz: f64,
}

impl NodeDisplacement {
    /// Create from array [DX, DY, DZ, RX, RY, RZ]
    pub fn from_array(node: u32, arr: [f64; 6]) -> Self {
        Self {
            node,
            dx: arr[0],
            dy: arr[1],
            dz: arr[2],
            rx: arr[3],
            ry: arr[4],
            rz: arr[5],
        }
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    /// Get translation magnitude
    pub fn translation_magnitude(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }

    /// Get rotation magnitude
    pub fn rotation_magnitude(&self) -> f64 {
        (self.rx.powi(2) + self.ry.powi(2) + self.rz.powi(2)).sqrt()
    }
}

/// Reaction forces at a supported node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeReaction {
    pub node: u32,
    /// Reaction force in X direction
    pub fx: f64,
    /// Reaction force in Y direction
    pub fy: f64,
    /// Reaction force in Z direction
    pub fz: f64,
    /// Reaction moment about X axis
    pub mx: f64,
    /// Reaction moment about Y axis
    pub my: f64,
    /// Reaction moment about Z axis
    pub mz: f64,
}

impl NodeReaction {
    /// Create from array [FX, FY, FZ, MX, MY, MZ]
    pub fn from_array(node: u32, arr: [f64; 6]) -> Self {
        Self {
            node,
            fx: arr[0],
            fy: arr[1],
            fz: arr[2],
            mx: arr[3],
            my: arr[4],
            mz: arr[5],
        }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.fx, self.fy, self.fz, self.mx, self.my, self.mz]
    }

    /// Get total force magnitude
    pub fn force_magnitude(&self) -> f64 {
        (self.fx.powi(2) + self.fy.powi(2) + self.fz.powi(2)).sqrt()
    }

    /// Get total moment magnitude
    pub fn moment_magnitude(&self) -> f64 {
        (self.mx.powi(2) + self.my.powi(2) + self.mz.powi(2)).sqrt()
    }
}

/// Results of one load case
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaseSummary {
    pub case: u32,
    pub displacements: Vec<NodeDisplacement>,
    pub reactions: Vec<NodeReaction>,
    /// Work done by the applied loads, ½ Σ F·u
    pub elastic_energy: f64,
}

/// Greatest `(node, value)` pair; ties keep the earlier node
fn peak(values: impl Iterator<Item = (u32, f64)>) -> Option<(u32, f64)> {
    values.fold(None, |best, (node, value)| match best {
        Some((_, b)) if b >= value => best,
        _ => Some((node, value)),
    })
}

impl CaseSummary {
    /// Largest translation magnitude and the node it occurs at
    pub fn max_displacement(&self) -> Option<(u32, f64)> {
        peak(self.displacements.iter().map(|d| (d.node, d.translation_magnitude())))
    }

    /// Largest rotation magnitude and the node it occurs at
    pub fn max_rotation(&self) -> Option<(u32, f64)> {
        peak(self.displacements.iter().map(|d| (d.node, d.rotation_magnitude())))
    }

    /// Reaction with the largest force magnitude
    pub fn peak_reaction(&self) -> Option<&NodeReaction> {
        self.reactions.iter().fold(None::<&NodeReaction>, |best, r| match best {
            Some(b) if b.force_magnitude() >= r.force_magnitude() => best,
            _ => Some(r),
        })
    }

    /// Sum of all reactions
    pub fn total_reaction(&self) -> [f64; 6] {
        self.reactions.iter().fold([0.0; 6], |mut acc, r| {
            for (a, v) in acc.iter_mut().zip(r.as_array()) {
                *a += v;
            }
            acc
        })
    }
}

/// Summary of analysis results over all requested load cases
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub cases: Vec<CaseSummary>,
    /// Maximum translation over all cases
    pub max_displacement: f64,
    /// Node with maximum displacement
    pub max_displacement_node: Option<u32>,
    /// Case with maximum displacement
    pub max_displacement_case: Option<u32>,
    /// Total elastic energy over all cases
    pub elastic_energy: f64,
}

impl AnalysisSummary {
    pub fn from_cases(cases: Vec<CaseSummary>) -> Self {
        let mut summary = Self {
            elastic_energy: cases.iter().map(|c| c.elastic_energy).sum(),
            ..Self::default()
        };
        for case in &cases {
            if let Some((node, value)) = case.max_displacement() {
                if summary.max_displacement_node.is_none() || value > summary.max_displacement {
                    summary.max_displacement = value;
                    summary.max_displacement_node = Some(node);
                    summary.max_displacement_case = Some(case.case);
                }
            }
        }
        summary.cases = cases;
        summary
    }

    pub fn case(&self, case: u32) -> Option<&CaseSummary> {
        self.cases.iter().find(|c| c.case == case)
    }

    /// Reactions of every case, tagged with the case number
    pub fn reactions(&self) -> impl Iterator<Item = (u32, &NodeReaction)> {
        self.cases
            .iter()
            .flat_map(|c| c.reactions.iter().map(move |r| (c.case, r)))
    }
}

impl fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.max_displacement_node, self.max_displacement_case) {
            (Some(node), Some(case)) => writeln!(
                f,
                "Max displacement: {:.6e} at node {node} (case {case})",
                self.max_displacement
            )?,
            _ => writeln!(f, "Max displacement: n/a")?,
        }
        for case in &self.cases {
            let r = case.total_reaction();
            write!(
                f,
                "Case {}: reaction sum F=({:.4e}, {:.4e}, {:.4e}) M=({:.4e}, {:.4e}, {:.4e})",
                case.case, r[0], r[1], r[2], r[3], r[4], r[5]
            )?;
            if let Some(peak) = case.peak_reaction() {
                write!(
                    f,
                    ", peak |F|={:.4e} |M|={:.4e} at node {}",
                    peak.force_magnitude(),
                    peak.moment_magnitude(),
                    peak.node
                )?;
            }
            if let Some((node, value)) = case.max_rotation() {
                write!(f, ", max rotation {value:.4e} at node {node}")?;
            }
            writeln!(f, ", energy {:.6e}", case.elastic_energy)?;
        }
        write!(f, "Elastic energy: {:.6e}", self.elastic_energy)
    }
}
