//! CalculiX input deck (`.inp`) generation from a stored model document

use std::collections::BTreeMap;
use std::fmt::Write as _;

use fea_link::elements::{
    Beam, BeamSection, Dof, LoadTarget, Material, Plate, Support, SupportLocation,
};
use fea_link::engine::ModelDocument;
use fea_link::geometry::connectivity::DEFAULT_TOLERANCE;
use nalgebra::{Point3, Vector3};

/// Plate element numbers are offset so they never collide with beam numbers
pub const PLATE_OFFSET: u32 = 1_000_000;

/// Spring elements for partially rigid supports start here
pub const SPRING_OFFSET: u32 = 2_000_000;

/// Spring constant of a fully rigid support DOF; partial ratios scale it
pub const REFERENCE_STIFFNESS: f64 = 1.0e12;

/// Loads of one case resolved to node numbers, as `[FX, FY, FZ, MX, MY, MZ]`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseLoads {
    pub case: u32,
    pub nodal: Vec<(u32, [f64; 6])>,
}

/// A generated deck plus what is needed to read its results back
#[derive(Debug, Clone)]
pub struct InputDeck {
    pub text: String,
    /// Steps in deck order, one per requested case
    pub cases: Vec<CaseLoads>,
}

impl InputDeck {
    /// Generate a linear static deck with one step per case in `cases`
    pub fn generate(doc: &ModelDocument, cases: &[u32]) -> Result<Self, DeckError> {
        Self::generate_with_tolerance(doc, cases, DEFAULT_TOLERANCE)
    }

    /// As [`InputDeck::generate`], resolving point locations within `tolerance`
    pub fn generate_with_tolerance(
        doc: &ModelDocument,
        cases: &[u32],
        tolerance: f64,
    ) -> Result<Self, DeckError> {
        if doc.nodes().is_empty() {
            return Err(DeckError::Empty);
        }
        if cases.is_empty() {
            return Err(DeckError::NoCases);
        }

        let mut writer = DeckWriter {
            doc,
            tolerance,
            inp: String::new(),
        };
        writer.heading();
        writer.nodes();
        writer.beams()?;
        writer.plates()?;
        writer.supports()?;

        let mut steps = Vec::with_capacity(cases.len());
        for &case in cases {
            let loads = writer.case_loads(case)?;
            writer.step(&loads);
            steps.push(loads);
        }

        tracing::debug!(
            "Generated deck: {} nodes, {} beams, {} plates, {} step(s)",
            doc.nodes().len(),
            doc.beams().len(),
            doc.plates().len(),
            steps.len()
        );
        Ok(Self {
            text: writer.inp,
            cases: steps,
        })
    }
}

struct DeckWriter<'a> {
    doc: &'a ModelDocument,
    tolerance: f64,
    inp: String,
}

impl DeckWriter<'_> {
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        // Writing into a String cannot fail
        let _ = self.inp.write_fmt(args);
        self.inp.push('\n');
    }

    fn heading(&mut self) {
        self.inp.push_str("*HEADING\n");
        self.line(format_args!("fea-link model [{}]", self.doc.units));
    }

    fn nodes(&mut self) {
        self.inp.push_str("*NODE, NSET=NALL\n");
        let doc = self.doc;
        for node in doc.nodes() {
            let p = node.position;
            self.line(format_args!("{}, {:.6}, {:.6}, {:.6}", node.id, p.x, p.y, p.z));
        }
    }

    fn property(&self, id: u32) -> Result<Material, DeckError> {
        self.doc.property(id).ok_or(DeckError::MissingProperty(id))
    }

    fn position(&self, node: u32) -> Result<Point3<f64>, DeckError> {
        self.doc
            .node(node)
            .map(|n| n.position)
            .ok_or(DeckError::MissingNode(node))
    }

    fn material(&mut self, name: &str, material: &Material) {
        self.line(format_args!("*MATERIAL, NAME={name}"));
        self.inp.push_str("*ELASTIC\n");
        self.line(format_args!("{:.6e}, {:.6}", material.elastic_modulus, material.poisson_ratio));
        self.inp.push_str("*DENSITY\n");
        self.line(format_args!("{:.6e}", material.density));
    }

    /// Beams are grouped by property and orientation, one element set each
    fn beams(&mut self) -> Result<(), DeckError> {
        let doc = self.doc;
        if doc.beams().is_empty() {
            return Ok(());
        }
        let mut groups: BTreeMap<(u32, usize), Vec<&Beam>> = BTreeMap::new();
        for beam in doc.beams() {
            let axis = self.position(beam.end())? - self.position(beam.start())?;
            groups
                .entry((beam.effective_property(), orientation_index(&axis)))
                .or_default()
                .push(beam);
        }

        let mut written = Vec::new();
        for (&(property, orientation), beams) in &groups {
            let elset = format!("EB{property}_{orientation}");
            self.line(format_args!("*ELEMENT, TYPE=B31, ELSET={elset}"));
            for beam in beams {
                self.line(format_args!("{}, {}, {}", beam.id, beam.start(), beam.end()));
            }

            let material = self.property(property)?;
            if !written.contains(&property) {
                self.material(&format!("P{property}"), &material);
                written.push(property);
            }
            match material.section {
                BeamSection::Rectangular { width, height } => {
                    self.line(format_args!(
                        "*BEAM SECTION, ELSET={elset}, MATERIAL=P{property}, SECTION=RECT"
                    ));
                    self.line(format_args!("{width:.6}, {height:.6}"));
                }
                BeamSection::Circular { radius } => {
                    self.line(format_args!(
                        "*BEAM SECTION, ELSET={elset}, MATERIAL=P{property}, SECTION=CIRC"
                    ));
                    self.line(format_args!("{radius:.6}"));
                }
            }
            let [x, y, z] = ORIENTATIONS[orientation];
            self.line(format_args!("{x:.1}, {y:.1}, {z:.1}"));
        }
        Ok(())
    }

    /// Plates become S3 or S4 shells grouped by property
    fn plates(&mut self) -> Result<(), DeckError> {
        let doc = self.doc;
        if doc.plates().is_empty() {
            return Ok(());
        }
        let mut groups: BTreeMap<u32, Vec<&Plate>> = BTreeMap::new();
        for plate in doc.plates() {
            groups.entry(plate.effective_property()).or_default().push(plate);
        }

        for (&property, plates) in &groups {
            let mut tri = Vec::new();
            let mut quad = Vec::new();
            for plate in plates {
                for &n in &plate.nodes {
                    self.position(n)?;
                }
                let nodes = plate
                    .nodes
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                let line = format!("{}, {nodes}", PLATE_OFFSET + plate.id);
                match plate.nodes.len() {
                    3 => tri.push(line),
                    4 => quad.push(line),
                    n => return Err(DeckError::UnsupportedPlate { plate: plate.id, corners: n }),
                }
            }

            let elset = format!("ES{property}");
            let mut parts = Vec::new();
            for (kind, lines) in [("S3", tri), ("S4", quad)] {
                if lines.is_empty() {
                    continue;
                }
                let part = format!("{elset}_{kind}");
                self.line(format_args!("*ELEMENT, TYPE={kind}, ELSET={part}"));
                for line in lines {
                    self.line(format_args!("{line}"));
                }
                parts.push(part);
            }
            self.line(format_args!("*ELSET, ELSET={elset}"));
            self.line(format_args!("{}", parts.join(", ")));

            let material = self.property(property)?;
            let name = format!("PS{property}");
            self.material(&name, &material);
            self.line(format_args!("*SHELL SECTION, ELSET={elset}, MATERIAL={name}"));
            self.line(format_args!("{:.6}", material.thickness));
        }
        Ok(())
    }

    fn resolve(&self, point: &Point3<f64>) -> Result<u32, DeckError> {
        self.doc
            .node_at(point, self.tolerance)
            .map(|n| n.id)
            .ok_or(DeckError::UnresolvedLocation {
                x: point.x,
                y: point.y,
                z: point.z,
            })
    }

    fn support_node(&self, support: &Support) -> Result<u32, DeckError> {
        match support.location {
            Some(SupportLocation::Node(n)) => self.position(n).map(|_| n),
            Some(SupportLocation::Point(p)) => self.resolve(&p),
            None => Err(DeckError::MissingLocation),
        }
    }

    /// Rigid DOFs as `*BOUNDARY`, partial ones as grounded springs.
    ///
    /// Supports in a rotated frame get a node set and a `*TRANSFORM`, which
    /// makes both the boundary and the spring DOFs local.
    fn supports(&mut self) -> Result<(), DeckError> {
        let doc = self.doc;
        let mut rigid = Vec::new();
        let mut springs = Vec::new();
        for (k, support) in doc.supports().iter().enumerate() {
            let node = self.support_node(support)?;
            if !support.frame.is_world_aligned() {
                let (x, y) = (support.frame.x_axis, support.frame.y_axis);
                self.line(format_args!("*NSET, NSET=NSUP{k}"));
                self.line(format_args!("{node}"));
                self.line(format_args!("*TRANSFORM, NSET=NSUP{k}, TYPE=R"));
                self.line(format_args!(
                    "{:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}",
                    x.x, x.y, x.z, y.x, y.y, y.z
                ));
            }
            for dof in support.dofs.iter() {
                let ratio = support.stiffness_of(dof);
                if ratio >= 1.0 {
                    rigid.push((node, dof));
                } else if ratio > 0.0 {
                    springs.push((node, dof, ratio));
                }
            }
        }

        if !rigid.is_empty() {
            self.inp.push_str("*BOUNDARY\n");
            for (node, dof) in rigid {
                let d = ccx_dof(dof);
                self.line(format_args!("{node}, {d}, {d}, 0.0"));
            }
        }

        for (k, (node, dof, ratio)) in springs.into_iter().enumerate() {
            let elset = format!("ESPRING{k}");
            self.line(format_args!("*ELEMENT, TYPE=SPRING1, ELSET={elset}"));
            self.line(format_args!("{}, {node}", SPRING_OFFSET + k as u32 + 1));
            self.line(format_args!("*SPRING, ELSET={elset}"));
            self.line(format_args!("{}", ccx_dof(dof)));
            self.line(format_args!("{:.6e}", ratio * REFERENCE_STIFFNESS));
        }
        Ok(())
    }

    fn case_loads(&self, case: u32) -> Result<CaseLoads, DeckError> {
        let mut nodal: BTreeMap<u32, [f64; 6]> = BTreeMap::new();
        for load in self.doc.loads().iter().filter(|l| l.case == case) {
            let node = match load.target {
                Some(LoadTarget::Node(n)) => self.position(n).map(|_| n)?,
                Some(LoadTarget::Point(p)) => self.resolve(&p)?,
                None => return Err(DeckError::MissingLocation),
            };
            let sum = nodal.entry(node).or_insert([0.0; 6]);
            for (s, v) in sum.iter_mut().zip(load.as_array()) {
                *s += v;
            }
        }
        if nodal.is_empty() {
            return Err(DeckError::EmptyCase(case));
        }
        Ok(CaseLoads {
            case,
            nodal: nodal.into_iter().collect(),
        })
    }

    fn step(&mut self, loads: &CaseLoads) {
        self.inp.push_str("*STEP\n");
        self.inp.push_str("*STATIC\n");
        self.inp.push_str("*CLOAD, OP=NEW\n");
        for (node, values) in &loads.nodal {
            for (dof, value) in values.iter().enumerate() {
                if value.abs() > 1e-12 {
                    self.line(format_args!("{node}, {}, {value:.6e}", dof + 1));
                }
            }
        }
        self.inp.push_str("*NODE PRINT, NSET=NALL\n");
        self.inp.push_str("U, RF\n");
        self.inp.push_str("*END STEP\n");
    }
}

/// Local y directions offered to beams; index 1 is used for members along Z
const ORIENTATIONS: [[f64; 3]; 2] = [[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];

/// Pick a section orientation that is never parallel to the beam axis
fn orientation_index(axis: &Vector3<f64>) -> usize {
    let (ax, ay, az) = (axis.x.abs(), axis.y.abs(), axis.z.abs());
    if az >= ax && az >= ay {
        1
    } else {
        0
    }
}

/// CalculiX numbers DOFs 1-6
fn ccx_dof(dof: Dof) -> usize {
    dof.index() + 1
}

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("Model has no nodes")]
    Empty,
    #[error("No load case requested")]
    NoCases,
    #[error("Load case {0} has no loads")]
    EmptyCase(u32),
    #[error("Node {0} is referenced but not defined")]
    MissingNode(u32),
    #[error("Property {0} is referenced but not defined")]
    MissingProperty(u32),
    #[error("Plate {plate} has {corners} corners; only 3 or 4 are supported")]
    UnsupportedPlate { plate: u32, corners: usize },
    #[error("No node at ({x:.4}, {y:.4}, {z:.4})")]
    UnresolvedLocation { x: f64, y: f64, z: f64 },
    #[error("Support or load without a location")]
    MissingLocation,
}
