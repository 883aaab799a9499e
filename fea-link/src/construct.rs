//! Construction requests: tree-shaped host inputs turned into element containers
//!
//! Each request validates its inputs as a whole and either returns every
//! container it describes or an error; nothing is produced partially.

use std::fmt;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::container::ElementContainer;
use crate::elements::{
    is_finite_point, Beam, Colour, Dof, DofMask, Load, LoadTarget, LocalFrame, Plate, Support,
    SupportLocation,
};
use crate::error::{GeometryItem, LinkError, LinkResult};
use crate::geometry::connectivity::element_ids;
use crate::geometry::{ConnectivityOptions, ConnectivityResolver, LineSegment};
use crate::tree::{DataTree, TreePath};

/// Beams and their merged nodes from line geometry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeamsFromLines {
    /// `None` stands for a null line in host data
    pub lines: DataTree<Option<LineSegment>>,
    /// Entity numbers, one per line, in path-major order
    #[serde(default)]
    pub ids: Option<DataTree<u32>>,
    #[serde(default)]
    pub property: Option<u32>,
    #[serde(default)]
    pub colour: Option<Colour>,
    #[serde(default)]
    pub options: ConnectivityOptions,
}

impl BeamsFromLines {
    pub fn new(lines: DataTree<Option<LineSegment>>) -> Self {
        Self {
            lines,
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, ids: DataTree<u32>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_property(mut self, property: u32) -> Self {
        self.property = Some(property);
        self
    }

    pub fn with_colour(mut self, colour: Colour) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.options.tolerance = tolerance;
        self
    }

    /// Beams first, then the nodes they reference
    pub fn build(&self) -> LinkResult<Vec<ElementContainer>> {
        let segments = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, (path, _, line))| {
                line.ok_or_else(|| {
                    let reason = format!("input line in branch {path} is null");
                    LinkError::geometry(GeometryItem::Line, i, reason)
                })
            })
            .collect::<LinkResult<Vec<_>>>()?;
        let ids: Option<Vec<u32>> =
            self.ids.as_ref().map(|t| t.flatten().into_iter().copied().collect());

        let mut options = self.options.clone();
        if self.property.is_some() {
            options.beam_property = self.property;
        }
        let mesh = ConnectivityResolver::new(options).resolve_lines(&segments, ids.as_deref())?;

        let colour = self.colour;
        let beams = mesh.beams.into_iter().map(|mut beam| {
            beam.colour = colour;
            ElementContainer::wrap(beam)
        });
        let nodes = mesh.nodes.into_iter().map(ElementContainer::wrap);
        Ok(beams.chain(nodes).collect())
    }
}

/// Beams between existing node ids given as parallel start/end trees
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeamsFromIndices {
    pub starts: DataTree<u32>,
    pub ends: DataTree<u32>,
    #[serde(default)]
    pub ids: Option<DataTree<u32>>,
    #[serde(default)]
    pub property: Option<u32>,
    #[serde(default)]
    pub colour: Option<Colour>,
}

impl BeamsFromIndices {
    pub fn new(starts: DataTree<u32>, ends: DataTree<u32>) -> Self {
        Self {
            starts,
            ends,
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, ids: DataTree<u32>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_property(mut self, property: u32) -> Self {
        self.property = Some(property);
        self
    }

    pub fn build(&self) -> LinkResult<Vec<ElementContainer>> {
        if !self.starts.same_shape(&self.ends) {
            return Err(LinkError::InvalidInput(format!(
                "start and end trees differ in shape ({} vs {} items)",
                self.starts.data_count(),
                self.ends.data_count()
            )));
        }
        let count = self.starts.data_count();
        let ids = entity_ids("beam", count, self.ids.as_ref())?;

        self.starts
            .flatten()
            .into_iter()
            .zip(self.ends.flatten())
            .zip(ids)
            .enumerate()
            .map(|(i, ((&start, &end), id))| {
                let beam = Beam {
                    property: self.property,
                    colour: self.colour,
                    ..Beam::new(id, start, end)
                };
                if !beam.is_valid() {
                    return Err(LinkError::InvalidInput(format!(
                        "beam {i} ({start} -> {end}) needs two distinct positive node ids"
                    )));
                }
                Ok(ElementContainer::wrap(beam))
            })
            .collect()
    }
}

/// Plates from corner node ids, one branch per plate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatesFromIndices {
    pub corners: DataTree<u32>,
    #[serde(default)]
    pub ids: Option<Vec<u32>>,
    #[serde(default)]
    pub property: Option<u32>,
}

impl PlatesFromIndices {
    pub fn new(corners: DataTree<u32>) -> Self {
        Self {
            corners,
            ..Self::default()
        }
    }

    pub fn with_property(mut self, property: u32) -> Self {
        self.property = Some(property);
        self
    }

    pub fn build(&self) -> LinkResult<Vec<ElementContainer>> {
        let count = self.corners.branch_count();
        let ids = element_ids("plate", count, self.ids.as_deref())?;

        self.corners
            .branches()
            .zip(ids)
            .map(|((path, corners), id)| {
                let mut plate = Plate::new(id, corners.to_vec());
                plate.property = self.property;
                if !plate.is_valid() {
                    return Err(LinkError::InvalidInput(format!(
                        "plate in branch {path} needs at least 3 distinct positive node ids"
                    )));
                }
                Ok(ElementContainer::wrap(plate))
            })
            .collect()
    }
}

/// One item of a support or load location tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationInput {
    NodeId(i64),
    Point(Point3<f64>),
    /// Anything else the host passed in, by type name
    Other(String),
}

impl LocationInput {
    fn kind(&self) -> &'static str {
        match self {
            Self::NodeId(_) => "node id",
            Self::Point(_) => "point",
            Self::Other(_) => "other",
        }
    }
}

/// Parse a location tree: all node ids or all points, nothing else
fn parse_locations(locations: &DataTree<LocationInput>) -> LinkResult<Vec<SupportLocation>> {
    let mut first_kind: Option<&'static str> = None;
    locations
        .iter()
        .enumerate()
        .map(|(i, (path, _, input))| {
            let kind = input.kind();
            if *first_kind.get_or_insert(kind) != kind {
                return Err(LinkError::InvalidInput(format!(
                    "location {i} in branch {path} is a {kind}, expected only {}s",
                    first_kind.unwrap_or(kind)
                )));
            }
            match input {
                LocationInput::NodeId(id) => u32::try_from(*id)
                    .ok()
                    .filter(|&id| id > 0)
                    .map(SupportLocation::Node)
                    .ok_or_else(|| {
                        LinkError::InvalidInput(format!("location {i}: node id {id} out of range"))
                    }),
                LocationInput::Point(p) if is_finite_point(p) => Ok(SupportLocation::Point(*p)),
                LocationInput::Point(_) => Err(LinkError::geometry(
                    GeometryItem::Location,
                    i,
                    "location point is not finite",
                )),
                LocationInput::Other(name) => Err(LinkError::UnsupportedType(format!(
                    "location {i} in branch {path}: {name} (expected node id or point)"
                ))),
            }
        })
        .collect()
}

/// One item of a degree-of-freedom branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DofInput {
    /// A restrained DOF by index 0-5
    Index(usize),
    /// A toggle; a branch of six toggles maps position to DOF
    Flag(bool),
}

fn parse_dof_branch(path: &TreePath, items: &[DofInput]) -> LinkResult<DofMask> {
    let flags: Option<Vec<bool>> = items
        .iter()
        .map(|d| match d {
            DofInput::Flag(b) => Some(*b),
            DofInput::Index(_) => None,
        })
        .collect();
    if let Some(flags) = flags.filter(|f| !f.is_empty()) {
        if flags.len() != 6 {
            return Err(LinkError::InvalidInput(format!(
                "DOF branch {path} has {} toggles, expected 6",
                flags.len()
            )));
        }
        return Ok(Dof::ALL
            .into_iter()
            .zip(flags)
            .filter(|&(_, on)| on)
            .fold(DofMask::free(), |mask, (dof, _)| mask.with(dof)));
    }

    let indices = items
        .iter()
        .map(|d| match d {
            DofInput::Index(i) => Ok(*i),
            DofInput::Flag(_) => Err(LinkError::InvalidInput(format!(
                "DOF branch {path} mixes indices and toggles"
            ))),
        })
        .collect::<LinkResult<Vec<_>>>()?;
    DofMask::from_indices(indices)
        .ok_or_else(|| LinkError::InvalidInput(format!("DOF branch {path} has an index above 5")))
}

/// Supports from a location tree plus optional frames, DOFs and stiffness ratios
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupportsRequest {
    pub locations: DataTree<LocationInput>,
    /// One frame per location; world XY when absent
    #[serde(default)]
    pub frames: Option<DataTree<LocalFrame>>,
    /// One branch per support; the selector's mask when absent
    #[serde(default)]
    pub dofs: Option<DataTree<DofInput>>,
    /// Translational stiffness ratio, 1.0 when absent
    #[serde(default)]
    pub translational_stiffness: Option<f64>,
    /// Rotational stiffness ratio, 1.0 when absent
    #[serde(default)]
    pub rotational_stiffness: Option<f64>,
}

/// Built supports together with the grafted DOF tree that was applied
#[derive(Debug, Clone)]
pub struct SupportsOutput {
    pub supports: Vec<ElementContainer>,
    pub dofs: DataTree<usize>,
}

impl SupportsRequest {
    pub fn new(locations: DataTree<LocationInput>) -> Self {
        Self {
            locations,
            ..Self::default()
        }
    }

    pub fn with_frames(mut self, frames: DataTree<LocalFrame>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn with_dofs(mut self, dofs: DataTree<DofInput>) -> Self {
        self.dofs = Some(dofs);
        self
    }

    pub fn with_stiffness(mut self, translational: f64, rotational: f64) -> Self {
        self.translational_stiffness = Some(translational);
        self.rotational_stiffness = Some(rotational);
        self
    }

    /// Build with `selector` supplying the DOFs when no DOF tree is given
    pub fn build(&self, selector: &DofSelector) -> LinkResult<SupportsOutput> {
        let locations = parse_locations(&self.locations)?;
        let count = locations.len();

        let frames: Vec<LocalFrame> = match &self.frames {
            Some(frames) if frames.data_count() > 0 => {
                if frames.data_count() != count {
                    return Err(LinkError::InvalidInput(format!(
                        "data count mismatch: {count} positions but {} local planes",
                        frames.data_count()
                    )));
                }
                frames.flatten().into_iter().copied().collect()
            }
            _ => vec![LocalFrame::world(); count],
        };

        // Grafted paths: one branch per support under its location branch
        let grafted: Vec<TreePath> =
            self.locations.iter().map(|(path, j, _)| path.child(j)).collect();
        let masks: Vec<DofMask> = match &self.dofs {
            Some(dofs) if dofs.data_count() > 0 => {
                if dofs.branch_count() != count {
                    return Err(LinkError::InvalidInput(format!(
                        "{} DOF branches supplied for {count} supports",
                        dofs.branch_count()
                    )));
                }
                dofs.branches()
                    .map(|(path, items)| parse_dof_branch(path, items))
                    .collect::<LinkResult<_>>()?
            }
            _ => vec![selector.selection(); count],
        };

        let ct = ratio("translational", self.translational_stiffness)?;
        let cr = ratio("rotational", self.rotational_stiffness)?;

        let mut dof_tree = DataTree::new();
        let mut supports = Vec::with_capacity(count);
        let rows = locations.into_iter().zip(frames).zip(masks).zip(grafted);
        for (((location, frame), mask), path) in rows {
            if !frame.is_valid() {
                return Err(LinkError::geometry(
                    GeometryItem::Frame,
                    supports.len(),
                    "local plane axes are degenerate",
                ));
            }
            dof_tree.extend_branch(path, mask.indices());
            let support = Support::new(location, mask)
                .with_frame(frame)
                .with_translational_stiffness(ct)
                .with_rotational_stiffness(cr);
            supports.push(ElementContainer::wrap(support));
        }

        Ok(SupportsOutput {
            supports,
            dofs: dof_tree,
        })
    }
}

fn ratio(which: &str, value: Option<f64>) -> LinkResult<f64> {
    match value {
        None => Ok(1.0),
        Some(v) if (0.0..=1.0).contains(&v) => Ok(v),
        Some(v) => Err(LinkError::InvalidInput(format!(
            "{which} stiffness must be within [0, 1], got {v}"
        ))),
    }
}

/// Nodal loads from parallel target/force trees
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadsRequest {
    pub targets: DataTree<LocationInput>,
    pub forces: DataTree<Vector3<f64>>,
    #[serde(default)]
    pub moments: Option<DataTree<Vector3<f64>>>,
    /// One case per load, or a single case for all; case 1 when absent
    #[serde(default)]
    pub cases: Option<DataTree<u32>>,
}

impl LoadsRequest {
    pub fn new(targets: DataTree<LocationInput>, forces: DataTree<Vector3<f64>>) -> Self {
        Self {
            targets,
            forces,
            ..Self::default()
        }
    }

    pub fn with_moments(mut self, moments: DataTree<Vector3<f64>>) -> Self {
        self.moments = Some(moments);
        self
    }

    pub fn with_cases(mut self, cases: DataTree<u32>) -> Self {
        self.cases = Some(cases);
        self
    }

    pub fn build(&self) -> LinkResult<Vec<ElementContainer>> {
        let targets = parse_locations(&self.targets)?;
        let count = targets.len();
        let forces = matched("force", count, &self.forces)?;
        let moments = match &self.moments {
            Some(tree) => matched("moment", count, tree)?,
            None => vec![Vector3::zeros(); count],
        };
        let cases: Vec<u32> = match &self.cases {
            None => vec![1; count],
            Some(tree) if tree.data_count() == 1 => vec![*tree.flatten()[0]; count],
            Some(tree) => matched("load case", count, tree)?,
        };

        targets
            .into_iter()
            .zip(forces)
            .zip(moments)
            .zip(cases)
            .enumerate()
            .map(|(i, (((target, force), moment), case))| {
                let target = match target {
                    SupportLocation::Node(id) => LoadTarget::Node(id),
                    SupportLocation::Point(p) => LoadTarget::Point(p),
                };
                let load = Load::force(target, force, case).with_moment(moment);
                if !load.is_valid() {
                    return Err(LinkError::InvalidInput(format!(
                        "load {i} needs finite vectors and a case of at least 1"
                    )));
                }
                Ok(ElementContainer::wrap(load))
            })
            .collect()
    }
}

fn matched<T: Copy>(what: &str, count: usize, tree: &DataTree<T>) -> LinkResult<Vec<T>> {
    if tree.data_count() != count {
        return Err(LinkError::InvalidInput(format!(
            "data count mismatch: {count} targets but {} {what} values",
            tree.data_count()
        )));
    }
    Ok(tree.flatten().into_iter().copied().collect())
}

fn entity_ids(kind: &str, count: usize, ids: Option<&DataTree<u32>>) -> LinkResult<Vec<u32>> {
    let flat: Option<Vec<u32>> = ids.map(|tree| tree.flatten().into_iter().copied().collect());
    element_ids(kind, count, flat.as_deref())
}

type Listener = Box<dyn FnMut(DofMask) + Send>;

/// Six DOF toggles with a bounded active count.
///
/// Hosts register listeners to recompute whatever depends on the selection;
/// every effective change notifies them with the new mask.
pub struct DofSelector {
    toggles: [bool; 6],
    min_active: usize,
    max_active: usize,
    listeners: Vec<Listener>,
}

impl Default for DofSelector {
    fn default() -> Self {
        Self::new(DofMask::free())
    }
}

impl DofSelector {
    pub fn new(initial: DofMask) -> Self {
        let mut toggles = [false; 6];
        for dof in initial.iter() {
            toggles[dof.index()] = true;
        }
        Self {
            toggles,
            min_active: 0,
            max_active: 6,
            listeners: Vec::new(),
        }
    }

    /// Bound the number of active toggles; the current selection must fit
    pub fn with_limits(mut self, min_active: usize, max_active: usize) -> LinkResult<Self> {
        let active = self.active_count();
        if min_active > max_active || max_active > 6 || active < min_active || active > max_active {
            return Err(LinkError::InvalidInput(format!(
                "invalid DOF limits {min_active}..={max_active} for {active} active toggles"
            )));
        }
        self.min_active = min_active;
        self.max_active = max_active;
        Ok(self)
    }

    pub fn on_change(&mut self, listener: impl FnMut(DofMask) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn selection(&self) -> DofMask {
        Dof::ALL
            .into_iter()
            .filter(|d| self.toggles[d.index()])
            .fold(DofMask::free(), DofMask::with)
    }

    pub fn is_active(&self, dof: Dof) -> bool {
        self.toggles[dof.index()]
    }

    fn active_count(&self) -> usize {
        self.toggles.iter().filter(|&&t| t).count()
    }

    /// Set one toggle; returns whether the selection changed
    pub fn set(&mut self, dof: Dof, active: bool) -> LinkResult<bool> {
        if self.toggles[dof.index()] == active {
            return Ok(false);
        }
        let after = if active { self.active_count() + 1 } else { self.active_count() - 1 };
        if after < self.min_active || after > self.max_active {
            return Err(LinkError::InvalidInput(format!(
                "selecting {} would leave {after} active DOFs (allowed {}..={})",
                dof.label(),
                self.min_active,
                self.max_active
            )));
        }
        self.toggles[dof.index()] = active;
        self.notify();
        Ok(true)
    }

    pub fn toggle(&mut self, dof: Dof) -> LinkResult<bool> {
        self.set(dof, !self.is_active(dof))
    }

    /// Replace the whole selection at once
    pub fn select(&mut self, mask: DofMask) -> LinkResult<bool> {
        let count = mask.count() as usize;
        if count < self.min_active || count > self.max_active {
            return Err(LinkError::InvalidInput(format!(
                "{count} active DOFs outside {}..={}",
                self.min_active, self.max_active
            )));
        }
        if mask == self.selection() {
            return Ok(false);
        }
        for dof in Dof::ALL {
            self.toggles[dof.index()] = mask.contains(dof);
        }
        self.notify();
        Ok(true)
    }

    fn notify(&mut self) {
        let mask = self.selection();
        log::debug!("DOF selection changed to {mask}");
        for listener in &mut self.listeners {
            listener(mask);
        }
    }
}

impl fmt::Debug for DofSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DofSelector")
            .field("selection", &self.selection())
            .field("min_active", &self.min_active)
            .field("max_active", &self.max_active)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElementType, Node};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_beams_from_lines_outputs_beams_then_nodes() {
        let mut lines = DataTree::new();
        lines.push([0], Some(LineSegment::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0))));
        lines.push([1], Some(LineSegment::new(p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0))));
        let out = BeamsFromLines::new(lines)
            .with_property(3)
            .with_colour(Colour::rgb(255, 0, 0))
            .build()
            .unwrap();
        let kinds: Vec<_> = out.iter().filter_map(|c| c.element_type()).collect();
        assert_eq!(
            kinds,
            vec![
                ElementType::Beam,
                ElementType::Beam,
                ElementType::Node,
                ElementType::Node,
                ElementType::Node
            ]
        );
        let beam: Beam = out[1].cast().unwrap();
        assert_eq!(beam.id, 2);
        assert_eq!(beam.property, Some(3));
        assert_eq!(beam.nodes, [2, 3]);
        assert_eq!(out[2].cast::<Node>().unwrap().id, 1);
    }

    #[test]
    fn test_null_line_fails_request() {
        let mut lines = DataTree::new();
        lines.push([0], Some(LineSegment::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0))));
        lines.push([0], None);
        let err = BeamsFromLines::new(lines).build().unwrap_err();
        assert_eq!(err.offending_index(), Some(1));
    }

    #[test]
    fn test_beams_from_indices() {
        let starts = DataTree::from_list([1, 2]);
        let ends = DataTree::from_list([2, 3]);
        let out = BeamsFromIndices::new(starts.clone(), ends).build().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].cast::<Beam>().unwrap().nodes, [2, 3]);

        let short = DataTree::from_list([2]);
        assert!(BeamsFromIndices::new(starts, short).build().is_err());
    }

    #[test]
    fn test_plates_from_indices() {
        let mut corners = DataTree::new();
        corners.extend_branch([0], [1, 2, 3, 4]);
        corners.extend_branch([1], [4, 3, 5]);
        let out = PlatesFromIndices::new(corners).with_property(2).build().unwrap();
        let second: Plate = out[1].cast().unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(second.nodes, vec![4, 3, 5]);

        let mut bad = DataTree::new();
        bad.extend_branch([0], [1, 2]);
        assert!(PlatesFromIndices::new(bad).build().is_err());
    }

    #[test]
    fn test_supplied_ids_are_checked() {
        let mut corners = DataTree::new();
        corners.extend_branch([0], [1, 2, 3]);
        corners.extend_branch([1], [3, 2, 4]);
        let plates = |ids: Vec<u32>| PlatesFromIndices {
            ids: Some(ids),
            ..PlatesFromIndices::new(corners.clone())
        };
        let out = plates(vec![9, 4]).build().unwrap();
        assert_eq!(out[1].cast::<Plate>().unwrap().id, 4);

        let zero = plates(vec![7, 0]).build().unwrap_err();
        assert!(zero.to_string().contains("plate id at 1"));
        let repeated = plates(vec![5, 5]).build().unwrap_err();
        assert!(repeated.to_string().contains("duplicate plate id 5"));
        assert!(plates(vec![1]).build().is_err());

        let starts = DataTree::from_list([1, 2]);
        let ends = DataTree::from_list([2, 3]);
        let beams = BeamsFromIndices::new(starts, ends).with_ids(DataTree::from_list([0, 3]));
        assert!(beams.build().unwrap_err().to_string().contains("beam id at 0"));
    }

    #[test]
    fn test_supports_use_selector_and_graft_dofs() {
        let mut locations = DataTree::new();
        locations.push([0], LocationInput::NodeId(1));
        locations.push([0], LocationInput::NodeId(4));
        let selector = DofSelector::new(DofMask::pinned());

        let out = SupportsRequest::new(locations).build(&selector).unwrap();
        assert_eq!(out.supports.len(), 2);
        let support: Support = out.supports[1].cast().unwrap();
        assert_eq!(support.location, Some(SupportLocation::Node(4)));
        assert_eq!(support.dofs, DofMask::pinned());
        assert_eq!(support.frame, LocalFrame::world());
        assert_eq!(out.dofs.branch(&TreePath::from([0, 1])), Some(&[0, 1, 2][..]));
    }

    #[test]
    fn test_supports_with_explicit_dofs_and_stiffness() {
        let locations = DataTree::from_list([LocationInput::Point(p(0.0, 0.0, 0.0))]);
        let mut dofs = DataTree::new();
        dofs.extend_branch([0, 0], [true, true, true, false, false, true].map(DofInput::Flag));

        let out = SupportsRequest::new(locations)
            .with_dofs(dofs)
            .with_stiffness(0.5, 1.0)
            .build(&DofSelector::default())
            .unwrap();
        let support: Support = out.supports[0].cast().unwrap();
        assert!(support.dofs.contains(Dof::RZ));
        assert!(!support.dofs.contains(Dof::RX));
        assert_eq!(support.stiffness_of(Dof::TX), 0.5);
        assert_eq!(support.stiffness_of(Dof::RX), 1.0);
    }

    #[test]
    fn test_supports_reject_bad_locations() {
        let selector = DofSelector::default();

        let mixed =
            DataTree::from_list([LocationInput::NodeId(1), LocationInput::Point(p(1.0, 0.0, 0.0))]);
        assert!(SupportsRequest::new(mixed).build(&selector).is_err());

        let illegal = DataTree::from_list([LocationInput::Other("Curve".to_string())]);
        let err = SupportsRequest::new(illegal).build(&selector).unwrap_err();
        assert!(matches!(err, LinkError::UnsupportedType(_)));

        let unbounded = DataTree::from_list([
            LocationInput::Point(p(0.0, 0.0, 0.0)),
            LocationInput::Point(p(f64::INFINITY, 0.0, 0.0)),
        ]);
        let err = SupportsRequest::new(unbounded).build(&selector).unwrap_err();
        assert_eq!(err.geometry_item(), Some(GeometryItem::Location));
        assert_eq!(err.offending_index(), Some(1));

        let flat = LocalFrame::new(Point3::origin(), Vector3::<f64>::zeros(), Vector3::y());
        let err = SupportsRequest::new(DataTree::from_list([LocationInput::NodeId(1)]))
            .with_frames(DataTree::from_list([flat]))
            .build(&selector)
            .unwrap_err();
        assert_eq!(err.geometry_item(), Some(GeometryItem::Frame));

        let locations = DataTree::from_list([LocationInput::NodeId(1), LocationInput::NodeId(2)]);
        let frames = DataTree::from_list([LocalFrame::world()]);
        assert!(SupportsRequest::new(locations.clone())
            .with_frames(frames)
            .build(&selector)
            .is_err());
        assert!(SupportsRequest::new(locations)
            .with_stiffness(1.2, 1.0)
            .build(&selector)
            .is_err());
    }

    #[test]
    fn test_loads_request() {
        let targets = DataTree::from_list([LocationInput::NodeId(2), LocationInput::NodeId(3)]);
        let forces =
            DataTree::from_list([Vector3::new(0.0, 0.0, -1.0), Vector3::new(1.0, 0.0, 0.0)]);
        let out = LoadsRequest::new(targets.clone(), forces.clone())
            .with_cases(DataTree::from_list([2]))
            .build()
            .unwrap();
        let load: Load = out[1].cast().unwrap();
        assert_eq!(load.case, 2);
        assert_eq!(load.target, Some(LoadTarget::Node(3)));

        let one_force = DataTree::from_list([Vector3::zeros()]);
        assert!(LoadsRequest::new(targets, one_force).build().is_err());
    }

    #[test]
    fn test_selector_limits_and_notification() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut selector = DofSelector::new(DofMask::pinned()).with_limits(1, 6).unwrap();
        selector.on_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(selector.set(Dof::RX, true).unwrap());
        assert!(!selector.set(Dof::RX, true).unwrap());
        assert!(selector.select(DofMask::from_indices([2]).unwrap()).unwrap());
        assert!(selector.set(Dof::TZ, false).is_err());
        assert_eq!(selector.selection().indices(), vec![2]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
