//! Builds a deduplicated node set with beam/plate connectivity from raw geometry.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::spatial::SpatialIndex;
use crate::elements::{is_finite_point, Beam, Node, Plate};
use crate::error::{GeometryItem, LinkError, LinkResult};

/// Default merge tolerance in model length units
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Settings for [`ConnectivityResolver`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityOptions {
    /// Points closer than this are the same node
    pub tolerance: f64,
    /// Id given to the first resolved node
    pub first_node_id: u32,
    /// Property assigned to every produced beam
    pub beam_property: Option<u32>,
    /// Property assigned to every produced plate
    pub plate_property: Option<u32>,
}

impl Default for ConnectivityOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            first_node_id: 1,
            beam_property: None,
            plate_property: None,
        }
    }
}

impl ConnectivityOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_first_node_id(mut self, id: u32) -> Self {
        self.first_node_id = id;
        self
    }

    pub fn with_beam_property(mut self, property: u32) -> Self {
        self.beam_property = Some(property);
        self
    }

    pub fn with_plate_property(mut self, property: u32) -> Self {
        self.plate_property = Some(property);
        self
    }
}

/// A raw line; either endpoint may be missing in host data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub start: Option<Point3<f64>>,
    pub end: Option<Point3<f64>>,
}

impl LineSegment {
    pub fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}

impl From<(Point3<f64>, Point3<f64>)> for LineSegment {
    fn from((start, end): (Point3<f64>, Point3<f64>)) -> Self {
        Self::new(start, end)
    }
}

/// A raw planar facet given by its boundary vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub vertices: Vec<Option<Point3<f64>>>,
}

impl Facet {
    pub fn new(vertices: impl IntoIterator<Item = Point3<f64>>) -> Self {
        Self {
            vertices: vertices.into_iter().map(Some).collect(),
        }
    }
}

/// Resolved mesh: nodes first, then elements referencing them by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connectivity {
    pub nodes: Vec<Node>,
    pub beams: Vec<Beam>,
    pub plates: Vec<Plate>,
}

/// Turns segments and facets into nodes, beams and plates.
///
/// Stateless: each call starts from an empty node set and returns either the
/// complete result or the first error, never a partial mesh.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityResolver {
    options: ConnectivityOptions,
}

impl ConnectivityResolver {
    pub fn new(options: ConnectivityOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConnectivityOptions {
        &self.options
    }

    /// Resolve line segments into nodes and beams.
    ///
    /// Beam ids run from 1 in segment order unless `beam_ids` supplies one id
    /// per segment.
    pub fn resolve_lines(
        &self,
        segments: &[LineSegment],
        beam_ids: Option<&[u32]>,
    ) -> LinkResult<Connectivity> {
        self.resolve(segments, &[], beam_ids, None)
    }

    /// Resolve segments and facets against one shared node set
    pub fn resolve(
        &self,
        segments: &[LineSegment],
        facets: &[Facet],
        beam_ids: Option<&[u32]>,
        plate_ids: Option<&[u32]>,
    ) -> LinkResult<Connectivity> {
        let beam_ids = element_ids("beam", segments.len(), beam_ids)?;
        let plate_ids = element_ids("plate", facets.len(), plate_ids)?;

        let mut index = SpatialIndex::new(self.options.tolerance)?;
        let mut endpoint_counts: Vec<u32> = Vec::new();
        let mut visit = |index: &mut SpatialIndex, point: Point3<f64>| {
            let i = index.insert_or_find(point);
            if i == endpoint_counts.len() {
                endpoint_counts.push(0);
            }
            endpoint_counts[i] += 1;
            i
        };

        let mut beam_ends = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let start = endpoint(segment.start, i, "start")?;
            let end = endpoint(segment.end, i, "end")?;
            let a = visit(&mut index, start);
            let b = visit(&mut index, end);
            if a == b {
                return Err(LinkError::geometry(
                    GeometryItem::Line,
                    i,
                    format!(
                        "segment is degenerate: length {:.3e} collapses to a single node",
                        nalgebra::distance(&start, &end)
                    ),
                ));
            }
            beam_ends.push([a, b]);
        }

        let mut plate_corners = Vec::with_capacity(facets.len());
        for (i, facet) in facets.iter().enumerate() {
            let mut points = Vec::with_capacity(facet.vertices.len());
            for (v, vertex) in facet.vertices.iter().enumerate() {
                let point = vertex
                    .filter(is_finite_point)
                    .ok_or_else(|| {
                        let reason = format!("vertex {v} is missing or not finite");
                        LinkError::geometry(GeometryItem::Facet, i, reason)
                    })?;
                points.push(point);
            }
            self.check_facet(i, &points)?;

            let mut corners: Vec<usize> = points.iter().map(|p| visit(&mut index, *p)).collect();
            // A closed outline repeats its first vertex
            if corners.len() > 3 && corners.first() == corners.last() {
                corners.pop();
            }
            let distinct: FxHashSet<usize> = corners.iter().copied().collect();
            if corners.len() < 3 || distinct.len() != corners.len() {
                return Err(LinkError::geometry(
                    GeometryItem::Facet,
                    i,
                    format!("facet needs at least 3 distinct nodes, got {}", distinct.len()),
                ));
            }
            plate_corners.push(corners);
        }

        let node_id = |i: usize| -> LinkResult<u32> {
            u32::try_from(i)
                .ok()
                .and_then(|i| self.options.first_node_id.checked_add(i))
                .ok_or_else(|| LinkError::InvalidInput("node id range overflows u32".to_string()))
        };
        if self.options.first_node_id == 0 {
            return Err(LinkError::InvalidInput(
                "first node id must be greater than zero".to_string(),
            ));
        }

        let nodes = index
            .points()
            .iter()
            .zip(&endpoint_counts)
            .enumerate()
            .map(|(i, (p, &count))| Ok(Node::merged(node_id(i)?, *p, count)))
            .collect::<LinkResult<Vec<_>>>()?;

        let beams = beam_ends
            .iter()
            .zip(beam_ids)
            .map(|([a, b], id)| {
                let mut beam = Beam::new(id, node_id(*a)?, node_id(*b)?);
                beam.property = self.options.beam_property;
                Ok(beam)
            })
            .collect::<LinkResult<Vec<_>>>()?;

        let plates = plate_corners
            .iter()
            .zip(plate_ids)
            .map(|(corners, id)| {
                let ids = corners.iter().map(|&c| node_id(c)).collect::<LinkResult<Vec<_>>>()?;
                let mut plate = Plate::new(id, ids);
                plate.property = self.options.plate_property;
                Ok(plate)
            })
            .collect::<LinkResult<Vec<_>>>()?;

        log::debug!(
            "Resolved {} segments and {} facets into {} nodes",
            segments.len(),
            facets.len(),
            nodes.len()
        );

        Ok(Connectivity { nodes, beams, plates })
    }

    /// Area and planarity checks on the raw outline
    fn check_facet(&self, index: usize, points: &[Point3<f64>]) -> LinkResult<()> {
        if points.len() < 3 {
            return Err(LinkError::geometry(
                GeometryItem::Facet,
                index,
                format!("facet has {} vertices, at least 3 required", points.len()),
            ));
        }

        // Newell's method: robust normal for any simple polygon
        let mut normal = Vector3::<f64>::zeros();
        for (i, p) in points.iter().enumerate() {
            let q = points[(i + 1) % points.len()];
            normal.x += (p.y - q.y) * (p.z + q.z);
            normal.y += (p.z - q.z) * (p.x + q.x);
            normal.z += (p.x - q.x) * (p.y + q.y);
        }
        let area = normal.norm() / 2.0;
        let tol = self.options.tolerance;
        if area <= tol * tol {
            return Err(LinkError::geometry(GeometryItem::Facet, index, "facet has zero area"));
        }

        let unit = normal / (2.0 * area);
        let sum = points.iter().fold(Vector3::<f64>::zeros(), |acc, p| acc + p.coords);
        let centroid = sum / points.len() as f64;
        let deviation = points
            .iter()
            .map(|p| (p.coords - centroid).dot(&unit).abs())
            .fold(0.0_f64, f64::max);
        if deviation > tol {
            return Err(LinkError::geometry(
                GeometryItem::Facet,
                index,
                format!("facet is not planar: vertex {deviation:.3e} off its plane"),
            ));
        }
        Ok(())
    }
}

fn endpoint(point: Option<Point3<f64>>, index: usize, which: &str) -> LinkResult<Point3<f64>> {
    match point {
        Some(p) if is_finite_point(&p) => Ok(p),
        Some(_) => {
            let reason = format!("{which} point is not finite");
            Err(LinkError::geometry(GeometryItem::Line, index, reason))
        }
        None => {
            let reason = format!("{which} point is missing");
            Err(LinkError::geometry(GeometryItem::Line, index, reason))
        }
    }
}

/// Sequential ids from 1, or the supplied ids after checking them
pub(crate) fn element_ids(
    kind: &str,
    count: usize,
    supplied: Option<&[u32]>,
) -> LinkResult<Vec<u32>> {
    let Some(ids) = supplied else {
        return (1..=count)
            .map(|i| {
                u32::try_from(i).map_err(|_| LinkError::InvalidInput(format!("too many {kind}s")))
            })
            .collect();
    };

    if ids.len() != count {
        return Err(LinkError::InvalidInput(format!(
            "{} {kind} ids supplied for {count} {kind}s",
            ids.len()
        )));
    }
    let mut seen = FxHashSet::default();
    for (at, &id) in ids.iter().enumerate() {
        if id == 0 {
            let reason = format!("{kind} id at {at} must be greater than zero");
            return Err(LinkError::InvalidInput(reason));
        }
        if !seen.insert(id) {
            return Err(LinkError::InvalidInput(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(ids.to_vec())
}
