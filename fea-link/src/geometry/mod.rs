//! Geometry processing: point deduplication and connectivity resolution

pub mod connectivity;
pub mod spatial;

pub use connectivity::{Connectivity, ConnectivityOptions, ConnectivityResolver, Facet, LineSegment};
pub use spatial::SpatialIndex;
