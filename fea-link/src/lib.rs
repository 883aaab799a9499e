//! fea-link - structural model assembly for an external FE engine
//!
//! This library turns loosely typed geometric inputs into finite-element
//! entities and drives the session with the analysis engine that stores them:
//! - Spatial merging of coincident points within a tolerance
//! - Node/beam/plate connectivity from line segments and facets
//! - Type-erased element containers and their classification
//! - Support, load and index-based element construction from data trees
//! - An engine session with exclusive ownership and all-or-nothing mutation
//!
//! ## Example
//! ```rust,no_run
//! use fea_link::prelude::*;
//! use nalgebra::Point3;
//!
//! // Merge shared endpoints into nodes
//! let resolver = ConnectivityResolver::new(ConnectivityOptions::default());
//! let segments = [
//!     LineSegment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
//!     LineSegment::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)),
//! ];
//! let conn = resolver.resolve_lines(&segments, None)?;
//!
//! let batch = ModelBatch::new()
//!     .with_nodes(conn.nodes)
//!     .with_beams(conn.beams)
//!     .with_supports([Support::fixed(SupportLocation::Node(1))]);
//!
//! // Push everything to the engine in one session
//! let mut session = EngineSession::new(FileEngine::new());
//! let model = Model::new(ModelId::new(1)?, "frame.json");
//! let report = run_pipeline(&mut session, model, OpenMode::Create, &batch, &[])?;
//! println!("{}", report.committed);
//! # Ok::<(), fea_link::error::LinkError>(())
//! ```

pub mod batch;
pub mod classifier;
pub mod construct;
pub mod container;
pub mod elements;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod model;
pub mod results;
pub mod session;
pub mod tree;
pub mod units;

// Re-export common types
pub mod prelude {
    pub use crate::batch::{ElementCounts, ModelBatch};
    pub use crate::classifier::{classify, classify_with, Classification, ClassifyPolicy};
    pub use crate::construct::{
        BeamsFromIndices, BeamsFromLines, DofSelector, LoadsRequest, LocationInput,
        PlatesFromIndices, SupportsRequest,
    };
    pub use crate::container::ElementContainer;
    pub use crate::elements::{
        Beam, Dof, DofMask, Element, ElementKind, ElementType, Joint, Load, LoadTarget, LocalFrame,
        Material, Node, Plate, Support, SupportLocation,
    };
    pub use crate::engine::{Engine, FileEngine};
    pub use crate::error::{GeometryItem, LinkError, LinkResult};
    pub use crate::geometry::{
        ConnectivityOptions, ConnectivityResolver, Facet, LineSegment, SpatialIndex,
    };
    pub use crate::model::{Model, ModelId, OpenMode};
    pub use crate::results::AnalysisSummary;
    pub use crate::session::{run_pipeline, EngineSession, PipelineReport, SessionState};
    pub use crate::tree::{DataTree, TreePath};
    pub use crate::units::UnitSystem;
}
