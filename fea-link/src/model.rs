//! Model handle: numeric id, backing file and declared unit system

use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, LinkResult};
use crate::units::UnitSystem;

/// Engine-side model number, always > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ModelId(NonZeroU32);

impl ModelId {
    pub fn new(id: u32) -> LinkResult<Self> {
        NonZeroU32::new(id)
            .map(Self)
            .ok_or_else(|| {
                LinkError::InvalidInput("model id must be greater than zero".to_string())
            })
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for ModelId {
    type Error = LinkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModelId> for u32 {
    fn from(id: ModelId) -> Self {
        id.get()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How [`crate::session::EngineSession::open`] obtains the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    /// Open a file that must already exist
    Existing,
    /// Create a new file, replacing any file at the path
    Create,
}

/// A structural model as known to the engine.
///
/// Carries no element collections itself; those live in the engine while a
/// session holds the model open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub path: PathBuf,
    #[serde(default)]
    pub units: UnitSystem,
}

impl Model {
    pub fn new(id: ModelId, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
            units: UnitSystem::default(),
        }
    }

    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model {} ({})", self.id, self.path.display())
    }
}
