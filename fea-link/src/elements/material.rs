//! Material/property records referenced by beams and plates

use serde::{Deserialize, Serialize};

/// Property number used by beams and plates that do not name one
pub const IMPLICIT_PROPERTY: u32 = 1;

/// Beam cross-section used with a property record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BeamSection {
    Rectangular { width: f64, height: f64 },
    Circular { radius: f64 },
}

impl BeamSection {
    pub fn area(&self) -> f64 {
        match *self {
            BeamSection::Rectangular { width, height } => width * height,
            BeamSection::Circular { radius } => std::f64::consts::PI * radius * radius,
        }
    }
}

impl Default for BeamSection {
    fn default() -> Self {
        BeamSection::Rectangular {
            width: 0.1,
            height: 0.1,
        }
    }
}

/// Material properties together with the section data the engine needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Property number (> 0)
    pub id: u32,
    pub name: String,
    /// Modulus of elasticity (Young's modulus)
    pub elastic_modulus: f64,
    pub poisson_ratio: f64,
    pub density: f64,
    /// Section used by beams with this property
    #[serde(default)]
    pub section: BeamSection,
    /// Thickness used by plates with this property
    #[serde(default = "default_thickness")]
    pub thickness: f64,
}

fn default_thickness() -> f64 {
    0.01
}

impl Material {
    pub fn new(
        id: u32,
        name: &str,
        elastic_modulus: f64,
        poisson_ratio: f64,
        density: f64,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            elastic_modulus,
            poisson_ratio,
            density,
            section: BeamSection::default(),
            thickness: default_thickness(),
        }
    }

    /// Create a standard steel material (SI units)
    pub fn steel(id: u32) -> Self {
        Self::new(id, "Steel", 200e9, 0.3, 7850.0)
    }

    /// Create an aluminium material (6061-T6)
    pub fn aluminium(id: u32) -> Self {
        Self::new(id, "Aluminium", 68.9e9, 0.33, 2700.0)
    }

    /// The record the engine falls back to for [`IMPLICIT_PROPERTY`]
    pub fn implicit() -> Self {
        Self::steel(IMPLICIT_PROPERTY)
    }

    pub fn with_section(mut self, section: BeamSection) -> Self {
        self.section = section;
        self
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    /// Shear modulus G = E / (2 (1 + nu))
    pub fn shear_modulus(&self) -> f64 {
        self.elastic_modulus / (2.0 * (1.0 + self.poisson_ratio))
    }

    pub fn is_valid(&self) -> bool {
        let section_ok = match self.section {
            BeamSection::Rectangular { width, height } => width > 0.0 && height > 0.0,
            BeamSection::Circular { radius } => radius > 0.0,
        };
        self.id > 0
            && self.elastic_modulus > 0.0
            && self.poisson_ratio > -1.0
            && self.poisson_ratio < 0.5
            && self.density >= 0.0
            && self.thickness > 0.0
            && section_ok
    }
}
