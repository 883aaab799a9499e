//! Degree-of-freedom masks shared by supports and joints

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the six nodal degrees of freedom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dof {
    TX,
    TY,
    TZ,
    RX,
    RY,
    RZ,
}

impl Dof {
    pub const ALL: [Dof; 6] = [Dof::TX, Dof::TY, Dof::TZ, Dof::RX, Dof::RY, Dof::RZ];

    /// Index 0-5 in [TX, TY, TZ, RX, RY, RZ] order
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Dof> {
        Self::ALL.get(index).copied()
    }

    pub const fn is_translation(self) -> bool {
        (self as usize) < 3
    }

    pub fn label(self) -> &'static str {
        match self {
            Dof::TX => "tX",
            Dof::TY => "tY",
            Dof::TZ => "tZ",
            Dof::RX => "rX",
            Dof::RY => "rY",
            Dof::RZ => "rZ",
        }
    }
}

/// Six-bit mask of degrees of freedom (bit 0 = TX ... bit 5 = RZ)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DofMask(u8);

impl DofMask {
    const ALL_BITS: u8 = 0b11_1111;

    /// No degree of freedom selected
    pub const fn free() -> Self {
        Self(0)
    }

    /// All six degrees of freedom selected
    pub const fn fixed() -> Self {
        Self(Self::ALL_BITS)
    }

    /// Translations only
    pub const fn pinned() -> Self {
        Self(0b00_0111)
    }

    /// Rotations only
    pub const fn rotations() -> Self {
        Self(0b11_1000)
    }

    /// Build from raw bits; bits above the sixth are rejected
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits & !Self::ALL_BITS == 0).then_some(Self(bits))
    }

    /// Build from DOF indices 0-5; any out-of-range index yields `None`
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Option<Self> {
        let mut mask = Self::free();
        for index in indices {
            mask = mask.with(Dof::from_index(index)?);
        }
        Some(mask)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn with(self, dof: Dof) -> Self {
        Self(self.0 | (1 << dof as u8))
    }

    pub const fn without(self, dof: Dof) -> Self {
        Self(self.0 & !(1 << dof as u8))
    }

    pub const fn contains(self, dof: Dof) -> bool {
        self.0 & (1 << dof as u8) != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Dof> {
        Dof::ALL.into_iter().filter(move |&d| self.contains(d))
    }

    /// Selected DOF indices (0-5)
    pub fn indices(self) -> Vec<usize> {
        self.iter().map(Dof::index).collect()
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DofMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Strand-style code, e.g. FFFRRR for a pin
        for dof in Dof::ALL {
            f.write_str(if self.contains(dof) { "F" } else { "R" })?;
        }
        Ok(())
    }
}
