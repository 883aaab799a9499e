//! Unit system declared by a model file

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LengthUnit {
    #[default]
    Meter,
    Centimeter,
    Millimeter,
    Foot,
    Inch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForceUnit {
    #[default]
    Newton,
    KiloNewton,
    MegaNewton,
    KiloForce,
    PoundForce,
    KipForce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StressUnit {
    #[default]
    Pascal,
    KiloPascal,
    MegaPascal,
    KsfStress,
    PsiStress,
    KsiStress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MassUnit {
    #[default]
    Kilogram,
    Tonne,
    Gram,
    Pound,
    Slug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Kelvin,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnergyUnit {
    #[default]
    Joule,
    BritishThermalUnit,
    FootPound,
    Calorie,
}

impl LengthUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Meter => "m",
            Self::Centimeter => "cm",
            Self::Millimeter => "mm",
            Self::Foot => "ft",
            Self::Inch => "in",
        }
    }
}

impl ForceUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Newton => "N",
            Self::KiloNewton => "kN",
            Self::MegaNewton => "MN",
            Self::KiloForce => "kgf",
            Self::PoundForce => "lbf",
            Self::KipForce => "kip",
        }
    }
}

impl StressUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Pascal => "Pa",
            Self::KiloPascal => "kPa",
            Self::MegaPascal => "MPa",
            Self::KsfStress => "ksf",
            Self::PsiStress => "psi",
            Self::KsiStress => "ksi",
        }
    }
}

impl MassUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Kilogram => "kg",
            Self::Tonne => "t",
            Self::Gram => "g",
            Self::Pound => "lb",
            Self::Slug => "slug",
        }
    }
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Kelvin => "K",
            Self::Fahrenheit => "F",
        }
    }
}

impl EnergyUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Joule => "J",
            Self::BritishThermalUnit => "BTU",
            Self::FootPound => "ft-lbf",
            Self::Calorie => "cal",
        }
    }
}

/// The six units a model file declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitSystem {
    pub length: LengthUnit,
    pub force: ForceUnit,
    pub stress: StressUnit,
    pub mass: MassUnit,
    pub temperature: TemperatureUnit,
    pub energy: EnergyUnit,
}

impl UnitSystem {
    /// Metre, newton, pascal, kilogram, celsius, joule
    pub fn si() -> Self {
        Self::default()
    }

    /// Millimetre, newton, megapascal, tonne (consistent for N/mm/s)
    pub fn si_mm() -> Self {
        Self {
            length: LengthUnit::Millimeter,
            stress: StressUnit::MegaPascal,
            mass: MassUnit::Tonne,
            ..Self::default()
        }
    }

    /// Foot, kip, ksf, slug, fahrenheit, foot-pound
    pub fn us_customary() -> Self {
        Self {
            length: LengthUnit::Foot,
            force: ForceUnit::KipForce,
            stress: StressUnit::KsfStress,
            mass: MassUnit::Slug,
            temperature: TemperatureUnit::Fahrenheit,
            energy: EnergyUnit::FootPound,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "length: {}, force: {}, stress: {}, mass: {}, temperature: {}, energy: {}",
            self.length.symbol(),
            self.force.symbol(),
            self.stress.symbol(),
            self.mass.symbol(),
            self.temperature.symbol(),
            self.energy.symbol()
        )
    }
}
