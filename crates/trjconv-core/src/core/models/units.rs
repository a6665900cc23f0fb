use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of Ångström in one nanometre.
pub const ANGSTROM_PER_NANOMETER: f64 = 10.0;

/// Length unit a frame's positions and box vector are expressed in.
///
/// Tinker files are written in Ångström, GROMACS files in nanometres. Every
/// frame remembers which one it carries so that the conversion factor is
/// applied exactly once when moving between formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthUnit {
    Angstrom,
    Nanometer,
}

impl LengthUnit {
    /// Multiplicative factor taking a length in `self` to a length in `target`.
    pub fn factor_to(self, target: LengthUnit) -> f64 {
        match (self, target) {
            (LengthUnit::Angstrom, LengthUnit::Nanometer) => 1.0 / ANGSTROM_PER_NANOMETER,
            (LengthUnit::Nanometer, LengthUnit::Angstrom) => ANGSTROM_PER_NANOMETER,
            _ => 1.0,
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthUnit::Angstrom => write!(f, "Å"),
            LengthUnit::Nanometer => write!(f, "nm"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_unit_factor_is_identity() {
        assert_eq!(LengthUnit::Angstrom.factor_to(LengthUnit::Angstrom), 1.0);
        assert_eq!(LengthUnit::Nanometer.factor_to(LengthUnit::Nanometer), 1.0);
    }

    #[test]
    fn angstrom_nanometer_round_trip_is_invertible() {
        let values = [0.0, 1.0, -3.25, 12.345678, 1.0e-4, 98765.4321];
        for value in values {
            let nm = value * LengthUnit::Angstrom.factor_to(LengthUnit::Nanometer);
            let back = nm * LengthUnit::Nanometer.factor_to(LengthUnit::Angstrom);
            let tolerance = 1e-9 * value.abs().max(1.0);
            assert!((back - value).abs() < tolerance, "{value} -> {back}");
        }
    }

    #[test]
    fn display_uses_unit_symbols() {
        assert_eq!(LengthUnit::Angstrom.to_string(), "Å");
        assert_eq!(LengthUnit::Nanometer.to_string(), "nm");
    }
}
