//! Beam section and material properties.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Geometric and material properties of one member type.
///
/// Members reference sections by their index in the [`MaterialTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamSection {
    /// Human readable label, e.g. `"steel 20x2"`.
    #[serde(default)]
    pub name: String,
    /// Outer diameter (m).
    pub outer_diameter: f64,
    /// Inner diameter (m). Zero for a solid rod.
    #[serde(default)]
    pub inner_diameter: f64,
    /// Young's modulus (Pa).
    pub elastic_modulus: f64,
    /// Shear modulus (Pa).
    pub shear_modulus: f64,
    /// Yield strength (Pa).
    pub yield_strength: f64,
    /// Density (kg/m^3).
    pub density: f64,
    /// Cross-sectional area (m^2).
    pub x_section_area: f64,
    /// Second moment of area about the local y axis (m^4).
    pub moment_inertia_y: f64,
    /// Second moment of area about the local z axis (m^4).
    pub moment_inertia_z: f64,
    /// Polar moment of inertia (m^4).
    pub polar_moment_inertia: f64,
    /// Cost per unit length.
    #[serde(default)]
    pub cost: f64,
}

/// Inputs for deriving a circular tube section.
#[derive(Debug, Clone, PartialEq)]
pub struct TubeSpec<'a> {
    pub name: &'a str,
    pub outer_diameter: f64,
    pub inner_diameter: f64,
    pub elastic_modulus: f64,
    pub yield_strength: f64,
    pub density: f64,
    pub poisson_ratio: f64,
    pub cost: f64,
}

impl BeamSection {
    /// Derive section properties of a hollow circular tube.
    pub fn tube(spec: &TubeSpec<'_>) -> Self {
        let d_o = spec.outer_diameter;
        let d_i = spec.inner_diameter;
        let fourth = d_o.powi(4) - d_i.powi(4);
        let bending = PI / 64.0 * fourth;
        Self {
            name: spec.name.to_string(),
            outer_diameter: d_o,
            inner_diameter: d_i,
            elastic_modulus: spec.elastic_modulus,
            shear_modulus: spec.elastic_modulus / (2.0 * (1.0 + spec.poisson_ratio)),
            yield_strength: spec.yield_strength,
            density: spec.density,
            x_section_area: PI / 4.0 * (d_o * d_o - d_i * d_i),
            moment_inertia_y: bending,
            moment_inertia_z: bending,
            polar_moment_inertia: PI / 32.0 * fourth,
            cost: spec.cost,
        }
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let positive = [
            ("outer_diameter", self.outer_diameter),
            ("elastic_modulus", self.elastic_modulus),
            ("shear_modulus", self.shear_modulus),
            ("yield_strength", self.yield_strength),
            ("x_section_area", self.x_section_area),
            ("moment_inertia_y", self.moment_inertia_y),
            ("moment_inertia_z", self.moment_inertia_z),
            ("polar_moment_inertia", self.polar_moment_inertia),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidSection {
                    index,
                    field,
                    value,
                });
            }
        }
        for (field, value) in [
            ("inner_diameter", self.inner_diameter),
            ("density", self.density),
            ("cost", self.cost),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidSection {
                    index,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Immutable lookup from property index to beam section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialTable {
    sections: Vec<BeamSection>,
}

impl MaterialTable {
    pub fn new(sections: Vec<BeamSection>) -> Self {
        Self { sections }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&BeamSection> {
        self.sections.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BeamSection> {
        self.sections.iter()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sections.is_empty() {
            return Err(ConfigError::NoMaterials);
        }
        for (index, section) in self.sections.iter().enumerate() {
            section.validate(index)?;
        }
        Ok(())
    }
}

impl Default for MaterialTable {
    /// Structural steel and 6061 aluminium tubes in three sizes each.
    fn default() -> Self {
        let sizes = [(0.02, 0.016), (0.03, 0.024), (0.05, 0.04)];
        let mut sections = Vec::with_capacity(sizes.len() * 2);
        for (outer_diameter, inner_diameter) in sizes {
            sections.push(BeamSection::tube(&TubeSpec {
                name: &format!("steel {:.0}mm", outer_diameter * 1000.0),
                outer_diameter,
                inner_diameter,
                elastic_modulus: 200e9,
                yield_strength: 250e6,
                density: 7850.0,
                poisson_ratio: 0.3,
                cost: 40.0 * outer_diameter,
            }));
        }
        for (outer_diameter, inner_diameter) in sizes {
            sections.push(BeamSection::tube(&TubeSpec {
                name: &format!("aluminium {:.0}mm", outer_diameter * 1000.0),
                outer_diameter,
                inner_diameter,
                elastic_modulus: 68.9e9,
                yield_strength: 276e6,
                density: 2700.0,
                poisson_ratio: 0.33,
                cost: 90.0 * outer_diameter,
            }));
        }
        Self { sections }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tube_properties() {
        let section = BeamSection::tube(&TubeSpec {
            name: "solid",
            outer_diameter: 0.02,
            inner_diameter: 0.0,
            elastic_modulus: 200e9,
            yield_strength: 250e6,
            density: 7850.0,
            poisson_ratio: 0.25,
            cost: 1.0,
        });
        assert_relative_eq!(section.x_section_area, PI * 1e-4, max_relative = 1e-12);
        assert_relative_eq!(section.shear_modulus, 80e9, max_relative = 1e-12);
        assert_relative_eq!(
            section.polar_moment_inertia,
            section.moment_inertia_y + section.moment_inertia_z,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = MaterialTable::default();
        assert_eq!(table.len(), 6);
        assert!(table.validate().is_ok());
        assert!(table.get(6).is_none());

        let names: Vec<&str> = table.iter().map(|section| section.name.as_str()).collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "steel 20mm");
        assert_eq!(names[5], "aluminium 50mm");
        for (index, section) in table.iter().enumerate() {
            assert_eq!(table.get(index), Some(section));
        }
    }

    #[test]
    fn test_validate_rejects_bad_section() {
        let mut section = MaterialTable::default().get(0).cloned().unwrap();
        section.yield_strength = 0.0;
        let table = MaterialTable::new(vec![section]);
        assert!(matches!(
            table.validate(),
            Err(ConfigError::InvalidSection {
                index: 0,
                field: "yield_strength",
                ..
            })
        ));
        assert!(matches!(
            MaterialTable::new(Vec::new()).validate(),
            Err(ConfigError::NoMaterials)
        ));
    }
}
