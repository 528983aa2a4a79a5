//! Kinetic constants, dials, and infusion rates.
//!
//! [`RawParameters`] mirrors a parameter file one-to-one. [`ParameterSet`]
//! is the validated, immutable bundle consumed by the derivative model;
//! the dial-dependent rescaling of `p44` and `p46` happens exactly once,
//! at construction, so no evaluation can ever observe a partially-derived
//! parameter set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ModelError};

/// Raw kinetic constants as they appear in a parameter file: the delay-chain
/// rate `kdelay` plus the 48 rate and affinity constants `p1..p48`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawParameters {
    pub kdelay: f64,
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
    pub p5: f64,
    pub p6: f64,
    pub p7: f64,
    pub p8: f64,
    pub p9: f64,
    pub p10: f64,
    pub p11: f64,
    pub p12: f64,
    pub p13: f64,
    pub p14: f64,
    pub p15: f64,
    pub p16: f64,
    pub p17: f64,
    pub p18: f64,
    pub p19: f64,
    pub p20: f64,
    pub p21: f64,
    pub p22: f64,
    pub p23: f64,
    pub p24: f64,
    pub p25: f64,
    pub p26: f64,
    pub p27: f64,
    pub p28: f64,
    pub p29: f64,
    pub p30: f64,
    pub p31: f64,
    pub p32: f64,
    pub p33: f64,
    pub p34: f64,
    pub p35: f64,
    pub p36: f64,
    pub p37: f64,
    pub p38: f64,
    pub p39: f64,
    pub p40: f64,
    pub p41: f64,
    pub p42: f64,
    pub p43: f64,
    pub p44: f64,
    pub p45: f64,
    pub p46: f64,
    pub p47: f64,
    pub p48: f64,
}

/// Applies a callback macro to every field of [`RawParameters`], in file
/// order. Single source of truth for key lists and finiteness checks.
macro_rules! with_raw_parameter_fields {
    ($callback:ident, $($args:tt)*) => {
        $callback!(
            $($args)*;
            kdelay, p1, p2, p3, p4, p5, p6, p7, p8, p9, p10, p11, p12, p13,
            p14, p15, p16, p17, p18, p19, p20, p21, p22, p23, p24, p25, p26,
            p27, p28, p29, p30, p31, p32, p33, p34, p35, p36, p37, p38, p39,
            p40, p41, p42, p43, p44, p45, p46, p47, p48
        )
    };
}

macro_rules! raw_from_map {
    ($map:expr; $($field:ident),+) => {
        RawParameters {
            $($field: *$map.get(stringify!($field)).ok_or_else(|| {
                ConfigError::MissingKey {
                    key: stringify!($field).to_string(),
                }
            })?),+
        }
    };
}

macro_rules! raw_field_entries {
    ($this:expr; $($field:ident),+) => {
        [$((stringify!($field), $this.$field)),+]
    };
}

impl RawParameters {
    /// Build from a key/value map, failing fast on the first missing key.
    pub fn from_map(map: &HashMap<String, f64>) -> Result<Self, ConfigError> {
        Ok(with_raw_parameter_fields!(raw_from_map, map))
    }

    /// Deserialize from a JSON object keyed by parameter name, the format
    /// the web frontend saves parameter sets in.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// All fields with their names, in file order.
    pub fn fields(&self) -> [(&'static str, f64); 49] {
        with_raw_parameter_fields!(raw_field_entries, self)
    }
}

/// Fractional gland-function scalars.
///
/// `dial1`/`dial3` scale T4/T3 secretion; `dial2`/`dial4` scale T4/T3
/// absorption and fold into `p44`/`p46` at [`ParameterSet`] construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dials {
    pub dial1: f64,
    pub dial2: f64,
    pub dial3: f64,
    pub dial4: f64,
}

impl Default for Dials {
    /// Fully functional gland: secretion dials at 1.0, absorption at 0.88.
    fn default() -> Self {
        Dials {
            dial1: 1.0,
            dial2: 0.88,
            dial3: 1.0,
            dial4: 0.88,
        }
    }
}

/// Exogenous infusion rates into plasma T4 (`inf1`) and plasma T3 (`inf4`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Infusions {
    pub inf1: f64,
    pub inf4: f64,
}

/// Immutable, validated parameter bundle for one simulation run.
///
/// Constructed once; the stored `p44` and `p46` are already multiplied by
/// `dial2` and `dial4` respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    values: RawParameters,
    dials: Dials,
    infusions: Infusions,
}

impl ParameterSet {
    /// Validate and freeze a parameter set.
    ///
    /// Rejects any non-finite kinetic constant, dial, or infusion rate with
    /// [`ModelError::NonFiniteParameter`], then applies the one-time
    /// derivations `p44 * dial2` and `p46 * dial4`.
    pub fn new(
        raw: RawParameters,
        dials: Dials,
        infusions: Infusions,
    ) -> Result<Self, ModelError> {
        for (name, value) in raw.fields() {
            if !value.is_finite() {
                return Err(ModelError::NonFiniteParameter { name });
            }
        }
        for (name, value) in [
            ("dial1", dials.dial1),
            ("dial2", dials.dial2),
            ("dial3", dials.dial3),
            ("dial4", dials.dial4),
            ("inf1", infusions.inf1),
            ("inf4", infusions.inf4),
        ] {
            if !value.is_finite() {
                return Err(ModelError::NonFiniteParameter { name });
            }
        }

        let mut values = raw;
        values.p44 = raw.p44 * dials.dial2;
        values.p46 = raw.p46 * dials.dial4;

        Ok(ParameterSet {
            values,
            dials,
            infusions,
        })
    }

    /// The kinetic constants, with `p44`/`p46` in their derived form.
    pub fn values(&self) -> &RawParameters {
        &self.values
    }

    pub fn dials(&self) -> &Dials {
        &self.dials
    }

    pub fn infusions(&self) -> &Infusions {
        &self.infusions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::quiet_raw;
    use approx::assert_relative_eq;

    #[test]
    fn absorption_derivation_applies_exactly_once() {
        let raw = quiet_raw();
        let dials = Dials {
            dial1: 1.0,
            dial2: 0.5,
            dial3: 1.0,
            dial4: 0.25,
        };
        let params = ParameterSet::new(raw, dials, Infusions::default()).unwrap();
        assert_relative_eq!(params.values().p44, raw.p44 * 0.5);
        assert_relative_eq!(params.values().p46, raw.p46 * 0.25);

        // Rebuilding from the same raw values must not compound the scaling.
        let again = ParameterSet::new(raw, dials, Infusions::default()).unwrap();
        assert_eq!(params, again);
    }

    #[test]
    fn non_finite_kinetic_constant_is_rejected() {
        let mut raw = quiet_raw();
        raw.p5 = f64::NAN;
        let err = ParameterSet::new(raw, Dials::default(), Infusions::default()).unwrap_err();
        assert_eq!(err, ModelError::NonFiniteParameter { name: "p5" });
    }

    #[test]
    fn non_finite_dial_is_rejected() {
        let dials = Dials {
            dial2: f64::INFINITY,
            ..Dials::default()
        };
        let err = ParameterSet::new(quiet_raw(), dials, Infusions::default()).unwrap_err();
        assert_eq!(err, ModelError::NonFiniteParameter { name: "dial2" });
    }

    #[test]
    fn from_map_reports_the_missing_key() {
        let mut map: HashMap<String, f64> = quiet_raw()
            .fields()
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        map.remove("p17");
        match RawParameters::from_map(&map) {
            Err(ConfigError::MissingKey { key }) => assert_eq!(key, "p17"),
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let raw = quiet_raw();
        let json = serde_json::to_string(&raw).unwrap();
        let back = RawParameters::from_json(&json).unwrap();
        assert_eq!(raw, back);
    }
}
