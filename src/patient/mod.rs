//! Allometric personalization of physiological volumes and clearance.
//!
//! Pure computation from sex, height, and weight; deliberately *not* wired
//! into the derivative model's volume ratios. The reference never feeds
//! personalized volumes back into the simulation, and that integration gap
//! is preserved here rather than silently "fixed".

use serde::{Deserialize, Serialize};

/// Reference plasma volume: the average of the male (1.76 m, 67.52768 kg)
/// and female (1.67 m, 64.1447 kg) reference-patient plasma volumes.
const REFERENCE_PLASMA_VOLUME: f64 = 2.77492695533;

/// Plasma volume of the standard model patient, litres.
const MODEL_PLASMA_VOLUME: f64 = 3.2;

/// TSH distribution volume of the standard model patient, litres.
const MODEL_TSH_VOLUME: f64 = 5.2;

/// Baseline T3 clearance rate of the standard model patient.
const MODEL_T3_CLEARANCE: f64 = 0.185;

/// Male reference body weight, kg.
const MALE_REFERENCE_WEIGHT: f64 = 67.52768;

/// Female reference body weight, kg.
const FEMALE_REFERENCE_WEIGHT: f64 = 64.1447;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Ideal body weight, kg, as a quadratic in height (metres).
    fn ideal_body_weight(&self, height_m: f64) -> f64 {
        match self {
            Sex::Male => 176.3 - 220.6 * height_m + 93.5 * height_m.powi(2),
            Sex::Female => 145.8 - 182.7 * height_m + 79.55 * height_m.powi(2),
        }
    }

    fn hematocrit(&self) -> f64 {
        match self {
            Sex::Male => 0.45,
            Sex::Female => 0.40,
        }
    }
}

/// Patient-specific volumes and clearance, rescaled against the standard
/// model patient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Personalized plasma volume `Vp_new`, litres.
    pub plasma_volume: f64,
    /// Personalized TSH distribution volume `Vtsh_new`, litres.
    pub tsh_volume: f64,
    /// Personalized T3 clearance rate `k05_new`.
    pub t3_clearance: f64,
}

/// Compute patient-specific volumes and clearance from body size.
///
/// Blood volume follows the allometric law
/// `1.27 * (100 + deviation)^(0.373 - 1) * weight` where `deviation` is the
/// percent deviation of actual from ideal body weight; plasma volume is the
/// non-cellular fraction of it, then rescaled against the reference plasma
/// volume so the male/female reference patients average to exactly the
/// standard model volume. T3 clearance scales with weight to the 3/4 power,
/// with a 1.05 multiplier for males.
pub fn personalize(sex: Sex, height_m: f64, weight_kg: f64) -> PatientProfile {
    let ideal = sex.ideal_body_weight(height_m);
    let deviation = 100.0 * (weight_kg - ideal) / ideal;

    let blood_volume = 1.27 * (100.0 + deviation).powf(0.373 - 1.0) * weight_kg;
    let plasma_volume = blood_volume * (1.0 - sex.hematocrit());

    let vp_new = MODEL_PLASMA_VOLUME * plasma_volume / REFERENCE_PLASMA_VOLUME;
    let vtsh_new = MODEL_TSH_VOLUME + (vp_new - MODEL_PLASMA_VOLUME);

    let t3_clearance = match sex {
        Sex::Male => {
            1.05 * MODEL_T3_CLEARANCE * (weight_kg / MALE_REFERENCE_WEIGHT).powf(0.75)
        }
        Sex::Female => MODEL_T3_CLEARANCE * (weight_kg / FEMALE_REFERENCE_WEIGHT).powf(0.75),
    };

    PatientProfile {
        plasma_volume: vp_new,
        tsh_volume: vtsh_new,
        t3_clearance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MALE_REFERENCE_HEIGHT: f64 = 1.76;
    const FEMALE_REFERENCE_HEIGHT: f64 = 1.67;

    #[test]
    fn reference_patients_average_to_the_model_volume() {
        // The reference plasma volume constant is the male/female average,
        // so the two reference-weight profiles bracket 3.2 L and average to
        // it exactly.
        let male = personalize(Sex::Male, MALE_REFERENCE_HEIGHT, MALE_REFERENCE_WEIGHT);
        let female = personalize(Sex::Female, FEMALE_REFERENCE_HEIGHT, FEMALE_REFERENCE_WEIGHT);

        assert!(male.plasma_volume > 3.2 && female.plasma_volume < 3.2);
        assert_relative_eq!(
            (male.plasma_volume + female.plasma_volume) / 2.0,
            3.2,
            epsilon = 1e-9
        );
    }

    #[test]
    fn reference_weight_clearance_identities() {
        let male = personalize(Sex::Male, MALE_REFERENCE_HEIGHT, MALE_REFERENCE_WEIGHT);
        let female = personalize(Sex::Female, FEMALE_REFERENCE_HEIGHT, FEMALE_REFERENCE_WEIGHT);

        // (w / w_ref)^0.75 == 1 at reference weight, so only the sex
        // multipliers remain.
        assert_relative_eq!(male.t3_clearance, 1.05 * 0.185, epsilon = 1e-12);
        assert_relative_eq!(female.t3_clearance, 0.185, epsilon = 1e-12);
    }

    #[test]
    fn tsh_volume_tracks_plasma_volume_offset() {
        let profile = personalize(Sex::Female, 1.60, 55.0);
        assert_relative_eq!(
            profile.tsh_volume,
            5.2 + (profile.plasma_volume - 3.2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn heavier_patients_get_larger_volumes_and_clearance() {
        let light = personalize(Sex::Male, 1.76, 60.0);
        let heavy = personalize(Sex::Male, 1.76, 90.0);
        assert!(heavy.plasma_volume > light.plasma_volume);
        assert!(heavy.t3_clearance > light.t3_clearance);
    }

    #[test]
    fn personalization_is_deterministic() {
        let a = personalize(Sex::Female, 1.72, 70.3);
        let b = personalize(Sex::Female, 1.72, 70.3);
        assert_eq!(a, b);
    }
}
