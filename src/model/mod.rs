//! The nonlinear HPT-axis derivative model.
//!
//! The model maps `(time, state, parameters)` to a 19-component derivative
//! vector encoding hormone kinetics, pituitary feedback, and the six-stage
//! brain transport delay. Two copies of the model circulate upstream and
//! have drifted apart: their TSH secretion terms differ materially and
//! their kinetic parameter indices are shifted by one relative to each
//! other. Both are implemented here as named strategy variants behind
//! [`ThyrosimModel`] — which one is canonical is unresolved upstream, so
//! callers must choose explicitly.
//!
//! Expression structure deliberately mirrors each reference copy term by
//! term: floating-point rounding differences compound over long integration
//! horizons, so no algebraic simplification is applied.

mod parameters;
mod state;

pub use parameters::{Dials, Infusions, ParameterSet, RawParameters};
pub use state::{slot, State};

use serde::{Deserialize, Serialize};

use crate::error::NonFiniteDerivative;

/// Free (unbound) plasma hormone concentrations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeHormones {
    /// Free plasma T4.
    pub ft4: f64,
    /// Free plasma T3.
    pub ft3: f64,
}

/// Free-hormone fractions as cubic polynomials in plasma T4.
///
/// This is the single shared implementation used by the derivative model
/// and by sample construction (and, through samples, the output formatter).
pub fn free_hormones(q: &State, p: &RawParameters) -> FreeHormones {
    free_hormone_pools(q[slot::T4], q[slot::T3], p)
}

/// The same polynomial on explicit pool values, for callers holding
/// volume-scaled compartments rather than a full state vector.
pub fn free_hormone_pools(t4: f64, t3: f64, p: &RawParameters) -> FreeHormones {
    let ft4 = (p.p7 + p.p8 * t4 + p.p9 * t4.powi(2) + p.p10 * t4.powi(3)) * t4;
    let ft3 = (p.p24 + p.p25 * t4 + p.p26 * t4.powi(2) + p.p27 * t4.powi(3)) * t3;
    FreeHormones { ft4, ft3 }
}

// Fitted constants of the Hill feedback terms. These were calibrated
// together with the Hill exponents and are not part of the parameter file.
const K_CIRC: f64 = 3.00101;
const K_SRTSH: f64 = 3.0947;
const N_HILL_CIRC: f64 = 5.6747;
const M_HILL_CIRC: f64 = 6.2908;
const K_F4: f64 = 8.4983;
const L_HILL_F4: f64 = 14.366;

/// The two reference copies of the derivative model.
///
/// Both drive the circadian term `fCIRC` from the same Hill saturation of
/// the lagged pituitary signal and share the `f4` and `fLAG` forms, but
/// they disagree on TSH secretion and on parameter layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelVariant {
    /// Additive sinusoid over an inhibitory Hill ratio:
    /// `SRTSH = (p30 + p31 fCIRC sin(pi t/12 - p33)) * K^m / (K^m + q8^m)`.
    /// Kinetic indices shifted up by one relative to the product copy;
    /// free-hormone cubic, `fdegTSH`, and `NL` evaluated on the
    /// volume-scaled pools.
    HillRatioFeedback,
    /// Multiplicative Hill product:
    /// `SRTSH = (p30 + p31 fCIRC sin(2 pi t - p33)) * (K^m + q8^m)`.
    /// Original kinetic indices; cubic and `NL` on the raw pools.
    HillProductFeedback,
}

/// Compartment volume-ratio scalars.
///
/// All 1.0 in the reference model; kept configurable so personalized
/// volumes can eventually be wired in without touching the derivative body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRatios {
    /// Plasma volume ratio (T4, T3, and TSH plasma pools).
    pub plasma: f64,
    /// Fast-tissue pool ratio.
    pub fast: f64,
    /// Slow-tissue pool ratio.
    pub slow: f64,
}

impl Default for VolumeRatios {
    fn default() -> Self {
        VolumeRatios {
            plasma: 1.0,
            fast: 1.0,
            slow: 1.0,
        }
    }
}

/// The HPT-axis state-transition function: an immutable parameter set, a
/// model copy, and the volume-ratio scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct ThyrosimModel {
    params: ParameterSet,
    variant: ModelVariant,
    volumes: VolumeRatios,
}

impl ThyrosimModel {
    pub fn new(params: ParameterSet, variant: ModelVariant) -> Self {
        ThyrosimModel {
            params,
            variant,
            volumes: VolumeRatios::default(),
        }
    }

    /// Replace the volume-ratio scalars. Note that personalized volumes
    /// from [`crate::patient`] are *not* fed back here automatically; the
    /// reference model never closes that loop.
    pub fn with_volumes(mut self, volumes: VolumeRatios) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn volumes(&self) -> &VolumeRatios {
        &self.volumes
    }

    /// Evaluate the state-transition function at `(t, q)`.
    ///
    /// Pure; fails with [`NonFiniteDerivative`] if any output component is
    /// NaN or infinite.
    pub fn derivatives(&self, t: f64, q: &State) -> Result<State, NonFiniteDerivative> {
        let qdot = match self.variant {
            ModelVariant::HillRatioFeedback => self.hill_ratio_derivatives(t, q),
            ModelVariant::HillProductFeedback => self.hill_product_derivatives(t, q),
        };

        for (index, value) in qdot.iter().enumerate() {
            if !value.is_finite() {
                return Err(NonFiniteDerivative { index, time: t });
            }
        }
        Ok(qdot)
    }

    /// The ratio copy: inhibitory-Hill-ratio TSH secretion, circadian phase
    /// `pi t / 12`, shifted kinetic indices, all nonlinearities on the
    /// volume-scaled pools.
    fn hill_ratio_derivatives(&self, t: f64, q: &State) -> State {
        let p = self.params.values();
        let d = self.params.dials();
        let u = self.params.infusions();
        let v = &self.volumes;

        let q1 = q[slot::T4] / v.plasma;
        let q2 = q[slot::T4_FAST] / v.fast;
        let q3 = q[slot::T4_SLOW] / v.slow;
        let q4 = q[slot::T3] / v.plasma;
        let q5 = q[slot::T3_FAST] / v.fast;
        let q6 = q[slot::T3_SLOW] / v.slow;
        let q7 = q[slot::TSH] / v.plasma;

        // This copy evaluates the shared cubic on the scaled pools.
        let free = free_hormone_pools(q1, q4, p);
        let q1f = free.ft4;
        let q4f = free.ft3;

        let sr3 = (p.p19 * q[slot::DELAY_6]) * d.dial3;
        let sr4 = (p.p1 * q[slot::DELAY_6]) * d.dial1;

        let lagged = q[slot::T3_PITUITARY_LAG];
        let pituitary = q[slot::T3_PITUITARY];

        let lagged_n = lagged.powf(N_HILL_CIRC);
        let k_srtsh_m = K_SRTSH.powf(M_HILL_CIRC);
        let k_f4_l = K_F4.powf(L_HILL_F4);

        let fcirc = lagged_n / (lagged_n + K_CIRC.powf(N_HILL_CIRC));
        let srtsh = (p.p30
            + p.p31 * fcirc * (std::f64::consts::PI * t / 12.0 - p.p33).sin())
            * (k_srtsh_m / (k_srtsh_m + lagged.powf(M_HILL_CIRC)));
        let fdeg_tsh = p.p34 + p.p35 / (p.p36 + q7);
        let flag = p.p41
            + 2.0 * pituitary.powi(11) / (p.p42.powi(11) + pituitary.powi(11));
        let f4 = p.p37 * (1.0 + 5.0 * k_f4_l / (k_f4_l + pituitary.powf(L_HILL_F4)));
        let nl = p.p13 / (p.p14 + q2);

        let mut qdot = State::zeros();
        qdot[slot::T4] = (sr4 + p.p3 * q2 + p.p4 * q3 - (p.p5 + p.p6) * q1f) * v.plasma
            + p.p11 * q[slot::T4_GUT]
            + u.inf1;
        qdot[slot::T4_FAST] = (p.p6 * q1f - (p.p3 + p.p12 + nl) * q2) * v.fast;
        qdot[slot::T4_SLOW] = (p.p5 * q1f
            - (p.p4 + p.p15 / (p.p16 + q3) + p.p17 / (p.p18 + q3)) * q3)
            * v.slow;
        qdot[slot::T3] = (sr3 + p.p20 * q5 + p.p21 * q6 - (p.p22 + p.p23) * q4f) * v.plasma
            + p.p28 * q[slot::T3_GUT]
            + u.inf4;
        qdot[slot::T3_FAST] = (p.p23 * q4f + nl * q2 - (p.p20 + p.p29) * q5) * v.fast;
        qdot[slot::T3_SLOW] = (p.p22 * q4f
            + p.p15 * q3 / (p.p16 + q3)
            + p.p17 * q3 / (p.p18 + q3)
            - p.p21 * q6)
            * v.slow;
        qdot[slot::TSH] = (srtsh - fdeg_tsh * q7) * v.plasma;
        qdot[slot::T3_PITUITARY] =
            f4 / p.p38 * q1 + p.p37 / p.p39 * q4 - p.p40 * q[slot::T3_PITUITARY];
        qdot[slot::T3_PITUITARY_LAG] = flag * (pituitary - lagged);
        qdot[slot::T4_PILL] = -p.p43 * q[slot::T4_PILL];
        // p44/p46 already carry their dial scaling from construction; this
        // copy multiplies by the dial a second time, as its reference does.
        qdot[slot::T4_GUT] =
            p.p43 * q[slot::T4_PILL] - (p.p44 * d.dial2 + p.p11) * q[slot::T4_GUT];
        qdot[slot::T3_PILL] = -p.p45 * q[slot::T3_PILL];
        qdot[slot::T3_GUT] =
            p.p45 * q[slot::T3_PILL] - (p.p46 * d.dial4 + p.p28) * q[slot::T3_GUT];

        // Six-stage linear cascade approximating the brain transport lag.
        qdot[slot::DELAY_1] = q7 - p.kdelay * q[slot::DELAY_1];
        for k in slot::DELAY_2..=slot::DELAY_6 {
            qdot[k] = p.kdelay * (q[k - 1] - q[k]);
        }
        qdot
    }

    /// The product copy: multiplicative-Hill-product TSH secretion,
    /// circadian phase `2 pi t`, original kinetic indices. This copy mixes
    /// scaled and raw compartments below; that mix is preserved exactly.
    fn hill_product_derivatives(&self, t: f64, q: &State) -> State {
        let p = self.params.values();
        let d = self.params.dials();
        let u = self.params.infusions();
        let v = &self.volumes;

        let q1 = q[slot::T4] / v.plasma;
        let q2 = q[slot::T4_FAST] / v.fast;
        let q3 = q[slot::T4_SLOW] / v.slow;
        let q4 = q[slot::T3] / v.plasma;
        let q5 = q[slot::T3_FAST] / v.fast;
        let q6 = q[slot::T3_SLOW] / v.slow;
        let q7 = q[slot::TSH] / v.plasma;

        let free = free_hormones(q, p);
        let q1f = free.ft4;
        let q4f = free.ft3;

        let sr3 = (p.p19 * q[slot::DELAY_6]) * d.dial3;
        let sr4 = (p.p1 * q[slot::DELAY_6]) * d.dial1;

        let lagged = q[slot::T3_PITUITARY_LAG];
        let pituitary = q[slot::T3_PITUITARY];

        let lagged_n = lagged.powf(N_HILL_CIRC);
        let k_f4_l = K_F4.powf(L_HILL_F4);

        let fcirc = lagged_n / (lagged_n + K_CIRC.powf(N_HILL_CIRC));
        let srtsh = (p.p30
            + p.p31 * fcirc * (2.0 * std::f64::consts::PI * t - p.p33).sin())
            * (K_SRTSH.powf(M_HILL_CIRC) + lagged.powf(M_HILL_CIRC));
        let fdeg_tsh = p.p34 + p.p35 / (p.p36 + q[slot::TSH]);
        let flag = p.p41
            + 2.0 * pituitary.powi(11) / (p.p42.powi(11) + pituitary.powi(11));
        let f4 = p.p37 * (1.0 + 5.0 * k_f4_l / (k_f4_l + pituitary.powf(L_HILL_F4)));
        let nl = p.p13 / (p.p14 + q[slot::T4_FAST]);

        let mut qdot = State::zeros();
        qdot[slot::T4] = (sr4 + p.p2 * q2 + p.p3 * q3 - (p.p4 + p.p5) * q1f) * v.plasma
            + p.p10 * q[slot::T4_GUT]
            + u.inf1;
        qdot[slot::T4_FAST] = (p.p5 * q1f - (p.p2 + p.p11 + nl) * q2) * v.fast;
        qdot[slot::T4_SLOW] = (p.p4 * q1f
            - (p.p3 + p.p14 / (p.p15 + q3) + p.p16 / (p.p17 + q3)) * q3)
            * v.slow;
        qdot[slot::T3] = (sr3 + p.p19 * q5 + p.p20 * q6 - (p.p21 + p.p22) * q4f) * v.plasma
            + p.p27 * q[slot::T3_GUT]
            + u.inf4;
        qdot[slot::T3_FAST] = (p.p22 * q4f + nl * q2 - (p.p19 + p.p28) * q5) * v.fast;
        qdot[slot::T3_SLOW] = (p.p21 * q4f
            + p.p14 * q3 / (p.p15 + q3)
            + p.p16 * q3 / (p.p17 + q3)
            - p.p20 * q6)
            * v.slow;
        qdot[slot::TSH] = (srtsh - fdeg_tsh * q7) * v.plasma;
        qdot[slot::T3_PITUITARY] =
            f4 / p.p37 * q1 + p.p36 / p.p38 * q4 - p.p39 * q[slot::T3_PITUITARY];
        qdot[slot::T3_PITUITARY_LAG] = flag * (pituitary - lagged);
        qdot[slot::T4_PILL] = -p.p42 * q[slot::T4_PILL];
        qdot[slot::T4_GUT] =
            p.p42 * q[slot::T4_PILL] - (p.p43 * d.dial1 + p.p10) * q[slot::T4_GUT];
        // p44 and p46 carry their dial scaling from construction.
        qdot[slot::T3_PILL] = -p.p44 * q[slot::T3_PILL];
        qdot[slot::T3_GUT] =
            p.p44 * q[slot::T3_PILL] - (p.p45 * d.dial3 + p.p27) * q[slot::T3_GUT];

        // Six-stage linear cascade approximating the brain transport lag.
        qdot[slot::DELAY_1] = q7 - p.kdelay * q[slot::DELAY_1];
        for k in slot::DELAY_2..=slot::DELAY_6 {
            qdot[k] = p.kdelay * (q[k - 1] - q[k]);
        }
        qdot
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A mild synthetic parameter set: every denominator is bounded away
    /// from zero (in both model copies) and all rate constants are small,
    /// so trajectories stay tame over day-scale horizons.
    pub(crate) fn quiet_raw() -> RawParameters {
        RawParameters {
            kdelay: 0.625,
            p1: 0.001,
            p2: 0.05,
            p3: 0.02,
            p4: 0.1,
            p5: 0.2,
            p6: 0.0,
            p7: 0.000289,
            p8: 0.000214,
            p9: 0.000128,
            p10: -0.00000883,
            p11: 0.05,
            p12: 0.0,
            p13: 0.01,
            p14: 2.85,
            p15: 1.0,
            p16: 0.1,
            p17: 1.0,
            p18: 1.0,
            p19: 0.001,
            p20: 0.05,
            p21: 0.03,
            p22: 0.1,
            p23: 0.0,
            p24: 0.00395,
            p25: 0.00185,
            p26: 0.00061,
            p27: -0.000505,
            p28: 0.05,
            p29: 0.0,
            p30: 0.01,
            p31: 0.0,
            p32: 2.37,
            p33: -3.71,
            p34: 0.5,
            p35: 0.037,
            p36: 23.0,
            p37: 0.118,
            p38: 0.29,
            p39: 0.05,
            p40: 0.0,
            p41: 0.0034,
            p42: 5.0,
            p43: 0.1,
            p44: 0.12,
            p45: 0.1,
            p46: 0.12,
            p47: 3.2,
            p48: 5.2,
        }
    }

    pub(crate) fn quiet_model(variant: ModelVariant) -> ThyrosimModel {
        let params =
            ParameterSet::new(quiet_raw(), Dials::default(), Infusions::default()).unwrap();
        ThyrosimModel::new(params, variant)
    }
}
