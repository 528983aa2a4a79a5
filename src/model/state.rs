//! The 19-component state vector and its semantic slot indices.

use nalgebra::SVector;

/// State vector of the HPT axis model: 19 hormone compartments, in the
/// fixed order given by the [`slot`] constants.
///
/// Values are physically meaningful only when non-negative; this is not
/// enforced numerically.
pub type State = SVector<f64, 19>;

/// Semantic indices into the [`State`] vector.
pub mod slot {
    /// Plasma T4.
    pub const T4: usize = 0;
    /// Fast-compartment T4.
    pub const T4_FAST: usize = 1;
    /// Slow-compartment T4.
    pub const T4_SLOW: usize = 2;
    /// Plasma T3.
    pub const T3: usize = 3;
    /// Fast-compartment T3.
    pub const T3_FAST: usize = 4;
    /// Slow-compartment T3.
    pub const T3_SLOW: usize = 5;
    /// Plasma TSH.
    pub const TSH: usize = 6;
    /// Pituitary T3 signal.
    pub const T3_PITUITARY: usize = 7;
    /// Lagged pituitary T3 signal.
    pub const T3_PITUITARY_LAG: usize = 8;
    /// Oral T4 (pill).
    pub const T4_PILL: usize = 9;
    /// Gut T4.
    pub const T4_GUT: usize = 10;
    /// Oral T3 (pill).
    pub const T3_PILL: usize = 11;
    /// Gut T3.
    pub const T3_GUT: usize = 12;
    /// First stage of the brain transport delay chain.
    pub const DELAY_1: usize = 13;
    pub const DELAY_2: usize = 14;
    pub const DELAY_3: usize = 15;
    pub const DELAY_4: usize = 16;
    pub const DELAY_5: usize = 17;
    /// Last delay stage; drives the secretion terms SR3 and SR4.
    pub const DELAY_6: usize = 18;
}
