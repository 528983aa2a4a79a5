//! # thyrosim
//!
//! Simulation of the hypothalamic-pituitary-thyroid (HPT) hormone feedback
//! axis as a system of coupled nonlinear ODEs: plasma T4, T3, and TSH
//! trajectories under dosing, infusion, and partial-gland-function ("dial")
//! scenarios.
//!
//! The crate is built from small, independently usable capabilities:
//!
//! - [`model`] — the immutable [`ParameterSet`] and the pure derivative
//!   model, in two upstream feedback variants ([`ModelVariant`]);
//! - [`simulator`] — an adaptive Dormand-Prince 8(5,3) driver with
//!   per-step dense-output sampling and pluggable [`SampleSink`]s;
//! - [`output`] — the 22-field reporting line for each sample;
//! - [`patient`] — allometric personalization of volumes and clearance
//!   (intentionally not coupled to the simulation path);
//! - [`config`] — fail-fast ingestion of `.params` key/value files.
//!
//! Forward simulation only: parameter estimation from clinical data is out
//! of scope.

pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod patient;
pub mod simulator;

pub use error::{ConfigError, IntegrationError, ModelError, NonFiniteDerivative, ThyrosimError};
pub use model::{
    free_hormone_pools, free_hormones, slot, Dials, FreeHormones, Infusions, ModelVariant,
    ParameterSet, RawParameters, State, ThyrosimModel, VolumeRatios,
};
pub use output::{format_sample, write_samples};
pub use patient::{personalize, PatientProfile, Sex};
pub use simulator::{
    emit_channels, integrate, Channel, Sample, SampleSink, SamplingMode, Simulation,
    SolverOptions,
};

pub mod prelude {
    pub use crate::config::load_raw_parameters;
    pub use crate::error::{
        ConfigError, IntegrationError, ModelError, NonFiniteDerivative, ThyrosimError,
    };
    pub use crate::model::{
        free_hormone_pools, free_hormones, slot, Dials, Infusions, ModelVariant, ParameterSet,
        RawParameters, State, ThyrosimModel, VolumeRatios,
    };
    pub use crate::output::{format_sample, write_samples};
    pub use crate::patient::{personalize, PatientProfile, Sex};
    pub use crate::simulator::{
        emit_channels, integrate, Channel, Sample, SampleSink, SamplingMode, Simulation,
        SolverOptions,
    };
}
