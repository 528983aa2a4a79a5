//! Adaptive integration driver for the HPT-axis model.
//!
//! Wraps an embedded Dormand-Prince 8(5,3) stepper with dense output
//! ([`ode_solvers::Dop853`], the analogue of the reference integrator).
//! Every accepted step yields one dense-output sample; the driver never
//! re-integrates to sample. The accept/reject loop lives entirely inside
//! the stepper and is not exposed to callers.

mod sink;

pub use sink::{emit_channels, Channel, SampleSink};

use std::cell::Cell;
use std::rc::Rc;

use ode_solvers::dop_shared::{IntegrationError as StepperError, OutputType};
use ode_solvers::Dop853;

use crate::error::{IntegrationError, NonFiniteDerivative};
use crate::model::{free_hormones, State, ThyrosimModel};

/// Tolerances and step-size bounds for the adaptive stepper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Relative error tolerance.
    pub rtol: f64,
    /// Absolute error tolerance.
    pub atol: f64,
    /// Smallest step the driver will accept before declaring underflow.
    pub min_step: f64,
    /// Largest step the stepper may attempt.
    pub max_step: f64,
    /// Initial step size; `None` lets the stepper pick one.
    pub first_step: Option<f64>,
    /// Maximum number of steps before the run is aborted.
    pub step_limit: u32,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: 1e-10,
            atol: 1e-10,
            min_step: 1e-8,
            max_step: 100.0,
            first_step: None,
            step_limit: 100_000,
        }
    }
}

/// Which samples a run keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Exactly one sample, at the end of the time window.
    FinalOnly,
    /// The initial state plus one sample per accepted step.
    Continuous,
}

/// One point of the solution: time, state snapshot, and the derived free
/// hormones, computed at construction through the shared polynomial.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub state: State,
    pub ft4: f64,
    pub ft3: f64,
}

impl Sample {
    pub fn new(time: f64, state: State, model: &ThyrosimModel) -> Self {
        let free = free_hormones(&state, model.params().values());
        Sample {
            time,
            state,
            ft4: free.ft4,
            ft3: free.ft3,
        }
    }
}

/// Result of one integration run.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// State at the end of the requested window.
    pub state: State,
    /// Samples kept according to the [`SamplingMode`].
    pub samples: Vec<Sample>,
    /// Number of derivative evaluations.
    pub evaluations: u32,
    pub accepted_steps: u32,
    pub rejected_steps: u32,
}

/// First failure observed while the stepper owns the problem; read back
/// through a shared cell once the run is over.
#[derive(Debug, Clone, Copy)]
enum Failure {
    NonFinite { time: f64, index: usize },
    Underflow { time: f64 },
}

struct StepperProblem<'a> {
    model: &'a ThyrosimModel,
    t_end: f64,
    min_step: f64,
    last_accepted: Option<f64>,
    failure: Rc<Cell<Option<Failure>>>,
}

impl ode_solvers::System<f64, State> for StepperProblem<'_> {
    fn system(&self, t: f64, q: &State, qdot: &mut State) {
        match self.model.derivatives(t, q) {
            Ok(d) => *qdot = d,
            Err(NonFiniteDerivative { index, time }) => {
                if self.failure.get().is_none() {
                    self.failure.set(Some(Failure::NonFinite { time, index }));
                }
                // Freeze the state; solout stops the run at the next
                // accepted step.
                qdot.fill(0.0);
            }
        }
    }

    fn solout(&mut self, t: f64, _q: &State, _qdot: &State) -> bool {
        if self.failure.get().is_some() {
            return true;
        }
        if let Some(prev) = self.last_accepted {
            let h = (t - prev).abs();
            // The clamped final step towards t_end may legitimately be
            // arbitrarily small.
            if h > 0.0 && h < self.min_step && t != self.t_end {
                self.failure.set(Some(Failure::Underflow { time: t }));
                return true;
            }
        }
        self.last_accepted = Some(t);
        false
    }
}

/// Integrate the model over `[t_start, t_end]`.
///
/// A zero-length window returns `state0` unchanged with exactly one sample.
/// Identical inputs produce bit-identical results: the derivative model is
/// pure and the stepper is deterministic for fixed tolerances.
pub fn integrate(
    model: &ThyrosimModel,
    t_start: f64,
    state0: State,
    t_end: f64,
    options: &SolverOptions,
    mode: SamplingMode,
) -> Result<Simulation, IntegrationError> {
    if t_start == t_end {
        return Ok(Simulation {
            state: state0,
            samples: vec![Sample::new(t_start, state0, model)],
            evaluations: 0,
            accepted_steps: 0,
            rejected_steps: 0,
        });
    }

    let failure = Rc::new(Cell::new(None));
    let problem = StepperProblem {
        model,
        t_end,
        min_step: options.min_step,
        last_accepted: None,
        failure: Rc::clone(&failure),
    };

    // Sparse output records the solution exactly once per accepted step,
    // through the stepper's own dense-output machinery.
    let mut stepper = Dop853::from_param(
        problem,
        t_start,
        t_end,
        t_end - t_start,
        state0,
        options.rtol,
        options.atol,
        0.9,
        0.0,
        0.333,
        6.0,
        options.max_step,
        options.first_step.unwrap_or(0.0),
        options.step_limit,
        1000,
        OutputType::Sparse,
    );
    let outcome = stepper.integrate();

    match failure.get() {
        Some(Failure::NonFinite { time, index }) => {
            tracing::warn!(time, index, "aborting run: derivative became non-finite");
            return Err(IntegrationError::NonFiniteState { time, index });
        }
        Some(Failure::Underflow { time }) => {
            tracing::warn!(time, "aborting run: step size underflow");
            return Err(IntegrationError::StepSizeUnderflow { time });
        }
        None => {}
    }

    let stats = outcome.map_err(|err| match err {
        StepperError::StepSizeUnderflow { x } => IntegrationError::StepSizeUnderflow { time: x },
        StepperError::MaxNumStepReached { x, n_step } => IntegrationError::StepLimitReached {
            time: x,
            steps: n_step,
        },
        StepperError::StiffnessDetected { x } => IntegrationError::StiffnessDetected { time: x },
    })?;

    tracing::debug!(
        evaluations = stats.num_eval,
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        "integration complete"
    );

    let mut samples: Vec<Sample> = stepper
        .x_out()
        .iter()
        .zip(stepper.y_out().iter())
        .map(|(&t, y)| Sample::new(t, *y, model))
        .collect();
    // Normalize: the sequence always starts at t_start.
    if samples.first().map(|s| s.time) != Some(t_start) {
        samples.insert(0, Sample::new(t_start, state0, model));
    }

    let last = samples
        .last()
        .cloned()
        .unwrap_or_else(|| Sample::new(t_start, state0, model));
    let state = last.state;

    let samples = match mode {
        SamplingMode::Continuous => samples,
        SamplingMode::FinalOnly => vec![last],
    };

    Ok(Simulation {
        state,
        samples,
        evaluations: stats.num_eval,
        accepted_steps: stats.accepted_steps,
        rejected_steps: stats.rejected_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{quiet_model, quiet_raw};
    use crate::model::{slot, Dials, Infusions, ModelVariant, ParameterSet, ThyrosimModel};

    #[test]
    fn zero_length_window_is_an_identity() {
        let model = quiet_model(ModelVariant::HillProductFeedback);
        let mut state0 = State::zeros();
        state0[slot::T4] = 0.3;

        let run = integrate(
            &model,
            5.0,
            state0,
            5.0,
            &SolverOptions::default(),
            SamplingMode::Continuous,
        )
        .unwrap();

        assert_eq!(run.state, state0);
        assert_eq!(run.samples.len(), 1);
        assert_eq!(run.samples[0].time, 5.0);
        assert_eq!(run.samples[0].state, state0);
    }

    #[test]
    fn non_finite_derivative_aborts_the_run() {
        let mut raw = quiet_raw();
        raw.p14 = 0.0; // NL = p13 / (p14 + q2) blows up at the origin
        let params = ParameterSet::new(raw, Dials::default(), Infusions::default()).unwrap();
        let model = ThyrosimModel::new(params, ModelVariant::HillProductFeedback);

        let err = integrate(
            &model,
            0.0,
            State::zeros(),
            1.0,
            &SolverOptions::default(),
            SamplingMode::Continuous,
        )
        .unwrap_err();

        assert!(matches!(err, IntegrationError::NonFiniteState { .. }));
    }

    #[test]
    fn final_only_keeps_exactly_the_terminal_sample() {
        let model = quiet_model(ModelVariant::HillProductFeedback);
        let mut state0 = State::zeros();
        state0[slot::DELAY_1] = 1.0;
        // Seed the pituitary signal and its lag strictly positive: the
        // non-integer Hill exponents are NaN for negative bases, and a
        // trajectory started at zero can dip below it by roundoff.
        state0[slot::T3_PITUITARY] = 1.0;
        state0[slot::T3_PITUITARY_LAG] = 1.0;

        let run = integrate(
            &model,
            0.0,
            state0,
            2.0,
            &SolverOptions::default(),
            SamplingMode::FinalOnly,
        )
        .unwrap();

        assert_eq!(run.samples.len(), 1);
        assert_eq!(run.samples[0].time, 2.0);
        assert_eq!(run.samples[0].state, run.state);
    }

    #[test]
    fn channels_apply_the_unit_conversions() {
        #[derive(Default)]
        struct Recorder(Vec<(Channel, f64, f64)>);
        impl SampleSink for Recorder {
            fn add_sample(&mut self, channel: Channel, time: f64, value: f64) {
                self.0.push((channel, time, value));
            }
        }

        let model = quiet_model(ModelVariant::HillProductFeedback);
        let mut state = State::zeros();
        state[slot::T4] = 1.0;
        state[slot::T3] = 2.0;
        state[slot::TSH] = 3.0;
        let samples = vec![Sample::new(0.0, state, &model)];

        let mut recorder = Recorder::default();
        emit_channels(&samples, model.params(), &mut recorder);

        let p = model.params().values();
        assert_eq!(recorder.0.len(), 3);
        assert_eq!(recorder.0[0], (Channel::T4, 0.0, 1.0 * 777.0 / p.p47));
        assert_eq!(recorder.0[1], (Channel::T3, 0.0, 2.0 * 651.0 / p.p47));
        assert_eq!(recorder.0[2], (Channel::Tsh, 0.0, 3.0 * 5.6 / p.p48));
    }
}
