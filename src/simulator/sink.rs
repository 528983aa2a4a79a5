//! Sample sinks: the capability boundary towards plotting front-ends.
//!
//! The core never renders anything; it only pushes `(channel, time, value)`
//! triples into whatever sink the caller provides.

use crate::model::{slot, ParameterSet};
use crate::simulator::Sample;

/// Molecular weight of T4, used to convert the plasma pool to µg/L.
const T4_MOLAR_MASS: f64 = 777.0;

/// Molecular weight of T3, used to convert the plasma pool to µg/L.
const T3_MOLAR_MASS: f64 = 651.0;

/// Conversion factor for plasma TSH to mU/L.
const TSH_CONVERSION: f64 = 5.6;

/// The three reporting channels derived from a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    T4,
    T3,
    Tsh,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::T4 => "T4",
            Channel::T3 => "T3",
            Channel::Tsh => "TSH",
        }
    }
}

/// Receiver for per-channel sample values. Implemented by plotting
/// front-ends; the crate ships no implementation beyond test recorders.
pub trait SampleSink {
    fn add_sample(&mut self, channel: Channel, time: f64, value: f64);
}

/// Convert each sample's plasma pools to reporting units and forward them
/// to the sink: T4 and T3 in µg/L (scaled by plasma volume `p47`), TSH in
/// mU/L (scaled by its distribution volume `p48`).
pub fn emit_channels(samples: &[Sample], params: &ParameterSet, sink: &mut dyn SampleSink) {
    let p = params.values();
    for sample in samples {
        sink.add_sample(
            Channel::T4,
            sample.time,
            sample.state[slot::T4] * T4_MOLAR_MASS / p.p47,
        );
        sink.add_sample(
            Channel::T3,
            sample.time,
            sample.state[slot::T3] * T3_MOLAR_MASS / p.p47,
        );
        sink.add_sample(
            Channel::Tsh,
            sample.time,
            sample.state[slot::TSH] * TSH_CONVERSION / p.p48,
        );
    }
}
