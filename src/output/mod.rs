//! Line-oriented text rendering of samples.
//!
//! One line per sample: time, the 19 state components, then the free
//! hormones FT4 and FT3 — 22 space-separated fields, newline-terminated.
//! The free hormones come from the sample itself, which derived them at
//! construction through the one shared polynomial in [`crate::model`], so
//! the formatter can never drift from the derivative model.

use std::io;

use crate::simulator::Sample;

/// Render one sample as a reporting line.
///
/// Each field is the canonical shortest round-trip decimal representation
/// of the value.
pub fn format_sample(sample: &Sample) -> String {
    let mut fields = Vec::with_capacity(22);
    fields.push(sample.time.to_string());
    fields.extend(sample.state.iter().map(|value| value.to_string()));
    fields.push(sample.ft4.to_string());
    fields.push(sample.ft3.to_string());

    let mut line = fields.join(" ");
    line.push('\n');
    line
}

/// Stream a sequence of samples to any writer, one line each.
pub fn write_samples<'a, W, I>(writer: &mut W, samples: I) -> io::Result<()>
where
    W: io::Write,
    I: IntoIterator<Item = &'a Sample>,
{
    for sample in samples {
        writer.write_all(format_sample(sample).as_bytes())?;
    }
    Ok(())
}
