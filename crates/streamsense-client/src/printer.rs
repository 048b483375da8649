//! Console rendering of pulled data: one line per sample, values separated
//! by a single space

use std::io::{self, Write};
use streamsense_types::{Chunk, MultiplexedChunk, Sample};

pub fn write_values<W: Write + ?Sized>(out: &mut W, values: &[f64]) -> io::Result<()> {
    let mut first = true;
    for value in values {
        if !first {
            out.write_all(b" ")?;
        }
        write!(out, "{}", value)?;
        first = false;
    }
    out.write_all(b"\n")
}

pub fn write_sample<W: Write + ?Sized>(out: &mut W, sample: &Sample) -> io::Result<()> {
    write_values(out, &sample.values)
}

pub fn write_chunk<W: Write + ?Sized>(out: &mut W, chunk: &Chunk) -> io::Result<()> {
    for sample in chunk.iter() {
        write_sample(out, sample)?;
    }
    Ok(())
}

/// Rows are cut at the channel count, so the output matches `write_chunk`
pub fn write_multiplexed<W: Write + ?Sized>(
    out: &mut W,
    chunk: &MultiplexedChunk,
) -> io::Result<()> {
    for row in chunk.rows() {
        write_values(out, row)?;
    }
    Ok(())
}
