//! zlib (DEFLATE) codec for stored resource content
//!
//! Every blob in the store is a zlib stream produced at the default
//! compression level. Decompression either preallocates the exact output
//! length (latest schema generation, where the size is stored next to the
//! blob) or grows the buffer while inflating (legacy rows).

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use tracing::instrument;

use crate::{Error, Result};

/// Growth step for legacy rows whose decompressed size is unknown.
const GROW_CHUNK: usize = 64 * 1024;

/// Compress a byte slice into a zlib stream.
#[instrument(level = "debug", skip(input), fields(input_size = input.len()))]
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(input)
        .map_err(|e| Error::Codec(e.to_string()))?;
    encoder.finish().map_err(|e| Error::Codec(e.to_string()))
}

/// Decompress a zlib stream.
///
/// With `expected_size` the output buffer is allocated once and the stream
/// must decode to exactly that many bytes. Without it the buffer grows as
/// needed and its final length is the decompressed size.
#[instrument(level = "debug", skip(input), fields(input_size = input.len()))]
pub fn decompress(input: &[u8], expected_size: Option<usize>) -> Result<Vec<u8>> {
    match expected_size {
        Some(size) => {
            let mut output = Vec::new();
            // A stored size is untrusted input; refuse it instead of aborting on allocation.
            output
                .try_reserve_exact(size.max(1))
                .map_err(|e| Error::Codec(format!("cannot allocate {} bytes: {}", size, e)))?;
            inflate(input, &mut output, false)?;
            if output.len() != size {
                return Err(Error::Codec(format!(
                    "decompressed {} bytes, expected {}",
                    output.len(),
                    size
                )));
            }
            Ok(output)
        }
        None => {
            let mut output = Vec::new();
            inflate(input, &mut output, true)?;
            output.shrink_to_fit();
            Ok(output)
        }
    }
}

/// Run the inflater until the end of the zlib stream.
///
/// A call that neither consumes input nor produces output means the stream
/// is truncated, or (for a fixed buffer) larger than the buffer.
fn inflate(input: &[u8], output: &mut Vec<u8>, growable: bool) -> Result<()> {
    let mut inflater = Decompress::new(true);

    loop {
        if growable && output.len() == output.capacity() {
            output.reserve(GROW_CHUNK);
        }

        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();

        let status = inflater
            .decompress_vec(&input[consumed..], output, FlushDecompress::None)
            .map_err(|e| Error::Codec(e.to_string()))?;

        if status == Status::StreamEnd {
            return Ok(());
        }

        let stalled = inflater.total_in() as usize == consumed && inflater.total_out() == produced;
        if stalled {
            let reason = if consumed >= input.len() {
                "compressed stream is truncated"
            } else {
                "compressed stream is larger than the expected size"
            };
            return Err(Error::Codec(reason.to_string()));
        }
    }
}
