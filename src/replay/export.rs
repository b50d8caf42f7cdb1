//! Export the protobuf payload bytes of a single log line to a file.
//!
//! Only the payload is written, never the wire header; the output is the
//! exact byte string a CommServer would see after stripping the frame.

use std::path::Path;

use crate::error::{Error, Result};
use crate::protocol::payload::PayloadCodec;
use crate::replay::logline;

/// Read a one-line log file, parse it and write the serialized payload to
/// `output`. Returns the number of payload bytes written.
pub async fn export_payload(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    codec: &dyn PayloadCodec,
) -> Result<usize> {
    let text = tokio::fs::read_to_string(input.as_ref()).await?;
    let line = text.trim();
    if line.is_empty() {
        return Err(Error::config("input file is empty"));
    }
    let record = logline::parse_line(line)?;
    let payload = codec.text_to_bytes(&record.payload_text)?;
    tokio::fs::write(output.as_ref(), &payload).await?;
    Ok(payload.len())
}
