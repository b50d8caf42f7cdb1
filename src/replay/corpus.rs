//! Replay corpus: parsed lines with pre-encoded frames, and the contiguous
//! partition of the corpus across workers.

use bytes::Bytes;
use tracing::warn;

use crate::config::DeployProfile;
use crate::error::{Error, Result};
use crate::protocol::header::HeaderV3;
use crate::protocol::payload::PayloadCodec;
use crate::replay::classify::{self, QueueKind};
use crate::replay::logline::{self, LineRecord};

/// One replayable message: the raw line it came from, its parsed header
/// fields, the queue it routes to and the pre-encoded wire frame.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub line: String,
    pub record: LineRecord,
    pub queue: QueueKind,
    pub frame: Bytes,
}

/// Ordered sequence of replayable messages.
#[derive(Debug, Default)]
pub struct LineCorpus {
    pub entries: Vec<CorpusEntry>,
}

/// Encode one parsed record into its v3 wire frame.
pub fn encode_record(record: &LineRecord, codec: &dyn PayloadCodec) -> Result<Bytes> {
    let payload = codec.text_to_bytes(&record.payload_text)?;
    let mut header = HeaderV3::new(
        record.customer_id,
        record.client_id,
        record.orch_id,
        record.mtype,
        payload.len() as u32,
    );
    header.version = record.version;
    header.transaction_id = record.tran_id;
    Ok(header.encode_frame(&payload))
}

impl LineCorpus {
    /// Parse, classify and pre-encode a message file. Malformed lines and
    /// unparsable payloads are skipped with a warning; blank lines are
    /// ignored.
    ///
    /// In the patch profile every line is emitted twice and both copies
    /// are pinned to the config queue; the all-in-one profile emits one
    /// classified record per line.
    pub fn build(text: &str, profile: DeployProfile, codec: &dyn PayloadCodec) -> Self {
        let mut entries = Vec::new();
        for (lineno, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            let (record, frame) = match Self::prepare(raw, codec) {
                Ok(prepared) => prepared,
                Err(err) => {
                    warn!(line = lineno + 1, %err, "skipping unreplayable line");
                    continue;
                }
            };
            match profile {
                DeployProfile::AllInOne => {
                    let queue =
                        classify::classify(record.mtype, classify::has_reply_marker(raw));
                    entries.push(CorpusEntry {
                        line: raw.to_string(),
                        record,
                        queue,
                        frame,
                    });
                }
                DeployProfile::Patch => {
                    for _ in 0..2 {
                        entries.push(CorpusEntry {
                            line: raw.to_string(),
                            record: record.clone(),
                            queue: QueueKind::Config,
                            frame: frame.clone(),
                        });
                    }
                }
            }
        }
        Self { entries }
    }

    fn prepare(raw: &str, codec: &dyn PayloadCodec) -> Result<(LineRecord, Bytes)> {
        let record = logline::parse_line(raw)?;
        let frame = encode_record(&record, codec)?;
        Ok((record, frame))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Partition the corpus into `workers` contiguous shards. Sizes differ
    /// by at most one; earlier shards take the extra lines. Each shard
    /// remembers its 1-based absolute starting line for progress logs.
    pub fn partition(self, workers: usize) -> Result<ReplayPlan> {
        if workers == 0 {
            return Err(Error::config("worker count must be at least 1"));
        }
        let base = self.entries.len() / workers;
        let extra = self.entries.len() % workers;
        let mut shards = Vec::with_capacity(workers);
        let mut iter = self.entries.into_iter();
        let mut start_index = 0usize;
        for i in 0..workers {
            let size = base + usize::from(i < extra);
            shards.push(Shard {
                start_line: start_index + 1,
                entries: iter.by_ref().take(size).collect(),
            });
            start_index += size;
        }
        Ok(ReplayPlan { shards })
    }
}

/// One worker's contiguous slice of the corpus.
#[derive(Debug)]
pub struct Shard {
    /// 1-based absolute line number of the first entry.
    pub start_line: usize,
    pub entries: Vec<CorpusEntry>,
}

/// The full partition handed to the runner.
#[derive(Debug)]
pub struct ReplayPlan {
    pub shards: Vec<Shard>,
}
