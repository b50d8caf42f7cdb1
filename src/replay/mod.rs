//! Log-to-wire replay engine.
//!
//! A corpus of CommServer debug log lines is parsed back into wire frames,
//! classified onto the logical queues and injected into Redis from a worker
//! pool at a controllable rate.

pub mod classify;
pub mod corpus;
pub mod export;
pub mod logline;
pub mod runner;

pub use classify::QueueKind;
pub use corpus::{CorpusEntry, LineCorpus, ReplayPlan, Shard};
pub use logline::{parse_line, refresh_timestamp, rewrite_ids, IdRewrite, LineRecord};
pub use runner::{run_plan, QueueCounters, ReplaySettings};
