//! Worker pool that drives a replay plan into the queue fabric.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::QueueNames;
use crate::error::Result;
use crate::protocol::payload::PayloadCodec;
use crate::redis::QueuePublisher;
use crate::replay::classify::QueueKind;
use crate::replay::corpus::{self, ReplayPlan, Shard};
use crate::replay::logline;

/// Rate and repetition knobs for one replay run.
#[derive(Debug, Clone, Copy)]
pub struct ReplaySettings {
    /// Repetitions of the shard within one group.
    pub repeated: u32,
    /// Inter-message gap in seconds.
    pub gap_secs: f64,
    /// Gap between groups in seconds.
    pub group_interval_secs: f64,
    /// Number of groups.
    pub total_groups: u32,
}

/// Per-queue delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounters {
    pub config: u64,
    pub stats: u64,
    pub reply: u64,
}

impl QueueCounters {
    fn bump(&mut self, queue: QueueKind) {
        match queue {
            QueueKind::Config => self.config += 1,
            QueueKind::Stats => self.stats += 1,
            QueueKind::Reply => self.reply += 1,
        }
    }

    fn merge(&mut self, other: QueueCounters) {
        self.config += other.config;
        self.stats += other.stats;
        self.reply += other.reply;
    }
}

fn queue_name<'a>(queue: QueueKind, names: &'a QueueNames) -> &'a str {
    match queue {
        QueueKind::Config => &names.config,
        QueueKind::Stats => &names.stats,
        QueueKind::Reply => &names.reply,
    }
}

/// Run every shard of the plan on its own worker task, join them all and
/// return the aggregated delivery counters.
///
/// Workers are isolated: a publish failure is logged and the worker moves
/// on to the next message.
pub async fn run_plan<P>(
    plan: ReplayPlan,
    settings: ReplaySettings,
    publisher: Arc<P>,
    codec: Arc<dyn PayloadCodec>,
    queues: Arc<QueueNames>,
) -> Result<QueueCounters>
where
    P: QueuePublisher + Send + Sync + 'static,
{
    let mut workers = JoinSet::new();
    for (worker_id, shard) in plan.shards.into_iter().enumerate() {
        let publisher = Arc::clone(&publisher);
        let codec = Arc::clone(&codec);
        let queues = Arc::clone(&queues);
        workers.spawn(async move {
            run_shard(worker_id, shard, settings, publisher, codec, queues).await
        });
    }

    let mut totals = QueueCounters::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(counters) => totals.merge(counters),
            Err(err) => warn!(%err, "replay worker panicked"),
        }
    }
    info!(
        config = totals.config,
        stats = totals.stats,
        reply = totals.reply,
        "replay complete"
    );
    Ok(totals)
}

async fn run_shard<P>(
    worker_id: usize,
    shard: Shard,
    settings: ReplaySettings,
    publisher: Arc<P>,
    codec: Arc<dyn PayloadCodec>,
    queues: Arc<QueueNames>,
) -> QueueCounters
where
    P: QueuePublisher + Send + Sync,
{
    let mut counters = QueueCounters::default();
    for group in 0..settings.total_groups {
        for rep in 0..settings.repeated {
            let mut line_num = shard.start_line;
            for entry in &shard.entries {
                let frame = match refreshed_frame(entry, codec.as_ref()) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(worker_id, line_num, %err, "re-encode failed, message skipped");
                        line_num += 1;
                        continue;
                    }
                };
                debug!(
                    worker_id,
                    line_num,
                    client_id = entry.record.client_id,
                    queue = queue_name(entry.queue, &queues),
                    "publishing"
                );
                line_num += 1;
                match publisher
                    .lpush(queue_name(entry.queue, &queues), &frame)
                    .await
                {
                    Ok(_) => counters.bump(entry.queue),
                    Err(err) => {
                        warn!(worker_id, %err, "publish failed, message dropped")
                    }
                }
                if settings.gap_secs > 0.0 || rep + 1 != settings.repeated {
                    tokio::time::sleep(Duration::from_secs_f64(settings.gap_secs)).await;
                }
            }
        }
        if settings.group_interval_secs > 0.0 || group + 1 != settings.total_groups {
            tokio::time::sleep(Duration::from_secs_f64(settings.group_interval_secs)).await;
        }
    }
    info!(
        worker_id,
        config = counters.config,
        stats = counters.stats,
        reply = counters.reply,
        "worker done"
    );
    counters
}

/// Re-encode an entry whose payload carries a timestamp, refreshing it to
/// the current time in microseconds; entries without one reuse the
/// pre-encoded frame.
fn refreshed_frame(
    entry: &corpus::CorpusEntry,
    codec: &dyn PayloadCodec,
) -> Result<bytes::Bytes> {
    let now_us = chrono::Utc::now().timestamp_micros();
    match logline::refresh_timestamp(&entry.line, now_us) {
        Some(refreshed) => {
            let record = logline::parse_line(&refreshed)?;
            corpus::encode_record(&record, codec)
        }
        None => Ok(entry.frame.clone()),
    }
}
