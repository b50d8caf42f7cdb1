//! Log-to-wire replay runner: parse a message template file and inject the
//! frames into the Redis queue fabric from a worker pool.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lwcomm_sim::config::{DeployProfile, QueueNames, RedisInfo};
use lwcomm_sim::redis::{sentinel, RedisPool};
use lwcomm_sim::replay::{run_plan, LineCorpus, ReplaySettings};
use lwcomm_sim::{Error, ProtoTextCodec, Result};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Requirement {
    Correctly,
    Quickly,
}

#[derive(Parser)]
#[command(name = "lwreplay", about = "CommServer message replay runner.")]
struct Cli {
    /// Repetitions of each message.
    repeated: u32,
    /// Seconds between messages.
    speed: f64,
    /// Redis endpoint as JSON, e.g. {"ip":"10.0.0.1","port":"6380","password":"...","db":"0"}.
    redis_info: String,
    /// Message template file.
    message_file: PathBuf,
    /// Number of workers.
    threads: usize,
    /// Seconds between message groups.
    group_message_intervals: f64,
    /// Total number of message groups.
    total_group_message: u32,
    /// Delivery requirement of the run.
    #[arg(value_enum)]
    requirement: Requirement,
    /// Deployment descriptor; a value containing `allInOne` selects
    /// all-in-one routing, anything else the patch routing.
    orch_deploy: String,
    /// Compiled protobuf descriptor set carrying the payload schema.
    #[arg(long, value_name = "path", default_value = "lightwan_msg.desc")]
    descriptor: PathBuf,
    /// Discover the current master of this Sentinel group first.
    #[arg(long, value_name = "name")]
    sentinel_master: Option<String>,
}

async fn run(cli: Cli) -> Result<()> {
    let mut redis_info = RedisInfo::parse(&cli.redis_info)?;
    if let Some(master) = &cli.sentinel_master {
        redis_info = sentinel::discover_master(&redis_info, master).await?;
    }

    let codec = Arc::new(ProtoTextCodec::from_descriptor_file(&cli.descriptor)?);
    let text = tokio::fs::read_to_string(&cli.message_file).await?;
    let profile = DeployProfile::from_deploy_str(&cli.orch_deploy);
    let corpus = LineCorpus::build(&text, profile, codec.as_ref());
    info!(
        lines = corpus.len(),
        workers = cli.threads,
        profile = ?profile,
        requirement = ?cli.requirement,
        "corpus ready"
    );
    let plan = corpus.partition(cli.threads)?;

    let settings = ReplaySettings {
        repeated: cli.repeated,
        gap_secs: cli.speed,
        group_interval_secs: cli.group_message_intervals,
        total_groups: cli.total_group_message,
    };
    let pool = RedisPool::new(redis_info);
    let totals = run_plan(plan, settings, pool, codec, Arc::new(QueueNames::default())).await?;
    info!(
        config = totals.config,
        stats = totals.stats,
        reply = totals.reply,
        "all workers joined"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
        res = run(cli) => res,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err @ Error::Config { .. }) => {
            error!(%err, "bad arguments");
            ExitCode::from(2)
        }
        Err(err) => {
            error!(%err, "replay failed");
            ExitCode::FAILURE
        }
    }
}
