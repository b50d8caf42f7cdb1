//! CommServer TLS tester: run as a crazy client or an echo orchestrator.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lwcomm_sim::peer::{ClientSpec, CrazyClient, EchoOrch, OrchSpec, PayloadOverride, StreamSpec};
use lwcomm_sim::protocol::subscribe::SubscribeSpec;
use lwcomm_sim::Result;

const DEFAULT_CA_CRT: &str = "ca.crt";
const DEFAULT_ORCH_CRT: &str = "orch.crt";
const DEFAULT_ORCH_KEY: &str = "orch.key";

#[derive(Parser)]
#[command(name = "lwtester", about = "CommServer TLS tester.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the tester as a data-plane client.
    Client(ClientArgs),
    /// Run the tester as an orchestrator.
    Orch(OrchArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// The CommServer addr and port to connect.
    #[arg(value_name = "addr:port")]
    host: String,
    /// The CA certificate to authenticate the CommServer.
    #[arg(long, value_name = "certfile")]
    ca: Option<PathBuf>,
    /// The certificate to authenticate self.
    #[arg(long, value_name = "certfile")]
    cert: Option<PathBuf>,
    /// The private key to authenticate self.
    #[arg(long, value_name = "keyfile")]
    key: Option<PathBuf>,
    /// Use the legacy non-TLS connection.
    #[arg(long)]
    legacy: bool,
}

impl CommonArgs {
    fn stream_spec(&self, default_cert: String, default_key: String) -> StreamSpec {
        if self.legacy {
            StreamSpec::plain(&self.host)
        } else {
            StreamSpec::tls(
                &self.host,
                self.ca.clone().unwrap_or_else(|| DEFAULT_CA_CRT.into()),
                self.cert.clone().unwrap_or_else(|| default_cert.into()),
                self.key.clone().unwrap_or_else(|| default_key.into()),
            )
        }
    }
}

#[derive(Args)]
struct ClientArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// The customer id.
    #[arg(long, value_name = "n")]
    customer_id: u32,
    /// The client id.
    #[arg(long, value_name = "n")]
    client_id: u32,
    /// The message type.
    #[arg(long = "type", default_value_t = 384, value_name = "n")]
    mtype: u16,
    /// The message length.
    #[arg(long, default_value_t = 16384, value_name = "n")]
    len: usize,
    /// The number of messages; -1 means infinite.
    #[arg(long, default_value_t = -1, value_name = "n", allow_hyphen_values = true)]
    count: i64,
    /// The seconds to wait between messages, e.g. 0.01.
    #[arg(long, value_name = "secs")]
    gap: Option<f64>,
    /// Use exact payload bytes from a file.
    #[arg(long, value_name = "path", group = "payload")]
    payload_file: Option<PathBuf>,
    /// Use exact payload bytes from a hex string.
    #[arg(long, value_name = "hex", group = "payload")]
    payload_hex: Option<String>,
    /// Use exact payload text (utf-8).
    #[arg(long, value_name = "text", group = "payload")]
    payload_text: Option<String>,
}

#[derive(Args)]
struct OrchArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// The msgType/customerId/clientId ranges to subscribe for.
    #[arg(long, num_args = 6, value_name = "n", required = true)]
    range: Vec<u32>,
    /// The orchestrator id.
    #[arg(long, default_value_t = 0, value_name = "n")]
    orch_id: u16,
    /// Display messages received.
    #[arg(long)]
    show: bool,
}

async fn run_client(args: ClientArgs) -> Result<()> {
    let stream = args.common.stream_spec(
        format!("client-{}-{}.crt", args.customer_id, args.client_id),
        format!("client-{}-{}.key", args.customer_id, args.client_id),
    );
    let mut spec = ClientSpec::new(args.customer_id, args.client_id)
        .mtype(args.mtype)
        .size(args.len)
        .count(args.count);
    if let Some(gap) = args.gap {
        spec = spec.gap(gap);
    }
    // Priority: file > hex > text (mutually exclusive on the CLI anyway).
    if let Some(path) = args.payload_file {
        spec = spec.payload(PayloadOverride::File(path));
    } else if let Some(raw) = args.payload_hex {
        spec = spec.payload(PayloadOverride::Hex(raw));
    } else if let Some(text) = args.payload_text {
        spec = spec.payload(PayloadOverride::Text(text));
    }
    CrazyClient::new(spec, stream).run().await
}

async fn run_orch(args: OrchArgs) -> Result<()> {
    let stream = args
        .common
        .stream_spec(DEFAULT_ORCH_CRT.into(), DEFAULT_ORCH_KEY.into());
    let ranges: [u32; 6] = args
        .range
        .as_slice()
        .try_into()
        .map_err(|_| lwcomm_sim::Error::config("--range takes exactly 6 values"))?;
    let spec = OrchSpec::new(SubscribeSpec::new(ranges, args.orch_id)).show(args.show);
    EchoOrch::new(spec, stream).run().await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let runner = async {
        match cli.command {
            Command::Client(args) => run_client(args).await,
            Command::Orch(args) => run_orch(args).await,
        }
    };

    let result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
        res = runner => res,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "tester failed");
            ExitCode::FAILURE
        }
    }
}
