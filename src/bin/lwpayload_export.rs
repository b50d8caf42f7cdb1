//! Export the protobuf payload bytes of a log line into a .bin file.
//!
//! Only the payload bytes are written, not the CommServer header.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lwcomm_sim::replay::export::export_payload;
use lwcomm_sim::{Error, ProtoTextCodec};

#[derive(Parser)]
#[command(name = "lwpayload-export", about = "Export a log line's payload bytes.")]
struct Cli {
    /// File holding a single replayable log line.
    input: PathBuf,
    /// Destination for the raw payload bytes.
    output: PathBuf,
    /// Compiled protobuf descriptor set carrying the payload schema.
    #[arg(long, value_name = "path", default_value = "lightwan_msg.desc")]
    descriptor: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = async {
        let codec = ProtoTextCodec::from_descriptor_file(&cli.descriptor)?;
        export_payload(&cli.input, &cli.output, &codec).await
    }
    .await;

    match result {
        Ok(written) => {
            println!("OK: wrote {} bytes to {}", written, cli.output.display());
            ExitCode::SUCCESS
        }
        Err(err @ Error::Config { .. }) => {
            eprintln!("ERROR: {err}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}
