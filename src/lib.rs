//! Traffic simulator and protocol conformance tester for the CommServer
//! message bus.
//!
//! Two cores share the frame codec in [`protocol`]:
//!
//! - [`replay`] parses CommServer debug log lines, reconstructs the binary
//!   wire frames and injects them into the Redis queue fabric from a worker
//!   pool ([`redis`] owns the connection pool).
//! - [`peer`] is an asynchronous TCP/TLS peer speaking both wire dialects,
//!   either blasting messages as a client or echoing them back as a
//!   subscribed orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use lwcomm_sim::peer::{ClientSpec, CrazyClient, StreamSpec};
//!
//! #[tokio::main]
//! async fn main() -> lwcomm_sim::Result<()> {
//!     let stream = StreamSpec::tls("commserver:9399", "ca.crt", "client-7-1.crt", "client-7-1.key");
//!     let spec = ClientSpec::new(7, 1).count(100).size(4096);
//!     CrazyClient::new(spec, stream).run().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod peer;
pub mod protocol;
pub mod redis;
pub mod replay;

// Re-export main types
pub use config::{DeployProfile, QueueNames, RedisInfo};
pub use error::{Error, Result};
pub use protocol::header::{HeaderV2, HeaderV3, MSGV2_MAGIC, MSGV3_VERSION};
pub use protocol::payload::{PayloadCodec, ProtoTextCodec};
