//! TLS protocol peers: the crazy client and the echo orchestrator.

pub mod client;
pub mod orch;
pub mod state;
pub mod stream;

pub use client::{ClientSpec, CrazyClient, PayloadOverride};
pub use orch::{EchoOrch, OrchSpec};
pub use state::{Lifecycle, PeerState};
pub use stream::{read_msg_v2, read_msg_v3, PeerReader, PeerWriter, StreamSpec};
