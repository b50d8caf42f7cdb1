//! CommServer wire protocol: framing, checksums and the v2 crypto wrap.

pub mod checksum;
pub mod crypto;
pub mod header;
pub mod payload;
pub mod subscribe;

pub use header::{HeaderV2, HeaderV3, HEADER_V2_LEN, HEADER_V2_LEN_ENC, HEADER_V3_LEN};
pub use payload::{PayloadCodec, ProtoTextCodec};
pub use subscribe::SubscribeSpec;
