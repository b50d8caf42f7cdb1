//! Protobuf text bridge.
//!
//! The replay corpus carries payloads in protobuf text format; the wire
//! carries the serialized bytes. The schema itself belongs to the
//! orchestration platform, so the bridge treats it as an oracle: a compiled
//! descriptor set is loaded at startup and the `PayloadType` message is
//! instantiated dynamically. The library is assumed deterministic: the
//! same text always serializes to the same bytes.

use std::path::Path;

use protobuf::descriptor::FileDescriptorSet;
use protobuf::reflect::FileDescriptor;
use protobuf::text_format;
use protobuf::Message;

use crate::error::{Error, Result};

/// Message name resolved inside the descriptor set.
pub const PAYLOAD_MESSAGE_NAME: &str = "PayloadType";

/// Text-format payload to canonical wire bytes.
pub trait PayloadCodec: Send + Sync {
    fn text_to_bytes(&self, text: &str) -> Result<Vec<u8>>;
}

/// Production codec backed by a compiled `FileDescriptorSet`.
pub struct ProtoTextCodec {
    descriptor: protobuf::reflect::MessageDescriptor,
}

impl ProtoTextCodec {
    /// Load a binary descriptor set (`protoc --descriptor_set_out`) and
    /// resolve [`PAYLOAD_MESSAGE_NAME`].
    pub fn from_descriptor_set(blob: &[u8]) -> Result<Self> {
        let fds = FileDescriptorSet::parse_from_bytes(blob)
            .map_err(|e| Error::bad_payload(format!("invalid descriptor set: {e}")))?;
        let files = FileDescriptor::new_dynamic_fds(fds.file, &[])
            .map_err(|e| Error::bad_payload(format!("invalid descriptor set: {e}")))?;
        let descriptor = files
            .iter()
            .find_map(|fd| fd.message_by_package_relative_name(PAYLOAD_MESSAGE_NAME))
            .ok_or_else(|| {
                Error::bad_payload(format!(
                    "message '{PAYLOAD_MESSAGE_NAME}' not found in descriptor set"
                ))
            })?;
        Ok(Self { descriptor })
    }

    /// Load the descriptor set from a file.
    pub fn from_descriptor_file(path: impl AsRef<Path>) -> Result<Self> {
        let blob = std::fs::read(path.as_ref())?;
        Self::from_descriptor_set(&blob)
    }
}

impl PayloadCodec for ProtoTextCodec {
    fn text_to_bytes(&self, text: &str) -> Result<Vec<u8>> {
        let mut msg = self.descriptor.new_instance();
        text_format::merge_from_str(&mut *msg, text)
            .map_err(|e| Error::bad_payload(e.to_string()))?;
        msg.write_to_bytes_dyn()
            .map_err(|e| Error::bad_payload(e.to_string()))
    }
}
