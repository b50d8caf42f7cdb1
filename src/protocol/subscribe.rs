//! Subscription frame composed by an orchestrator on connect.
//!
//! The payload is a NUL-terminated JSON filter describing which message
//! type / customer / client ranges the orchestrator wants to receive.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::protocol::header::HeaderV3;

const DEFAULT_QUEUE_SIZE: u32 = 1024;
const DEFAULT_QUEUE_BYTES: u32 = 16_777_216;

#[derive(Debug, Clone, Copy, Serialize)]
struct Criterion {
    field: &'static str,
    from: u32,
    to: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeBody {
    queue_size: u32,
    queue_bytes: u32,
    criteria: [Criterion; 3],
}

/// Ranges and identity for one subscription.
#[derive(Debug, Clone, Copy)]
pub struct SubscribeSpec {
    pub msg_type: (u32, u32),
    pub customer_id: (u32, u32),
    pub client_id: (u32, u32),
    pub orch_id: u16,
    /// Message type of the subscribe frame itself; the control plane
    /// assigns it, the reference deployment uses 0.
    pub frame_type: u16,
}

impl SubscribeSpec {
    pub fn new(ranges: [u32; 6], orch_id: u16) -> Self {
        Self {
            msg_type: (ranges[0], ranges[1]),
            customer_id: (ranges[2], ranges[3]),
            client_id: (ranges[4], ranges[5]),
            orch_id,
            frame_type: 0,
        }
    }

    /// Serialize the JSON filter body, NUL terminator included.
    pub fn body(&self) -> Result<Vec<u8>> {
        let body = SubscribeBody {
            queue_size: DEFAULT_QUEUE_SIZE,
            queue_bytes: DEFAULT_QUEUE_BYTES,
            criteria: [
                Criterion {
                    field: "msgType",
                    from: self.msg_type.0,
                    to: self.msg_type.1,
                },
                Criterion {
                    field: "customerId",
                    from: self.customer_id.0,
                    to: self.customer_id.1,
                },
                Criterion {
                    field: "clientId",
                    from: self.client_id.0,
                    to: self.client_id.1,
                },
            ],
        };
        let mut bytes = serde_json::to_vec(&body)
            .map_err(|e| Error::config(format!("subscribe body: {e}")))?;
        bytes.push(0);
        Ok(bytes)
    }

    /// Build the complete v3 subscribe frame; `Len` counts the NUL.
    pub fn encode_frame(&self) -> Result<Bytes> {
        let body = self.body()?;
        let header = HeaderV3::new(0, 0, self.orch_id, self.frame_type, 0);
        Ok(header.encode_frame(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::{HeaderV3, HEADER_V3_LEN};

    #[test]
    fn test_body_shape() {
        let spec = SubscribeSpec::new([384, 640, 1, 100, 1, 32], 7);
        let body = spec.body().unwrap();
        assert_eq!(*body.last().unwrap(), 0);
        let json: serde_json::Value = serde_json::from_slice(&body[..body.len() - 1]).unwrap();
        assert_eq!(json["queueSize"], 1024);
        assert_eq!(json["queueBytes"], 16777216);
        assert_eq!(json["criteria"][0]["field"], "msgType");
        assert_eq!(json["criteria"][0]["from"], 384);
        assert_eq!(json["criteria"][0]["to"], 640);
        assert_eq!(json["criteria"][1]["field"], "customerId");
        assert_eq!(json["criteria"][2]["field"], "clientId");
    }

    #[test]
    fn test_frame_len_counts_nul() {
        let spec = SubscribeSpec::new([0, 65535, 0, 4294967295, 0, 4294967295], 19096);
        let frame = spec.encode_frame().unwrap();
        let header = HeaderV3::parse(&frame[..HEADER_V3_LEN]).unwrap();
        assert_eq!(header.orch_id, 19096);
        assert_eq!(header.mtype, 0);
        assert_eq!(header.len as usize, frame.len() - HEADER_V3_LEN);
        assert_eq!(frame[frame.len() - 1], 0);
    }
}
