//! The crazy client: keeps sending messages nonstop.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::peer::state::{Lifecycle, PeerState};
use crate::peer::stream::{self, PeerReader, PeerWriter, StreamSpec};
use crate::protocol::header::{HeaderV2, HeaderV3};

/// Explicit payload instead of the synthetic sequence.
#[derive(Debug, Clone)]
pub enum PayloadOverride {
    File(PathBuf),
    Hex(String),
    Text(String),
}

/// Crazy client configuration.
#[derive(Debug, Clone)]
pub struct ClientSpec {
    pub customer_id: u32,
    pub client_id: u32,
    pub mtype: u16,
    pub size: usize,
    /// Number of messages; negative means infinite.
    pub count: i64,
    pub start_transaction: u32,
    pub gap_secs: Option<f64>,
    pub payload: Option<PayloadOverride>,
}

impl ClientSpec {
    pub fn new(customer_id: u32, client_id: u32) -> Self {
        Self {
            customer_id,
            client_id,
            mtype: 384,
            size: 16384,
            count: -1,
            start_transaction: 0,
            gap_secs: None,
            payload: None,
        }
    }

    pub fn mtype(mut self, mtype: u16) -> Self {
        self.mtype = mtype;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn gap(mut self, secs: f64) -> Self {
        self.gap_secs = Some(secs);
        self
    }

    pub fn start_transaction(mut self, tran: u32) -> Self {
        self.start_transaction = tran;
        self
    }

    pub fn payload(mut self, payload: PayloadOverride) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A client peer blasting frames at the CommServer.
pub struct CrazyClient {
    spec: ClientSpec,
    stream: StreamSpec,
}

impl CrazyClient {
    pub fn new(spec: ClientSpec, stream: StreamSpec) -> Self {
        Self { spec, stream }
    }

    /// Connect and run send/recv until `count` messages went out. The
    /// recv side only drains the socket so the CommServer never stalls on
    /// its replies; it has no termination condition of its own and is
    /// cancelled once send completes.
    pub async fn run(self) -> Result<()> {
        let legacy = self.stream.is_legacy();
        if legacy && self.spec.client_id > u16::MAX as u32 {
            return Err(Error::config(
                "client id does not fit the legacy dialect header",
            ));
        }

        let mut lifecycle = Lifecycle::new("client");
        lifecycle.advance(PeerState::Handshaking);
        let (mut reader, mut writer) = match self.stream.connect().await {
            Ok(halves) => halves,
            Err(err) => {
                lifecycle.fail(&err);
                return Err(err);
            }
        };
        lifecycle.advance(PeerState::Ready);

        if self.spec.count == 0 {
            lifecycle.advance(PeerState::Closing);
            stream::release(writer).await?;
            lifecycle.advance(PeerState::Closed);
            return Ok(());
        }

        let payload = resolve_payload(&self.spec.payload).await?;
        lifecycle.advance(PeerState::Running);

        let result = tokio::select! {
            res = send_loop(&mut writer, &self.spec, payload, legacy) => res,
            res = recv_loop(&mut reader, legacy) => res,
        };

        match &result {
            Ok(()) => {
                lifecycle.advance(PeerState::Closing);
                stream::release(writer).await?;
            }
            Err(err) => {
                lifecycle.fail(err);
                // The session error is the one worth reporting.
                let _ = stream::release(writer).await;
            }
        }
        lifecycle.advance(PeerState::Closed);
        result
    }
}

async fn resolve_payload(payload: &Option<PayloadOverride>) -> Result<Option<Bytes>> {
    Ok(match payload {
        None => None,
        Some(PayloadOverride::File(path)) => Some(tokio::fs::read(path).await?.into()),
        Some(PayloadOverride::Hex(raw)) => {
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            Some(
                hex::decode(&compact)
                    .map_err(|e| Error::config(format!("invalid payload hex: {e}")))?
                    .into(),
            )
        }
        Some(PayloadOverride::Text(text)) => Some(Bytes::copy_from_slice(text.as_bytes())),
    })
}

/// Synthetic payload: byte `n` is `(start + n * step) mod 256`.
fn synth_payload(size: usize, start: u32, step: u32) -> Bytes {
    let start = start as u64;
    let step = (step & 0xff) as u64;
    (0..size as u64)
        .map(|n| ((start + n * step) & 0xff) as u8)
        .collect::<Vec<u8>>()
        .into()
}

async fn send_loop(
    writer: &mut PeerWriter,
    spec: &ClientSpec,
    payload: Option<Bytes>,
    legacy: bool,
) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut transaction = spec.start_transaction;
    let mut sent: i64 = 0;
    while spec.count < 0 || sent < spec.count {
        let tran = transaction;
        transaction = transaction.wrapping_add(1);
        let data = match &payload {
            Some(bytes) => bytes.clone(),
            None => synth_payload(spec.size, spec.start_transaction, transaction),
        };
        let frame = if legacy {
            let mut header = HeaderV2::new(
                spec.customer_id,
                spec.client_id as u16,
                0,
                spec.mtype,
                0,
            );
            header.transaction_id = tran;
            header.encode_frame(&data)
        } else {
            let mut header =
                HeaderV3::new(spec.customer_id, spec.client_id, 0, spec.mtype, 0);
            header.transaction_id = tran;
            header.encode_frame(&data)
        };
        writer.write_all(&frame).await?;
        if let Some(gap) = spec.gap_secs {
            tokio::time::sleep(Duration::from_secs_f64(gap)).await;
        }
        writer.flush().await?;
        sent += 1;
        debug!(tran, sent, "frame sent");
    }
    info!(sent, "send loop finished");
    Ok(())
}

async fn recv_loop(reader: &mut PeerReader, legacy: bool) -> Result<()> {
    loop {
        if legacy {
            stream::read_msg_v2(reader).await?;
        } else {
            stream::read_msg_v3(reader).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synth_payload_sequence() {
        let payload = synth_payload(8, 0, 3);
        assert_eq!(&payload[..], &[0, 3, 6, 9, 12, 15, 18, 21]);
    }

    #[test]
    fn test_synth_payload_wraps_mod_256() {
        let payload = synth_payload(4, 250, 0x1_0003);
        assert_eq!(&payload[..], &[250, 253, 0, 3]);
    }

    #[test]
    fn test_synth_payload_zero_step_repeats_start() {
        let payload = synth_payload(3, 7, 0x100);
        assert_eq!(&payload[..], &[7, 7, 7]);
    }

    #[tokio::test]
    async fn test_resolve_payload_hex_strips_whitespace() {
        let payload = resolve_payload(&Some(PayloadOverride::Hex(
            "30 00\n0a\t0b".to_string(),
        )))
        .await
        .unwrap()
        .unwrap();
        assert_eq!(&payload[..], &[0x30, 0x00, 0x0a, 0x0b]);
    }

    #[tokio::test]
    async fn test_resolve_payload_bad_hex() {
        let result = resolve_payload(&Some(PayloadOverride::Hex("zz".to_string()))).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_resolve_payload_text() {
        let payload = resolve_payload(&Some(PayloadOverride::Text("abc".to_string())))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&payload[..], b"abc");
    }
}
