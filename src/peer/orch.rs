//! The echo orchestrator: subscribes to a range and replies back exactly
//! what the clients sent.

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::peer::state::{Lifecycle, PeerState};
use crate::peer::stream::{self, PeerReader, PeerWriter, StreamSpec};
use crate::protocol::subscribe::SubscribeSpec;

/// Default capacity of the inbound echo queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Echo orchestrator configuration.
#[derive(Debug, Clone)]
pub struct OrchSpec {
    pub subscribe: SubscribeSpec,
    /// Print a summary of every received message.
    pub show: bool,
    pub queue_capacity: usize,
}

impl OrchSpec {
    pub fn new(subscribe: SubscribeSpec) -> Self {
        Self {
            subscribe,
            show: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }
}

/// An orchestrator peer echoing received frames byte-for-byte.
///
/// Receive and send are decoupled through a bounded FIFO so the receive
/// loop never back-pressures the CommServer: when the queue is full the
/// message is dropped and logged instead. A `None` sentinel shuts the
/// send loop down.
pub struct EchoOrch {
    spec: OrchSpec,
    stream: StreamSpec,
}

impl EchoOrch {
    pub fn new(spec: OrchSpec, stream: StreamSpec) -> Self {
        Self { spec, stream }
    }

    pub async fn run(self) -> Result<()> {
        let mut lifecycle = Lifecycle::new("orch");
        lifecycle.advance(PeerState::Handshaking);
        let (mut reader, mut writer) = match self.stream.connect().await {
            Ok(halves) => halves,
            Err(err) => {
                lifecycle.fail(&err);
                return Err(err);
            }
        };
        lifecycle.advance(PeerState::Subscribing);

        let sub_frame = self.spec.subscribe.encode_frame()?;
        if let Err(err) = write_subscribe(&mut writer, &sub_frame).await {
            lifecycle.fail(&err);
            return Err(err);
        }
        lifecycle.advance(PeerState::Running);
        info!(
            orch_id = self.spec.subscribe.orch_id,
            "subscribed, echoing frames"
        );

        let (tx, rx) = mpsc::channel::<Option<Bytes>>(self.spec.queue_capacity);
        let send_task = tokio::spawn(send_loop(writer, rx));
        let recv_result = recv_loop(&mut reader, tx, self.spec.show).await;
        let send_result = match send_task.await {
            Ok(res) => res,
            Err(err) => Err(Error::transport(format!("send task failed: {err}"))),
        };

        let result = recv_result.and(send_result);
        match &result {
            Ok(()) => lifecycle.advance(PeerState::Closing),
            Err(err) => lifecycle.fail(err),
        }
        lifecycle.advance(PeerState::Closed);
        result
    }
}

async fn write_subscribe(writer: &mut PeerWriter, frame: &[u8]) -> Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Drain the queue back onto the wire verbatim; a sentinel terminates the
/// loop and releases the stream.
async fn send_loop(mut writer: PeerWriter, mut rx: mpsc::Receiver<Option<Bytes>>) -> Result<()> {
    while let Some(item) = rx.recv().await {
        let Some(data) = item else { break };
        writer.write_all(&data).await?;
        writer.flush().await?;
    }
    stream::release(writer).await
}

/// Read framed messages and hand them to the send loop without ever
/// blocking; on EOF or a frame error, push the sentinel and report.
async fn recv_loop(
    reader: &mut PeerReader,
    tx: mpsc::Sender<Option<Bytes>>,
    show: bool,
) -> Result<()> {
    let result = loop {
        match stream::read_msg_v3(reader).await {
            Ok((header, raw)) => {
                if show {
                    info!(
                        customer_id = header.customer_id,
                        client_id = header.client_id,
                        orch_id = header.orch_id,
                        mtype = header.mtype,
                        tran = header.transaction_id,
                        len = header.len,
                        "recv"
                    );
                }
                match tx.try_send(Some(raw)) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("echo queue full, message discarded");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        break Err(Error::transport("send loop gone"));
                    }
                }
            }
            Err(Error::ConnectionClosed) => break Ok(()),
            Err(err) => break Err(err),
        }
    };
    // Wake the send loop even when its queue is full.
    let _ = tx.send(None).await;
    result
}
