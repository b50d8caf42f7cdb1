//! Redis queue publisher: a minimal async client and a shared connection
//! pool sized by demand, one connection per inflight operation.

pub mod resp;
pub mod sentinel;

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::RedisInfo;
use crate::error::{Error, Result};
use crate::redis::resp::Reply;

/// Destination queue contract of the replay fabric.
pub trait QueuePublisher {
    /// Atomic single-item left-push.
    fn lpush(&self, queue: &str, frame: &[u8]) -> impl Future<Output = Result<i64>> + Send;
}

/// One client connection.
pub struct RedisConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RedisConn {
    /// Open a raw connection with no handshake. Sentinel endpoints are
    /// queried this way.
    pub async fn open(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Open a connection and run the AUTH/SELECT handshake from the
    /// endpoint info.
    pub async fn connect(info: &RedisInfo) -> Result<Self> {
        let mut conn = Self::open(&info.addr()).await?;
        if !info.password.is_empty() {
            conn.command(&[b"AUTH", info.password.as_bytes()]).await?;
        }
        if info.db != 0 {
            conn.command(&[b"SELECT", info.db.to_string().as_bytes()])
                .await?;
        }
        debug!(addr = %info.addr(), "redis connection ready");
        Ok(conn)
    }

    /// Send one command and read its reply; error replies become
    /// `Error::Redis`.
    pub async fn command(&mut self, args: &[&[u8]]) -> Result<Reply> {
        let buf = resp::encode_command(args);
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;
        resp::read_reply(&mut self.reader).await?.into_result()
    }

    /// `LPUSH queue frame`, returning the new list length.
    pub async fn lpush(&mut self, queue: &str, frame: &[u8]) -> Result<i64> {
        match self.command(&[b"LPUSH", queue.as_bytes(), frame]).await? {
            Reply::Integer(n) => Ok(n),
            other => Err(Error::redis(format!("unexpected LPUSH reply {other:?}"))),
        }
    }
}

/// Shared checkout/checkin pool over one endpoint. Cheap to clone via
/// `Arc`; a connection that errors is dropped instead of returned.
pub struct RedisPool {
    info: RedisInfo,
    idle: tokio::sync::Mutex<Vec<RedisConn>>,
}

impl RedisPool {
    pub fn new(info: RedisInfo) -> Arc<Self> {
        Arc::new(Self {
            info,
            idle: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    async fn acquire(&self) -> Result<RedisConn> {
        if let Some(conn) = self.idle.lock().await.pop() {
            return Ok(conn);
        }
        RedisConn::connect(&self.info).await
    }

    async fn release(&self, conn: RedisConn) {
        self.idle.lock().await.push(conn);
    }
}

impl QueuePublisher for RedisPool {
    async fn lpush(&self, queue: &str, frame: &[u8]) -> Result<i64> {
        let mut conn = self.acquire().await?;
        match conn.lpush(queue, frame).await {
            Ok(n) => {
                self.release(conn).await;
                Ok(n)
            }
            // Connection state is unknown after a failure; drop it.
            Err(err) => Err(err),
        }
    }
}
