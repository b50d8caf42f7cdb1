//! Connection management for the peer testers.
//!
//! A peer speaks either mutually-authenticated TLS (CA to verify the
//! CommServer, client certificate and key to authenticate itself, hostname
//! check disabled) or, with the legacy flag, plain TCP. The connected
//! stream is split into halves so each direction is owned by exactly one
//! task.

use std::io::ErrorKind;
use std::path::PathBuf;

use bytes::{Bytes, BytesMut};
use native_tls::{Certificate, Identity};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::header::{
    self, HeaderV2, HeaderV3, HEADER_V2_LEN_ENC, HEADER_V3_LEN,
};

/// Object-safe alias over the TLS and plain stream types.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

pub type PeerReader = ReadHalf<Box<dyn Io>>;
pub type PeerWriter = WriteHalf<Box<dyn Io>>;

#[derive(Debug, Clone)]
struct TlsFiles {
    ca: PathBuf,
    cert: PathBuf,
    key: PathBuf,
}

/// How to reach the CommServer.
#[derive(Debug, Clone)]
pub struct StreamSpec {
    host: String,
    tls: Option<TlsFiles>,
}

impl StreamSpec {
    /// Mutually-authenticated TLS connection.
    pub fn tls(
        host: impl Into<String>,
        ca: impl Into<PathBuf>,
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            tls: Some(TlsFiles {
                ca: ca.into(),
                cert: cert.into(),
                key: key.into(),
            }),
        }
    }

    /// Legacy plain-TCP connection.
    pub fn plain(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            tls: None,
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.tls.is_none()
    }

    fn split_host(&self) -> Result<(&str, u16)> {
        let (addr, port) = self
            .host
            .rsplit_once(':')
            .ok_or_else(|| Error::config(format!("invalid server address '{}'", self.host)))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| Error::config(format!("invalid server address '{}'", self.host)))?;
        Ok((addr, port))
    }

    /// Connect and split. TLS handshake failures and unreadable key
    /// material surface as `Transport`.
    pub async fn connect(&self) -> Result<(PeerReader, PeerWriter)> {
        let (addr, port) = self.split_host()?;
        let tcp = TcpStream::connect((addr, port)).await?;
        tcp.set_nodelay(true)?;

        let io: Box<dyn Io> = match &self.tls {
            None => {
                debug!(addr, port, "legacy TCP connection up");
                Box::new(tcp)
            }
            Some(files) => {
                let connector = tls_connector(files).await?;
                let stream = connector
                    .connect(addr, tcp)
                    .await
                    .map_err(|e| Error::transport(format!("TLS handshake: {e}")))?;
                debug!(addr, port, "TLS connection up");
                Box::new(stream)
            }
        };
        Ok(tokio::io::split(io))
    }
}

async fn tls_connector(files: &TlsFiles) -> Result<tokio_native_tls::TlsConnector> {
    let ca_pem = tokio::fs::read(&files.ca).await?;
    let cert_pem = tokio::fs::read(&files.cert).await?;
    let key_pem = tokio::fs::read(&files.key).await?;
    let ca = Certificate::from_pem(&ca_pem)
        .map_err(|e| Error::transport(format!("CA certificate: {e}")))?;
    let identity = Identity::from_pkcs8(&cert_pem, &key_pem)
        .map_err(|e| Error::transport(format!("client identity: {e}")))?;
    let connector = native_tls::TlsConnector::builder()
        .add_root_certificate(ca)
        .identity(identity)
        // The CommServer certificates carry deployment ids, not hostnames.
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| Error::transport(format!("TLS context: {e}")))?;
    Ok(tokio_native_tls::TlsConnector::from(connector))
}

/// Close the write side and let the peer see the end of stream.
pub async fn release(mut writer: PeerWriter) -> Result<()> {
    writer.shutdown().await?;
    Ok(())
}

async fn read_exact_frame<R>(reader: &mut R, buf: &mut [u8], at_boundary: bool) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            if at_boundary {
                Err(Error::ConnectionClosed)
            } else {
                Err(Error::bad_frame("short read inside a frame"))
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Read one framed v3 message. Returns the parsed header and the raw wire
/// bytes, header included, for byte-exact echoing.
pub async fn read_msg_v3<R>(reader: &mut R) -> Result<(HeaderV3, Bytes)>
where
    R: AsyncRead + Unpin,
{
    let mut hdata = [0u8; HEADER_V3_LEN];
    read_exact_frame(reader, &mut hdata, true).await?;
    let parsed = HeaderV3::parse(&hdata)?;
    let mut frame = BytesMut::with_capacity(HEADER_V3_LEN + parsed.len as usize);
    frame.extend_from_slice(&hdata);
    if parsed.len > 0 {
        let mut payload = vec![0u8; parsed.len as usize];
        read_exact_frame(reader, &mut payload, false).await?;
        frame.extend_from_slice(&payload);
    }
    Ok((parsed, frame.freeze()))
}

/// Read one framed v2 message, decrypting the payload. Returns the parsed
/// header, the plaintext payload and the raw wire bytes.
pub async fn read_msg_v2<R>(reader: &mut R) -> Result<(HeaderV2, Vec<u8>, Bytes)>
where
    R: AsyncRead + Unpin,
{
    let mut enchdata = [0u8; HEADER_V2_LEN_ENC];
    read_exact_frame(reader, &mut enchdata, true).await?;
    let parsed = HeaderV2::parse(&enchdata)?;
    let mut frame = BytesMut::with_capacity(HEADER_V2_LEN_ENC + parsed.len as usize);
    frame.extend_from_slice(&enchdata);
    let plain = if parsed.len > 0 {
        let mut encpayload = vec![0u8; parsed.len as usize];
        read_exact_frame(reader, &mut encpayload, false).await?;
        frame.extend_from_slice(&encpayload);
        header::decrypt_payload_v2(&encpayload)?
    } else {
        Vec::new()
    };
    Ok((parsed, plain, frame.freeze()))
}
