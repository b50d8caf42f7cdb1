//! RESP2 wire codec: command serialization and reply parsing.
//!
//! The publisher only speaks the handful of commands the queue fabric
//! needs (AUTH, SELECT, LPUSH, SENTINEL), so the codec covers RESP2 and
//! nothing more.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{Error, Result};

/// A parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Turn an error reply into `Error::Redis`, pass everything else.
    pub fn into_result(self) -> Result<Reply> {
        match self {
            Reply::Error(message) => Err(Error::Redis { message }),
            other => Ok(other),
        }
    }
}

/// Serialize one command as a RESP array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(
        16 + args.iter().map(|a| a.len() + 16).sum::<usize>(),
    );
    buf.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
    buf
}

async fn read_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(Error::ConnectionClosed);
    }
    if !line.ends_with("\r\n") {
        return Err(Error::redis("reply line not CRLF-terminated"));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_int(s: &str) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|_| Error::redis(format!("bad integer reply '{s}'")))
}

/// Read one reply from the stream.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply>
where
    R: AsyncBufRead + Unpin + Send,
{
    let line = read_line(reader).await?;
    let (kind, rest) = line
        .split_at_checked(1)
        .ok_or_else(|| Error::redis("empty reply line"))?;
    match kind {
        "+" => Ok(Reply::Simple(rest.to_string())),
        "-" => Ok(Reply::Error(rest.to_string())),
        ":" => Ok(Reply::Integer(parse_int(rest)?)),
        "$" => {
            let len = parse_int(rest)?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let mut data = vec![0u8; len as usize + 2];
            reader.read_exact(&mut data).await?;
            if &data[len as usize..] != b"\r\n" {
                return Err(Error::redis("bulk reply not CRLF-terminated"));
            }
            data.truncate(len as usize);
            Ok(Reply::Bulk(Some(data)))
        }
        "*" => {
            let len = parse_int(rest)?;
            if len < 0 {
                return Ok(Reply::Array(None));
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(Box::pin(read_reply(reader)).await?);
            }
            Ok(Reply::Array(Some(items)))
        }
        other => Err(Error::redis(format!("unknown reply type '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    async fn parse(raw: &[u8]) -> Result<Reply> {
        let mut reader = BufReader::new(Cursor::new(raw.to_vec()));
        read_reply(&mut reader).await
    }

    #[test]
    fn test_encode_lpush() {
        let cmd = encode_command(&[b"LPUSH", b"ServerToOrchCfg", b"\x30\x00"]);
        assert_eq!(
            &cmd[..],
            b"*3\r\n$5\r\nLPUSH\r\n$15\r\nServerToOrchCfg\r\n$2\r\n\x30\x00\r\n"
        );
    }

    #[tokio::test]
    async fn test_parse_simple_and_integer() {
        assert_eq!(parse(b"+OK\r\n").await.unwrap(), Reply::Simple("OK".into()));
        assert_eq!(parse(b":42\r\n").await.unwrap(), Reply::Integer(42));
    }

    #[tokio::test]
    async fn test_parse_error_reply() {
        let reply = parse(b"-NOAUTH Authentication required.\r\n").await.unwrap();
        assert!(matches!(reply.clone().into_result(), Err(Error::Redis { .. })));
        assert_eq!(
            reply,
            Reply::Error("NOAUTH Authentication required.".into())
        );
    }

    #[tokio::test]
    async fn test_parse_bulk() {
        assert_eq!(
            parse(b"$5\r\nhello\r\n").await.unwrap(),
            Reply::Bulk(Some(b"hello".to_vec()))
        );
        assert_eq!(parse(b"$-1\r\n").await.unwrap(), Reply::Bulk(None));
        assert_eq!(
            parse(b"$0\r\n\r\n").await.unwrap(),
            Reply::Bulk(Some(Vec::new()))
        );
    }

    #[tokio::test]
    async fn test_parse_master_addr_array() {
        let reply = parse(b"*2\r\n$10\r\n10.30.68.2\r\n$4\r\n6380\r\n")
            .await
            .unwrap();
        assert_eq!(
            reply,
            Reply::Array(Some(vec![
                Reply::Bulk(Some(b"10.30.68.2".to_vec())),
                Reply::Bulk(Some(b"6380".to_vec())),
            ]))
        );
    }

    #[tokio::test]
    async fn test_parse_truncated_input() {
        assert!(parse(b"$5\r\nhel").await.is_err());
        assert!(parse(b"").await.is_err());
    }
}
