//! Master discovery through a Redis Sentinel endpoint.

use tracing::info;

use crate::config::RedisInfo;
use crate::error::{Error, Result};
use crate::redis::resp::Reply;
use crate::redis::RedisConn;

/// Sentinel port of the reference deployment.
pub const SENTINEL_PORT: u16 = 26399;

/// Ask the Sentinel next to `info` for the current master of
/// `master_name` and return the endpoint with the host rewritten to the
/// master's. The configured port, password and db are kept as-is.
pub async fn discover_master(info: &RedisInfo, master_name: &str) -> Result<RedisInfo> {
    let sentinel_addr = format!("{}:{}", info.ip, SENTINEL_PORT);
    let mut conn = RedisConn::open(&sentinel_addr).await?;
    let reply = conn
        .command(&[b"SENTINEL", b"get-master-addr-by-name", master_name.as_bytes()])
        .await?;
    let host = master_host(reply)?;
    let mut discovered = info.clone();
    if host != discovered.ip {
        info!(master = %host, was = %discovered.ip, "sentinel redirected master");
        discovered.ip = host;
    }
    Ok(discovered)
}

fn master_host(reply: Reply) -> Result<String> {
    let items = match reply {
        Reply::Array(Some(items)) if items.len() == 2 => items,
        other => {
            return Err(Error::redis(format!(
                "unexpected sentinel reply {other:?}"
            )))
        }
    };
    match &items[0] {
        Reply::Bulk(Some(host)) => String::from_utf8(host.clone())
            .map_err(|_| Error::redis("sentinel host is not UTF-8")),
        other => Err(Error::redis(format!("unexpected sentinel host {other:?}"))),
    }
}
