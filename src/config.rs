//! Configuration records shared by the replay and peer cores.

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Logical queue names on the Redis side of the CommServer.
///
/// The `_SM` variants are reserved for the secure-crypto mode and are not
/// produced by the classifier.
#[derive(Debug, Clone)]
pub struct QueueNames {
    pub config: String,
    pub stats: String,
    pub reply: String,
    pub config_sm: String,
    pub stats_sm: String,
}

impl Default for QueueNames {
    fn default() -> Self {
        Self {
            config: "ServerToOrchCfg".into(),
            stats: "ServerToOrchSta".into(),
            reply: "ServerToOrchReply".into(),
            config_sm: "ServerToOrchCfg_SM".into(),
            stats_sm: "ServerToOrchSta_SM".into(),
        }
    }
}

/// Redis endpoint info as passed on the replay command line.
///
/// The upstream jenkins jobs quote every field, so `port` and `db` accept
/// both JSON numbers and numeric strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisInfo {
    pub ip: String,
    #[serde(deserialize_with = "de_str_or_num")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    #[serde(default, deserialize_with = "de_str_or_num")]
    pub db: i64,
}

impl RedisInfo {
    /// Parse the `redis_info` CLI argument. Strict JSON only.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::config(format!("invalid redis_info: {e}")))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn de_str_or_num<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + TryFrom<i64>,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Num(i64),
        Str(String),
    }

    match StrOrNum::deserialize(deserializer)? {
        StrOrNum::Num(n) => T::try_from(n).map_err(|_| de::Error::custom("value out of range")),
        StrOrNum::Str(s) => s.parse::<T>().map_err(de::Error::custom),
    }
}

/// Server deployment profile; changes replay-side queue routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployProfile {
    /// One record per parsed line, routed by the classifier.
    AllInOne,
    /// Two records per parsed line, both pinned to the config queue.
    Patch,
}

impl DeployProfile {
    /// The `orch_deploy` CLI string selects all-in-one when it contains
    /// the literal `allInOne`.
    pub fn from_deploy_str(s: &str) -> Self {
        if s.contains("allInOne") {
            Self::AllInOne
        } else {
            Self::Patch
        }
    }
}
