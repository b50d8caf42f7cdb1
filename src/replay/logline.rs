//! Parser for CommServer debug log lines.
//!
//! A replayable line carries its header fields as `key=value` pairs and the
//! payload in protobuf text format:
//!
//! ```text
//! ... version=48 orchId=19096 customerId=1909622898 clientId=1 tranId=365869 type=635 payload=netId: 0 ...
//! ```
//!
//! Fields are located by literal marker search; integer values run to the
//! next space, the payload runs to the end of the line.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{Error, Result};

const MARKER_VERSION: &str = "version=";
const MARKER_ORCH_ID: &str = "orchId=";
const MARKER_CUSTOMER_ID: &str = "customerId=";
const MARKER_CLIENT_ID: &str = "clientId=";
const MARKER_TRAN_ID: &str = "tranId=";
const MARKER_TYPE: &str = "type=";
const MARKER_PAYLOAD: &str = "payload=";

const TIMESTAMP_MARKER: &str = "timestamp: ";

/// One parsed log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub version: u8,
    pub orch_id: u16,
    pub customer_id: u32,
    pub client_id: u32,
    pub tran_id: u32,
    pub mtype: u16,
    pub payload_text: String,
}

fn field_after<'a>(line: &'a str, marker: &'static str) -> Result<&'a str> {
    let start = line
        .find(marker)
        .ok_or(Error::MalformedLine { marker })?
        + marker.len();
    let rest = &line[start..];
    Ok(match rest.find(' ') {
        Some(end) => &rest[..end],
        None => rest,
    })
}

fn int_field<T>(line: &str, marker: &'static str) -> Result<T>
where
    T: FromStr,
{
    field_after(line, marker)?
        .parse::<T>()
        .map_err(|_| Error::MalformedField { marker })
}

/// Extract the (version, orchId, customerId, clientId, tranId, type,
/// payload) tuple from one log line.
pub fn parse_line(line: &str) -> Result<LineRecord> {
    let payload_start = line
        .find(MARKER_PAYLOAD)
        .ok_or(Error::MalformedLine {
            marker: MARKER_PAYLOAD,
        })?
        + MARKER_PAYLOAD.len();

    Ok(LineRecord {
        version: int_field(line, MARKER_VERSION)?,
        orch_id: int_field(line, MARKER_ORCH_ID)?,
        customer_id: int_field(line, MARKER_CUSTOMER_ID)?,
        client_id: int_field(line, MARKER_CLIENT_ID)?,
        tran_id: int_field(line, MARKER_TRAN_ID)?,
        mtype: int_field(line, MARKER_TYPE)?,
        payload_text: line[payload_start..].to_string(),
    })
}

/// Replace every occurrence of the first-seen `timestamp: <n>` value with
/// `now_us`. Returns `None` when the line carries no timestamp.
pub fn refresh_timestamp(line: &str, now_us: i64) -> Option<String> {
    let start = line.find(TIMESTAMP_MARKER)? + TIMESTAMP_MARKER.len();
    let digits_len = line[start..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits_len == 0 {
        return None;
    }
    let old = format!("{}{}", TIMESTAMP_MARKER, &line[start..start + digits_len]);
    let new = format!("{}{}", TIMESTAMP_MARKER, now_us);
    Some(line.replace(&old, &new))
}

/// Identity fields to substitute with [`rewrite_ids`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdRewrite {
    pub orch_id: Option<u64>,
    pub customer_id: Option<u64>,
    pub client_id: Option<u64>,
}

/// Substitute `orchId=`/`customerId=`/`clientId=` values in place. Only
/// word-boundary `field=<digits>` occurrences are touched; every other
/// byte of the line is preserved.
pub fn rewrite_ids(line: &str, ids: &IdRewrite) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"\b(orchId|customerId|clientId)=(\d+)").unwrap());
    re.replace_all(line, |caps: &Captures| {
        let replacement = match &caps[1] {
            "orchId" => ids.orch_id,
            "customerId" => ids.customer_id,
            _ => ids.client_id,
        };
        match replacement {
            Some(v) => format!("{}={}", &caps[1], v),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "2024-10-28 14:06:47.966 [recv-stat-0] DEBUG StatsMessageReceiver - recv stat message: version=48 orchId=19096 customerId=1909622898 clientId=1 tranId=365869 type=635 payload=netId: 0 transactionId: 365869 msgBase { statsReportV2 { timestamp: 1730095607949439 } }";

    #[test]
    fn test_parse_line() {
        let rec = parse_line(SAMPLE).unwrap();
        assert_eq!(rec.version, 48);
        assert_eq!(rec.orch_id, 19096);
        assert_eq!(rec.customer_id, 1909622898);
        assert_eq!(rec.client_id, 1);
        assert_eq!(rec.tran_id, 365869);
        assert_eq!(rec.mtype, 635);
        assert!(rec.payload_text.starts_with("netId: 0"));
        assert!(rec.payload_text.ends_with("} }"));
    }

    #[test]
    fn test_parse_line_missing_marker() {
        let line = SAMPLE.replace("tranId=", "trnId=");
        assert!(matches!(
            parse_line(&line),
            Err(Error::MalformedLine { marker: "tranId=" })
        ));
    }

    #[test]
    fn test_parse_line_bad_integer() {
        let line = SAMPLE.replace("clientId=1", "clientId=one");
        assert!(matches!(
            parse_line(&line),
            Err(Error::MalformedField { marker: "clientId=" })
        ));
    }

    #[test]
    fn test_refresh_timestamp_replaces_all_occurrences() {
        let line = "payload=a { timestamp: 1730095607949439 } b { timestamp: 1730095607949439 } c { timestamp: 99 }";
        let out = refresh_timestamp(line, 1_800_000_000_000_000).unwrap();
        assert_eq!(out.matches("timestamp: 1800000000000000").count(), 2);
        // A different value is not the first-seen one and stays put.
        assert!(out.contains("timestamp: 99"));
    }

    #[test]
    fn test_refresh_timestamp_absent() {
        assert!(refresh_timestamp("payload=netId: 0", 1).is_none());
    }

    #[test]
    fn test_rewrite_ids_only_named_fields() {
        let ids = IdRewrite {
            orch_id: Some(7),
            customer_id: Some(42),
            client_id: Some(3),
        };
        let out = rewrite_ids(SAMPLE, &ids);
        assert!(out.contains("orchId=7 "));
        assert!(out.contains("customerId=42 "));
        assert!(out.contains("clientId=3 "));
        // Everything else is untouched, including tranId and the payload.
        assert!(out.contains("tranId=365869"));
        assert!(out.contains("transactionId: 365869"));
        assert!(out.contains("timestamp: 1730095607949439"));
    }

    #[test]
    fn test_rewrite_ids_partial() {
        let ids = IdRewrite {
            customer_id: Some(5),
            ..Default::default()
        };
        let out = rewrite_ids(SAMPLE, &ids);
        assert!(out.contains("customerId=5 "));
        assert!(out.contains("orchId=19096"));
        assert!(out.contains("clientId=1 "));
    }

    #[test]
    fn test_rewrite_then_parse() {
        let ids = IdRewrite {
            orch_id: Some(1),
            customer_id: Some(2),
            client_id: Some(3),
        };
        let rec = parse_line(&rewrite_ids(SAMPLE, &ids)).unwrap();
        assert_eq!(rec.orch_id, 1);
        assert_eq!(rec.customer_id, 2);
        assert_eq!(rec.client_id, 3);
        assert_eq!(rec.tran_id, 365869);
    }
}
