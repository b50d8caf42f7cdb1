//! End-to-end replay pipeline: log text in, classified wire frames out on
//! the queue fabric seam.

use std::sync::{Arc, Mutex};

use lwcomm_sim::config::{DeployProfile, QueueNames};
use lwcomm_sim::protocol::header::{HeaderV3, HEADER_V3_LEN};
use lwcomm_sim::redis::QueuePublisher;
use lwcomm_sim::replay::{run_plan, LineCorpus, QueueCounters, ReplaySettings};
use lwcomm_sim::{PayloadCodec, Result};

/// Payload oracle stub: the wire bytes are the text itself.
struct IdentityCodec;

impl PayloadCodec for IdentityCodec {
    fn text_to_bytes(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

#[derive(Default)]
struct RecordingPublisher {
    pushed: Mutex<Vec<(String, Vec<u8>)>>,
}

impl QueuePublisher for RecordingPublisher {
    async fn lpush(&self, queue: &str, frame: &[u8]) -> Result<i64> {
        let mut pushed = self.pushed.lock().unwrap();
        pushed.push((queue.to_string(), frame.to_vec()));
        Ok(pushed.len() as i64)
    }
}

fn log_line(mtype: u16, tran: u32, note: &str) -> String {
    format!(
        "2024-10-28 14:06:47.966 [recv-stat-0] DEBUG Receiver - recv {note}: \
         version=48 orchId=19096 customerId=1909622898 clientId=1 tranId={tran} \
         type={mtype} payload=netId: 0 transactionId: {tran}"
    )
}

fn settings() -> ReplaySettings {
    ReplaySettings {
        repeated: 1,
        gap_secs: 0.0,
        group_interval_secs: 0.0,
        total_groups: 1,
    }
}

#[tokio::test]
async fn test_all_in_one_routing_and_frames() {
    let text = [
        log_line(635, 1, "stat message"),
        log_line(402, 2, "login reply message"),
        log_line(199, 3, "reply message"),
        log_line(200, 4, "config message"),
        log_line(300, 5, "reply message"),
        log_line(601, 6, "stat message"),
    ]
    .join("\n");

    let corpus = LineCorpus::build(&text, DeployProfile::AllInOne, &IdentityCodec);
    assert_eq!(corpus.len(), 6);
    let plan = corpus.partition(2).unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let totals = run_plan(
        plan,
        settings(),
        Arc::clone(&publisher),
        Arc::new(IdentityCodec),
        Arc::new(QueueNames::default()),
    )
    .await
    .unwrap();

    assert_eq!(
        totals,
        QueueCounters {
            config: 1,
            stats: 2,
            reply: 3
        }
    );

    let pushed = publisher.pushed.lock().unwrap();
    let queues_for = |tran: u32| -> Vec<String> {
        pushed
            .iter()
            .filter(|(_, frame)| {
                HeaderV3::parse(&frame[..HEADER_V3_LEN]).unwrap().transaction_id == tran
            })
            .map(|(queue, _)| queue.clone())
            .collect()
    };
    assert_eq!(queues_for(1), ["ServerToOrchSta"]);
    assert_eq!(queues_for(2), ["ServerToOrchReply"]);
    assert_eq!(queues_for(3), ["ServerToOrchReply"]);
    assert_eq!(queues_for(4), ["ServerToOrchCfg"]);
    // Type 300 is config-band but the line carries the reply marker.
    assert_eq!(queues_for(5), ["ServerToOrchReply"]);
    assert_eq!(queues_for(6), ["ServerToOrchSta"]);

    // Every emitted frame verifies and re-parses to its source fields.
    for (_, frame) in pushed.iter() {
        let header = HeaderV3::parse(&frame[..HEADER_V3_LEN]).unwrap();
        assert_eq!(header.customer_id, 1909622898);
        assert_eq!(header.orch_id, 19096);
        assert_eq!(header.len as usize, frame.len() - HEADER_V3_LEN);
    }
}

#[tokio::test]
async fn test_patch_routing_doubles_to_config() {
    let text = [log_line(635, 1, "stat message"), log_line(199, 2, "reply message")].join("\n");
    let corpus = LineCorpus::build(&text, DeployProfile::Patch, &IdentityCodec);
    let plan = corpus.partition(1).unwrap();

    let publisher = Arc::new(RecordingPublisher::default());
    let totals = run_plan(
        plan,
        settings(),
        Arc::clone(&publisher),
        Arc::new(IdentityCodec),
        Arc::new(QueueNames::default()),
    )
    .await
    .unwrap();

    assert_eq!(
        totals,
        QueueCounters {
            config: 4,
            stats: 0,
            reply: 0
        }
    );
    let pushed = publisher.pushed.lock().unwrap();
    assert!(pushed.iter().all(|(queue, _)| queue == "ServerToOrchCfg"));
}

#[tokio::test]
async fn test_reencode_reparse_keeps_the_tuple() {
    let line = log_line(635, 7, "stat message");
    let corpus = LineCorpus::build(&line, DeployProfile::AllInOne, &IdentityCodec);
    let entry = &corpus.entries[0];

    let header = HeaderV3::parse(&entry.frame[..HEADER_V3_LEN]).unwrap();
    assert_eq!(header.version, entry.record.version);
    assert_eq!(header.orch_id, entry.record.orch_id);
    assert_eq!(header.customer_id, entry.record.customer_id);
    assert_eq!(header.client_id, entry.record.client_id);
    assert_eq!(header.transaction_id, entry.record.tran_id);
    assert_eq!(header.mtype, entry.record.mtype);
    assert_eq!(
        &entry.frame[HEADER_V3_LEN..],
        entry.record.payload_text.as_bytes()
    );
}
