//! Queue classification for replayed messages.

/// Logical queue a replayed frame lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Config,
    Stats,
    Reply,
}

/// Marker the CommServer logs on reply-class messages.
pub const REPLY_MARKER: &str = "reply message";

/// Classify a message. Total over `(mtype, has_reply_marker)`:
/// types above 600 are stats, types below 200, the login reply (402) and
/// lines the server tagged with the reply marker are replies, everything
/// else is config.
pub fn classify(mtype: u16, has_reply_marker: bool) -> QueueKind {
    if mtype > 600 {
        QueueKind::Stats
    } else if mtype < 200 || mtype == 402 || has_reply_marker {
        QueueKind::Reply
    } else {
        QueueKind::Config
    }
}

/// Whether a raw log line carries the reply marker.
pub fn has_reply_marker(line: &str) -> bool {
    line.contains(REPLY_MARKER)
}
