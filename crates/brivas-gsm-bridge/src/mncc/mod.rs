//! MNCC interface towards the GSM stack
//!
//! Message model, wire codec, the outbound queue and the connection
//! manager owning the control socket.

pub mod codec;
pub mod link;
pub mod messages;
pub mod queue;

pub use codec::{decode_framed, decode_message, encode_framed, encode_message, split_record};
pub use link::MnccLink;
pub use messages::{CallControl, DataFrame, MessageType, MnccMessage};
pub use queue::{FlushStatus, MnccQueue, PacketSink};

use tracing::debug;

/// Direction of a traced message relative to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToStack,
    FromStack,
}

/// Trace one MNCC message with its decoded field groups
pub fn trace_message(label: &str, direction: Direction, msg: &MnccMessage) {
    let arrow = match direction {
        Direction::ToStack => "->",
        Direction::FromStack => "<-",
    };
    let MnccMessage::Control(m) = msg else {
        tracing::trace!(link = label, callref = msg.callref(), "{} {}", arrow, msg.msg_type());
        return;
    };
    debug!(
        link = label,
        callref = m.callref,
        cause = ?m.cause.map(|c| (c.coding, c.location, c.value)),
        progress = ?m.progress.map(|p| (p.coding, p.location, p.descr)),
        calling = m.calling.as_ref().map(|n| n.number.as_str()),
        called = m.called.as_ref().map(|n| n.number.as_str()),
        connected = m.connected.as_ref().map(|n| n.number.as_str()),
        notify = m.notify,
        "{} {}",
        arrow,
        m.msg_type
    );
}
