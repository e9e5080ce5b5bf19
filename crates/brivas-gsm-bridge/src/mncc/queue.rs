//! Outbound MNCC message queue
//!
//! FIFO of encoded records waiting for the control channel. The stream
//! socket may accept part of a record; the remainder goes out first on the
//! next write and the entry leaves the queue once all of it was written.

use super::codec::encode_framed;
use super::messages::MnccMessage;
use crate::errors::TransportError;
use bytes::Bytes;
use metrics::counter;
use std::collections::VecDeque;
use std::io;
use tracing::trace;

/// Non-blocking byte sink the queue drains into
pub trait PacketSink {
    /// Attempt one write; `WouldBlock` means try again on writability
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl PacketSink for tokio::net::UnixStream {
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        tokio::net::UnixStream::try_write(self, buf)
    }
}

/// Result of a flush that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// Queue is empty, write interest dropped
    Drained,
    /// Socket not writable, entries remain
    Blocked,
}

/// Outbound message queue
#[derive(Debug, Default)]
pub struct MnccQueue {
    entries: VecDeque<Bytes>,
    /// Bytes of the head entry already written
    head_written: usize,
    write_interest: bool,
}

impl MnccQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the tail
    pub fn enqueue(&mut self, msg: &MnccMessage) -> Result<(), TransportError> {
        let record = encode_framed(msg).freeze();
        self.entries
            .try_reserve(1)
            .map_err(|_| TransportError::QueueExhausted(record.len()))?;
        if self.entries.is_empty() {
            self.write_interest = true;
        }
        trace!(
            msg_type = %msg.msg_type(),
            callref = msg.callref(),
            queued = self.entries.len() + 1,
            "Enqueued MNCC message"
        );
        self.entries.push_back(record);
        Ok(())
    }

    /// Write queued entries in order until drained or the sink blocks
    pub fn flush<S: PacketSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<FlushStatus, TransportError> {
        loop {
            let Some(head) = self.entries.front() else {
                self.write_interest = false;
                return Ok(FlushStatus::Drained);
            };
            let pending = &head[self.head_written..];
            let written = match sink.try_write(pending) {
                Ok(0) => return Err(TransportError::PeerClosed),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(FlushStatus::Blocked);
                }
                Err(e) => return Err(TransportError::Io(e)),
            };
            if written < pending.len() {
                self.head_written += written;
                trace!(written, remaining = pending.len() - written, "Partial MNCC write");
                continue;
            }
            self.head_written = 0;
            let head_ptr = head.as_ptr();
            let sent = self.entries.pop_front();
            assert!(
                sent.is_some_and(|e| e.as_ptr() == head_ptr),
                "MNCC queue dequeued a different entry than was written"
            );
            counter!("mncc_messages_sent_total").increment(1);
        }
    }

    /// Drop every pending entry, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.head_written = 0;
        self.write_interest = false;
        dropped
    }

    /// Whether the connection should wait for writability
    pub fn wants_write(&self) -> bool {
        self.write_interest && !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mncc::codec::decode_framed;
    use crate::mncc::messages::{CallControl, MessageType};
    use bytes::BytesMut;

    /// Sink appending accepted bytes to one stream
    #[derive(Default)]
    struct RecordingSink {
        stream: Vec<u8>,
        writes: usize,
        block_after: Option<usize>,
        max_chunk: Option<usize>,
        closed: bool,
    }

    impl PacketSink for RecordingSink {
        fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.closed {
                return Ok(0);
            }
            if self.block_after == Some(self.writes) {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let n = self.max_chunk.map_or(buf.len(), |max| max.min(buf.len()));
            self.stream.extend_from_slice(&buf[..n]);
            self.writes += 1;
            Ok(n)
        }
    }

    fn message(callref: u32) -> MnccMessage {
        CallControl::new(MessageType::RelReq, callref)
            .with_cause(1, 16)
            .into()
    }

    fn wire(messages: &[MnccMessage]) -> Vec<u8> {
        messages
            .iter()
            .flat_map(|m| encode_framed(m).to_vec())
            .collect()
    }

    #[test]
    fn test_flush_preserves_fifo_order() {
        let mut queue = MnccQueue::new();
        let sent: Vec<_> = (1..=3).map(message).collect();
        for msg in &sent {
            queue.enqueue(msg).unwrap();
        }
        assert!(queue.wants_write());

        let mut sink = RecordingSink::default();
        assert_eq!(queue.flush(&mut sink).unwrap(), FlushStatus::Drained);
        assert!(queue.is_empty());
        assert!(!queue.wants_write());
        assert_eq!(sink.writes, 3);
        assert_eq!(sink.stream, wire(&sent));

        let mut stream = BytesMut::from(&sink.stream[..]);
        for msg in &sent {
            assert_eq!(decode_framed(&mut stream).unwrap().as_ref(), Some(msg));
        }
    }

    #[test]
    fn test_blocked_sink_keeps_remaining_entries() {
        let mut queue = MnccQueue::new();
        for callref in 1..=3 {
            queue.enqueue(&message(callref)).unwrap();
        }
        let mut sink = RecordingSink {
            block_after: Some(1),
            ..Default::default()
        };
        assert_eq!(queue.flush(&mut sink).unwrap(), FlushStatus::Blocked);
        assert_eq!(queue.len(), 2);
        assert!(queue.wants_write());
    }

    #[test]
    fn test_partial_writes_resume_with_remainder() {
        let mut queue = MnccQueue::new();
        let sent: Vec<_> = (1..=2).map(message).collect();
        for msg in &sent {
            queue.enqueue(msg).unwrap();
        }

        let mut sink = RecordingSink {
            max_chunk: Some(100),
            block_after: Some(1),
            ..Default::default()
        };
        assert_eq!(queue.flush(&mut sink).unwrap(), FlushStatus::Blocked);
        assert_eq!(queue.len(), 2);
        assert_eq!(sink.stream.len(), 100);

        sink.block_after = None;
        assert_eq!(queue.flush(&mut sink).unwrap(), FlushStatus::Drained);
        assert!(queue.is_empty());
        assert_eq!(sink.stream, wire(&sent));
    }

    #[test]
    fn test_zero_write_reports_peer_closed() {
        let mut queue = MnccQueue::new();
        queue.enqueue(&message(1)).unwrap();
        let mut sink = RecordingSink {
            closed: true,
            ..Default::default()
        };
        assert!(matches!(
            queue.flush(&mut sink),
            Err(TransportError::PeerClosed)
        ));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear_discards_everything() {
        let mut queue = MnccQueue::new();
        queue.enqueue(&message(1)).unwrap();
        queue.enqueue(&message(2)).unwrap();
        let mut sink = RecordingSink {
            max_chunk: Some(10),
            block_after: Some(1),
            ..Default::default()
        };
        assert_eq!(queue.flush(&mut sink).unwrap(), FlushStatus::Blocked);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(!queue.wants_write());

        // a new entry starts from its first byte
        queue.enqueue(&message(3)).unwrap();
        let mut sink = RecordingSink::default();
        queue.flush(&mut sink).unwrap();
        assert_eq!(sink.stream, wire(&[message(3)]));
    }
}
