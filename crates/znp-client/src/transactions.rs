//! In-flight application transactions keyed by sequence number.

use std::collections::HashMap;

use tokio::sync::oneshot;
use zcl_protocol::ZclFrame;

use crate::error::{ClientError, Result};
use crate::events::Source;

/// Cluster library frame received in answer to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationReply {
    pub source: Source,
    pub cluster_id: u16,
    pub link_quality: u8,
    pub frame: ZclFrame,
}

/// Sequence slots 1..=255; zero is reserved for unsolicited traffic.
#[derive(Debug, Default)]
pub(crate) struct Transactions {
    slots: HashMap<u8, oneshot::Sender<ApplicationReply>>,
    cursor: u8,
}

impl Transactions {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&mut self) -> u8 {
        self.cursor = self.cursor % 255 + 1;
        self.cursor
    }

    /// Claim the next sequence number.
    ///
    /// The cursor moves even when the claim fails, so a caller that backs off
    /// and retries walks on to the next slot.
    pub fn open(&mut self) -> Result<(u8, oneshot::Receiver<ApplicationReply>)> {
        let sequence = self.advance();
        if self.slots.get(&sequence).is_some_and(|slot| !slot.is_closed()) {
            return Err(ClientError::TooManyPendingRequests { sequence });
        }
        let (tx, rx) = oneshot::channel();
        self.slots.insert(sequence, tx);
        Ok((sequence, rx))
    }

    /// Deliver a reply; false when no transaction holds the slot.
    pub fn resolve(&mut self, sequence: u8, reply: ApplicationReply) -> bool {
        match self.slots.remove(&sequence) {
            Some(slot) => slot.send(reply).is_ok(),
            None => false,
        }
    }

    /// Release a slot whose caller has stopped waiting.
    pub fn close(&mut self, sequence: u8) {
        if self.slots.get(&sequence).is_some_and(oneshot::Sender::is_closed) {
            self.slots.remove(&sequence);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_protocol::FrameControl;

    fn reply(sequence: u8) -> ApplicationReply {
        ApplicationReply {
            source: Source { address: 0x4f2a, endpoint: 1 },
            cluster_id: 0x0006,
            link_quality: 0xff,
            frame: ZclFrame::new(FrameControl::general(), 0x01, vec![]).with_sequence(sequence),
        }
    }

    #[test]
    fn test_sequence_skips_zero() {
        let mut transactions = Transactions::new();
        let mut seen = Vec::new();
        for _ in 0..300 {
            let (sequence, _rx) = transactions.open().unwrap();
            transactions.close(sequence);
            seen.push(sequence);
        }
        assert_eq!(seen[0], 1);
        assert_eq!(seen[254], 255);
        assert_eq!(seen[255], 1);
        assert!(!seen.contains(&0));
    }

    #[test]
    fn test_exhaustion() {
        let mut transactions = Transactions::new();
        let mut receivers = Vec::new();
        for expected in 1..=255u8 {
            let (sequence, rx) = transactions.open().unwrap();
            assert_eq!(sequence, expected);
            receivers.push(rx);
        }
        assert!(matches!(
            transactions.open(),
            Err(ClientError::TooManyPendingRequests { sequence: 1 })
        ));

        // Free slot 5 by timing it out
        drop(receivers.remove(4));
        transactions.close(5);
        assert_eq!(transactions.len(), 254);

        let mut granted = Vec::new();
        for _ in 0..255 {
            if let Ok((sequence, rx)) = transactions.open() {
                granted.push(sequence);
                receivers.push(rx);
            }
        }
        assert_eq!(granted, vec![5]);
        assert_eq!(transactions.len(), 255);
    }

    #[test]
    fn test_resolve_frees_slot() {
        let mut transactions = Transactions::new();
        let (sequence, mut rx) = transactions.open().unwrap();
        assert!(transactions.resolve(sequence, reply(sequence)));
        assert_eq!(rx.try_recv().unwrap().frame.sequence, sequence);
        assert_eq!(transactions.len(), 0);
        assert!(!transactions.resolve(sequence, reply(sequence)));
    }

    #[test]
    fn test_close_keeps_live_slot() {
        let mut transactions = Transactions::new();
        let (sequence, _rx) = transactions.open().unwrap();
        transactions.close(sequence);
        assert_eq!(transactions.len(), 1);
    }
}
