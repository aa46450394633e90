//! FIFO correlation of synchronous link replies.
//!
//! Each command name owns a queue of waiting callers. A reply carrying that
//! name completes the oldest waiter, so two outstanding requests of the same
//! command are matched purely by arrival order.

use std::collections::{HashMap, VecDeque};

use tokio::sync::oneshot;
use znp_protocol::LinkFrame;

use crate::error::{ClientError, Result};

pub(crate) type LinkReply = oneshot::Sender<Result<LinkFrame>>;

#[derive(Debug, Default)]
pub(crate) struct PendingLinkRequests {
    queues: HashMap<&'static str, VecDeque<LinkReply>>,
}

impl PendingLinkRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, reply: LinkReply) {
        let queue = self.queues.entry(name).or_default();
        queue.retain(|waiter| !waiter.is_closed());
        queue.push_back(reply);
    }

    /// Remove the newest waiter for `name`, for a send that never left the host.
    pub fn pop_back(&mut self, name: &str) -> Option<LinkReply> {
        let queue = self.queues.get_mut(name)?;
        let reply = queue.pop_back();
        if queue.is_empty() {
            self.queues.remove(name);
        }
        reply
    }

    pub fn has_pending(&self, name: &str) -> bool {
        self.queues.get(name).is_some_and(|q| q.iter().any(|waiter| !waiter.is_closed()))
    }

    /// Complete the oldest waiter for the frame's command.
    ///
    /// Waiters whose caller has given up are dropped first. Hands the frame
    /// back when nobody live is waiting for it.
    pub fn resolve(&mut self, frame: LinkFrame) -> Result<(), LinkFrame> {
        let Some(name) = frame.name() else {
            return Err(frame);
        };
        let Some(queue) = self.queues.get_mut(name) else {
            return Err(frame);
        };
        let mut reply = None;
        while let Some(waiter) = queue.pop_front() {
            if !waiter.is_closed() {
                reply = Some(waiter);
                break;
            }
        }
        if queue.is_empty() {
            self.queues.remove(name);
        }
        match reply {
            Some(reply) => {
                let _ = reply.send(Ok(frame));
                Ok(())
            }
            None => Err(frame),
        }
    }

    /// Fail every waiter; returns how many there were.
    pub fn fail_all(&mut self) -> usize {
        let mut failed = 0;
        for (_, queue) in self.queues.drain() {
            for reply in queue {
                let _ = reply.send(Err(ClientError::TransportDisconnected));
                failed += 1;
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}
