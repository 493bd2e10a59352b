//! Sysex lifecycle notifications and a channel-based fan-out.

use crate::sysex::SysExSendRequest;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How an asynchronous sysex transfer ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SysExDisposition {
    Completed,
    Cancelled,
    Failed { reason: String },
}

impl SysExDisposition {
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, SysExDisposition::Completed)
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SysExDisposition::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub enum OutputNotification {
    WillStartSysExSend {
        request: Arc<SysExSendRequest>,
    },
    FinishedSysExSend {
        request: Arc<SysExSendRequest>,
        disposition: SysExDisposition,
    },
}

impl OutputNotification {
    #[inline]
    pub fn request(&self) -> &Arc<SysExSendRequest> {
        match self {
            OutputNotification::WillStartSysExSend { request }
            | OutputNotification::FinishedSysExSend { request, .. } => request,
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self, OutputNotification::FinishedSysExSend { .. })
    }
}

/// Fan-out publisher. Each subscriber gets its own unbounded receiver; subscribers that
/// dropped their receiver are pruned on the next publish.
pub struct Notifier<T> {
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> Notifier<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Returns the number of subscribers that received `item`.
    pub fn publish(&self, item: T) -> usize {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(item.clone()).is_ok());
        if subscribers.len() < before {
            tracing::trace!("Pruned {} closed subscribers", before - subscribers.len());
        }
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T: Clone> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}
