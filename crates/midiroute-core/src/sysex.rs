//! Asynchronous sysex send requests.
//!
//! A request is created by the endpoint that performs the transfer and shared as
//! `Arc<SysExSendRequest>`. Progress counters and the state are atomics, so callers can
//! poll a request from any thread while the endpoint's I/O thread drives it.

use crate::error::{Error, Result};
use crate::message::MidiMessage;
use crate::notify::SysExDisposition;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SysExState {
    Pending = 0,
    Sending = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
}

impl SysExState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SysExState::Pending,
            1 => SysExState::Sending,
            2 => SysExState::Completed,
            3 => SysExState::Cancelled,
            _ => SysExState::Failed,
        }
    }

    #[inline]
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            SysExState::Completed | SysExState::Cancelled | SysExState::Failed
        )
    }
}

impl From<&SysExDisposition> for SysExState {
    fn from(disposition: &SysExDisposition) -> Self {
        match disposition {
            SysExDisposition::Completed => SysExState::Completed,
            SysExDisposition::Cancelled => SysExState::Cancelled,
            SysExDisposition::Failed { .. } => SysExState::Failed,
        }
    }
}

pub struct SysExSendRequest {
    id: RequestId,
    bytes: Box<[u8]>,
    bytes_sent: AtomicUsize,
    state: AtomicU8,
    cancel_requested: AtomicBool,
}

impl SysExSendRequest {
    pub fn new(message: &MidiMessage) -> Result<Self> {
        if !message.is_sysex() {
            return Err(Error::NotSysEx(message.status()));
        }
        Ok(Self {
            id: RequestId::next(),
            bytes: message.bytes().into(),
            bytes_sent: AtomicUsize::new(0),
            state: AtomicU8::new(SysExState::Pending as u8),
            cancel_requested: AtomicBool::new(false),
        })
    }

    #[inline]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Full message, including the `F0`/`F7` framing.
    #[inline]
    pub fn message_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn total_bytes(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent.load(Ordering::Acquire)
    }

    #[inline]
    pub fn bytes_remaining(&self) -> usize {
        self.total_bytes().saturating_sub(self.bytes_sent())
    }

    #[inline]
    pub fn were_all_bytes_sent(&self) -> bool {
        self.bytes_remaining() == 0
    }

    #[inline]
    pub fn state(&self) -> SysExState {
        SysExState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    #[inline]
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Returns `false` if the request already finished.
    pub fn request_cancel(&self) -> bool {
        self.cancel_requested.store(true, Ordering::Release);
        !self.is_finished()
    }

    // ---- driven by the endpoint performing the transfer ----

    /// Pending -> Sending. Returns `false` if the request was not pending.
    pub fn begin(&self) -> bool {
        self.state
            .compare_exchange(
                SysExState::Pending as u8,
                SysExState::Sending as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn record_sent(&self, count: usize) {
        let total = self.total_bytes();
        let _ = self
            .bytes_sent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |sent| {
                Some(sent.saturating_add(count).min(total))
            });
    }

    /// Moves the request into its terminal state. Succeeds exactly once.
    pub fn finish(&self, disposition: &SysExDisposition) -> Result<()> {
        let target = SysExState::from(disposition) as u8;
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if SysExState::from_u8(current).is_finished() {
                return Err(Error::RequestFinished(self.id.get()));
            }
            match self.state.compare_exchange_weak(
                current,
                target,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }
}

impl std::fmt::Debug for SysExSendRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysExSendRequest")
            .field("id", &self.id)
            .field("total_bytes", &self.total_bytes())
            .field("bytes_sent", &self.bytes_sent())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::HostTime;

    fn request(len: usize) -> SysExSendRequest {
        let body = vec![0x01; len];
        SysExSendRequest::new(&MidiMessage::sysex(HostTime::ZERO, &body).unwrap()).unwrap()
    }

    #[test]
    fn test_rejects_non_sysex() {
        let msg = MidiMessage::immediate([0x90, 60, 100]).unwrap();
        assert_eq!(
            SysExSendRequest::new(&msg).unwrap_err(),
            Error::NotSysEx(0x90)
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let a = request(4);
        let b = request(4);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_progress_counters() {
        let req = request(8); // 10 bytes with framing
        assert_eq!(req.total_bytes(), 10);
        assert_eq!(req.bytes_remaining(), 10);
        assert!(!req.were_all_bytes_sent());

        req.record_sent(4);
        assert_eq!(req.bytes_sent(), 4);
        assert_eq!(req.bytes_remaining(), 6);

        // Clamped to total
        req.record_sent(100);
        assert_eq!(req.bytes_sent(), 10);
        assert!(req.were_all_bytes_sent());
    }

    #[test]
    fn test_state_transitions() {
        let req = request(2);
        assert_eq!(req.state(), SysExState::Pending);

        assert!(req.begin());
        assert!(!req.begin(), "begin only succeeds from Pending");
        assert_eq!(req.state(), SysExState::Sending);

        assert!(req.finish(&SysExDisposition::Completed).is_ok());
        assert_eq!(req.state(), SysExState::Completed);
        assert!(req.is_finished());
    }

    #[test]
    fn test_finish_exactly_once() {
        let req = request(2);
        assert!(req.finish(&SysExDisposition::Cancelled).is_ok());
        assert_eq!(
            req.finish(&SysExDisposition::Completed),
            Err(Error::RequestFinished(req.id().get()))
        );
        assert_eq!(req.state(), SysExState::Cancelled);
    }

    #[test]
    fn test_cancel_after_finish_reports_false() {
        let req = request(2);
        assert!(req.request_cancel());
        assert!(req.cancel_requested());

        let done = request(2);
        done.finish(&SysExDisposition::Failed {
            reason: "port gone".to_string(),
        })
        .unwrap();
        assert!(!done.request_cancel());
        assert_eq!(done.state(), SysExState::Failed);
    }
}
