//! Port-backed endpoint.
//!
//! A dedicated I/O thread owns the transport. Callers talk to it through a bounded
//! command channel; immediate sends wait for the thread's reply so transport errors
//! surface synchronously. The thread also:
//! - holds future-stamped packets in a min-heap until the clock reaches them
//! - streams asynchronous sysex requests in chunks, one request at a time, in FIFO order
//! - emits `WillStartSysExSend` / `FinishedSysExSend` for every request it runs

use super::Capability;
use crate::config::PortConfig;
use crate::error::{Error, Result};
use crate::transport::PacketTransport;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use midiroute_core::{
    HostClock, HostTime, MessageBytes, MidiMessage, MonotonicClock, Notifier,
    OutputNotification, RequestId, SysExDisposition, SysExSendRequest,
};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

enum PortCommand {
    Send {
        bytes: MessageBytes,
        timestamp: HostTime,
        reply: Sender<Result<()>>,
    },
    Schedule {
        bytes: MessageBytes,
        timestamp: HostTime,
    },
    StartSysEx(Arc<SysExSendRequest>),
    CancelSysEx(RequestId),
    Flush(Sender<Result<()>>),
    QueryAsyncSysEx(Sender<bool>),
    SetPacing(Duration),
    Shutdown,
}

pub struct PortEndpoint {
    name: String,
    command_sender: Sender<PortCommand>,
    notifier: Arc<Notifier<OutputNotification>>,
    clock: Arc<dyn HostClock>,
    is_running: Arc<AtomicBool>,
}

impl PortEndpoint {
    pub fn new(transport: impl PacketTransport + 'static, config: PortConfig) -> Result<Self> {
        Self::with_clock(transport, config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        transport: impl PacketTransport + 'static,
        config: PortConfig,
        clock: Arc<dyn HostClock>,
    ) -> Result<Self> {
        config.validate()?;

        let name = transport.name().to_string();
        let (command_sender, command_receiver) = bounded(config.command_capacity);
        let notifier = Arc::new(Notifier::new());
        let is_running = Arc::new(AtomicBool::new(true));

        let worker = PortWorker {
            transport: Box::new(transport),
            clock: Arc::clone(&clock),
            notifier: Arc::clone(&notifier),
            chunk_size: config.sysex_chunk_size,
            chunk_interval: config.sysex_chunk_interval(),
            idle_poll: config.idle_poll(),
            schedule_poll: config.schedule_poll(),
            scheduled: BinaryHeap::new(),
            next_seq: 0,
            queued: VecDeque::new(),
            active: None,
        };
        let is_running_clone = Arc::clone(&is_running);

        thread::Builder::new()
            .name(format!("midi-port-{}", name))
            .spawn(move || {
                worker.run(command_receiver);
                is_running_clone.store(false, Ordering::SeqCst);
            })?;

        debug!("Started MIDI port endpoint: {}", name);

        Ok(Self {
            name,
            command_sender,
            notifier,
            clock,
            is_running,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock(&self) -> Arc<dyn HostClock> {
        Arc::clone(&self.clock)
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> Receiver<OutputNotification> {
        self.notifier.subscribe()
    }

    /// Due (or unstamped) messages are delivered before this returns. Future-stamped
    /// messages are queued on the I/O thread and delivered when the clock reaches them.
    pub fn send(&self, message: &MidiMessage) -> Result<()> {
        let timestamp = message.timestamp;
        let bytes = MessageBytes::from_slice(message.bytes());

        if timestamp.is_zero() || timestamp <= self.clock.now() {
            let (reply, result) = bounded(1);
            self.submit(PortCommand::Send {
                bytes,
                timestamp,
                reply,
            })?;
            result.recv().map_err(|_| self.closed())?
        } else {
            trace!("Scheduling MIDI packet for {}", timestamp);
            self.submit(PortCommand::Schedule { bytes, timestamp })
        }
    }

    /// Queues `message` for a chunked transfer. Its timestamp is not honored: transfers
    /// start as soon as the I/O thread is free.
    pub fn send_sysex_async(&self, message: &MidiMessage) -> Result<Arc<SysExSendRequest>> {
        if !self.can_send_sysex_asynchronously() {
            return Err(Error::UnsupportedOperation {
                endpoint: "port",
                operation: Capability::AsyncSysEx.name(),
            });
        }

        let request = Arc::new(SysExSendRequest::new(message)?);
        self.submit(PortCommand::StartSysEx(Arc::clone(&request)))?;
        debug!(
            "Queued sysex request {} ({} bytes) on {}",
            request.id(),
            request.total_bytes(),
            self.name
        );
        Ok(request)
    }

    /// Returns immediately. The outcome arrives as a `FinishedSysExSend` notification,
    /// which may still report `Completed` if the transfer beat the cancellation.
    pub fn cancel_sysex(&self, request: &SysExSendRequest) {
        if !request.request_cancel() {
            trace!("Sysex request {} already finished", request.id());
            return;
        }
        // The worker also polls the flag between chunks, so a full queue only delays it.
        if let Err(e) = self
            .command_sender
            .try_send(PortCommand::CancelSysEx(request.id()))
        {
            debug!("Cancel for sysex request {} not queued: {}", request.id(), e);
        }
    }

    /// Asks the transport, so the answer reflects its current state.
    pub fn can_send_sysex_asynchronously(&self) -> bool {
        let (reply, result) = bounded(1);
        if self.submit(PortCommand::QueryAsyncSysEx(reply)).is_err() {
            return false;
        }
        result.recv().unwrap_or(false)
    }

    /// Drops every scheduled-but-undelivered packet. Sysex transfers are unaffected.
    pub fn flush_output(&self) -> Result<()> {
        let (reply, result) = bounded(1);
        self.submit(PortCommand::Flush(reply))?;
        result.recv().map_err(|_| self.closed())?
    }

    pub fn set_sysex_pacing(&self, interval: Duration) -> Result<()> {
        self.submit(PortCommand::SetPacing(interval))
    }

    fn submit(&self, command: PortCommand) -> Result<()> {
        self.command_sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                Error::SendFailure(format!("{}: command queue full", self.name))
            }
            TrySendError::Disconnected(_) => self.closed(),
        })
    }

    fn closed(&self) -> Error {
        Error::EndpointClosed(self.name.clone())
    }
}

impl Drop for PortEndpoint {
    fn drop(&mut self) {
        let _ = self.command_sender.send(PortCommand::Shutdown);
    }
}

impl std::fmt::Debug for PortEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortEndpoint")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

struct ScheduledPacket {
    timestamp: HostTime,
    /// Keeps packets with equal stamps in submission order.
    seq: u64,
    bytes: MessageBytes,
}

impl PartialEq for ScheduledPacket {
    fn eq(&self, other: &Self) -> bool {
        (self.timestamp, self.seq) == (other.timestamp, other.seq)
    }
}

impl Eq for ScheduledPacket {}

impl PartialOrd for ScheduledPacket {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledPacket {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.timestamp, self.seq).cmp(&(other.timestamp, other.seq))
    }
}

struct ActiveTransfer {
    request: Arc<SysExSendRequest>,
    offset: usize,
    next_chunk_at: Instant,
}

struct PortWorker {
    transport: Box<dyn PacketTransport>,
    clock: Arc<dyn HostClock>,
    notifier: Arc<Notifier<OutputNotification>>,
    chunk_size: usize,
    chunk_interval: Duration,
    idle_poll: Duration,
    schedule_poll: Duration,
    scheduled: BinaryHeap<Reverse<ScheduledPacket>>,
    next_seq: u64,
    queued: VecDeque<Arc<SysExSendRequest>>,
    active: Option<ActiveTransfer>,
}

impl PortWorker {
    fn run(mut self, commands: Receiver<PortCommand>) {
        'run: loop {
            match commands.recv_timeout(self.next_wakeup()) {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                    while let Ok(command) = commands.try_recv() {
                        if !self.handle(command) {
                            break 'run;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.deliver_due_packets();
            self.pump_sysex();
        }

        self.shutdown();
    }

    /// Returns `false` on shutdown.
    fn handle(&mut self, command: PortCommand) -> bool {
        match command {
            PortCommand::Send {
                bytes,
                timestamp,
                reply,
            } => {
                let stamp = if timestamp.is_zero() {
                    self.clock.now()
                } else {
                    timestamp
                };
                let _ = reply.send(self.transport.send(&bytes, stamp));
            }
            PortCommand::Schedule { bytes, timestamp } => {
                self.scheduled.push(Reverse(ScheduledPacket {
                    timestamp,
                    seq: self.next_seq,
                    bytes,
                }));
                self.next_seq += 1;
            }
            PortCommand::StartSysEx(request) => {
                self.queued.push_back(request);
            }
            PortCommand::CancelSysEx(id) => self.cancel(id),
            PortCommand::Flush(reply) => {
                if !self.scheduled.is_empty() {
                    debug!("Flushing {} scheduled packets", self.scheduled.len());
                    self.scheduled.clear();
                }
                let _ = reply.send(self.transport.flush());
            }
            PortCommand::QueryAsyncSysEx(reply) => {
                let _ = reply.send(self.transport.supports_async_sysex());
            }
            PortCommand::SetPacing(interval) => {
                self.chunk_interval = interval;
            }
            PortCommand::Shutdown => return false,
        }
        true
    }

    fn next_wakeup(&self) -> Duration {
        if let Some(active) = &self.active {
            let until_chunk = active.next_chunk_at.saturating_duration_since(Instant::now());
            return if self.scheduled.is_empty() {
                until_chunk
            } else {
                until_chunk.min(self.schedule_poll)
            };
        }
        if !self.queued.is_empty() {
            return Duration::ZERO;
        }
        if let Some(Reverse(next)) = self.scheduled.peek() {
            let until_due = next.timestamp.saturating_duration_since(self.clock.now());
            return until_due.min(self.schedule_poll);
        }
        self.idle_poll
    }

    fn deliver_due_packets(&mut self) {
        if self.scheduled.is_empty() {
            return;
        }
        let now = self.clock.now();
        while let Some(Reverse(next)) = self.scheduled.peek() {
            if next.timestamp > now {
                break;
            }
            if let Some(Reverse(packet)) = self.scheduled.pop() {
                if let Err(e) = self.transport.send(&packet.bytes, packet.timestamp) {
                    warn!(
                        "Scheduled MIDI packet for {} not delivered: {}",
                        packet.timestamp, e
                    );
                }
            }
        }
    }

    fn pump_sysex(&mut self) {
        if self.active.is_none() {
            self.start_next_transfer();
        }

        let outcome = match self.active.as_mut() {
            None => return,
            Some(active) => {
                if active.request.cancel_requested() {
                    Some(SysExDisposition::Cancelled)
                } else if Instant::now() < active.next_chunk_at {
                    return;
                } else {
                    let bytes = active.request.message_bytes();
                    let end = (active.offset + self.chunk_size).min(bytes.len());
                    match self
                        .transport
                        .send(&bytes[active.offset..end], self.clock.now())
                    {
                        Ok(()) => {
                            active.request.record_sent(end - active.offset);
                            active.offset = end;
                            active.next_chunk_at = Instant::now() + self.chunk_interval;
                            if end == bytes.len() {
                                Some(SysExDisposition::Completed)
                            } else {
                                None
                            }
                        }
                        Err(e) => Some(SysExDisposition::Failed {
                            reason: e.to_string(),
                        }),
                    }
                }
            }
        };

        if let Some(disposition) = outcome {
            if let Some(active) = self.active.take() {
                self.finish(&active.request, disposition);
            }
        }
    }

    fn start_next_transfer(&mut self) {
        while let Some(request) = self.queued.pop_front() {
            if request.cancel_requested() {
                self.finish(&request, SysExDisposition::Cancelled);
                continue;
            }
            if !self.transport.supports_async_sysex() {
                let reason = format!(
                    "{} no longer supports asynchronous sysex",
                    self.transport.name()
                );
                self.finish(&request, SysExDisposition::Failed { reason });
                continue;
            }

            request.begin();
            debug!(
                "Starting sysex transfer {} ({} bytes)",
                request.id(),
                request.total_bytes()
            );
            self.notifier.publish(OutputNotification::WillStartSysExSend {
                request: Arc::clone(&request),
            });
            self.active = Some(ActiveTransfer {
                request,
                offset: 0,
                next_chunk_at: Instant::now(),
            });
            return;
        }
    }

    fn cancel(&mut self, id: RequestId) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.request.id() == id)
        {
            if let Some(active) = self.active.take() {
                self.finish(&active.request, SysExDisposition::Cancelled);
            }
            return;
        }
        if let Some(pos) = self.queued.iter().position(|r| r.id() == id) {
            if let Some(request) = self.queued.remove(pos) {
                self.finish(&request, SysExDisposition::Cancelled);
            }
        }
    }

    fn finish(&self, request: &Arc<SysExSendRequest>, disposition: SysExDisposition) {
        match request.finish(&disposition) {
            Ok(()) => {
                debug!(
                    "Sysex transfer {} finished: {:?} ({}/{} bytes)",
                    request.id(),
                    disposition,
                    request.bytes_sent(),
                    request.total_bytes()
                );
                self.notifier.publish(OutputNotification::FinishedSysExSend {
                    request: Arc::clone(request),
                    disposition,
                });
            }
            Err(e) => trace!("{}", e),
        }
    }

    fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            self.finish(&active.request, SysExDisposition::Cancelled);
        }
        while let Some(request) = self.queued.pop_front() {
            self.finish(&request, SysExDisposition::Cancelled);
        }
        if !self.scheduled.is_empty() {
            debug!("Dropping {} scheduled packets", self.scheduled.len());
        }
        debug!("MIDI port endpoint stopped: {}", self.transport.name());
    }
}
