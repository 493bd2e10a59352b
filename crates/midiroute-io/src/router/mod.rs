//! Output router: one send/configure/cancel contract over a port or virtual endpoint.
//!
//! ## Quick Start
//!
//! ```ignore
//! use midiroute_io::{InFlightPolicy, OutputRouter, PortConfig, PortEndpoint};
//!
//! let port = PortEndpoint::new(transport, PortConfig::default())?;
//! let router = OutputRouter::builder()
//!     .sends_sysex_asynchronously(true)
//!     .in_flight_policy(InFlightPolicy::Reject)
//!     .build(port)?;
//!
//! let events = router.subscribe();
//! router.send(MidiMessage::sysex(HostTime::ZERO, &dump)?)?;
//!
//! if let Some(request) = router.current_sysex_send_request() {
//!     println!("{}/{} bytes", request.bytes_sent(), request.total_bytes());
//! }
//! ```
//!
//! The router subscribes to the active endpoint's notifications and republishes them on
//! a relay thread. A request stops being tracked before its `FinishedSysExSend` is
//! republished, so a subscriber that sees the finish never observes a stale
//! `current_sysex_send_request()`.

mod builder;

pub use builder::OutputRouterBuilder;

use crate::config::{InFlightPolicy, RouterConfig};
use crate::destination::MessageDestination;
use crate::endpoint::{Capability, EndpointKind, OutputEndpoint, PortEndpoint};
use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use crossbeam_channel::Receiver;
use midiroute_core::{
    HostClock, MidiMessage, Notifier, OutputNotification, RequestId, SysExSendRequest,
};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

pub struct OutputRouter {
    endpoint: RwLock<OutputEndpoint>,
    endpoint_name: ArcSwap<String>,
    clock: RwLock<Arc<dyn HostClock>>,
    ignores_timestamps: AtomicBool,
    sends_sysex_asynchronously: AtomicBool,
    in_flight_policy: Mutex<InFlightPolicy>,
    shared: Arc<RouterShared>,
}

struct RouterShared {
    /// Non-owning. The front entry is the current request; entries behind it exist only
    /// under `InFlightPolicy::Queue`. An entry leaves when the relay handles its
    /// `FinishedSysExSend`, not when the request's state turns terminal.
    tracked: Mutex<VecDeque<Weak<SysExSendRequest>>>,
    notifier: Notifier<OutputNotification>,
}

impl RouterShared {
    /// The finished-notification in flight to the relay holds a strong reference, so an
    /// entry upgrades until the relay has dealt with it.
    fn live_requests(tracked: &VecDeque<Weak<SysExSendRequest>>) -> Vec<Arc<SysExSendRequest>> {
        tracked.iter().filter_map(Weak::upgrade).collect()
    }

    fn untrack(&self, id: RequestId) {
        self.tracked.lock().retain(|weak| {
            weak.upgrade()
                .map(|request| request.id() != id)
                .unwrap_or(false)
        });
    }

    fn relay(&self, notification: OutputNotification) {
        if let OutputNotification::FinishedSysExSend { request, .. } = &notification {
            self.untrack(request.id());
        }
        self.notifier.publish(notification);
    }
}

impl OutputRouter {
    pub fn builder() -> OutputRouterBuilder {
        OutputRouterBuilder::default()
    }

    pub fn new(endpoint: impl Into<OutputEndpoint>) -> Result<Self> {
        Self::from_parts(endpoint.into(), RouterConfig::default())
    }

    pub(crate) fn from_parts(endpoint: OutputEndpoint, config: RouterConfig) -> Result<Self> {
        if config.sends_sysex_asynchronously && !endpoint.can_send_sysex_asynchronously() {
            return Err(Self::unsupported(endpoint.kind(), Capability::AsyncSysEx));
        }

        let shared = Arc::new(RouterShared {
            tracked: Mutex::new(VecDeque::new()),
            notifier: Notifier::new(),
        });
        if let Some(rx) = endpoint.subscribe() {
            Self::spawn_relay(Arc::clone(&shared), rx, endpoint.name())?;
        }

        debug!(
            "Output router created over {} endpoint '{}'",
            endpoint.kind(),
            endpoint.name()
        );

        Ok(Self {
            endpoint_name: ArcSwap::from_pointee(endpoint.name().to_string()),
            clock: RwLock::new(endpoint.clock()),
            endpoint: RwLock::new(endpoint),
            ignores_timestamps: AtomicBool::new(config.ignores_timestamps),
            sends_sysex_asynchronously: AtomicBool::new(config.sends_sysex_asynchronously),
            in_flight_policy: Mutex::new(config.in_flight_policy),
            shared,
        })
    }

    fn spawn_relay(
        shared: Arc<RouterShared>,
        rx: Receiver<OutputNotification>,
        endpoint_name: &str,
    ) -> Result<()> {
        let name = endpoint_name.to_string();
        thread::Builder::new()
            .name(format!("midi-relay-{}", endpoint_name))
            .spawn(move || {
                for notification in rx.iter() {
                    shared.relay(notification);
                }
                trace!("Notification relay for '{}' stopped", name);
            })?;
        Ok(())
    }

    fn unsupported(kind: EndpointKind, capability: Capability) -> Error {
        Error::UnsupportedOperation {
            endpoint: kind.as_str(),
            operation: capability.name(),
        }
    }

    // ==================== Flags ====================

    pub fn ignores_timestamps(&self) -> bool {
        self.ignores_timestamps.load(Ordering::Acquire)
    }

    /// When set, messages are restamped with the clock's "now" and sent immediately.
    pub fn set_ignores_timestamps(&self, value: bool) {
        self.ignores_timestamps.store(value, Ordering::Release);
    }

    pub fn sends_sysex_asynchronously(&self) -> bool {
        self.sends_sysex_asynchronously.load(Ordering::Acquire)
    }

    /// Enabling fails with `UnsupportedOperation` (flag unchanged) when the active
    /// endpoint cannot send sysex asynchronously. Disabling always succeeds.
    pub fn set_sends_sysex_asynchronously(&self, value: bool) -> Result<()> {
        if value {
            let endpoint = self.endpoint.read();
            if !endpoint.can_send_sysex_asynchronously() {
                return Err(Self::unsupported(endpoint.kind(), Capability::AsyncSysEx));
            }
        }
        self.sends_sysex_asynchronously
            .store(value, Ordering::Release);
        Ok(())
    }

    /// Asked of the active endpoint on every call.
    pub fn can_send_sysex_asynchronously(&self) -> bool {
        self.endpoint.read().can_send_sysex_asynchronously()
    }

    pub fn in_flight_policy(&self) -> InFlightPolicy {
        *self.in_flight_policy.lock()
    }

    pub fn set_in_flight_policy(&self, policy: InFlightPolicy) {
        *self.in_flight_policy.lock() = policy;
    }

    pub fn config(&self) -> RouterConfig {
        RouterConfig {
            ignores_timestamps: self.ignores_timestamps(),
            sends_sysex_asynchronously: self.sends_sysex_asynchronously(),
            in_flight_policy: self.in_flight_policy(),
        }
    }

    // ==================== Sending ====================

    /// Sysex goes through an asynchronous transfer when the flag is on and the active
    /// endpoint is a port; everything else takes the immediate-packet path.
    pub fn send(&self, message: MidiMessage) -> Result<()> {
        let message = if self.ignores_timestamps() {
            let now = self.clock.read().now();
            message.with_timestamp(now)
        } else {
            message
        };

        let endpoint = self.endpoint.read();
        if message.is_sysex() && self.sends_sysex_asynchronously() {
            if let OutputEndpoint::Port(port) = &*endpoint {
                return self.start_sysex_transfer(port, &message).map(|_| ());
            }
        }
        endpoint.send(&message)
    }

    fn start_sysex_transfer(
        &self,
        port: &PortEndpoint,
        message: &MidiMessage,
    ) -> Result<Arc<SysExSendRequest>> {
        let mut tracked = self.shared.tracked.lock();
        let live = RouterShared::live_requests(&tracked);
        let policy = self.in_flight_policy();

        if let (Some(current), InFlightPolicy::Reject) = (live.first(), policy) {
            return Err(Error::TransferInFlight(current.id().get()));
        }

        // Superseded transfers are only touched once the new one is accepted.
        let request = port.send_sysex_async(message)?;

        if policy == InFlightPolicy::Replace && !live.is_empty() {
            for old in &live {
                port.cancel_sysex(old);
            }
            tracked.retain(|weak| {
                weak.upgrade()
                    .is_some_and(|entry| live.iter().all(|old| old.id() != entry.id()))
            });
            debug!("Replaced {} in-flight sysex transfer(s)", live.len());
        }

        tracked.retain(|weak| weak.strong_count() > 0);
        tracked.push_back(Arc::downgrade(&request));
        Ok(request)
    }

    // ==================== Sysex transfers ====================

    /// Returns immediately; each cancelled transfer reports through a
    /// `FinishedSysExSend` notification. A no-op when nothing is pending.
    pub fn cancel_pending_sysex_send_requests(&self) {
        let endpoint = self.endpoint.read();
        self.cancel_tracked(&endpoint);
    }

    /// Callers hold the endpoint lock, so no transfer can start while this runs.
    fn cancel_tracked(&self, endpoint: &OutputEndpoint) {
        let pending: Vec<_> = RouterShared::live_requests(&self.shared.tracked.lock())
            .into_iter()
            .filter(|request| !request.is_finished())
            .collect();
        if pending.is_empty() {
            trace!("No pending sysex send requests to cancel");
            return;
        }

        debug!("Cancelling {} sysex send request(s)", pending.len());
        match endpoint
            .as_port()
            .filter(|_| endpoint.supports(Capability::SysExCancel))
        {
            Some(port) => {
                for request in &pending {
                    port.cancel_sysex(request);
                }
            }
            // Tracked on a previous endpoint; its I/O thread polls the flag between chunks.
            None => {
                for request in &pending {
                    request.request_cancel();
                }
            }
        }
    }

    /// The in-flight transfer, for progress inspection. Ownership stays with the
    /// endpoint.
    pub fn current_sysex_send_request(&self) -> Option<Arc<SysExSendRequest>> {
        RouterShared::live_requests(&self.shared.tracked.lock())
            .into_iter()
            .next()
    }

    /// Transfers behind the current one (only populated under `InFlightPolicy::Queue`).
    pub fn pending_sysex_send_requests(&self) -> Vec<Arc<SysExSendRequest>> {
        RouterShared::live_requests(&self.shared.tracked.lock())
            .into_iter()
            .skip(1)
            .collect()
    }

    pub fn subscribe(&self) -> Receiver<OutputNotification> {
        self.shared.notifier.subscribe()
    }

    // ==================== Forwarded port operations ====================

    pub fn supports(&self, capability: Capability) -> bool {
        self.endpoint.read().supports(capability)
    }

    fn with_port<R>(
        &self,
        capability: Capability,
        f: impl FnOnce(&PortEndpoint) -> Result<R>,
    ) -> Result<R> {
        let endpoint = self.endpoint.read();
        match endpoint.as_port() {
            Some(port) => f(port),
            None => Err(Self::unsupported(endpoint.kind(), capability)),
        }
    }

    pub fn flush_output(&self) -> Result<()> {
        self.with_port(Capability::FlushOutput, PortEndpoint::flush_output)
    }

    pub fn set_sysex_pacing(&self, interval: Duration) -> Result<()> {
        self.with_port(Capability::SysExPacing, |port| {
            port.set_sysex_pacing(interval)
        })
    }

    // ==================== Endpoint ====================

    pub fn endpoint_kind(&self) -> EndpointKind {
        self.endpoint.read().kind()
    }

    pub fn endpoint_name(&self) -> Arc<String> {
        self.endpoint_name.load_full()
    }

    /// Swaps in a different endpoint and returns the old one.
    ///
    /// Tracked transfers are cancelled under the endpoint write lock, so no send can start
    /// one on the old endpoint mid-swap. Their finish notifications still arrive
    /// through the old endpoint's relay. The asynchronous-sysex flag is cleared when the
    /// new endpoint lacks the capability.
    pub fn replace_endpoint(&self, endpoint: impl Into<OutputEndpoint>) -> Result<OutputEndpoint> {
        let endpoint = endpoint.into();
        let mut current = self.endpoint.write();
        self.cancel_tracked(&current);

        if let Some(rx) = endpoint.subscribe() {
            Self::spawn_relay(Arc::clone(&self.shared), rx, endpoint.name())?;
        }
        if self.sends_sysex_asynchronously() && !endpoint.can_send_sysex_asynchronously() {
            debug!(
                "{} endpoint '{}' cannot send sysex asynchronously; disabling",
                endpoint.kind(),
                endpoint.name()
            );
            self.sends_sysex_asynchronously
                .store(false, Ordering::Release);
        }

        self.endpoint_name
            .store(Arc::new(endpoint.name().to_string()));
        *self.clock.write() = endpoint.clock();
        let old = std::mem::replace(&mut *current, endpoint);

        debug!(
            "Output router switched from {} '{}' to {} '{}'",
            old.kind(),
            old.name(),
            current.kind(),
            current.name()
        );
        Ok(old)
    }
}

impl MessageDestination for OutputRouter {
    fn take_message(&self, message: MidiMessage) -> Result<()> {
        self.send(message)
    }
}

impl std::fmt::Debug for OutputRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRouter")
            .field("endpoint_kind", &self.endpoint_kind())
            .field("endpoint_name", &self.endpoint_name())
            .field("config", &self.config())
            .finish()
    }
}
