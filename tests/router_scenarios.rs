//! End-to-end router scenarios through the umbrella crate.
//!
//! Run with:
//! ```bash
//! cargo test -p midiroute --test router_scenarios
//! ```

mod helpers;

use helpers::*;
use midiroute::prelude::*;
use midiroute::{router_for, Error};

fn port_router(transport: &LoopbackTransport, config: PortConfig) -> OutputRouter {
    router_for(
        transport.clone(),
        EndpointKind::Port,
        config,
        RouterConfig {
            sends_sysex_asynchronously: true,
            ..Default::default()
        },
    )
    .expect("Failed to create port router")
}

// =============================================================================
// Virtual endpoint
// =============================================================================

#[test]
fn test_virtual_router_sends_sysex_whole() {
    init_tracing();
    let transport = LoopbackTransport::new();
    let router = router_for(
        transport.clone(),
        EndpointKind::Virtual,
        PortConfig::default(),
        RouterConfig::default(),
    )
    .unwrap();
    let rx = router.subscribe();

    let message = sysex_of_len(200);
    router.send(message.clone()).unwrap();

    assert_eq!(transport.packets(), vec![message.bytes().to_vec()]);
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn test_virtual_router_rejects_async_config() {
    let result = router_for(
        LoopbackTransport::new(),
        EndpointKind::Virtual,
        PortConfig::default(),
        RouterConfig {
            sends_sysex_asynchronously: true,
            ..Default::default()
        },
    );
    match result {
        Err(e) => assert!(e.is_unsupported(), "unexpected error: {}", e),
        Ok(_) => panic!("virtual endpoint accepted asynchronous sysex"),
    }
}

#[test]
fn test_invalid_port_config_rejected() {
    let result = router_for(
        LoopbackTransport::new(),
        EndpointKind::Port,
        PortConfig {
            sysex_chunk_size: 0,
            ..Default::default()
        },
        RouterConfig::default(),
    );
    assert!(matches!(
        result,
        Err(Error::Output(midiroute::io::Error::InvalidConfig(_)))
    ));
}

// =============================================================================
// Port endpoint
// =============================================================================

#[test]
fn test_port_router_transfer_completes() {
    init_tracing();
    let transport = LoopbackTransport::new();
    let router = port_router(&transport, PortConfig::default());
    let rx = router.subscribe();

    let message = sysex_of_len(200);
    router.send(message.clone()).unwrap();

    let mut seen = Vec::new();
    while seen.len() < 2 {
        seen.push(rx.recv_timeout(WAIT).expect("notification not delivered"));
    }
    assert!(matches!(seen[0], OutputNotification::WillStartSysExSend { .. }));
    match &seen[1] {
        OutputNotification::FinishedSysExSend {
            request,
            disposition,
        } => {
            assert!(disposition.is_completed());
            assert_eq!(request.bytes_remaining(), 0);
        }
        other => panic!("expected finished, got {:?}", other),
    }
    assert_eq!(transport.joined(), message.bytes());
}

#[test]
fn test_cancel_reports_cancelled_once() {
    let transport = LoopbackTransport::new();
    let router = port_router(&transport, slow_port_config(8));
    let rx = router.subscribe();

    router.send(sysex_of_len(200)).unwrap();
    assert!(!rx.recv_timeout(WAIT).unwrap().is_finished());

    router.cancel_pending_sysex_send_requests();

    let finished = rx.recv_timeout(WAIT).unwrap();
    match finished {
        OutputNotification::FinishedSysExSend { disposition, .. } => {
            assert!(disposition.is_cancelled())
        }
        other => panic!("expected finished, got {:?}", other),
    }
    assert!(rx.recv_timeout(QUIET).is_err());
    assert!(router.current_sysex_send_request().is_none());
    assert!(transport.joined().len() < 200);
}

#[test]
fn test_lost_capability_fails_new_transfers() {
    let transport = LoopbackTransport::new();
    let router = port_router(&transport, PortConfig::default());
    assert!(router.can_send_sysex_asynchronously());

    transport.set_async_sysex(false);
    assert!(!router.can_send_sysex_asynchronously());

    let err = router.send(sysex_of_len(20)).unwrap_err();
    assert!(err.is_unsupported());

    // Turning the flag off falls back to the plain-packet path.
    router.set_sends_sysex_asynchronously(false).unwrap();
    router.send(sysex_of_len(20)).unwrap();
    assert_eq!(transport.packets().len(), 1);
}

#[test]
fn test_swap_port_for_virtual() {
    let port_transport = LoopbackTransport::new();
    let router = port_router(&port_transport, slow_port_config(8));
    let rx = router.subscribe();
    router.send(sysex_of_len(200)).unwrap();

    let virtual_transport = LoopbackTransport::new();
    let old = router
        .replace_endpoint(VirtualEndpoint::new(virtual_transport.clone()))
        .unwrap();
    drop(old);

    let finished = loop {
        let n = rx.recv_timeout(WAIT).expect("old transfer never finished");
        if n.is_finished() {
            break n;
        }
    };
    assert!(matches!(
        finished,
        OutputNotification::FinishedSysExSend {
            disposition: SysExDisposition::Cancelled,
            ..
        }
    ));

    assert_eq!(router.endpoint_kind(), EndpointKind::Virtual);
    assert!(!router.sends_sysex_asynchronously());
    router.send(sysex_of_len(50)).unwrap();
    assert_eq!(virtual_transport.packets().len(), 1);
}
