//! Shortcuts for wrapping a transport in an endpoint and a router in one call.

use crate::error::Result;
use midiroute_io::{
    EndpointKind, OutputEndpoint, OutputRouter, PacketTransport, PortConfig, PortEndpoint,
    RouterConfig, VirtualEndpoint,
};
use tracing::info;

/// Wraps `transport` in the endpoint `kind` names and puts a router in front of it.
/// `port_config` only applies to port endpoints.
pub fn router_for(
    transport: impl PacketTransport + 'static,
    kind: EndpointKind,
    port_config: PortConfig,
    router_config: RouterConfig,
) -> Result<OutputRouter> {
    let endpoint: OutputEndpoint = match kind {
        EndpointKind::Port => PortEndpoint::new(transport, port_config)?.into(),
        EndpointKind::Virtual => VirtualEndpoint::new(transport).into(),
    };
    let router = OutputRouter::builder().config(router_config).build(endpoint)?;
    info!(
        "Output router ready on {} endpoint '{}'",
        router.endpoint_kind(),
        router.endpoint_name()
    );
    Ok(router)
}

/// Opens the first output port whose name contains `fragment` (case-insensitive).
#[cfg(feature = "midi-io")]
pub fn connect_port(fragment: &str, port_config: PortConfig) -> Result<OutputRouter> {
    let transport = midiroute_io::MidirTransport::connect_by_name(fragment)?;
    router_for(
        transport,
        EndpointKind::Port,
        port_config,
        RouterConfig::default(),
    )
}

/// Publishes a virtual source named `name` and routes into it.
#[cfg(all(feature = "midi-io", unix))]
pub fn create_virtual_source(name: &str) -> Result<OutputRouter> {
    let transport = midiroute_io::MidirTransport::create_virtual(name)?;
    router_for(
        transport,
        EndpointKind::Virtual,
        PortConfig::default(),
        RouterConfig::default(),
    )
}
