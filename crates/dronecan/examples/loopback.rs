//! Two nodes on an in-memory bus: a heartbeat broadcast and one service call.
//!
//! Run with:
//!   cargo run --example loopback

use std::sync::Arc;
use std::time::Duration;

use dronecan::dsdl::{Composite, Field, TypeDefinition, Value};
use dronecan::link::VirtualBus;
use dronecan::node::{Node, RequestStatus};
use dronecan::schema::{standard, SchemaRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = SchemaRegistry::new();
    standard::register_all(&mut registry)?;
    registry.define_service(
        "example.GetTemperature",
        200,
        TypeDefinition::structure().field("sensor", Field::uint(8)),
        TypeDefinition::structure().field("kelvin", Field::float32()),
    )?;
    let registry = Arc::new(registry);

    let bus = VirtualBus::new();
    let port = bus.port();
    let client_rx = port.subscribe();
    let mut client = Node::new(10, Arc::clone(&registry), port)?;

    let port = bus.port();
    let server_rx = port.subscribe();
    let mut server = Node::new(20, Arc::clone(&registry), port)?;

    server.on_request("example.GetTemperature", |request| {
        eprintln!("node 20: request from {}: {:?}", request.source, request.request);
        Some(Value::Composite(Composite::new().with("kelvin", 293.15f32)))
    })?;
    server.on_message("uavcan.protocol.NodeStatus", |message| {
        eprintln!("node 20: heartbeat from {}: {:?}", message.source, message.message);
    })?;

    client.broadcast(
        "uavcan.protocol.NodeStatus",
        &Value::Composite(
            Composite::new()
                .with("uptimeSec", 42u32)
                .with("health", Value::Name("OK".into()))
                .with("mode", Value::Name("OPERATIONAL".into()))
                .with("subMode", 0u8)
                .with("vendorSpecificStatusCode", 0u16),
        ),
    )?;
    let handle = client.request(
        "example.GetTemperature",
        20,
        &Value::Composite(Composite::new().with("sensor", 3u8)),
    )?;

    loop {
        server.process(&server_rx);
        client.process(&client_rx);
        match client.poll_response(&handle)? {
            RequestStatus::Pending => std::thread::sleep(Duration::from_millis(10)),
            status => {
                eprintln!("node 10: {status:?}");
                break;
            }
        }
    }
    Ok(())
}
