use std::time::Duration;

use dronecan_dsdl::{Composite, Field, MessageType, TypeDefinition, Value};
use dronecan_frame::{Frame, SignatureTable, TransferReceiver, TransferSender};
use dronecan_link::VirtualBus;

fn log_message() -> MessageType {
    MessageType::new(
        "uavcan.protocol.debug.LogMessage",
        Some(16383),
        TypeDefinition::structure()
            .field("level", Field::uint(3))
            .field("", Field::void(5))
            .field("source", Field::string(31))
            .field("text", Field::string(90)),
    )
}

#[test]
fn typed_transfer_over_virtual_bus() {
    let ty = log_message();
    let table = SignatureTable::new().with_message(16383, ty.signature());

    let bus = VirtualBus::new();
    let subscription = bus.port().subscribe();
    let mut sender = TransferSender::new(bus.port(), table.clone());
    let mut receiver = TransferReceiver::new(table);

    let value = Value::Composite(
        Composite::new()
            .with("level", 2u8)
            .with("source", "nav")
            .with("text", "waypoint reached, holding position for handoff"),
    );
    let payload = ty.definition().encoded(&value).unwrap();
    assert!(payload.len() > 7);

    let transfer_id = sender
        .send(&Frame::message(42, 16383), &payload, None)
        .unwrap();

    let mut delivered = None;
    while let Ok(frame) = subscription.recv_timeout(Duration::from_millis(50)) {
        if let Some(transfer) = receiver.read(&frame) {
            delivered = Some(transfer);
            break;
        }
    }

    let transfer = delivered.expect("transfer delivered");
    assert_eq!(transfer.transfer_id, transfer_id);
    assert_eq!(transfer.frame.source(), 42);
    assert_eq!(transfer.payload, payload);
    assert_eq!(ty.definition().decoded(&transfer.payload).unwrap(), value);
}

#[test]
fn consecutive_transfers_use_consecutive_ids() {
    let bus = VirtualBus::new();
    let subscription = bus.port().subscribe();
    let mut sender = TransferSender::new(bus.port(), SignatureTable::new());
    let mut receiver = TransferReceiver::new(SignatureTable::new());

    for byte in 0..3u8 {
        sender.send(&Frame::message(7, 100), &[byte], None).unwrap();
    }

    let ids: Vec<u8> = subscription
        .drain()
        .iter()
        .filter_map(|frame| receiver.read(frame))
        .map(|transfer| transfer.transfer_id)
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
}
