//! Packets framed over an async byte stream and routed on arrival.

#![expect(clippy::expect_used, reason = "test assertions")]

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokenflow::{
    error::PacketError,
    packet::{MessageId, Packet, codec::PacketCodec},
    topology::{NodeId, Topology, WorkerId},
    transport::{Mailboxes, Router, Transport},
};
use tokio::io::{AsyncWriteExt, duplex};
use tokio_util::codec::{FramedRead, FramedWrite};

/// Collects outgoing packets instead of delivering them.
#[derive(Default)]
struct Outbox {
    packets: Mutex<Vec<Packet>>,
}

impl Transport for Outbox {
    fn push(&self, _worker: WorkerId, packet: Packet) -> Result<(), PacketError> {
        self.packets.lock().expect("outbox lock").push(packet);
        Ok(())
    }
}

fn outgoing(topology: Topology) -> Vec<Packet> {
    let outbox = Arc::new(Outbox::default());
    let router = Router::new(topology, Arc::clone(&outbox) as Arc<dyn Transport>);
    router
        .broadcast(Some(NodeId::new(0)), MessageId::data(9).expect("id"), b"hello")
        .expect("broadcast");
    router
        .broadcast(None, MessageId::HALT, &[])
        .expect("halt");
    std::mem::take(&mut *outbox.packets.lock().expect("outbox lock"))
}

#[tokio::test]
async fn packets_survive_a_framed_stream() {
    let topology = Topology::new(3, 0).expect("topology");
    let sent = outgoing(topology);
    assert_eq!(sent.len(), 5);

    let (client, server) = duplex(64);
    let writer = tokio::spawn(async move {
        let mut frames = FramedWrite::new(client, PacketCodec::new());
        for packet in sent {
            frames.send(packet).await.expect("send frame");
        }
    });

    let mailboxes = Arc::new(Mailboxes::new(topology.worker_count()));
    let router = Router::new(topology, Arc::clone(&mailboxes) as Arc<dyn Transport>);
    let mut frames = FramedRead::new(server, PacketCodec::new());
    let mut received = 0;
    while let Some(packet) = frames.next().await {
        router.forward(packet.expect("decode")).expect("forward");
        received += 1;
    }
    writer.await.expect("writer task");
    assert_eq!(received, 5);

    for worker in [1, 2] {
        let drained: Vec<(i32, Vec<u8>)> = mailboxes
            .take_all(WorkerId::new(worker))
            .map(|packet| (packet.message().as_i32(), packet.payload().to_vec()))
            .collect();
        assert_eq!(drained, vec![(-1, Vec::new()), (9, b"hello".to_vec())]);
    }
    let root: Vec<i32> = mailboxes
        .take_all(WorkerId::new(0))
        .map(|packet| packet.message().as_i32())
        .collect();
    assert_eq!(root, vec![-1]);
    assert!(mailboxes.is_idle());
}

#[tokio::test]
async fn truncated_frame_is_an_error_at_end_of_stream() {
    let (mut client, server) = duplex(64);
    client
        .write_all(&[0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 8, b'a'])
        .await
        .expect("write");
    drop(client);

    let mut frames = FramedRead::new(server, PacketCodec::new());
    let outcome = frames.next().await.expect("an item");
    assert!(matches!(outcome, Err(PacketError::Io(_))));
}
