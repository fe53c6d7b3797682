//! Two threaded runtimes that each host part of a topology and exchange
//! packets over framed byte streams.

#![expect(clippy::expect_used, reason = "test assertions")]

use std::{
    io::{self, ErrorKind, Read, Write},
    ops::Range,
    sync::{Arc, Mutex, mpsc},
    thread,
};

use rstest::rstest;
use tokenflow::{
    context::NodeHandle,
    error::ConfigError,
    program::NodeProgram,
    runtime::{Runtime, ThreadedRuntime},
    topology::{NodeId, Topology},
    transition::{Firing, TransitionRegistry},
    transport::{
        Transport,
        wire::{WireTransport, forward_incoming},
    },
};

const PING: u32 = 7;

/// Writing half of an in-memory stream.
struct ChannelWriter(mpsc::Sender<Vec<u8>>);

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .send(buf.to_vec())
            .map_err(|_| io::Error::from(ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Reading half; reports end of stream once every writer is gone.
struct ChannelReader {
    chunks: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.chunks.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let count = self.pending.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

fn stream() -> (Arc<dyn Transport>, ChannelReader) {
    let (tx, rx) = mpsc::channel();
    let wire = Arc::new(WireTransport::new(ChannelWriter(tx))) as Arc<dyn Transport>;
    let reader = ChannelReader {
        chunks: rx,
        pending: Vec::new(),
    };
    (wire, reader)
}

/// Node 0 pings node 1, which records it and quits.
#[derive(Default)]
struct Ping {
    received: Mutex<Vec<(u32, Vec<u8>)>>,
}

fn send_ping(node: &mut NodeHandle, sent: &mut bool) -> Firing {
    if *sent || node.node().as_u32() != 0 {
        return Firing::NotFired;
    }
    node.send_bytes(NodeId::new(1), PING, b"x").expect("send ping");
    *sent = true;
    Firing::Fired
}

impl NodeProgram for Ping {
    type Places = bool;

    fn init(&self, _node: &mut NodeHandle, transitions: &mut TransitionRegistry<NodeHandle, bool>) -> bool {
        transitions.register(0, send_ping);
        false
    }

    fn receive(&self, node: &mut NodeHandle, _places: &mut bool, message: u32, payload: &[u8]) {
        self.received
            .lock()
            .expect("received lock")
            .push((message, payload.to_vec()));
        node.quit().expect("quit");
    }
}

#[test]
fn ping_and_halt_cross_the_link() {
    let program = Ping::default();
    let topology = Topology::new(2, 2).expect("topology");
    let (to_second, second_reads) = stream();
    let (to_first, first_reads) = stream();

    let (first, second, first_forwarded, second_forwarded) = thread::scope(|scope| {
        let mut first =
            ThreadedRuntime::with_link(topology, &program, 0..1, to_second).expect("first runtime");
        let mut second =
            ThreadedRuntime::with_link(topology, &program, 1..2, to_first).expect("second runtime");
        let first_inbound = first.inbound();
        let second_inbound = second.inbound();
        let first_forwarder = scope.spawn(move || forward_incoming(first_reads, &first_inbound));
        let second_forwarder = scope.spawn(move || forward_incoming(second_reads, &second_inbound));
        // Each runtime drops its end of the link when its thread finishes,
        // which ends the peer's forwarder.
        let first_run = scope.spawn(move || first.run());
        let second_run = scope.spawn(move || second.run());
        (
            first_run.join().expect("first thread").expect("first run"),
            second_run.join().expect("second thread").expect("second run"),
            first_forwarder.join().expect("forwarder").expect("forward"),
            second_forwarder.join().expect("forwarder").expect("forward"),
        )
    });

    assert_eq!(
        *program.received.lock().expect("received lock"),
        vec![(PING, b"x".to_vec())]
    );
    assert_eq!((first.workers, first.delivered), (1, 0));
    assert_eq!((second.workers, second.delivered), (1, 1));
    // The ping one way, the halt the other.
    assert_eq!((first_forwarded, second_forwarded), (1, 1));
}

#[rstest]
#[case(Range { start: 1, end: 1 })]
#[case(1..3)]
fn hosted_range_must_fit_the_topology(#[case] hosted: Range<u32>) {
    let topology = Topology::new(2, 2).expect("topology");
    let (remote, _reader) = stream();
    let (start, end) = (hosted.start, hosted.end);
    let err = ThreadedRuntime::with_link(topology, &Ping::default(), hosted, remote)
        .expect_err("invalid range");
    assert_eq!(err, ConfigError::HostedWorkers { start, end, workers: 2 });
}
