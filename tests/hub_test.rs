//! End-to-end: message pump over a hub channel backed by an in-memory hub

use insteon_port::codec::RawCodec;
use insteon_port::error::{PortError, Result};
use insteon_port::transport::hub::{HubChannel, HubClient};
use insteon_port::{ByteChannel, Message, MessagePump, PortListener, PumpOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const RING_SIZE: usize = 32;

/// Hub whose modem echoes every send followed by an ACK byte
struct EchoHub {
    state: Mutex<HubState>,
}

struct HubState {
    ring: Vec<u8>,
    cursor: usize,
    sends: Vec<String>,
}

impl EchoHub {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HubState {
                ring: vec![b'0'; RING_SIZE],
                cursor: 0,
                sends: Vec::new(),
            }),
        })
    }
}

struct Client(Arc<EchoHub>);

impl HubClient for Client {
    fn fetch_buffer(&self) -> Result<String> {
        let state = self.0.state.lock();
        Ok(format!(
            "<response><BS>{}{:02X}</BS></response>",
            String::from_utf8_lossy(&state.ring),
            state.cursor
        ))
    }

    fn send_hex(&self, hex: &str) -> Result<()> {
        let mut state = self.0.state.lock();
        state.sends.push(hex.to_string());
        let echo = format!("{}06", hex.to_uppercase());
        for b in echo.bytes() {
            let at = state.cursor;
            state.ring[at] = b;
            state.cursor = (at + 1) % RING_SIZE;
        }
        Ok(())
    }

    fn clear_buffer(&self) -> Result<()> {
        let mut state = self.0.state.lock();
        state.ring = vec![b'0'; RING_SIZE];
        state.cursor = 0;
        Ok(())
    }
}

/// Hub that accepts the initial clear, then stops answering status requests
struct UnreachableHub;

impl HubClient for UnreachableHub {
    fn fetch_buffer(&self) -> Result<String> {
        Err(PortError::HubRequest {
            url: "http://hub/buffstatus.xml".into(),
            reason: "operation timed out".into(),
        })
    }

    fn send_hex(&self, _hex: &str) -> Result<()> {
        Ok(())
    }

    fn clear_buffer(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Received {
    messages: Mutex<Vec<Vec<u8>>>,
    disconnects: AtomicUsize,
}

impl PortListener for Received {
    fn disconnected(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn message_received(&self, msg: &Message) {
        self.messages.lock().push(msg.data().to_vec());
    }

    fn message_sent(&self, _msg: &Message) {}
}

#[test]
fn test_pump_over_hub_survives_ring_wraparound() {
    let hub = EchoHub::new();
    let channel = HubChannel::new(Box::new(Client(hub.clone())), Duration::from_millis(10));
    let options = PumpOptions {
        ack_timeout: Duration::from_secs(2),
        ..PumpOptions::default()
    };
    let pump = MessagePump::new(Box::new(channel), Box::new(RawCodec::new()), options);
    let received = Arc::new(Received::default());
    pump.add_listener(received.clone());
    pump.start().unwrap();

    // Four 4-byte sends with 10-character echoes: the last one wraps the ring
    let payloads: Vec<Vec<u8>> = (1..=4u8).map(|i| vec![0x02, 0x62, 0xA0, i]).collect();
    for p in &payloads {
        assert!(pump.write(Message::new(p.clone())));
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while received.messages.lock().len() < 4 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    let expected: Vec<Vec<u8>> = payloads
        .iter()
        .map(|p| {
            let mut echo = p.clone();
            echo.push(0x06);
            echo
        })
        .collect();
    assert_eq!(*received.messages.lock(), expected);
    assert_eq!(hub.state.lock().sends.len(), 4);
    assert_eq!(pump.stats().retransmissions, 0);
    pump.stop();
}

#[test]
fn test_hub_channel_close_ends_stream() {
    let hub = EchoHub::new();
    let channel = Arc::new(HubChannel::new(
        Box::new(Client(hub)),
        Duration::from_millis(10),
    ));
    channel.open().unwrap();

    let reader = {
        let channel = channel.clone();
        thread::spawn(move || channel.read(&mut [0u8; 16]))
    };
    thread::sleep(Duration::from_millis(50));
    channel.close();

    assert_eq!(reader.join().unwrap().unwrap(), 0);
    assert!(!channel.is_open());
}

#[test]
fn test_unreachable_hub_disconnects_pump() {
    let channel = HubChannel::new(Box::new(UnreachableHub), Duration::from_millis(20));
    let pump = MessagePump::new(
        Box::new(channel),
        Box::new(RawCodec::new()),
        PumpOptions::default(),
    );
    let received = Arc::new(Received::default());
    pump.add_listener(received.clone());
    pump.start().unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while received.disconnects.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(received.disconnects.load(Ordering::SeqCst), 1);
    assert!(!pump.is_running());
    pump.stop();
    assert_eq!(received.disconnects.load(Ordering::SeqCst), 1);
}
