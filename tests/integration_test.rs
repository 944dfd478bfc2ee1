use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use texecom_connect::codec::PanelEvent;
use texecom_connect::config::Config;
use texecom_connect::constant::CommandId;
use texecom_connect::dispatcher::{EventSink, LifecycleHook};
use texecom_connect::packet::{Framer, MessageType};
use texecom_connect::{lifecycle, tcp};

/// A tiny stand-in panel: answers LOGIN, SET_EVENT_MESSAGES,
/// GET_PANEL_IDENTIFICATION, the three informational reads, and the
/// zone/area/user enrollment sweep for a 12-zone panel, then pushes one
/// unsolicited zone event before the test tears the connection down.
fn run_fake_panel(stream: TcpStream) {
    let mut framer = Framer::new(stream);
    // login, set_event_messages, panel id, datetime, system power, log pointer
    let fixed_commands = 6;
    let zones = 12u8;
    let areas = 2u8;
    let users = 8u8;
    let total = fixed_commands + zones as u32 + areas as u32 + users as u32;

    for _ in 0..total {
        let (msg_type, sequence, body) = match framer.read_packet() {
            Ok(v) => v,
            Err(_) => return,
        };
        if msg_type != MessageType::Command || body.is_empty() {
            return;
        }
        let cmd_id = body[0];
        let response_body = respond_to(cmd_id, &body[1..]);
        if framer
            .write_packet(MessageType::Response, sequence, &response_body)
            .is_err()
        {
            return;
        }
    }

    // Push one unsolicited zone-active event for zone 5.
    let _ = framer.write_packet(MessageType::Message, 0, &[1, 5, 0x01]);
    thread::sleep(Duration::from_millis(200));
}

fn respond_to(cmd_id: u8, args: &[u8]) -> Vec<u8> {
    let mut out = vec![cmd_id];
    if cmd_id == CommandId::Login.to_byte() || cmd_id == CommandId::SetEventMessages.to_byte() {
        out.push(0x06); // ack
    } else if cmd_id == CommandId::GetPanelIdentification.to_byte() {
        let mut text = b"Premier 12 0 v4.01.01".to_vec();
        text.resize(32, 0);
        out.extend_from_slice(&text);
    } else if cmd_id == CommandId::GetDateTime.to_byte() {
        out.extend_from_slice(&[1, 6, 24, 10, 30, 0]);
    } else if cmd_id == CommandId::GetSystemPower.to_byte() {
        out.extend_from_slice(&[100, 110, 108, 5, 4]);
    } else if cmd_id == CommandId::GetLogPointer.to_byte() {
        out.extend_from_slice(&[0, 1]);
    } else if cmd_id == CommandId::GetZoneDetails.to_byte() {
        out.push(3); // interior
        out.push(1); // area bitmap
        let mut text = b"Zone".to_vec();
        text.resize(32, 0);
        out.extend_from_slice(&text);
        let _ = args;
    } else if cmd_id == CommandId::GetAreaDetails.to_byte() {
        out.push(args.first().copied().unwrap_or(1));
        let mut name = b"Area".to_vec();
        name.resize(16, 0);
        out.extend_from_slice(&name);
        out.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
    } else if cmd_id == CommandId::GetUser.to_byte() {
        let mut name = b"User".to_vec();
        name.resize(8, 0);
        out.extend_from_slice(&name);
        out.extend_from_slice(&[0x12, 0x34, 0xFF]); // passcode BCD
        out.extend_from_slice(&[1, 0, 0]); // areas, modifiers, locks
        out.extend_from_slice(&[0, 0, 0]); // doors
        out.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]); // tag BCD, unset
        out.extend_from_slice(&[0, 0]); // config
    } else {
        out.push(0x15); // nak for anything unexpected
    }
    out
}

#[derive(Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<PanelEvent>>>,
    stop: Arc<AtomicBool>,
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &PanelEvent) {
        self.events.lock().unwrap().push(event.clone());
        if matches!(event, PanelEvent::Zone { .. }) {
            self.stop.store(true, Ordering::SeqCst);
        }
    }
}

impl LifecycleHook for RecordingSink {}

#[test]
fn full_enrollment_and_one_zone_event() {
    let _ = env_logger::try_init();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        run_fake_panel(stream);
    });

    let config = Config {
        host: addr.ip().to_string(),
        port: addr.port(),
        udl_password: "1234".to_string(),
    };

    let events = Arc::new(Mutex::new(Vec::new()));
    let stop = Arc::new(AtomicBool::new(false));
    let mut sink = RecordingSink {
        events: events.clone(),
        stop: stop.clone(),
    };
    let mut hook = RecordingSink::default();

    lifecycle::run(&config, tcp::connect, &mut sink, &mut hook, || {
        stop.load(Ordering::SeqCst)
    })
    .unwrap();

    server.join().unwrap();

    let seen = events.lock().unwrap();
    assert!(seen
        .iter()
        .any(|e| matches!(e, PanelEvent::Zone { zone_number: 5, .. })));
}
