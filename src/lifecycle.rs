// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Reconnect loop, login/enrollment sequence, and the Running-state
//! receive loop that ties `Session`, `PanelModel` and the two sink traits
//! together.

use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use crate::codec::{self, AckNak, PanelEvent};
use crate::config::Config;
use crate::constant::{self, CommandId};
use crate::dispatcher::{Dispatcher, EventSink, LifecycleHook};
use crate::error::{AuthError, Error};
use crate::model::{PanelInfo, PanelModel};
use crate::session::{PendingMessage, Session};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const POST_CONNECT_DELAY: Duration = Duration::from_millis(500);
const OUTAGE_NOTIFICATION_THRESHOLD: Duration = Duration::from_secs(60);

/// Where the session currently is in the documented state machine.
/// `Running` is the only state in which the event dispatcher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingLogin,
    Authenticated,
    Enrolled,
    Running,
}

/// Move to `new`, logging the transition.
fn transition(state: &mut SessionState, new: SessionState) {
    log::debug!("session state: {:?} -> {:?}", *state, new);
    *state = new;
}

/// Drives one panel connection to completion: connects, logs in, enrolls,
/// and runs the receive loop, reconnecting on any connection-lost error.
///
/// Generic over the transport the way [`Session`] is, so tests can supply
/// an in-memory stream instead of a real `TcpStream`.
pub fn run<S, C>(
    config: &Config,
    mut connect: C,
    sink: &mut dyn EventSink,
    hook: &mut dyn LifecycleHook,
    mut should_stop: impl FnMut() -> bool,
) -> Result<(), Error>
where
    S: Read + Write,
    C: FnMut(&Config) -> Result<S, Error>,
{
    let mut disconnected_since: Option<Instant> = None;
    let mut outage_notified = false;
    let mut state = SessionState::Disconnected;

    while !should_stop() {
        transition(&mut state, SessionState::Connecting);
        let stream = match connect(config) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("connect failed: {}", e);
                transition(&mut state, SessionState::Disconnected);
                note_disconnect(&mut disconnected_since, &mut outage_notified, hook);
                thread::sleep(RECONNECT_DELAY);
                continue;
            }
        };

        let mut session = Session::new(stream);
        thread::sleep(POST_CONNECT_DELAY);
        transition(&mut state, SessionState::AwaitingLogin);

        let mut model = PanelModel::new();
        match enroll(&mut session, config, &mut model, sink, &mut state) {
            Ok(()) => {
                if outage_notified {
                    hook.connection_regained();
                }
                disconnected_since = None;
                outage_notified = false;
            }
            Err(e) => {
                log::warn!("enrollment failed: {}", e);
                transition(&mut state, SessionState::Disconnected);
                if e.is_connection_lost() {
                    note_disconnect(&mut disconnected_since, &mut outage_notified, hook);
                }
                thread::sleep(RECONNECT_DELAY);
                continue;
            }
        }

        transition(&mut state, SessionState::Running);
        if let Err(e) = run_receive_loop(&mut session, &mut model, sink, &mut should_stop) {
            log::warn!("receive loop ended: {}", e);
            transition(&mut state, SessionState::Disconnected);
            if e.is_connection_lost() {
                note_disconnect(&mut disconnected_since, &mut outage_notified, hook);
            }
            thread::sleep(RECONNECT_DELAY);
        }
    }
    Ok(())
}

fn note_disconnect(
    disconnected_since: &mut Option<Instant>,
    outage_notified: &mut bool,
    hook: &mut dyn LifecycleHook,
) {
    let since = *disconnected_since.get_or_insert_with(Instant::now);
    if !*outage_notified && Instant::now().duration_since(since) >= OUTAGE_NOTIFICATION_THRESHOLD {
        hook.connection_lost();
        *outage_notified = true;
    }
}

fn send<S: Read + Write>(
    session: &mut Session<S>,
    cmd: CommandId,
    body: &[u8],
    model: &mut PanelModel,
    sink: &mut dyn EventSink,
) -> Result<Vec<u8>, Error> {
    let raw = session.send_command(body, |msg| dispatch_message(msg, model, sink))?;
    codec::split_response(cmd, &raw)
}

/// Decode and apply an `M` frame observed while waiting for a response,
/// regardless of lifecycle phase — the panel does not suppress its event
/// stream during enrollment, so every phase must keep `PanelModel` current.
fn dispatch_message(msg: PendingMessage, model: &mut PanelModel, sink: &mut dyn EventSink) {
    match codec::decode_message(&msg.body) {
        Ok(event) => {
            apply_to_model(model, &event);
            Dispatcher::new(sink).dispatch(&event);
        }
        Err(e) => log::warn!("failed to decode message (seq {}): {}", msg.sequence, e),
    }
}

fn enroll<S: Read + Write>(
    session: &mut Session<S>,
    config: &Config,
    model: &mut PanelModel,
    sink: &mut dyn EventSink,
    state: &mut SessionState,
) -> Result<(), Error> {
    let login_body = codec::encode_login(&config.udl_password);
    let login_resp = session.send_command(&login_body, |msg| dispatch_message(msg, model, sink))?;
    let login_payload = codec::split_response(CommandId::Login, &login_resp)?;
    match codec::decode_ack_nak(&login_payload)? {
        AckNak::Ack => transition(state, SessionState::Authenticated),
        AckNak::Nak => return Err(Error::Authentication(AuthError::Nak)),
    }

    let set_events_body = codec::encode_set_event_messages();
    let resp = send(session, CommandId::SetEventMessages, &set_events_body, model, sink)?;
    match codec::decode_ack_nak(&resp)? {
        AckNak::Ack => transition(state, SessionState::Enrolled),
        AckNak::Nak => {
            return Err(Error::Protocol("SET_EVENT_MESSAGES was rejected".to_string()))
        }
    }

    let id_body = codec::encode_get_panel_identification();
    let id_resp = send(session, CommandId::GetPanelIdentification, &id_body, model, sink)?;
    let identification = codec::decode_panel_identification(&id_resp)?;
    let panel_info = PanelInfo::parse(&identification)?;
    let number_of_zones = panel_info.number_of_zones;
    model.panel_info = Some(panel_info);

    best_effort_datetime(session, model, sink);
    best_effort_system_power(session, model, sink);
    best_effort_log_pointer(session, model, sink);

    for zone in 1..=number_of_zones {
        let body = codec::encode_get_zone_details(zone as u8);
        match send(session, CommandId::GetZoneDetails, &body, model, sink)
            .and_then(|p| codec::decode_zone_details(&p))
        {
            Ok(details) => {
                let z = model.zone_mut(zone);
                z.set_static_attrs(details.zone_type, details.area_bitmap, details.text);
            }
            Err(e) => log::warn!("GET_ZONE_DETAILS({}) failed: {}", zone, e),
        }
    }

    if let Some(area_count) = constant::areas_for_zones(number_of_zones) {
        for area in 1..=area_count as u16 {
            let body = codec::encode_get_area_details(area as u8);
            match send(session, CommandId::GetAreaDetails, &body, model, sink)
                .and_then(|p| codec::decode_area_details(&p))
            {
                Ok(details) => {
                    let a = model.area_mut(area);
                    a.name = details.name;
                    a.exit_delay = details.exit_delay;
                    a.entry1_delay = details.entry1_delay;
                    a.entry2_delay = details.entry2_delay;
                    a.second_entry = details.second_entry;
                }
                Err(e) => log::warn!("GET_AREA_DETAILS({}) failed: {}", area, e),
            }
        }
    }

    if let Some(user_count) = constant::users_for_zones(number_of_zones) {
        for user in 1..=user_count as u16 {
            let body = codec::encode_get_user(user as u8);
            match send(session, CommandId::GetUser, &body, model, sink)
                .and_then(|p| codec::decode_user(&p))
            {
                Ok(details) => {
                    let u = model.user_mut(user);
                    u.name = details.name;
                    u.passcode = details.passcode;
                    u.tag = details.tag;
                    u.areas = details.areas;
                    u.modifiers = details.modifiers;
                    u.locks = details.locks;
                    u.doors = details.doors;
                    u.config = details.config;
                }
                Err(e) => log::warn!("GET_USER({}) failed: {}", user, e),
            }
        }
    }

    Ok(())
}

fn best_effort_datetime<S: Read + Write>(
    session: &mut Session<S>,
    model: &mut PanelModel,
    sink: &mut dyn EventSink,
) {
    let body = codec::encode_get_datetime();
    match send(session, CommandId::GetDateTime, &body, model, sink)
        .and_then(|p| codec::decode_datetime(&p))
    {
        Ok(dt) => log::debug!("panel datetime: {}", dt),
        Err(e) => log::warn!("GET_DATETIME failed: {}", e),
    }
}

fn best_effort_system_power<S: Read + Write>(
    session: &mut Session<S>,
    model: &mut PanelModel,
    sink: &mut dyn EventSink,
) {
    let body = codec::encode_get_system_power();
    match send(session, CommandId::GetSystemPower, &body, model, sink)
        .and_then(|p| codec::decode_system_power(&p))
    {
        Ok(power) => log::debug!(
            "system power: {:.2}V / battery {:.2}V",
            power.system_voltage,
            power.battery_voltage
        ),
        Err(e) => log::warn!("GET_SYSTEM_POWER failed: {}", e),
    }
}

fn best_effort_log_pointer<S: Read + Write>(
    session: &mut Session<S>,
    model: &mut PanelModel,
    sink: &mut dyn EventSink,
) {
    let body = codec::encode_get_log_pointer();
    match send(session, CommandId::GetLogPointer, &body, model, sink)
        .and_then(|p| codec::decode_log_pointer(&p))
    {
        Ok(ptr) => log::debug!("log pointer: {}", ptr),
        Err(e) => log::warn!("GET_LOG_POINTER failed: {}", e),
    }
}

fn run_receive_loop<S: Read + Write>(
    session: &mut Session<S>,
    model: &mut PanelModel,
    sink: &mut dyn EventSink,
    should_stop: &mut impl FnMut() -> bool,
) -> Result<(), Error> {
    while !should_stop() {
        if session.idle_keepalive_due(Instant::now()) {
            session.send_idle_keepalive(|msg| dispatch_message(msg, model, sink))?;
        }

        session.poll_once(|msg| dispatch_message(msg, model, sink))?;

        let now = Instant::now();
        for (number, zone) in model.zones.iter_mut() {
            if let Some(transition) = zone.update(now) {
                Dispatcher::new(sink).dispatch_zone_transition(*number, transition);
            }
        }
    }
    Ok(())
}

fn apply_to_model(model: &mut PanelModel, event: &PanelEvent) {
    match event {
        PanelEvent::Zone {
            zone_number,
            state_bitmap,
            ..
        } => {
            let zone = model.zone_mut(*zone_number);
            zone.apply(*state_bitmap, Instant::now());
        }
        PanelEvent::Area { area_number, state } => {
            model.area_mut(*area_number as u16).state = *state;
        }
        // User and log events do not mutate persistent model state.
        _ => {}
    }
}
