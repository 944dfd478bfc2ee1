// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Encodes command bodies; decodes each response and each unsolicited
//! message kind into typed values.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};

use crate::constant::{self, CommandId, MessageKind};
use crate::error::{AuthError, Error};
use crate::model::AreaState;

// ---------------------------------------------------------------------
// Command encoding
// ---------------------------------------------------------------------

fn body_with_cmd(cmd: CommandId, args: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(1 + args.len());
    body.push(cmd.to_byte());
    body.extend_from_slice(args);
    body
}

pub fn encode_login(udl_password: &str) -> Vec<u8> {
    body_with_cmd(CommandId::Login, udl_password.as_bytes())
}

pub fn encode_get_zone_details(zone_number: u8) -> Vec<u8> {
    body_with_cmd(CommandId::GetZoneDetails, &[zone_number])
}

pub fn encode_get_lcd_display() -> Vec<u8> {
    body_with_cmd(CommandId::GetLcdDisplay, &[])
}

pub fn encode_get_log_pointer() -> Vec<u8> {
    body_with_cmd(CommandId::GetLogPointer, &[])
}

pub fn encode_get_panel_identification() -> Vec<u8> {
    body_with_cmd(CommandId::GetPanelIdentification, &[])
}

pub fn encode_get_datetime() -> Vec<u8> {
    body_with_cmd(CommandId::GetDateTime, &[])
}

pub fn encode_get_system_power() -> Vec<u8> {
    body_with_cmd(CommandId::GetSystemPower, &[])
}

pub fn encode_get_user(user_number: u8) -> Vec<u8> {
    body_with_cmd(CommandId::GetUser, &[user_number])
}

pub fn encode_get_area_details(area_number: u8) -> Vec<u8> {
    body_with_cmd(CommandId::GetAreaDetails, &[area_number])
}

/// Enables zone|area|output|user|log (everything except debug).
pub fn encode_set_event_messages() -> Vec<u8> {
    let flags = constant::EVENT_FLAGS_ENABLED;
    body_with_cmd(
        CommandId::SetEventMessages,
        &[(flags & 0xFF) as u8, (flags >> 8) as u8],
    )
}

// ---------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------

/// Strip and validate the echoed command id from a response body, except
/// for the one documented exception: LOGIN echoed with a NAK payload means
/// "session timed out, must reconnect", not "wrong command".
pub fn split_response(expected: CommandId, response: &[u8]) -> Result<Vec<u8>, Error> {
    if response.is_empty() {
        return Err(Error::Protocol("empty response body".to_string()));
    }
    let (commandid_byte, payload) = (response[0], &response[1..]);
    if commandid_byte != expected.to_byte() {
        if commandid_byte == CommandId::Login.to_byte()
            && payload.first() == Some(&constant::CMD_RESPONSE_NAK)
        {
            return Err(Error::Authentication(AuthError::SessionTimedOut));
        }
        return Err(Error::Protocol(format!(
            "response for wrong command id: expected {:#x}, got {:#x}",
            expected.to_byte(),
            commandid_byte
        )));
    }
    Ok(payload.to_vec())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckNak {
    Ack,
    Nak,
}

pub fn decode_ack_nak(payload: &[u8]) -> Result<AckNak, Error> {
    match payload.first() {
        Some(&constant::CMD_RESPONSE_ACK) => Ok(AckNak::Ack),
        Some(&constant::CMD_RESPONSE_NAK) => Ok(AckNak::Nak),
        _ => Err(Error::Protocol(format!(
            "unexpected ack/nak payload: {:?}",
            payload
        ))),
    }
}

pub fn decode_datetime(payload: &[u8]) -> Result<NaiveDateTime, Error> {
    if payload.len() < 6 {
        return Err(Error::Protocol("GETDATETIME: response too short".to_string()));
    }
    let (day, month, year, hour, minute, second) = (
        payload[0] as u32,
        payload[1] as u32,
        2000 + payload[2] as i32,
        payload[3] as u32,
        payload[4] as u32,
        payload[5] as u32,
    );
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| Error::Protocol(format!("invalid panel date/time in {:?}", payload)))
}

pub fn decode_lcd_display(payload: &[u8]) -> Result<String, Error> {
    if payload.len() != 32 {
        return Err(Error::Protocol(format!(
            "GETLCDDISPLAY: response wrong length {}",
            payload.len()
        )));
    }
    Ok(String::from_utf8_lossy(payload).trim_end_matches('\0').to_string())
}

pub fn decode_panel_identification(payload: &[u8]) -> Result<String, Error> {
    if payload.len() != 32 {
        return Err(Error::Protocol(format!(
            "GETPANELIDENTIFICATION: response wrong length {}",
            payload.len()
        )));
    }
    Ok(String::from_utf8_lossy(payload).trim_end_matches('\0').trim().to_string())
}

pub fn decode_log_pointer(payload: &[u8]) -> Result<u16, Error> {
    if payload.len() != 2 {
        return Err(Error::Protocol(format!(
            "GETLOGPOINTER: response wrong length {}",
            payload.len()
        )));
    }
    Ok(LittleEndian::read_u16(payload))
}

#[derive(Debug, Clone, Copy)]
pub struct SystemPower {
    pub system_voltage: f32,
    pub battery_voltage: f32,
    pub system_current_ma: i32,
    pub battery_current_ma: i32,
}

pub fn decode_system_power(payload: &[u8]) -> Result<SystemPower, Error> {
    if payload.len() != 5 {
        return Err(Error::Protocol(format!(
            "GETSYSTEMPOWER: response wrong length {}",
            payload.len()
        )));
    }
    let (ref_v, sys_v, bat_v, sys_i, bat_i) = (
        payload[0] as i32,
        payload[1] as i32,
        payload[2] as i32,
        payload[3] as i32,
        payload[4] as i32,
    );
    Ok(SystemPower {
        system_voltage: 13.7 + ((sys_v - ref_v) as f32) * 0.070,
        battery_voltage: 13.7 + ((bat_v - ref_v) as f32) * 0.070,
        system_current_ma: sys_i * 9,
        battery_current_ma: bat_i * 9,
    })
}

/// Collapse NUL bytes to spaces, collapse runs of non-word characters to a
/// single space, and trim, the way zone/area/user text labels are cleaned.
pub fn clean_text(raw: &[u8]) -> String {
    let replaced: String = raw
        .iter()
        .map(|&b| if b == 0 { ' ' } else { b as char })
        .collect();
    let mut cleaned = String::with_capacity(replaced.len());
    let mut last_was_space = false;
    for ch in replaced.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            cleaned.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            cleaned.push(' ');
            last_was_space = true;
        }
    }
    cleaned.trim().to_string()
}

#[derive(Debug, Clone)]
pub struct ZoneDetails {
    pub zone_type: u8,
    pub area_bitmap: u64,
    pub text: String,
}

pub fn decode_zone_details(payload: &[u8]) -> Result<ZoneDetails, Error> {
    let (zone_type, area_bitmap, text_start) = match payload.len() {
        34 => (payload[0], payload[1] as u64, 2),
        35 => (payload[0], LittleEndian::read_u16(&payload[1..3]) as u64, 3),
        41 => (payload[0], LittleEndian::read_u64(&payload[1..9]), 9),
        other => {
            return Err(Error::Protocol(format!(
                "GETZONEDETAILS: response wrong length {}",
                other
            )))
        }
    };
    Ok(ZoneDetails {
        zone_type,
        area_bitmap,
        text: clean_text(&payload[text_start..]),
    })
}

#[derive(Debug, Clone)]
pub struct AreaDetails {
    pub number: u8,
    pub name: String,
    pub exit_delay: u16,
    pub entry1_delay: u16,
    pub entry2_delay: u16,
    pub second_entry: u16,
}

pub fn decode_area_details(payload: &[u8]) -> Result<AreaDetails, Error> {
    if payload.len() != 25 {
        return Err(Error::Protocol(format!(
            "GETAREADETAILS: response wrong length {}",
            payload.len()
        )));
    }
    Ok(AreaDetails {
        number: payload[0],
        name: clean_text(&payload[1..17]),
        exit_delay: LittleEndian::read_u16(&payload[17..19]),
        entry1_delay: LittleEndian::read_u16(&payload[19..21]),
        entry2_delay: LittleEndian::read_u16(&payload[21..23]),
        second_entry: LittleEndian::read_u16(&payload[23..25]),
    })
}

/// Decode a BCD-packed byte string into its decimal digit string, skipping
/// any nibble greater than 9 — this naturally drops the `GET_USER` tag
/// field's trailing `0xFF` sentinel byte.
pub fn bcd_decode(bcd: &[u8]) -> String {
    let mut result = String::with_capacity(bcd.len() * 2);
    for &byte in bcd {
        for val in [byte >> 4, byte & 0xF] {
            if val <= 9 {
                result.push((b'0' + val) as char);
            }
        }
    }
    result
}

#[derive(Debug, Clone)]
pub struct UserDetails {
    pub name: String,
    pub passcode: String,
    pub tag: String,
    pub areas: u8,
    pub modifiers: u8,
    pub locks: u8,
    pub doors: [u8; 3],
    pub config: u16,
}

pub fn decode_user(payload: &[u8]) -> Result<UserDetails, Error> {
    if payload.len() != 23 {
        return Err(Error::Protocol(format!(
            "GETUSER: unexpected response length {}",
            payload.len()
        )));
    }
    Ok(UserDetails {
        name: clean_text(&payload[0..8]),
        passcode: bcd_decode(&payload[8..11]),
        areas: payload[11],
        modifiers: payload[12],
        locks: payload[13],
        doors: [payload[14], payload[15], payload[16]],
        tag: bcd_decode(&payload[17..21]),
        config: LittleEndian::read_u16(&payload[21..23]),
    })
}

// ---------------------------------------------------------------------
// Unsolicited message decoding
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Secure,
    Active,
    Tamper,
    Short,
}

impl ZoneState {
    fn from_bits(bits: u8) -> ZoneState {
        match bits & 0x3 {
            0 => ZoneState::Secure,
            1 => ZoneState::Active,
            2 => ZoneState::Tamper,
            _ => ZoneState::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneFlags {
    pub fault: bool,
    pub failed_test: bool,
    pub alarmed: bool,
    pub manual_bypass: bool,
    pub auto_bypass: bool,
    pub masked: bool,
}

impl ZoneFlags {
    fn from_bitmap(bitmap: u8) -> ZoneFlags {
        ZoneFlags {
            fault: bitmap & (1 << 2) != 0,
            failed_test: bitmap & (1 << 3) != 0,
            alarmed: bitmap & (1 << 4) != 0,
            manual_bypass: bitmap & (1 << 5) != 0,
            auto_bypass: bitmap & (1 << 6) != 0,
            masked: bitmap & (1 << 7) != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLogonMethod {
    Code,
    Tag,
    CodeAndTag,
}

impl UserLogonMethod {
    fn from_byte(b: u8) -> Result<UserLogonMethod, Error> {
        match b {
            0 => Ok(UserLogonMethod::Code),
            1 => Ok(UserLogonMethod::Tag),
            2 => Ok(UserLogonMethod::CodeAndTag),
            other => Err(Error::Protocol(format!("invalid user logon method {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub event_type: u8,
    pub event_type_name: &'static str,
    pub group_type: u8,
    pub group_type_name: &'static str,
    pub comm_delayed: bool,
    pub communicated: bool,
    pub parameter: u16,
    pub areas: u16,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub enum PanelEvent {
    Debug(Vec<u8>),
    Zone {
        zone_number: u32,
        state: ZoneState,
        state_bitmap: u8,
        flags: ZoneFlags,
    },
    Area {
        area_number: u8,
        state: AreaState,
    },
    Output {
        location: u8,
        location_name: String,
        state: u8,
    },
    User {
        user_number: u8,
        method: UserLogonMethod,
    },
    Log(LogEvent),
}

pub fn decode_message(body: &[u8]) -> Result<PanelEvent, Error> {
    if body.is_empty() {
        return Err(Error::Protocol("empty message body".to_string()));
    }
    let (kind_byte, payload) = (body[0], &body[1..]);
    let kind = MessageKind::from_byte(kind_byte)
        .ok_or_else(|| Error::Protocol(format!("unknown message type {}", kind_byte)))?;

    match kind {
        MessageKind::Debug => Ok(PanelEvent::Debug(payload.to_vec())),
        MessageKind::ZoneEvent => decode_zone_event(payload),
        MessageKind::AreaEvent => decode_area_event(payload),
        MessageKind::OutputEvent => decode_output_event(payload),
        MessageKind::UserEvent => decode_user_event(payload),
        MessageKind::LogEvent => decode_log_event(payload).map(PanelEvent::Log),
    }
}

fn decode_zone_event(payload: &[u8]) -> Result<PanelEvent, Error> {
    let (zone_number, bitmap) = match payload.len() {
        2 => (payload[0] as u32, payload[1]),
        3 => (LittleEndian::read_u16(&payload[0..2]) as u32, payload[2]),
        other => {
            return Err(Error::Protocol(format!(
                "unknown zone event message payload length {}",
                other
            )))
        }
    };
    Ok(PanelEvent::Zone {
        zone_number,
        state: ZoneState::from_bits(bitmap),
        state_bitmap: bitmap,
        flags: ZoneFlags::from_bitmap(bitmap),
    })
}

fn decode_area_event(payload: &[u8]) -> Result<PanelEvent, Error> {
    if payload.len() != 2 {
        return Err(Error::Protocol(format!(
            "unknown area event message payload length {}",
            payload.len()
        )));
    }
    Ok(PanelEvent::Area {
        area_number: payload[0],
        state: AreaState::from_byte(payload[1])?,
    })
}

fn decode_output_event(payload: &[u8]) -> Result<PanelEvent, Error> {
    if payload.len() != 2 {
        return Err(Error::Protocol(format!(
            "unknown output event message payload length {}",
            payload.len()
        )));
    }
    Ok(PanelEvent::Output {
        location: payload[0],
        location_name: constant::output_location_name(payload[0]),
        state: payload[1],
    })
}

fn decode_user_event(payload: &[u8]) -> Result<PanelEvent, Error> {
    if payload.len() != 2 {
        return Err(Error::Protocol(format!(
            "unknown user event message payload length {}",
            payload.len()
        )));
    }
    Ok(PanelEvent::User {
        user_number: payload[0],
        method: UserLogonMethod::from_byte(payload[1])?,
    })
}

fn decode_log_event(payload: &[u8]) -> Result<LogEvent, Error> {
    let (parameter, areas, timestamp_bytes) = match payload.len() {
        8 => (
            payload[2] as u16,
            payload[3] as u16,
            &payload[4..8],
        ),
        // Premier 168 — 16 bits of area info, high byte at the end.
        9 => (
            payload[2] as u16,
            payload[3] as u16 | ((payload[8] as u16) << 8),
            &payload[4..8],
        ),
        // Premier 640 — inferred, not confirmed against real hardware.
        10 => (
            LittleEndian::read_u16(&payload[2..4]),
            LittleEndian::read_u16(&payload[4..6]),
            &payload[6..10],
        ),
        other => {
            return Err(Error::Protocol(format!(
                "unknown log event message payload length {}",
                other
            )))
        }
    };

    let event_type = payload[0];
    let group_type_byte = payload[1];
    let timestamp_int = LittleEndian::read_u32(timestamp_bytes);

    let seconds = timestamp_int & 0x3F;
    let minutes = (timestamp_int >> 6) & 0x3F;
    let month = (timestamp_int >> 12) & 0xF;
    let hours = (timestamp_int >> 16) & 0x1F;
    let day = (timestamp_int >> 21) & 0x1F;
    let year = 2000 + ((timestamp_int >> 26) & 0x3F);

    let timestamp = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
        .ok_or_else(|| Error::Protocol(format!("invalid log event timestamp {:#x}", timestamp_int)))?;

    let group_type = group_type_byte & 0b0011_1111;
    let comm_delayed = group_type_byte & 0b0100_0000 != 0;
    let communicated = group_type_byte & 0b1000_0000 != 0;

    Ok(LogEvent {
        event_type,
        event_type_name: constant::log_event_type_name(event_type),
        group_type,
        group_type_name: constant::log_event_group_name(group_type),
        comm_delayed,
        communicated,
        parameter,
        areas,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_decode_matches_worked_example() {
        // day=30(0x1E) month=11(0x0B) year=23(0x17) hour=5 minute=42(0x2A) second=7
        let payload = [0x1E, 0x0B, 0x17, 0x05, 0x2A, 0x07];
        let dt = decode_datetime(&payload).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-11-30 05:42:07");
    }

    #[test]
    fn zone_event_two_byte() {
        let event = decode_message(&[1, 0x49, 0x11]).unwrap();
        match event {
            PanelEvent::Zone {
                zone_number,
                state,
                flags,
                ..
            } => {
                assert_eq!(zone_number, 73);
                assert_eq!(state, ZoneState::Active);
                assert!(flags.alarmed);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn zone_event_three_byte_wide_panel() {
        let event = decode_message(&[1, 0x40, 0x01, 0x01]).unwrap();
        match event {
            PanelEvent::Zone {
                zone_number, state, ..
            } => {
                assert_eq!(zone_number, 320);
                assert_eq!(state, ZoneState::Active);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn zone_details_dispatches_on_length() {
        let mut payload = vec![3u8, 0x01];
        payload.extend_from_slice(b"Front Door\0\0");
        let details = decode_zone_details(&payload_of_len(34, &payload)).unwrap();
        assert_eq!(details.zone_type, 3);
        assert_eq!(details.area_bitmap, 1);
        assert_eq!(details.text, "Front Door");
    }

    #[test]
    fn zone_details_rejects_unknown_length() {
        let payload = vec![0u8; 12];
        assert!(decode_zone_details(&payload).is_err());
    }

    fn payload_of_len(len: usize, prefix_and_text: &[u8]) -> Vec<u8> {
        let mut v = prefix_and_text.to_vec();
        v.resize(len, 0);
        v
    }

    #[test]
    fn clean_text_collapses_and_trims() {
        assert_eq!(clean_text(b"Front\0\0Door!!"), "Front Door");
    }

    #[test]
    fn bcd_decode_skips_sentinel() {
        assert_eq!(bcd_decode(&[0x12, 0x34, 0xFF, 0xFF]), "1234");
    }

    #[test]
    fn user_roundtrip_shape() {
        let mut payload = vec![0u8; 23];
        payload[0..4].copy_from_slice(b"Bob\0");
        payload[8..11].copy_from_slice(&[0x12, 0x34, 0xFF]);
        payload[17..21].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        let user = decode_user(&payload).unwrap();
        assert_eq!(user.name, "Bob");
        assert_eq!(user.passcode, "1234");
        assert_eq!(user.tag, "");
    }

    #[test]
    fn output_event_names_fixed_table_entry() {
        let event = decode_message(&[3, 4, 0x01]).unwrap();
        match event {
            PanelEvent::Output {
                location,
                location_name,
                state,
            } => {
                assert_eq!(location, 4);
                assert_eq!(location_name, "Redcare outputs");
                assert_eq!(state, 0x01);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn output_event_names_network_expander() {
        // network=2, device=3 (non-zero) -> expander, not keypad
        let event = decode_message(&[3, 0x23, 0x00]).unwrap();
        match event {
            PanelEvent::Output { location_name, .. } => {
                assert_eq!(location_name, "Network 2 expander 3 outputs");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn log_event_eight_byte_layout() {
        // event_type=1, group_type=16 (Armed), parameter=2, areas=1, timestamp bits below
        let timestamp: u32 = 7 | (42 << 6) | (11 << 12) | (5 << 16) | (30 << 21) | (23 << 26);
        let mut payload = vec![1u8, 16, 2, 1];
        payload.extend_from_slice(&timestamp.to_le_bytes());
        let event = decode_message(&{
            let mut m = vec![5u8];
            m.extend_from_slice(&payload);
            m
        })
        .unwrap();
        match event {
            PanelEvent::Log(log) => {
                assert_eq!(log.event_type_name, "Entry/Exit 1");
                assert_eq!(log.group_type_name, "Armed");
                assert_eq!(log.parameter, 2);
                assert_eq!(log.areas, 1);
                assert_eq!(
                    log.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    "2023-11-30 05:42:07"
                );
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn response_rejects_mismatched_command_id() {
        let err = split_response(CommandId::GetDateTime, &[CommandId::GetLogPointer.to_byte(), 0])
            .unwrap_err();
        match err {
            Error::Protocol(_) => {}
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn login_nak_on_other_command_means_session_timeout() {
        let err = split_response(
            CommandId::GetDateTime,
            &[CommandId::Login.to_byte(), constant::CMD_RESPONSE_NAK],
        )
        .unwrap_err();
        match err {
            Error::Authentication(AuthError::SessionTimedOut) => {}
            other => panic!("expected session-timeout error, got {:?}", other),
        }
    }
}
