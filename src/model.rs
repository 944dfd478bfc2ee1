// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! In-memory representation of zones, areas, users and panel identity.
//!
//! Mutation happens only on the receive loop, via [`Zone::apply`] and the
//! area/user decode paths — no property-setter side effects, per the
//! "callback-driven property setters" re-architecture note.

use std::time::{Duration, Instant};

use crate::error::Error;

/// Default hold interval for `smoothed_active`.
pub const DEFAULT_SMOOTHED_ACTIVE_DELAY: Duration = Duration::from_secs(30);

/// A transition fired by [`Zone::apply`] or [`Zone::update`]. Each is fired
/// exactly once per actual state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneTransition {
    Active(bool),
    SmoothedActive(bool),
}

/// Static + dynamic state for a single zone input.
#[derive(Debug, Clone)]
pub struct Zone {
    number: u32,
    zone_type: u8,
    area_bitmap: u64,
    text: String,
    active: bool,
    active_since: Option<Instant>,
    last_active: Option<Instant>,
    smoothed_active: bool,
    smoothed_active_since: Option<Instant>,
    smoothed_active_delay: Duration,
}

impl Zone {
    pub fn new(number: u32) -> Zone {
        Zone {
            number,
            zone_type: 0,
            area_bitmap: 0,
            text: String::new(),
            active: false,
            active_since: None,
            last_active: None,
            smoothed_active: false,
            smoothed_active_since: None,
            smoothed_active_delay: DEFAULT_SMOOTHED_ACTIVE_DELAY,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn zone_type(&self) -> u8 {
        self.zone_type
    }

    pub fn area_bitmap(&self) -> u64 {
        self.area_bitmap
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn smoothed_active(&self) -> bool {
        self.smoothed_active
    }

    pub fn active_since(&self) -> Option<Instant> {
        self.active_since
    }

    pub fn last_active(&self) -> Option<Instant> {
        self.last_active
    }

    pub(crate) fn set_static_attrs(&mut self, zone_type: u8, area_bitmap: u64, text: String) {
        self.zone_type = zone_type;
        self.area_bitmap = area_bitmap;
        self.text = text;
    }

    pub fn set_smoothed_active_delay(&mut self, delay: Duration) {
        self.smoothed_active_delay = delay;
    }

    /// Apply a decoded zone-event state bitmap at time `now`, returning the
    /// transitions that occurred. `active` iff the low two bits equal 1.
    pub fn apply(&mut self, state_bitmap: u8, now: Instant) -> Vec<ZoneTransition> {
        let mut transitions = Vec::new();
        let active = (state_bitmap & 0x3) == 1;

        if active != self.active {
            self.active = active;
            transitions.push(ZoneTransition::Active(active));
            if active {
                self.active_since = Some(now);
                if !self.smoothed_active {
                    self.smoothed_active = true;
                    self.smoothed_active_since = Some(now);
                    transitions.push(ZoneTransition::SmoothedActive(true));
                }
            } else {
                self.last_active = Some(now);
                self.active_since = None;
            }
        }
        transitions
    }

    /// Called once per receive-loop tick. Clears `smoothed_active` once the
    /// hold interval has elapsed since the zone last went inactive.
    pub fn update(&mut self, now: Instant) -> Option<ZoneTransition> {
        if self.smoothed_active && !self.active {
            if let Some(last_active) = self.last_active {
                if now.duration_since(last_active) > self.smoothed_active_delay {
                    self.smoothed_active = false;
                    self.smoothed_active_since = None;
                    return Some(ZoneTransition::SmoothedActive(false));
                }
            }
        }
        None
    }
}

/// Arming state of an area, decoded from a single byte (0..5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaState {
    Disarmed,
    InExit,
    InEntry,
    Armed,
    PartArmed,
    InAlarm,
}

impl AreaState {
    pub fn from_byte(b: u8) -> Result<AreaState, Error> {
        match b {
            0 => Ok(AreaState::Disarmed),
            1 => Ok(AreaState::InExit),
            2 => Ok(AreaState::InEntry),
            3 => Ok(AreaState::Armed),
            4 => Ok(AreaState::PartArmed),
            5 => Ok(AreaState::InAlarm),
            other => Err(Error::Protocol(format!("invalid area state byte {}", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AreaState::Disarmed => "disarmed",
            AreaState::InExit => "in exit",
            AreaState::InEntry => "in entry",
            AreaState::Armed => "armed",
            AreaState::PartArmed => "part armed",
            AreaState::InAlarm => "in alarm",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Area {
    pub number: u16,
    pub name: String,
    pub exit_delay: u16,
    pub entry1_delay: u16,
    pub entry2_delay: u16,
    pub second_entry: u16,
    pub state: AreaState,
}

impl Area {
    pub fn new(number: u16) -> Area {
        Area {
            number,
            name: String::new(),
            exit_delay: 0,
            entry1_delay: 0,
            entry2_delay: 0,
            second_entry: 0,
            state: AreaState::Disarmed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub number: u16,
    pub name: String,
    pub passcode: String,
    pub tag: String,
    pub areas: u8,
    pub modifiers: u8,
    pub locks: u8,
    pub doors: [u8; 3],
    pub config: u16,
}

impl User {
    pub fn new(number: u16) -> User {
        User {
            number,
            name: String::new(),
            passcode: String::new(),
            tag: String::new(),
            areas: 0,
            modifiers: 0,
            locks: 0,
            doors: [0; 3],
            config: 0,
        }
    }

    /// Valid iff `passcode` or `tag` is non-empty.
    pub fn valid(&self) -> bool {
        !self.passcode.is_empty() || !self.tag.is_empty()
    }
}

/// Derived panel identity, from the space-separated identification string.
#[derive(Debug, Clone)]
pub struct PanelInfo {
    pub panel_type: String,
    pub firmware_version: String,
    pub number_of_zones: u32,
}

impl PanelInfo {
    /// Parse `<type> <zones> <x> <firmware>` as returned by
    /// `GET_PANEL_IDENTIFICATION`.
    pub fn parse(identification: &str) -> Result<PanelInfo, Error> {
        let fields: Vec<&str> = identification.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(Error::Protocol(format!(
                "unexpected panel identification string: {:?}",
                identification
            )));
        }
        let number_of_zones: u32 = fields[1].parse().map_err(|_| {
            Error::Protocol(format!("non-numeric zone count: {:?}", fields[1]))
        })?;
        if crate::constant::users_for_zones(number_of_zones).is_none() {
            return Err(Error::Protocol(format!(
                "unrecognised panel size: {} zones",
                number_of_zones
            )));
        }
        Ok(PanelInfo {
            panel_type: fields[0].to_string(),
            firmware_version: fields[3].to_string(),
            number_of_zones,
        })
    }
}

/// In-memory representation of zones, areas and users. Owned by the
/// Lifecycle Controller; mutated only on the receive loop's decode path.
#[derive(Debug, Clone, Default)]
pub struct PanelModel {
    pub panel_info: Option<PanelInfo>,
    pub zones: std::collections::HashMap<u32, Zone>,
    pub areas: std::collections::HashMap<u16, Area>,
    pub users: std::collections::HashMap<u16, User>,
}

impl PanelModel {
    pub fn new() -> PanelModel {
        PanelModel::default()
    }

    /// Get or create the zone with this 1-based number. Entries are
    /// created on first observation and never removed within a session.
    pub fn zone_mut(&mut self, number: u32) -> &mut Zone {
        self.zones.entry(number).or_insert_with(|| Zone::new(number))
    }

    pub fn area_mut(&mut self, number: u16) -> &mut Area {
        self.areas.entry(number).or_insert_with(|| Area::new(number))
    }

    pub fn user_mut(&mut self, number: u16) -> &mut User {
        self.users.entry(number).or_insert_with(|| User::new(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_active_transition_sets_smoothed() {
        let mut zone = Zone::new(73);
        let t0 = Instant::now();
        let transitions = zone.apply(0x11, t0); // state=1 (active), alarmed bit set
        assert!(zone.active());
        assert!(zone.smoothed_active());
        assert_eq!(
            transitions,
            vec![ZoneTransition::Active(true), ZoneTransition::SmoothedActive(true)]
        );
    }

    #[test]
    fn smoothed_active_holds_then_expires() {
        let mut zone = Zone::new(1);
        zone.set_smoothed_active_delay(Duration::from_millis(10));
        let t0 = Instant::now();
        zone.apply(0x01, t0);
        zone.apply(0x00, t0); // goes inactive immediately
        assert!(zone.smoothed_active());
        assert_eq!(zone.update(t0 + Duration::from_millis(5)), None);
        assert!(zone.smoothed_active());
        assert_eq!(
            zone.update(t0 + Duration::from_millis(20)),
            Some(ZoneTransition::SmoothedActive(false))
        );
        assert!(!zone.smoothed_active());
    }

    #[test]
    fn reactivation_restores_smoothed_active_immediately() {
        let mut zone = Zone::new(1);
        zone.set_smoothed_active_delay(Duration::from_millis(10));
        let t0 = Instant::now();
        zone.apply(0x01, t0);
        zone.apply(0x00, t0);
        zone.update(t0 + Duration::from_millis(20));
        assert!(!zone.smoothed_active());
        zone.apply(0x01, t0 + Duration::from_millis(21));
        assert!(zone.smoothed_active());
    }

    #[test]
    fn user_validity() {
        let mut user = User::new(1);
        assert!(!user.valid());
        user.passcode = "1234".to_string();
        assert!(user.valid());
    }

    #[test]
    fn panel_info_parses_identification_string() {
        let info = PanelInfo::parse("Premier 24 0 v4.01.01").unwrap();
        assert_eq!(info.panel_type, "Premier");
        assert_eq!(info.number_of_zones, 24);
        assert_eq!(info.firmware_version, "v4.01.01");
    }
}
