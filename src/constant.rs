//! Fixed protocol tables: command ids, panel sizing tables, and the
//! zone-type / log-event / log-group string tables.

/// Command id, used as the first byte of every command body and echoed
/// back as the first byte of its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum CommandId {
    Login = 1,
    GetZoneDetails = 3,
    GetLcdDisplay = 13,
    GetLogPointer = 15,
    GetPanelIdentification = 22,
    GetDateTime = 23,
    GetSystemPower = 25,
    GetUser = 27,
    GetAreaDetails = 35,
    SetEventMessages = 37,
}

impl CommandId {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(b: u8) -> Option<CommandId> {
        match b {
            1 => Some(CommandId::Login),
            3 => Some(CommandId::GetZoneDetails),
            13 => Some(CommandId::GetLcdDisplay),
            15 => Some(CommandId::GetLogPointer),
            22 => Some(CommandId::GetPanelIdentification),
            23 => Some(CommandId::GetDateTime),
            25 => Some(CommandId::GetSystemPower),
            27 => Some(CommandId::GetUser),
            35 => Some(CommandId::GetAreaDetails),
            37 => Some(CommandId::SetEventMessages),
            _ => None,
        }
    }
}

pub const CMD_RESPONSE_ACK: u8 = 0x06;
pub const CMD_RESPONSE_NAK: u8 = 0x15;

/// Unsolicited message kinds, selected by the first body byte of an `M` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum MessageKind {
    Debug = 0,
    ZoneEvent = 1,
    AreaEvent = 2,
    OutputEvent = 3,
    UserEvent = 4,
    LogEvent = 5,
}

impl MessageKind {
    pub fn from_byte(b: u8) -> Option<MessageKind> {
        match b {
            0 => Some(MessageKind::Debug),
            1 => Some(MessageKind::ZoneEvent),
            2 => Some(MessageKind::AreaEvent),
            3 => Some(MessageKind::OutputEvent),
            4 => Some(MessageKind::UserEvent),
            5 => Some(MessageKind::LogEvent),
            _ => None,
        }
    }
}

/// `SET_EVENT_MESSAGES` flag bits.
pub const EVENT_FLAG_DEBUG: u16 = 1;
pub const EVENT_FLAG_ZONE: u16 = 1 << 1;
pub const EVENT_FLAG_AREA: u16 = 1 << 2;
pub const EVENT_FLAG_OUTPUT: u16 = 1 << 3;
pub const EVENT_FLAG_USER: u16 = 1 << 4;
pub const EVENT_FLAG_LOG: u16 = 1 << 5;

/// The flag set the core enables: everything except `debug`.
pub const EVENT_FLAGS_ENABLED: u16 =
    EVENT_FLAG_ZONE | EVENT_FLAG_AREA | EVENT_FLAG_OUTPUT | EVENT_FLAG_USER | EVENT_FLAG_LOG;

pub const ZONETYPE_UNUSED: u8 = 0;

/// Number of users a panel of a given zone count supports.
pub fn users_for_zones(number_of_zones: u32) -> Option<u32> {
    match number_of_zones {
        12 => Some(8),
        24 => Some(25),
        48 => Some(50),
        64 => Some(50),
        88 => Some(100),
        168 => Some(200),
        640 => Some(1000),
        _ => None,
    }
}

/// Number of areas a panel of a given zone count supports.
pub fn areas_for_zones(number_of_zones: u32) -> Option<u32> {
    match number_of_zones {
        12 => Some(2),
        24 => Some(2),
        48 => Some(4),
        64 => Some(4),
        88 => Some(8),
        168 => Some(16),
        640 => Some(64),
        _ => None,
    }
}

pub fn zone_type_name(zone_type: u8) -> &'static str {
    match zone_type {
        1 => "Entry/Exit 1",
        2 => "Entry/Exit 2",
        3 => "Interior",
        4 => "Perimeter",
        5 => "24hr Audible",
        6 => "24hr Silent",
        7 => "Audible PA",
        8 => "Silent PA",
        9 => "Fire Alarm",
        10 => "Medical",
        11 => "24Hr Gas Alarm",
        12 => "Auxiliary Alarm",
        13 => "24hr Tamper Alarm",
        14 => "Exit Terminator",
        15 => "Keyswitch - Momentary",
        16 => "Keyswitch - Latching",
        17 => "Security Key",
        18 => "Omit Key",
        19 => "Custom Alarm",
        20 => "Confirmed PA Audible",
        21 => "Confirmed PA Audible",
        _ => "Unknown",
    }
}

pub fn log_event_type_name(event_type: u8) -> &'static str {
    match event_type {
        1 => "Entry/Exit 1",
        2 => "Entry/Exit 2",
        3 => "Interior",
        4 => "Perimeter",
        5 => "24hr Audible",
        6 => "24hr Silent",
        7 => "Audible PA",
        8 => "Silent PA",
        9 => "Fire Alarm",
        10 => "Medical",
        11 => "24Hr Gas Alarm",
        12 => "Auxiliary Alarm",
        13 => "24hr Tamper Alarm",
        14 => "Exit Terminator",
        15 => "Keyswitch - Momentary",
        16 => "Keyswitch - Latching",
        17 => "Security Key",
        18 => "Omit Key",
        19 => "Custom Alarm",
        20 => "Confirmed PA Audible",
        21 => "Confirmed PA Audible",
        22 => "Keypad Medical",
        23 => "Keypad Fire",
        24 => "Keypad Audible PA",
        25 => "Keypad Silent PA",
        26 => "Duress Code Alarm",
        27 => "Alarm Active",
        28 => "Bell Active",
        29 => "Re-arm",
        30 => "Verified Cross Zone Alarm",
        31 => "User Code",
        32 => "Exit Started",
        33 => "Exit Error (Arming Failed)",
        34 => "Entry Started",
        35 => "Part Arm Suite",
        36 => "Armed with Line Fault",
        37 => "Open/Close (Away Armed)",
        38 => "Part Armed",
        39 => "Auto Open/Close",
        40 => "Auto Arm Deferred",
        41 => "Open After Alarm (Alarm Abort)",
        42 => "Remote Open/Close",
        43 => "Quick Arm",
        44 => "Recent Closing",
        45 => "Reset After Alarm",
        46 => "Power O/P Fault",
        47 => "AC Fail",
        48 => "Low Battery",
        49 => "System Power Up",
        50 => "Mains Over Voltage",
        51 => "Telephone Line Fault",
        52 => "Fail to Communicate",
        53 => "Download Start",
        54 => "Download End",
        55 => "Log Capacity Alert (80%)",
        56 => "Date Changed",
        57 => "Time Changed",
        58 => "Installer Programming Start",
        59 => "Installer Programming End",
        60 => "Panel Box Tamper",
        61 => "Bell Tamper",
        62 => "Auxiliary Tamper",
        63 => "Expander Tamper",
        64 => "Keypad Tamper",
        65 => "Expander Trouble (Network error)",
        66 => "Remote Keypad Trouble (Network error)",
        67 => "Fire Zone Tamper",
        68 => "Zone Tamper",
        69 => "Keypad Lockout",
        70 => "Code Tamper Alarm",
        71 => "Soak Test Alarm",
        72 => "Manual Test Transmission",
        73 => "Automatic Test Transmission",
        74 => "User Walk Test Start/End",
        75 => "NVM Defaults Loaded",
        76 => "First Knock",
        77 => "Door Access",
        78 => "Part Arm 1",
        79 => "Part Arm 2",
        80 => "Part Arm 3",
        81 => "Auto Arming Started",
        82 => "Confirmed Alarm",
        83 => "Prox Tag",
        84 => "Access Code Changed/Deleted",
        85 => "Arm Failed",
        86 => "Log Cleared",
        87 => "iD Loop Shorted",
        88 => "Communication Port",
        89 => "TAG System Exit (Batt. OK)",
        90 => "TAG System Exit (Batt. LOW)",
        91 => "TAG System Entry (Batt. OK)",
        92 => "TAG System Entry (Batt. LOW)",
        93 => "Microphone Activated",
        94 => "AV Cleared Down",
        95 => "Monitored Alarm",
        96 => "Expander Low Voltage",
        97 => "Supervision Fault",
        98 => "PA from Remote FOB",
        99 => "RF Device Low Battery",
        100 => "Site Data Changed",
        101 => "Radio Jamming",
        102 => "Test Call Passed",
        103 => "Test Call Failed",
        104 => "Zone Fault",
        105 => "Zone Masked",
        106 => "Faults Overridden",
        107 => "PSU AC Fail",
        108 => "PSU Battery Fail",
        109 => "PSU Low Output Fail",
        110 => "PSU Tamper",
        111 => "Door Access",
        112 => "CIE Reset",
        113 => "Remote Command",
        114 => "User Added",
        115 => "User Deleted",
        116 => "Confirmed PA",
        117 => "User Acknowledged",
        118 => "Power Unit Failure",
        119 => "Battery Charger Fault",
        120 => "Confirmed Intruder",
        121 => "GSM Tamper",
        122 => "Radio Config. Failure",
        _ => "Unknown log event type",
    }
}

pub fn log_event_group_name(group_type: u8) -> &'static str {
    match group_type {
        0 => "Not Reported",
        1 => "Priority Alarm",
        2 => "Priority Alarm Restore",
        3 => "Alarm",
        4 => "Restore",
        5 => "Open",
        6 => "Close",
        7 => "Bypassed",
        8 => "Unbypassed",
        9 => "Maintenance Alarm",
        10 => "Maintenance Restore",
        11 => "Tamper Alarm",
        12 => "Tamper Restore",
        13 => "Test Start",
        14 => "Test End",
        15 => "Disarmed",
        16 => "Armed",
        17 => "Tested",
        18 => "Started",
        19 => "Ended",
        20 => "Fault",
        21 => "Omitted",
        22 => "Reinstated",
        23 => "Stopped",
        24 => "Start",
        25 => "Deleted",
        26 => "Active",
        27 => "Not Used",
        28 => "Changed",
        29 => "Low Battery",
        30 => "Radio",
        31 => "Deactivated",
        32 => "Added",
        33 => "Bad Action",
        34 => "PA Timer Reset",
        35 => "PA Zone Lockout",
        _ => "Unknown log event group type",
    }
}

/// Fixed output-location names for indices 0..9; higher indices decompose
/// into network/device nibbles.
pub fn output_location_name(location: u8) -> String {
    const LOCATIONS: [&str; 10] = [
        "Panel outputs",
        "Digi outputs",
        "Digi Channel low 8",
        "Digi Channel high 8",
        "Redcare outputs",
        "Custom outputs 1",
        "Custom outputs 2",
        "Custom outputs 3",
        "Custom outputs 4",
        "X-10 outputs",
    ];
    if (location as usize) < LOCATIONS.len() {
        LOCATIONS[location as usize].to_string()
    } else {
        let network = location >> 4;
        let device = location & 0xF;
        if device == 0 {
            format!("Network {} keypad outputs", network)
        } else {
            format!("Network {} expander {} outputs", network, device)
        }
    }
}
