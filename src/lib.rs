// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! A client for the Texecom Connect serial-over-TCP protocol spoken by
//! Premier-range intruder alarm panels: framing, CRC, sequencing,
//! command/event interleaving, retry and idle keepalive, decoding of every
//! documented message into a panel object graph, and a reconnecting
//! session lifecycle.
//!
//! # Examples
//! ```no_run
//! use texecom_connect::config::Config;
//! use texecom_connect::dispatcher::NullSink;
//! use texecom_connect::{lifecycle, tcp};
//!
//! # fn main() {
//! let config = Config::from_env();
//! let mut sink = NullSink;
//! let mut hook = NullSink;
//! let _ = lifecycle::run(&config, tcp::connect, &mut sink, &mut hook, || false);
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod constant;
pub mod crc;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod packet;
pub mod session;
pub mod tcp;
