// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Concrete `TcpStream` transport: dials `host:port` and configures the
//! 2-second read/write timeout the Session's retry logic depends on.

use std::net::TcpStream;
use std::time::Duration;

use crate::config::Config;
use crate::error::Error;

/// Per-socket read/write timeout. The Session relies on reads timing out
/// after this long to drive its retry logic.
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

/// Dial the panel and configure timeouts. Used as the `connect` callback
/// passed to [`crate::lifecycle::run`].
pub fn connect(config: &Config) -> Result<TcpStream, Error> {
    let stream = TcpStream::connect(config.address())?;
    stream.set_read_timeout(Some(SOCKET_TIMEOUT))?;
    stream.set_write_timeout(Some(SOCKET_TIMEOUT))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
