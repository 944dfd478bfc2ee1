// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Framing: reads and writes length-prefixed, CRC-checked packets on a
//! byte-oriented transport.

use std::io::{Read, Write};

use crate::crc::crc8;
use crate::error::{Error, TransportError};

const HEADER_START: u8 = b't';
const LENGTH_HEADER: usize = 4;

/// The three frame kinds the protocol exchanges over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// `C` — a command sent by us.
    Command,
    /// `R` — a response to a command, echoing its sequence number.
    Response,
    /// `M` — an unsolicited message (event) from the panel.
    Message,
}

impl MessageType {
    fn to_byte(self) -> u8 {
        match self {
            MessageType::Command => b'C',
            MessageType::Response => b'R',
            MessageType::Message => b'M',
        }
    }

    fn from_byte(b: u8) -> Option<MessageType> {
        match b {
            b'C' => Some(MessageType::Command),
            b'R' => Some(MessageType::Response),
            b'M' => Some(MessageType::Message),
            _ => None,
        }
    }
}

/// Reads and writes packets on a transport `S`.
///
/// Generic over the underlying stream so tests can drive it over an
/// in-memory buffer; the Session owns the concrete `TcpStream` instance.
pub struct Framer<S> {
    stream: S,
}

impl<S: Read + Write> Framer<S> {
    pub fn new(stream: S) -> Framer<S> {
        Framer { stream }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Compose a header with the correct length and `sequence`, append the
    /// CRC, and write the whole frame in a single call.
    pub fn write_packet(
        &mut self,
        msg_type: MessageType,
        sequence: u8,
        body: &[u8],
    ) -> Result<(), Error> {
        let frame = encode_frame(msg_type, sequence, body);
        self.stream.write_all(&frame)?;
        Ok(())
    }

    /// Read one packet, skipping over short frames (logged and discarded,
    /// per the framing error policy) until a complete frame, a CRC error, a
    /// connection-lost condition, or EOF is encountered.
    pub fn read_packet(&mut self) -> Result<(MessageType, u8, Vec<u8>), Error> {
        loop {
            let mut header = [0u8; LENGTH_HEADER];
            let n = read_some(&mut self.stream, &mut header)?;

            if n >= 3 && &header[..3] == b"+++" {
                return Err(Error::Transport(TransportError::Hangup));
            }
            if n < LENGTH_HEADER {
                // Fewer than four bytes before EOF: the panel closed the connection.
                return Err(Error::Transport(TransportError::Eof));
            }
            if header[0] != HEADER_START {
                return Err(Error::Framing(format!(
                    "unexpected start byte: {:#x}",
                    header[0]
                )));
            }
            let msg_type = match MessageType::from_byte(header[1]) {
                Some(t) => t,
                None => {
                    return Err(Error::Framing(format!(
                        "unexpected frame type byte: {:#x}",
                        header[1]
                    )))
                }
            };
            let total_length = header[2] as usize;
            let sequence = header[3];

            if total_length < LENGTH_HEADER + 1 {
                log::warn!("frame length {} too short to hold a CRC, ignoring", total_length);
                continue;
            }
            let rest_len = total_length - LENGTH_HEADER;
            let mut rest = vec![0u8; rest_len];
            let got = read_some(&mut self.stream, &mut rest)?;
            if got < rest_len {
                log::warn!(
                    "frame body shorter than expected - got {} bytes, expected {}",
                    got,
                    rest_len
                );
                continue;
            }

            let crc_byte = rest[rest_len - 1];
            let body = rest[..rest_len - 1].to_vec();

            let mut crc_input = Vec::with_capacity(LENGTH_HEADER + body.len());
            crc_input.extend_from_slice(&header);
            crc_input.extend_from_slice(&body);
            let expected = crc8(&crc_input);
            if expected != crc_byte {
                return Err(Error::Framing(format!(
                    "crc mismatch: expected={} actual={}",
                    expected, crc_byte
                )));
            }

            return Ok((msg_type, sequence, body));
        }
    }
}

fn encode_frame(msg_type: MessageType, sequence: u8, body: &[u8]) -> Vec<u8> {
    let total_length = (LENGTH_HEADER + body.len() + 1) as u8;
    let mut frame = Vec::with_capacity(total_length as usize);
    frame.push(HEADER_START);
    frame.push(msg_type.to_byte());
    frame.push(total_length);
    frame.push(sequence);
    frame.extend_from_slice(body);
    let crc = crc8(&frame);
    frame.push(crc);
    frame
}

/// Read into `buf` until it is full or the stream returns EOF (a `read`
/// that yields 0), looping over short reads the way a blocking socket can
/// produce them. Returns the number of bytes actually read.
fn read_some<S: Read>(stream: &mut S, buf: &mut [u8]) -> Result<usize, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Default)]
    struct Loopback {
        read_buf: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.read_buf.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn round_trip_write_then_read() {
        let mut fr = Framer::new(Loopback::default());
        fr.write_packet(MessageType::Command, 5, &[1, b'1', b'2', b'3', b'4'])
            .unwrap();
        let written = fr.get_mut().written.clone();
        fr.get_mut().read_buf = Cursor::new(written);

        let (t, seq, body) = fr.read_packet().unwrap();
        assert_eq!(t, MessageType::Command);
        assert_eq!(seq, 5);
        assert_eq!(body, vec![1, b'1', b'2', b'3', b'4']);
    }

    #[test]
    fn login_frame_matches_worked_example() {
        let frame = encode_frame(MessageType::Command, 0, &[0x01, b'1', b'2', b'3', b'4']);
        assert_eq!(
            frame,
            vec![0x74, 0x43, 0x0A, 0x00, 0x01, 0x31, 0x32, 0x33, 0x34, 0x34]
        );
    }

    #[test]
    fn crc_mismatch_is_reported() {
        let mut frame = encode_frame(MessageType::Response, 1, &[9, 9, 9]);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let mut fr = Framer::new(Loopback {
            read_buf: Cursor::new(frame),
            written: Vec::new(),
        });
        match fr.read_packet() {
            Err(Error::Framing(_)) => {}
            other => panic!("expected framing error, got {:?}", other),
        }
    }

    #[test]
    fn hangup_signal_is_detected() {
        let mut fr = Framer::new(Loopback {
            read_buf: Cursor::new(b"+++A".to_vec()),
            written: Vec::new(),
        });
        match fr.read_packet() {
            Err(Error::Transport(TransportError::Hangup)) => {}
            other => panic!("expected hangup, got {:?}", other),
        }
    }

    #[test]
    fn short_header_is_treated_as_eof() {
        let mut fr = Framer::new(Loopback {
            read_buf: Cursor::new(vec![b't', b'R']),
            written: Vec::new(),
        });
        match fr.read_packet() {
            Err(Error::Transport(TransportError::Eof)) => {}
            other => panic!("expected eof, got {:?}", other),
        }
    }
}
