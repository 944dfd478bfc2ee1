// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Owns the socket, the sequence counters and the pending-response
//! discipline: one command in flight at a time, with retry and idle
//! keepalive. Flattens the re-entrant `recvresponse`/`sendcommand` calls
//! of the original tool into a single state machine driven by
//! [`Session::send_command`].

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use crate::codec;
use crate::constant::CommandId;
use crate::error::{Error, TransportError};
use crate::packet::{Framer, MessageType};

const COMMAND_RETRIES: u32 = 3;
pub const IDLE_KEEPALIVE_THRESHOLD: Duration = Duration::from_secs(30);

/// Wrapping outgoing-command and incoming-message sequence counters.
#[derive(Debug, Default)]
struct SequenceSpace {
    next_outgoing: u8,
    last_received_incoming: Option<u8>,
}

impl SequenceSpace {
    fn next_outgoing(&mut self) -> u8 {
        let seq = self.next_outgoing;
        self.next_outgoing = self.next_outgoing.wrapping_add(1);
        seq
    }

    /// True if `seq` should be processed as a fresh unsolicited message.
    /// Logs (but does not reject) a non-contiguous sequence; duplicates of
    /// the last-seen sequence are dropped.
    fn observe_incoming(&mut self, seq: u8) -> bool {
        match self.last_received_incoming {
            None => {
                self.last_received_incoming = Some(seq);
                true
            }
            Some(last) if last == seq => false,
            Some(last) => {
                let expected = last.wrapping_add(1);
                if seq != expected {
                    log::warn!(
                        "incoming message {}",
                        Error::Sequence {
                            expected,
                            actual: seq
                        }
                    );
                }
                self.last_received_incoming = Some(seq);
                true
            }
        }
    }
}

/// Rotates the three harmless idle-keepalive commands round robin.
#[derive(Debug, Clone, Copy)]
enum IdleCommand {
    GetDateTime,
    GetLogPointer,
    GetSystemPower,
}

impl IdleCommand {
    fn next(self) -> IdleCommand {
        match self {
            IdleCommand::GetDateTime => IdleCommand::GetLogPointer,
            IdleCommand::GetLogPointer => IdleCommand::GetSystemPower,
            IdleCommand::GetSystemPower => IdleCommand::GetDateTime,
        }
    }

    fn command_id(self) -> CommandId {
        match self {
            IdleCommand::GetDateTime => CommandId::GetDateTime,
            IdleCommand::GetLogPointer => CommandId::GetLogPointer,
            IdleCommand::GetSystemPower => CommandId::GetSystemPower,
        }
    }

    fn encode(self) -> Vec<u8> {
        match self {
            IdleCommand::GetDateTime => codec::encode_get_datetime(),
            IdleCommand::GetLogPointer => codec::encode_get_log_pointer(),
            IdleCommand::GetSystemPower => codec::encode_get_system_power(),
        }
    }
}

/// An `M` frame that arrived while waiting for a command's response.
pub struct PendingMessage {
    pub sequence: u8,
    pub body: Vec<u8>,
}

/// Owns the wire connection and sequencing state for one panel session.
pub struct Session<S> {
    framer: Framer<S>,
    sequence: SequenceSpace,
    last_command_time: Instant,
    next_idle_command: IdleCommand,
}

impl<S: Read + Write> Session<S> {
    pub fn new(stream: S) -> Session<S> {
        Session {
            framer: Framer::new(stream),
            sequence: SequenceSpace::default(),
            last_command_time: Instant::now(),
            next_idle_command: IdleCommand::GetDateTime,
        }
    }

    pub fn into_inner(self) -> S {
        self.framer.into_inner()
    }

    /// Send `body` as a command and return the echoed response payload
    /// (with the leading command-id byte still attached — callers use
    /// [`codec::split_response`] to validate and strip it).
    ///
    /// Any `M` frames observed while waiting are handed to `on_message`
    /// before the wait continues; this is the same hand-off point the
    /// receive loop itself uses once enrolled.
    pub fn send_command(
        &mut self,
        body: &[u8],
        mut on_message: impl FnMut(PendingMessage),
    ) -> Result<Vec<u8>, Error> {
        let sequence = self.sequence.next_outgoing();
        self.last_command_time = Instant::now();
        self.recv_response_with_retry(MessageType::Command, sequence, body, &mut on_message)
    }

    fn recv_response_with_retry(
        &mut self,
        msg_type: MessageType,
        sequence: u8,
        body: &[u8],
        on_message: &mut impl FnMut(PendingMessage),
    ) -> Result<Vec<u8>, Error> {
        self.framer.write_packet(msg_type, sequence, body)?;

        for _attempt in 0..COMMAND_RETRIES {
            loop {
                match self.framer.read_packet() {
                    Ok((MessageType::Response, seq, resp_body)) => {
                        if seq == sequence {
                            return Ok(resp_body);
                        }
                        log::debug!(
                            "discarding response, {}",
                            Error::Sequence {
                                expected: sequence,
                                actual: seq
                            }
                        );
                        continue;
                    }
                    Ok((MessageType::Message, seq, msg_body)) => {
                        if self.sequence.observe_incoming(seq) {
                            on_message(PendingMessage {
                                sequence: seq,
                                body: msg_body,
                            });
                        }
                        continue;
                    }
                    Ok((MessageType::Command, _, _)) => {
                        return Err(Error::Protocol(
                            "received a command frame while awaiting a response".to_string(),
                        ));
                    }
                    Err(Error::Transport(TransportError::Timeout)) => {
                        log::warn!("command timed out, resending sequence {}", sequence);
                        self.framer.write_packet(msg_type, sequence, body)?;
                        break;
                    }
                    Err(Error::Framing(reason)) => {
                        log::warn!("dropping malformed frame: {}", reason);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Err(Error::Transport(TransportError::Timeout))
    }

    /// True once the session has gone 30 s without issuing any command.
    pub fn idle_keepalive_due(&self, now: Instant) -> bool {
        now.duration_since(self.last_command_time) > IDLE_KEEPALIVE_THRESHOLD
    }

    /// Issue the next harmless command in rotation, advancing it for next
    /// time. Used by the receive loop between frames.
    pub fn send_idle_keepalive(
        &mut self,
        on_message: impl FnMut(PendingMessage),
    ) -> Result<(), Error> {
        let idle = self.next_idle_command;
        self.next_idle_command = idle.next();
        let body = idle.encode();
        let response = self.send_command(&body, on_message)?;
        codec::split_response(idle.command_id(), &response)?;
        Ok(())
    }

    /// Block for the next frame without sending anything, handing `M`
    /// frames to `on_message` and returning once one has been delivered,
    /// or once the 2-second read timeout elapses with nothing to show.
    /// Used by the Running-state receive loop.
    pub fn poll_once(&mut self, mut on_message: impl FnMut(PendingMessage)) -> Result<(), Error> {
        match self.framer.read_packet() {
            Ok((MessageType::Message, seq, body)) => {
                if self.sequence.observe_incoming(seq) {
                    on_message(PendingMessage { sequence: seq, body });
                }
                Ok(())
            }
            Ok((MessageType::Response, seq, _)) => {
                log::debug!("discarding unsolicited response with sequence {}", seq);
                Ok(())
            }
            Ok((MessageType::Command, _, _)) => Err(Error::Protocol(
                "received a command frame from the panel".to_string(),
            )),
            Err(Error::Transport(TransportError::Timeout)) => Ok(()),
            Err(Error::Framing(reason)) => {
                log::warn!("dropping malformed frame: {}", reason);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
