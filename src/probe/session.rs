use std::io::{self, BufRead, BufReader, Read, Write};
use std::mem;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use super::error::ProbeError;
use super::types::{AttemptStage as Stage, SmtpEvent as Event, SmtpReply};

/// One SMTP probe conversation with one host.
///
/// The session is a scope guard: [`ProbeSession::close`] sends `QUIT` and
/// shuts the socket down, and dropping an unclosed session does the same on a
/// best-effort basis. A session whose socket already failed skips `QUIT` and
/// only shuts down, so closing never waits on a dead peer.
///
/// `command_timeout` bounds each whole reply, not each socket read: a server
/// trickling continuation lines still runs out of time.
pub(crate) struct ProbeSession {
    host: String,
    peer: SocketAddr,
    stream: TcpStream,
    reader: BufReader<DeadlineReader>,
    command_timeout: Duration,
    events: Vec<Event>,
    broken: bool,
    closed: bool,
}

impl ProbeSession {
    pub(crate) fn connect(
        host: &str,
        addrs: &[SocketAddr],
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let mut last_err = None;
        for addr in addrs {
            match open_stream(addr, connect_timeout, command_timeout) {
                Ok((stream, reader)) => {
                    tracing::debug!(host, peer = %addr, "connected");
                    return Ok(Self {
                        host: host.to_string(),
                        peer: *addr,
                        stream,
                        reader,
                        command_timeout,
                        events: Vec::new(),
                        broken: false,
                        closed: false,
                    });
                }
                Err(err) => {
                    tracing::debug!(host, peer = %addr, error = %err, "connect failed");
                    last_err = Some(err);
                }
            }
        }
        match last_err {
            Some(source) => Err(ProbeError::Connect {
                host: host.to_string(),
                source,
            }),
            None => Err(ProbeError::NoAddress {
                host: host.to_string(),
            }),
        }
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Reads the server banner.
    pub(crate) fn greeting(&mut self) -> Result<SmtpReply, ProbeError> {
        self.receive(Stage::Greeting)
    }

    /// Sends one command line and reads its reply.
    pub(crate) fn command(&mut self, stage: Stage, command: &str) -> Result<SmtpReply, ProbeError> {
        tracing::debug!(host = %self.host, "C: {command}");
        self.events.push(Event::Sent {
            stage,
            command: command.to_string(),
        });
        if let Err(err) = self.write_line(command) {
            return Err(self.fail(stage, err));
        }
        self.receive(stage)
    }

    /// Ends the conversation and hands back the transcript.
    pub(crate) fn close(mut self) -> Vec<Event> {
        self.terminate();
        mem::take(&mut self.events)
    }

    fn receive(&mut self, stage: Stage) -> Result<SmtpReply, ProbeError> {
        self.reader.get_mut().deadline = Some(Instant::now() + self.command_timeout);
        let result = read_reply(&mut self.reader);
        self.reader.get_mut().deadline = None;
        match result {
            Ok(reply) => {
                tracing::debug!(host = %self.host, "S: {reply}");
                self.events.push(Event::Received {
                    stage,
                    reply: reply.clone(),
                });
                Ok(reply)
            }
            Err(err) => Err(self.fail(stage, err)),
        }
    }

    fn fail(&mut self, stage: Stage, err: io::Error) -> ProbeError {
        self.broken = true;
        self.events.push(Event::Error {
            stage,
            message: err.to_string(),
        });
        ProbeError::io(stage, err)
    }

    fn write_line(&mut self, command: &str) -> io::Result<()> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream.write_all(&line)?;
        self.stream.flush()
    }

    fn terminate(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.broken {
            // QUIT failures are irrelevant once the verdict is known
            let _ = self.command(Stage::Quit, "QUIT");
        }
        let _ = self.stream.shutdown(Shutdown::Both);
        tracing::debug!(host = %self.host, "session closed");
    }
}

impl Drop for ProbeSession {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Socket read half that refuses to read past `deadline`. Each read gets
/// only the time left, so the deadline holds across many short reads.
struct DeadlineReader {
    stream: TcpStream,
    deadline: Option<Instant>,
}

impl Read for DeadlineReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "reply not complete before deadline",
                ));
            }
            self.stream.set_read_timeout(Some(remaining))?;
        }
        self.stream.read(buf)
    }
}

fn open_stream(
    addr: &SocketAddr,
    connect_timeout: Duration,
    command_timeout: Duration,
) -> io::Result<(TcpStream, BufReader<DeadlineReader>)> {
    let stream = TcpStream::connect_timeout(addr, connect_timeout)?;
    stream.set_read_timeout(Some(command_timeout))?;
    stream.set_write_timeout(Some(command_timeout))?;
    let reader = BufReader::new(DeadlineReader {
        stream: stream.try_clone()?,
        deadline: None,
    });
    Ok((stream, reader))
}

/// RFC 5321 caps reply lines at 512 octets; twice that is tolerated.
const MAX_LINE_LEN: u64 = 1024;
const MAX_REPLY_LINES: usize = 64;

/// Reads a possibly multi-line reply (`250-...` continuation lines).
pub(crate) fn read_reply<R: BufRead>(reader: &mut R) -> io::Result<SmtpReply> {
    let mut code = None;
    let mut message_lines = Vec::new();
    loop {
        if message_lines.len() >= MAX_REPLY_LINES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("SMTP reply longer than {MAX_REPLY_LINES} lines"),
            ));
        }
        let mut raw = String::new();
        let bytes = reader.by_ref().take(MAX_LINE_LEN).read_line(&mut raw)?;
        if bytes == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while reading reply",
            ));
        }
        if !raw.ends_with('\n') && bytes as u64 >= MAX_LINE_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("SMTP reply line longer than {MAX_LINE_LEN} bytes"),
            ));
        }
        let raw = raw.trim_end_matches(['\r', '\n']);

        let code_part = raw.get(..3).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid SMTP reply: '{raw}'"),
            )
        })?;
        let parsed_code = code_part.parse::<u16>().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid SMTP status code: '{code_part}'"),
            )
        })?;
        match code {
            Some(existing) if existing != parsed_code => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("inconsistent SMTP reply codes: {existing} vs {parsed_code}"),
                ));
            }
            Some(_) => {}
            None => code = Some(parsed_code),
        }
        let continuation = raw.as_bytes().get(3) == Some(&b'-');
        message_lines.push(raw.get(4..).unwrap_or_default().to_string());
        if !continuation {
            break;
        }
    }
    Ok(SmtpReply {
        code: code.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "SMTP reply missing status code")
        })?,
        message: message_lines.join("\n"),
    })
}
