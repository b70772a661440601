use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::error::ProbeError;
use super::types::{SmtpReply, Stage};
use crate::deadline::Deadline;

/// Connect timeout used when the deadline has no expiry.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_LINE_LEN: usize = 4096;
const MAX_REPLY_LINES: usize = 128;

/// One connection to one mail exchanger. Owns its socket and closes it when
/// dropped, whatever the outcome of the attempt.
pub(crate) struct SmtpSession<'d> {
    host: String,
    stream: TcpStream,
    buffer: Vec<u8>,
    deadline: &'d Deadline,
    stage: Stage,
    last_reply: Option<SmtpReply>,
}

impl<'d> SmtpSession<'d> {
    pub(crate) fn connect(
        host: &str,
        port: u16,
        deadline: &'d Deadline,
    ) -> Result<Self, ProbeError> {
        let expired = |expiry| ProbeError::expired(Stage::Connect, expiry);
        deadline.check().map_err(expired)?;

        let addrs = socket_addrs(host, port)?;
        deadline.check().map_err(expired)?;

        let mut last_err = None;
        for addr in &addrs {
            let budget = deadline
                .budget_or(DEFAULT_CONNECT_TIMEOUT)
                .map_err(expired)?;
            match TcpStream::connect_timeout(addr, budget) {
                Ok(stream) => {
                    stream.set_nodelay(true).ok();
                    tracing::debug!(target: "mailprobe::smtp", %host, %addr, "connected");
                    return Ok(Self {
                        host: host.to_string(),
                        stream,
                        buffer: Vec::new(),
                        deadline,
                        stage: Stage::Connect,
                        last_reply: None,
                    });
                }
                Err(err) => {
                    tracing::debug!(target: "mailprobe::smtp", %host, %addr, error = %err, "connect failed");
                    last_err = Some(err);
                }
            }
        }

        // a connect cut short by the budget is a timeout, not a network failure
        deadline.check().map_err(expired)?;
        Err(ProbeError::Connect {
            host: host.to_string(),
            source: last_err.unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "no socket address available",
                )
            }),
        })
    }

    pub(crate) fn stage(&self) -> Stage {
        self.stage
    }

    pub(crate) fn last_reply(&self) -> Option<&SmtpReply> {
        self.last_reply.as_ref()
    }

    /// Read the server banner. Only a 2xx banner opens the dialogue.
    pub(crate) fn greeting(&mut self) -> Result<SmtpReply, ProbeError> {
        self.stage = Stage::Greeting;
        let reply = self.read_reply()?;
        if reply.is_positive_completion() {
            Ok(reply)
        } else {
            Err(ProbeError::Rejected {
                stage: Stage::Greeting,
                reply,
            })
        }
    }

    /// `EHLO`, falling back to `HELO` once when the server refuses it.
    pub(crate) fn hello(&mut self, name: &str) -> Result<SmtpReply, ProbeError> {
        let ehlo = self.command(Stage::Hello, &format!("EHLO {name}"))?;
        if ehlo.is_success() {
            return Ok(ehlo);
        }
        tracing::debug!(target: "mailprobe::smtp", host = %self.host, code = ehlo.code, "EHLO refused, trying HELO");
        let helo = self.command(Stage::Hello, &format!("HELO {name}"))?;
        accepted(Stage::Hello, helo)
    }

    /// Send one command and read its reply.
    pub(crate) fn command(&mut self, stage: Stage, command: &str) -> Result<SmtpReply, ProbeError> {
        self.stage = stage;
        self.write_line(command)?;
        self.read_reply()
    }

    /// Close the session politely. Only deadline expiry is reported; a refused
    /// or broken `QUIT` changes nothing about the answer already obtained.
    pub(crate) fn quit(&mut self) -> Result<(), ProbeError> {
        match self.command(Stage::Quit, "QUIT") {
            Ok(reply) => {
                if !reply.is_success() {
                    tracing::debug!(target: "mailprobe::smtp", host = %self.host, %reply, "QUIT refused");
                }
                Ok(())
            }
            Err(err) if err.is_timeout() => Err(err),
            Err(err) => {
                tracing::debug!(target: "mailprobe::smtp", host = %self.host, error = %err, "QUIT failed");
                Ok(())
            }
        }
    }

    /// Write `QUIT` without waiting for the reply, then drop the connection.
    pub(crate) fn abandon(mut self) {
        self.stage = Stage::Quit;
        if let Err(err) = self.write_line("QUIT") {
            tracing::debug!(target: "mailprobe::smtp", host = %self.host, error = %err, "QUIT not sent");
        }
    }

    fn write_line(&mut self, command: &str) -> Result<(), ProbeError> {
        tracing::debug!(target: "mailprobe::smtp", host = %self.host, "C: {command}");
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");

        let stage = self.stage;
        let mut pending = data.as_slice();
        while !pending.is_empty() {
            let slice = self
                .deadline
                .io_slice()
                .map_err(|expiry| ProbeError::expired(stage, expiry))?;
            self.stream
                .set_write_timeout(Some(slice))
                .map_err(|source| ProbeError::Io { stage, source })?;
            match self.stream.write(pending) {
                Ok(0) => return Err(ProbeError::ConnectionClosed { stage }),
                Ok(written) => pending = &pending[written..],
                Err(err) if is_retryable(&err) => continue,
                Err(source) => return Err(ProbeError::Io { stage, source }),
            }
        }
        Ok(())
    }

    fn read_reply(&mut self) -> Result<SmtpReply, ProbeError> {
        let stage = self.stage;
        let mut code: Option<u16> = None;
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            tracing::debug!(target: "mailprobe::smtp", host = %self.host, "S: {line}");
            let parsed =
                parse_reply_line(&line).map_err(|detail| ProbeError::Protocol { stage, detail })?;
            match code {
                Some(existing) if existing != parsed.code => {
                    return Err(ProbeError::Protocol {
                        stage,
                        detail: format!(
                            "inconsistent reply codes: {existing} vs {}",
                            parsed.code
                        ),
                    });
                }
                Some(_) => {}
                None => code = Some(parsed.code),
            }
            lines.push(parsed.text.to_string());
            if !parsed.continued {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(ProbeError::Protocol {
                    stage,
                    detail: format!("reply longer than {MAX_REPLY_LINES} lines"),
                });
            }
        }

        let reply = SmtpReply {
            code: code.ok_or_else(|| ProbeError::Protocol {
                stage,
                detail: "reply missing status code".to_string(),
            })?,
            message: lines.join("\n"),
        };
        self.last_reply = Some(reply.clone());
        Ok(reply)
    }

    fn read_line(&mut self) -> Result<String, ProbeError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            if self.buffer.len() > MAX_LINE_LEN {
                return Err(ProbeError::Protocol {
                    stage: self.stage,
                    detail: format!("reply line longer than {MAX_LINE_LEN} bytes"),
                });
            }
            self.fill_buffer()?;
        }
    }

    /// Wait for more bytes in slices no longer than the deadline allows.
    fn fill_buffer(&mut self) -> Result<(), ProbeError> {
        let stage = self.stage;
        let mut chunk = [0u8; 512];
        loop {
            let slice = self
                .deadline
                .io_slice()
                .map_err(|expiry| ProbeError::expired(stage, expiry))?;
            self.stream
                .set_read_timeout(Some(slice))
                .map_err(|source| ProbeError::Io { stage, source })?;
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(ProbeError::ConnectionClosed { stage }),
                Ok(read) => {
                    self.buffer.extend_from_slice(&chunk[..read]);
                    return Ok(());
                }
                Err(err) if is_retryable(&err) => continue,
                Err(source) => return Err(ProbeError::Io { stage, source }),
            }
        }
    }
}

impl Drop for SmtpSession<'_> {
    fn drop(&mut self) {
        self.stream.shutdown(Shutdown::Both).ok();
        tracing::trace!(target: "mailprobe::smtp", host = %self.host, stage = %self.stage, "connection closed");
    }
}

fn accepted(stage: Stage, reply: SmtpReply) -> Result<SmtpReply, ProbeError> {
    if reply.is_success() {
        Ok(reply)
    } else {
        Err(ProbeError::Rejected { stage, reply })
    }
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

fn socket_addrs(host: &str, port: u16) -> Result<Vec<SocketAddr>, ProbeError> {
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    (host, port)
        .to_socket_addrs()
        .map(Iterator::collect)
        .map_err(|source| ProbeError::HostLookup {
            host: host.to_string(),
            source,
        })
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ReplyLine<'a> {
    pub code: u16,
    pub continued: bool,
    pub text: &'a str,
}

pub(crate) fn parse_reply_line(line: &str) -> Result<ReplyLine<'_>, String> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(format!("invalid SMTP reply: '{line}'"));
    }
    let code = line[..3]
        .parse::<u16>()
        .map_err(|_| format!("invalid SMTP status code: '{}'", &line[..3]))?;
    if !(200..600).contains(&code) {
        return Err(format!("SMTP status code out of range: {code}"));
    }
    let continued = match bytes.get(3) {
        None | Some(b' ') => false,
        Some(b'-') => true,
        Some(_) => return Err(format!("invalid separator in SMTP reply: '{line}'")),
    };
    Ok(ReplyLine {
        code,
        continued,
        text: line.get(4..).unwrap_or(""),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_final_line() {
        let line = parse_reply_line("250 2.1.5 Ok").expect("valid line");
        assert_eq!(
            line,
            ReplyLine {
                code: 250,
                continued: false,
                text: "2.1.5 Ok"
            }
        );
    }

    #[test]
    fn parses_continuation_and_bare_code() {
        assert!(parse_reply_line("250-PIPELINING").expect("valid").continued);
        let bare = parse_reply_line("221").expect("valid");
        assert_eq!(bare.code, 221);
        assert_eq!(bare.text, "");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_reply_line("").is_err());
        assert!(parse_reply_line("hello there").is_err());
        assert!(parse_reply_line("25").is_err());
        assert!(parse_reply_line("2x0 ok").is_err());
        assert!(parse_reply_line("250+ok").is_err());
        assert!(parse_reply_line("100 too low").is_err());
        assert!(parse_reply_line("600 too high").is_err());
    }

    #[test]
    fn ip_literals_skip_name_resolution() {
        let addrs = socket_addrs("127.0.0.1", 2525).expect("literal");
        assert_eq!(addrs, vec!["127.0.0.1:2525".parse().expect("addr")]);
        let v6 = socket_addrs("[::1]", 25).expect("literal");
        assert_eq!(v6, vec!["[::1]:25".parse().expect("addr")]);
    }
}
