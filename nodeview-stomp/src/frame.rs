//! STOMP frame codec.
//!
//! Frame format: `COMMAND\n` then zero or more `name:value\n` header lines,
//! a blank line, the body, and a NUL terminator. Header names and values are
//! escaped per STOMP 1.1+ (`\\`, `\n`, `\r`, `\c`) except on CONNECT and
//! CONNECTED frames, which predate escaping.
//!
//! Only the commands the dashboard traffic uses are implemented.

use thiserror::Error;

/// STOMP protocol versions offered during the handshake.
pub const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// Frame codec error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The input had no command line.
    #[error("empty frame")]
    Empty,

    /// The command is not one this client understands.
    #[error("unknown command: {command}")]
    UnknownCommand {
        /// The command line as received.
        command: String,
    },

    /// A header line had no `:` separator.
    #[error("malformed header line: {line}")]
    MalformedHeader {
        /// The offending line.
        line: String,
    },

    /// The frame was not NUL-terminated.
    #[error("missing NUL terminator")]
    MissingNullTerminator,

    /// The frame had no blank line separating headers from body.
    #[error("missing header/body separator")]
    MissingSeparator,

    /// A header value used an undefined escape sequence.
    #[error("invalid escape sequence in header: {value}")]
    InvalidEscape {
        /// The raw header value.
        value: String,
    },
}

/// The STOMP commands exchanged with the dashboard backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCommand {
    /// Client handshake request.
    Connect,
    /// Server handshake acknowledgement.
    Connected,
    /// Client topic subscription.
    Subscribe,
    /// Client topic unsubscription.
    Unsubscribe,
    /// Client message to an `/app/...` destination.
    Send,
    /// Server-pushed topic message.
    Message,
    /// Server-reported protocol error; the connection is about to die.
    Error,
    /// Client graceful shutdown.
    Disconnect,
}

impl FrameCommand {
    fn as_str(&self) -> &'static str {
        match self {
            FrameCommand::Connect => "CONNECT",
            FrameCommand::Connected => "CONNECTED",
            FrameCommand::Subscribe => "SUBSCRIBE",
            FrameCommand::Unsubscribe => "UNSUBSCRIBE",
            FrameCommand::Send => "SEND",
            FrameCommand::Message => "MESSAGE",
            FrameCommand::Error => "ERROR",
            FrameCommand::Disconnect => "DISCONNECT",
        }
    }

    fn parse(line: &str) -> Result<Self, FrameError> {
        Ok(match line {
            "CONNECT" => FrameCommand::Connect,
            "CONNECTED" => FrameCommand::Connected,
            "SUBSCRIBE" => FrameCommand::Subscribe,
            "UNSUBSCRIBE" => FrameCommand::Unsubscribe,
            "SEND" => FrameCommand::Send,
            "MESSAGE" => FrameCommand::Message,
            "ERROR" => FrameCommand::Error,
            "DISCONNECT" => FrameCommand::Disconnect,
            other => {
                return Err(FrameError::UnknownCommand {
                    command: other.to_string(),
                });
            }
        })
    }

    /// CONNECT and CONNECTED headers are never escaped (STOMP 1.2 §B).
    fn escapes_headers(&self) -> bool {
        !matches!(self, FrameCommand::Connect | FrameCommand::Connected)
    }
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The frame command.
    pub command: FrameCommand,
    /// Header lines in order. On repeated names the first entry wins.
    pub headers: Vec<(String, String)>,
    /// UTF-8 body, empty for header-only frames.
    pub body: String,
}

impl Frame {
    /// Build a frame with no headers or body.
    pub fn new(command: FrameCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Client handshake frame.
    pub fn connect(host: &str) -> Self {
        Frame::new(FrameCommand::Connect)
            .header("accept-version", ACCEPT_VERSION)
            .header("heart-beat", "0,0")
            .header("host", host)
    }

    /// Topic subscription frame.
    pub fn subscribe(id: u64, destination: &str) -> Self {
        Frame::new(FrameCommand::Subscribe)
            .header("id", format!("sub-{id}"))
            .header("destination", destination)
    }

    /// Topic unsubscription frame.
    pub fn unsubscribe(id: u64) -> Self {
        Frame::new(FrameCommand::Unsubscribe).header("id", format!("sub-{id}"))
    }

    /// Message frame to an application destination.
    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Frame::new(FrameCommand::Send)
            .header("destination", destination)
            .body(body)
    }

    /// Graceful shutdown frame.
    pub fn disconnect() -> Self {
        Frame::new(FrameCommand::Disconnect)
    }

    /// First value of the named header, if present.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Encode into the wire text, including the NUL terminator.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::new();
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse a frame from wire text.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let text = text
            .strip_suffix('\0')
            .ok_or(FrameError::MissingNullTerminator)?;

        let mut lines = text.split('\n');
        let command_line = lines.next().ok_or(FrameError::Empty)?;
        if command_line.is_empty() {
            return Err(FrameError::Empty);
        }
        // Tolerate a trailing CR from CRLF-minded servers.
        let command = FrameCommand::parse(command_line.trim_end_matches('\r'))?;

        let header_end = text.find("\n\n").ok_or(FrameError::MissingSeparator)?;
        let escape = command.escapes_headers();

        let mut headers = Vec::new();
        for line in text[..header_end].split('\n').skip(1) {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader {
                    line: line.to_string(),
                })?;
            if escape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let body = text[header_end + 2..].to_string();
        Ok(Frame {
            command,
            headers,
            body,
        })
    }
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => {
                return Err(FrameError::InvalidEscape {
                    value: raw.to_string(),
                });
            }
        }
    }
    Ok(out)
}
