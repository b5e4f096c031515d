use std::fmt;

use crate::mx::ExchangeHost;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Resolve,
    Connect,
    Greeting,
    Ehlo,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolve => "resolve",
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Ehlo => "EHLO",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        };
        f.write_str(name)
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.message)
        }
    }
}

/// A recorded SMTP transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Sent {
        stage: AttemptStage,
        command: String,
    },
    Received {
        stage: AttemptStage,
        reply: SmtpReply,
    },
    Error {
        stage: AttemptStage,
        message: String,
    },
}

impl fmt::Display for SmtpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { command, .. } => write!(f, "C: {command}"),
            Self::Received { reply, .. } => write!(f, "S: {reply}"),
            Self::Error { stage, message } => write!(f, "! {stage}: {message}"),
        }
    }
}

/// Outcome of one probe conversation against a single exchange host.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The recipient was accepted with a 2xx reply.
    Accepted { reply: SmtpReply },
    /// The server answered a step with a non-2xx reply.
    Rejected {
        stage: AttemptStage,
        reply: SmtpReply,
    },
    /// Address resolution or TCP connect failed.
    Unreachable { message: String },
    /// The session broke mid-conversation (timeout, EOF, malformed reply).
    ProtocolError {
        stage: AttemptStage,
        message: String,
    },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn as_reply(&self) -> Option<&SmtpReply> {
        match self {
            Self::Accepted { reply } | Self::Rejected { reply, .. } => Some(reply),
            _ => None,
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted { reply } => write!(f, "accepted ({reply})"),
            Self::Rejected { stage, reply } => write!(f, "rejected at {stage} ({reply})"),
            Self::Unreachable { message } => write!(f, "unreachable: {message}"),
            Self::ProtocolError { stage, message } => {
                write!(f, "protocol error at {stage}: {message}")
            }
        }
    }
}

/// Detailed report for a single exchange host interrogation.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAttempt {
    pub exchange: ExchangeHost,
    pub recipient: String,
    pub address: Option<String>,
    pub events: Vec<SmtpEvent>,
    pub outcome: AttemptOutcome,
}

impl ServerAttempt {
    pub fn new(exchange: ExchangeHost, recipient: impl Into<String>) -> Self {
        Self {
            exchange,
            recipient: recipient.into(),
            address: None,
            events: Vec::new(),
            outcome: AttemptOutcome::Unreachable {
                message: "probe not attempted".to_string(),
            },
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// First host, in priority order, that accepted the recipient.
    Accepted(ExchangeHost),
    /// Every host rejected the recipient or could not be reached.
    Rejected,
}

/// Result of [`probe_mailbox`](crate::probe::probe_mailbox): the verdict and
/// one [`ServerAttempt`] per host tried, in the order they were tried.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxProbe {
    pub outcome: ProbeOutcome,
    pub attempts: Vec<ServerAttempt>,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatchAllVerdict {
    /// The fabricated recipient was rejected at `RCPT TO`.
    NotCatchAll,
    /// The fabricated recipient was accepted.
    CatchAll,
    /// The secondary session failed before `RCPT TO` was answered.
    Undetermined,
}

/// What to conclude when the catch-all session cannot be completed.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatchAllFallback {
    /// Fail open: trust the mailbox result.
    #[default]
    AssumeNotCatchAll,
    /// Fail closed: report the domain as catch-all.
    AssumeCatchAll,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchAllProbe {
    pub verdict: CatchAllVerdict,
    pub attempt: ServerAttempt,
}

impl CatchAllProbe {
    /// `true` when the mailbox acceptance can be trusted.
    pub fn not_catch_all(&self, fallback: CatchAllFallback) -> bool {
        match self.verdict {
            CatchAllVerdict::NotCatchAll => true,
            CatchAllVerdict::CatchAll => false,
            CatchAllVerdict::Undetermined => fallback == CatchAllFallback::AssumeNotCatchAll,
        }
    }
}
