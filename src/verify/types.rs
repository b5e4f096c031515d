use std::fmt;

use crate::mx::ExchangeHost;
use crate::probe::{CatchAllProbe, ServerAttempt};

/// Why the pipeline stopped. Each variant names the first stage that failed,
/// or [`Reason::ValidAddress`] when none did.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    InvalidSyntax,
    NoMailServer,
    CannotConnect,
    CatchAll,
    ValidAddress,
}

impl Reason {
    /// Number of stages that succeeded before the pipeline stopped.
    fn stages_passed(self) -> u8 {
        match self {
            Self::InvalidSyntax => 0,
            Self::NoMailServer => 1,
            Self::CannotConnect => 2,
            Self::CatchAll => 3,
            Self::ValidAddress => 4,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidSyntax => "Invalid syntax",
            Self::NoMailServer => "Domain has no MX records",
            Self::CannotConnect => "Cannot connect to mail server",
            Self::CatchAll => "Domain is catch-all",
            Self::ValidAddress => "Valid email address",
        };
        f.write_str(text)
    }
}

/// Verdict of one verification. The flags only ever describe stages that ran
/// and succeeded; they are derived from `reason` so they cannot disagree with
/// it.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationResult {
    pub valid: bool,
    pub reason: Reason,
    pub syntax_ok: bool,
    pub mail_server_ok: bool,
    pub mailbox_ok: bool,
    pub not_catch_all: bool,
}

impl VerificationResult {
    pub fn new(reason: Reason) -> Self {
        let passed = reason.stages_passed();
        Self {
            valid: passed == 4,
            reason,
            syntax_ok: passed >= 1,
            mail_server_ok: passed >= 2,
            mailbox_ok: passed >= 3,
            not_catch_all: passed >= 4,
        }
    }
}

impl From<Reason> for VerificationResult {
    fn from(reason: Reason) -> Self {
        Self::new(reason)
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [syntax={} mail_server={} mailbox={} not_catch_all={}]",
            self.reason, self.syntax_ok, self.mail_server_ok, self.mailbox_ok, self.not_catch_all
        )
    }
}

/// [`VerificationResult`] plus what each stage observed.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub email: String,
    pub ascii_domain: String,
    pub result: VerificationResult,
    /// Syntax problems, empty unless `reason` is `InvalidSyntax`.
    pub syntax_errors: Vec<String>,
    pub exchanges: Vec<ExchangeHost>,
    pub attempts: Vec<ServerAttempt>,
    pub catch_all: Option<CatchAllProbe>,
}

impl VerificationReport {
    pub(crate) fn new(email: impl Into<String>, ascii_domain: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ascii_domain: ascii_domain.into(),
            result: VerificationResult::new(Reason::InvalidSyntax),
            syntax_errors: Vec::new(),
            exchanges: Vec::new(),
            attempts: Vec::new(),
            catch_all: None,
        }
    }

    pub(crate) fn finish(mut self, reason: Reason) -> Self {
        self.result = VerificationResult::new(reason);
        self
    }
}
