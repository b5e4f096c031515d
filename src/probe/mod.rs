//! SMTP mailbox probing (third and fourth pipeline stages).
//!
//! [`probe_mailbox`] walks the exchange hosts by priority and runs a minimal
//! `EHLO`/`MAIL FROM`/`RCPT TO` dialogue until one host accepts the
//! recipient. [`detect_catch_all`] repeats the dialogue on that host with a
//! random mailbox to find out whether the acceptance means anything. No
//! message is ever transmitted and every session ends with `QUIT`.

mod catchall;
mod error;
mod options;
mod prober;
mod session;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use options::{ProbeOptions, is_command_argument};
pub use types::{
    AttemptOutcome, AttemptStage, CatchAllFallback, CatchAllProbe, CatchAllVerdict, MailboxProbe,
    ProbeOutcome, ServerAttempt, SmtpEvent, SmtpReply,
};

pub(crate) use catchall::detect_catch_all_with;
pub(crate) use prober::probe_mailbox_with;

use crate::mx::{Error as MxError, ExchangeHost, system_resolver};

/// Probes `recipient` against `hosts` using the system resolver for address
/// lookups.
pub fn probe_mailbox(
    hosts: &[ExchangeHost],
    recipient: &str,
    options: &ProbeOptions,
) -> Result<MailboxProbe, MxError> {
    let resolver = system_resolver()?;
    Ok(probe_mailbox_with(&resolver, hosts, recipient, options))
}

/// Checks whether `host` accepts an invented mailbox at `domain`.
/// `local_part` is the mailbox under test; the decoy never equals it.
pub fn detect_catch_all(
    host: &ExchangeHost,
    domain: &str,
    local_part: &str,
    options: &ProbeOptions,
) -> Result<CatchAllProbe, MxError> {
    let resolver = system_resolver()?;
    Ok(detect_catch_all_with(&resolver, host, domain, local_part, options))
}
