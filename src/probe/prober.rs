use crate::mx::{ExchangeHost, LookupHost, order_exchanges};

use super::error::ProbeError;
use super::options::ProbeOptions;
use super::session::ProbeSession;
use super::types::{
    AttemptOutcome, AttemptStage as Stage, MailboxProbe, ProbeOutcome, ServerAttempt, SmtpReply,
};

/// Tries `hosts` one after the other, by ascending priority, until one accepts
/// `recipient`. Per-host failures are logged and never abort the loop.
pub(crate) fn probe_mailbox_with<R>(
    resolver: &R,
    hosts: &[ExchangeHost],
    recipient: &str,
    options: &ProbeOptions,
) -> MailboxProbe
where
    R: LookupHost + ?Sized,
{
    let mut attempts = Vec::new();
    for host in order_exchanges(hosts.to_vec()) {
        let attempt = converse(resolver, &host, recipient, options);
        let accepted = attempt.outcome.is_success();
        if accepted {
            tracing::debug!(exchange = %host.hostname, recipient, "recipient accepted");
        } else {
            tracing::warn!(
                exchange = %host.hostname,
                recipient,
                outcome = %attempt.outcome,
                "exchange did not accept recipient, trying next"
            );
        }
        attempts.push(attempt);
        if accepted {
            return MailboxProbe {
                outcome: ProbeOutcome::Accepted(host),
                attempts,
            };
        }
    }
    MailboxProbe {
        outcome: ProbeOutcome::Rejected,
        attempts,
    }
}

/// Runs connect → greet → `MAIL FROM` → `RCPT TO` → `QUIT` against one host.
/// The session is closed before returning on every path.
pub(crate) fn converse<R>(
    resolver: &R,
    host: &ExchangeHost,
    recipient: &str,
    options: &ProbeOptions,
) -> ServerAttempt
where
    R: LookupHost + ?Sized,
{
    let mut attempt = ServerAttempt::new(host.clone(), recipient);

    let mut session = match open_session(resolver, host, options) {
        Ok(session) => session,
        Err(err) => {
            tracing::debug!(
                exchange = %host.hostname,
                stage = %err.stage(),
                error = %err,
                "no session"
            );
            attempt.outcome = AttemptOutcome::from(err);
            return attempt;
        }
    };
    attempt.address = Some(session.peer().to_string());

    let result = exchange(&mut session, recipient, options);
    attempt.events = session.close();
    attempt.outcome = match result {
        Ok(reply) if reply.is_positive_completion() => AttemptOutcome::Accepted { reply },
        Ok(reply) => AttemptOutcome::Rejected {
            stage: Stage::RcptTo,
            reply,
        },
        Err(err) => {
            tracing::debug!(
                exchange = %host.hostname,
                stage = %err.stage(),
                error = %err,
                "conversation aborted"
            );
            AttemptOutcome::from(err)
        }
    };
    attempt
}

fn open_session<R>(
    resolver: &R,
    host: &ExchangeHost,
    options: &ProbeOptions,
) -> Result<ProbeSession, ProbeError>
where
    R: LookupHost + ?Sized,
{
    let addrs = resolver
        .lookup_host(&host.hostname, options.port)
        .map_err(|source| ProbeError::Resolve {
            host: host.hostname.clone(),
            source,
        })?;
    ProbeSession::connect(
        &host.hostname,
        &addrs,
        options.connect_timeout,
        options.command_timeout,
    )
}

/// Returns the reply to `RCPT TO`; earlier negative replies are errors.
fn exchange(
    session: &mut ProbeSession,
    recipient: &str,
    options: &ProbeOptions,
) -> Result<SmtpReply, ProbeError> {
    let banner = session.greeting()?;
    require_positive(Stage::Greeting, banner)?;

    greet(session, options.helo_name())?;

    let mail = session.command(Stage::MailFrom, &options.mail_from_command())?;
    require_positive(Stage::MailFrom, mail)?;

    session.command(Stage::RcptTo, &format!("RCPT TO:<{recipient}>"))
}

/// `EHLO`, falling back to `HELO` for servers that refuse it permanently.
fn greet(session: &mut ProbeSession, helo_name: &str) -> Result<(), ProbeError> {
    let ehlo = session.command(Stage::Ehlo, &format!("EHLO {helo_name}"))?;
    if ehlo.is_positive_completion() {
        return Ok(());
    }
    if !ehlo.is_permanent_failure() {
        return Err(ProbeError::Negative {
            stage: Stage::Ehlo,
            reply: ehlo,
        });
    }
    let helo = session.command(Stage::Helo, &format!("HELO {helo_name}"))?;
    require_positive(Stage::Helo, helo).map(|_| ())
}

fn require_positive(stage: Stage, reply: SmtpReply) -> Result<SmtpReply, ProbeError> {
    if reply.is_positive_completion() {
        Ok(reply)
    } else {
        Err(ProbeError::Negative { stage, reply })
    }
}
