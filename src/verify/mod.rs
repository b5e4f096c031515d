//! The verification pipeline: syntax → MX → mailbox probe → catch-all probe.
//!
//! Each stage gates the next. The first failing stage decides the
//! [`Reason`] and the flags of the returned [`VerificationResult`]; network
//! trouble on individual hosts is absorbed by the probe stages.

mod error;
mod options;
mod types;

pub use error::VerifyError;
pub use options::VerifyOptions;
pub use types::{Reason, VerificationReport, VerificationResult};

use crate::mx::{self, Error as MxError, LookupHost, LookupMx};
use crate::probe::{ProbeOutcome, detect_catch_all_with, probe_mailbox_with};
use crate::validator::{NormalizedEmail, normalize_email};

/// Verifies `address` with default options.
pub fn verify(address: &str) -> Result<VerificationResult, VerifyError> {
    verify_with_options(address, &VerifyOptions::default()).map(|report| report.result)
}

/// Identical to [`verify`], but allows tweaking timeouts, SMTP identity and the
/// catch-all policy, and returns the full [`VerificationReport`].
pub fn verify_with_options(
    address: &str,
    options: &VerifyOptions,
) -> Result<VerificationReport, VerifyError> {
    verify_using(address, options, mx::system_resolver)
}

/// Runs the pipeline; `resolver` is only built once the syntax check passed.
fn verify_using<R, F>(
    address: &str,
    options: &VerifyOptions,
    resolver: F,
) -> Result<VerificationReport, VerifyError>
where
    R: LookupMx + LookupHost,
    F: FnOnce() -> Result<R, MxError>,
{
    let normalized = normalize_email(address, options.validation_mode);
    if !normalized.valid {
        return Ok(invalid_syntax(normalized));
    }
    let resolver = resolver()?;
    Ok(run_stages(&resolver, normalized, options))
}

fn invalid_syntax(normalized: NormalizedEmail) -> VerificationReport {
    tracing::info!(email = %normalized.original, reasons = ?normalized.reasons, "invalid syntax");
    let mut report = VerificationReport::new(normalized.original, normalized.ascii_domain);
    report.syntax_errors = normalized.reasons;
    report.finish(Reason::InvalidSyntax)
}

fn run_stages<R>(
    resolver: &R,
    normalized: NormalizedEmail,
    options: &VerifyOptions,
) -> VerificationReport
where
    R: LookupMx + LookupHost + ?Sized,
{
    let domain = if normalized.ascii_domain.is_empty() {
        normalized.domain.clone()
    } else {
        normalized.ascii_domain.clone()
    };
    let mut report = VerificationReport::new(normalized.original.as_str(), domain.as_str());
    let reason = probe_stages(resolver, &normalized, &domain, options, &mut report);

    tracing::info!(email = %report.email, %reason, "verification finished");
    report.finish(reason)
}

/// Stages two to four. Fills `report` as they go and returns the reason of
/// the first stage that failed.
fn probe_stages<R>(
    resolver: &R,
    normalized: &NormalizedEmail,
    domain: &str,
    options: &VerifyOptions,
    report: &mut VerificationReport,
) -> Reason
where
    R: LookupMx + LookupHost + ?Sized,
{
    report.exchanges = match mx::exchanges_with(resolver, domain) {
        Ok(hosts) => hosts,
        Err(err) => {
            // lookup failures and empty answers are indistinguishable to callers
            tracing::info!(domain, error = %err, "no mail server");
            return Reason::NoMailServer;
        }
    };

    let recipient = normalized.wire_address();
    let probe = probe_mailbox_with(resolver, &report.exchanges, &recipient, &options.probe);
    report.attempts = probe.attempts;
    let ProbeOutcome::Accepted(responder) = probe.outcome else {
        return Reason::CannotConnect;
    };

    let catch_all = detect_catch_all_with(
        resolver,
        &responder,
        domain,
        &normalized.local,
        &options.probe,
    );
    let trusted = catch_all.not_catch_all(options.catch_all_fallback);
    report.catch_all = Some(catch_all);
    if trusted {
        Reason::ValidAddress
    } else {
        Reason::CatchAll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mx::ExchangeHost;
    use crate::mx::tests::StubResolver;
    use crate::probe::testing::{Mailboxes, MockSmtp, closed_port, fast_options, stub_for};
    use crate::probe::{CatchAllVerdict, ProbeOptions};
    use std::sync::mpsc;
    use trust_dns_resolver::error::ResolveError;

    const TARGET: &str = "user@example.com";

    fn verify_with_resolver<R>(
        address: &str,
        options: &VerifyOptions,
        resolver: &R,
    ) -> VerificationReport
    where
        R: LookupMx + LookupHost,
    {
        verify_using(address, options, || Ok::<_, MxError>(resolver)).expect("stub resolver")
    }

    fn options() -> VerifyOptions {
        VerifyOptions {
            probe: fast_options(),
            ..VerifyOptions::default()
        }
    }

    fn single_host(mailboxes: Mailboxes) -> StubResolver {
        let (tx, _rx) = mpsc::channel();
        let port = MockSmtp::new("mx", mailboxes).spawn(tx);
        stub_for(
            vec![ExchangeHost::new("mx.example.com", 10)],
            vec![("mx.example.com", port)],
        )
    }

    #[test]
    fn flags_follow_reason() {
        let rendered = [
            Reason::InvalidSyntax,
            Reason::NoMailServer,
            Reason::CannotConnect,
            Reason::CatchAll,
            Reason::ValidAddress,
        ]
        .into_iter()
        .map(|reason| VerificationResult::new(reason).to_string())
        .collect::<Vec<_>>()
        .join("\n");
        insta::assert_snapshot!(rendered, @r"
        Invalid syntax [syntax=false mail_server=false mailbox=false not_catch_all=false]
        Domain has no MX records [syntax=true mail_server=false mailbox=false not_catch_all=false]
        Cannot connect to mail server [syntax=true mail_server=true mailbox=false not_catch_all=false]
        Domain is catch-all [syntax=true mail_server=true mailbox=true not_catch_all=false]
        Valid email address [syntax=true mail_server=true mailbox=true not_catch_all=true]
        ");
    }

    #[test]
    fn only_valid_address_is_valid() {
        for reason in [
            Reason::InvalidSyntax,
            Reason::NoMailServer,
            Reason::CannotConnect,
            Reason::CatchAll,
        ] {
            assert!(!VerificationResult::new(reason).valid, "{reason:?}");
        }
        assert!(VerificationResult::new(Reason::ValidAddress).valid);
    }

    #[test]
    fn invalid_syntax_skips_every_stage() {
        let resolver = StubResolver::new(|domain| panic!("unexpected MX lookup for {domain}"));
        let report = verify_with_resolver("not-an-email", &options(), &resolver);
        assert_eq!(report.result, VerificationResult::new(Reason::InvalidSyntax));
        assert!(!report.syntax_errors.is_empty());
        assert!(report.exchanges.is_empty());
    }

    #[test]
    fn invalid_syntax_needs_no_resolver() {
        let result = verify("not-an-email").expect("verification");
        assert!(!result.valid);
        assert_eq!(result.reason, Reason::InvalidSyntax);
        assert!(!result.syntax_ok);
    }

    #[test]
    fn empty_mx_answer_is_no_mail_server() {
        let resolver = StubResolver::new(|_| Ok(Vec::new()));
        let report = verify_with_resolver("user@domain-with-no-mx.test", &options(), &resolver);
        assert_eq!(report.result.reason, Reason::NoMailServer);
        assert!(report.result.syntax_ok);
        assert!(!report.result.mail_server_ok);
    }

    #[test]
    fn failed_mx_lookup_is_no_mail_server() {
        let resolver = StubResolver::new(|_| Err(ResolveError::from("SERVFAIL")));
        let report = verify_with_resolver(TARGET, &options(), &resolver);
        assert_eq!(report.result, VerificationResult::new(Reason::NoMailServer));
        assert!(report.attempts.is_empty());
    }

    #[test]
    fn every_host_failing_is_cannot_connect() {
        let (tx, _rx) = mpsc::channel();
        let rejecting = MockSmtp::new("reject", Mailboxes::None).spawn(tx);
        let resolver = stub_for(
            vec![
                ExchangeHost::new("reject.example.com", 10),
                ExchangeHost::new("down.example.com", 20),
            ],
            vec![
                ("reject.example.com", rejecting),
                ("down.example.com", closed_port()),
            ],
        );

        let report = verify_with_resolver(TARGET, &options(), &resolver);

        let result = report.result;
        assert_eq!(result.reason, Reason::CannotConnect);
        assert!(result.syntax_ok && result.mail_server_ok);
        assert!(!result.mailbox_ok && !result.not_catch_all);
        assert_eq!(report.attempts.len(), 2);
        assert!(report.catch_all.is_none());
    }

    #[test]
    fn catch_all_domain_is_not_valid() {
        let resolver = single_host(Mailboxes::All);
        let report = verify_with_resolver(TARGET, &options(), &resolver);

        let result = report.result;
        assert!(!result.valid);
        assert_eq!(result.reason, Reason::CatchAll);
        assert!(result.mailbox_ok);
        assert!(!result.not_catch_all);
        assert_eq!(
            report.catch_all.map(|c| c.verdict),
            Some(CatchAllVerdict::CatchAll)
        );
    }

    #[test]
    fn existing_mailbox_is_valid() {
        let resolver = single_host(Mailboxes::Only(vec![TARGET]));
        let report = verify_with_resolver(TARGET, &options(), &resolver);
        assert_eq!(report.result, VerificationResult::new(Reason::ValidAddress));
        assert!(report.result.valid);
    }

    #[test]
    fn catch_all_probe_uses_responding_host() {
        let (tx, rx) = mpsc::channel();
        let primary = MockSmtp::new("primary", Mailboxes::None).spawn(tx.clone());
        let backup = MockSmtp::new("backup", Mailboxes::Only(vec![TARGET])).spawn(tx);
        let resolver = stub_for(
            vec![
                ExchangeHost::new("primary.example.com", 10),
                ExchangeHost::new("backup.example.com", 20),
            ],
            vec![
                ("primary.example.com", primary),
                ("backup.example.com", backup),
            ],
        );

        let report = verify_with_resolver(TARGET, &options(), &resolver);

        assert_eq!(report.result.reason, Reason::ValidAddress);
        let catch_all = report.catch_all.expect("catch-all probe ran");
        assert_eq!(catch_all.attempt.exchange.hostname, "backup.example.com");
        let connects: Vec<_> = crate::probe::testing::drain(&rx)
            .into_iter()
            .filter(|(_, line)| line == "CONNECT")
            .map(|(name, _)| name)
            .collect();
        assert_eq!(connects, ["primary", "backup", "backup"]);
    }

    /// A host that accepts the real mailbox and then vanishes before the
    /// catch-all session: the address is still reported valid.
    #[test]
    fn catch_all_connection_failure_fails_open() {
        let (tx, rx) = mpsc::channel();
        let port = MockSmtp::new("mx", Mailboxes::Only(vec![TARGET])).spawn(tx);
        let resolver = OneShotRoutes::new(port);

        let report = verify_with_resolver(TARGET, &options(), &resolver);
        assert_eq!(report.result.reason, Reason::ValidAddress);
        assert!(report.result.valid);
        assert_eq!(
            report.catch_all.as_ref().map(|c| c.verdict),
            Some(CatchAllVerdict::Undetermined)
        );
        drop(rx);

        let strict = options().fail_closed();
        let resolver = OneShotRoutes::new(port);
        let report = verify_with_resolver(TARGET, &strict, &resolver);
        assert_eq!(report.result.reason, Reason::CatchAll);
    }

    #[test]
    fn repeated_runs_agree() {
        let resolver = single_host(Mailboxes::Only(vec![TARGET]));
        let first = verify_with_resolver(TARGET, &options(), &resolver);
        let second = verify_with_resolver(TARGET, &options(), &resolver);
        assert_eq!(first.result, second.result);
    }

    #[test]
    fn default_options_target_port_25() {
        let options = VerifyOptions::default();
        assert_eq!(options.probe, ProbeOptions::default());
        assert_eq!(options.probe.port, 25);
    }

    /// Resolves `mx.example.com` to the mock server once, then to a closed port.
    struct OneShotRoutes {
        port: u16,
        closed: u16,
        lookups: std::cell::Cell<usize>,
    }

    impl OneShotRoutes {
        fn new(port: u16) -> Self {
            Self {
                port,
                closed: closed_port(),
                lookups: std::cell::Cell::new(0),
            }
        }
    }

    impl LookupMx for OneShotRoutes {
        fn lookup_mx(&self, _domain: &str) -> Result<Vec<ExchangeHost>, ResolveError> {
            Ok(vec![ExchangeHost::new("mx.example.com", 10)])
        }
    }

    impl LookupHost for OneShotRoutes {
        fn lookup_host(
            &self,
            _host: &str,
            _port: u16,
        ) -> Result<Vec<std::net::SocketAddr>, ResolveError> {
            let seen = self.lookups.get();
            self.lookups.set(seen + 1);
            let port = if seen == 0 { self.port } else { self.closed };
            Ok(vec![std::net::SocketAddr::from(([127, 0, 0, 1], port))])
        }
    }
}
