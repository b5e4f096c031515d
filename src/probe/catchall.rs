use rand::{Rng, distributions::Alphanumeric};

use crate::mx::{ExchangeHost, LookupHost};

use super::options::ProbeOptions;
use super::prober::converse;
use super::types::{AttemptOutcome, AttemptStage, CatchAllProbe, CatchAllVerdict};

const DECOY_LEN: usize = 24;

/// Asks `host` to accept a fabricated mailbox at `domain`. Session failures
/// are reported as [`CatchAllVerdict::Undetermined`], never as errors.
pub(crate) fn detect_catch_all_with<R>(
    resolver: &R,
    host: &ExchangeHost,
    domain: &str,
    local_part: &str,
    options: &ProbeOptions,
) -> CatchAllProbe
where
    R: LookupHost + ?Sized,
{
    let decoy = format!("{}@{domain}", decoy_local_part(local_part));
    let attempt = converse(resolver, host, &decoy, options);
    let verdict = classify(&attempt.outcome);
    match verdict {
        CatchAllVerdict::CatchAll => {
            tracing::info!(exchange = %host.hostname, domain, "domain accepts any recipient")
        }
        CatchAllVerdict::NotCatchAll => {
            tracing::debug!(exchange = %host.hostname, domain, "decoy recipient rejected")
        }
        CatchAllVerdict::Undetermined => tracing::warn!(
            exchange = %host.hostname,
            domain,
            outcome = %attempt.outcome,
            "catch-all check could not complete"
        ),
    }
    CatchAllProbe { verdict, attempt }
}

pub(crate) fn classify(outcome: &AttemptOutcome) -> CatchAllVerdict {
    match outcome {
        AttemptOutcome::Accepted { .. } => CatchAllVerdict::CatchAll,
        AttemptOutcome::Rejected {
            stage: AttemptStage::RcptTo,
            ..
        } => CatchAllVerdict::NotCatchAll,
        _ => CatchAllVerdict::Undetermined,
    }
}

/// Random lower-case alphanumeric local part, distinct from `avoid`.
pub(crate) fn decoy_local_part(avoid: &str) -> String {
    loop {
        let candidate: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(DECOY_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        if !candidate.eq_ignore_ascii_case(avoid) {
            return candidate;
        }
    }
}
