use thiserror::Error;

use super::types::{AttemptOutcome, AttemptStage, SmtpReply};

/// Failure of a single probe conversation. Never escapes the prober: it is
/// folded into the host's [`AttemptOutcome`].
#[derive(Debug, Error)]
pub(crate) enum ProbeError {
    #[error("address lookup for {host} failed: {source}")]
    Resolve {
        host: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("no socket address for {host}")]
    NoAddress { host: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: AttemptStage,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} refused: {reply}")]
    Negative {
        stage: AttemptStage,
        reply: SmtpReply,
    },
}

impl ProbeError {
    pub(crate) fn io(stage: AttemptStage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    pub(crate) fn stage(&self) -> AttemptStage {
        match self {
            Self::Resolve { .. } | Self::NoAddress { .. } => AttemptStage::Resolve,
            Self::Connect { .. } => AttemptStage::Connect,
            Self::Io { stage, .. } | Self::Negative { stage, .. } => *stage,
        }
    }
}

impl From<ProbeError> for AttemptOutcome {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Negative { stage, reply } => AttemptOutcome::Rejected { stage, reply },
            ProbeError::Io { stage, source } => AttemptOutcome::ProtocolError {
                stage,
                message: source.to_string(),
            },
            other => AttemptOutcome::Unreachable {
                message: other.to_string(),
            },
        }
    }
}
