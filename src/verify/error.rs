use thiserror::Error;

use crate::mx::Error as MxError;

/// Internal failures of the pipeline. Address-level outcomes (bad syntax,
/// missing MX, refused mailbox, catch-all) are [`Reason`](crate::Reason)s,
/// not errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("cannot build DNS resolver: {source}")]
    Resolver {
        #[from]
        source: MxError,
    },
}
