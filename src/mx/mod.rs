//! DNS MX resolution (second pipeline stage).
//!
//! [`check_mx`] performs a synchronous lookup with the system resolver and
//! returns a [`MxStatus`]; [`resolve_exchanges`] returns the ordered hosts
//! directly and treats an empty answer as an error.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{check_mx, resolve_exchanges};
pub use types::{ExchangeHost, MxStatus};

pub(crate) use resolver::{LookupHost, LookupMx, exchanges_with, order_exchanges, system_resolver};
