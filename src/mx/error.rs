use thiserror::Error;

use trust_dns_resolver::error::ResolveError;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain '{domain}' cannot be converted to ASCII")]
    IdnaConversion {
        domain: String,
        #[source]
        source: idna::Errors,
    },
    #[error("system resolver unavailable: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("MX lookup for {domain} failed: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: ResolveError,
    },
    /// Empty answer or null MX only.
    #[error("{domain} publishes no mail exchanger")]
    NoExchangers { domain: String },
}

impl MxError {
    pub(crate) fn idna(domain: &str, source: idna::Errors) -> Self {
        Self::IdnaConversion {
            domain: domain.to_string(),
            source,
        }
    }

    pub(crate) fn lookup(domain: impl Into<String>, source: ResolveError) -> Self {
        Self::Lookup {
            domain: domain.into(),
            source,
        }
    }

    /// `true` for the lookup outcomes that mean "no mail server" to a caller,
    /// as opposed to a local resolver fault.
    pub fn is_no_mail_server(&self) -> bool {
        matches!(self, Self::Lookup { .. } | Self::NoExchangers { .. })
    }
}
