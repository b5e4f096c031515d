use std::collections::HashSet;
use std::net::SocketAddr;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
};

use super::{Error, ExchangeHost, MxStatus};

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS. The resulting
/// [`MxStatus`] lists the exchangers by ascending priority; hosts sharing a
/// priority keep the order the resolver returned them in.
pub fn check_mx(domain: &str) -> Result<MxStatus, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = system_resolver()?;
    resolve_with(&resolver, &ascii)
}

/// Lookup the exchange hosts of `domain`, preferred first.
///
/// Unlike [`check_mx`], an empty answer is an error
/// ([`Error::NoExchangers`]) so callers get one failure path for "no mail
/// server".
pub fn resolve_exchanges(domain: &str) -> Result<Vec<ExchangeHost>, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = system_resolver()?;
    exchanges_with(&resolver, &ascii)
}

pub(crate) fn system_resolver() -> Result<Resolver, Error> {
    Resolver::from_system_conf().map_err(|source| Error::ResolverInit { source })
}

pub(crate) fn exchanges_with<R>(
    resolver: &R,
    ascii_domain: &str,
) -> Result<Vec<ExchangeHost>, Error>
where
    R: LookupMx + ?Sized,
{
    match resolve_with(resolver, ascii_domain)? {
        MxStatus::Records(records) => Ok(records),
        MxStatus::NoRecords => Err(Error::NoExchangers {
            domain: ascii_domain.to_string(),
        }),
    }
}

pub(crate) fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxStatus, Error>
where
    R: LookupMx + ?Sized,
{
    let records = resolver
        .lookup_mx(ascii_domain)
        .map_err(|err| Error::lookup(ascii_domain, err))?;
    let records = order_exchanges(records);

    if records.is_empty() {
        Ok(MxStatus::NoRecords)
    } else {
        Ok(MxStatus::Records(records))
    }
}

/// Stable sort by priority, then drop repeated (host, priority) pairs.
pub(crate) fn order_exchanges(mut records: Vec<ExchangeHost>) -> Vec<ExchangeHost> {
    records.sort_by_key(|host| host.priority);
    let mut seen = HashSet::new();
    records.retain(|host| seen.insert((host.hostname.clone(), host.priority)));
    records
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(|err| Error::idna(trimmed, err))
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

pub(crate) trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<ExchangeHost>, ResolveError>;
}

/// Address resolution for an exchange hostname, yielding the sockets to dial.
pub(crate) trait LookupHost {
    fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError>;
}

impl<T: LookupMx + ?Sized> LookupMx for &T {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<ExchangeHost>, ResolveError> {
        (**self).lookup_mx(domain)
    }
}

impl<T: LookupHost + ?Sized> LookupHost for &T {
    fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError> {
        (**self).lookup_host(host, port)
    }
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<ExchangeHost>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                tracing::debug!(domain, "no MX records found");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            if exchange.is_empty() {
                // null MX (RFC 7505): the domain accepts no mail
                continue;
            }
            records.push(ExchangeHost::new(exchange, mx.preference()));
        }
        Ok(records)
    }
}

impl LookupHost for Resolver {
    fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError> {
        let lookup = Resolver::lookup_ip(self, host)?;
        Ok(lookup.iter().map(|ip| SocketAddr::new(ip, port)).collect())
    }
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<ExchangeHost>, ResolveError> {
        (self.on_lookup)(domain)
    }
}

#[cfg(test)]
impl LookupHost for crate::mx::tests::StubResolver {
    fn lookup_host(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>, ResolveError> {
        (self.on_host)(host, port)
    }
}
