use std::fmt;

/// A mail exchanger for a domain. Lower `priority` is preferred.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExchangeHost {
    pub hostname: String,
    pub priority: u16,
}

impl ExchangeHost {
    pub fn new(hostname: impl Into<String>, priority: u16) -> Self {
        Self {
            hostname: hostname.into(),
            priority,
        }
    }
}

impl fmt::Display for ExchangeHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.priority, self.hostname)
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MxStatus {
    Records(Vec<ExchangeHost>),
    NoRecords,
}

impl MxStatus {
    pub fn records(&self) -> &[ExchangeHost] {
        match self {
            Self::Records(records) => records.as_slice(),
            Self::NoRecords => &[],
        }
    }
}
