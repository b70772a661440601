use thiserror::Error;

use crate::deadline::Expiry;

/// Reasons a domain could not be resolved to mail exchangers. The orchestrator
/// reports every one of them as `InvalidDomain`.
#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("MX lookup failed: {source}")]
    Lookup {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("no MX records for {domain}")]
    NoRecords { domain: String },
    #[error("{domain} publishes a null MX and accepts no mail")]
    NullMx { domain: String },
    #[error("MX lookup not started: {0}")]
    Expired(Expiry),
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn lookup(source: trust_dns_resolver::error::ResolveError) -> Self {
        Self::Lookup { source }
    }
}
