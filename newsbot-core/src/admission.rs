//! URL admission outcomes

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Why a candidate URL was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Scheme is not `https`
    NonHttps,
    /// Host is empty after normalization
    MissingHost,
    /// Host is neither an allowlisted domain nor a subdomain of one
    DomainNotAllowlisted,
    /// DNS returned no addresses
    UnresolvedHost,
    /// A resolved address is private, loopback, link-local, multicast or reserved
    ForbiddenIp(IpAddr),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NonHttps => write!(f, "non-https"),
            RejectReason::MissingHost => write!(f, "missing-host"),
            RejectReason::DomainNotAllowlisted => write!(f, "domain-not-allowlisted"),
            RejectReason::UnresolvedHost => write!(f, "unresolved-host"),
            RejectReason::ForbiddenIp(ip) => write!(f, "forbidden-ip:{}", ip),
        }
    }
}

/// Result of validating one URL; carries at most one reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Allowed,
    Rejected(RejectReason),
}

impl ValidationOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ValidationOutcome::Allowed)
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            ValidationOutcome::Allowed => None,
            ValidationOutcome::Rejected(reason) => Some(reason),
        }
    }
}

impl From<RejectReason> for ValidationOutcome {
    fn from(reason: RejectReason) -> Self {
        ValidationOutcome::Rejected(reason)
    }
}
