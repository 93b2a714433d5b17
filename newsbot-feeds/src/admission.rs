//! URL admission control
//!
//! Every candidate article URL must pass, in order: an HTTPS scheme check, a
//! non-empty host, the domain allowlist (exact or subdomain match) and a live
//! DNS resolution whose every address is publicly routable. The first failing
//! check decides the outcome.
//!
//! Resolution happens at validation time, not at fetch time, so a hostname
//! that was safe on a previous run must still resolve safely now.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use newsbot_core::{RejectReason, ValidationOutcome};
use tracing::{debug, warn};
use url::{Host, Url};

use crate::error::NewsError;

/// IPv4 blocks that are never fetched, as (network, prefix length)
const FORBIDDEN_V4: &[(Ipv4Addr, u8)] = &[
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(100, 64, 0, 0), 10),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 0, 0, 0), 24),
    (Ipv4Addr::new(192, 0, 2, 0), 24),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(198, 18, 0, 0), 15),
    (Ipv4Addr::new(198, 51, 100, 0), 24),
    (Ipv4Addr::new(203, 0, 113, 0), 24),
    (Ipv4Addr::new(224, 0, 0, 0), 4),
    (Ipv4Addr::new(240, 0, 0, 0), 4),
];

/// IPv6 blocks that are never fetched, as (network, prefix length)
const FORBIDDEN_V6: &[(Ipv6Addr, u8)] = &[
    (Ipv6Addr::UNSPECIFIED, 128),
    (Ipv6Addr::LOCALHOST, 128),
    (Ipv6Addr::new(0x0064, 0xff9b, 0, 0, 0, 0, 0, 0), 96),
    (Ipv6Addr::new(0x0100, 0, 0, 0, 0, 0, 0, 0), 64),
    // IETF protocol assignments, Teredo included
    (Ipv6Addr::new(0x2001, 0, 0, 0, 0, 0, 0, 0), 23),
    (Ipv6Addr::new(0x2001, 0x0db8, 0, 0, 0, 0, 0, 0), 32),
    (Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7),
    (Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10),
    (Ipv6Addr::new(0xff00, 0, 0, 0, 0, 0, 0, 0), 8),
];

// ============================================================================
// Allowlist
// ============================================================================

/// Set of normalized domains whose pages may be fetched
#[derive(Debug, Clone)]
pub struct Allowlist {
    domains: HashSet<String>,
}

impl Allowlist {
    /// Load a newline-delimited allowlist file.
    ///
    /// Blank lines and `#` comments are ignored. A missing or empty file is a
    /// configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NewsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            NewsError::InvalidConfig(format!("Allowlist not found at {}: {}", path.display(), e))
        })?;

        Self::parse(&contents).map_err(|_| {
            NewsError::InvalidConfig(format!("Allowlist at {} is empty", path.display()))
        })
    }

    /// Parse allowlist contents
    pub fn parse(contents: &str) -> Result<Self, NewsError> {
        Self::from_domains(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Build from domain strings, normalizing each one
    pub fn from_domains<I, S>(domains: I) -> Result<Self, NewsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains: HashSet<String> = domains
            .into_iter()
            .map(|d| normalize_domain(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();

        if domains.is_empty() {
            return Err(NewsError::InvalidConfig("Allowlist is empty".to_string()));
        }

        Ok(Self { domains })
    }

    /// Exact match or subdomain of an allowed entry
    pub fn permits(&self, domain: &str) -> bool {
        self.domains.iter().any(|allowed| {
            domain == allowed
                || domain
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Lowercase and strip surrounding whitespace and dots
pub fn normalize_domain(host: &str) -> String {
    host.trim().trim_matches('.').to_lowercase()
}

// ============================================================================
// DNS resolution
// ============================================================================

/// Resolves a hostname to its current set of addresses
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Unique addresses for `host`; empty when resolution fails
    async fn resolve(&self, host: &str) -> Vec<IpAddr>;
}

/// Resolver backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Vec<IpAddr> {
        match tokio::net::lookup_host((host, 443)).await {
            Ok(addrs) => {
                let mut seen = HashSet::new();
                addrs
                    .map(|addr| addr.ip())
                    .filter(|ip| seen.insert(*ip))
                    .collect()
            }
            Err(e) => {
                warn!("Failed to resolve {}: {}", host, e);
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Address safety
// ============================================================================

/// Whether an address must never be fetched
pub fn is_forbidden_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_forbidden_v4(&mapped);
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || FORBIDDEN_V6
                    .iter()
                    .any(|(net, prefix)| in_v6_block(v6, net, *prefix))
        }
    }
}

fn is_forbidden_v4(ip: &Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || FORBIDDEN_V4
            .iter()
            .any(|(net, prefix)| in_v4_block(ip, net, *prefix))
}

fn in_v4_block(ip: &Ipv4Addr, net: &Ipv4Addr, prefix: u8) -> bool {
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    u32::from(*ip) & mask == u32::from(*net) & mask
}

fn in_v6_block(ip: &Ipv6Addr, net: &Ipv6Addr, prefix: u8) -> bool {
    let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
    u128::from(*ip) & mask == u128::from(*net) & mask
}

// ============================================================================
// Validator
// ============================================================================

/// SSRF-safe URL admission control
#[derive(Clone)]
pub struct UrlValidator {
    resolver: Arc<dyn HostResolver>,
}

impl UrlValidator {
    /// Create a validator using the system resolver
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(SystemResolver))
    }

    /// Create a validator with a custom resolver
    pub fn with_resolver(resolver: Arc<dyn HostResolver>) -> Self {
        Self { resolver }
    }

    /// Validate a candidate URL against the allowlist and live DNS
    pub async fn validate(&self, url: &str, allowlist: &Allowlist) -> ValidationOutcome {
        let parsed = match Url::parse(url.trim()) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Unparseable URL {}: {}", url, e);
                return if raw_scheme(url).eq_ignore_ascii_case("https") {
                    RejectReason::MissingHost.into()
                } else {
                    RejectReason::NonHttps.into()
                };
            }
        };

        if !parsed.scheme().eq_ignore_ascii_case("https") {
            return RejectReason::NonHttps.into();
        }

        let domain = match parsed.host() {
            Some(Host::Domain(domain)) => normalize_domain(domain),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => String::new(),
        };
        if domain.is_empty() {
            return RejectReason::MissingHost.into();
        }

        if !allowlist.permits(&domain) {
            return RejectReason::DomainNotAllowlisted.into();
        }

        let addresses = self.resolver.resolve(&domain).await;
        if addresses.is_empty() {
            return RejectReason::UnresolvedHost.into();
        }

        if let Some(ip) = addresses.iter().find(|ip| is_forbidden_ip(ip)) {
            return RejectReason::ForbiddenIp(*ip).into();
        }

        ValidationOutcome::Allowed
    }
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn raw_scheme(url: &str) -> &str {
    url.trim().split_once(':').map(|(scheme, _)| scheme).unwrap_or("")
}
