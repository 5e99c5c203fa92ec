//! Structured URI constraints.
//!
//! Grammar (scheme and host compare case-insensitively, paths case-sensitively):
//!
//! - `example.com`, `*.example.com`: any scheme and path on that host
//! - `spiffe://`: any URI with that scheme
//! - `https://example.com[:port]`: scheme and host, any path
//! - `https://example.com/exact`: exact path
//! - `https://example.com/api/*`: any path below `/api/`

use std::net::Ipv6Addr;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::PolicyError;
use crate::policy_match::subdomain_match;
use crate::types::RuleKind;

static HOST_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\*\.)?[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*$").expect("host regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Exact(String),
    /// Stored with its leading dot, e.g. `.example.com`.
    Subdomain(String),
}

impl HostPattern {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Exact(expected) => host.eq_ignore_ascii_case(expected),
            HostPattern::Subdomain(suffix) => subdomain_match(suffix, host),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    /// Stored with its trailing slash, e.g. `/api/`.
    Prefix(String),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// A parsed `uri-constraint` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriConstraint {
    scheme: Option<String>,
    host: Option<HostPattern>,
    port: Option<u16>,
    path: Option<PathPattern>,
}

impl UriConstraint {
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: String| PolicyError::configuration(RuleKind::UriConstraint, raw, reason);

        if raw.is_empty() {
            return Err(invalid("constraint is empty".into()));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("constraint contains whitespace".into()));
        }
        if raw.contains(['?', '#']) {
            return Err(invalid("query strings and fragments are not supported".into()));
        }
        if raw.contains('@') {
            return Err(invalid("user information is not supported".into()));
        }

        let Some((scheme, rest)) = raw.split_once("://") else {
            if raw.contains('/') {
                return Err(invalid(
                    "a domain-only constraint cannot carry a path, use scheme://host/path".into(),
                ));
            }
            let (host, port) = parse_authority(raw).map_err(invalid)?;
            if port.is_some() {
                return Err(invalid("a domain-only constraint cannot carry a port".into()));
            }
            return Ok(UriConstraint {
                scheme: None,
                host: Some(host),
                port: None,
                path: None,
            });
        };

        if !is_valid_scheme(scheme) {
            return Err(invalid(format!("invalid scheme {scheme:?}")));
        }
        let scheme = Some(scheme.to_ascii_lowercase());

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx..])),
            None => (rest, None),
        };

        if authority.is_empty() {
            if path.is_some() {
                return Err(invalid("missing host".into()));
            }
            return Ok(UriConstraint {
                scheme,
                host: None,
                port: None,
                path: None,
            });
        }

        let (host, port) = parse_authority(authority).map_err(invalid)?;
        let path = path.map(parse_path).transpose().map_err(invalid)?;

        Ok(UriConstraint {
            scheme,
            host: Some(host),
            port,
            path,
        })
    }

    /// Match against a full URI string. Unparseable candidates never match.
    pub fn matches(&self, candidate: &str) -> bool {
        match Url::parse(candidate) {
            Ok(url) => self.matches_url(&url),
            Err(_) => false,
        }
    }

    pub fn matches_url(&self, url: &Url) -> bool {
        if let Some(scheme) = &self.scheme {
            if !url.scheme().eq_ignore_ascii_case(scheme) {
                return false;
            }
        }

        if let Some(host) = &self.host {
            match url.host_str() {
                Some(candidate) if host.matches(candidate) => {}
                _ => return false,
            }
        }

        if let Some(port) = self.port {
            if url.port_or_known_default() != Some(port) {
                return false;
            }
        }

        if let Some(path) = &self.path {
            let candidate = match url.path() {
                "" => "/",
                p => p,
            };
            if !path.matches(candidate) {
                return false;
            }
        }

        true
    }
}

impl FromStr for UriConstraint {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UriConstraint::parse(s)
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn parse_authority(authority: &str) -> Result<(HostPattern, Option<u16>), String> {
    if let Some(rest) = authority.strip_prefix('[') {
        let (addr, after) = rest
            .split_once(']')
            .ok_or_else(|| "unterminated IPv6 literal".to_string())?;
        let addr: Ipv6Addr = addr
            .parse()
            .map_err(|e| format!("invalid IPv6 literal {addr:?}: {e}"))?;
        let port = match after {
            "" => None,
            other => {
                let port = other
                    .strip_prefix(':')
                    .ok_or_else(|| format!("unexpected {other:?} after IPv6 literal"))?;
                Some(parse_port(port)?)
            }
        };
        return Ok((HostPattern::Exact(format!("[{addr}]")), port));
    }

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, Some(parse_port(port)?)),
        None => (authority, None),
    };

    if !HOST_NAME.is_match(host) {
        return Err(format!("invalid host {host:?}"));
    }

    let host = host.to_ascii_lowercase();
    let host = match host.strip_prefix('*') {
        Some(suffix) => HostPattern::Subdomain(suffix.to_string()),
        None => HostPattern::Exact(host),
    };
    Ok((host, port))
}

fn parse_port(port: &str) -> Result<u16, String> {
    port.parse::<u16>()
        .map_err(|_| format!("invalid port {port:?}"))
}

fn parse_path(path: &str) -> Result<PathPattern, String> {
    if let Some(prefix) = path.strip_suffix("/*") {
        if prefix.contains('*') {
            return Err("wildcards are only allowed as a trailing /*".to_string());
        }
        return Ok(PathPattern::Prefix(format!("{prefix}/")));
    }
    if path.contains('*') {
        return Err("wildcards are only allowed as a trailing /*".to_string());
    }
    Ok(PathPattern::Exact(path.to_string()))
}
