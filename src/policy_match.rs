use std::net::IpAddr;

use ipnetwork::{IpNetwork, Ipv4Network};
use regex::Regex;
use url::Url;

use crate::types::{Identifier, IdentifierKind};

/// Case-insensitive exact match of DNS names.
pub(crate) fn dns_literal_match(expected: &str, name: &str) -> bool {
    name.eq_ignore_ascii_case(expected)
}

/// `suffix` carries its leading dot (`.example.com`); at least one label must precede it.
pub(crate) fn subdomain_match(suffix: &str, name: &str) -> bool {
    if name.len() <= suffix.len() {
        return false;
    }
    name.get(name.len() - suffix.len()..)
        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

pub(crate) fn email_literal_match(expected: &str, address: &str) -> bool {
    address.eq_ignore_ascii_case(expected)
}

/// `domain` carries its leading `@` (`@example.com`); the local part must be non-empty.
pub(crate) fn email_domain_match(domain: &str, address: &str) -> bool {
    subdomain_match(domain, address)
}

/// The candidate (address or range) must lie entirely inside `network`.
pub(crate) fn network_match(network: &IpNetwork, candidate: &str) -> bool {
    let Some(candidate) = parse_network(candidate) else {
        return false;
    };
    network.is_ipv4() == candidate.is_ipv4()
        && network.prefix() <= candidate.prefix()
        && network.contains(candidate.network())
}

pub(crate) fn regex_match(re: &Regex, value: &str) -> bool {
    re.is_match(value)
}

/// Case-sensitive exact match, used for common names and SSH principals.
pub(crate) fn exact_match(expected: &str, value: &str) -> bool {
    value == expected
}

/// Accepts `192.0.2.1`, `2001:db8::1` and CIDR forms like `10.0.0.0/8`.
///
/// IPv4-mapped IPv6 values (`::ffff:10.0.0.1`, `::ffff:10.0.0.0/104`) come
/// back as their IPv4 equivalent so both spellings hit the same rules.
pub(crate) fn parse_network(value: &str) -> Option<IpNetwork> {
    let network = if value.contains('/') {
        value.parse::<IpNetwork>().ok()?
    } else {
        IpNetwork::from(value.parse::<IpAddr>().ok()?)
    };
    Some(unmap_ipv4(network))
}

fn unmap_ipv4(network: IpNetwork) -> IpNetwork {
    let IpNetwork::V6(v6) = network else {
        return network;
    };
    match v6.ip().to_ipv4_mapped() {
        Some(v4) if v6.prefix() >= 96 => Ipv4Network::new(v4, v6.prefix() - 96)
            .map(IpNetwork::V4)
            .unwrap_or(network),
        _ => network,
    }
}

/// A DNS name as it may appear in a certificate: no empty labels, so no
/// leading or trailing dot, and no whitespace or control characters.
pub(crate) fn is_host_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|label| !label.is_empty())
        && !name.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Whether `identifier` can be interpreted as its kind at all.
///
/// Identifiers failing this check are denied before any rule is consulted.
pub(crate) fn is_well_formed(identifier: &Identifier) -> bool {
    let value = identifier.value();
    if value.is_empty() {
        return false;
    }
    match identifier.kind() {
        IdentifierKind::Uri => Url::parse(value)
            .is_ok_and(|url| url.domain().is_none_or(is_host_name)),
        IdentifierKind::IpRange => parse_network(value).is_some(),
        IdentifierKind::Email => value
            .rsplit_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && is_host_name(domain)),
        IdentifierKind::Dns => is_host_name(value),
        IdentifierKind::CommonName | IdentifierKind::Principal => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        one_label = { ".example.com", "a.example.com", true },
        two_labels = { ".example.com", "b.a.example.com", true },
        apex = { ".example.com", "example.com", false },
        case_insensitive = { ".example.com", "WWW.Example.Com", true },
        lookalike = { ".example.com", "badexample.com", false },
        empty_label = { ".example.com", ".example.com", false },
        multibyte = { ".example.com", "ü.example.com", true },
        short = { ".example.com", "com", false },
    )]
    fn test_subdomain_match(suffix: &str, name: &str, expected: bool) {
        assert_eq!(subdomain_match(suffix, name), expected);
    }

    #[test]
    fn test_subdomain_match_never_splits_chars() {
        // Slicing at a non-boundary must fail closed instead of panicking.
        assert!(!subdomain_match(".com", "ab€com"));
    }

    #[parameterized(
        same = { "alice@example.com", "alice@example.com", true },
        case = { "alice@example.com", "Alice@EXAMPLE.com", true },
        other = { "alice@example.com", "bob@example.com", false },
    )]
    fn test_email_literal_match(expected: &str, address: &str, result: bool) {
        assert_eq!(email_literal_match(expected, address), result);
    }

    #[parameterized(
        hit = { "@example.com", "alice@example.com", true },
        case = { "@example.com", "alice@Example.COM", true },
        subdomain = { "@example.com", "alice@mail.example.com", false },
        no_local = { "@example.com", "@example.com", false },
        other = { "@example.com", "alice@example.org", false },
    )]
    fn test_email_domain_match(domain: &str, address: &str, result: bool) {
        assert_eq!(email_domain_match(domain, address), result);
    }

    #[parameterized(
        address_in = { "10.0.0.0/8", "10.1.2.3", true },
        address_out = { "10.0.0.0/8", "11.0.0.1", false },
        range_in = { "10.0.0.0/8", "10.20.0.0/16", true },
        range_wider = { "10.0.0.0/16", "10.0.0.0/8", false },
        single = { "192.0.2.1", "192.0.2.1", true },
        single_other = { "192.0.2.1", "192.0.2.2", false },
        v6_in = { "2001:db8::/32", "2001:db8:1::1", true },
        v6_out = { "2001:db8::/32", "2001:db9::1", false },
        family_mismatch = { "0.0.0.0/0", "::1", false },
        mapped_address = { "10.0.0.0/8", "::ffff:10.0.0.1", true },
        mapped_address_out = { "10.0.0.0/8", "::ffff:11.0.0.1", false },
        mapped_range = { "10.0.0.0/8", "::ffff:10.1.0.0/112", true },
        mapped_range_wider = { "10.0.0.0/8", "::ffff:0.0.0.0/96", false },
        mapped_pattern = { "::ffff:10.0.0.0/104", "10.2.3.4", true },
        mapped_not_in_v6_range = { "::/0", "::ffff:10.0.0.1", false },
        garbage = { "10.0.0.0/8", "ten.0.0.1", false },
    )]
    fn test_network_match(network: &str, candidate: &str, expected: bool) {
        let network = parse_network(network).unwrap();
        assert_eq!(network_match(&network, candidate), expected);
    }

    #[parameterized(
        dns = { Identifier::dns("www.example.com"), true },
        empty_dns = { Identifier::dns(""), false },
        uri = { Identifier::uri("https://example.com/x"), true },
        relative_uri = { Identifier::uri("/just/a/path"), false },
        ip = { Identifier::ip("192.0.2.1"), true },
        cidr = { Identifier::ip("10.0.0.0/8"), true },
        bad_ip = { Identifier::ip("300.0.0.1"), false },
        email = { Identifier::email("a@example.com"), true },
        email_no_at = { Identifier::email("example.com"), false },
        principal = { Identifier::principal("root"), true },
        dns_wildcard = { Identifier::dns("*.example.com"), true },
        dns_trailing_dot = { Identifier::dns("db.internal.example.com."), false },
        dns_leading_dot = { Identifier::dns(".example.com"), false },
        dns_empty_label = { Identifier::dns("www..example.com"), false },
        dns_space = { Identifier::dns("www example.com"), false },
        dns_newline = { Identifier::dns("www.example.com\n"), false },
        email_trailing_dot = { Identifier::email("a@example.com."), false },
        email_empty_label = { Identifier::email("a@mail..example.com"), false },
        uri_trailing_dot = { Identifier::uri("https://secret.example.com./"), false },
        uri_ip_host = { Identifier::uri("https://192.0.2.1/x"), true },
        uri_no_host = { Identifier::uri("urn:uuid:6e8bc430-9c3a-11d9-9669-0800200c9a66"), true },
    )]
    fn test_is_well_formed(identifier: Identifier, expected: bool) {
        assert_eq!(is_well_formed(&identifier), expected);
    }
}
