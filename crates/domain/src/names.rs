//! Name helpers used when preparing batches: reverse-lookup names and
//! subdomain expansion.

use std::net::IpAddr;

const IPV4_REVERSE_ZONE: &str = "in-addr.arpa";
const IPV6_REVERSE_ZONE: &str = "ip6.arpa";

/// Builds the PTR lookup name for `ip`.
///
/// IPv4-mapped IPv6 addresses are treated as IPv4.
///
/// ```
/// use dnsbatch_domain::reverse_name;
///
/// assert_eq!(reverse_name("1.2.3.4".parse().unwrap()), "4.3.2.1.in-addr.arpa");
/// ```
pub fn reverse_name(ip: IpAddr) -> String {
    match ip.to_canonical() {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            format!(
                "{}.{}.{}.{}.{}",
                octets[3], octets[2], octets[1], octets[0], IPV4_REVERSE_ZONE
            )
        }
        IpAddr::V6(ipv6) => {
            let mut name = String::with_capacity(64 + IPV6_REVERSE_ZONE.len());
            for byte in ipv6.octets().iter().rev() {
                name.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
            }
            name.push_str(IPV6_REVERSE_ZONE);
            name
        }
    }
}

/// Lists every subdomain of `base` leading to `sub`, most specific first.
///
/// `subdomains("a.b.c.base.com", "base.com")` yields
/// `["a.b.c.base.com", "b.c.base.com", "c.base.com"]`. The base itself is never
/// included. Returns an empty list when `sub` does not have more labels than
/// `base` or does not end with it.
pub fn subdomains(sub: &str, base: &str) -> Vec<String> {
    let sub = sub.trim_end_matches('.');
    let base = base.trim_end_matches('.');

    let sub_labels: Vec<&str> = sub.split('.').collect();
    let base_labels: Vec<&str> = base.split('.').collect();

    if sub_labels.len() <= base_labels.len() {
        return Vec::new();
    }

    let extra = sub_labels.len() - base_labels.len();
    let is_suffix = sub_labels[extra..]
        .iter()
        .zip(&base_labels)
        .all(|(a, b)| a.eq_ignore_ascii_case(b));
    if !is_suffix {
        return Vec::new();
    }

    (0..extra).map(|i| sub_labels[i..].join(".")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_reverse_name_ipv4() {
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        assert_eq!(reverse_name(ip), "4.3.2.1.in-addr.arpa");
    }

    #[test]
    fn test_reverse_name_ipv6() {
        let ip: IpAddr = "2606:4700:4700::1111".parse().unwrap();
        assert_eq!(
            reverse_name(ip),
            "1.1.1.1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.7.4.0.0.7.4.6.0.6.2.ip6.arpa"
        );
    }

    #[test]
    fn test_reverse_name_ipv4_mapped() {
        let ip = IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0x0102, 0x0304));
        assert_eq!(reverse_name(ip), "4.3.2.1.in-addr.arpa");
    }

    #[test]
    fn test_subdomains_most_specific_first() {
        assert_eq!(
            subdomains("a.b.c.base.com", "base.com"),
            vec!["a.b.c.base.com", "b.c.base.com", "c.base.com"]
        );
    }

    #[test]
    fn test_subdomains_not_longer_than_base() {
        assert!(subdomains("base.com", "base.com").is_empty());
        assert!(subdomains("com", "base.com").is_empty());
    }

    #[test]
    fn test_subdomains_foreign_base() {
        assert!(subdomains("a.b.example.org", "base.com").is_empty());
    }

    #[test]
    fn test_subdomains_ignores_trailing_root() {
        assert_eq!(subdomains("x.base.com.", "base.com"), vec!["x.base.com"]);
    }
}
