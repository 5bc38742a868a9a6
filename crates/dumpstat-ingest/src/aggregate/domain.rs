//! Registrable domain extraction for post sources

use url::{Host, Url};

/// Label for a source that is not a parsable absolute URL with a host
pub const INVALID_DOMAIN: &str = "invalid";

/// Label for an empty source
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Public-suffix-aware domain of a source URL.
///
/// `https://sub.example.co.uk/x` becomes `example.co.uk`. IP literals and
/// hosts without a registrable domain keep their full host name.
pub fn source_domain(source: &str) -> String {
    let source = source.trim();
    if source.is_empty() {
        return UNKNOWN_DOMAIN.to_string();
    }

    let Ok(url) = Url::parse(source) else {
        return INVALID_DOMAIN.to_string();
    };

    match url.host() {
        Some(Host::Domain(host)) => {
            let host = host.trim_end_matches('.');
            psl::domain_str(host).unwrap_or(host).to_string()
        },
        Some(ip) => ip.to_string(),
        None => INVALID_DOMAIN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrable_domain() {
        assert_eq!(source_domain("https://sub.example.co.uk/x"), "example.co.uk");
        assert_eq!(source_domain("https://www.furaffinity.net/view/1/"), "furaffinity.net");
        assert_eq!(source_domain("http://twitter.com/someone"), "twitter.com");
    }

    #[test]
    fn test_invalid_and_unknown() {
        assert_eq!(source_domain("not a url"), INVALID_DOMAIN);
        assert_eq!(source_domain("mailto:someone@example.com"), INVALID_DOMAIN);
        assert_eq!(source_domain(""), UNKNOWN_DOMAIN);
        assert_eq!(source_domain("   "), UNKNOWN_DOMAIN);
    }

    #[test]
    fn test_ip_hosts_are_kept_whole() {
        assert_eq!(source_domain("http://192.168.0.1/image.png"), "192.168.0.1");
    }
}
