//! Origin validation for wallet-provider injection
//!
//! Injection is only permitted into documents whose hostname is a local
//! development host, an exact allow-listed production host, or a subdomain
//! of the trusted suffix. Anything that fails to parse is rejected.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use url::Url;

/// Local development hosts (any port, any scheme)
const DEV_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0"];

/// Suffix whose subdomains are trusted
const TRUSTED_SUFFIX: &str = "svmseek.com";

/// Exact production hostnames permitted to receive wallet providers
static ALLOWED_HOSTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["svmseek.com", "wallet.svmseek.com", "develop.svmseek.com"]
        .into_iter()
        .collect()
});

/// Decide whether wallet-provider injection into `url` is permitted.
///
/// Total over all inputs: malformed URLs are rejected, never allowed.
pub fn is_allowed(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    let host = match parsed.host_str() {
        Some(host) => host.to_ascii_lowercase(),
        None => return false,
    };

    if DEV_HOSTS.contains(&host.as_str()) {
        return true;
    }

    if ALLOWED_HOSTS.contains(host.as_str()) {
        return true;
    }

    // Subdomains only: "app.svmseek.com" yes, "notsvmseek.com" no.
    host.strip_suffix(TRUSTED_SUFFIX)
        .map_or(false, |prefix| prefix.ends_with('.'))
}

/// Resolve the concrete origin string ("scheme://host[:port]") of a URL.
///
/// Returns `None` for unparsable URLs and for opaque origins, so callers
/// can fall back rather than post to a target they cannot name.
pub fn resolve_origin(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_hosts_allowed() {
        assert!(is_allowed("http://localhost"));
        assert!(is_allowed("http://localhost:3000"));
        assert!(is_allowed("https://127.0.0.1:8080/path?query=1"));
        assert!(is_allowed("http://0.0.0.0:4000"));
    }

    #[test]
    fn test_production_hosts_allowed() {
        assert!(is_allowed("https://svmseek.com"));
        assert!(is_allowed("https://wallet.svmseek.com/dapp"));
        assert!(is_allowed("https://develop.svmseek.com"));
    }

    #[test]
    fn test_trusted_subdomains_allowed() {
        assert!(is_allowed("https://app.svmseek.com"));
        assert!(is_allowed("https://deep.nested.svmseek.com"));
    }

    #[test]
    fn test_untrusted_hosts_rejected() {
        assert!(!is_allowed("https://malicious-site.example"));
        assert!(!is_allowed("https://evil.com"));
        assert!(!is_allowed("https://notsvmseek.com"));
        assert!(!is_allowed("https://svmseek.com.evil.com"));
    }

    #[test]
    fn test_malformed_urls_rejected() {
        assert!(!is_allowed(""));
        assert!(!is_allowed("not a url"));
        assert!(!is_allowed("://missing-scheme"));
        assert!(!is_allowed("data:text/html,<h1>hi</h1>"));
    }

    #[test]
    fn test_hostname_case_insensitive() {
        assert!(is_allowed("https://SVMSeek.com"));
        assert!(is_allowed("https://App.SVMSEEK.com"));
    }

    #[test]
    fn test_resolve_origin() {
        assert_eq!(
            resolve_origin("http://localhost:3000/page?x=1").as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(
            resolve_origin("https://app.svmseek.com/dapp").as_deref(),
            Some("https://app.svmseek.com")
        );
        assert_eq!(resolve_origin("not a url"), None);
        assert_eq!(resolve_origin("data:text/plain,x"), None);
    }
}
