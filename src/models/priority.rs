//! Per-domain submission priorities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority granted to requests for websites on a domain until `expire`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainPriority {
    pub id: i32,
    pub domain: String,
    pub priority: i32,
    pub expire: DateTime<Utc>,
}

impl DomainPriority {
    /// Whether this entry covers `host` (the domain itself or a subdomain).
    pub fn covers(&self, host: &str, now: DateTime<Utc>) -> bool {
        if self.expire <= now {
            return false;
        }
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let domain = self.domain.trim_end_matches('.').to_ascii_lowercase();
        host == domain
            || host
                .strip_suffix(&domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(domain: &str, expire: DateTime<Utc>) -> DomainPriority {
        DomainPriority {
            id: 1,
            domain: domain.to_string(),
            priority: 5,
            expire,
        }
    }

    #[test]
    fn covers_domain_and_subdomains() {
        let now = Utc::now();
        let p = entry("Example.com", now + Duration::days(1));
        assert!(p.covers("example.com", now));
        assert!(p.covers("www.example.com", now));
        assert!(!p.covers("badexample.com", now));
        assert!(!p.covers("example.org", now));
    }

    #[test]
    fn expired_entry_covers_nothing() {
        let now = Utc::now();
        let p = entry("example.com", now - Duration::seconds(1));
        assert!(!p.covers("example.com", now));
    }
}
