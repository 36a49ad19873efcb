//! Screenshot requests and request groups.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::version::Plugin;

/// Shared parameters for all requests created from one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestGroup {
    pub id: i32,
    pub website: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bits_per_pixel: Option<i32>,
    pub javascript: Option<i32>,
    pub java: Option<i32>,
    pub flash: Option<i32>,
    pub submitted: DateTime<Utc>,
    /// Hard deadline. Member requests are never handed out after this.
    pub expire: DateTime<Utc>,
}

impl RequestGroup {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire <= now
    }

    /// Requested version key for a plugin, if any.
    pub fn plugin(&self, plugin: Plugin) -> Option<i32> {
        match plugin {
            Plugin::Javascript => self.javascript,
            Plugin::Java => self.java,
            Plugin::Flash => self.flash,
        }
    }
}

/// A soft lock held by one factory on one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub factory_id: i32,
    pub locked_at: DateTime<Utc>,
}

impl Claim {
    /// A claim older than the lease no longer blocks other factories.
    pub fn is_stale(&self, now: DateTime<Utc>, lease: Duration) -> bool {
        now - self.locked_at > lease
    }
}

/// A single unit of work: one browser configuration for one website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: i32,
    pub request_group_id: i32,
    /// Operating system family, `None` for any.
    pub platform: Option<String>,
    pub browser_group: String,
    pub major: Option<i32>,
    pub minor: Option<i32>,
    pub priority: i32,
    pub claim: Option<Claim>,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

impl Request {
    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled_at.is_some()
    }

    /// Claim that currently blocks other factories, ignoring stale ones.
    pub fn live_claim(&self, now: DateTime<Utc>, lease: Duration) -> Option<&Claim> {
        self.claim.as_ref().filter(|c| !c.is_stale(now, lease))
    }

    pub fn status(&self, group: &RequestGroup, now: DateTime<Utc>, lease: Duration) -> RequestStatus {
        if self.is_fulfilled() {
            return RequestStatus::Fulfilled;
        }
        if group.is_expired(now) {
            return RequestStatus::Expired;
        }
        match &self.claim {
            None => RequestStatus::Pending,
            Some(claim) if claim.is_stale(now, lease) => RequestStatus::Stale,
            Some(_) => RequestStatus::Claimed,
        }
    }
}

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Claimed,
    Stale,
    Fulfilled,
    Expired,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Stale => "stale",
            Self::Fulfilled => "fulfilled",
            Self::Expired => "expired",
        }
    }
}

/// A request together with its group, as handed out by the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimedRequest {
    pub request: Request,
    pub group: RequestGroup,
}

/// Browser selection for a new request, written `group[:major[.minor]][@platform]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSpec {
    pub browser_group: String,
    pub major: Option<i32>,
    pub minor: Option<i32>,
    pub platform: Option<String>,
}

impl std::str::FromStr for BrowserSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, platform) = match s.split_once('@') {
            Some((rest, platform)) if !platform.is_empty() => {
                (rest, Some(platform.to_lowercase()))
            }
            Some(_) => return Err(format!("empty platform in '{}'", s)),
            None => (s, None),
        };

        let (group, version) = match rest.split_once(':') {
            Some((group, version)) => (group, Some(version)),
            None => (rest, None),
        };
        if group.is_empty() {
            return Err(format!("missing browser name in '{}'", s));
        }

        let parse = |v: &str| {
            v.parse::<i32>()
                .map_err(|_| format!("invalid version number '{}' in '{}'", v, s))
        };
        let (major, minor) = match version {
            None => (None, None),
            Some(v) => match v.split_once('.') {
                Some((major, minor)) => (Some(parse(major)?), Some(parse(minor)?)),
                None => (Some(parse(v)?), None),
            },
        };

        Ok(Self {
            browser_group: group.to_string(),
            major,
            minor,
            platform,
        })
    }
}

/// A submission: group parameters plus one browser selection per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequestGroup {
    pub website: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bits_per_pixel: Option<i32>,
    pub javascript: Option<i32>,
    pub java: Option<i32>,
    pub flash: Option<i32>,
    pub expire: DateTime<Utc>,
    pub browsers: Vec<BrowserSpec>,
}

impl NewRequestGroup {
    pub fn new(website: impl Into<String>, expire: DateTime<Utc>) -> Self {
        Self {
            website: website.into(),
            width: None,
            height: None,
            bits_per_pixel: None,
            javascript: None,
            java: None,
            flash: None,
            expire,
            browsers: Vec::new(),
        }
    }

    pub fn browser(mut self, spec: BrowserSpec) -> Self {
        self.browsers.push(spec);
        self
    }
}

/// Queue counters by lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub claimed: u64,
    pub stale: u64,
    pub fulfilled: u64,
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(expire: DateTime<Utc>) -> RequestGroup {
        RequestGroup {
            id: 1,
            website: "http://example.com/".to_string(),
            width: None,
            height: None,
            bits_per_pixel: None,
            javascript: None,
            java: None,
            flash: None,
            submitted: expire - Duration::minutes(30),
            expire,
        }
    }

    fn request(claim: Option<Claim>) -> Request {
        Request {
            id: 1,
            request_group_id: 1,
            platform: None,
            browser_group: "Firefox".to_string(),
            major: None,
            minor: None,
            priority: 0,
            claim,
            fulfilled_at: None,
        }
    }

    #[test]
    fn claim_goes_stale_after_lease() {
        let now = Utc::now();
        let lease = Duration::seconds(300);
        let claim = Claim {
            factory_id: 7,
            locked_at: now,
        };
        assert!(!claim.is_stale(now + lease, lease));
        assert!(claim.is_stale(now + lease + Duration::milliseconds(1), lease));
    }

    #[test]
    fn status_reflects_lifecycle() {
        let now = Utc::now();
        let lease = Duration::seconds(300);
        let open = group(now + Duration::minutes(10));

        assert_eq!(request(None).status(&open, now, lease), RequestStatus::Pending);

        let live = request(Some(Claim {
            factory_id: 1,
            locked_at: now - Duration::seconds(10),
        }));
        assert_eq!(live.status(&open, now, lease), RequestStatus::Claimed);
        assert!(live.live_claim(now, lease).is_some());

        let stale = request(Some(Claim {
            factory_id: 1,
            locked_at: now - Duration::seconds(301),
        }));
        assert_eq!(stale.status(&open, now, lease), RequestStatus::Stale);
        assert!(stale.live_claim(now, lease).is_none());

        let closed = group(now - Duration::seconds(1));
        assert_eq!(request(None).status(&closed, now, lease), RequestStatus::Expired);

        let mut done = request(None);
        done.fulfilled_at = Some(now);
        assert_eq!(done.status(&closed, now, lease), RequestStatus::Fulfilled);
    }

    #[test]
    fn parse_browser_spec() {
        let spec: BrowserSpec = "Firefox".parse().unwrap();
        assert_eq!(spec.browser_group, "Firefox");
        assert_eq!((spec.major, spec.minor), (None, None));

        let spec: BrowserSpec = "Firefox:2".parse().unwrap();
        assert_eq!((spec.major, spec.minor), (Some(2), None));

        let spec: BrowserSpec = "Opera:9.5@Linux".parse().unwrap();
        assert_eq!(spec.browser_group, "Opera");
        assert_eq!((spec.major, spec.minor), (Some(9), Some(5)));
        assert_eq!(spec.platform.as_deref(), Some("linux"));

        assert!("".parse::<BrowserSpec>().is_err());
        assert!("Firefox:x".parse::<BrowserSpec>().is_err());
        assert!("Firefox@".parse::<BrowserSpec>().is_err());
    }
}
