//! Page-load metadata needed to replay a request for an extracted link

use serde::{Deserialize, Serialize};

/// Browser cookie as captured after navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable bundle of source URL, user-agent and cookie jar for one page load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub source_url: String,
    pub user_agent: String,
    /// Capture order is preserved in the serialized cookie header.
    #[serde(default)]
    pub cookies: Vec<Cookie>,
}

impl SessionContext {
    pub fn new(
        source_url: impl Into<String>,
        user_agent: impl Into<String>,
        cookies: Vec<Cookie>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            user_agent: user_agent.into(),
            cookies,
        }
    }

    /// `name=value` pairs joined with `"; "`.
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn request_headers(&self) -> RequestHeaders {
        RequestHeaders {
            referer: self.source_url.clone(),
            user_agent: self.user_agent.clone(),
            cookie: self.cookie_header(),
        }
    }
}

/// Headers a client sends when fetching an extracted link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeaders {
    pub referer: String,
    #[serde(rename = "user-agent")]
    pub user_agent: String,
    pub cookie: String,
}
