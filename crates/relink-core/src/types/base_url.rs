//! Base URL type for generated links.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::Error;

/// A validated absolute HTTP(S) base URL used as the host part of links.
///
/// A trailing slash is normalized away so joined links never contain
/// `//` after the host.
///
/// # Example
///
/// ```
/// use relink_core::BaseUrl;
///
/// let host = BaseUrl::new("https://api.example.com/").unwrap();
/// assert_eq!(host.as_str(), "https://api.example.com");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Create a new base URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not absolute or not HTTP(S).
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| Error::InvalidUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::InvalidUrl {
                value: s.to_string(),
                reason: "must be an absolute URL with a host".to_string(),
            });
        }

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::InvalidUrl {
                value: s.to_string(),
                reason: "must use http or https".to_string(),
            });
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::InvalidUrl {
                value: s.to_string(),
                reason: "must not carry a query or fragment".to_string(),
            });
        }

        Ok(Self(url))
    }

    /// Returns the URL as a string without a trailing slash.
    pub fn as_str(&self) -> &str {
        self.0.as_str().trim_end_matches('/')
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BaseUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for BaseUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BaseUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BaseUrl::new(&s).map_err(serde::de::Error::custom)
    }
}
