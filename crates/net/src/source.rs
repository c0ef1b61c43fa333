//! Parsed source URLs

use fetchr_errors::{Error, NetworkError};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// An immutable, validated source URL
///
/// Construction is the only place malformed input is detected; everything
/// downstream works on the parsed form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceUrl(Url);

impl SourceUrl {
    /// Parse and validate a URL string
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidUrl` if the string is not an absolute URL.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let url = Url::parse(input.trim())
            .map_err(|e| NetworkError::InvalidUrl(format!("{input}: {e}")))?;
        Ok(Self(url))
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Host component, `None` when absent or empty
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.0.host_str().filter(|host| !host.is_empty())
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.0.path()
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    /// Path plus query, as sent on a request line
    #[must_use]
    pub fn request_target(&self) -> String {
        let path = if self.path().is_empty() { "/" } else { self.path() };
        match self.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl From<Url> for SourceUrl {
    fn from(url: Url) -> Self {
        Self(url)
    }
}

impl FromStr for SourceUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetchr_errors::FailureKind;

    #[test]
    fn relative_urls_are_malformed() {
        let err = SourceUrl::parse("/repo/index.jar").unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::MalformedInput);
    }

    #[test]
    fn request_target_keeps_query() {
        let url = SourceUrl::parse("https://example.org/repo/index.jar?client=1").unwrap();
        assert_eq!(url.request_target(), "/repo/index.jar?client=1");

        let bare = SourceUrl::parse("bluetooth://AA-BB-CC-DD-EE-FF").unwrap();
        assert_eq!(bare.request_target(), "/");
    }
}
