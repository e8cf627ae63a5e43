use std::fmt;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;
use fanout_common::{FanoutError, Result};

/// An upstream HTTP server, identified by scheme and authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    scheme: Scheme,
    authority: Authority,
}

impl Backend {
    /// Parses `http://host:port` or a bare `host:port`.
    ///
    /// Any path on the configured URL is ignored; requests keep their own path.
    pub fn parse(url: &str) -> Result<Self> {
        let with_scheme = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };

        let uri: Uri = with_scheme
            .parse()
            .map_err(|e| FanoutError::Configuration(format!("Invalid backend '{}': {}", url, e)))?;

        let scheme = uri.scheme().cloned().unwrap_or(Scheme::HTTP);
        if scheme != Scheme::HTTP {
            return Err(FanoutError::Configuration(format!(
                "Unsupported scheme for backend '{}': only http is supported",
                url
            )));
        }

        let authority = uri.authority().cloned().ok_or_else(|| {
            FanoutError::Configuration(format!("Backend '{}' has no host", url))
        })?;

        Ok(Self { scheme, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Builds the URI for `path_and_query` on this backend.
    pub fn uri_with(&self, path_and_query: PathAndQuery) -> Result<Uri> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| FanoutError::InvalidRequest(format!("Cannot build URI: {}", e)))
    }

    /// Rewrites a client request URI to point at this backend, keeping its
    /// path and query.
    pub fn rewrite(&self, original: &Uri) -> Result<Uri> {
        let path_and_query = original
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        self.uri_with(path_and_query)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}
