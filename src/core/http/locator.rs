use std::fmt;

use crate::core::error::{DownloadError, DownloadResult};

pub const HTTP_PORT: u16 = 80;

/// Host and path of a download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    /// Host as written in the URL, including an explicit `:port` if any
    pub host: String,
    /// Request target, always starting with `/`
    pub path: String,
}

impl ResourceLocator {
    /// Splits `[http://]host[/path]` at the first `/` after the host.
    pub fn parse(url: &str) -> DownloadResult<Self> {
        let url = url.trim();
        let rest = match url.find("://") {
            Some(idx) => {
                let scheme = &url[..idx];
                if !scheme.eq_ignore_ascii_case("http") {
                    return Err(DownloadError::UnsupportedProtocol(scheme.to_string()));
                }
                &url[idx + 3..]
            }
            None => url,
        };

        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if host.is_empty() {
            return Err(DownloadError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        })
    }

    /// Host name without the port suffix or IPv6 brackets.
    pub fn host_name(&self) -> &str {
        self.split_host().0
    }

    pub fn port(&self) -> u16 {
        self.split_host().1.unwrap_or(HTTP_PORT)
    }

    /// `name[:port]` or `[v6-literal][:port]`.
    fn split_host(&self) -> (&str, Option<u16>) {
        if let Some(bracketed) = self.host.strip_prefix('[') {
            if let Some((name, rest)) = bracketed.split_once(']') {
                let port = rest.strip_prefix(':').and_then(|p| p.parse().ok());
                return (name, port);
            }
        }
        match self.host.rsplit_once(':') {
            Some((name, port)) => match port.parse() {
                Ok(port) => (name, Some(port)),
                Err(_) => (self.host.as_str(), None),
            },
            None => (self.host.as_str(), None),
        }
    }

    /// Final path segment, used as the output file name.
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.path)
    }
}
