use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const LOOPBACK_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "::1", "[::1]"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("empty disk endpoint")]
    Empty,
    #[error("disk endpoint {0:?} has no path")]
    MissingPath(String),
}

/// A configured disk: either a local path or `host:/path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    raw: String,
    host: Option<String>,
    path: String,
}

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The host without a trailing `:port`.
    pub fn host_name(&self) -> Option<&str> {
        self.host.as_deref().map(|host| split_port(host).0)
    }

    /// Port of the peer's rpc server, when the endpoint names one
    /// (`host:port:/path`).
    pub fn port(&self) -> Option<u16> {
        self.host.as_deref().and_then(|host| split_port(host).1)
    }

    /// True when the disk has no host part or names one of `local_hosts`
    /// (loopback names always count as local).
    pub fn is_local<S: AsRef<str>>(&self, local_hosts: &[S]) -> bool {
        match &self.host {
            None => true,
            Some(host) => {
                let name = split_port(host).0;
                LOOPBACK_HOSTS.contains(&name)
                    || local_hosts
                        .iter()
                        .any(|h| h.as_ref() == host || h.as_ref() == name)
            }
        }
    }
}

/// Splits `name:port`. Bare IPv6 addresses keep their colons; a bracketed
/// one may carry a port.
fn split_port(host: &str) -> (&str, Option<u16>) {
    if let Some((name, port)) = host.rsplit_once(':') {
        let bracketed = name.starts_with('[') && name.ends_with(']');
        if !name.is_empty() && (bracketed || !name.contains(':')) {
            if let Ok(port) = port.parse() {
                return (name, Some(port));
            }
        }
    }
    (host, None)
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(EndpointError::Empty);
        }

        // The last ':' separates the host, so bracketed IPv6 hosts survive.
        let (host, path) = match raw.rfind(':') {
            Some(idx) if idx > 0 && !raw[..idx].contains('/') => {
                (Some(raw[..idx].to_string()), raw[idx + 1..].to_string())
            }
            _ => (None, raw.to_string()),
        };
        if path.is_empty() {
            return Err(EndpointError::MissingPath(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            host,
            path,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
