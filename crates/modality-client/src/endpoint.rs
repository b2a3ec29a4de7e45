//! Endpoint addresses.
//!
//! |------------------------------|----------|--------------|
//! | Scheme                       | Secure   | Default port |
//! |------------------------------|----------|--------------|
//! | `modality-ingest://`         | no       | 14182        |
//! | `modality-ingest-tls://`     | yes      | 14184        |
//! | `modality-mutation://`       | no       | 14192        |
//! | `modality-mutation-tls://`   | yes      | 14194        |
//! |------------------------------|----------|--------------|

use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_INGEST_PORT, DEFAULT_INGEST_TLS_PORT, DEFAULT_MUTATION_PORT,
    DEFAULT_MUTATION_TLS_PORT,
};

/// Which service an endpoint addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Ingest,
    Mutation,
}

impl Plane {
    fn scheme(self, secure: bool) -> &'static str {
        match (self, secure) {
            (Plane::Ingest, false) => "modality-ingest",
            (Plane::Ingest, true) => "modality-ingest-tls",
            (Plane::Mutation, false) => "modality-mutation",
            (Plane::Mutation, true) => "modality-mutation-tls",
        }
    }

    fn default_port(self, secure: bool) -> u16 {
        match (self, secure) {
            (Plane::Ingest, false) => DEFAULT_INGEST_PORT,
            (Plane::Ingest, true) => DEFAULT_INGEST_TLS_PORT,
            (Plane::Mutation, false) => DEFAULT_MUTATION_PORT,
            (Plane::Mutation, true) => DEFAULT_MUTATION_TLS_PORT,
        }
    }
}

/// A parsed service address plus its secure-channel flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    plane: Plane,
    host: String,
    port: u16,
    secure: bool,
}

impl Endpoint {
    /// Build an endpoint; `port: None` picks the plane's default for `secure`.
    pub fn new(plane: Plane, host: impl Into<String>, port: Option<u16>, secure: bool) -> Self {
        Self {
            plane,
            host: host.into(),
            port: port.unwrap_or_else(|| plane.default_port(secure)),
            secure,
        }
    }

    /// `127.0.0.1` on the plane's default plain-TCP port.
    pub fn local(plane: Plane) -> Self {
        Self::new(plane, DEFAULT_HOST, None, false)
    }

    /// Parse a `modality-*://host[:port]` URL.
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| EndpointError::MissingScheme(s.to_string()))?;
        let (plane, secure) = match scheme {
            "modality-ingest" => (Plane::Ingest, false),
            "modality-ingest-tls" => (Plane::Ingest, true),
            "modality-mutation" => (Plane::Mutation, false),
            "modality-mutation-tls" => (Plane::Mutation, true),
            other => return Err(EndpointError::UnknownScheme(other.to_string())),
        };

        let authority = rest.strip_suffix('/').unwrap_or(rest);
        if authority.contains('/') {
            return Err(EndpointError::UnexpectedPath(s.to_string()));
        }

        let (host, port) = split_host_port(authority)?;
        if host.is_empty() {
            return Err(EndpointError::MissingHost(s.to_string()));
        }
        Ok(Self::new(plane, host, port, secure))
    }

    /// Same address with the secure flag overridden. Keeps an explicit port.
    pub fn with_secure(mut self, secure: bool) -> Self {
        if self.port == self.plane.default_port(self.secure) {
            self.port = self.plane.default_port(secure);
        }
        self.secure = secure;
        self
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// `host:port`, bracketing IPv6 literals, suitable for `TcpStream::connect`.
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn split_host_port(authority: &str) -> Result<(&str, Option<u16>), EndpointError> {
    let parse_port = |p: &str| {
        p.parse::<u16>()
            .map_err(|_| EndpointError::InvalidPort(p.to_string()))
    };

    if let Some(v6) = authority.strip_prefix('[') {
        let (host, after) = v6
            .split_once(']')
            .ok_or_else(|| EndpointError::MissingHost(authority.to_string()))?;
        return match after.strip_prefix(':') {
            Some(p) => Ok((host, Some(parse_port(p)?))),
            None if after.is_empty() => Ok((host, None)),
            None => Err(EndpointError::InvalidPort(after.to_string())),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, p)) => Ok((host, Some(parse_port(p)?))),
        None => Ok((authority, None)),
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.plane.scheme(self.secure), self.socket_addr())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("missing scheme in '{0}'")]
    MissingScheme(String),
    #[error("unknown scheme '{0}'")]
    UnknownScheme(String),
    #[error("missing host in '{0}'")]
    MissingHost(String),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("endpoint '{0}' must not contain a path")]
    UnexpectedPath(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let e = Endpoint::parse("modality-ingest://127.0.0.1").unwrap();
        assert_eq!(e.port(), 14182);
        assert!(!e.is_secure());

        let e = Endpoint::parse("modality-ingest-tls://example.com/").unwrap();
        assert_eq!(e.port(), 14184);
        assert!(e.is_secure());
        assert_eq!(e.host(), "example.com");

        let e = Endpoint::parse("modality-mutation://10.0.0.1").unwrap();
        assert_eq!((e.plane(), e.port()), (Plane::Mutation, 14192));
        assert_eq!(Endpoint::parse("modality-mutation-tls://h").unwrap().port(), 14194);
    }

    #[test]
    fn test_explicit_port_and_ipv6() {
        let e = Endpoint::parse("modality-ingest://localhost:9000").unwrap();
        assert_eq!(e.socket_addr(), "localhost:9000");

        let e = Endpoint::parse("modality-mutation://[::1]:7000").unwrap();
        assert_eq!(e.host(), "::1");
        assert_eq!(e.socket_addr(), "[::1]:7000");
        assert_eq!(e.to_string(), "modality-mutation://[::1]:7000");
    }

    #[test]
    fn test_with_secure_switches_default_port_only() {
        let e = Endpoint::local(Plane::Ingest).with_secure(true);
        assert_eq!(e.port(), 14184);
        let e = Endpoint::parse("modality-ingest://h:9000").unwrap().with_secure(true);
        assert_eq!(e.port(), 9000);
        assert!(e.is_secure());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Endpoint::parse("127.0.0.1:14182"), Err(EndpointError::MissingScheme(_))));
        assert!(matches!(Endpoint::parse("http://h"), Err(EndpointError::UnknownScheme(_))));
        assert!(matches!(
            Endpoint::parse("modality-ingest://"),
            Err(EndpointError::MissingHost(_))
        ));
        assert!(matches!(
            Endpoint::parse("modality-ingest://h:99999"),
            Err(EndpointError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("modality-ingest://h/x"),
            Err(EndpointError::UnexpectedPath(_))
        ));
    }
}
