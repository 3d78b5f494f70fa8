//! The request descriptor handed to the guard by the host pipeline.

use std::collections::BTreeMap;
use std::net::IpAddr;

use url::Url;

use super::{GuardError, Result};

/// TLS settings the transport will use for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// Whether the server certificate is verified.
    pub verify: bool,

    /// Server name sent in the TLS handshake. `None` means the transport
    /// uses the request hostname.
    pub sni_hostname: Option<String>,
}

impl TlsSettings {
    pub fn verified() -> Self {
        Self {
            verify: true,
            sni_hostname: None,
        }
    }

    pub fn unverified() -> Self {
        Self {
            verify: false,
            sni_hostname: None,
        }
    }
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self::verified()
    }
}

/// One outbound request, as seen by the guard.
///
/// `hostname` holds a bare name or IP literal (IPv6 without brackets).
/// `headers` is always present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub scheme: String,
    pub hostname: String,
    pub port: Option<u16>,
    /// Path and query, starting with `/`.
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub tls: Option<TlsSettings>,
}

impl RequestDescriptor {
    /// Create a descriptor for `scheme://hostname/`.
    ///
    /// `https` requests get verified TLS settings by default.
    pub fn new(scheme: impl Into<String>, hostname: impl Into<String>) -> Self {
        let scheme = scheme.into().to_ascii_lowercase();
        let tls = (scheme == "https").then(TlsSettings::verified);
        Self {
            scheme,
            hostname: hostname.into(),
            port: None,
            path: "/".to_string(),
            headers: BTreeMap::new(),
            tls,
        }
    }

    /// Parse an absolute `http`/`https` URL.
    pub fn from_url(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| GuardError::InvalidRequest(e.to_string()))?;
        Self::try_from(&url)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_tls(mut self, tls: Option<TlsSettings>) -> Self {
        self.tls = tls;
        self
    }

    pub fn is_https(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }

    /// Whether the transport will verify the server certificate.
    pub fn verifies_tls(&self) -> bool {
        self.tls.as_ref().is_some_and(|tls| tls.verify)
    }

    /// Port to connect to, falling back to the scheme default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| default_port(&self.scheme))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing value under any casing.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.into());
    }

    /// `host[:port]`, bracketing IPv6 literals. The port is omitted when it
    /// is unset or equals the scheme default.
    pub fn authority(&self) -> String {
        let host = url_host(&self.hostname);
        match self.port {
            Some(port) if Some(port) != default_port(&self.scheme) => format!("{host}:{port}"),
            _ => host,
        }
    }

    /// The request target as a URL string, used in error reports.
    pub fn target(&self) -> String {
        format!("{}://{}{}", self.scheme, self.authority(), self.path)
    }

    /// Rebuild the URL the transport should request.
    pub fn to_url(&self) -> Result<Url> {
        Url::parse(&self.target()).map_err(|e| GuardError::InvalidRequest(e.to_string()))
    }
}

impl TryFrom<&Url> for RequestDescriptor {
    type Error = GuardError;

    fn try_from(url: &Url) -> Result<Self> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(GuardError::InvalidRequest(format!(
                "unsupported scheme: {scheme}"
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| GuardError::InvalidRequest("missing host".to_string()))?;
        let hostname = host.trim_start_matches('[').trim_end_matches(']');

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        let mut descriptor = Self::new(scheme, hostname).with_path(path);
        descriptor.port = url.port();
        Ok(descriptor)
    }
}

/// Default port for `http` and `https`.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme.to_ascii_lowercase().as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

fn url_host(hostname: &str) -> String {
    match hostname.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => hostname.to_string(),
    }
}
