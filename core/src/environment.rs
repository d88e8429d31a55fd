//! Backend base-URL resolution.
//!
//! The frontend and backend share a host; only the port differs. Loopback
//! hostnames map to the fixed development URL so local tooling keeps
//! working, any other hostname is substituted into the URL so the client
//! works from another machine without a rebuild.

/// Development base URL used for loopback hostnames.
pub const LOCAL_API_BASE_URL: &str = "http://localhost:8000/api";

pub const DEFAULT_BACKEND_PORT: u16 = 8000;
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;

const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Where the backend listens relative to the page's host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendLocation {
    pub port: u16,
    pub prefix: String,
    pub local_base_url: String,
}

impl Default for BackendLocation {
    fn default() -> Self {
        Self {
            port: DEFAULT_BACKEND_PORT,
            prefix: "/api".to_string(),
            local_base_url: LOCAL_API_BASE_URL.to_string(),
        }
    }
}

impl BackendLocation {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            local_base_url: format!("http://localhost:{port}/api"),
            ..Self::default()
        }
    }

    pub fn resolve(&self, hostname: &str) -> String {
        if is_loopback(hostname) {
            return self.local_base_url.clone();
        }
        format!("http://{hostname}:{}{}", self.port, self.prefix)
    }
}

pub fn is_loopback(hostname: &str) -> bool {
    LOOPBACK_HOSTS.contains(&hostname)
}

/// Base URL for the default backend location.
pub fn resolve_api_base_url(hostname: &str) -> String {
    BackendLocation::default().resolve(hostname)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    /// Only the literal `development` selects development; any other mode
    /// string is treated as a production build.
    pub fn from_mode(mode: &str) -> Self {
        if mode == "development" {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }
}

/// Ports and API URL of one build mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub mode: BuildMode,
    pub api_base_url: String,
    pub frontend_port: u16,
    pub backend_port: u16,
}

impl EnvironmentProfile {
    /// Production profiles address the backend on the live hostname.
    pub fn for_mode(mode: BuildMode, hostname: &str, location: &BackendLocation) -> Self {
        let api_base_url = match mode {
            BuildMode::Development => location.local_base_url.clone(),
            BuildMode::Production => location.resolve(hostname),
        };
        Self {
            mode,
            api_base_url,
            frontend_port: DEFAULT_FRONTEND_PORT,
            backend_port: location.port,
        }
    }
}
