//! Client endpoint configuration.
//!
//! [`KernelEndpoint`] identifies one running kernel behind a notebook
//! server. Settings can also come from environment variables (or a `.env`
//! file via `dotenvy`) through [`KernelEndpoint::from_env`].

use std::fmt;

/// Address of one running kernel behind a notebook server.
///
/// Immutable once the owning client is constructed. The websocket URL is
/// derived per connection attempt via [`KernelEndpoint::channels_url`];
/// the token travels in the `Authorization` request header, not the URL.
#[derive(Clone, PartialEq, Eq)]
pub struct KernelEndpoint {
    /// Notebook server hostname or IP address.
    pub host: String,
    /// Notebook server port.
    pub port: u16,
    /// URL prefix the server is mounted under. Normalized: empty for the
    /// server root, otherwise `/`-prefixed with no trailing slash.
    pub base_url: String,
    /// Identifier of the kernel to attach to.
    pub kernel_id: String,
    /// API token expected by the server.
    pub token: String,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
}

impl KernelEndpoint {
    /// Creates an endpoint for a kernel on a server mounted at the root.
    #[must_use]
    pub fn new(host: &str, port: u16, kernel_id: &str, token: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            base_url: String::new(),
            kernel_id: kernel_id.to_string(),
            token: token.to_string(),
            secure: false,
        }
    }

    /// Sets the URL prefix the server is mounted under.
    ///
    /// Accepts any slash placement (`"jupyter"`, `"/jupyter/"`, ...) and
    /// normalizes it.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    /// Switches the endpoint to `wss://`.
    ///
    /// Requires the `native-tls` crate feature for the handshake to
    /// succeed.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Loads an endpoint from environment variables.
    ///
    /// `JUPYTER_KERNEL_ID` and `JUPYTER_TOKEN` are required.
    /// `JUPYTER_HOST`, `JUPYTER_PORT`, `JUPYTER_BASE_URL` and
    /// `JUPYTER_SECURE` fall back to `localhost`, `8888`, the server root
    /// and plaintext respectively. Calls `dotenvy::dotenv().ok()` to
    /// optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is not set.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let host = std::env::var("JUPYTER_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = parse_env("JUPYTER_PORT", 8888);
        let base_url = std::env::var("JUPYTER_BASE_URL").unwrap_or_default();
        let kernel_id =
            std::env::var("JUPYTER_KERNEL_ID").map_err(|_| "JUPYTER_KERNEL_ID is not set")?;
        let token = std::env::var("JUPYTER_TOKEN").map_err(|_| "JUPYTER_TOKEN is not set")?;
        let secure = parse_env_bool("JUPYTER_SECURE", false);

        Ok(Self {
            host,
            port,
            base_url: normalize_base_url(&base_url),
            kernel_id,
            token,
            secure,
        })
    }

    /// Builds the websocket URL of the kernel's channels endpoint for the
    /// given client session.
    #[must_use]
    pub fn channels_url(&self, session_id: &str) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}{}/api/kernels/{}/channels?session_id={session_id}",
            self.host, self.port, self.base_url, self.kernel_id
        )
    }
}

impl fmt::Debug for KernelEndpoint {
    // Token kept out of logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("kernel_id", &self.kernel_id)
            .field("token", &"<redacted>")
            .field("secure", &self.secure)
            .finish()
    }
}

/// Normalizes a base URL prefix: empty stays empty, anything else gets a
/// single leading slash and no trailing slash.
fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
