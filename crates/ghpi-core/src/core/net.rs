use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::EnvSnapshot;

pub(crate) const USER_AGENT: &str = concat!("ghpi/", env!("CARGO_PKG_VERSION"));

/// Timeout applied to GitHub API and asset requests.
pub(crate) const GITHUB_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout applied to a single DevPI upload.
pub(crate) const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ProxyMode {
    /// Honour `HTTP_PROXY` and friends.
    System,
    /// Connect directly regardless of the environment.
    Disabled,
}

impl ProxyMode {
    pub(crate) fn from_flag(keep: bool) -> Self {
        if keep {
            ProxyMode::System
        } else {
            ProxyMode::Disabled
        }
    }
}

pub(crate) fn build_http_client(timeout: Duration, proxy: ProxyMode) -> reqwest::Result<Client> {
    let builder = Client::builder().user_agent(USER_AGENT).timeout(timeout);
    let builder = match proxy {
        ProxyMode::System => builder,
        ProxyMode::Disabled => builder.no_proxy(),
    };
    builder.build()
}

/// Decide whether GitHub traffic should honour standard proxy variables.
///
/// - `GHPI_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `GHPI_KEEP_PROXIES=0/false/no/off/""` forces proxies off.
/// - If unset, proxies are used only when at least one proxy variable is set.
pub(crate) fn keep_proxies(env: &EnvSnapshot) -> bool {
    const PROXY_KEYS: &[&str] = &[
        "HTTP_PROXY",
        "http_proxy",
        "HTTPS_PROXY",
        "https_proxy",
        "ALL_PROXY",
        "all_proxy",
    ];
    match env.raw("GHPI_KEEP_PROXIES") {
        Some(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        None => PROXY_KEYS.iter().any(|key| env.var(key).is_some()),
    }
}
