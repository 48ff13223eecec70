use std::collections::HashMap;
use std::env;
use std::io::{self, IsTerminal};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::distribution::{DevpiCredentials, DevpiTarget};
use crate::net::keep_proxies;
use crate::release::{GithubTarget, RepoSlug};
use crate::RelayError;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_DEVPI_USER: &str = "root";
pub const DEFAULT_DEVPI_INDEX: &str = "dev";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

/// Process environment captured once at startup.
#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    /// Returns the value of `key`; blank values count as unset.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub(crate) fn raw(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub(crate) fn flag_is_enabled(&self, key: &str) -> bool {
        self.var(key).is_some_and(is_truthy)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) github: GithubSettings,
    pub(crate) devpi: DevpiSettings,
    pub(crate) network: NetworkSettings,
    pub(crate) progress: bool,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let progress = match snapshot.raw("GHPI_PROGRESS") {
            Some(value) => value.trim() != "0",
            None => io::stderr().is_terminal(),
        };
        Self {
            github: GithubSettings {
                repo: snapshot.var("GITHUB_REPO").map(ToOwned::to_owned),
                token: snapshot.var("GITHUB_PAT").map(ToOwned::to_owned),
                api_url: snapshot
                    .var("GITHUB_API_URL")
                    .unwrap_or(DEFAULT_GITHUB_API_URL)
                    .to_string(),
            },
            devpi: DevpiSettings {
                server: snapshot.var("DEVPI_SERVER").map(ToOwned::to_owned),
                user: snapshot
                    .var("DEVPI_USER")
                    .unwrap_or(DEFAULT_DEVPI_USER)
                    .to_string(),
                password: snapshot.var("DEVPI_PASSWORD").map(ToOwned::to_owned),
                index: snapshot
                    .var("DEVPI_INDEX")
                    .unwrap_or(DEFAULT_DEVPI_INDEX)
                    .to_string(),
                use_proxy: snapshot.flag_is_enabled("DEVPI_USE_PROXY"),
            },
            network: NetworkSettings {
                keep_proxies: keep_proxies(snapshot),
            },
            progress,
        }
    }

    #[must_use]
    pub fn github(&self) -> &GithubSettings {
        &self.github
    }

    #[must_use]
    pub fn devpi(&self) -> &DevpiSettings {
        &self.devpi
    }

    #[must_use]
    pub fn network(&self) -> NetworkSettings {
        self.network
    }

    #[must_use]
    pub fn progress(&self) -> bool {
        self.progress
    }
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub repo: Option<String>,
    pub token: Option<String>,
    pub api_url: String,
}

impl GithubSettings {
    /// Combines command-line overrides with the environment and validates the
    /// result before any request is made.
    ///
    /// # Errors
    /// Returns [`RelayError::Config`] when the token or repository is missing
    /// or malformed.
    pub fn resolve(&self, repo: Option<&str>, token: Option<&str>) -> Result<GithubTarget, RelayError> {
        let token = non_empty(token)
            .or(self.token.as_deref())
            .ok_or_else(|| {
                RelayError::config(
                    "GITHUB_PAT is not set",
                    "Pass --token or export GITHUB_PAT.",
                )
            })?;
        let repo = non_empty(repo)
            .or(self.repo.as_deref())
            .ok_or_else(|| {
                RelayError::config(
                    "GITHUB_REPO is not set",
                    "Pass --repo owner/name or export GITHUB_REPO.",
                )
            })?;
        let repo = RepoSlug::parse(repo)?;
        if let Err(err) = Url::parse(&self.api_url) {
            return Err(RelayError::config(
                format!("GITHUB_API_URL is not a valid URL ({}): {err}", self.api_url),
                "Unset GITHUB_API_URL to use https://api.github.com.",
            ));
        }
        Ok(GithubTarget {
            repo,
            token: token.to_string(),
            api_url: self.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DevpiSettings {
    pub server: Option<String>,
    pub user: String,
    pub password: Option<String>,
    pub index: String,
    pub use_proxy: bool,
}

/// Command-line values that take precedence over `DEVPI_*` variables.
#[derive(Debug, Clone, Default)]
pub struct DevpiOverrides {
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub index: Option<String>,
    pub use_proxy: bool,
}

impl DevpiSettings {
    #[must_use]
    pub fn merged(&self, overrides: &DevpiOverrides) -> Self {
        let pick = |value: &Option<String>, fallback: &str| {
            non_empty(value.as_deref()).unwrap_or(fallback).to_string()
        };
        Self {
            server: non_empty(overrides.server.as_deref())
                .map(ToOwned::to_owned)
                .or_else(|| self.server.clone()),
            user: pick(&overrides.user, &self.user),
            password: non_empty(overrides.password.as_deref())
                .map(ToOwned::to_owned)
                .or_else(|| self.password.clone()),
            index: pick(&overrides.index, &self.index),
            use_proxy: overrides.use_proxy || self.use_proxy,
        }
    }

    /// Resolves the upload endpoint `{server}/{user}/{index}/`.
    ///
    /// # Errors
    /// Returns [`RelayError::Config`] when no server is configured or the
    /// server is not an http(s) URL.
    pub fn target(&self) -> Result<DevpiTarget, RelayError> {
        let server = self.server.as_deref().ok_or_else(|| {
            RelayError::config(
                "DEVPI_SERVER is not set",
                "export DEVPI_SERVER=\"http://devpi.example.com\"",
            )
        })?;
        let base = server.trim().trim_end_matches('/');
        let index_url = format!("{base}/{}/{}/", self.user, self.index);
        match Url::parse(&index_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(RelayError::config(
                    format!("DEVPI_SERVER must use http or https, got {}", url.scheme()),
                    "export DEVPI_SERVER=\"http://devpi.example.com\"",
                ))
            }
            Err(err) => {
                return Err(RelayError::config(
                    format!("DEVPI_SERVER is not a valid URL ({server}): {err}"),
                    "export DEVPI_SERVER=\"http://devpi.example.com\"",
                ))
            }
        }
        Ok(DevpiTarget {
            index_url,
            credentials: DevpiCredentials {
                user: self.user.clone(),
                password: self.password.clone().unwrap_or_default(),
            },
            use_proxy: self.use_proxy,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkSettings {
    /// Whether GitHub traffic honours the standard proxy variables.
    pub keep_proxies: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = Config::from_snapshot(&EnvSnapshot::testing(&[("GHPI_PROGRESS", "0")]));
        assert_eq!(config.devpi().user, "root");
        assert_eq!(config.devpi().index, "dev");
        assert!(!config.devpi().use_proxy);
        assert!(config.devpi().server.is_none());
        assert_eq!(config.github().api_url, DEFAULT_GITHUB_API_URL);
        assert!(!config.progress());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let snapshot = EnvSnapshot::testing(&[
            ("DEVPI_SERVER", "  "),
            ("DEVPI_USER", ""),
            ("GITHUB_PAT", ""),
        ]);
        let config = Config::from_snapshot(&snapshot);
        assert!(config.devpi().server.is_none());
        assert_eq!(config.devpi().user, "root");
        assert!(config.github().token.is_none());
    }

    #[test]
    fn use_proxy_accepts_common_truthy_spellings() {
        for (raw, expected) in [
            ("true", true),
            ("TRUE", true),
            ("1", true),
            ("on", true),
            ("false", false),
            ("0", false),
            ("maybe", false),
        ] {
            let snapshot = EnvSnapshot::testing(&[("DEVPI_USE_PROXY", raw)]);
            assert_eq!(
                Config::from_snapshot(&snapshot).devpi().use_proxy,
                expected,
                "DEVPI_USE_PROXY={raw}"
            );
        }
    }

    #[test]
    fn devpi_target_builds_index_url() -> Result<(), RelayError> {
        let snapshot = EnvSnapshot::testing(&[
            ("DEVPI_SERVER", "http://devpi.internal:3141/"),
            ("DEVPI_USER", "ci"),
            ("DEVPI_PASSWORD", "s3cret"),
            ("DEVPI_INDEX", "staging"),
        ]);
        let target = Config::from_snapshot(&snapshot).devpi().target()?;
        assert_eq!(target.index_url, "http://devpi.internal:3141/ci/staging/");
        assert_eq!(target.credentials.user, "ci");
        assert_eq!(target.credentials.password, "s3cret");
        Ok(())
    }

    #[test]
    fn devpi_target_requires_a_server() {
        let config = Config::from_snapshot(&EnvSnapshot::testing(&[]));
        let err = config.devpi().target().expect_err("missing server");
        assert_eq!(err.reason(), "missing_config");
        assert!(err.to_string().contains("DEVPI_SERVER"));

        let snapshot = EnvSnapshot::testing(&[("DEVPI_SERVER", "ftp://devpi.internal")]);
        let err = Config::from_snapshot(&snapshot)
            .devpi()
            .target()
            .expect_err("bad scheme");
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn overrides_take_precedence_over_environment() -> Result<(), RelayError> {
        let snapshot = EnvSnapshot::testing(&[
            ("DEVPI_SERVER", "http://env.example"),
            ("DEVPI_PASSWORD", "from-env"),
        ]);
        let overrides = DevpiOverrides {
            server: Some("https://cli.example".into()),
            user: Some("alice".into()),
            password: None,
            index: Some("prod".into()),
            use_proxy: true,
        };
        let merged = Config::from_snapshot(&snapshot).devpi().merged(&overrides);
        assert!(merged.use_proxy);
        let target = merged.target()?;
        assert_eq!(target.index_url, "https://cli.example/alice/prod/");
        assert_eq!(target.credentials.password, "from-env");
        Ok(())
    }

    #[test]
    fn github_resolution_checks_token_then_repo() {
        let settings = Config::from_snapshot(&EnvSnapshot::testing(&[])).github().clone();
        let err = settings.resolve(None, None).expect_err("missing token");
        assert!(err.to_string().contains("GITHUB_PAT"));

        let err = settings
            .resolve(None, Some("ghp_token"))
            .expect_err("missing repo");
        assert!(err.to_string().contains("GITHUB_REPO"));

        let err = settings
            .resolve(Some("just-a-name"), Some("ghp_token"))
            .expect_err("malformed repo");
        assert_eq!(err.reason(), "missing_config");
    }

    #[test]
    fn github_resolution_prefers_flags() -> Result<(), RelayError> {
        let snapshot = EnvSnapshot::testing(&[
            ("GITHUB_REPO", "env/repo"),
            ("GITHUB_PAT", "env-token"),
            ("GITHUB_API_URL", "http://127.0.0.1:9/api/"),
        ]);
        let target = Config::from_snapshot(&snapshot)
            .github()
            .resolve(Some("flag/repo"), None)?;
        assert_eq!(target.repo.to_string(), "flag/repo");
        assert_eq!(target.token, "env-token");
        assert_eq!(target.api_url, "http://127.0.0.1:9/api");
        Ok(())
    }

    #[test]
    #[serial]
    fn capture_reads_process_environment() {
        let previous = env::var("DEVPI_INDEX").ok();
        env::set_var("DEVPI_INDEX", "captured");
        let config = Config::from_env();
        match previous {
            Some(value) => env::set_var("DEVPI_INDEX", value),
            None => env::remove_var("DEVPI_INDEX"),
        }
        assert_eq!(config.devpi().index, "captured");
    }
}
