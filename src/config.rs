use crate::error::ConfigError;
use std::path::{Path, PathBuf};

pub const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";
pub const DEFAULT_NEO4J_USER: &str = "neo4j";

/// Which stages of the run to execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Load, resolve, write the store, then analyze and export.
    Full,
    /// Reuse the existing store contents; analyze and export only.
    SkipImport,
    /// Reuse the existing store contents; print the analysis only.
    AnalysisOnly,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct NetworkOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub mode: RunMode,
    pub demo_mode: bool,   // synthesize sample links when no crossposts exist
    pub progress: bool,    // show progress bars
    pub top_n: usize,      // entries in the summary's top source/destination lists
    pub graphml_name: String,
    pub summary_name: String,
    pub node_link_name: String,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input.json"),
            output_dir: PathBuf::from("."),
            mode: RunMode::Full,
            demo_mode: false,
            progress: true,
            top_n: 10,
            graphml_name: "reddit_crosspost_network.graphml".to_string(),
            summary_name: "reddit_crosspost_network.json".to_string(),
            node_link_name: "reddit_crosspost_network.nodelink.json".to_string(),
        }
    }
}

impl NetworkOptions {
    pub fn with_input(mut self, path: impl AsRef<Path>) -> Self {
        self.input = path.as_ref().to_path_buf();
        self
    }
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }
    pub fn with_demo_mode(mut self, yes: bool) -> Self {
        self.demo_mode = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    /// Length of the summary's top lists; 0 leaves them empty.
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn graphml_path(&self) -> PathBuf { self.output_dir.join(&self.graphml_name) }
    pub fn summary_path(&self) -> PathBuf { self.output_dir.join(&self.summary_name) }
    pub fn node_link_path(&self) -> PathBuf { self.output_dir.join(&self.node_link_name) }
}

/// Graph store connection settings. The password has no default.
#[derive(Clone)]
pub struct StoreConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl StoreConfig {
    /// Resolve settings from explicit values first, then the environment (`.env` included).
    /// - NEO4J_URI: defaults to a local instance
    /// - NEO4J_USER: defaults to `neo4j`
    /// - NEO4J_PASSWORD: required
    pub fn resolve(
        uri: Option<String>,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::resolve_with(uri, user, password, |k| std::env::var(k).ok())
    }

    /// Same as `resolve`, with the environment lookup injected.
    pub fn resolve_with(
        uri: Option<String>,
        user: Option<String>,
        password: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let nonempty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

        let uri = nonempty(uri)
            .or_else(|| nonempty(env("NEO4J_URI")))
            .unwrap_or_else(|| DEFAULT_NEO4J_URI.to_string());
        if !uri.contains("://") {
            return Err(ConfigError::InvalidUri(uri));
        }
        let user = nonempty(user)
            .or_else(|| nonempty(env("NEO4J_USER")))
            .unwrap_or_else(|| DEFAULT_NEO4J_USER.to_string());
        let password = nonempty(password)
            .or_else(|| nonempty(env("NEO4J_PASSWORD")))
            .ok_or(ConfigError::MissingCredential("NEO4J_PASSWORD"))?;

        Ok(Self { uri, user, password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_password_is_fatal() {
        let err = StoreConfig::resolve_with(None, None, None, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential("NEO4J_PASSWORD")));

        let err = StoreConfig::resolve_with(None, None, Some("  ".into()), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(_)));
    }

    #[test]
    fn explicit_values_win_over_env() {
        let env = |k: &str| match k {
            "NEO4J_URI" => Some("neo4j://env:7687".to_string()),
            "NEO4J_PASSWORD" => Some("from-env".to_string()),
            _ => None,
        };
        let cfg = StoreConfig::resolve_with(Some("bolt://cli:7687".into()), None, None, env).unwrap();
        assert_eq!(cfg.uri, "bolt://cli:7687");
        assert_eq!(cfg.user, DEFAULT_NEO4J_USER);
        assert_eq!(cfg.password, "from-env");
        assert!(!format!("{cfg:?}").contains("from-env"));
    }

    #[test]
    fn top_n_is_taken_as_given() {
        assert_eq!(NetworkOptions::default().top_n, 10);
        assert_eq!(NetworkOptions::default().with_top_n(0).top_n, 0);
        assert_eq!(NetworkOptions::default().with_top_n(3).top_n, 3);
    }

    #[test]
    fn uri_without_scheme_rejected() {
        let err = StoreConfig::resolve_with(Some("localhost".into()), None, Some("pw".into()), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUri(_)));
    }
}
