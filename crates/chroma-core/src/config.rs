// Configuration loading and parsing (chroma.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const SETTINGS_FILE: &str = "chroma.toml";
const CREDENTIALS_FILE: &str = "credentials.toml";
const MAX_TIMEOUT_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub sources: SourcesConfig,
    pub aggregator: AggregatorConfig,
    pub session: SessionConfig,
    pub credentials: CredentialsConfig,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// chroma.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire chroma.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    sources: SourcesConfig,
    #[serde(default)]
    aggregator: AggregatorConfig,
    database: DatabaseSection,
    #[serde(default)]
    session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub color_list_url: String,
    pub palette_list_url: String,
    pub generator_url: String,
    pub timeout_secs: u64,
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Keep the first successful palette list for the life of the process.
    pub cache_palettes: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_palettes: true,
        }
    }
}

/// Identity used by the local command loop in place of a chat user.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub user_id: i64,
    pub username: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: 1,
            username: "local".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub bot_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/chroma.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` handles that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- chroma.toml (required) ---
    let settings_path = config_dir.join(SETTINGS_FILE);
    let settings_text = read_file(&settings_path)?;
    let settings: SettingsFile =
        toml::from_str(&settings_text).map_err(|e| ConfigError::ParseError {
            path: settings_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join(CREDENTIALS_FILE);
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        sources: settings.sources,
        aggregator: settings.aggregator,
        session: settings.session,
        credentials,
        db_path: settings.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy any file in `defaults/` that is missing from `config/`. Existing
/// files are never overwritten and `.example` templates are skipped.
/// Returns the files that were created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if copy_if_absent(&path, &target)? {
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Create `target` with the contents of `source` unless it already exists.
fn copy_if_absent(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("failed to create {}: {e}", target.display()),
            })
        }
    };

    let content = std::fs::read(source).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read {}: {e}", source.display()),
    })?;
    std::io::Write::write_all(&mut dest, &content).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to write {}: {e}", target.display()),
    })?;
    Ok(true)
}

/// Loads config relative to the current working directory, seeding
/// `config/` from `defaults/` first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let sources = &config.sources;
    let url_fields: &[(&str, &str)] = &[
        ("sources.color_list_url", sources.color_list_url.as_str()),
        ("sources.palette_list_url", sources.palette_list_url.as_str()),
        ("sources.generator_url", sources.generator_url.as_str()),
    ];
    for (name, url) in url_fields {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be an http(s) URL, got `{url}`"),
            });
        }
    }

    if !(1..=MAX_TIMEOUT_SECS).contains(&sources.timeout_secs) {
        return Err(ConfigError::ValidationError {
            field: "sources.timeout_secs".into(),
            message: format!(
                "must be between 1 and {MAX_TIMEOUT_SECS}, got {}",
                sources.timeout_secs
            ),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_SETTINGS: &str = r#"
[sources]
color_list_url = "https://example.com/colors.json"
palette_list_url = "https://example.com/palettes.json"
generator_url = "http://example.com/api/"
timeout_secs = 5

[aggregator]
cache_palettes = false

[database]
path = "data/test.db"

[session]
user_id = 42
username = "tester"
"#;

    /// Helper: fresh scratch directory with an empty `config/` inside.
    fn scratch_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("chroma_config_test_{name}"));
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    fn write_settings(dir: &Path, text: &str) {
        fs::write(dir.join("config").join(SETTINGS_FILE), text).unwrap();
    }

    fn expect_validation_field(dir: &Path, expected: &str) {
        match load_config_from(dir).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config() {
        let tmp = scratch_dir("valid");
        write_settings(&tmp, VALID_SETTINGS);

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.sources.color_list_url, "https://example.com/colors.json");
        assert_eq!(config.sources.timeout(), Duration::from_secs(5));
        assert!(!config.aggregator.cache_palettes);
        assert_eq!(config.db_path, "data/test.db");
        assert_eq!(config.session.user_id, 42);
        assert_eq!(config.session.username, "tester");
        assert!(config.credentials.bot_token.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let tmp = scratch_dir("defaults_sections");
        let trimmed = VALID_SETTINGS
            .replace("[aggregator]\ncache_palettes = false\n", "")
            .replace("[session]\nuser_id = 42\nusername = \"tester\"\n", "");
        write_settings(&tmp, &trimmed);

        let config = load_config_from(&tmp).unwrap();
        assert!(config.aggregator.cache_palettes);
        assert_eq!(config.session.user_id, 1);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_with_token() {
        let tmp = scratch_dir("with_creds");
        write_settings(&tmp, VALID_SETTINGS);
        fs::write(
            tmp.join("config").join(CREDENTIALS_FILE),
            "bot_token = \"123:abc\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.credentials.bot_token.as_deref(), Some("123:abc"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_settings_file_is_reported() {
        let tmp = scratch_dir("missing");
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::FileNotFound { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let tmp = scratch_dir("malformed");
        write_settings(&tmp, "[sources\ncolor_list_url = ");
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_http_url() {
        let tmp = scratch_dir("bad_url");
        write_settings(
            &tmp,
            &VALID_SETTINGS.replace("http://example.com/api/", "ftp://example.com/api/"),
        );
        expect_validation_field(&tmp, "sources.generator_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let tmp = scratch_dir("zero_timeout");
        write_settings(&tmp, &VALID_SETTINGS.replace("timeout_secs = 5", "timeout_secs = 0"));
        expect_validation_field(&tmp, "sources.timeout_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_db_path() {
        let tmp = scratch_dir("empty_db");
        write_settings(
            &tmp,
            &VALID_SETTINGS.replace("path = \"data/test.db\"", "path = \"  \""),
        );
        expect_validation_field(&tmp, "database.path");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_once_and_skips_examples() {
        let tmp = std::env::temp_dir().join("chroma_config_test_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(SETTINGS_FILE), VALID_SETTINGS).unwrap();
        fs::write(
            tmp.join("defaults").join("credentials.toml.example"),
            "bot_token = \"\"\n",
        )
        .unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config").join(SETTINGS_FILE)]);
        assert!(!tmp.join("config").join("credentials.toml.example").exists());

        // Second run leaves the existing file alone.
        write_settings(&tmp, "# edited\n");
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        let kept = fs::read_to_string(tmp.join("config").join(SETTINGS_FILE)).unwrap();
        assert_eq!(kept, "# edited\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_without_any_directory() {
        let tmp = std::env::temp_dir().join("chroma_config_test_nothing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
