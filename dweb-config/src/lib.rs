//! Loader for dweb configuration with file + environment overlays.
//!
//! Sources are merged in the order they are attached, with `DWEB_`-prefixed
//! environment variables applied on top (`DWEB_BROWSER__PROGRAM=lynx`).
//! String values may reference other variables as `${VAR}`; those are
//! expanded after merging. Every section is optional:
//!
//! ```yaml
//! browser:
//!   program: w3m
//!   dump_args: ["-dump", "-o", "display_link_num=1"]
//! pager:
//!   program: more
//!   args: []
//! shell:
//!   prompt: "> "
//!   chatty: null
//! log:
//!   format: text
//!   filter: info
//! ```
//!
//! When the browser or pager program is not configured, `$BROWSER` and
//! `$PAGER` are consulted before falling back to `w3m` and `more`.
use config::{Config, ConfigError, Environment, File};
use dweb_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_BROWSER: &str = "w3m";
pub const DEFAULT_PAGER: &str = "more";
pub const DEFAULT_PROMPT: &str = "> ";
pub const CONFIG_FILE_NAME: &str = "dweb.yaml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DwebConfig {
    pub browser: BrowserConfig,
    pub pager: PagerConfig,
    pub shell: ShellConfig,
    pub log: LogSettings,
}

/// The dump-mode browser that renders pages to text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub program: String,
    /// Arguments placed between the program and the target URL.
    pub dump_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            program: program_from_env("BROWSER", DEFAULT_BROWSER),
            dump_args: default_dump_args(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    pub program: String,
    /// Extra arguments; the pager reads the page from stdin.
    pub args: Vec<String>,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            program: program_from_env("PAGER", DEFAULT_PAGER),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub prompt: String,
    /// `None` means "chatty when stdin is a terminal".
    pub chatty: Option<bool>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            chatty: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
            dir: None,
        }
    }
}

fn default_dump_args() -> Vec<String> {
    ["-dump", "-o", "display_link_num=1"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// An unset or empty variable falls back to `default`.
fn program_from_env(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `$XDG_CONFIG_HOME/dweb/dweb.yaml` (or the platform equivalent).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dweb").join(CONFIG_FILE_NAME))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct DwebConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for DwebConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DwebConfigLoader {
    /// Start with no files; only `DWEB_` env overrides.
    ///
    /// ```
    /// use dweb_config::DwebConfigLoader;
    ///
    /// let config = DwebConfigLoader::new()
    ///     .with_yaml_str("pager:\n  program: less")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.pager.program, "less");
    /// assert_eq!(config.shell.prompt, "> ");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use dweb_config::DwebConfigLoader;
    ///
    /// let config = DwebConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// browser:
    ///   program: lynx
    ///   dump_args: ["-dump"]
    /// shell:
    ///   chatty: false
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.browser.program, "lynx");
    /// assert_eq!(config.browser.dump_args, vec!["-dump".to_string()]);
    /// assert_eq!(config.shell.chatty, Some(false));
    /// ```
    pub fn load(self) -> Result<DwebConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("DWEB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: DwebConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        validate(&typed)?;

        Ok(typed)
    }
}

fn validate(cfg: &DwebConfig) -> Result<(), ConfigError> {
    if cfg.browser.program.trim().is_empty() {
        return Err(ConfigError::Message("browser.program must not be empty".into()));
    }
    if cfg.pager.program.trim().is_empty() {
        return Err(ConfigError::Message("pager.program must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("DWEB_TEST_HOST", Some("example.org"), || {
            let mut v = json!("https://${DWEB_TEST_HOST}/");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("https://example.org/"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars(
            [("DWEB_TEST_A", Some("-dump")), ("DWEB_TEST_B", Some("w3m"))],
            || {
                let mut v = json!({ "args": ["$DWEB_TEST_A", 3], "program": "${DWEB_TEST_B}" });
                expand_env_in_value(&mut v);
                assert_eq!(v, json!({ "args": ["-dump", 3], "program": "w3m" }));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars(
            [("DWEB_CYC_A", Some("${DWEB_CYC_B}")), ("DWEB_CYC_B", Some("${DWEB_CYC_A}"))],
            || {
                let mut v = json!("x=${DWEB_CYC_A}");
                expand_env_in_value(&mut v);
                let s = v.as_str().unwrap();
                assert!(s.starts_with("x=") && s.contains("${"));
            },
        );
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DWEB_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DWEB_DOES_NOT_EXIST}"));
    }

    #[test]
    fn program_env_fallbacks() {
        temp_env::with_var("BROWSER", Some("lynx"), || {
            assert_eq!(program_from_env("BROWSER", DEFAULT_BROWSER), "lynx");
        });
        temp_env::with_var("BROWSER", Some("  "), || {
            assert_eq!(program_from_env("BROWSER", DEFAULT_BROWSER), "w3m");
        });
        temp_env::with_var_unset("PAGER", || {
            assert_eq!(program_from_env("PAGER", DEFAULT_PAGER), "more");
        });
    }

    #[test]
    fn empty_program_is_rejected() {
        let mut cfg = DwebConfig::default();
        cfg.pager.program = String::new();
        assert!(validate(&cfg).is_err());
    }
}
