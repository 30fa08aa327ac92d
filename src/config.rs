//! Build configuration.
//!
//! Settings come from three layers, each overriding the one before:
//!
//! ```text
//! stock defaults  →  mdg.toml (source dir, or --config)  →  CLI flags
//! ```
//!
//! The merged [`MdgConfig`] is validated once and then resolved into a
//! [`BuildConfig`]: the immutable value handed to the pipeline. Nothing in the
//! crate reads configuration from global state.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_dir = "html"                # Relative to the working directory
//! skip_menu = false                  # Omit the navigation menu
//! style = ""                         # Stylesheet override; empty = built-in
//! extensions = [".md", ".markdown"]  # Suffixes treated as markdown
//!
//! [menu]
//! max_entries = 40                   # Larger directories get no menu
//! heading = "#### Menu"
//!
//! [processing]
//! concurrency = 12                   # Max files in flight at once
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::naming::DEFAULT_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the source directory.
pub const CONFIG_FILE_NAME: &str = "mdg.toml";

/// Files in flight at once when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 12;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration as written in `mdg.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MdgConfig {
    /// Output directory, resolved against the working directory.
    pub output_dir: String,
    /// Omit the navigation menu from every page.
    pub skip_menu: bool,
    /// Stylesheet override. Empty means the built-in GitHub stylesheet.
    pub style: String,
    /// File suffixes treated as markdown sources.
    pub extensions: Vec<String>,
    pub menu: MenuConfig,
    pub processing: ProcessingConfig,
}

impl Default for MdgConfig {
    fn default() -> Self {
        Self {
            output_dir: "html".to_string(),
            skip_menu: false,
            style: String::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            menu: MenuConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Navigation menu settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuConfig {
    /// Directories with more files than this get no menu at all.
    pub max_entries: usize,
    /// Markdown line opening the menu block.
    pub heading: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            max_entries: 40,
            heading: "#### Menu".to_string(),
        }
    }
}

/// Parallelism settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of files read, rendered and written at the same time.
    ///
    /// This bounds open file descriptors, not CPU use, so it is not clamped
    /// to the core count.
    pub concurrency: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub skip_menu: Option<bool>,
    pub style: Option<PathBuf>,
    pub concurrency: Option<usize>,
}

impl MdgConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.concurrency == 0 {
            return Err(ConfigError::Validation(
                "processing.concurrency must be at least 1".into(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|e| !e.starts_with('.') || e.len() < 2)
        {
            return Err(ConfigError::Validation(format!(
                "extension {bad:?} must start with '.' and name a suffix"
            )));
        }
        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the file values, then re-validate.
    pub fn apply(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(skip) = overrides.skip_menu {
            self.skip_menu = skip;
        }
        if let Some(style) = &overrides.style {
            self.style = style.to_string_lossy().into_owned();
        }
        if let Some(n) = overrides.concurrency {
            self.processing.concurrency = n;
        }
        self.validate()?;
        Ok(self)
    }

    /// The stylesheet override, if one is configured.
    pub fn style_path(&self) -> Option<&Path> {
        (!self.style.is_empty()).then(|| Path::new(self.style.as_str()))
    }
}

/// Immutable settings for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Where staged output is written before it is renamed into place.
    pub work_dir: PathBuf,
    /// Final destination of the generated pages.
    pub output_dir: PathBuf,
    pub skip_menu: bool,
    /// Admission ceiling: tasks allowed in flight at once.
    pub concurrency: usize,
    /// Worker threads running tasks. Never below `concurrency`, so the
    /// admission gate, not the pool size, is what enforces the ceiling.
    pub pool_threads: usize,
    pub extensions: Vec<String>,
    pub menu: MenuConfig,
}

impl BuildConfig {
    /// Resolve a validated file config against the working directory.
    pub fn resolve(config: &MdgConfig, work_dir: &Path) -> Self {
        let concurrency = config.processing.concurrency.max(1);
        Self {
            work_dir: work_dir.to_path_buf(),
            output_dir: work_dir.join(&config.output_dir),
            skip_menu: config.skip_menu,
            concurrency,
            pool_threads: pool_threads(concurrency),
            extensions: config.extensions.clone(),
            menu: config.menu.clone(),
        }
    }

    /// Stock settings rooted at `work_dir`.
    pub fn with_defaults(work_dir: &Path) -> Self {
        Self::resolve(&MdgConfig::default(), work_dir)
    }

    /// Directory output is staged in before the rename.
    ///
    /// The working directory when the output lives below it; otherwise the
    /// output directory itself, since a rename cannot cross filesystems.
    pub fn staging_dir(&self) -> &Path {
        if self.output_dir.starts_with(&self.work_dir) {
            &self.work_dir
        } else {
            &self.output_dir
        }
    }
}

/// Worker threads for a given admission ceiling: at least one per core, and
/// at least one per admitted task.
pub fn pool_threads(concurrency: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    concurrency.max(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(MdgConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
fn read_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto the stock defaults, deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<MdgConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MdgConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration for a run.
///
/// An explicit `path` must exist. Without one, `mdg.toml` in `source_dir` is
/// used when present and stock defaults otherwise. A relative `style` in the
/// file is taken relative to the file's own directory.
pub fn load_config(path: Option<&Path>, source_dir: &Path) -> Result<MdgConfig, ConfigError> {
    let config_path = match path {
        Some(p) if !p.is_file() => return Err(ConfigError::NotFound(p.to_path_buf())),
        Some(p) => Some(p.to_path_buf()),
        None => Some(source_dir.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()),
    };
    let Some(config_path) = config_path else {
        return resolve_config(None);
    };

    let mut config = resolve_config(Some(read_raw_config(&config_path)?))?;
    if let Some(style) = config.style_path().filter(|p| p.is_relative()) {
        let base = config_path.parent().unwrap_or(Path::new(""));
        config.style = base.join(style).to_string_lossy().into_owned();
    }
    Ok(config)
}

/// Returns a fully-commented stock `mdg.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r#####"# mdg configuration
# =================
# All settings are optional. Values shown below are the defaults.
# Place this file as mdg.toml in the directory being converted, or pass
# --config. Command-line flags override anything set here.
# Unknown keys will cause an error.

# Where generated pages go, relative to the working directory.
output_dir = "html"

# Leave the navigation menu out of every page.
skip_menu = false

# Stylesheet injected into every page. Empty uses the built-in GitHub
# markdown stylesheet. Plain CSS files are wrapped in a <style> element.
# A relative path is relative to this file; --style is relative to the
# working directory.
style = ""

# File suffixes treated as markdown sources.
extensions = [".md", ".markdown"]

# ---------------------------------------------------------------------------
# Navigation menu
# ---------------------------------------------------------------------------
[menu]
# Directories with more files than this get no menu.
max_entries = 40

# Markdown line that opens the menu block.
heading = "#### Menu"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of files read, rendered and written at the same time.
concurrency = 12
"#####
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = MdgConfig::default();
        assert_eq!(config.output_dir, "html");
        assert!(!config.skip_menu);
        assert_eq!(config.extensions, vec![".md", ".markdown"]);
        assert_eq!(config.menu.max_entries, 40);
        assert_eq!(config.processing.concurrency, 12);
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(MdgConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let config = resolve_config(Some(toml::from_str("skip_menu = true").unwrap())).unwrap();
        assert!(config.skip_menu);
        assert_eq!(config.processing.concurrency, 12);
    }

    #[test]
    fn parse_nested_section_keeps_sibling_defaults() {
        let overlay = toml::from_str("[menu]\nmax_entries = 5").unwrap();
        let config = resolve_config(Some(overlay)).unwrap();
        assert_eq!(config.menu.max_entries, 5);
        assert_eq!(config.menu.heading, "#### Menu");
    }

    #[test]
    fn unknown_key_rejected() {
        let overlay = toml::from_str("skip_menus = true").unwrap();
        assert!(matches!(resolve_config(Some(overlay)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let overlay = toml::from_str("[processing]\nthreads = 4").unwrap();
        assert!(matches!(resolve_config(Some(overlay)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn validate_zero_concurrency() {
        let overlay = toml::from_str("[processing]\nconcurrency = 0").unwrap();
        assert!(matches!(
            resolve_config(Some(overlay)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_empty_extensions() {
        let mut config = MdgConfig::default();
        config.extensions.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_extension_without_dot() {
        let mut config = MdgConfig::default();
        config.extensions = vec!["md".into()];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").and_then(|v| v.as_integer()), Some(1));
        assert_eq!(merged.get("b").and_then(|v| v.as_integer()), Some(3));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config, MdgConfig::default());
    }

    #[test]
    fn load_config_reads_source_dir_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "output_dir = \"site\"\n[processing]\nconcurrency = 3\n",
        )
        .unwrap();

        let config = load_config(None, tmp.path()).unwrap();
        assert_eq!(config.output_dir, "site");
        assert_eq!(config.processing.concurrency, 3);
    }

    #[test]
    fn style_in_config_file_is_relative_to_the_file() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join(CONFIG_FILE_NAME), "style = \"theme/site.css\"\n").unwrap();

        let config = load_config(None, &docs).unwrap();
        assert_eq!(config.style_path(), Some(docs.join("theme/site.css").as_path()));
    }

    #[test]
    fn absolute_style_in_config_file_is_kept() {
        let tmp = TempDir::new().unwrap();
        let css = tmp.path().join("abs.css");
        let config_path = tmp.path().join("custom.toml");
        fs::write(&config_path, format!("style = {:?}\n", css.to_str().unwrap())).unwrap();

        let config = load_config(Some(&config_path), Path::new("unused")).unwrap();
        assert_eq!(config.style_path(), Some(css.as_path()));
    }

    #[test]
    fn cli_style_is_not_rebased() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "style = \"a.css\"\n").unwrap();
        let overrides = Overrides {
            style: Some(PathBuf::from("b.css")),
            ..Default::default()
        };

        let config = load_config(None, tmp.path()).unwrap().apply(&overrides).unwrap();
        assert_eq!(config.style_path(), Some(Path::new("b.css")));
    }

    #[test]
    fn load_config_explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(matches!(
            load_config(Some(&missing), tmp.path()),
            Err(ConfigError::NotFound(p)) if p == missing
        ));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not valid toml [[[").unwrap();
        assert!(matches!(
            load_config(None, tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let overrides = Overrides {
            output_dir: Some(PathBuf::from("out")),
            skip_menu: Some(true),
            style: Some(PathBuf::from("custom.css")),
            concurrency: Some(2),
        };
        let config = MdgConfig::default().apply(&overrides).unwrap();
        assert_eq!(config.output_dir, "out");
        assert!(config.skip_menu);
        assert_eq!(config.style_path(), Some(Path::new("custom.css")));
        assert_eq!(config.processing.concurrency, 2);
    }

    #[test]
    fn overrides_are_validated() {
        let overrides = Overrides {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(MdgConfig::default().apply(&overrides).is_err());
    }

    #[test]
    fn empty_style_means_builtin() {
        assert_eq!(MdgConfig::default().style_path(), None);
    }

    #[test]
    fn build_config_resolves_output_against_work_dir() {
        let work = Path::new("/tmp/work");
        let build = BuildConfig::with_defaults(work);
        assert_eq!(build.output_dir, work.join("html"));
        assert_eq!(build.work_dir, work);
        assert_eq!(build.concurrency, DEFAULT_CONCURRENCY);
        assert!(build.pool_threads >= build.concurrency);
    }

    #[test]
    fn pool_is_never_smaller_than_the_ceiling() {
        assert!(pool_threads(1) >= 1);
        assert!(pool_threads(500) >= 500);
    }

    #[test]
    fn staging_in_work_dir_when_output_is_below_it() {
        let build = BuildConfig::with_defaults(Path::new("/tmp/work"));
        assert_eq!(build.staging_dir(), Path::new("/tmp/work"));
    }

    #[test]
    fn staging_next_to_output_outside_work_dir() {
        let mut build = BuildConfig::with_defaults(Path::new("/tmp/work"));
        build.output_dir = PathBuf::from("/mnt/site/html");
        assert_eq!(build.staging_dir(), Path::new("/mnt/site/html"));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let overlay: toml::Value = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(resolve_config(Some(overlay)).unwrap(), MdgConfig::default());
    }
}
