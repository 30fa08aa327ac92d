//! Shared test utilities.
//!
//! Tests build their source trees in a [`tempfile::TempDir`] and run the
//! pipeline with the working directory pointed at the same temp dir, so the
//! generated `html/` directory and any staged files stay isolated.
//!
//! ```text
//! let tmp = TempDir::new().unwrap();
//! write_sources(&tmp.path().join("docs"), &[("a.md", "# Hello")]);
//! let config = build_config(tmp.path());
//! // ... run the pipeline ...
//! let page = read_page(&config, "a.html");
//! ```

use std::fs;
use std::path::Path;

use crate::config::BuildConfig;

/// Create `dir` (and parents) and write each `(name, content)` pair into it.
pub fn write_sources(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

/// Stock build settings with the working directory at `work_dir`.
pub fn build_config(work_dir: &Path) -> BuildConfig {
    BuildConfig::with_defaults(work_dir)
}

/// Read a generated page. Panics with the directory listing on a miss.
pub fn read_page(config: &BuildConfig, name: &str) -> String {
    let path = config.output_dir.join(name);
    fs::read_to_string(&path).unwrap_or_else(|err| {
        let present: Vec<String> = fs::read_dir(&config.output_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        panic!("page '{name}' not readable ({err}). Present: {present:?}")
    })
}
