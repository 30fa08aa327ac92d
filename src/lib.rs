//! # mdg
//!
//! Converts a directory of markdown documents into standalone HTML pages.
//! Every page gets the same treatment: an optional navigation menu listing
//! its siblings, GitHub-flavoured markdown rendering, an inline stylesheet and
//! a charset declaration. Results land in an `html/` directory next to where
//! the tool was run, replacing any previous output of the same name.
//!
//! # Pipeline
//!
//! ```text
//! 1. Scan       dir/*.md        →  FileManifest   (ordered file names)
//! 2. Schedule   FileManifest    →  one task per file, at most C running
//! 3. Task       a.md            →  menu + markdown → style → charset → html/a.html
//! ```
//!
//! Tasks are independent: they share only read-only inputs (manifest, style
//! block, config) and never wait on each other. A failing file is logged and
//! reported, and the rest of the run carries on.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Lists the recognized markdown files of a directory into a [`scan::FileManifest`] |
//! | [`menu`] | Builds the markdown navigation block shared by every page |
//! | [`transform`] | Pure byte transforms: markdown compile, style and charset injection |
//! | [`naming`] | Maps `name.md` to `name.html` |
//! | [`gate`] | Counting admission gate bounding the number of in-flight tasks |
//! | [`pipeline`] | The scheduler: fans out tasks, persists output, collects a [`pipeline::RunReport`] |
//! | [`assets`] | The stylesheet block injected into every page |
//! | [`config`] | `mdg.toml` loading, CLI overrides, validation |
//! | [`output`] | Human-readable run summary |
//!
//! # Design Decisions
//!
//! ## Temp-then-rename
//!
//! Output is staged in a uniquely named temporary file under the working
//! directory and renamed into place. Readers of `html/` never observe a
//! half-written page, and an interrupted or cancelled run leaves either the
//! old file or the new one.
//!
//! ## Bounded fan-out
//!
//! Every file gets its own task up front, but only `C` of them (default 12)
//! may hold an admission token at once. Large directories therefore cannot
//! exhaust file descriptors or memory. Tokens are RAII guards, so they are
//! returned on every exit path, including panics inside a task.

pub mod assets;
pub mod config;
pub mod gate;
pub mod menu;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;
