//! Navigation menu shared by every generated page.
//!
//! The menu is plain markdown prepended to each document before rendering,
//! so it picks up the same styling as the page body:
//!
//! ```text
//! #### Menu
//! - [guide](guide.html)
//! - [intro](intro.html)
//!
//! ---
//!
//! ```
//!
//! Entries follow manifest order. Directories with more than
//! [`MenuConfig::max_entries`] files get no menu at all, since a page-long
//! list of links is worse than none.

use crate::config::MenuConfig;
use crate::naming;

/// Build the menu with the stock heading and entry limit.
pub fn build_menu<N: AsRef<str>, S: AsRef<str>>(manifest: &[N], extensions: &[S]) -> Vec<u8> {
    build_menu_with(manifest, extensions, &MenuConfig::default())
}

/// Build the menu for `manifest`, one link per file, in order.
///
/// Returns an empty block when the manifest exceeds `settings.max_entries`.
pub fn build_menu_with<N: AsRef<str>, S: AsRef<str>>(
    manifest: &[N],
    extensions: &[S],
    settings: &MenuConfig,
) -> Vec<u8> {
    if manifest.len() > settings.max_entries {
        return Vec::new();
    }

    let mut menu = format!("{}\n", settings.heading);
    for name in manifest {
        let name = name.as_ref();
        // Scan only admits recognized names; anything else links verbatim.
        let stem = naming::stem(name, extensions).unwrap_or(name);
        menu.push_str(&format!("- [{stem}]({stem}{})\n", naming::OUTPUT_EXTENSION));
    }
    menu.push_str("\n---\n\n");
    menu.into_bytes()
}
