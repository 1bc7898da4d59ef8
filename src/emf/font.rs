// Font resolution for text records
//
// A `FontResolver` turns the face name stored in a LOGFONT into a font file
// name; `FontLibrary` loads those files from the configured directory once
// per render and keeps whatever it found, including misses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps a logical font family to a concrete font file name.
///
/// Resolution never fails: unknown families map to a deterministic fallback.
pub trait FontResolver: Send + Sync {
    fn resolve(&self, family: &str) -> String;
}

impl<F> FontResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve(&self, family: &str) -> String {
        self(family)
    }
}

/// Table-driven resolver with a fallback file
///
/// Family lookups are case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFontResolver {
    /// Family name to file name
    pub fonts: HashMap<String, String>,
    /// File used for families missing from the table
    pub fallback: String,
}

impl Default for StaticFontResolver {
    fn default() -> Self {
        let fonts = [
            ("arial", "arial.ttf"),
            ("calibri", "calibri.ttf"),
            ("cambria", "cambria.ttc"),
            ("courier new", "cour.ttf"),
            ("segoe ui", "segoeui.ttf"),
            ("tahoma", "tahoma.ttf"),
            ("times new roman", "times.ttf"),
            ("verdana", "verdana.ttf"),
        ]
        .into_iter()
        .map(|(family, file)| (family.to_string(), file.to_string()))
        .collect();
        Self {
            fonts,
            fallback: "arial.ttf".to_string(),
        }
    }
}

impl StaticFontResolver {
    /// Empty table with the given fallback file
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fonts: HashMap::new(),
            fallback: fallback.into(),
        }
    }

    pub fn with_font(mut self, family: &str, file: impl Into<String>) -> Self {
        self.fonts.insert(family.to_lowercase(), file.into());
        self
    }
}

impl FontResolver for StaticFontResolver {
    fn resolve(&self, family: &str) -> String {
        let family = family.trim();
        self.fonts
            .get(&family.to_lowercase())
            .or_else(|| {
                self.fonts
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(family))
                    .map(|(_, file)| file)
            })
            .unwrap_or(&self.fallback)
            .clone()
    }
}

/// Font bytes that parsed as a valid face
pub type FontData = Arc<Vec<u8>>;

/// Per-render cache of font files, keyed by resolved file name
pub struct FontLibrary {
    font_dir: Option<PathBuf>,
    resolver: Arc<dyn FontResolver>,
    cache: HashMap<String, Option<FontData>>,
}

impl FontLibrary {
    pub fn new(font_dir: Option<PathBuf>, resolver: Arc<dyn FontResolver>) -> Self {
        Self {
            font_dir,
            resolver,
            cache: HashMap::new(),
        }
    }

    /// Load the font for a family, or `None` when it is unavailable.
    ///
    /// Missing directories, unreadable files and data that does not parse as
    /// a font are logged once and remembered as misses.
    pub fn load(&mut self, family: &str) -> Option<FontData> {
        let file = self.resolver.resolve(family);
        if let Some(cached) = self.cache.get(&file) {
            return cached.clone();
        }

        let loaded = self.read(family, &file);
        self.cache.insert(file, loaded.clone());
        loaded
    }

    fn read(&self, family: &str, file: &str) -> Option<FontData> {
        let Some(dir) = &self.font_dir else {
            warn!(family, file, "no font directory configured, text is not drawn");
            return None;
        };
        let path = dir.join(file);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(family, path = %path.display(), error = %err, "font file unavailable");
                return None;
            },
        };
        if let Err(err) = ttf_parser::Face::parse(&bytes, 0) {
            warn!(family, path = %path.display(), error = %err, "font file is not a usable font");
            return None;
        }
        debug!(family, path = %path.display(), "loaded font");
        Some(Arc::new(bytes))
    }
}
