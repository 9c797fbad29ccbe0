//! Localization: per-language text bundles and habit phrase matching.
//!
//! Bundles are TOML files with a `daily_messages` list and one table per
//! [`Category`]. The English and Arabic bundles are embedded at compile
//! time and deployed to `{data_dir}/locales/`, where they can be edited.

mod habit;

#[cfg(test)]
mod tests;

pub use habit::is_habit_message;

use habit_core::{config::shellexpand, language::Language};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

const BUNDLED_ENGLISH: &str = include_str!("../../locales/english.toml");
const BUNDLED_ARABIC: &str = include_str!("../../locales/arabic.toml");

const TEXT_NOT_FOUND: &str = "Text not found";
const TEXT_LOAD_ERROR: &str = "Error loading text";
const DEFAULT_DAILY_MESSAGE: &str = "Stay mindful today!";

/// Top-level table of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Commands,
    Status,
    Language,
    Tracking,
    General,
    Awareness,
    Scheduler,
}

impl Category {
    fn table(self) -> &'static str {
        match self {
            Self::Commands => "commands",
            Self::Status => "status",
            Self::Language => "language",
            Self::Tracking => "tracking",
            Self::General => "general",
            Self::Awareness => "awareness_progress",
            Self::Scheduler => "scheduler",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Bundle {
    #[serde(default)]
    daily_messages: Vec<String>,
    #[serde(flatten)]
    tables: HashMap<String, HashMap<String, String>>,
}

impl Bundle {
    /// Last-resort English bundle when nothing else parses.
    fn minimal() -> Self {
        let mut commands = HashMap::new();
        commands.insert(
            "welcome".to_string(),
            "Welcome! Language files not found.".to_string(),
        );
        let mut tables = HashMap::new();
        tables.insert("commands".to_string(), commands);
        Self {
            daily_messages: Vec::new(),
            tables,
        }
    }
}

/// Loaded text bundles, keyed by language. Immutable after startup.
#[derive(Debug, Clone, Default)]
pub struct Locales {
    bundles: HashMap<Language, Bundle>,
}

impl Locales {
    /// Load bundles from `{data_dir}/locales/`, falling back to the
    /// embedded copies for missing or unparsable files.
    pub fn load(data_dir: &str) -> Self {
        let dir = Path::new(&shellexpand(data_dir)).join("locales");
        let mut bundles = HashMap::new();

        for lang in Language::ALL {
            let path = dir.join(format!("{}.toml", lang.as_str()));
            let on_disk = std::fs::read_to_string(&path).ok().and_then(|content| {
                toml::from_str::<Bundle>(&content)
                    .map_err(|e| warn!("locales: failed to parse {}: {e}", path.display()))
                    .ok()
            });

            let bundle = on_disk.or_else(|| match toml::from_str::<Bundle>(bundled(lang)) {
                Ok(b) => Some(b),
                Err(e) => {
                    warn!("locales: bundled {lang} is invalid: {e}");
                    None
                }
            });

            if let Some(bundle) = bundle {
                bundles.insert(lang, bundle);
            }
        }

        bundles
            .entry(Language::English)
            .or_insert_with(Bundle::minimal);

        info!("locales: loaded {} language bundle(s)", bundles.len());
        Self { bundles }
    }

    /// Parse bundles from strings. English must be present.
    #[cfg(test)]
    pub(crate) fn from_sources(sources: &[(Language, &str)]) -> Self {
        let bundles = sources
            .iter()
            .map(|(lang, src)| (*lang, toml::from_str(src).unwrap()))
            .collect();
        Self { bundles }
    }

    fn bundle(&self, lang: Language) -> Option<&Bundle> {
        self.bundles
            .get(&lang)
            .or_else(|| self.bundles.get(&Language::English))
    }

    /// Localized text for `category.key`, with `{name}` placeholders filled
    /// from `params`. Unknown placeholders are left untouched.
    pub fn text(
        &self,
        lang: Language,
        category: Category,
        key: &str,
        params: &[(&str, &str)],
    ) -> String {
        let Some(bundle) = self.bundle(lang) else {
            return TEXT_LOAD_ERROR.to_string();
        };
        let Some(template) = bundle
            .tables
            .get(category.table())
            .and_then(|table| table.get(key))
        else {
            return TEXT_NOT_FOUND.to_string();
        };
        substitute(template, params)
    }

    /// A uniformly random daily message in `lang`.
    pub fn daily_message(&self, lang: Language) -> String {
        self.bundle(lang)
            .and_then(|b| b.daily_messages.choose(&mut rand::thread_rng()))
            .cloned()
            .unwrap_or_else(|| DEFAULT_DAILY_MESSAGE.to_string())
    }
}

/// Single pass, so substituted values are never re-expanded.
fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn bundled(lang: Language) -> &'static str {
    match lang {
        Language::English => BUNDLED_ENGLISH,
        Language::Arabic => BUNDLED_ARABIC,
    }
}

/// Deploy bundled locale files to `{data_dir}/locales/`, creating the
/// directory if needed.
///
/// Never overwrites existing files so user edits are preserved.
pub fn install_bundled_locales(data_dir: &str) {
    let dir = Path::new(&shellexpand(data_dir)).join("locales");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!("locales: failed to create {}: {e}", dir.display());
        return;
    }

    for lang in Language::ALL {
        let filename = format!("{}.toml", lang.as_str());
        let dest = dir.join(&filename);
        if !dest.exists() {
            if let Err(e) = std::fs::write(&dest, bundled(lang)) {
                warn!("locales: failed to write {}: {e}", dest.display());
            } else {
                info!("locales: deployed bundled {filename}");
            }
        }
    }
}
