//! Vocabulary catalog loading.
//!
//! A catalog is an ordered list of immutable [`Word`] records for one
//! library. Loaders fetch raw JSON (local file or HTTP) and normalize
//! it into the internal shape. Two raw shapes are supported:
//!
//! - `dict`: dictionary export rows (`word`, `phonetic`, `translation`,
//!   `definition`, `example`), ids synthesized as `term#index`
//! - `words`: entries already in the internal `Word` shape
//!
//! An unknown library id yields an empty catalog, not an error; the
//! engine tolerates an empty catalog (all queues stay empty).

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::LoadError;
use crate::word::Word;

/// Raw record layout of a library source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryFormat {
    Dict,
    #[default]
    Words,
}

/// One configured vocabulary library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryMeta {
    pub id: String,
    pub name: String,
    /// File path or http(s) URL of the raw JSON word list.
    pub source: String,
    #[serde(default)]
    pub format: LibraryFormat,
}

/// Asynchronous source of word catalogs, injected into the engine.
#[allow(async_fn_in_trait)]
pub trait CatalogLoader {
    /// Load and normalize the word list for `id`. Unknown ids yield an
    /// empty list; fetch/parse failures propagate with no retry.
    async fn load_library(&self, id: &str) -> Result<Vec<Word>, LoadError>;
}

/// Loader backed by configured [`LibraryMeta`] entries.
pub struct SourceCatalogLoader {
    libraries: Vec<LibraryMeta>,
    client: reqwest::Client,
}

impl SourceCatalogLoader {
    pub fn new(libraries: Vec<LibraryMeta>) -> Self {
        Self {
            libraries,
            client: reqwest::Client::new(),
        }
    }

    pub fn libraries(&self) -> &[LibraryMeta] {
        &self.libraries
    }

    async fn fetch_raw(&self, meta: &LibraryMeta) -> Result<Vec<serde_json::Value>, LoadError> {
        let text = if is_http_url(&meta.source) {
            let resp = self.client.get(&meta.source).send().await?;
            if !resp.status().is_success() {
                return Err(LoadError::Status {
                    library: meta.id.clone(),
                    status: resp.status().as_u16(),
                });
            }
            resp.text().await?
        } else {
            std::fs::read_to_string(&meta.source).map_err(|source| LoadError::Read {
                library: meta.id.clone(),
                source,
            })?
        };
        serde_json::from_str(&text).map_err(|source| LoadError::Parse {
            library: meta.id.clone(),
            source,
        })
    }
}

impl CatalogLoader for SourceCatalogLoader {
    async fn load_library(&self, id: &str) -> Result<Vec<Word>, LoadError> {
        let Some(meta) = self.libraries.iter().find(|l| l.id == id) else {
            return Ok(Vec::new());
        };
        let raw = self.fetch_raw(meta).await?;
        Ok(match meta.format {
            LibraryFormat::Dict => map_dict_entries(&raw),
            LibraryFormat::Words => map_word_entries(&raw),
        })
    }
}

fn is_http_url(source: &str) -> bool {
    Url::parse(source)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn str_field(entry: &serde_json::Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn opt_field(entry: &serde_json::Value, key: &str) -> Option<String> {
    Some(str_field(entry, key)).filter(|s| !s.is_empty())
}

/// Normalize dictionary-export rows. Ids are `term#index` so they stay
/// stable for a given source ordering.
pub fn map_dict_entries(entries: &[serde_json::Value]) -> Vec<Word> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let term = str_field(e, "word");
            let translation = str_field(e, "translation");
            let definition = str_field(e, "definition");
            let example = str_field(e, "example");
            let meaning = if translation.is_empty() {
                definition
            } else {
                translation
            };
            let examples: Vec<String> = example
                .lines()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            let stem = if term.is_empty() { "w" } else { term.as_str() };
            Word {
                id: format!("{stem}#{i}"),
                term: if term.is_empty() {
                    format!("word_{i}")
                } else {
                    term.clone()
                },
                phonetic: opt_field(e, "phonetic"),
                meaning,
                examples: if examples.is_empty() {
                    None
                } else {
                    Some(examples)
                },
            }
        })
        .collect()
}

/// Normalize entries already shaped like [`Word`], defaulting missing ids.
pub fn map_word_entries(entries: &[serde_json::Value]) -> Vec<Word> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let term = str_field(e, "term");
            let id = opt_field(e, "id").unwrap_or_else(|| {
                let stem = if term.is_empty() { "w" } else { term.as_str() };
                format!("{stem}#{i}")
            });
            let examples = e.get("examples").and_then(|v| v.as_array()).map(|arr| {
                arr.iter()
                    .filter_map(|x| x.as_str())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            });
            Word {
                id,
                term,
                phonetic: opt_field(e, "phonetic"),
                meaning: str_field(e, "meaning"),
                examples,
            }
        })
        .collect()
}
