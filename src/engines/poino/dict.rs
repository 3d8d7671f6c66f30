//! Literal text-to-mora dictionaries applied before text analysis.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::codec::MoraUnit;
use super::model::PoinoError;
use super::tables::{Accent, Kana};

const SYSTEM_DICT_JSON: &str = include_str!("data/system_dict.json");

/// One mora of a dictionary reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictEntry {
    pub kana: Kana,
    pub accent: Accent,
}

/// Literal text token → mora reading.
pub type OptiDict = BTreeMap<String, Vec<DictEntry>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictKind {
    System,
    User,
}

/// A piece of input text after dictionary substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Text no dictionary matched; goes to the analyzer.
    Text(String),
    /// Moras spliced in from a dictionary hit.
    Moras(Vec<MoraUnit>),
}

/// The system and user dictionaries.
///
/// Both tables sit behind reader-writer locks. `resolve` holds both read
/// guards for the whole pass, so loads and clears never interleave with a
/// request reading the tables.
#[derive(Debug, Default)]
pub struct DictionaryStore {
    system: RwLock<OptiDict>,
    user: RwLock<OptiDict>,
}

impl DictionaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the bundled system dictionary loaded.
    pub fn with_system_dict() -> Result<Self, PoinoError> {
        let store = Self::new();
        store.load(DictKind::System, system_dict()?)?;
        Ok(store)
    }

    fn table(&self, kind: DictKind) -> &RwLock<OptiDict> {
        match kind {
            DictKind::System => &self.system,
            DictKind::User => &self.user,
        }
    }

    /// Merge `dict` into the chosen table; existing keys are replaced.
    pub fn load(&self, kind: DictKind, dict: OptiDict) -> Result<(), PoinoError> {
        if dict.keys().any(|k| k.is_empty()) {
            return Err(PoinoError::Validation(
                "dictionary keys must not be empty".to_string(),
            ));
        }

        let count = dict.len();
        self.table(kind).write().extend(dict);
        log::info!("Loaded {count} {kind:?} dictionary entries");
        Ok(())
    }

    /// Parse a JSON dictionary and merge it into the chosen table.
    /// Unknown kana are rejected.
    pub fn load_json(&self, kind: DictKind, json: &str) -> Result<(), PoinoError> {
        let dict: OptiDict = serde_json::from_str(json)?;
        self.load(kind, dict)
    }

    pub fn clear_user(&self) {
        self.user.write().clear();
    }

    /// Number of entries in the chosen table.
    pub fn len(&self, kind: DictKind) -> usize {
        self.table(kind).read().len()
    }

    /// Apply the user dictionary, then the system dictionary.
    ///
    /// Keys are tried shortest first. Every occurrence of a key inside a
    /// remaining text fragment is replaced by its moras; empty text
    /// fragments are dropped.
    pub fn resolve(&self, text: &str) -> Vec<Fragment> {
        let user = self.user.read();
        let system = self.system.read();

        let mut fragments = Vec::new();
        if !text.is_empty() {
            fragments.push(Fragment::Text(text.to_string()));
        }
        for dict in [&*user, &*system] {
            for (key, entries) in by_key_length(dict) {
                fragments = splice(fragments, key, entries);
            }
        }
        fragments
    }
}

fn by_key_length(dict: &OptiDict) -> Vec<(&str, &[DictEntry])> {
    let mut sorted: Vec<_> = dict
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_slice()))
        .collect();
    sorted.sort_by_key(|(k, _)| k.chars().count());
    sorted
}

fn splice(fragments: Vec<Fragment>, key: &str, entries: &[DictEntry]) -> Vec<Fragment> {
    let mut out = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        let text = match fragment {
            Fragment::Text(text) if text.contains(key) => text,
            other => {
                out.push(other);
                continue;
            }
        };

        let mut pieces = text.split(key).peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                out.push(Fragment::Text(piece.to_string()));
            }
            if pieces.peek().is_some() {
                out.push(Fragment::Moras(
                    entries
                        .iter()
                        .map(|e| MoraUnit::new(e.kana, e.accent))
                        .collect(),
                ));
            }
        }
    }

    out
}

/// The bundled system dictionary.
pub fn system_dict() -> Result<OptiDict, PoinoError> {
    Ok(serde_json::from_str(SYSTEM_DICT_JSON)?)
}
