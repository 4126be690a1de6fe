//! Event class vocabulary
//!
//! A vocabulary is the ordered set of valid event class names for a dataset,
//! read from a newline-delimited class list (`class.txt`).

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Ordered, duplicate-free set of event class names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from names in order
    ///
    /// Names are trimmed, blank names are dropped and repeated names keep
    /// their first position. An empty result is not rejected here; loaders
    /// reading from disk reject it with [`Error::EmptyVocabulary`].
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self {
            names: Vec::new(),
            index: HashMap::new(),
        };
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if vocabulary.index.contains_key(name) {
                warn!("Duplicate class '{}' in vocabulary, keeping first entry", name);
                continue;
            }
            vocabulary.index.insert(name.to_string(), vocabulary.names.len());
            vocabulary.names.push(name.to_string());
        }
        vocabulary
    }

    /// Load a newline-delimited class list
    ///
    /// # Errors
    ///
    /// * [`Error::Io`] if the file cannot be read
    /// * [`Error::EmptyVocabulary`] if it holds no non-blank line
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let vocabulary = Self::from_names(content.lines());
        if vocabulary.is_empty() {
            return Err(Error::EmptyVocabulary(path.to_path_buf()));
        }
        debug!("Loaded {} classes from {}", vocabulary.len(), path.display());
        Ok(vocabulary)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 0-based position of a class in the vocabulary
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Class name at a 0-based position
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
