//! Closed, index-addressable label vocabulary.

use crate::util::{DetectError, DetectResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Ordered class names, one per model class.
///
/// Labels are stored as `Arc<str>` so detections share them instead of
/// allocating a string per box per frame.
#[derive(Clone, Debug)]
pub struct LabelVocabulary {
    labels: Vec<Arc<str>>,
    index: HashMap<Arc<str>, usize>,
}

impl LabelVocabulary {
    /// Builds a vocabulary from class names in model order.
    pub fn new<I, S>(labels: I) -> DetectResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = Vec::new();
        let mut index = HashMap::new();
        for label in labels {
            let label: Arc<str> = Arc::from(label.as_ref());
            if index.insert(label.clone(), out.len()).is_some() {
                return Err(DetectError::DuplicateLabel {
                    label: label.to_string(),
                });
            }
            out.push(label);
        }
        if out.is_empty() {
            return Err(DetectError::EmptyVocabulary);
        }
        Ok(Self { labels: out, index })
    }

    /// Parses a labels asset: one label per line, blank lines and lines
    /// starting with `#` are skipped, surrounding whitespace is trimmed.
    pub fn from_text(text: &str) -> DetectResult<Self> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Reads and parses a labels asset from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> DetectResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| DetectError::Io {
            what: "labels",
            reason: err.to_string(),
        })?;
        Self::from_text(&text)
    }

    /// Returns the number of classes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false; an empty vocabulary cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the label of `class`.
    pub fn get(&self, class: usize) -> Option<&Arc<str>> {
        self.labels.get(class)
    }

    /// Returns the class index of `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Iterates labels in class order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.as_ref())
    }
}
