use anyhow::{Context, Result};
use facebench_vision::Embedding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledEmbedding {
    pub embedding: Embedding,
    pub label: String,
}

/// Enrolled faces in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentDatabase {
    entries: Vec<LabeledEmbedding>,
}

/// On-disk layout: two parallel sequences.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDatabase {
    encodings: Vec<Vec<f32>>,
    names: Vec<String>,
}

impl EnrollmentDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, embedding: Embedding, label: impl Into<String>) {
        self.entries.push(LabeledEmbedding {
            embedding,
            label: label.into(),
        });
    }

    pub fn entries(&self) -> &[LabeledEmbedding] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.entries.iter().any(|e| e.label == label)
    }

    /// Number of enrolled embeddings per label.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let stored = StoredDatabase {
            encodings: self.entries.iter().map(|e| e.embedding.to_vec()).collect(),
            names: self.entries.iter().map(|e| e.label.clone()).collect(),
        };
        Ok(postcard::to_allocvec(&stored)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let stored: StoredDatabase = postcard::from_bytes(data)?;
        if stored.encodings.len() != stored.names.len() {
            anyhow::bail!(
                "database has {} encodings but {} names",
                stored.encodings.len(),
                stored.names.len()
            );
        }
        let mut db = Self::new();
        for (encoding, name) in stored.encodings.into_iter().zip(stored.names) {
            db.push(Embedding::from_vec(encoding), name);
        }
        Ok(db)
    }

    pub fn save(&self, file: &Path) -> Result<()> {
        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let data = self.to_bytes()?;
        std::fs::write(file, data).with_context(|| format!("writing {}", file.display()))?;
        Ok(())
    }

    pub fn load(file: &Path) -> Result<Self> {
        let data = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
        Self::from_bytes(&data).with_context(|| format!("decoding {}", file.display()))
    }
}
