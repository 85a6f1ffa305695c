//! Passage embedding table with brute-force cosine search.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPassage {
    pub file_path: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub id: String,
    pub file_path: String,
    pub text: String,
    pub score: f32,
}

/// Every vector in the store has the same dimension, fixed by the first insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorStore {
    dimension: Option<usize>,
    passages: BTreeMap<String, StoredPassage>,
}

impl VectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StoredPassage> {
        self.passages.get(id)
    }

    /// Check that a vector matches the store dimension without inserting it.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if the store already holds
    /// vectors of another size.
    pub fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(IndexError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if the vector size differs
    /// from vectors already stored.
    pub fn upsert(&mut self, id: String, passage: StoredPassage) -> Result<()> {
        let actual = passage.embedding.len();
        self.check_dimension(actual)?;
        self.dimension.get_or_insert(actual);
        self.passages.insert(id, passage);
        Ok(())
    }

    pub fn remove(&mut self, ids: &[String]) {
        for id in ids {
            self.passages.remove(id);
        }
        if self.passages.is_empty() {
            self.dimension = None;
        }
    }

    /// Top `limit` passages by cosine similarity to `query`, best first.
    /// Equal scores keep key order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if `query` has the wrong size.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredPassage>> {
        if limit == 0 || self.passages.is_empty() {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len())?;

        let mut scored: Vec<ScoredPassage> = self
            .passages
            .iter()
            .map(|(id, p)| ScoredPassage {
                id: id.clone(),
                file_path: p.file_path.clone(),
                text: p.text.clone(),
                score: cosine_similarity(query, &p.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
