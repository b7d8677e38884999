//! Nearest-document retrieval.
//!
//! The query and the whole corpus are embedded in one batch, then an exact
//! flat L2 index picks the closest document. Corpora are small (one row per
//! scraped page), so a brute-force scan is all the index needs to be.

use anyhow::Error as AnyError;
use thiserror::Error;
use tracing::debug;

use crate::kernel::BaseEmbeddingService;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Embedding model failed to load. Cannot perform vector search.")]
    EmbeddingUnavailable,

    #[error("No documents to search against.")]
    EmptyCorpus,

    #[error("Embedding failed: {0}")]
    Embedding(AnyError),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Exact nearest-neighbour index over squared Euclidean distance
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn add(&mut self, vector: Vec<f32>) -> Result<(), MatchError> {
        if vector.len() != self.dimension {
            return Err(MatchError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.push(vector);
        Ok(())
    }

    /// Position and squared distance of the closest vector. Ties go to the
    /// earliest insert.
    pub fn nearest(&self, query: &[f32]) -> Result<Option<(usize, f32)>, MatchError> {
        if query.len() != self.dimension {
            return Err(MatchError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut best: Option<(usize, f32)> = None;
        for (position, vector) in self.vectors.iter().enumerate() {
            let distance = squared_l2(query, vector);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((position, distance)),
            }
        }
        Ok(best)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Return the document closest to `query` in embedding space.
pub async fn find_best_match<'a>(
    query: &str,
    documents: &'a [String],
    embeddings: Option<&dyn BaseEmbeddingService>,
) -> Result<&'a str, MatchError> {
    let embeddings = embeddings.ok_or(MatchError::EmbeddingUnavailable)?;
    if documents.is_empty() {
        return Err(MatchError::EmptyCorpus);
    }

    let mut texts = Vec::with_capacity(documents.len() + 1);
    texts.push(query.to_string());
    texts.extend(documents.iter().cloned());

    let mut vectors = embeddings
        .generate_batch(&texts)
        .await
        .map_err(MatchError::Embedding)?
        .into_iter();

    let Some(query_vector) = vectors.next() else {
        return Err(MatchError::Embedding(anyhow::anyhow!(
            "embedding provider returned no vectors"
        )));
    };

    let mut index = FlatL2Index::new(query_vector.len());
    for vector in vectors {
        index.add(vector)?;
    }

    if index.len() != documents.len() {
        return Err(MatchError::Embedding(anyhow::anyhow!(
            "expected {} document vectors, got {}",
            documents.len(),
            index.len()
        )));
    }

    let (position, distance) = index.nearest(&query_vector)?.ok_or(MatchError::EmptyCorpus)?;

    debug!(
        corpus_size = documents.len(),
        dimension = index.dimension(),
        position,
        distance,
        "Best match found"
    );

    Ok(&documents[position])
}
