//! In-memory vector index with brute-force Euclidean (L2) search.
//!
//! Positions are ordinal: the n-th vector added answers to position n. The
//! index cannot remove a vector in place; callers rebuild it from scratch
//! after a deletion so that positions never drift from the owner's list.
//! All searches are O(n), which is fine for a personal task list.

use labeeb_core::LabeebError;

/// Errors from index operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<IndexError> for LabeebError {
    fn from(err: IndexError) -> Self {
        LabeebError::Index(err.to_string())
    }
}

/// A single hit returned from a nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Ordinal position of the matching vector.
    pub position: usize,
    /// Euclidean distance to the query.
    pub distance: f32,
}

/// Flat index over fixed-dimension vectors.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingIndex {
    /// Create a new empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append one vector at the next position.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<(), IndexError> {
        self.check_dimension(vector.len())?;
        self.vectors.push(vector);
        Ok(())
    }

    /// Return up to `k` positions ordered by ascending L2 distance.
    ///
    /// Ties keep insertion order. Fewer than `k` hits are returned when the
    /// index holds fewer vectors; an empty index yields no hits.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.check_dimension(query.len())?;

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                distance: l2_distance(query, vector),
            })
            .collect();

        // Stable sort keeps insertion order for equal distances.
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);

        Ok(hits)
    }

    /// Drop every vector.
    pub fn reset(&mut self) {
        self.vectors.clear();
    }

    /// Replace the contents with `vectors`, in order.
    ///
    /// Every vector is validated first; on error the index is left untouched.
    pub fn rebuild<I>(&mut self, vectors: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        let vectors: Vec<Vec<f32>> = vectors.into_iter().collect();
        for v in &vectors {
            self.check_dimension(v.len())?;
        }
        self.vectors = vectors;
        Ok(())
    }

    /// Return the number of vectors currently stored in the index.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Return true if the index contains no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn check_dimension(&self, actual: usize) -> Result<(), IndexError> {
        if actual == self.dimension {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual,
            })
        }
    }
}

/// Euclidean distance between two equal-length vectors.
fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum();
    sum.sqrt() as f32
}
