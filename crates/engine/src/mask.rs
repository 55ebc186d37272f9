//! Index batches
//!
//! A mask is the set of element indices an instruction currently applies
//! to: ascending and duplicate-free. Contiguous batches are stored as a
//! plain range instead of an explicit list; the two forms are
//! indistinguishable through the public API, including equality.

use std::ops::Range;
use std::sync::Arc;

/// Ascending, duplicate-free batch of element indices
#[derive(Debug, Clone)]
pub struct IndexMask {
    repr: Repr,
}

#[derive(Debug, Clone)]
enum Repr {
    /// Contiguous `[start, start + len)`
    Range { start: usize, len: usize },
    /// Window into a shared explicit index list
    Indices {
        indices: Arc<[usize]>,
        offset: usize,
        len: usize,
    },
}

impl IndexMask {
    /// Batch with no indices
    pub fn empty() -> Self {
        Self {
            repr: Repr::Range { start: 0, len: 0 },
        }
    }

    /// Batch covering the contiguous range `[range.start, range.end)`
    pub fn from_range(range: Range<usize>) -> Self {
        Self {
            repr: Repr::Range {
                start: range.start,
                len: range.end.saturating_sub(range.start),
            },
        }
    }

    /// Batch from an explicit index list.
    ///
    /// The list must already be ascending and duplicate-free.
    pub fn from_indices(indices: Vec<usize>) -> Self {
        debug_assert!(
            indices.windows(2).all(|w| w[0] < w[1]),
            "mask indices must be ascending and duplicate-free"
        );
        let len = indices.len();
        Self {
            repr: Repr::Indices {
                indices: indices.into(),
                offset: 0,
                len,
            },
        }
    }

    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Range { len, .. } | Repr::Indices { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at position `pos`
    pub fn get(&self, pos: usize) -> usize {
        assert!(pos < self.len(), "mask position {pos} out of bounds");
        match &self.repr {
            Repr::Range { start, .. } => start + pos,
            Repr::Indices { indices, offset, .. } => indices[offset + pos],
        }
    }

    /// Sub-batch of `len` indices starting at position `offset`.
    ///
    /// Cheap for both forms: range arithmetic or a shifted window over the
    /// shared list.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset.saturating_add(len) <= self.len(),
            "mask slice {offset}+{len} out of bounds for {} indices",
            self.len()
        );
        let repr = match &self.repr {
            Repr::Range { start, .. } => Repr::Range {
                start: start + offset,
                len,
            },
            Repr::Indices {
                indices,
                offset: base,
                ..
            } => Repr::Indices {
                indices: indices.clone(),
                offset: base + offset,
                len,
            },
        };
        Self { repr }
    }

    pub fn first(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.get(0))
    }

    pub fn last(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.get(self.len() - 1))
    }

    /// One past the largest index; 0 for an empty batch.
    ///
    /// The minimum buffer length needed to address every index.
    pub fn bound(&self) -> usize {
        self.last().map_or(0, |last| last + 1)
    }

    pub fn contains(&self, index: usize) -> bool {
        match &self.repr {
            Repr::Range { start, len } => index >= *start && index < start + len,
            Repr::Indices {
                indices,
                offset,
                len,
            } => indices[*offset..offset + len].binary_search(&index).is_ok(),
        }
    }

    /// Indices in ascending order
    pub fn iter(&self) -> MaskIter<'_> {
        MaskIter {
            mask: self,
            pos: 0,
            end: self.len(),
        }
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

impl PartialEq for IndexMask {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for IndexMask {}

impl From<Range<usize>> for IndexMask {
    fn from(range: Range<usize>) -> Self {
        Self::from_range(range)
    }
}

/// Iterator over mask indices in ascending order
pub struct MaskIter<'a> {
    mask: &'a IndexMask,
    pos: usize,
    end: usize,
}

impl Iterator for MaskIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.pos < self.end {
            let index = self.mask.get(self.pos);
            self.pos += 1;
            Some(index)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MaskIter<'_> {}

impl<'a> IntoIterator for &'a IndexMask {
    type Item = usize;
    type IntoIter = MaskIter<'a>;

    fn into_iter(self) -> MaskIter<'a> {
        self.iter()
    }
}
