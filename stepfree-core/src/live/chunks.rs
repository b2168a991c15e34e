use std::sync::Arc;

/// Entries per chunk
const CHUNK_LEN: usize = 256;

/// Vector split into shared chunks
///
/// Cloning copies one pointer per chunk. Writing through [`Self::get_mut`]
/// copies only the chunk that holds the slot, so a snapshot derived from
/// another one shares every chunk it did not write to.
#[derive(Debug, Clone)]
pub(crate) struct ChunkedVec<T> {
    chunks: Vec<Arc<Vec<T>>>,
    len: usize,
}

impl<T: Clone> ChunkedVec<T> {
    pub(crate) fn from_vec(items: Vec<T>) -> Self {
        let len = items.len();
        let mut chunks = Vec::with_capacity(len.div_ceil(CHUNK_LEN));
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            chunks.push(Arc::new(items.by_ref().take(CHUNK_LEN).collect()));
        }
        Self { chunks, len }
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&T> {
        self.chunks.get(idx / CHUNK_LEN)?.get(idx % CHUNK_LEN)
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        let chunk = self.chunks.get_mut(idx / CHUNK_LEN)?;
        Arc::make_mut(chunk).get_mut(idx % CHUNK_LEN)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    fn shares_chunk_with(&self, other: &Self, idx: usize) -> bool {
        let chunk = idx / CHUNK_LEN;
        Arc::ptr_eq(&self.chunks[chunk], &other.chunks[chunk])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_copy_only_their_chunk() {
        let original = ChunkedVec::from_vec((0..CHUNK_LEN * 3 + 5).collect::<Vec<usize>>());
        assert_eq!(original.len(), CHUNK_LEN * 3 + 5);
        assert_eq!(original.get(CHUNK_LEN * 3 + 4), Some(&(CHUNK_LEN * 3 + 4)));
        assert_eq!(original.get(CHUNK_LEN * 3 + 5), None);

        let mut updated = original.clone();
        *updated.get_mut(CHUNK_LEN + 1).unwrap() = 0;

        assert_eq!(updated.get(CHUNK_LEN + 1), Some(&0));
        assert_eq!(original.get(CHUNK_LEN + 1), Some(&(CHUNK_LEN + 1)));
        assert!(!updated.shares_chunk_with(&original, CHUNK_LEN));
        assert!(updated.shares_chunk_with(&original, 0));
        assert!(updated.shares_chunk_with(&original, CHUNK_LEN * 2));
        assert!(updated.shares_chunk_with(&original, CHUNK_LEN * 3));
        assert_eq!(updated.iter().count(), original.len());
    }

    #[test]
    fn empty_vector_has_no_chunks() {
        let empty = ChunkedVec::<u8>::from_vec(Vec::new());
        assert_eq!(empty.len(), 0);
        assert!(empty.get(0).is_none());
        assert_eq!(empty.iter().count(), 0);
    }
}
