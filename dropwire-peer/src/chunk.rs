//! Chunk codec
//!
//! Splits an encrypted blob into an ordered, lazy sequence of bounded chunks
//! and reassembles received chunks, checking the total against the size
//! declared in the transfer metadata.

use thiserror::Error;

/// Number of chunks a blob of `len` bytes produces at `chunk_size`
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    assert!(chunk_size > 0, "chunk size must be positive");
    len.div_ceil(chunk_size)
}

/// Lazy iterator over the chunks of a blob
///
/// Finite and not restartable; each chunk borrows from the blob.
pub struct Chunks<'a> {
    blob: &'a [u8],
    chunk_size: usize,
    offset: usize,
}

impl<'a> Chunks<'a> {
    /// Split `blob` into chunks of at most `chunk_size` bytes
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    pub fn new(blob: &'a [u8], chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            blob,
            chunk_size,
            offset: 0,
        }
    }

    /// Bytes already yielded
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Change the size of chunks yielded from now on
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        assert!(chunk_size > 0, "chunk size must be positive");
        self.chunk_size = chunk_size;
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.blob.len() {
            return None;
        }
        let end = (self.offset + self.chunk_size).min(self.blob.len());
        let chunk = &self.blob[self.offset..end];
        self.offset = end;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = chunk_count(self.blob.len() - self.offset, self.chunk_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

/// Received byte count does not match the declared total
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("size mismatch: expected {expected} bytes, received {actual}")]
pub struct SizeMismatch {
    pub expected: u64,
    pub actual: u64,
}

/// Collects chunks in arrival order
#[derive(Debug)]
pub struct Reassembler {
    expected: u64,
    buffer: Vec<u8>,
}

impl Reassembler {
    /// Start reassembling a blob of `expected` bytes
    pub fn new(expected: u64) -> Self {
        // Cap the up-front reservation; a hostile size must not allocate.
        let reserve = expected.min(64 * 1024 * 1024) as usize;
        Self {
            expected,
            buffer: Vec::with_capacity(reserve),
        }
    }

    /// Append a chunk
    ///
    /// Fails as soon as the running total exceeds the declared size.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), SizeMismatch> {
        let actual = self.buffer.len() as u64 + chunk.len() as u64;
        if actual > self.expected {
            return Err(SizeMismatch {
                expected: self.expected,
                actual,
            });
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Bytes received so far
    pub fn received(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Declared total
    pub fn expected(&self) -> u64 {
        self.expected
    }

    /// Finish, verifying the total
    pub fn finish(self) -> Result<Vec<u8>, SizeMismatch> {
        let actual = self.buffer.len() as u64;
        if actual != self.expected {
            return Err(SizeMismatch {
                expected: self.expected,
                actual,
            });
        }
        Ok(self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KB: usize = 1024;

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(0, 10), 0);
        assert_eq!(chunk_count(1, 10), 1);
        assert_eq!(chunk_count(10, 10), 1);
        assert_eq!(chunk_count(11, 10), 2);
    }

    #[test]
    fn test_ten_megabytes_at_256k_is_forty_chunks() {
        let blob = vec![0u8; 10 * KB * KB];
        let chunks = Chunks::new(&blob, 256 * KB);
        assert_eq!(chunks.len(), 40);
        assert_eq!(chunks.count(), 40);
    }

    #[test]
    fn test_split_and_concatenate() {
        let blob: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        for size in [1, 7, 64, 999, 1000, 4096] {
            let chunks: Vec<&[u8]> = Chunks::new(&blob, size).collect();
            assert_eq!(chunks.len(), chunk_count(blob.len(), size));
            assert!(chunks.iter().all(|c| c.len() <= size && !c.is_empty()));
            assert_eq!(chunks.concat(), blob);
        }
    }

    #[test]
    fn test_last_chunk_is_remainder() {
        let blob = vec![1u8; 25];
        let sizes: Vec<usize> = Chunks::new(&blob, 10).map(<[u8]>::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[test]
    fn test_empty_blob_has_no_chunks() {
        assert_eq!(Chunks::new(&[], 16).next(), None);
    }

    #[test]
    fn test_set_chunk_size_midway() {
        let blob = vec![0u8; 30];
        let mut chunks = Chunks::new(&blob, 10);
        assert_eq!(chunks.next().map(<[u8]>::len), Some(10));
        chunks.set_chunk_size(4);
        assert_eq!(chunks.offset(), 10);
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks.map(<[u8]>::len).sum::<usize>(), 20);
    }

    #[test]
    #[should_panic(expected = "chunk size must be positive")]
    fn test_zero_chunk_size_panics() {
        let _ = Chunks::new(&[1, 2, 3], 0);
    }

    #[test]
    fn test_reassemble_exact() {
        let blob: Vec<u8> = (0..100u8).collect();
        let mut reassembler = Reassembler::new(blob.len() as u64);
        for chunk in Chunks::new(&blob, 30) {
            reassembler.push(chunk).unwrap();
        }
        assert_eq!(reassembler.received(), 100);
        assert_eq!(reassembler.finish().unwrap(), blob);
    }

    #[test]
    fn test_reassemble_short_fails() {
        let mut reassembler = Reassembler::new(100);
        reassembler.push(&[0u8; 60]).unwrap();
        assert_eq!(
            reassembler.finish(),
            Err(SizeMismatch {
                expected: 100,
                actual: 60
            })
        );
    }

    #[test]
    fn test_reassemble_overflow_fails_immediately() {
        let mut reassembler = Reassembler::new(10);
        reassembler.push(&[0u8; 8]).unwrap();
        assert_eq!(
            reassembler.push(&[0u8; 3]),
            Err(SizeMismatch {
                expected: 10,
                actual: 11
            })
        );
        assert_eq!(reassembler.received(), 8);
    }

    #[test]
    fn test_reassemble_empty() {
        assert_eq!(Reassembler::new(0).finish().unwrap(), Vec::<u8>::new());
    }
}
