//! Boundary conversion from publisher chunks to sink buffers.

use crate::error::BoxError;
use std::fmt;
use std::marker::PhantomData;

/// Converts a publisher chunk into the sink's native buffer type.
///
/// A conversion failure is reported to the completion notifier as a sink
/// failure; the chunk is dropped.
pub trait ChunkConverter: Send + Sync {
    /// Chunk type emitted by the publisher.
    type Chunk;
    /// Buffer type accepted by the sink.
    type Buffer;

    fn convert(&self, chunk: Self::Chunk) -> Result<Self::Buffer, BoxError>;
}

/// Infallible conversion through [`Into`].
pub struct Passthrough<C, B = C> {
    _marker: PhantomData<fn(C) -> B>,
}

impl<C, B> Passthrough<C, B> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C, B> Default for Passthrough<C, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, B> Clone for Passthrough<C, B> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<C, B> Copy for Passthrough<C, B> {}

impl<C, B> fmt::Debug for Passthrough<C, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passthrough")
    }
}

impl<C: Into<B>, B> ChunkConverter for Passthrough<C, B> {
    type Chunk = C;
    type Buffer = B;

    #[inline]
    fn convert(&self, chunk: C) -> Result<B, BoxError> {
        Ok(chunk.into())
    }
}

/// Conversion backed by a closure.
///
/// ```
/// use writebridge::{ChunkConverter, FnConverter};
///
/// let utf8 = FnConverter::new(|chunk: Vec<u8>| Ok(String::from_utf8(chunk)?));
/// assert_eq!(utf8.convert(b"abc".to_vec()).unwrap(), "abc");
/// assert!(utf8.convert(vec![0xff]).is_err());
/// ```
pub struct FnConverter<F, C, B> {
    f: F,
    _marker: PhantomData<fn(C) -> B>,
}

impl<F, C, B> FnConverter<F, C, B>
where
    F: Fn(C) -> Result<B, BoxError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, C, B> ChunkConverter for FnConverter<F, C, B>
where
    F: Fn(C) -> Result<B, BoxError> + Send + Sync,
{
    type Chunk = C;
    type Buffer = B;

    #[inline]
    fn convert(&self, chunk: C) -> Result<B, BoxError> {
        (self.f)(chunk)
    }
}
