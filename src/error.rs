use std::error::Error as StdError;

/// Error type shared by all source-supplied construction strategies.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by pool construction and replenishment.
///
/// Releasing a lease and the bookkeeping accessors never fail; only
/// [`build`](crate::Builder::build) and the replenishment-triggering calls
/// ([`get`](crate::Pool::get), [`reserve`](crate::Pool::reserve),
/// [`grow_exact`](crate::Pool::grow_exact)) return this type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured growth value was zero. Growth must be positive
    /// (fixed increment) or negative (geometric start).
    #[error("pool growth must be non-zero")]
    ZeroGrowth,

    /// The byte size of a block holding the requested number of frames
    /// does not fit in `isize`.
    #[error("requested batch of {frames} frames overflows the maximum block size")]
    CapacityOverflow {
        /// Number of frames in the rejected batch.
        frames: usize,
    },

    /// The block allocator returned no memory.
    #[error("block allocation of {size} bytes failed")]
    AllocFailed {
        /// Byte size of the refused allocation.
        size: usize,
    },

    /// The creator strategy failed while building a batch. The batch has
    /// been fully rolled back: every object constructed before the failure
    /// was destroyed and the block was returned to the allocator, so the
    /// pool is exactly as it was before the triggering call.
    #[error("object construction failed")]
    Construction(#[source] BoxError),
}
