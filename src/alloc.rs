use std::alloc::Layout;
use std::fmt::Debug;
use std::ptr::NonNull;

/// Source of raw block memory for a [`Pool`](crate::Pool).
///
/// The pool requests one allocation per replenishment batch and returns it
/// either at pool destruction or while rolling back a failed batch. Layouts
/// passed to [`deallocate`](BlockAllocator::deallocate) are always the exact
/// layouts the block was allocated with.
///
/// The default is [`GlobalBlockAllocator`], resolved once when the pool is
/// built rather than looked up per allocation.
///
/// # Example
///
/// ```rust
/// use std::alloc::Layout;
/// use std::ptr::NonNull;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use frame_pool::{BlockAllocator, GlobalBlockAllocator, Pool};
///
/// /// Counts blocks handed out, delegating to the global allocator.
/// #[derive(Debug, Default)]
/// struct Counting {
///     blocks: AtomicUsize,
/// }
///
/// impl BlockAllocator for Counting {
///     fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
///         self.blocks.fetch_add(1, Ordering::Relaxed);
///         GlobalBlockAllocator.allocate(layout)
///     }
///
///     unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
///         unsafe { GlobalBlockAllocator.deallocate(ptr, layout) }
///     }
/// }
///
/// let allocator = Arc::new(Counting::default());
/// let pool: Pool<u64> = Pool::builder()
///     .growth(4)
///     .allocator(allocator.clone())
///     .build()
///     .unwrap();
/// let _item = pool.get().unwrap();
/// assert_eq!(allocator.blocks.load(Ordering::Relaxed), 1);
/// ```
pub trait BlockAllocator: Debug + Send + Sync {
    /// Allocate a block of memory for the given layout, or `None` if the
    /// request cannot be satisfied.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block previously obtained from
    /// [`allocate`](BlockAllocator::allocate) on this allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on `self` with this exact
    /// `layout`, and must not be deallocated twice.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// [`BlockAllocator`] backed by the process global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalBlockAllocator;

impl BlockAllocator for GlobalBlockAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        // SAFETY: block layouts always contain at least one header, so the
        // size is non-zero as `std::alloc::alloc` requires.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
