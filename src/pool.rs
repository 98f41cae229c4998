use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::*;

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::alloc::BlockAllocator;
use crate::block::{Block, BlockHeader, destroy_chain};
use crate::builder::{Builder, Creator, Resetter};
use crate::frame::Frame;
use crate::free_list::FreeList;
use crate::growth::GrowthPolicy;
use crate::{Error, Lease, OwnedLease};

/// A concurrent object pool with block-allocated storage.
///
/// Objects are constructed in batches into contiguous memory blocks and
/// handed out through [`Lease`] guards; dropping a lease resets the object
/// and makes its slot available again. Slots are never destroyed
/// individually: an object lives until the pool itself is dropped, which
/// destroys every object and returns every block to the allocator.
///
/// Acquire and release against already-available slots are lock-free; only
/// growing the pool takes a mutex, so at most one thread builds a new block
/// at a time.
///
/// # Examples
///
/// ```rust
/// use frame_pool::Pool;
///
/// let pool: Pool<String> = Pool::new();
/// assert_eq!(pool.allocated(), 0);
///
/// let mut item = pool.get().unwrap();
/// item.push_str("hello");
/// assert_eq!(pool.allocated(), 1);
/// assert_eq!(pool.available(), 0);
///
/// drop(item);
/// assert_eq!(pool.available(), 1);
/// ```
///
/// Shared across threads:
///
/// ```rust
/// use std::sync::{Arc, mpsc};
///
/// use frame_pool::Pool;
///
/// let pool: Arc<Pool<u32>> = Arc::new(Pool::new());
///
/// let (tx, rx) = mpsc::channel();
/// let clone_pool = pool.clone();
/// let sender = std::thread::spawn(move || {
///     let mut item = clone_pool.get_owned().unwrap();
///     *item = 42;
///     tx.send(item).unwrap();
/// });
///
/// let item = rx.recv().unwrap();
/// assert_eq!(*item, 42);
/// sender.join().unwrap();
/// ```
pub struct Pool<T> {
    /// Lock-free stack of available frames.
    free: FreeList,
    /// Number of available objects; a best-effort snapshot, not a
    /// synchronization point.
    available: CachePadded<AtomicUsize>,
    /// Number of objects constructed over the pool's lifetime.
    allocated: CachePadded<AtomicUsize>,
    /// Block list and growth state, mutated only while replenishing.
    replenish: Mutex<Replenish>,
    /// Builds one object for a new batch.
    creator: Creator<T>,
    /// Restores a released object to reusable state.
    resetter: Option<Resetter<T>>,
    /// Source of block memory, resolved once at construction.
    allocator: Arc<dyn BlockAllocator>,
}

/// State owned by the replenish mutex.
struct Replenish {
    blocks: *mut BlockHeader,
    policy: GrowthPolicy,
}

// The raw block list is confined to the replenish mutex, and every frame is
// reachable from exactly one place (the free list or one lease), so the
// pool is shareable whenever exclusive access to `T` may move threads.
unsafe impl<T: Send> Send for Pool<T> {}
unsafe impl<T: Send> Sync for Pool<T> {}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        let replenish = self.replenish.get_mut();
        // Destroys every object, including any still lent out through the
        // raw factory interface, and returns every block.
        unsafe { destroy_chain::<T>(replenish.blocks, &*self.allocator) };
    }
}

impl<T: Default + 'static> Pool<T> {
    /// Create a pool with the default configuration: geometric growth
    /// starting at one object, default-constructed objects, no resetter,
    /// the global allocator.
    ///
    /// No objects are constructed until the first acquisition.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Pool;
    ///
    /// let pool: Pool<u32> = Pool::new();
    /// assert_eq!(pool.allocated(), 0);
    /// let item = pool.get().unwrap();
    /// assert_eq!(*item, 0);
    /// assert_eq!(pool.allocated(), 1);
    /// ```
    pub fn new() -> Self {
        match Builder::new().build() {
            Ok(pool) => pool,
            Err(_) => unreachable!("default growth is non-zero"),
        }
    }

    /// Create a pool with the given growth and otherwise default
    /// configuration. Rejects `growth == 0`.
    ///
    /// Positive growth adds exactly that many objects per replenishment;
    /// negative growth starts at the absolute value and doubles per
    /// replenishment up to a fixed cap.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Pool;
    ///
    /// let pool: Pool<u32> = Pool::with_growth(5).unwrap();
    /// let _item = pool.get().unwrap();
    /// // The first miss built one whole batch.
    /// assert_eq!(pool.allocated(), 5);
    ///
    /// assert!(Pool::<u32>::with_growth(0).is_err());
    /// ```
    pub fn with_growth(growth: i32) -> Result<Self, Error> {
        Builder::new().growth(growth).build()
    }

    /// Start building a pool with custom configuration.
    ///
    /// For object types without a `Default` implementation, start from
    /// [`Builder::with_creator`] instead.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Pool;
    ///
    /// let pool: Pool<String> = Pool::builder()
    ///     .growth(4)
    ///     .resetter(String::clear)
    ///     .build()
    ///     .unwrap();
    /// let mut item = pool.get().unwrap();
    /// item.push_str("scratch");
    /// drop(item);
    /// assert_eq!(*pool.get().unwrap(), "");
    /// ```
    pub fn builder() -> Builder<T> {
        Builder::new()
    }
}

impl<T: Default + 'static> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub(crate) fn from_parts(
        creator: Creator<T>,
        resetter: Option<Resetter<T>>,
        allocator: Arc<dyn BlockAllocator>,
        policy: GrowthPolicy,
    ) -> Self {
        Self {
            free: FreeList::new(),
            available: CachePadded::new(AtomicUsize::new(0)),
            allocated: CachePadded::new(AtomicUsize::new(0)),
            replenish: Mutex::new(Replenish {
                blocks: std::ptr::null_mut(),
                policy,
            }),
            creator,
            resetter,
            allocator,
        }
    }

    /// Acquire an object, growing the pool by one policy batch if no object
    /// is available.
    ///
    /// Succeeds with some free or newly built object; which one is
    /// unspecified. Fails only if growth was needed and construction
    /// failed; the failed batch is fully rolled back and the pool left
    /// unchanged, so the call may simply be retried.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Pool;
    ///
    /// let pool: Pool<Vec<u8>> = Pool::new();
    /// let mut buf = pool.get().unwrap();
    /// buf.extend_from_slice(b"data");
    /// assert_eq!(pool.in_use(), 1);
    /// ```
    pub fn get(&self) -> Result<Lease<'_, T>, Error> {
        let frame = self.acquire_frame()?;
        Ok(Lease::new(self, frame))
    }

    /// Acquire an object through a handle that keeps the pool alive, for
    /// moving across threads.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use frame_pool::Pool;
    ///
    /// let pool: Arc<Pool<u32>> = Arc::new(Pool::new());
    /// let mut item = pool.get_owned().unwrap();
    /// let worker = std::thread::spawn(move || {
    ///     *item += 1;
    ///     drop(item);
    /// });
    /// worker.join().unwrap();
    /// assert_eq!(pool.available(), pool.allocated());
    /// ```
    pub fn get_owned(self: &Arc<Self>) -> Result<OwnedLease<T>, Error> {
        let frame = self.acquire_frame()?;
        Ok(OwnedLease::new(self.clone(), frame))
    }

    /// Grow the pool in policy-sized batches until at least `count` objects
    /// are available.
    ///
    /// Batches follow the growth policy, so the pool may end up with more
    /// than `count` available objects. On failure the partial batch is
    /// rolled back; batches completed by earlier iterations remain.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Pool;
    ///
    /// let pool: Pool<u32> = Pool::with_growth(3).unwrap();
    /// pool.reserve(7).unwrap();
    /// assert_eq!(pool.allocated(), 9);
    /// assert!(pool.available() >= 7);
    /// ```
    pub fn reserve(&self, count: usize) -> Result<(), Error> {
        if count == 0 {
            return Ok(());
        }
        let mut replenish = self.replenish.lock();
        while self.available.load(Acquire) < count {
            let batch = replenish.policy.next_batch();
            self.add_objects(&mut replenish, batch)?;
        }
        Ok(())
    }

    /// Construct exactly `count` additional objects in one batch, bypassing
    /// the growth policy.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Pool;
    ///
    /// let pool: Pool<u32> = Pool::with_growth(10).unwrap();
    /// pool.grow_exact(4).unwrap();
    /// assert_eq!(pool.allocated(), 4);
    /// assert_eq!(pool.available(), 4);
    /// ```
    pub fn grow_exact(&self, count: usize) -> Result<(), Error> {
        if count == 0 {
            return Ok(());
        }
        let mut replenish = self.replenish.lock();
        self.add_objects(&mut replenish, count)
    }

    /// Number of objects currently available for acquisition.
    ///
    /// Instantaneous snapshot; stale as soon as another thread acquires or
    /// releases.
    pub fn available(&self) -> usize {
        self.available.load(Acquire)
    }

    /// Number of objects constructed by this pool so far. Only successful
    /// replenishment increases it; nothing decreases it.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Pool;
    ///
    /// let pool: Pool<u32> = Pool::with_growth(2).unwrap();
    /// let item = pool.get().unwrap();
    /// assert_eq!(pool.allocated(), 2);
    /// drop(item);
    /// assert_eq!(pool.allocated(), 2);
    /// ```
    pub fn allocated(&self) -> usize {
        self.allocated.load(Acquire)
    }

    /// Number of objects currently lent out. Same snapshot caveat as
    /// [`available`](Pool::available).
    pub fn in_use(&self) -> usize {
        self.allocated().saturating_sub(self.available())
    }

    /// Pop a free frame, growing the pool when none is available.
    fn acquire_frame(&self) -> Result<NonNull<Frame<T>>, Error> {
        loop {
            if let Some(frame) = self.try_pop() {
                return Ok(frame);
            }
            let mut replenish = self.replenish.lock();
            // Another thread may have replenished while we waited for the
            // lock; check again before building a block.
            if let Some(frame) = self.try_pop() {
                return Ok(frame);
            }
            let batch = replenish.policy.next_batch();
            self.add_objects(&mut replenish, batch)?;
            // The new frames are published; drop the lock and race for one.
        }
    }

    fn try_pop(&self) -> Option<NonNull<Frame<T>>> {
        let header = self.free.pop()?;
        self.available.fetch_sub(1, Relaxed);
        unsafe { header.as_ref() }.mark_lent();
        Some(Frame::from_header(header))
    }

    /// Build one block of `batch` objects and publish its frames in one
    /// splice. Runs with the replenish mutex held; all-or-nothing.
    fn add_objects(&self, replenish: &mut Replenish, batch: usize) -> Result<(), Error> {
        let mut block = Block::allocate(batch, &*self.allocator)?;
        if let Err(err) = block.construct_all(&*self.creator) {
            warn!(batch, "object construction failed, batch rolled back");
            return Err(err);
        }
        let (first, last) = block.link_frames();
        let header = block.into_header();
        unsafe {
            (*header.as_ptr()).next = replenish.blocks;
        }
        replenish.blocks = header.as_ptr();
        let allocated = self.allocated.fetch_add(batch, Release) + batch;
        // Counted before publication so a successful pop never drives the
        // available counter below zero.
        self.available.fetch_add(batch, Relaxed);
        unsafe { self.free.splice(first, last) };
        debug!(batch, allocated, "pool replenished");
        Ok(())
    }

    /// Reset a lent object and make its frame available again. Never
    /// blocks; the free-list push is lock-free.
    pub(crate) fn release(&self, mut object: NonNull<T>) {
        if let Some(resetter) = &self.resetter {
            // SAFETY: the object is lent, so this is the only reference.
            resetter(unsafe { object.as_mut() });
        }
        let header = Frame::header(unsafe { Frame::from_object(object) });
        unsafe { header.as_ref() }.mark_free();
        self.available.fetch_add(1, Relaxed);
        self.free.push(header);
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("allocated", &self.allocated())
            .field("available", &self.available())
            .finish_non_exhaustive()
    }
}

/// Generic two-method create/destroy surface, letting a [`Pool`] stand in
/// for any abstraction that only needs to obtain and return objects.
///
/// [`create_object`](ObjectFactory::create_object) is acquisition and
/// [`delete_object`](ObjectFactory::delete_object) is release; nothing is
/// constructed or destroyed per call beyond the pool's usual batch growth.
/// The safe [`Lease`] interface should be preferred wherever it fits; this
/// trait exists for ownership utilities that must manage raw pointers.
///
/// # Example
///
/// ```rust
/// use std::ptr::NonNull;
///
/// use frame_pool::{Error, ObjectFactory, Pool};
///
/// fn exercise<F: ObjectFactory<String>>(factory: &F) -> Result<(), Error> {
///     let object = factory.create_object()?;
///     // SAFETY: `object` came from this factory and is deleted once.
///     unsafe {
///         (*object.as_ptr()).push_str("made by a factory");
///         factory.delete_object(object);
///     }
///     Ok(())
/// }
///
/// let pool: Pool<String> = Pool::new();
/// exercise(&pool).unwrap();
/// assert_eq!(pool.available(), pool.allocated());
/// ```
pub trait ObjectFactory<T> {
    /// Obtain an object, pointer-valid until passed to
    /// [`delete_object`](ObjectFactory::delete_object) or the factory is
    /// destroyed.
    fn create_object(&self) -> Result<NonNull<T>, Error>;

    /// Return an object previously obtained from
    /// [`create_object`](ObjectFactory::create_object).
    ///
    /// # Safety
    ///
    /// `object` must have come from `create_object` on this same factory,
    /// and must not be used or returned again afterwards.
    unsafe fn delete_object(&self, object: NonNull<T>);
}

impl<T> ObjectFactory<T> for Pool<T> {
    fn create_object(&self) -> Result<NonNull<T>, Error> {
        Ok(Frame::object(self.acquire_frame()?))
    }

    unsafe fn delete_object(&self, object: NonNull<T>) {
        self.release(object);
    }
}
