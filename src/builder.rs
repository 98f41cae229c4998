use std::sync::Arc;

use crate::Pool;
use crate::alloc::{BlockAllocator, GlobalBlockAllocator};
use crate::error::{BoxError, Error};
use crate::growth::GrowthPolicy;

/// Builds one object for a new batch; may fail, failing the whole batch.
pub(crate) type Creator<T> = Box<dyn Fn() -> Result<T, BoxError> + Send + Sync>;

/// Restores a released object to reusable state.
pub(crate) type Resetter<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// A builder for creating a [`Pool`] with custom configuration.
///
/// # Example
///
/// ```rust
/// use frame_pool::Builder;
///
/// let pool = Builder::<Vec<u8>>::new()
///     .growth(8)
///     .creator(|| Vec::with_capacity(4096))
///     .resetter(Vec::clear)
///     .build()
///     .unwrap();
/// let buf = pool.get().unwrap();
/// assert!(buf.capacity() >= 4096);
/// ```
pub struct Builder<T> {
    growth: i32,
    creator: Creator<T>,
    resetter: Option<Resetter<T>>,
    allocator: Arc<dyn BlockAllocator>,
}

impl<T: Default + 'static> Builder<T> {
    /// Create a builder with the default configuration: geometric growth
    /// starting at one object, default-constructed objects, no resetter,
    /// the global allocator.
    pub fn new() -> Self {
        Self::with_creator(T::default)
    }
}

impl<T: Default + 'static> Default for Builder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Builder<T> {
    /// Create a builder around a construction function, for object types
    /// without a `Default` implementation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Builder;
    ///
    /// struct Conn {
    ///     endpoint: String,
    /// }
    ///
    /// let pool = Builder::with_creator(|| Conn {
    ///     endpoint: "localhost:9000".into(),
    /// })
    /// .build()
    /// .unwrap();
    /// assert_eq!(pool.get().unwrap().endpoint, "localhost:9000");
    /// ```
    pub fn with_creator<F>(creator: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            growth: -1,
            creator: Box::new(move || Ok(creator())),
            resetter: None,
            allocator: Arc::new(GlobalBlockAllocator),
        }
    }

    /// Create a builder around a fallible construction function. See
    /// [`try_creator`](Builder::try_creator) for the failure semantics.
    pub fn with_try_creator<F>(creator: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            growth: -1,
            creator: Box::new(creator),
            resetter: None,
            allocator: Arc::new(GlobalBlockAllocator),
        }
    }

    /// Set the replenishment growth. Positive values add exactly that many
    /// objects per replenishment; negative values start at the absolute
    /// value and double per replenishment up to a fixed cap. Zero is
    /// rejected by [`build`](Builder::build).
    pub fn growth(mut self, growth: i32) -> Self {
        self.growth = growth;
        self
    }

    /// Set the function that constructs one object for a new batch.
    pub fn creator<F>(mut self, creator: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.creator = Box::new(move || Ok(creator()));
        self
    }

    /// Set a fallible construction function. A construction failure fails
    /// and fully rolls back the batch that needed it; the error is surfaced
    /// by whichever call triggered the growth.
    ///
    /// # Example
    ///
    /// ```rust
    /// use frame_pool::Builder;
    ///
    /// let pool = Builder::<u32>::new()
    ///     .try_creator(|| Err("resource exhausted".into()))
    ///     .build()
    ///     .unwrap();
    /// assert!(pool.get().is_err());
    /// assert_eq!(pool.allocated(), 0);
    /// ```
    pub fn try_creator<F>(mut self, creator: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.creator = Box::new(creator);
        self
    }

    /// Set the function run on an object each time it is released, before
    /// its slot becomes available again. The default leaves released
    /// objects untouched.
    pub fn resetter<F>(mut self, resetter: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.resetter = Some(Box::new(resetter));
        self
    }

    /// Set the allocator supplying block memory. The default is the process
    /// global allocator.
    pub fn allocator(mut self, allocator: Arc<dyn BlockAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Build the pool, validating the configuration.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroGrowth`] if growth was set to zero.
    pub fn build(self) -> Result<Pool<T>, Error> {
        let policy = GrowthPolicy::new(self.growth)?;
        Ok(Pool::from_parts(
            self.creator,
            self.resetter,
            self.allocator,
            policy,
        ))
    }
}
