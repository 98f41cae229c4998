use std::fmt::{self, Debug, Display};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::Pool;
use crate::frame::Frame;

/// An object lent out by a [`Pool`].
///
/// A lease is the unique handle to its object: it dereferences mutably
/// without any runtime check, and it cannot be cloned. Dropping the lease
/// runs the pool's resetter and returns the object's slot to the pool.
///
/// # Example
///
/// ```rust
/// use frame_pool::Pool;
///
/// let pool: Pool<String> = Pool::builder().resetter(String::clear).build().unwrap();
/// let mut item = pool.get().unwrap();
/// item.push_str("borrowed");
/// assert_eq!(&*item, "borrowed");
/// drop(item);
/// // The slot is back, and the resetter has run.
/// assert_eq!(&*pool.get().unwrap(), "");
/// ```
pub struct Lease<'a, T> {
    frame: NonNull<Frame<T>>,
    pool: &'a Pool<T>,
}

// A lease owns exclusive access to its object, so it moves and shares under
// exactly the rules `T` itself would.
unsafe impl<T: Send> Send for Lease<'_, T> {}
unsafe impl<T: Send + Sync> Sync for Lease<'_, T> {}

impl<'a, T> Lease<'a, T> {
    pub(crate) fn new(pool: &'a Pool<T>, frame: NonNull<Frame<T>>) -> Self {
        Self { frame, pool }
    }

    /// The pool this lease came from.
    pub fn pool(&self) -> &Pool<T> {
        self.pool
    }
}

impl<T> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        self.pool.release(Frame::object(self.frame));
    }
}

impl<T> Deref for Lease<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the frame is lent to this lease alone, and its object was
        // constructed when the block was built.
        unsafe { Frame::object(self.frame).as_ref() }
    }
}

impl<T> DerefMut for Lease<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as above, and `&mut self` makes the access exclusive.
        unsafe { Frame::object(self.frame).as_mut() }
    }
}

impl<T> AsRef<T> for Lease<'_, T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> AsMut<T> for Lease<'_, T> {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: PartialEq> PartialEq for Lease<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq> Eq for Lease<'_, T> {}

impl<T: Debug> Debug for Lease<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<T: Display> Display for Lease<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for Lease<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (**self).serialize(serializer)
    }
}

/// An object lent out by an [`Arc`]ed [`Pool`], keeping the pool alive.
///
/// Identical to [`Lease`] except that it holds its own reference to the
/// pool, so it can outlive the borrow it was created from and move freely
/// across threads.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use frame_pool::Pool;
///
/// let pool: Arc<Pool<Vec<u8>>> = Arc::new(Pool::new());
/// let mut buf = pool.get_owned().unwrap();
/// let worker = std::thread::spawn(move || {
///     buf.push(1);
///     buf.len()
/// });
/// assert_eq!(worker.join().unwrap(), 1);
/// ```
pub struct OwnedLease<T> {
    frame: NonNull<Frame<T>>,
    pool: Arc<Pool<T>>,
}

unsafe impl<T: Send> Send for OwnedLease<T> {}
unsafe impl<T: Send + Sync> Sync for OwnedLease<T> {}

impl<T> OwnedLease<T> {
    pub(crate) fn new(pool: Arc<Pool<T>>, frame: NonNull<Frame<T>>) -> Self {
        Self { frame, pool }
    }

    /// The pool this lease came from.
    pub fn pool(&self) -> &Arc<Pool<T>> {
        &self.pool
    }
}

impl<T> Drop for OwnedLease<T> {
    fn drop(&mut self) {
        self.pool.release(Frame::object(self.frame));
    }
}

impl<T> Deref for OwnedLease<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: the frame is lent to this lease alone, and its object was
        // constructed when the block was built.
        unsafe { Frame::object(self.frame).as_ref() }
    }
}

impl<T> DerefMut for OwnedLease<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as above, and `&mut self` makes the access exclusive.
        unsafe { Frame::object(self.frame).as_mut() }
    }
}

impl<T> AsRef<T> for OwnedLease<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> AsMut<T> for OwnedLease<T> {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: PartialEq> PartialEq for OwnedLease<T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Eq> Eq for OwnedLease<T> {}

impl<T: Debug> Debug for OwnedLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

impl<T: Display> Display for OwnedLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for OwnedLease<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (**self).serialize(serializer)
    }
}
