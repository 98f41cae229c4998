//! A concurrent, growable object pool with block-allocated storage.
//!
//! # Features
//!
//! - Objects are constructed in batches into contiguous memory blocks, so
//! construction cost is amortized and neighboring objects share cache lines.
//! - Thread-safe: acquiring and releasing already-constructed objects is
//! lock-free; only growing the pool takes a mutex.
//! - Configurable growth: a fixed batch size, or geometric doubling from a
//! starting size.
//! - Caller-supplied construction and reset behavior, including fallible
//! construction with whole-batch rollback on failure.
//! - Pluggable block allocator.
//!
//! # Growth
//!
//! The pool starts empty and grows on demand. A positive growth value adds
//! exactly that many objects per replenishment; a negative value starts at
//! its absolute value and doubles each time, up to a cap. Objects are never
//! destroyed individually: a released object is reset and reused, and all
//! objects live until the pool is dropped.
//!
//! # Examples
//!
//! ## Local pool
//!
//! ```rust
//! use frame_pool::Pool;
//!
//! let pool: Pool<Vec<u8>> = Pool::builder()
//!     .growth(16)
//!     .resetter(Vec::clear)
//!     .build()
//!     .unwrap();
//!
//! let mut buf = pool.get().unwrap();
//! buf.extend_from_slice(b"payload");
//! assert_eq!(pool.allocated(), 16);
//! assert_eq!(pool.available(), 15);
//!
//! drop(buf);
//! assert_eq!(pool.available(), 16);
//! // The resetter ran before the buffer became available again.
//! assert!(pool.get().unwrap().is_empty());
//! ```
//!
//! ## Multiple threads sharing one pool
//!
//! ```rust
//! use std::sync::{Arc, mpsc};
//!
//! use frame_pool::Pool;
//!
//! let pool: Arc<Pool<String>> = Arc::new(Pool::new());
//!
//! let (tx, rx) = mpsc::channel();
//! let clone_pool = pool.clone();
//! let tx1 = tx.clone();
//! let sender1 = std::thread::spawn(move || {
//!     let mut item = clone_pool.get_owned().unwrap();
//!     item.push_str("1");
//!     tx1.send((1, item)).unwrap();
//! });
//!
//! let clone_pool = pool.clone();
//! let sender2 = std::thread::spawn(move || {
//!     let mut item = clone_pool.get_owned().unwrap();
//!     item.push_str("2");
//!     tx.send((2, item)).unwrap();
//! });
//!
//! let receiver = std::thread::spawn(move || {
//!     for _ in 0..2 {
//!         let (id, item) = rx.recv().unwrap();
//!         assert_eq!(*item, id.to_string());
//!     }
//! });
//!
//! sender1.join().unwrap();
//! sender2.join().unwrap();
//! receiver.join().unwrap();
//! ```

mod alloc;
mod block;
mod builder;
mod error;
mod frame;
mod free_list;
mod growth;
mod lease;
mod pool;

pub use alloc::{BlockAllocator, GlobalBlockAllocator};
pub use builder::Builder;
pub use error::{BoxError, Error};
pub use lease::{Lease, OwnedLease};
pub use pool::{ObjectFactory, Pool};
