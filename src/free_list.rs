use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crossbeam_utils::CachePadded;

use crate::frame::FrameHeader;

/// Lock-free stack of available frames, linked through their headers and
/// reached via one atomically updated head pointer.
///
/// Every operation is a compare-and-swap retry loop; no operation ever holds
/// the head exclusively, so the list cannot deadlock and makes the standard
/// lock-free progress guarantee.
///
/// # Frame identity
///
/// A frame entering this list is never individually returned to a general
/// allocator and never repurposed as anything but the same slot: blocks are
/// only released in bulk when the pool is destroyed, after the list is
/// abandoned. A stale head pointer therefore always refers to a live
/// `FrameHeader`, so the hazard-pointer or epoch reclamation a
/// general-purpose Treiber stack needs does not apply here. Generalizing
/// this list to nodes with individual lifetimes would silently reintroduce
/// that hazard; keep it pool-internal.
#[derive(Debug)]
pub(crate) struct FreeList {
    head: CachePadded<AtomicPtr<FrameHeader>>,
}

impl FreeList {
    pub(crate) fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
        }
    }

    /// Pop one frame, or `None` if the list is observed empty.
    pub(crate) fn pop(&self) -> Option<NonNull<FrameHeader>> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let frame = NonNull::new(head)?;
            // SAFETY: frames outlive the list (see type docs), so a head
            // pointer read above is still dereferenceable even if another
            // thread already popped it.
            let next = unsafe { frame.as_ref() }.next.load(Ordering::Relaxed);
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::Acquire, Ordering::Acquire)
            {
                Ok(_) => return Some(frame),
                Err(current) => head = current,
            }
        }
    }

    /// Push one frame.
    pub(crate) fn push(&self, frame: NonNull<FrameHeader>) {
        unsafe { self.splice(frame, frame) }
    }

    /// Publish a pre-linked chain of frames in one step. `first` becomes the
    /// new head; `last` is spliced onto the previous head. With `first ==
    /// last` this is a plain push.
    ///
    /// # Safety
    ///
    /// The chain `first ..= last` must be linked through `next` pointers,
    /// owned by the caller, and not reachable from this list.
    pub(crate) unsafe fn splice(&self, first: NonNull<FrameHeader>, last: NonNull<FrameHeader>) {
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            unsafe { last.as_ref() }.next.store(head, Ordering::Relaxed);
            // Release publishes the chain links and the objects stored in
            // the frames to the next successful pop.
            match self
                .head
                .compare_exchange_weak(head, first.as_ptr(), Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(current) => head = current,
            }
        }
    }

}
