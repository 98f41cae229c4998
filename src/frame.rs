use std::mem::{MaybeUninit, offset_of};
use std::ptr::NonNull;
use std::sync::atomic::AtomicPtr;
#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicBool, Ordering};

/// Header of a [`Frame`]: the intrusive free-list link plus, in debug
/// builds, a lent flag that catches double release through the raw
/// create/destroy interface.
///
/// The header is the first field of a `repr(C)` frame, so a header pointer
/// and its frame pointer are interchangeable by cast.
#[derive(Debug)]
pub(crate) struct FrameHeader {
    /// Next frame in the free list. Meaningful only while the frame is
    /// linked into the list; stale while the frame is lent out.
    pub(crate) next: AtomicPtr<FrameHeader>,
    #[cfg(debug_assertions)]
    lent: AtomicBool,
}

impl FrameHeader {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicPtr::new(std::ptr::null_mut()),
            #[cfg(debug_assertions)]
            lent: AtomicBool::new(false),
        }
    }

    /// Record the transition free -> lent.
    #[inline]
    pub(crate) fn mark_lent(&self) {
        #[cfg(debug_assertions)]
        debug_assert!(
            !self.lent.swap(true, Ordering::Relaxed),
            "frame handed out while already lent"
        );
    }

    /// Record the transition lent -> free.
    #[inline]
    pub(crate) fn mark_free(&self) {
        #[cfg(debug_assertions)]
        debug_assert!(
            self.lent.swap(false, Ordering::Relaxed),
            "frame released twice or released while still in the free list"
        );
    }
}

/// One fixed-size storage unit inside a memory block: a header followed by
/// raw storage for exactly one pooled object.
///
/// Frames are only ever manipulated through raw pointers into their owning
/// block; the struct exists to let the compiler derive the stride and
/// alignment of the per-object storage.
#[repr(C)]
pub(crate) struct Frame<T> {
    header: FrameHeader,
    object: MaybeUninit<T>,
}

impl<T> Frame<T> {
    /// Initialize the header of an uninitialized frame. Leaves the object
    /// storage untouched.
    ///
    /// # Safety
    ///
    /// `frame` must point to writable storage for one `Frame<T>`.
    pub(crate) unsafe fn init_header(frame: NonNull<Frame<T>>) {
        unsafe { Self::header(frame).write(FrameHeader::new()) }
    }

    /// Pointer to the frame's header.
    #[inline]
    pub(crate) fn header(frame: NonNull<Frame<T>>) -> NonNull<FrameHeader> {
        // Header is the first field of a repr(C) struct.
        debug_assert_eq!(offset_of!(Frame<T>, header), 0);
        frame.cast()
    }

    /// Recover the frame from a header pointer taken off the free list.
    #[inline]
    pub(crate) fn from_header(header: NonNull<FrameHeader>) -> NonNull<Frame<T>> {
        header.cast()
    }

    /// Pointer to the frame's object storage.
    #[inline]
    pub(crate) fn object(frame: NonNull<Frame<T>>) -> NonNull<T> {
        let offset = offset_of!(Frame<T>, object);
        // SAFETY: `object` lives at `offset` bytes inside the frame.
        unsafe { frame.cast::<u8>().add(offset).cast() }
    }

    /// Recover the frame from a pointer to the object it stores.
    ///
    /// # Safety
    ///
    /// `object` must be a pointer previously obtained from
    /// [`Frame::object`].
    #[inline]
    pub(crate) unsafe fn from_object(object: NonNull<T>) -> NonNull<Frame<T>> {
        let offset = offset_of!(Frame<T>, object);
        unsafe { object.cast::<u8>().sub(offset).cast() }
    }
}
