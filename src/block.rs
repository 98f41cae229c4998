use std::alloc::Layout;
use std::mem;
use std::ptr::NonNull;

use crate::Error;
use crate::alloc::BlockAllocator;
use crate::error::BoxError;
use crate::frame::{Frame, FrameHeader};

/// Header of one contiguous pool allocation: a link to the next block and
/// the number of frames laid out behind the header.
///
/// Blocks are owned exclusively by the pool and never freed individually;
/// the chain is walked once, at pool destruction, to destroy every object
/// and return every allocation.
#[repr(C)]
#[derive(Debug)]
pub(crate) struct BlockHeader {
    pub(crate) next: *mut BlockHeader,
    pub(crate) frame_count: usize,
}

/// Byte offset of the frame array inside a block.
fn frames_offset<T>() -> usize {
    mem::size_of::<BlockHeader>().next_multiple_of(mem::align_of::<Frame<T>>())
}

/// Layout of a block holding `frames` frames of `T`, rejecting counts whose
/// size computation would overflow.
fn block_layout<T>(frames: usize) -> Result<Layout, Error> {
    let overflow = || Error::CapacityOverflow { frames };
    let array = Layout::array::<Frame<T>>(frames).map_err(|_| overflow())?;
    let (layout, offset) = Layout::new::<BlockHeader>()
        .extend(array)
        .map_err(|_| overflow())?;
    debug_assert_eq!(offset, frames_offset::<T>());
    Ok(layout.pad_to_align())
}

/// Pointer to the frame array of a live block.
///
/// # Safety
///
/// `header` must point to a block allocated for frames of `T`.
unsafe fn frames_in<T>(header: NonNull<BlockHeader>) -> NonNull<Frame<T>> {
    unsafe { header.cast::<u8>().add(frames_offset::<T>()).cast() }
}

/// A freshly allocated, not yet published block.
///
/// Until [`into_header`](Block::into_header) commits it, the block belongs
/// to this value: dropping it returns the memory to the allocator, which is
/// the rollback path for a failed batch.
pub(crate) struct Block<'a, T> {
    header: NonNull<BlockHeader>,
    frames: NonNull<Frame<T>>,
    frame_count: usize,
    layout: Layout,
    allocator: &'a dyn BlockAllocator,
}

impl<'a, T> Block<'a, T> {
    /// Allocate a block sized for `frame_count` frames and initialize every
    /// frame header. Object storage stays uninitialized.
    pub(crate) fn allocate(
        frame_count: usize,
        allocator: &'a dyn BlockAllocator,
    ) -> Result<Self, Error> {
        debug_assert!(frame_count > 0);
        let layout = block_layout::<T>(frame_count)?;
        let ptr = allocator
            .allocate(layout)
            .ok_or(Error::AllocFailed { size: layout.size() })?;
        let header = ptr.cast::<BlockHeader>();
        unsafe {
            header.write(BlockHeader {
                next: std::ptr::null_mut(),
                frame_count,
            });
        }
        let frames = unsafe { frames_in::<T>(header) };
        for i in 0..frame_count {
            unsafe { Frame::init_header(frames.add(i)) };
        }
        Ok(Self {
            header,
            frames,
            frame_count,
            layout,
            allocator,
        })
    }

    /// Construct one object per frame via `creator`, all-or-nothing.
    ///
    /// On a creator failure at frame `k`, the `k` objects already built are
    /// destroyed in reverse construction order before the error is returned;
    /// the caller then drops the block, returning its memory. Panics in the
    /// creator unwind the same way.
    pub(crate) fn construct_all(
        &mut self,
        creator: &(dyn Fn() -> Result<T, BoxError> + Send + Sync),
    ) -> Result<(), Error> {
        let mut guard = RollbackGuard {
            block: self,
            constructed: 0,
        };
        for i in 0..guard.block.frame_count {
            let value = creator().map_err(Error::Construction)?;
            unsafe { Frame::object(guard.block.frame(i)).write(value) };
            guard.constructed = i + 1;
        }
        mem::forget(guard);
        Ok(())
    }

    /// Link the block's frames into one chain through their headers,
    /// returning `(first, last)` ready for a single free-list splice.
    pub(crate) fn link_frames(&self) -> (NonNull<FrameHeader>, NonNull<FrameHeader>) {
        for i in 0..self.frame_count - 1 {
            let next = Frame::header(self.frame(i + 1));
            unsafe { Frame::header(self.frame(i)).as_ref() }
                .next
                .store(next.as_ptr(), std::sync::atomic::Ordering::Relaxed);
        }
        (
            Frame::header(self.frame(0)),
            Frame::header(self.frame(self.frame_count - 1)),
        )
    }

    /// Commit the block: the caller takes over ownership of the allocation
    /// and the constructed objects.
    pub(crate) fn into_header(self) -> NonNull<BlockHeader> {
        let header = self.header;
        mem::forget(self);
        header
    }

    fn frame(&self, index: usize) -> NonNull<Frame<T>> {
        debug_assert!(index < self.frame_count);
        unsafe { self.frames.add(index) }
    }
}

impl<T> Drop for Block<'_, T> {
    fn drop(&mut self) {
        // Rollback path only: objects were already destroyed (or never
        // constructed) by the time an uncommitted block is dropped.
        unsafe { self.allocator.deallocate(self.header.cast(), self.layout) };
    }
}

/// Tracks how many frames of a batch hold live objects, destroying them in
/// reverse order if construction stops early.
struct RollbackGuard<'g, 'a, T> {
    block: &'g Block<'a, T>,
    constructed: usize,
}

impl<T> Drop for RollbackGuard<'_, '_, T> {
    fn drop(&mut self) {
        for i in (0..self.constructed).rev() {
            unsafe { Frame::object(self.block.frame(i)).drop_in_place() };
        }
    }
}

/// Destroy every object in a chain of committed blocks and return each
/// block to the allocator.
///
/// # Safety
///
/// `head` must be the head of a chain of blocks committed by
/// [`Block::into_header`] for frames of `T`, every frame must hold a live
/// object, and the chain must not be used afterwards.
pub(crate) unsafe fn destroy_chain<T>(head: *mut BlockHeader, allocator: &dyn BlockAllocator) {
    let mut cursor = head;
    while let Some(header) = NonNull::new(cursor) {
        let frame_count = unsafe { header.as_ref().frame_count };
        cursor = unsafe { header.as_ref().next };
        let frames = unsafe { frames_in::<T>(header) };
        for i in 0..frame_count {
            unsafe { Frame::object(frames.add(i)).drop_in_place() };
        }
        let layout = block_layout::<T>(frame_count)
            .expect("layout was validated when the block was allocated");
        unsafe { allocator.deallocate(header.cast(), layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::GlobalBlockAllocator;

    #[test]
    fn layout_rejects_overflowing_counts() {
        let frames = usize::MAX / mem::size_of::<Frame<u64>>() + 1;
        assert!(matches!(
            block_layout::<u64>(frames),
            Err(Error::CapacityOverflow { .. })
        ));
    }

    #[test]
    fn failed_batch_destroys_partial_objects() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static LIVE: AtomicUsize = AtomicUsize::new(0);

        struct Counted;
        impl Counted {
            fn new() -> Self {
                LIVE.fetch_add(1, Ordering::Relaxed);
                Counted
            }
        }
        impl Drop for Counted {
            fn drop(&mut self) {
                LIVE.fetch_sub(1, Ordering::Relaxed);
            }
        }

        let allocator = GlobalBlockAllocator;
        let mut block = Block::<Counted>::allocate(5, &allocator).unwrap();
        let built = AtomicUsize::new(0);
        let creator = move || -> Result<Counted, BoxError> {
            if built.fetch_add(1, Ordering::Relaxed) == 3 {
                return Err("third object refused".into());
            }
            Ok(Counted::new())
        };
        let err = block.construct_all(&creator).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
        assert_eq!(LIVE.load(Ordering::Relaxed), 0);
    }
}
