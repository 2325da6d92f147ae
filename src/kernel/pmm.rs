// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread Block Allocator
//!
//! Every thread owns one zeroed block aligned to its own size: the
//! descriptor sits at the low address and the stack grows down from
//! the top. Blocks come from the kernel heap through the global
//! allocator; this module adds the alignment, the accounting and an
//! optional cap on live blocks.
//!
//! # Usage
//!
//! ```rust,ignore
//! let block = alloc_thread_block()?;
//! // ... later, once the thread is gone ...
//! unsafe { free_thread_block(block) };
//! ```

use alloc::alloc::{alloc_zeroed, dealloc, Layout};
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::kernel::arch::arch_traits::ARCH_PAGE_SIZE;
use crate::rustux::types::*;

/// Page size in bytes
pub const PAGE_SIZE: usize = ARCH_PAGE_SIZE;

/// Pages per thread block
#[cfg(not(any(test, feature = "hosted")))]
pub const THREAD_BLOCK_PAGES: usize = 4;

/// Pages per thread block; host code runs deeper call chains
#[cfg(any(test, feature = "hosted"))]
pub const THREAD_BLOCK_PAGES: usize = 16;

/// Thread block size in bytes
pub const THREAD_BLOCK_SIZE: usize = PAGE_SIZE * THREAD_BLOCK_PAGES;

/// Layout of one thread block
pub const THREAD_BLOCK_LAYOUT: Layout =
    match Layout::from_size_align(THREAD_BLOCK_SIZE, THREAD_BLOCK_SIZE) {
        Ok(layout) => layout,
        Err(_) => panic!("thread block size must be a power of two"),
    };

/// Blocks currently handed out
static LIVE_BLOCKS: AtomicUsize = AtomicUsize::new(0);

/// Maximum live blocks, 0 = unlimited
static BLOCK_LIMIT: AtomicUsize = AtomicUsize::new(0);

/// Allocate a zeroed thread block
///
/// # Returns
///
/// - `Ok(block)` aligned to [`THREAD_BLOCK_SIZE`]
/// - `Err(ERR_NO_MEMORY)` if the heap or the block limit is exhausted
pub fn alloc_thread_block() -> Result<NonNull<u8>> {
    let limit = BLOCK_LIMIT.load(Ordering::Relaxed);
    LIVE_BLOCKS
        .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |live| {
            (limit == 0 || live < limit).then_some(live + 1)
        })
        .map_err(|_| status::ERR_NO_MEMORY)?;

    // SAFETY: the layout has a non-zero size.
    let block = unsafe { alloc_zeroed(THREAD_BLOCK_LAYOUT) };
    NonNull::new(block).ok_or_else(|| {
        LIVE_BLOCKS.fetch_sub(1, Ordering::AcqRel);
        status::ERR_NO_MEMORY
    })
}

/// Return a thread block to the heap
///
/// # Safety
///
/// `block` must come from [`alloc_thread_block`] and no longer be used
/// by anything, including as the active stack.
pub unsafe fn free_thread_block(block: NonNull<u8>) {
    dealloc(block.as_ptr(), THREAD_BLOCK_LAYOUT);
    LIVE_BLOCKS.fetch_sub(1, Ordering::AcqRel);
}

/// Number of blocks currently allocated
pub fn live_thread_blocks() -> usize {
    LIVE_BLOCKS.load(Ordering::Acquire)
}

/// Cap the number of live blocks (0 removes the cap)
pub fn set_thread_block_limit(limit: usize) {
    BLOCK_LIMIT.store(limit, Ordering::Relaxed);
}
