// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! AMD64 thread frame builder
//!
//! A thread that has never run is made to look as if it had been
//! suspended inside [`switch_threads`]. From the top of its block
//! downward the builder pushes:
//!
//! ```text
//!   top ->  +--------------------------+
//!           | aux                      |  KernelThreadFrame
//!           | function                 |  (or InterruptFrame for a
//!           | 0 (fake return address)  |   user program)
//!           +--------------------------+
//!           | kernel_thread_entry      |  SwitchEntryFrame
//!           +--------------------------+
//!           | switch_entry             |  SwitchThreadsFrame
//!           | rbx rbp r12 r13 r14 r15  |
//!   sp  ->  +--------------------------+
//! ```
//!
//! Resuming it pops six zeroed registers and returns into
//! [`switch_entry`], which finishes the switch and returns into the
//! entry trampoline.

use core::ptr;

use super::asm::{intr_exit, kernel_thread_entry, read_rsp, switch_entry, switch_threads};
use super::registers::selectors::{SEL_UCSEG, SEL_UDSEG};
use super::registers::USER_RFLAGS;
use super::Amd64;
use crate::kernel::arch::arch_traits::{ArchThreadContext, UserEntry};
use crate::kernel::thread::{Thread, ThreadFunc, ThreadRef};
use crate::rustux::types::*;

/// Registers saved by `switch_threads`, lowest address first
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SwitchThreadsFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub rbp: u64,
    pub rbx: u64,

    /// Return address
    pub rip: VAddr,
}

/// Return address `switch_entry` returns into
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SwitchEntryFrame {
    pub rip: VAddr,
}

/// Call frame for `kernel_thread`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KernelThreadFrame {
    /// Fake return address, always zero
    pub rip: VAddr,

    /// Function to call
    pub function: ThreadFunc,

    /// Auxiliary data for function
    pub aux: usize,
}

/// Hardware frame consumed by `iretq`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub rip: VAddr,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: VAddr,
    pub ss: u64,
}

/// Push the frames every fresh thread needs below `entry_rip`
unsafe fn push_switch_frames(thread: ThreadRef, entry_rip: VAddr) {
    let ef = thread.alloc_frame::<SwitchEntryFrame>();
    ptr::write(ef, SwitchEntryFrame { rip: entry_rip });

    let sf = thread.alloc_frame::<SwitchThreadsFrame>();
    ptr::write(
        sf,
        SwitchThreadsFrame {
            rip: switch_entry as VAddr,
            ..SwitchThreadsFrame::default()
        },
    );
}

impl ArchThreadContext for Amd64 {
    unsafe fn prepare_kernel_entry(thread: ThreadRef, entry: ThreadFunc, aux: usize) {
        let kf = thread.alloc_frame::<KernelThreadFrame>();
        ptr::write(
            kf,
            KernelThreadFrame {
                rip: 0,
                function: entry,
                aux,
            },
        );

        push_switch_frames(thread, kernel_thread_entry as VAddr);
    }

    unsafe fn prepare_user_entry(thread: ThreadRef, entry: UserEntry) {
        let if_ = thread.alloc_frame::<InterruptFrame>();
        ptr::write(
            if_,
            InterruptFrame {
                rip: entry.start,
                cs: SEL_UCSEG as u64,
                rflags: USER_RFLAGS.bits(),
                rsp: entry.stack_top,
                ss: SEL_UDSEG as u64,
            },
        );

        push_switch_frames(thread, intr_exit as VAddr);
    }

    #[inline]
    unsafe fn switch_threads(cur: *mut Thread, next: *mut Thread) -> *mut Thread {
        switch_threads(cur, next)
    }

    #[inline(always)]
    fn stack_pointer() -> VAddr {
        read_rsp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::arch::arch_traits::ARCH_WORD_SIZE;
    use crate::kernel::pmm::THREAD_BLOCK_LAYOUT;
    use crate::kernel::thread::PRI_DEFAULT;
    use core::mem::size_of;

    fn noop(_aux: usize) {}

    /// Initialize a descriptor at the base of a block that bypasses the
    /// block accounting
    fn fresh_thread() -> ThreadRef {
        let block = unsafe { std::alloc::alloc_zeroed(THREAD_BLOCK_LAYOUT) };
        assert!(!block.is_null());
        unsafe { ThreadRef::init_in_block(block, "frames", PRI_DEFAULT) }
    }

    fn release(t: ThreadRef) {
        unsafe { std::alloc::dealloc(t.as_ptr().cast(), THREAD_BLOCK_LAYOUT) };
    }

    fn word_at(addr: VAddr) -> usize {
        unsafe { *(addr as *const usize) }
    }

    #[test]
    fn test_frame_sizes_are_word_multiples() {
        assert_eq!(size_of::<SwitchThreadsFrame>() % ARCH_WORD_SIZE, 0);
        assert_eq!(size_of::<SwitchEntryFrame>() % ARCH_WORD_SIZE, 0);
        assert_eq!(size_of::<KernelThreadFrame>() % ARCH_WORD_SIZE, 0);
        assert_eq!(size_of::<InterruptFrame>() % ARCH_WORD_SIZE, 0);
        assert_eq!(size_of::<SwitchThreadsFrame>(), 7 * ARCH_WORD_SIZE);
    }

    #[test]
    fn test_kernel_entry_layout() {
        let t = fresh_thread();
        let top = t.stack_pointer();

        unsafe { Amd64::prepare_kernel_entry(t, noop, 0xfeed) };

        let sp = t.stack_pointer();
        assert_eq!(top - sp, 11 * ARCH_WORD_SIZE);

        // Six zeroed callee-saved registers, then switch_entry
        for i in 0..6 {
            assert_eq!(word_at(sp + i * ARCH_WORD_SIZE), 0);
        }
        assert_eq!(word_at(sp + 6 * ARCH_WORD_SIZE), switch_entry as usize);
        assert_eq!(word_at(sp + 7 * ARCH_WORD_SIZE), kernel_thread_entry as usize);

        // Kernel thread frame: fake return address, function, aux
        assert_eq!(word_at(top - 3 * ARCH_WORD_SIZE), 0);
        assert_eq!(word_at(top - 2 * ARCH_WORD_SIZE), noop as ThreadFunc as usize);
        assert_eq!(word_at(top - ARCH_WORD_SIZE), 0xfeed);

        // switch_entry runs with a 16-byte aligned stack
        assert_eq!((sp + 7 * ARCH_WORD_SIZE) % 16, 0);
        release(t);
    }

    #[test]
    fn test_user_entry_layout() {
        let t = fresh_thread();
        let top = t.stack_pointer();
        let entry = UserEntry {
            start: 0x0804_8000,
            stack_top: 0xc000_0000,
        };

        unsafe { Amd64::prepare_user_entry(t, entry) };

        let sp = t.stack_pointer();
        assert_eq!(top - sp, 13 * ARCH_WORD_SIZE);
        assert_eq!(word_at(sp + 6 * ARCH_WORD_SIZE), switch_entry as usize);
        assert_eq!(word_at(sp + 7 * ARCH_WORD_SIZE), intr_exit as usize);

        let frame = unsafe { &*((sp + 8 * ARCH_WORD_SIZE) as *const InterruptFrame) };
        assert_eq!(frame.rip, 0x0804_8000);
        assert_eq!(frame.cs, SEL_UCSEG as u64);
        assert_eq!(frame.rflags, 0x202);
        assert_eq!(frame.rsp, 0xc000_0000);
        assert_eq!(frame.ss, SEL_UDSEG as u64);
        release(t);
    }
}
