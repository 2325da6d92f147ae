// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Architecture Abstraction Layer (AAL)
//!
//! The thread core needs two things from the machine: control over the
//! interrupt flag, and a way to move the CPU from one thread's stack to
//! another's. Both sit behind the traits below so the scheduler itself
//! is architecture-agnostic.

use crate::kernel::thread::{Thread, ThreadFunc, ThreadRef};
use crate::rustux::types::*;

/// Page size (4KB)
pub const ARCH_PAGE_SIZE: usize = 4096;

/// Machine word size; every synthetic stack frame is a multiple of it
pub const ARCH_WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Interrupt flag control
pub trait ArchInterrupts {
    /// Returns true if the CPU accepts interrupts
    fn interrupts_enabled() -> bool;

    /// Sets the interrupt flag
    fn enable_interrupts();

    /// Clears the interrupt flag
    fn disable_interrupts();

    /// Atomically enables interrupts and waits for the next one
    ///
    /// Returns after that interrupt has been handled.
    fn wait_for_interrupt();
}

/// Where a user program starts executing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserEntry {
    /// User instruction pointer
    pub start: VAddr,

    /// Initial user stack pointer
    pub stack_top: VAddr,
}

/// Architecture thread context management
pub trait ArchThreadContext {
    /// Build the initial stack of a never-run kernel thread
    ///
    /// After this, switching to `thread` enters the kernel thread
    /// trampoline, which enables interrupts and calls `entry(aux)`.
    ///
    /// # Safety
    ///
    /// `thread` must be a freshly initialized, allocator-owned descriptor
    /// whose stack pointer is still at the top of its block.
    unsafe fn prepare_kernel_entry(thread: ThreadRef, entry: ThreadFunc, aux: usize);

    /// Build the initial stack of a never-run user program thread
    ///
    /// Switching to `thread` returns to user mode at `entry`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`ArchThreadContext::prepare_kernel_entry`].
    unsafe fn prepare_user_entry(thread: ThreadRef, entry: UserEntry);

    /// Suspend `cur` and resume `next`
    ///
    /// Returns, once `cur` is resumed later on, the thread that ran
    /// immediately before it.
    ///
    /// # Safety
    ///
    /// Interrupts must be off, both descriptors must be valid, and `cur`
    /// must be the thread executing this call.
    unsafe fn switch_threads(cur: *mut Thread, next: *mut Thread) -> *mut Thread;

    /// Current value of the stack pointer register
    fn stack_pointer() -> VAddr;
}
