// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! AMD64 context switch and thread entry trampolines
//!
//! The layouts written by `thread.rs` for never-run threads must match
//! exactly what [`switch_threads`] pushes when it suspends a running
//! thread.

use core::arch::naked_asm;

use super::registers::selectors::SEL_UDSEG;
use crate::kernel::sched::schedule_tail;
use crate::kernel::thread::{kernel_thread, Thread, THREAD_STACK_OFFSET};

/// Switch from thread `cur` to thread `next`
///
/// Pushes the callee-saved registers on `cur`'s stack, stores the stack
/// pointer in `cur`, loads `next`'s saved stack pointer and pops its
/// registers. Returns `cur` in `rax`: on the resumed side this is the
/// thread that was running just before.
///
/// # Safety
///
/// Interrupts must be off and both descriptors valid. `next` must have
/// been suspended by this function or prepared by the frame builder.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_threads(cur: *mut Thread, next: *mut Thread) -> *mut Thread {
    naked_asm!(
        // Save callee-saved registers
        "push rbx",
        "push rbp",
        "push r12",
        "push r13",
        "push r14",
        "push r15",

        // Save old stack pointer and load new one
        "mov [rdi + {stack}], rsp",
        "mov rsp, [rsi + {stack}]",

        // Restore callee-saved registers from new stack
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbp",
        "pop rbx",

        "mov rax, rdi",
        "ret",
        stack = const THREAD_STACK_OFFSET,
    );
}

/// First code a fresh thread runs after [`switch_threads`]
///
/// Finishes the switch with `schedule_tail(prev)` and then returns into
/// whatever entry frame the builder placed above.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_entry() -> ! {
    naked_asm!(
        "mov rdi, rax",
        "call {tail}",
        "ret",
        tail = sym schedule_tail,
    );
}

/// Trampoline into `kernel_thread(function, aux)`
///
/// Entered by `ret` with `rsp` at the kernel thread frame: a null fake
/// return address followed by the function and its argument.
#[unsafe(naked)]
pub unsafe extern "C" fn kernel_thread_entry() -> ! {
    naked_asm!(
        "mov rdi, [rsp + 8]",
        "mov rsi, [rsp + 16]",
        "and rsp, -16",
        "xor ebp, ebp",
        "call {kernel_thread}",
        "ud2",
        kernel_thread = sym kernel_thread,
    );
}

/// Return to user mode through the interrupt frame at `rsp`
#[unsafe(naked)]
pub unsafe extern "C" fn intr_exit() -> ! {
    naked_asm!(
        "mov ax, {udseg}",
        "mov ds, ax",
        "mov es, ax",
        "xor eax, eax",
        "xor ebx, ebx",
        "xor ecx, ecx",
        "xor edx, edx",
        "xor esi, esi",
        "xor edi, edi",
        "xor ebp, ebp",
        "xor r8d, r8d",
        "xor r9d, r9d",
        "xor r10d, r10d",
        "xor r11d, r11d",
        "iretq",
        udseg = const SEL_UDSEG,
    );
}

/// Read the stack pointer register
#[inline(always)]
pub fn read_rsp() -> usize {
    let rsp: usize;
    // SAFETY: reads a register, no memory access.
    unsafe {
        core::arch::asm!("mov {}, rsp", out(reg) rsp, options(nomem, nostack, preserves_flags));
    }
    rsp
}
