// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rustux Thread Core - Kernel Module
//!
//! This module contains the thread scheduling core: thread descriptors,
//! the scheduler, the sleep queue and the architecture backend that
//! switches between thread stacks.

// Re-export commonly used types
pub use crate::rustux::types::*;

// User program address spaces
#[cfg(feature = "userprog")]
pub mod addrspace;

// Architecture module
pub mod arch;

pub mod cmdline;
pub mod debug;
pub mod interrupt;
pub mod lib;
pub mod pmm;
pub mod sched;
pub mod sync;
pub mod thread;
pub mod timer;

#[cfg(test)]
mod tests;

use crate::kernel::cmdline::Cmdline;
use crate::kernel::sched::SchedConfig;
use crate::log_info;

/// Bring up the thread core from the boot command line
///
/// Called once from `kmain()` with interrupts off. Afterwards the boot
/// flow is the initial thread; call [`thread::thread_start`] once the
/// timer interrupt is wired to [`timer::timer_isr`].
pub fn init(cmdline: &str) {
    let cmdline = Cmdline::new(cmdline);
    let config = SchedConfig::from_cmdline(&cmdline);

    log_info!("kernel: {} boot options", cmdline.count());
    thread::thread_init_with(config);
}
