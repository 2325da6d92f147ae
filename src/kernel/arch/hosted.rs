// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Hosted Interrupt Simulation
//!
//! Runs the thread core inside an ordinary process. The interrupt flag
//! is a plain boolean and the timer only "fires" when the idle thread
//! halts: each halt delivers exactly one tick through the regular timer
//! handler. Time therefore advances only while no thread is ready,
//! which keeps hosted runs deterministic.
//!
//! Context switches are real; they use the AMD64 backend on blocks
//! taken from the host allocator.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::kernel::arch::arch_traits::ArchInterrupts;
use crate::kernel::timer;

/// Hosted platform marker type
pub struct Hosted;

/// Simulated interrupt flag; the machine boots with interrupts off
static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(false);

impl ArchInterrupts for Hosted {
    fn interrupts_enabled() -> bool {
        INTERRUPTS_ENABLED.load(Ordering::SeqCst)
    }

    fn enable_interrupts() {
        INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);
    }

    fn disable_interrupts() {
        INTERRUPTS_ENABLED.store(false, Ordering::SeqCst);
    }

    fn wait_for_interrupt() {
        // Interrupt gate: the handler runs with interrupts off, and the
        // return restores them.
        INTERRUPTS_ENABLED.store(false, Ordering::SeqCst);
        timer::timer_isr();
        INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);
    }
}

/// Put the simulated CPU back into thread context with interrupts on
#[cfg(test)]
pub(crate) fn reset() {
    crate::kernel::interrupt::reset_context();
    INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);
}
