// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt Control
//!
//! Saves and restores the CPU interrupt flag and tracks whether the CPU
//! is executing an external interrupt handler. The thread core uses
//! the flag as its only mutual exclusion mechanism.
//!
//! # Usage
//!
//! ```rust,ignore
//! let old_level = intr_disable();
//! // ... touch scheduler state ...
//! intr_set_level(old_level);
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use crate::kernel::arch::arch_traits::ArchInterrupts;
use crate::kernel::arch::Platform;
use crate::kassert;

/// Interrupt flag state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrLevel {
    /// Interrupts disabled
    Off,

    /// Interrupts enabled
    On,
}

/// Set while an external interrupt handler runs
static IN_EXTERNAL_INTR: AtomicBool = AtomicBool::new(false);

/// Set by a handler that wants the interrupted thread to yield
static YIELD_ON_RETURN: AtomicBool = AtomicBool::new(false);

/// Returns the current interrupt level
pub fn intr_get_level() -> IntrLevel {
    if Platform::interrupts_enabled() {
        IntrLevel::On
    } else {
        IntrLevel::Off
    }
}

/// Enables or disables interrupts as given by `level` and returns the
/// previous level
pub fn intr_set_level(level: IntrLevel) -> IntrLevel {
    match level {
        IntrLevel::On => intr_enable(),
        IntrLevel::Off => intr_disable(),
    }
}

/// Enables interrupts and returns the previous level
pub fn intr_enable() -> IntrLevel {
    let old_level = intr_get_level();
    kassert!(!intr_context(), "interrupts enabled inside an interrupt handler");

    Platform::enable_interrupts();
    old_level
}

/// Disables interrupts and returns the previous level
pub fn intr_disable() -> IntrLevel {
    let old_level = intr_get_level();
    Platform::disable_interrupts();
    old_level
}

/// Returns true while an external interrupt is being processed
pub fn intr_context() -> bool {
    IN_EXTERNAL_INTR.load(Ordering::Relaxed)
}

/// Asks for the interrupted thread to yield once the current handler
/// returns
///
/// May only be called from an external interrupt handler.
pub fn intr_yield_on_return() {
    kassert!(intr_context(), "yield-on-return requested outside an interrupt handler");
    YIELD_ON_RETURN.store(true, Ordering::Relaxed);
}

/// Marks the start of an external interrupt handler
///
/// The CPU enters handlers with interrupts disabled.
pub(crate) fn enter_external() {
    kassert!(intr_get_level() == IntrLevel::Off);
    kassert!(!intr_context(), "nested external interrupt");

    IN_EXTERNAL_INTR.store(true, Ordering::Relaxed);
    YIELD_ON_RETURN.store(false, Ordering::Relaxed);
}

/// Marks the end of an external interrupt handler
///
/// Returns true if the handler asked for a yield on return.
pub(crate) fn leave_external() -> bool {
    kassert!(intr_context());

    IN_EXTERNAL_INTR.store(false, Ordering::Relaxed);
    YIELD_ON_RETURN.swap(false, Ordering::Relaxed)
}

/// Forgets any handler state left behind by an aborted test
#[cfg(test)]
pub(crate) fn reset_context() {
    IN_EXTERNAL_INTR.store(false, Ordering::Relaxed);
    YIELD_ON_RETURN.store(false, Ordering::Relaxed);
}
