// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt-Protected Cell
//!
//! A cell for uniprocessor kernel state that is only ever touched with
//! interrupts disabled. Disabling interrupts is the lock: nothing else
//! can run on the CPU until they are enabled again.

use core::cell::{Cell, UnsafeCell};

use crate::kernel::interrupt::{intr_get_level, IntrLevel};
use crate::kassert;

/// Kernel state accessible only with interrupts off
pub struct IrqCell<T> {
    data: UnsafeCell<T>,

    /// Set while a closure holds the mutable borrow
    borrowed: Cell<bool>,

    /// Debug name used in diagnostics
    name: &'static str,
}

// Access is serialized by the interrupt flag on a single CPU.
unsafe impl<T: Send> Sync for IrqCell<T> {}
unsafe impl<T: Send> Send for IrqCell<T> {}

impl<T> IrqCell<T> {
    /// Create a new cell
    pub const fn new(data: T, name: &'static str) -> Self {
        Self {
            data: UnsafeCell::new(data),
            borrowed: Cell::new(false),
            name,
        }
    }

    /// Run `f` with exclusive access to the protected state
    ///
    /// Interrupts must already be disabled. `f` must not call back into
    /// code that accesses the same cell, and must not switch threads.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        kassert!(
            intr_get_level() == IntrLevel::Off,
            "{} accessed with interrupts enabled",
            self.name
        );
        kassert!(!self.borrowed.get(), "{} accessed reentrantly", self.name);

        self.borrowed.set(true);
        let _release = BorrowRelease(&self.borrowed);

        // SAFETY: interrupts are off and the borrow flag rules out a
        // nested access, so this is the only reference to the data.
        f(unsafe { &mut *self.data.get() })
    }
}

/// Clears the borrow flag even if the closure panics
struct BorrowRelease<'a>(&'a Cell<bool>);

impl Drop for BorrowRelease<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
