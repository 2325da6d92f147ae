// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! AMD64 (x86-64) interrupt flag control
//!
//! Thin wrappers over `cli`/`sti`/`hlt` from the `x86_64` crate.

use x86_64::instructions::interrupts;

use super::Amd64;
use crate::kernel::arch::arch_traits::ArchInterrupts;

impl ArchInterrupts for Amd64 {
    #[inline]
    fn interrupts_enabled() -> bool {
        interrupts::are_enabled()
    }

    #[inline]
    fn enable_interrupts() {
        interrupts::enable();
    }

    #[inline]
    fn disable_interrupts() {
        interrupts::disable();
    }

    /// `sti; hlt` back to back, inside the `sti` interrupt shadow
    #[inline]
    fn wait_for_interrupt() {
        interrupts::enable_and_hlt();
    }
}
