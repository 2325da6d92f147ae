// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Primitives
//!
//! The thread core sits below every sleeping lock, so its own state is
//! protected only by running with interrupts disabled on the single CPU.
//! [`IrqCell`] makes that rule checkable. The TID counter uses
//! `spin::Mutex` directly.

pub mod irq;

// Re-exports
pub use irq::IrqCell;
