// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rustux Threads - Kernel Thread Scheduling Core
//!
//! This crate is the preemptible thread core of the Rustux kernel:
//! thread descriptors, the ready and sleep queues, and the switch
//! protocol that moves the CPU between kernel threads.
//!
//! The kernel image links this crate and provides the panic handler,
//! the global allocator and the timer interrupt vector. With the
//! `hosted` feature (and under `cargo test`) the core runs inside an
//! ordinary process with simulated interrupts.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustux_threads::kernel::{interrupt, thread, timer};
//!
//! interrupt::intr_disable();
//! thread::thread_init();
//! thread::thread_start();
//!
//! thread::thread_create("worker", thread::PRI_DEFAULT, worker, 0)?;
//! timer::timer_sleep(10);
//! ```

#![cfg_attr(not(any(test, feature = "hosted")), no_std)]

extern crate alloc;

#[cfg(not(target_arch = "x86_64"))]
compile_error!("rustux-threads only has an x86-64 context switch backend");

// Common types
pub mod rustux;

// Kernel modules
pub mod kernel;
