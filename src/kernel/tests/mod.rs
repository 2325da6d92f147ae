// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rustux Thread Core Test Suite
//!
//! Scenario tests that boot the thread core on the hosted platform and
//! switch between real thread stacks.
//!
//! # Organization
//!
//! - [`sched_tests`] - Ready queue order, time slicing, fatal checks
//! - [`sleep_tests`] - Sleep queue order and wake ticks
//! - [`thread_tests`] - Creation, identity and reclamation
//!
//! # Rules
//!
//! The core is a process-wide singleton, so every scenario test holds
//! the lock returned by [`setup`]. The test harness thread becomes the
//! initial thread. Threads created by a test only record what they see
//! into statics; assertions run on the initial thread, which waits for
//! them with [`wait_until`]. Time advances only while the idle thread
//! halts, one tick per halt.

mod sched_tests;

use std::sync::{Mutex, MutexGuard, Once};

use crate::kernel::arch::hosted;
use crate::kernel::interrupt::{self, intr_disable};
use crate::kernel::thread::{thread_init, thread_start};
use crate::kernel::timer::timer_sleep;

static TEST_LOCK: Mutex<()> = Mutex::new(());
static BOOT: Once = Once::new();

/// Serialize on the thread core and bring it up on first use
///
/// Returns with interrupts enabled, outside interrupt context, and the
/// initial thread running.
pub(crate) fn setup() -> MutexGuard<'static, ()> {
    // A fatal-check test panics while holding the lock.
    let guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    interrupt::reset_context();
    BOOT.call_once(|| {
        intr_disable();
        thread_init();
        thread_start();
    });
    hosted::reset();

    guard
}

/// Sleep one tick at a time until `done` holds
pub(crate) fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if done() {
            return;
        }
        timer_sleep(1);
    }
    panic!("condition still false after 10000 ticks");
}
