// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! User Address Spaces
//!
//! The thread core does not manage page tables itself. The kernel
//! registers one [`AddressSpace`] implementation at boot; the scheduler
//! calls it whenever a thread is switched in and when a user program's
//! thread is reclaimed.

use spin::Once;

use crate::kernel::thread::ThreadRef;
use crate::log_debug;

/// Page table management seen from the scheduler
pub trait AddressSpace: Sync {
    /// Make `thread`'s mappings current
    ///
    /// Called with interrupts off for every thread that is switched in,
    /// including kernel threads (page directory 0), which need the
    /// kernel-only mappings.
    fn activate(&self, thread: ThreadRef);

    /// Tear down the page directory of a reclaimed user program thread
    ///
    /// Called with interrupts off. The thread is not running.
    fn destroy(&self, thread: ThreadRef);
}

static ADDRESS_SPACE: Once<&'static dyn AddressSpace> = Once::new();

/// Install the address space implementation
///
/// Only the first registration takes effect.
pub fn register(space: &'static dyn AddressSpace) {
    ADDRESS_SPACE.call_once(|| space);
}

pub(crate) fn activate(thread: ThreadRef) {
    if let Some(space) = ADDRESS_SPACE.get() {
        space.activate(thread);
    }
}

pub(crate) fn destroy(thread: ThreadRef) {
    if thread.pagedir() == 0 {
        return;
    }

    if let Some(space) = ADDRESS_SPACE.get() {
        log_debug!("destroy address space {:#x} of thread {}", thread.pagedir(), thread.tid());
        space.destroy(thread);
    }
    thread.set_pagedir(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tests::{setup, wait_until};
    use crate::kernel::thread::{thread_create, thread_tid, PRI_DEFAULT};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::vec::Vec;

    struct Recorder {
        activated: Mutex<Vec<u64>>,
    }

    impl AddressSpace for Recorder {
        fn activate(&self, thread: ThreadRef) {
            self.activated.lock().unwrap().push(thread.tid());
        }

        fn destroy(&self, _thread: ThreadRef) {}
    }

    static RECORDER: Recorder = Recorder {
        activated: Mutex::new(Vec::new()),
    };

    static WORKER_TID: AtomicU64 = AtomicU64::new(0);

    fn worker(_aux: usize) {
        WORKER_TID.store(thread_tid(), Ordering::SeqCst);
    }

    #[test]
    fn test_activate_on_switch_in() {
        let _guard = setup();
        register(&RECORDER);

        let tid = thread_create("as-worker", PRI_DEFAULT, worker, 0).unwrap();
        wait_until(|| WORKER_TID.load(Ordering::SeqCst) == tid);

        assert!(RECORDER.activated.lock().unwrap().contains(&tid));
    }
}
