// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Timer Management
//!
//! This module keeps the kernel tick count and lets threads sleep for a
//! number of ticks.
//!
//! # Design
//!
//! - **Tick counter**: incremented once per timer interrupt
//! - **Sorted sleep queue**: ascending by wake tick, stable for equal
//!   ticks, so the interrupt handler only looks at entries that are due
//! - **Stack-resident entries**: a sleeper's queue entry lives in its own
//!   stack frame, which stays untouched until the handler unlinks it
//!
//! # Usage
//!
//! ```rust,ignore
//! let start = timer_ticks();
//! timer_sleep(TIMER_FREQ); // about one second
//! assert!(timer_elapsed(start) >= TIMER_FREQ);
//! ```

use core::ptr::NonNull;
use core::sync::atomic::{AtomicI64, Ordering};

use crate::kernel::interrupt::{
    enter_external, intr_context, intr_disable, intr_get_level, intr_set_level, leave_external,
    IntrLevel,
};
use crate::kernel::lib::list::{list_entry, List, ListElem};
use crate::kernel::sync::IrqCell;
use crate::kernel::thread::{
    thread_block, thread_current, thread_tick, thread_unblock, thread_yield, ThreadRef,
};
use crate::rustux::types::*;
use crate::{kassert, log_trace};

/// Timer interrupts per second
pub const TIMER_FREQ: Ticks = 100;

const _: () = assert!(TIMER_FREQ >= 19 && TIMER_FREQ <= 1000, "timer frequency out of range");

/// Ticks since boot
static TICKS: AtomicI64 = AtomicI64::new(0);

/// A sleeping thread, linked into [`SLEEPERS`] from its own stack
struct SleepEntry {
    elem: ListElem,
    thread: ThreadRef,
    wake_tick: Ticks,
}

/// Sleep queue, sorted by ascending wake tick
static SLEEPERS: IrqCell<List> = IrqCell::new(List::new(), "sleep queue");

/// Returns the number of ticks since boot
pub fn timer_ticks() -> Ticks {
    TICKS.load(Ordering::Acquire)
}

/// Returns the ticks elapsed since `then`, a value of [`timer_ticks`]
pub fn timer_elapsed(then: Ticks) -> Ticks {
    timer_ticks() - then
}

fn wakes_before(a: NonNull<ListElem>, b: NonNull<ListElem>) -> bool {
    // SAFETY: only sleep entries are linked into the sleep queue.
    let (a, b) = unsafe {
        (
            (*list_entry!(a, SleepEntry, elem)).wake_tick,
            (*list_entry!(b, SleepEntry, elem)).wake_tick,
        )
    };
    a < b
}

/// Sleep for at least `ticks` timer ticks
///
/// Returns at once if `ticks` is zero or negative. Otherwise the thread
/// blocks and becomes ready again on the first tick at or after
/// `timer_ticks() + ticks`. A deadline past [`Ticks::MAX`] is clamped
/// to it.
pub fn timer_sleep(ticks: Ticks) {
    if ticks <= 0 {
        return;
    }
    kassert!(!intr_context(), "timer_sleep called from an interrupt handler");

    let old_level = intr_disable();

    let mut entry = SleepEntry {
        elem: ListElem::new(),
        thread: thread_current(),
        wake_tick: timer_ticks().saturating_add(ticks),
    };
    log_trace!("thread {} sleeps until tick {}", entry.thread.tid(), entry.wake_tick);

    // SAFETY: the entry stays in this frame until the timer interrupt
    // unlinks it, and this thread cannot return before that happens.
    let elem = NonNull::from(&mut entry.elem);
    SLEEPERS.with(|queue| unsafe { queue.insert_ordered(elem, wakes_before) });
    thread_block();

    kassert!(!entry.elem.is_linked(), "thread {} woke while still queued", entry.thread.tid());
    intr_set_level(old_level);
}

/// Timer tick handler
///
/// Advances the tick count, readies every sleeper that is due and
/// charges the tick to the running thread.
///
/// Must run inside an external interrupt handler with interrupts off,
/// as [`timer_isr`] arranges: an expired time slice requests a yield on
/// handler return.
pub(crate) fn timer_interrupt() {
    kassert!(intr_get_level() == IntrLevel::Off);
    kassert!(intr_context(), "timer_interrupt called outside an interrupt handler");

    let now = TICKS.fetch_add(1, Ordering::AcqRel) + 1;

    SLEEPERS.with(|queue| {
        while let Some(head) = queue.front() {
            let entry = list_entry!(head, SleepEntry, elem);

            // SAFETY: a queued entry's thread is blocked, so its frame is
            // intact.
            let (thread, wake_tick) = unsafe { ((*entry).thread, (*entry).wake_tick) };
            if wake_tick > now {
                break;
            }

            queue.pop_front();
            thread_unblock(thread);
        }
    });

    thread_tick();
}

/// Entry point for the timer interrupt vector
///
/// Runs [`timer_interrupt`] in interrupt context, then yields if the
/// running thread's time slice ran out.
pub fn timer_isr() {
    enter_external();
    timer_interrupt();

    if leave_external() {
        thread_yield();
    }
}

/// Sleep queue contents as `(tid, wake tick)`, head first
#[cfg(test)]
pub(crate) fn sleep_queue() -> std::vec::Vec<(Tid, Ticks)> {
    SLEEPERS.with(|queue| {
        queue
            .iter()
            .map(|e| {
                let entry = list_entry!(e, SleepEntry, elem);
                unsafe { ((*entry).thread.tid(), (*entry).wake_tick) }
            })
            .collect()
    })
}


/// Take a sleeper off the queue before its deadline and ready it
#[cfg(test)]
pub(crate) fn cancel_sleep(tid: Tid) {
    let thread = SLEEPERS.with(|queue| {
        let elem = queue.iter().find(|&e| {
            // SAFETY: only sleep entries are linked into the sleep queue.
            unsafe { (*list_entry!(e, SleepEntry, elem)).thread.tid() == tid }
        })?;
        // SAFETY: the entry is queued, so its sleeper's frame is intact.
        unsafe {
            let thread = (*list_entry!(elem, SleepEntry, elem)).thread;
            queue.remove(elem);
            Some(thread)
        }
    });

    if let Some(thread) = thread {
        thread_unblock(thread);
    }
}
