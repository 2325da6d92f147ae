// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler Tests
//!
//! Ready queue ordering, round-robin yields, timer preemption and the
//! fatal checks guarding the lifecycle transitions.

use std::vec::Vec;

use super::{setup, wait_until};
use crate::kernel::interrupt::{self, intr_disable, intr_set_level};
use crate::kernel::pmm::{self, THREAD_BLOCK_LAYOUT};
use crate::kernel::sched::{self, DEFAULT_TIME_SLICE};
use crate::kernel::thread::*;
use crate::kernel::timer::{timer_isr, timer_sleep};
use crate::rustux::types::*;

// ============================================================================
// Ready Queue Order
// ============================================================================

static FIFO_ORDER: spin::Mutex<Vec<Tid>> = spin::Mutex::new(Vec::new());

fn record_fifo(_aux: usize) {
    FIFO_ORDER.lock().push(thread_tid());
}

#[test]
fn test_ready_queue_is_fifo() {
    let _guard = setup();

    let a = thread_create("A", PRI_DEFAULT, record_fifo, 0).unwrap();
    let b = thread_create("B", PRI_MAX, record_fifo, 0).unwrap();
    let c = thread_create("C", PRI_MIN, record_fifo, 0).unwrap();

    // Priorities do not reorder the queue
    let old_level = intr_disable();
    let ready = sched::ready_tids();
    intr_set_level(old_level);
    assert_eq!(ready, [a, b, c]);

    wait_until(|| FIFO_ORDER.lock().len() == 3);
    assert_eq!(*FIFO_ORDER.lock(), [a, b, c]);
}

static ROUND_ROBIN: spin::Mutex<Vec<(usize, usize)>> = spin::Mutex::new(Vec::new());

fn take_turns(aux: usize) {
    for turn in 0..3 {
        ROUND_ROBIN.lock().push((aux, turn));
        thread_yield();
    }
}

#[test]
fn test_yield_alternates_threads() {
    let _guard = setup();

    thread_create("turns-1", PRI_DEFAULT, take_turns, 1).unwrap();
    thread_create("turns-2", PRI_DEFAULT, take_turns, 2).unwrap();

    wait_until(|| ROUND_ROBIN.lock().len() == 6);
    assert_eq!(
        *ROUND_ROBIN.lock(),
        [(1, 0), (2, 0), (1, 1), (2, 1), (1, 2), (2, 2)]
    );
}

// ============================================================================
// Time Slicing
// ============================================================================

static SLICE_LOG: spin::Mutex<Vec<usize>> = spin::Mutex::new(Vec::new());

/// Take one timer interrupt as if the device had raised it
fn fake_timer_interrupt() {
    let old_level = intr_disable();
    timer_isr();
    intr_set_level(old_level);
}

fn busy_thread(_aux: usize) {
    for tick in 0..DEFAULT_TIME_SLICE as usize {
        SLICE_LOG.lock().push(tick);
        fake_timer_interrupt();
    }
    SLICE_LOG.lock().push(200);
}

fn waiting_thread(_aux: usize) {
    SLICE_LOG.lock().push(100);
}

#[test]
fn test_time_slice_expiry_preempts() {
    let _guard = setup();

    thread_create("busy", PRI_DEFAULT, busy_thread, 0).unwrap();
    thread_create("waiting", PRI_DEFAULT, waiting_thread, 0).unwrap();

    wait_until(|| SLICE_LOG.lock().len() == 6);

    // The waiting thread runs only once the busy one used its slice
    assert_eq!(*SLICE_LOG.lock(), [0, 1, 2, 3, 100, 200]);
}

#[test]
fn test_idle_ticks_are_counted() {
    let _guard = setup();

    let before = sched::stats();
    timer_sleep(2);
    let after = sched::stats();

    assert!(after.idle_ticks >= before.idle_ticks + 2);
    assert!(after.switches > before.switches);
    thread_print_stats();
}

// ============================================================================
// Running Thread Invariant
// ============================================================================

static RUNNING_COUNTS: spin::Mutex<Vec<usize>> = spin::Mutex::new(Vec::new());

fn count_running() -> usize {
    let old_level = intr_disable();
    let mut running = 0;
    thread_foreach(|t| {
        if t.status() == ThreadStatus::Running {
            running += 1;
        }
    });
    intr_set_level(old_level);
    running
}

fn report_running(_aux: usize) {
    RUNNING_COUNTS.lock().push(count_running());
    thread_yield();
    RUNNING_COUNTS.lock().push(count_running());
}

#[test]
fn test_exactly_one_thread_running() {
    let _guard = setup();

    let tids: Vec<Tid> = (0..3)
        .map(|_| thread_create("counter", PRI_DEFAULT, report_running, 0).unwrap())
        .collect();

    // Freshly created threads are ready; the caller is the one running
    let old_level = intr_disable();
    let mut ready = Vec::new();
    thread_foreach(|t| {
        if tids.contains(&t.tid()) {
            ready.push(t.status());
        }
    });
    intr_set_level(old_level);
    assert_eq!(ready, [ThreadStatus::Ready; 3]);
    assert_eq!(count_running(), 1);

    wait_until(|| RUNNING_COUNTS.lock().len() == 6);
    assert!(RUNNING_COUNTS.lock().iter().all(|&n| n == 1));
    assert_eq!(count_running(), 1);
}

// ============================================================================
// Fatal Checks
// ============================================================================

#[test]
#[should_panic(expected = "unblocking thread")]
fn test_unblock_running_thread_is_fatal() {
    let _guard = setup();
    thread_unblock(thread_current());
}

#[test]
#[should_panic(expected = "thread_yield called from an interrupt handler")]
fn test_yield_in_interrupt_handler_is_fatal() {
    let _guard = setup();

    intr_disable();
    interrupt::enter_external();
    thread_yield();
}

#[test]
#[should_panic(expected = "thread_block requires interrupts off")]
fn test_block_with_interrupts_on_is_fatal() {
    let _guard = setup();
    thread_block();
}

#[test]
#[should_panic(expected = "failed its guard check")]
fn test_corrupted_guard_is_fatal() {
    let _guard = setup();

    let block = unsafe { std::alloc::alloc_zeroed(THREAD_BLOCK_LAYOUT) };
    assert!(!block.is_null());
    let victim = unsafe { ThreadRef::init_in_block(block, "victim", PRI_DEFAULT) };
    victim.corrupt_guard();

    thread_unblock(victim);
}

#[test]
#[should_panic(expected = "priority 64 out of range")]
fn test_create_with_bad_priority_is_fatal() {
    let _guard = setup();
    let _ = thread_create("too-high", PRI_MAX + 1, record_fifo, 0);
}

#[test]
fn test_create_reports_exhaustion() {
    let _guard = setup();

    pmm::set_thread_block_limit(pmm::live_thread_blocks());
    let result = thread_create("starved", PRI_DEFAULT, record_fifo, 0);
    pmm::set_thread_block_limit(0);

    assert_eq!(result, Err(status::ERR_NO_MEMORY));

    let old_level = intr_disable();
    let ready = sched::ready_tids();
    intr_set_level(old_level);
    assert!(ready.is_empty());
}
