// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread Scheduler
//!
//! This module implements the thread scheduler for the Rustux kernel:
//! a single FIFO ready queue served round-robin, preempted by the timer
//! once a thread has used its time slice.
//!
//! # Design
//!
//! - **FIFO**: threads run in the order they became ready; priorities
//!   are recorded but not consulted
//! - **Preemptive**: the timer tick requests a yield when the slice ends
//! - **Uniprocessor**: all scheduler state lives in one [`IrqCell`] and is
//!   only touched with interrupts off
//! - **Deferred reclamation**: a dying thread is freed by the thread that
//!   runs after it, never on its own stack
//!
//! # Switch Protocol
//!
//! ```text
//! cur: status != Running, interrupts off
//!   schedule() -> next_thread_to_run() -> switch_threads(cur, next)
//! next (resumed or fresh):
//!   schedule_tail(prev) -> Running, activate, reclaim prev if Dying
//! ```

pub mod config;

pub use config::{SchedConfig, DEFAULT_TIME_SLICE, MAX_TIME_SLICE, MIN_TIME_SLICE};

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::kernel::arch::arch_traits::ArchThreadContext;
use crate::kernel::arch::Context;
use crate::kernel::interrupt::{
    intr_context, intr_disable, intr_get_level, intr_set_level, intr_yield_on_return, IntrLevel,
};
use crate::kernel::lib::list::List;
use crate::kernel::pmm;
use crate::kernel::sync::IrqCell;
use crate::kernel::thread::{thread_current, ExecutionContext, Thread, ThreadRef, ThreadStatus};
use crate::{kassert, kernel_fatal, log_debug, log_info, log_trace};

/// ============================================================================
/// Scheduler State
/// ============================================================================

/// Tick and switch counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks spent in the idle thread
    pub idle_ticks: u64,

    /// Ticks spent in kernel threads
    pub kernel_ticks: u64,

    /// Ticks spent in user programs
    pub user_ticks: u64,

    /// Context switches performed
    pub switches: u64,
}

impl SchedulerStats {
    const fn new() -> Self {
        Self {
            idle_ticks: 0,
            kernel_ticks: 0,
            user_ticks: 0,
            switches: 0,
        }
    }
}

/// Process-wide scheduler state
struct Scheduler {
    /// READY threads in the order they will run
    ready: List,

    /// Every live thread
    all: List,

    /// Runs when `ready` is empty
    idle: Option<ThreadRef>,

    /// Bootstrap thread with a static descriptor
    initial: Option<ThreadRef>,

    /// Ticks a thread may run before being asked to yield
    time_slice: u32,

    /// Ticks since the running thread was switched in
    thread_ticks: u32,

    stats: SchedulerStats,
}

impl Scheduler {
    const fn new() -> Self {
        Self {
            ready: List::new(),
            all: List::new(),
            idle: None,
            initial: None,
            time_slice: DEFAULT_TIME_SLICE,
            thread_ticks: 0,
            stats: SchedulerStats::new(),
        }
    }
}

static SCHEDULER: IrqCell<Scheduler> = IrqCell::new(Scheduler::new(), "scheduler");

/// Thread that owns the CPU, updated right before every switch
static CURRENT: AtomicPtr<Thread> = AtomicPtr::new(ptr::null_mut());

/// Install the initial thread as the running thread
pub(crate) fn init(initial: ThreadRef, time_slice: u32) {
    kassert!(intr_get_level() == IntrLevel::Off);
    kassert!(CURRENT.load(Ordering::Acquire).is_null(), "scheduler initialized twice");

    initial.set_status(ThreadStatus::Running);
    SCHEDULER.with(|s| {
        s.initial = Some(initial);
        s.time_slice = time_slice.clamp(MIN_TIME_SLICE, MAX_TIME_SLICE);
        // SAFETY: the initial descriptor is static.
        unsafe { s.all.push_back(initial.allelem()) };
    });
    CURRENT.store(initial.as_ptr(), Ordering::Release);
}

/// Record the idle thread before it first runs
pub(crate) fn set_idle(idle: ThreadRef) {
    let old_level = intr_disable();
    SCHEDULER.with(|s| {
        kassert!(s.idle.is_none(), "idle thread already set");
        s.idle = Some(idle);
    });
    intr_set_level(old_level);
}

/// Add a new thread to the all-threads list
pub(crate) fn register(thread: ThreadRef) {
    let old_level = intr_disable();
    // SAFETY: the descriptor lives until it leaves the list in
    // `thread_exit`.
    SCHEDULER.with(|s| unsafe { s.all.push_back(thread.allelem()) });
    intr_set_level(old_level);
}

/// Returns the running thread without checking its stack
pub fn running_thread() -> ThreadRef {
    match ThreadRef::from_ptr(CURRENT.load(Ordering::Acquire)) {
        Some(thread) => {
            thread.check();
            thread
        }
        None => kernel_fatal!("no running thread: thread_init has not run"),
    }
}

/// ============================================================================
/// Lifecycle Transitions
/// ============================================================================

/// Move a BLOCKED thread to the tail of the ready queue
///
/// Does not preempt the caller. Safe to call from an interrupt handler.
pub fn thread_unblock(thread: ThreadRef) {
    thread.check();

    let old_level = intr_disable();
    kassert!(
        thread.status() == ThreadStatus::Blocked,
        "unblocking thread {} which is {}",
        thread.tid(),
        thread.status()
    );

    // SAFETY: a blocked thread is on no other queue and its descriptor
    // stays alive until it exits.
    SCHEDULER.with(|s| unsafe { s.ready.push_back(thread.elem()) });
    thread.set_status(ThreadStatus::Ready);
    log_trace!("unblock thread {}", thread.tid());

    intr_set_level(old_level);
}

/// Give up the CPU; the caller stays ready and runs again in turn
pub fn thread_yield() {
    kassert!(!intr_context(), "thread_yield called from an interrupt handler");
    let cur = thread_current();

    let old_level = intr_disable();
    SCHEDULER.with(|s| {
        if s.idle != Some(cur) {
            // SAFETY: a running thread is on no queue.
            unsafe { s.ready.push_back(cur.elem()) };
        }
    });
    cur.set_status(ThreadStatus::Ready);
    log_trace!("yield thread {}", cur.tid());

    schedule();
    intr_set_level(old_level);
}

/// Put the running thread to sleep until [`thread_unblock`]
///
/// Interrupts must be off; the caller arranges the wakeup before
/// calling.
pub fn thread_block() {
    kassert!(!intr_context(), "thread_block called from an interrupt handler");
    kassert!(
        intr_get_level() == IntrLevel::Off,
        "thread_block requires interrupts off"
    );

    let cur = thread_current();
    cur.set_status(ThreadStatus::Blocked);
    log_trace!("block thread {}", cur.tid());

    schedule();
}

/// Terminate the running thread
///
/// The descriptor is reclaimed by the next thread to run.
pub fn thread_exit() -> ! {
    kassert!(!intr_context(), "thread_exit called from an interrupt handler");

    let cur = thread_current();
    intr_disable();

    // SAFETY: every live thread is on the all-threads list.
    SCHEDULER.with(|s| unsafe { s.all.remove(cur.allelem()) });
    cur.set_status(ThreadStatus::Dying);
    log_debug!("thread {} '{}' exiting", cur.tid(), cur.name());

    schedule();
    kernel_fatal!("dying thread {} was scheduled again", cur.tid())
}

/// ============================================================================
/// Switching
/// ============================================================================

/// Choose the thread to run next
///
/// The ready queue head, or the idle thread if the queue is empty.
fn next_thread_to_run() -> ThreadRef {
    SCHEDULER.with(|s| match s.ready.pop_front() {
        Some(elem) => {
            let next = ThreadRef::from_elem(elem);
            kassert!(
                next.status() == ThreadStatus::Ready,
                "thread {} on the ready queue is {}",
                next.tid(),
                next.status()
            );
            next
        }
        None => match s.idle {
            Some(idle) => idle,
            None => kernel_fatal!("nothing to run and no idle thread"),
        },
    })
}

/// Switch to the next thread
///
/// Interrupts must be off and the running thread must already have left
/// the RUNNING state.
fn schedule() {
    let cur = running_thread();
    let next = next_thread_to_run();

    kassert!(intr_get_level() == IntrLevel::Off);
    kassert!(
        cur.status() != ThreadStatus::Running,
        "scheduling away from running thread {}",
        cur.tid()
    );
    next.check();

    let prev = if cur != next {
        log_trace!("switch {} -> {}", cur.tid(), next.tid());
        CURRENT.store(next.as_ptr(), Ordering::Release);
        // SAFETY: interrupts are off, both descriptors are valid and
        // `cur` is the running thread.
        unsafe { Context::switch_threads(cur.as_ptr(), next.as_ptr()) }
    } else {
        ptr::null_mut()
    };

    schedule_tail(prev);
}

/// Finish a switch on the side of the thread that now runs
///
/// `prev` is the thread switched away from, or null if the running
/// thread did not change. Fresh threads get here from the switch entry
/// trampoline.
pub(crate) extern "C" fn schedule_tail(prev: *mut Thread) {
    let cur = running_thread();
    kassert!(intr_get_level() == IntrLevel::Off);

    cur.set_status(ThreadStatus::Running);
    if cur.context().is_fresh() {
        cur.set_context(ExecutionContext::Suspended);
    }

    SCHEDULER.with(|s| {
        s.thread_ticks = 0;
        if !prev.is_null() {
            s.stats.switches += 1;
        }
    });

    #[cfg(feature = "userprog")]
    crate::kernel::addrspace::activate(cur);

    if let Some(prev) = ThreadRef::from_ptr(prev) {
        if prev.status() == ThreadStatus::Dying {
            destroy_thread(prev);
        }
    }
}

/// Reclaim a DYING thread that is no longer on the CPU
fn destroy_thread(thread: ThreadRef) {
    kassert!(thread != running_thread(), "thread {} reclaiming itself", thread.tid());
    reclaim(thread);
}

/// Free a DYING thread's block; the initial thread keeps its descriptor
fn reclaim(thread: ThreadRef) {
    kassert!(
        thread.status().is_terminal(),
        "reclaiming thread {} which is {}",
        thread.tid(),
        thread.status()
    );

    let initial = SCHEDULER.with(|s| s.initial);
    if initial == Some(thread) {
        return;
    }

    #[cfg(feature = "userprog")]
    crate::kernel::addrspace::destroy(thread);

    if let Some(block) = thread.block() {
        log_debug!("reclaim thread {}", thread.tid());
        thread.poison();
        // SAFETY: the thread is dying, off every list, and the CPU has
        // left its stack.
        unsafe { pmm::free_thread_block(block) };
    }
}

/// ============================================================================
/// Time Slicing and Statistics
/// ============================================================================

/// Charge one timer tick to the running thread
///
/// Called by the timer interrupt handler. Requests a yield on return
/// once the thread has used up its time slice.
pub fn thread_tick() {
    let cur = thread_current();

    let expired = SCHEDULER.with(|s| {
        if s.idle == Some(cur) {
            s.stats.idle_ticks += 1;
        } else if cur.is_user() {
            s.stats.user_ticks += 1;
        } else {
            s.stats.kernel_ticks += 1;
        }

        s.thread_ticks += 1;
        s.thread_ticks >= s.time_slice
    });

    if expired {
        intr_yield_on_return();
    }
}

/// Snapshot of the scheduler counters
pub fn stats() -> SchedulerStats {
    let old_level = intr_disable();
    let stats = SCHEDULER.with(|s| s.stats);
    intr_set_level(old_level);
    stats
}

/// Log the scheduler counters
pub fn thread_print_stats() {
    let stats = stats();
    log_info!(
        "Thread: {} idle ticks, {} kernel ticks, {} user ticks, {} switches",
        stats.idle_ticks,
        stats.kernel_ticks,
        stats.user_ticks,
        stats.switches
    );
}

/// Call `f` on every live thread
///
/// Interrupts must be off. `f` must not create, unblock, block or
/// switch threads.
pub fn thread_foreach(mut f: impl FnMut(ThreadRef)) {
    kassert!(
        intr_get_level() == IntrLevel::Off,
        "thread_foreach requires interrupts off"
    );

    SCHEDULER.with(|s| s.all.iter().map(ThreadRef::from_allelem).for_each(&mut f));
}

/// TIDs on the ready queue, head first
#[cfg(test)]
pub(crate) fn ready_tids() -> std::vec::Vec<crate::rustux::types::Tid> {
    SCHEDULER.with(|s| s.ready.iter().map(|e| ThreadRef::from_elem(e).tid()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tests::setup;

    fn initial_thread() -> ThreadRef {
        SCHEDULER.with(|s| s.initial).unwrap()
    }

    #[test]
    fn test_initial_thread_is_never_reclaimed() {
        let _guard = setup();
        let baseline = pmm::live_thread_blocks();

        let old_level = intr_disable();
        let initial = initial_thread();
        initial.set_status(ThreadStatus::Dying);
        reclaim(initial);
        initial.set_status(ThreadStatus::Running);
        intr_set_level(old_level);

        assert!(initial.is_valid());
        assert!(!initial.owns_block());
        assert_eq!(pmm::live_thread_blocks(), baseline);
        assert_eq!(thread_current(), initial);
    }

    #[test]
    #[should_panic(expected = "reclaiming thread 1 which is running")]
    fn test_reclaiming_live_thread_is_fatal() {
        let _guard = setup();

        intr_disable();
        reclaim(initial_thread());
    }
}
