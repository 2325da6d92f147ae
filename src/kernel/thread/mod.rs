// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread Management
//!
//! This module provides the thread control block and the public thread
//! API of the Rustux kernel.
//!
//! # Design
//!
//! - Each thread owns one block from [`pmm`]: the descriptor sits at the
//!   low address, the kernel stack grows down from the top of the block
//! - A guard value at the end of the descriptor detects stack overflow
//! - Each thread has a unique thread ID (TID), never reused
//! - A never-run thread carries a [`ExecutionContext::Fresh`] context;
//!   the architecture backend turns it into a resumable stack
//! - The initial thread's descriptor is static and never reclaimed
//!
//! # Thread States
//!
//! ```text
//! create -> Blocked -> Ready -> Running -> Dying
//!              ^                  |  |
//!              |                  |  +--> Ready (yield)
//!              +------------------+        (block)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! fn worker(aux: usize) {
//!     log_info!("worker {} on thread {}", aux, thread_tid());
//! }
//!
//! let tid = thread_create("worker", PRI_DEFAULT, worker, 7)?;
//! thread_yield();
//! ```

use core::cell::UnsafeCell;
use core::fmt;
use core::mem::{size_of, MaybeUninit};
use core::ptr::{self, NonNull};

use spin::Mutex;

use crate::kernel::arch::arch_traits::{
    ArchInterrupts, ArchThreadContext, UserEntry, ARCH_WORD_SIZE,
};
use crate::kernel::arch::{Context, Platform};
use crate::kernel::interrupt::{intr_disable, intr_enable, intr_get_level, IntrLevel};
use crate::kernel::lib::list::{list_entry, ListElem};
use crate::kernel::pmm::{self, THREAD_BLOCK_SIZE};
use crate::kernel::sched::{self, SchedConfig};
use crate::rustux::types::*;
use crate::{kassert, kernel_fatal, log_debug, log_info};

pub use crate::kernel::sched::{
    thread_block, thread_exit, thread_foreach, thread_print_stats, thread_tick, thread_unblock,
    thread_yield,
};

/// ============================================================================
/// Constants
/// ============================================================================

/// Invalid thread ID, never issued
pub const TID_ERROR: Tid = 0;

/// Lowest priority
pub const PRI_MIN: i32 = 0;

/// Default priority
pub const PRI_DEFAULT: i32 = 31;

/// Highest priority
pub const PRI_MAX: i32 = 63;

/// Maximum thread name length in bytes
pub const THREAD_NAME_MAX: usize = 16;

/// Guard value stored in every descriptor
pub const THREAD_MAGIC: u32 = 0xcd6a_bf4b;

/// Entry point of a kernel thread
pub type ThreadFunc = fn(aux: usize);

/// ============================================================================
/// Thread Status
/// ============================================================================

/// Thread life cycle state
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// Running on the CPU; exactly one thread at a time
    Running = 0,

    /// On the ready queue
    Ready = 1,

    /// Waiting for someone to unblock it
    Blocked = 2,

    /// Exited; reclaimed once another thread runs
    Dying = 3,
}

impl ThreadStatus {
    /// Returns the status name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Ready => "ready",
            Self::Blocked => "blocked",
            Self::Dying => "dying",
        }
    }

    /// Returns true for the terminal state
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dying)
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ============================================================================
/// Thread Name
/// ============================================================================

/// Fixed-size thread name, truncated on a character boundary
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ThreadName {
    bytes: [u8; THREAD_NAME_MAX],
    len: u8,
}

impl ThreadName {
    /// Copy `name`, dropping whatever does not fit
    pub fn new(name: &str) -> Self {
        let mut len = name.len().min(THREAD_NAME_MAX);
        while !name.is_char_boundary(len) {
            len -= 1;
        }

        let mut bytes = [0u8; THREAD_NAME_MAX];
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);

        Self {
            bytes,
            len: len as u8,
        }
    }

    /// Returns the name as a string slice
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("?")
    }
}

impl PartialEq<&str> for ThreadName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

/// ============================================================================
/// Execution Context
/// ============================================================================

/// What a never-run thread starts executing
#[derive(Debug, Clone, Copy)]
pub enum FreshEntry {
    /// Kernel function called through the kernel thread trampoline
    Kernel { function: ThreadFunc, aux: usize },

    /// User program entered through an interrupt return
    User(UserEntry),
}

/// Execution state behind a thread's saved stack pointer
#[derive(Debug, Clone, Copy)]
pub enum ExecutionContext {
    /// Never run; the stack holds frames synthesized for the entry
    Fresh(FreshEntry),

    /// Has run; the stack holds whatever the switch primitive saved
    Suspended,
}

impl ExecutionContext {
    /// Returns true if the thread never ran
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// ============================================================================
/// Thread Control Block
/// ============================================================================

/// Thread control block
///
/// Lives at the base of the thread's block, so the stack can only grow
/// down to the end of this structure. The guard comes last: a stack
/// overflow clobbers it before anything else.
#[repr(C)]
pub struct Thread {
    /// Thread ID
    tid: Tid,

    /// Life cycle state
    status: ThreadStatus,

    /// Name for debugging
    name: ThreadName,

    /// Priority; recorded and bounds checked, not used for scheduling
    priority: i32,

    /// Saved stack pointer
    stack: VAddr,

    /// Fresh or suspended
    context: ExecutionContext,

    /// Ready queue link
    elem: ListElem,

    /// All-threads list link
    allelem: ListElem,

    /// False for the initial thread, whose descriptor is static
    owns_block: bool,

    /// Page directory of a user program, 0 for kernel threads
    #[cfg(feature = "userprog")]
    pagedir: usize,

    /// Always [`THREAD_MAGIC`]
    magic: u32,
}

/// Offset of the saved stack pointer, used by the switch primitive
pub const THREAD_STACK_OFFSET: usize = memoffset::offset_of!(Thread, stack);

/// Handle to a thread descriptor
///
/// A plain pointer: copying it does not keep the thread alive. Accessors
/// check the guard value before trusting the descriptor.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ThreadRef(NonNull<Thread>);

// Descriptors are only mutated with interrupts off on a single CPU.
unsafe impl Send for ThreadRef {}

impl ThreadRef {
    /// Wrap a raw descriptor pointer
    pub fn from_ptr(thread: *mut Thread) -> Option<Self> {
        NonNull::new(thread).map(Self)
    }

    /// Thread owning the block that contains `addr`
    ///
    /// Only meaningful for allocator-owned threads.
    pub fn containing(addr: VAddr) -> Option<Self> {
        Self::from_ptr((addr & !(THREAD_BLOCK_SIZE - 1)) as *mut Thread)
    }

    /// Thread whose ready queue link is `elem`
    pub(crate) fn from_elem(elem: NonNull<ListElem>) -> Self {
        // SAFETY: `elem` is embedded in a descriptor, so the container
        // pointer is non-null.
        Self(unsafe { NonNull::new_unchecked(list_entry!(elem, Thread, elem)) })
    }

    /// Thread whose all-threads link is `elem`
    pub(crate) fn from_allelem(elem: NonNull<ListElem>) -> Self {
        // SAFETY: as for `from_elem`.
        Self(unsafe { NonNull::new_unchecked(list_entry!(elem, Thread, allelem)) })
    }

    /// Initialize a descriptor at the base of a thread block
    ///
    /// The thread starts BLOCKED with its stack pointer at the top of the
    /// block and no TID.
    ///
    /// # Safety
    ///
    /// `block` must point to a writable, [`THREAD_BLOCK_SIZE`]-aligned
    /// block of [`THREAD_BLOCK_SIZE`] bytes that nothing else uses.
    pub(crate) unsafe fn init_in_block(block: *mut u8, name: &str, priority: i32) -> Self {
        init_thread(block.cast(), name, priority, block as VAddr + THREAD_BLOCK_SIZE, true)
    }

    /// Raw descriptor pointer
    pub fn as_ptr(self) -> *mut Thread {
        self.0.as_ptr()
    }

    /// Returns true if the guard value is intact
    pub fn is_valid(self) -> bool {
        is_thread(self.as_ptr())
    }

    /// Halt unless the guard value is intact
    pub fn check(self) {
        kassert!(
            self.is_valid(),
            "thread {:p} failed its guard check (stack overflow?)",
            self.as_ptr()
        );
    }

    /// Descriptor pointer after a guard check
    ///
    /// Fields are read and written through the raw pointer; mutation only
    /// happens with interrupts off or on a thread not yet visible to the
    /// scheduler.
    fn raw(self) -> *mut Thread {
        self.check();
        self.as_ptr()
    }

    /// Thread ID
    pub fn tid(self) -> Tid {
        unsafe { (*self.raw()).tid }
    }

    pub(crate) fn set_tid(self, tid: Tid) {
        unsafe { (*self.raw()).tid = tid };
    }

    /// Life cycle state
    pub fn status(self) -> ThreadStatus {
        unsafe { (*self.raw()).status }
    }

    pub(crate) fn set_status(self, status: ThreadStatus) {
        unsafe { (*self.raw()).status = status };
    }

    /// Thread name
    pub fn name(self) -> ThreadName {
        unsafe { (*self.raw()).name }
    }

    /// Recorded priority
    pub fn priority(self) -> i32 {
        unsafe { (*self.raw()).priority }
    }

    /// Saved stack pointer
    pub fn stack_pointer(self) -> VAddr {
        unsafe { (*self.raw()).stack }
    }

    /// Execution context
    pub fn context(self) -> ExecutionContext {
        unsafe { (*self.raw()).context }
    }

    pub(crate) fn set_context(self, context: ExecutionContext) {
        unsafe { (*self.raw()).context = context };
    }

    /// Returns true unless this is the static initial thread
    pub fn owns_block(self) -> bool {
        unsafe { (*self.raw()).owns_block }
    }

    /// Backing block, if allocator-owned
    pub(crate) fn block(self) -> Option<NonNull<u8>> {
        self.owns_block().then(|| self.0.cast())
    }

    /// User program page directory, 0 for kernel threads
    #[cfg(feature = "userprog")]
    pub fn pagedir(self) -> usize {
        unsafe { (*self.raw()).pagedir }
    }

    #[cfg(feature = "userprog")]
    pub(crate) fn set_pagedir(self, pagedir: usize) {
        unsafe { (*self.raw()).pagedir = pagedir };
    }

    /// Returns true if the thread runs a user program
    pub fn is_user(self) -> bool {
        #[cfg(feature = "userprog")]
        return self.pagedir() != 0;

        #[cfg(not(feature = "userprog"))]
        return false;
    }

    pub(crate) fn elem(self) -> NonNull<ListElem> {
        self.check();
        // SAFETY: field of a live descriptor.
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*self.as_ptr()).elem)) }
    }

    pub(crate) fn allelem(self) -> NonNull<ListElem> {
        self.check();
        // SAFETY: field of a live descriptor.
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*self.as_ptr()).allelem)) }
    }

    /// Reserve a frame of type `T` below the saved stack pointer
    ///
    /// # Safety
    ///
    /// The thread must not be running, and the caller must initialize
    /// the returned frame before the thread is resumed.
    pub(crate) unsafe fn alloc_frame<T>(self) -> *mut T {
        let size = size_of::<T>();
        kassert!(size % ARCH_WORD_SIZE == 0, "frame of {} bytes is not word sized", size);

        let thread = self.raw();
        let sp = (*thread).stack - size;
        kassert!(
            sp >= thread as VAddr + size_of::<Thread>(),
            "thread {} frame overruns its descriptor",
            (*thread).tid
        );

        (*thread).stack = sp;
        sp as *mut T
    }

    /// Make a never-run thread resumable at `entry`
    ///
    /// # Safety
    ///
    /// The thread must be freshly initialized in its own block and not
    /// yet visible to the scheduler.
    pub(crate) unsafe fn prepare(self, entry: FreshEntry) {
        kassert!(self.owns_block());
        self.set_context(ExecutionContext::Fresh(entry));

        match entry {
            FreshEntry::Kernel { function, aux } => {
                Context::prepare_kernel_entry(self, function, aux)
            }
            FreshEntry::User(user) => Context::prepare_user_entry(self, user),
        }
    }

    /// Wipe the guard so stale handles fail their next check
    pub(crate) fn poison(self) {
        unsafe { (*self.raw()).magic = 0 };
    }
}

impl fmt::Debug for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Thread({:p}, corrupt)", self.as_ptr());
        }

        f.debug_struct("Thread")
            .field("tid", &self.tid())
            .field("name", &self.name())
            .field("status", &self.status())
            .field("priority", &self.priority())
            .finish()
    }
}

/// Returns true if `thread` points to a valid descriptor
pub fn is_thread(thread: *const Thread) -> bool {
    // SAFETY: a non-null descriptor pointer always refers to readable
    // memory; only its contents may be stale.
    !thread.is_null() && unsafe { ptr::addr_of!((*thread).magic).read() } == THREAD_MAGIC
}

fn check_priority(priority: i32) {
    kassert!(
        (PRI_MIN..=PRI_MAX).contains(&priority),
        "priority {} out of range",
        priority
    );
}

/// Basic descriptor initialization shared by every thread
///
/// # Safety
///
/// `thread` must be valid for writes of a whole `Thread`.
unsafe fn init_thread(
    thread: *mut Thread,
    name: &str,
    priority: i32,
    stack: VAddr,
    owns_block: bool,
) -> ThreadRef {
    check_priority(priority);

    ptr::write(
        thread,
        Thread {
            tid: TID_ERROR,
            status: ThreadStatus::Blocked,
            name: ThreadName::new(name),
            priority,
            stack,
            context: ExecutionContext::Suspended,
            elem: ListElem::new(),
            allelem: ListElem::new(),
            owns_block,
            #[cfg(feature = "userprog")]
            pagedir: 0,
            magic: THREAD_MAGIC,
        },
    );

    ThreadRef(NonNull::new_unchecked(thread))
}

/// ============================================================================
/// Thread ID Allocator
/// ============================================================================

/// Issues thread IDs from a counter starting at 1
pub struct TidAllocator {
    next: Mutex<Tid>,
}

impl TidAllocator {
    /// Create an allocator whose first ID is 1
    pub const fn new() -> Self {
        Self { next: Mutex::new(1) }
    }

    /// Returns a TID never returned before
    pub fn allocate(&self) -> Tid {
        let mut next = self.next.lock();
        let tid = *next;
        *next += 1;
        tid
    }
}

impl Default for TidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Global thread ID allocator
static TID_ALLOCATOR: TidAllocator = TidAllocator::new();

fn allocate_tid() -> Tid {
    TID_ALLOCATOR.allocate()
}

/// ============================================================================
/// Initial Thread
/// ============================================================================

/// Static storage for the initial thread's descriptor
struct InitialThread(UnsafeCell<MaybeUninit<Thread>>);

// Written once by `thread_init` with interrupts off.
unsafe impl Sync for InitialThread {}

static INITIAL_THREAD: InitialThread = InitialThread(UnsafeCell::new(MaybeUninit::uninit()));

/// Turn the running code into the initial thread with default settings
///
/// See [`thread_init_with`].
pub fn thread_init() {
    thread_init_with(SchedConfig::default());
}

/// Turn the running code into the initial thread "main"
///
/// Must be called once, with interrupts off, before any other function
/// of this module. The page allocator is not needed: the initial
/// descriptor is static. Call [`thread_start`] once interrupts can be
/// delivered.
pub fn thread_init_with(config: SchedConfig) {
    kassert!(intr_get_level() == IntrLevel::Off, "thread_init requires interrupts off");

    config.apply();

    // SAFETY: interrupts are off and nothing references the initial
    // descriptor before this point.
    let initial = unsafe {
        init_thread(
            INITIAL_THREAD.0.get().cast(),
            "main",
            PRI_DEFAULT,
            Context::stack_pointer(),
            false,
        )
    };
    initial.set_tid(allocate_tid());

    sched::init(initial, config.time_slice);

    log_info!(
        "threads: initial thread {} running, time slice {} ticks",
        initial.tid(),
        config.time_slice
    );
}

/// Start preemptive scheduling
///
/// Creates the idle thread, enables interrupts and lets the idle thread
/// park itself before returning.
pub fn thread_start() {
    let idle_thread = match spawn("idle", PRI_MIN, FreshEntry::Kernel { function: idle, aux: 0 }) {
        Ok(thread) => thread,
        Err(status) => kernel_fatal!(
            "cannot create the idle thread: {}",
            status::status_name(status)
        ),
    };
    sched::set_idle(idle_thread);
    thread_unblock(idle_thread);

    intr_enable();

    // The idle thread is first in line; it blocks right away and hands
    // the CPU back.
    thread_yield();

    log_info!("threads: idle thread {} started", idle_thread.tid());
}

/// Runs when nothing else is ready
fn idle(_aux: usize) {
    loop {
        intr_disable();
        thread_block();

        // Enable interrupts and halt until the next one.
        Platform::wait_for_interrupt();
    }
}

/// ============================================================================
/// Thread Creation
/// ============================================================================

/// Allocate, initialize and register a new BLOCKED thread
fn spawn(name: &str, priority: i32, entry: FreshEntry) -> Result<ThreadRef> {
    check_priority(priority);

    let block = pmm::alloc_thread_block()?;

    // SAFETY: the block is fresh, suitably sized and aligned.
    let thread = unsafe { ThreadRef::init_in_block(block.as_ptr(), name, priority) };
    thread.set_tid(allocate_tid());

    // SAFETY: the thread is not visible to the scheduler yet.
    unsafe { thread.prepare(entry) };

    sched::register(thread);
    Ok(thread)
}

/// Create a kernel thread running `function(aux)` and make it ready
///
/// The new thread may run, and even exit, before this returns.
///
/// # Returns
///
/// - `Ok(tid)` of the new thread
/// - `Err(ERR_NO_MEMORY)` if no thread block is available
pub fn thread_create(name: &str, priority: i32, function: ThreadFunc, aux: usize) -> Result<Tid> {
    let thread = spawn(name, priority, FreshEntry::Kernel { function, aux })?;
    let tid = thread.tid();

    log_debug!("create thread {} '{}' priority {}", tid, name, priority);

    thread_unblock(thread);
    Ok(tid)
}

/// A loaded user program
#[cfg(feature = "userprog")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserImage {
    /// User entry point
    pub entry: VAddr,

    /// Initial user stack pointer
    pub stack_top: VAddr,

    /// Page directory the program runs in
    pub pagedir: usize,
}

/// Create a thread that enters the user program `image` and make it
/// ready
///
/// The address space collaborator owns `image.pagedir` from here on: it
/// is activated whenever the thread is scheduled and destroyed when the
/// thread is reclaimed.
#[cfg(feature = "userprog")]
pub fn thread_execute(name: &str, image: UserImage) -> Result<Tid> {
    let entry = UserEntry {
        start: image.entry,
        stack_top: image.stack_top,
    };
    let thread = spawn(name, PRI_DEFAULT, FreshEntry::User(entry))?;
    thread.set_pagedir(image.pagedir);
    let tid = thread.tid();

    log_debug!("execute '{}' as thread {} at {:#x}", name, tid, image.entry);

    thread_unblock(thread);
    Ok(tid)
}

/// First Rust code of every kernel thread
///
/// Reached from the entry trampoline with interrupts still off from the
/// switch that started the thread.
#[allow(improper_ctypes_definitions)]
pub(crate) extern "C" fn kernel_thread(function: ThreadFunc, aux: usize) -> ! {
    intr_enable();
    function(aux);
    thread_exit()
}

/// ============================================================================
/// Current Thread
/// ============================================================================

/// Returns the running thread
///
/// Halts if the descriptor is corrupt, not RUNNING, or if an
/// allocator-owned thread is executing outside its own block.
pub fn thread_current() -> ThreadRef {
    let thread = sched::running_thread();

    kassert!(
        thread.status() == ThreadStatus::Running,
        "current thread {} is {}",
        thread.tid(),
        thread.status()
    );

    if thread.owns_block() {
        let sp = Context::stack_pointer();
        kassert!(
            ThreadRef::containing(sp) == Some(thread),
            "stack pointer {:#x} is outside thread {}",
            sp,
            thread.tid()
        );
    }

    thread
}

/// Returns the running thread's TID
pub fn thread_tid() -> Tid {
    thread_current().tid()
}

/// Returns the running thread's name
pub fn thread_name() -> ThreadName {
    thread_current().name()
}

/// Returns the running thread's priority
pub fn thread_get_priority() -> i32 {
    thread_current().priority()
}

/// Set the running thread's priority
///
/// The value is recorded only; the ready queue stays FIFO.
pub fn thread_set_priority(priority: i32) {
    check_priority(priority);
    let cur = thread_current();
    // SAFETY: a thread only changes its own priority.
    unsafe { (*cur.raw()).priority = priority };
}

#[cfg(test)]
impl ThreadRef {
    /// Overwrite the guard as a stack overflow would
    pub(crate) fn corrupt_guard(self) {
        // SAFETY: test descriptors are owned by the test.
        unsafe { (*self.as_ptr()).magic = 0x4141_4141 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::vec::Vec;

    fn test_block() -> *mut u8 {
        let block = unsafe { std::alloc::alloc_zeroed(pmm::THREAD_BLOCK_LAYOUT) };
        assert!(!block.is_null());
        block
    }

    fn release(block: *mut u8) {
        unsafe { std::alloc::dealloc(block, pmm::THREAD_BLOCK_LAYOUT) };
    }

    #[test]
    fn test_init_in_block() {
        let block = test_block();
        let t = unsafe { ThreadRef::init_in_block(block, "worker", PRI_MAX) };

        assert!(t.is_valid());
        assert_eq!(t.as_ptr() as *mut u8, block);
        assert_eq!(t.status(), ThreadStatus::Blocked);
        assert_eq!(t.tid(), TID_ERROR);
        assert_eq!(t.name(), "worker");
        assert_eq!(t.priority(), PRI_MAX);
        assert_eq!(t.stack_pointer(), block as VAddr + THREAD_BLOCK_SIZE);
        assert!(t.owns_block());
        assert!(!t.context().is_fresh());
        assert_eq!(ThreadRef::containing(t.stack_pointer() - 1), Some(t));
        release(block);
    }

    #[test]
    fn test_name_truncation() {
        let name = ThreadName::new("a-very-long-thread-name");
        assert_eq!(name.as_str(), "a-very-long-thre");
        assert_eq!(name.as_str().len(), THREAD_NAME_MAX);

        // Never split a multi-byte character
        let name = ThreadName::new("fifteen-bytes--é");
        assert_eq!(name.as_str(), "fifteen-bytes--");
    }

    #[test]
    fn test_guard_detects_corruption() {
        let block = test_block();
        let t = unsafe { ThreadRef::init_in_block(block, "guarded", PRI_DEFAULT) };
        assert!(is_thread(t.as_ptr()));

        t.corrupt_guard();
        assert!(!t.is_valid());
        assert!(!is_thread(core::ptr::null()));
        release(block);
    }

    #[test]
    #[should_panic(expected = "priority 64 out of range")]
    fn test_init_rejects_bad_priority() {
        let block = test_block();
        let _ = unsafe { ThreadRef::init_in_block(block, "bad", PRI_MAX + 1) };
    }

    #[test]
    fn test_alloc_frame_moves_stack_down() {
        let block = test_block();
        let t = unsafe { ThreadRef::init_in_block(block, "frames", PRI_DEFAULT) };
        let top = t.stack_pointer();

        let frame = unsafe { t.alloc_frame::<[u64; 3]>() };
        assert_eq!(frame as VAddr, top - 24);
        assert_eq!(t.stack_pointer(), top - 24);
        release(block);
    }

    #[test]
    fn test_tid_allocator_sequential() {
        let tids = TidAllocator::new();
        assert_eq!(tids.allocate(), 1);
        assert_eq!(tids.allocate(), 2);
        assert_eq!(tids.allocate(), 3);
    }

    #[test]
    fn test_tid_allocator_concurrent_callers() {
        let tids = Arc::new(TidAllocator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tids = Arc::clone(&tids);
                std::thread::spawn(move || (0..500).map(|_| tids.allocate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for tid in handle.join().unwrap() {
                assert_ne!(tid, TID_ERROR);
                assert!(seen.insert(tid), "tid {} issued twice", tid);
            }
        }
        assert_eq!(seen.len(), 8 * 500);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(ThreadStatus::Running.to_string(), "running");
        assert_eq!(ThreadStatus::Dying.as_str(), "dying");
        assert!(ThreadStatus::Dying.is_terminal());
        assert!(!ThreadStatus::Blocked.is_terminal());
    }
}
