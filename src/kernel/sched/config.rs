// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler Configuration
//!
//! Boot options understood by the thread core:
//!
//! | Key | Meaning |
//! |---|---|
//! | `sched.timeslice=<ticks>` | ticks a thread runs before preemption (1..=100) |
//! | `log.level=<name>` | `off`, `error`, `warn`, `info`, `debug` or `trace` |
//! | `pmm.thread_limit=<n>` | cap on live thread blocks, 0 = unlimited |

use crate::kernel::cmdline::Cmdline;
use crate::kernel::debug::{log_set_min_level, LogLevel};
use crate::kernel::pmm;
use crate::log_warn;

/// Default time slice in timer ticks
pub const DEFAULT_TIME_SLICE: u32 = 4;

/// Minimum time slice
pub const MIN_TIME_SLICE: u32 = 1;

/// Maximum time slice
pub const MAX_TIME_SLICE: u32 = 100;

/// Thread core settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// Ticks a thread may run before it is asked to yield
    pub time_slice: u32,

    /// Log level to install; `None` leaves the current one
    pub log_level: Option<Option<LogLevel>>,

    /// Cap on live thread blocks, 0 = unlimited
    pub thread_limit: usize,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            time_slice: DEFAULT_TIME_SLICE,
            log_level: None,
            thread_limit: 0,
        }
    }
}

impl SchedConfig {
    /// Read settings from the boot command line
    ///
    /// Missing or malformed options keep their defaults; the time slice
    /// is clamped to [`MIN_TIME_SLICE`]..=[`MAX_TIME_SLICE`].
    pub fn from_cmdline(cmdline: &Cmdline<'_>) -> Self {
        let defaults = Self::default();

        let time_slice = cmdline
            .get_uint32("sched.timeslice", defaults.time_slice)
            .clamp(MIN_TIME_SLICE, MAX_TIME_SLICE);

        let log_level = cmdline.get("log.level").and_then(|name| {
            let level = LogLevel::from_name(name);
            if level.is_none() {
                log_warn!("ignoring unknown log level '{}'", name);
            }
            level
        });

        let thread_limit = cmdline.get_uint32("pmm.thread_limit", 0) as usize;

        Self {
            time_slice,
            log_level,
            thread_limit,
        }
    }

    /// Install the settings that live outside the scheduler
    pub fn apply(&self) {
        if let Some(level) = self.log_level {
            log_set_min_level(level);
        }

        pmm::set_thread_block_limit(self.thread_limit);
    }
}
