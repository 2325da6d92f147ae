// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Common type aliases used throughout the kernel

/// Virtual address type
pub type VAddr = usize;

/// Error code type (negative values indicate errors)
pub type Status = i32;

/// Thread ID type
pub type Tid = u64;

/// Timer ticks since boot.
///
/// Signed so that sleep requests with a negative count can be
/// expressed and rejected.
pub type Ticks = i64;

/// Result type for kernel operations
pub type Result<T = ()> = core::result::Result<T, Status>;

/// Common status codes
pub mod status {
    use super::Status;

    pub const OK: Status = 0;
    pub const ERR_NO_MEMORY: Status = -6;

    /// Human readable name of a status code
    pub fn status_name(status: Status) -> &'static str {
        match status {
            OK => "OK",
            ERR_NO_MEMORY => "ERR_NO_MEMORY",
            _ => "ERR_UNKNOWN",
        }
    }
}
