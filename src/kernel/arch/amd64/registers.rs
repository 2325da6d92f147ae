// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! x86-64 Register Definitions
//!
//! Flag and selector values used when fabricating interrupt-return
//! frames for user threads.

use bitflags::bitflags;

bitflags! {
    /// RFLAGS register flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RFlags: u64 {
        /// Must be set; reads as one on every x86 CPU
        const MBS = 1 << 1;
        /// Interrupt enable flag
        const IF = 1 << 9;
    }
}

/// Segment selectors, matching the kernel GDT layout
pub mod selectors {
    /// User data segment (RPL 3)
    pub const SEL_UDSEG: u16 = 0x1b;

    /// User code segment (RPL 3)
    pub const SEL_UCSEG: u16 = 0x23;
}

/// RFLAGS value a user thread starts with
pub const USER_RFLAGS: RFlags = RFlags::IF.union(RFlags::MBS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rflags() {
        assert_eq!(USER_RFLAGS.bits(), 0x202);
        assert!(USER_RFLAGS.contains(RFlags::IF));
        assert!(USER_RFLAGS.contains(RFlags::MBS));
    }

    #[test]
    fn test_user_selectors_are_ring3() {
        assert_eq!(selectors::SEL_UCSEG & 3, 3);
        assert_eq!(selectors::SEL_UDSEG & 3, 3);
    }
}
