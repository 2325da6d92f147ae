// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Architecture Abstraction Layer (AAL)
//!
//! This module selects the implementations behind the AAL traits.
//! The context switch always comes from the AMD64 backend; interrupt
//! control comes from the CPU on bare metal and from a simulation when
//! the core runs hosted.

// Architecture traits (interface)
pub mod arch_traits;

// Architecture-specific implementations
pub mod amd64;

// Simulated interrupt controller for hosted builds
#[cfg(any(test, feature = "hosted"))]
pub mod hosted;

/// Context switch backend
pub type Context = amd64::Amd64;

/// Interrupt control backend
#[cfg(not(any(test, feature = "hosted")))]
pub type Platform = amd64::Amd64;

/// Interrupt control backend
#[cfg(any(test, feature = "hosted"))]
pub type Platform = hosted::Hosted;
