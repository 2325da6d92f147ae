// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! AMD64 (x86-64) Architecture Implementation
//!
//! This module provides the AMD64-specific implementation of the
//! Architecture Abstraction Layer (AAL).

// Core architecture modules
pub mod asm;
pub mod interrupts;
pub mod registers;
pub mod thread;

/// AMD64 backend marker type
pub struct Amd64;
