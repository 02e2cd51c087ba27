// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Control-flow pipes
//!
//! Controllers compose other pipes: [`sequence`] runs steps in order,
//! [`condition`] routes on an expression, [`parallel`] fans out over one
//! memory snapshot and [`batch`] maps a pipe over a list. Each one runs its
//! sub-pipes through the router, so every nested call is depth-checked
//! and input-bound like a top-level one.
//!
//! Concurrent controllers wait for every branch, then report the first
//! failure in declared order.

pub mod batch;
pub mod condition;
pub mod parallel;
pub mod sequence;
