// BSD 2-Clause License
//
// Copyright (c) 2019, 2020 Alasdair Armstrong
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
// notice, this list of conditions and the following disclaimer in the
// documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! This crate implements an interpreter for the cat language used by
//! herdtools7 to specify relaxed memory models.
//!
//! A parsed model (see [`ast`]) is run against a candidate execution
//! described by an [`context::ExecutionContext`]. The interpreter
//! evaluates the model's definitions, computes recursive definitions
//! as least fixpoints, and checks each of its tests, producing one
//! [`exec::Outcome`] for every way the model accepts the execution.
//! Outcomes over many candidates are aggregated by [`exec::Tally`].
//!
//! The interpreter can also run in bell mode, where it collects the
//! event, relation and order annotations declared by a bell file
//! instead of checking axioms.

#[macro_use]
pub mod log;

pub mod ast;
pub mod bell;
pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod eval;
pub mod events;
pub mod exec;
mod fixpoint;
pub mod include;
pub mod primitives;
pub mod source_loc;
pub mod value;

pub use config::InterpConfig;
pub use context::ExecutionContext;
pub use error::Error;
pub use exec::{Interp, Outcome, State, Summary, Tally, Verdict};
