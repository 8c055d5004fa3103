/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_pub)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

#[macro_use]
pub mod utils;

pub mod compress;
mod engine;
mod error;
pub mod kernels;
pub mod power;

pub use engine::{CyberRank, Fields, FieldsMut, Params, RunStats, compute_into};
pub use error::EngineError;

/// Prelude module to import everything from this crate.
pub mod prelude {
    pub use crate::compress::*;
    pub use crate::engine::*;
    pub use crate::error::EngineError;
    pub use crate::power::preds;
    pub use crate::thread_pool;
}
