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

mod error;
mod stake_graph;
pub mod utils;

pub use error::GraphError;
pub use stake_graph::{Adjacency, StakeGraph};

/// Prelude module to import everything from this crate.
pub mod prelude {
    pub use crate::error::GraphError;
    pub use crate::stake_graph::{Adjacency, StakeGraph};
    pub use crate::utils::*;
}
