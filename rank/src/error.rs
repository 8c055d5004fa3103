/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use thiserror::Error;

/// Errors reported by the ranking engine.
///
/// The engine either succeeds end-to-end or fails with one of these; it
/// never retries, and on failure the contents of the output fields are
/// unspecified. No error arises from the numerical iteration itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The caller supplied an output buffer of the wrong length.
    ///
    /// Structural violations in the graph itself are caught earlier, by
    /// the checked constructors of
    /// [`StakeGraph`](cybergraph::StakeGraph).
    #[error("precondition violation: {array} has length {got}, expected {expected}")]
    Precondition {
        array: &'static str,
        got: usize,
        expected: usize,
    },

    /// An engine scratch allocation failed.
    ///
    /// Scratch allocated before the failure is released before the error
    /// is returned.
    #[error("could not allocate {bytes} bytes of engine scratch")]
    ResourceExhaustion { bytes: usize },

    /// A numerical parameter is outside its domain.
    ///
    /// Rejected before any allocation takes place.
    #[error("the {param} must be {domain}, got {value}")]
    NumericalDegeneracy {
        param: &'static str,
        domain: &'static str,
        value: f64,
    },
}
