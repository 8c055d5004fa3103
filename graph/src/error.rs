/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use thiserror::Error;

/// A structural precondition violated by caller-supplied graph data.
///
/// All variants are detected by the checked constructors of
/// [`StakeGraph`](crate::StakeGraph) and [`Adjacency`](crate::Adjacency);
/// once a graph has been built, downstream consumers may rely on the
/// corresponding invariants without re-checking them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two parallel arrays that must have the same length do not.
    #[error("{array} has length {got}, expected {expected}")]
    LengthMismatch {
        array: &'static str,
        got: usize,
        expected: usize,
    },

    /// The per-node counts of a view do not sum to the number of links.
    #[error("{view} counts sum to {got} links, expected {expected}")]
    CountMismatch {
        view: &'static str,
        got: u64,
        expected: u64,
    },

    /// A node or user index is out of range.
    #[error("{array}[{index}] = {value} is out of range (must be < {bound})")]
    IndexOutOfRange {
        array: &'static str,
        index: usize,
        value: usize,
        bound: usize,
    },

    /// An inbound slice is not sorted by source.
    ///
    /// The inbound view must keep each target's links sorted by source
    /// node (non-decreasing; equal sources are multi-edges), so that
    /// same-source runs are contiguous.
    #[error("inbound slice of node {node} is not sorted by source at offset {offset}")]
    UnsortedInbound { node: usize, offset: usize },
}
