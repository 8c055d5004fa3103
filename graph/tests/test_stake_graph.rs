/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use cybergraph::{GraphError, StakeGraph};

#[test]
fn test_empty() -> Result<(), GraphError> {
    let g = StakeGraph::from_links(0, vec![], [])?;
    assert_eq!(g.num_nodes(), 0);
    assert_eq!(g.num_users(), 0);
    assert_eq!(g.num_links(), 0);
    Ok(())
}

#[test]
fn test_from_links_views_agree() -> Result<(), GraphError> {
    // 0 → 1 (user 0), 0 → 2 (user 1), 2 → 1 (user 1), 1 → 1 self-loop
    // (user 0).
    let g = StakeGraph::from_links(
        3,
        vec![5, 9],
        [(0, 1, 0), (0, 2, 1), (2, 1, 1), (1, 1, 0)],
    )?;

    assert_eq!(g.num_links(), 4);
    assert_eq!(g.outbound().endpoints(0), &[1, 2]);
    assert_eq!(g.outbound().authors(0), &[0, 1]);
    assert_eq!(g.outbound().endpoints(1), &[1]);
    assert_eq!(g.outbound().endpoints(2), &[1]);

    // Inbound slices are sorted by source.
    assert_eq!(g.inbound().endpoints(1), &[0, 1, 2]);
    assert_eq!(g.inbound().authors(1), &[0, 0, 1]);
    assert_eq!(g.inbound().endpoints(2), &[0]);
    assert_eq!(g.inbound().count(0), 0);

    // Both views count the same multiset.
    let out_total: u32 = g.outbound().counts().iter().sum();
    let in_total: u32 = g.inbound().counts().iter().sum();
    assert_eq!(out_total, in_total);
    Ok(())
}

#[test]
fn test_from_links_multi_edges_form_runs() -> Result<(), GraphError> {
    // Three users all author 0 → 1; a fourth link comes from node 2.
    let g = StakeGraph::from_links(
        3,
        vec![1, 2, 3],
        [(2, 1, 2), (0, 1, 0), (0, 1, 1), (0, 1, 2)],
    )?;
    assert_eq!(g.inbound().endpoints(1), &[0, 0, 0, 2]);
    assert_eq!(g.inbound().authors(1), &[0, 1, 2, 2]);
    Ok(())
}

#[test]
fn test_from_links_rejects_out_of_range() {
    assert!(matches!(
        StakeGraph::from_links(2, vec![1], [(0, 2, 0)]),
        Err(GraphError::IndexOutOfRange {
            array: "target",
            ..
        })
    ));
    assert!(matches!(
        StakeGraph::from_links(2, vec![1], [(2, 0, 0)]),
        Err(GraphError::IndexOutOfRange {
            array: "source",
            ..
        })
    ));
    assert!(matches!(
        StakeGraph::from_links(2, vec![1], [(0, 1, 1)]),
        Err(GraphError::IndexOutOfRange {
            array: "author",
            ..
        })
    ));
}

#[test]
fn test_new_accepts_consistent_views() -> Result<(), GraphError> {
    // The graph of test_from_links_views_agree, spelled out by hand.
    let g = StakeGraph::new(
        vec![5, 9],
        vec![2, 1, 1],
        vec![1, 2, 1, 1],
        vec![0, 1, 0, 1],
        vec![0, 3, 1],
        vec![0, 1, 2, 0],
        vec![0, 0, 1, 1],
    )?;
    assert_eq!(g.num_nodes(), 3);
    assert_eq!(g.inbound().endpoints(1), &[0, 1, 2]);
    Ok(())
}

#[test]
fn test_new_rejects_count_mismatch() {
    // Outbound counts sum to 1 but two links are supplied.
    let result = StakeGraph::new(
        vec![1],
        vec![1, 0],
        vec![1, 0],
        vec![0, 0],
        vec![1, 1],
        vec![1, 0],
        vec![0, 0],
    );
    assert!(matches!(
        result,
        Err(GraphError::CountMismatch {
            view: "outbound",
            ..
        })
    ));
}

#[test]
fn test_new_rejects_length_mismatch() {
    let result = StakeGraph::new(
        vec![1],
        vec![1, 1],
        vec![1, 0],
        vec![0],
        vec![1, 1],
        vec![1, 0],
        vec![0, 0],
    );
    assert!(matches!(
        result,
        Err(GraphError::LengthMismatch {
            array: "out_author",
            ..
        })
    ));
}

#[test]
fn test_new_rejects_unsorted_inbound() {
    // Node 0 receives links from sources 1 and 0, in that order.
    let result = StakeGraph::new(
        vec![1],
        vec![1, 1],
        vec![0, 0],
        vec![0, 0],
        vec![2, 0],
        vec![1, 0],
        vec![0, 0],
    );
    assert!(matches!(
        result,
        Err(GraphError::UnsortedInbound { node: 0, offset: 1 })
    ));
}
