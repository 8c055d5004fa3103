/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Inbound-adjacency compression.
//!
//! The raw inbound view is a multigraph: several users may author links
//! from the same source to the same target, and the rank solver would read
//! every one of them on every iteration. This module coalesces each run of
//! same-source links into a single [`CompressedLink`] carrying the
//! aggregated stake of the run as a fraction of the source's total
//! outbound stake, turning the multigraph into a simple weighted graph
//! suitable for a single-matrix power iteration.
//!
//! The run detection relies on the inbound slices being sorted by source,
//! which the [`StakeGraph`] constructors guarantee.

use crate::EngineError;
use crate::utils::scratch;
use cybergraph::StakeGraph;
use cybergraph::utils::{RAYON_MIN_LEN, exclusive_prefix_sum};
use rayon::iter::{
    IndexedParallelIterator, IntoParallelIterator, IntoParallelRefMutIterator, ParallelIterator,
};
use sync_cell_slice::SyncSlice;

/// The aggregated contribution of all links sharing a source, for a given
/// target.
///
/// The weight is the fraction of the source's total outbound stake that
/// supports the link, so it lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompressedLink {
    /// The source node.
    pub from: usize,
    /// The aggregated stake of the run, normalized by the source's total
    /// outbound stake.
    pub weight: f64,
}

/// The compressed inbound view: one source-sorted slice of
/// [`CompressedLink`]s per target node.
#[derive(Debug, Clone)]
pub struct CompressedInbound {
    start: Box<[usize]>,
    count: Box<[u32]>,
    links: Box<[CompressedLink]>,
}

impl CompressedInbound {
    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.count.len()
    }

    /// Returns the total number of compressed links.
    pub fn num_links(&self) -> u64 {
        self.links.len() as u64
    }

    /// Returns the number of compressed links of the given target.
    #[inline(always)]
    pub fn count(&self, node: usize) -> usize {
        self.count[node] as usize
    }

    /// Returns the compressed links of the given target.
    #[inline(always)]
    pub fn links(&self, node: usize) -> &[CompressedLink] {
        let start = self.start[node];
        &self.links[start..start + self.count[node] as usize]
    }
}

/// Compresses the inbound view of a graph, coalescing same-source
/// multi-edges.
///
/// A count pass over the sorted inbound slices sizes the compressed
/// buffer via a host prefix sum; the emit pass then aggregates each run's
/// stake in 64-bit integers and normalizes it by the source's total
/// outbound stake (a source whose outbound stake is zero supports only
/// zero-stake runs, which get weight 0). Targets with no inbound links
/// emit nothing.
pub fn compress_inbound(
    graph: &StakeGraph,
    total_out_stake: &[u64],
) -> Result<CompressedInbound, EngineError> {
    let inbound = graph.inbound();
    let stakes = graph.stakes();
    let num_nodes = graph.num_nodes();

    // Count pass: one compressed link per run of equal sources.
    let mut count = scratch(num_nodes, 0_u32)?;
    count
        .par_iter_mut()
        .enumerate()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|(c, k)| {
            let mut runs = 0_u32;
            let mut previous = usize::MAX;
            for &source in inbound.endpoints(c) {
                if source != previous {
                    runs += 1;
                    previous = source;
                }
            }
            *k = runs;
        });

    // Host prefix sum sizes the compressed buffer.
    let (start, total) = exclusive_prefix_sum(&count);

    // Emit pass.
    let mut links = scratch(total as usize, CompressedLink::default())?;
    let links_sync = links.as_sync_slice();
    (0..num_nodes)
        .into_par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|c| {
            let sources = inbound.endpoints(c);
            let authors = inbound.authors(c);
            let mut k = start[c];
            let mut j = 0;
            while j < sources.len() {
                let from = sources[j];
                let mut stake_sum = 0_u64;
                while j < sources.len() && sources[j] == from {
                    stake_sum += stakes[authors[j]];
                    j += 1;
                }
                let total_out = total_out_stake[from];
                let weight = if total_out == 0 {
                    0.0
                } else {
                    stake_sum as f64 / total_out as f64
                };
                // SAFETY: the compressed slices partition the buffer, so
                // each slot is written by exactly one worker.
                unsafe { links_sync[k].set(CompressedLink { from, weight }) };
                k += 1;
            }
        });

    Ok(CompressedInbound {
        start,
        count,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::total_stake;

    #[test]
    fn test_disagreeing_users_fold_into_one_link() {
        // Two users author the same link 0 → 1 with stakes 3 and 7; the
        // two raw links must fold into a single entry of weight
        // (3 + 7) / total_out_stake[0] = 1.
        let g = StakeGraph::from_links(2, vec![3, 7], [(0, 1, 0), (0, 1, 1)]).unwrap();
        let total_out = total_stake(g.outbound(), g.stakes()).unwrap();
        let compressed = compress_inbound(&g, &total_out).unwrap();

        assert_eq!(compressed.count(0), 0);
        assert_eq!(compressed.count(1), 1);
        assert_eq!(
            compressed.links(1),
            &[CompressedLink {
                from: 0,
                weight: 1.0
            }]
        );
    }

    #[test]
    fn test_single_link_slice() {
        let g = StakeGraph::from_links(2, vec![5], [(0, 1, 0)]).unwrap();
        let total_out = total_stake(g.outbound(), g.stakes()).unwrap();
        let compressed = compress_inbound(&g, &total_out).unwrap();
        assert_eq!(compressed.num_links(), 1);
        assert_eq!(
            compressed.links(1),
            &[CompressedLink {
                from: 0,
                weight: 1.0
            }]
        );
    }

    #[test]
    fn test_runs_split_by_source() {
        // Node 2 receives links from sources 0 (stakes 1 and 2) and 1
        // (stake 4); source 0 also links node 1, so its total outbound
        // stake is 1 + 2 + 4.
        let g = StakeGraph::from_links(
            3,
            vec![1, 2, 4],
            [(0, 2, 0), (0, 2, 1), (1, 2, 2), (0, 1, 2)],
        )
        .unwrap();
        let total_out = total_stake(g.outbound(), g.stakes()).unwrap();
        let compressed = compress_inbound(&g, &total_out).unwrap();

        assert_eq!(compressed.count(2), 2);
        let links = compressed.links(2);
        assert_eq!(links[0].from, 0);
        assert_eq!(links[0].weight, 3.0 / 7.0);
        assert_eq!(links[1].from, 1);
        assert_eq!(links[1].weight, 1.0);
    }

    #[test]
    fn test_compression_preserves_stake_sums() {
        let g = StakeGraph::from_links(
            4,
            vec![2, 3, 5, 7],
            [
                (0, 3, 0),
                (0, 3, 1),
                (1, 3, 2),
                (2, 3, 3),
                (2, 3, 0),
                (0, 1, 3),
            ],
        )
        .unwrap();
        let total_out = total_stake(g.outbound(), g.stakes()).unwrap();
        let total_in = total_stake(g.inbound(), g.stakes()).unwrap();
        let compressed = compress_inbound(&g, &total_out).unwrap();

        for c in 0..g.num_nodes() {
            let recovered: f64 = compressed
                .links(c)
                .iter()
                .map(|link| link.weight * total_out_stake_of(&total_out, link.from))
                .sum();
            assert!(
                (recovered - total_in[c] as f64).abs() <= 1e-9 * total_in[c].max(1) as f64,
                "node {c}: recovered {recovered}, expected {}",
                total_in[c]
            );
        }
    }

    fn total_out_stake_of(total_out: &[u64], node: usize) -> f64 {
        total_out[node] as f64
    }

    #[test]
    fn test_zero_outbound_stake_source() {
        let g = StakeGraph::from_links(2, vec![0], [(0, 1, 0)]).unwrap();
        let total_out = total_stake(g.outbound(), g.stakes()).unwrap();
        let compressed = compress_inbound(&g, &total_out).unwrap();
        assert_eq!(
            compressed.links(1),
            &[CompressedLink {
                from: 0,
                weight: 0.0
            }]
        );
    }
}
