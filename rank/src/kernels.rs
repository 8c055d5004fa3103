/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Elementwise kernels over nodes and links.
//!
//! These are the stake-aggregation, stationary-weight, entropy, and local
//! link-weight stages of the ranking pipeline. All kernels are
//! data-parallel over nodes; each worker iterates its node's link slices
//! serially, in slice order, so every output is written by exactly one
//! worker and results do not depend on the number of threads.
//!
//! Throughout, the *combined normalizer* of a node `c` is
//! `oil[c] = total_out_stake[c] + total_in_stake[c]`: the sum of the
//! authoring stakes of all links touching `c`. Both the entropy and the
//! local link weights divide by it; the per-side "probabilities" therefore
//! do not sum to 1 on either side, and the entropy is a generalized
//! entropy centered on the node, not a Shannon entropy of either marginal.

use crate::EngineError;
use crate::utils::scratch;
use cybergraph::utils::RAYON_MIN_LEN;
use cybergraph::{Adjacency, StakeGraph};
use rayon::iter::{
    IndexedParallelIterator, IntoParallelIterator, IntoParallelRefMutIterator, ParallelIterator,
};
use sync_cell_slice::SyncSlice;

/// Aggregates, for every node, the stakes of the authors of its links in
/// the given view.
///
/// Invoked once with the outbound view and once with the inbound view.
/// Sums are exact: they are computed in 64-bit integers, and the caller
/// guarantees that the total stake fits.
pub fn total_stake(view: &Adjacency, stakes: &[u64]) -> Result<Box<[u64]>, EngineError> {
    let mut total = scratch(view.num_nodes(), 0_u64)?;
    total
        .par_iter_mut()
        .enumerate()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|(c, t)| {
            let mut sum = 0_u64;
            for &author in view.authors(c) {
                sum += stakes[author];
            }
            *t = sum;
        });
    Ok(total)
}

/// Computes the stationary weight of every node,
/// `S[c] = d · total_in_stake[c] + (1 − d) · total_out_stake[c]`.
///
/// The stake totals are converted to doubles with round-to-nearest. The
/// weights feed no downstream stage; the engine reports their mass as a
/// diagnostic.
pub fn stationary_weights(
    damping_factor: f64,
    total_in_stake: &[u64],
    total_out_stake: &[u64],
) -> Result<Box<[f64]>, EngineError> {
    let mut weights = scratch(total_in_stake.len(), 0.0_f64)?;
    weights
        .par_iter_mut()
        .enumerate()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|(c, s)| {
            *s = damping_factor * total_in_stake[c] as f64
                + (1.0 - damping_factor) * total_out_stake[c] as f64;
        });
    Ok(weights)
}

/// Computes the entropy field.
///
/// For every node `c`, each link in its outbound slice contributes
/// `−p·log₂ p` with `p = stake[author] / oil[c]`, and symmetrically for
/// the inbound slice, reusing the same combined normalizer; the published
/// entropy is the sum of the two sides. Zero-stake authors contribute
/// nothing (this also guards `log₂ 0`), and a node with no links has
/// entropy 0.
pub fn entropy_field(
    graph: &StakeGraph,
    total_out_stake: &[u64],
    total_in_stake: &[u64],
) -> Result<Box<[f64]>, EngineError> {
    let stakes = graph.stakes();
    let outbound = graph.outbound();
    let inbound = graph.inbound();
    let mut entropy = scratch(graph.num_nodes(), 0.0_f64)?;
    entropy
        .par_iter_mut()
        .enumerate()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|(c, h)| {
            let oil = (total_out_stake[c] + total_in_stake[c]) as f64;
            let mut acc = 0.0_f64;
            for &author in outbound.authors(c).iter().chain(inbound.authors(c)) {
                let stake = stakes[author] as f64;
                if stake > 0.0 {
                    let p = stake / oil;
                    acc -= p * p.log2();
                }
            }
            *h = acc;
        });
    Ok(entropy)
}

/// Computes the local weight of every outbound link,
/// `w[e] = stake[author[e]] / oil[c]` for each link `e` in the outbound
/// slice of `c`.
///
/// These weights are consumed only by the karma stage; the rank solver
/// uses the independently computed compressed inbound weights.
pub fn link_weights(
    graph: &StakeGraph,
    total_out_stake: &[u64],
    total_in_stake: &[u64],
) -> Result<Box<[f64]>, EngineError> {
    let stakes = graph.stakes();
    let outbound = graph.outbound();
    let mut weights = scratch(graph.num_links() as usize, 0.0_f64)?;
    let weights_sync = weights.as_sync_slice();
    (0..graph.num_nodes())
        .into_par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|c| {
            let oil = (total_out_stake[c] + total_in_stake[c]) as f64;
            let start = outbound.start(c);
            for (offset, &author) in outbound.authors(c).iter().enumerate() {
                let stake = stakes[author] as f64;
                // A zero stake yields weight 0 directly: when oil[c] is 0
                // as well, the quotient would be 0/0.
                let w = if stake > 0.0 { stake / oil } else { 0.0 };
                // SAFETY: the outbound slices partition the link range, so
                // each slot is written by exactly one worker.
                unsafe { weights_sync[start + offset].set(w) };
            }
        });
    Ok(weights)
}
