/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Tests the engine against a sequential reference implementation on
//! random multigraphs.

use cybergraph::StakeGraph;
use cybergraph_rank::{CyberRank, EngineError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// The four fields computed sequentially, straight from their
/// definitions, with plain `f64` accumulation.
struct Reference {
    rank: Vec<f64>,
    entropy: Vec<f64>,
    light: Vec<f64>,
    karma: Vec<f64>,
}

fn reference_fields(
    num_nodes: usize,
    stakes: &[u64],
    links: &[(usize, usize, usize)],
    damping_factor: f64,
    tolerance: f64,
) -> Reference {
    let mut total_out = vec![0_u64; num_nodes];
    let mut total_in = vec![0_u64; num_nodes];
    for &(source, target, author) in links {
        total_out[source] += stakes[author];
        total_in[target] += stakes[author];
    }

    // Entropy and local link weights over the combined normalizer.
    let mut entropy = vec![0.0; num_nodes];
    for &(source, target, author) in links {
        let stake = stakes[author] as f64;
        if stake > 0.0 {
            let p_out = stake / (total_out[source] + total_in[source]) as f64;
            entropy[source] -= p_out * p_out.log2();
            let p_in = stake / (total_out[target] + total_in[target]) as f64;
            entropy[target] -= p_in * p_in.log2();
        }
    }

    // Compressed inbound view: per target, aggregated stake by source.
    let mut compressed: Vec<BTreeMap<usize, u64>> = vec![BTreeMap::new(); num_nodes];
    for &(source, target, author) in links {
        *compressed[target].entry(source).or_insert(0) += stakes[author];
    }

    // Damped Jacobi iteration with the fixed dangling correction.
    let dangling = compressed.iter().filter(|slice| slice.is_empty()).count();
    let default_rank = (1.0 - damping_factor) / num_nodes as f64;
    let corrected_default = damping_factor * default_rank * (dangling as f64 / num_nodes as f64)
        + default_rank;
    let mut rank = vec![default_rank; num_nodes];
    loop {
        let mut next = vec![0.0; num_nodes];
        for c in 0..num_nodes {
            next[c] = if compressed[c].is_empty() {
                corrected_default
            } else {
                let sigma: f64 = compressed[c]
                    .iter()
                    .map(|(&from, &stake_sum)| {
                        rank[from] * (stake_sum as f64 / total_out[from].max(1) as f64)
                    })
                    .sum();
                damping_factor * sigma + corrected_default
            };
        }
        let delta = rank
            .iter()
            .zip(next.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        rank = next;
        if delta <= tolerance {
            break;
        }
    }
    let norm: f64 = rank.iter().sum();
    for r in &mut rank {
        *r /= norm;
    }

    let light: Vec<f64> = (0..num_nodes).map(|c| rank[c] * entropy[c]).collect();

    let mut karma = vec![0.0; stakes.len()];
    for &(source, _, author) in links {
        let stake = stakes[author] as f64;
        if stake > 0.0 {
            let w = stake / (total_out[source] + total_in[source]) as f64;
            karma[author] += light[source] * w;
        }
    }

    Reference {
        rank,
        entropy,
        light,
        karma,
    }
}

fn l_inf_distance(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Random multigraphs with zero-stake users, multi-edges, self-loops, and
/// dangling nodes, checked against the sequential reference for several
/// damping factors.
#[test]
fn test_random_multigraphs_vs_reference() -> Result<(), EngineError> {
    let tolerance = 1e-10;

    for &(num_nodes, num_users, num_links, seed) in &[
        (10, 3, 30, 0_u64),
        (40, 8, 200, 1),
        (100, 20, 400, 2),
    ] {
        let mut rng = SmallRng::seed_from_u64(seed);
        // A zero-stake user is always present.
        let mut stakes: Vec<u64> = (0..num_users).map(|_| rng.random_range(0..50)).collect();
        stakes[0] = 0;
        let links: Vec<(usize, usize, usize)> = (0..num_links)
            .map(|_| {
                (
                    rng.random_range(0..num_nodes),
                    rng.random_range(0..num_nodes),
                    rng.random_range(0..num_users),
                )
            })
            .collect();

        let g = StakeGraph::from_links(num_nodes, stakes.clone(), links.iter().copied()).unwrap();

        for &damping in &[0.25, 0.5, 0.85] {
            let expected = reference_fields(num_nodes, &stakes, &links, damping, tolerance);

            let mut engine = CyberRank::new(&g);
            engine.damping_factor(damping).tolerance(tolerance);
            engine.run()?;

            assert!(
                l_inf_distance(engine.rank(), &expected.rank) < 1e-8,
                "rank: n={num_nodes} damping={damping} L∞={}",
                l_inf_distance(engine.rank(), &expected.rank)
            );
            assert!(
                l_inf_distance(engine.entropy(), &expected.entropy) < 1e-11,
                "entropy: n={num_nodes} damping={damping}"
            );
            assert!(
                l_inf_distance(engine.light(), &expected.light) < 1e-8,
                "light: n={num_nodes} damping={damping}"
            );
            assert!(
                l_inf_distance(engine.karma(), &expected.karma) < 1e-8,
                "karma: n={num_nodes} damping={damping}"
            );

            // The rank is stochastic after normalization.
            let sum: f64 = engine.rank().iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }
    Ok(())
}
