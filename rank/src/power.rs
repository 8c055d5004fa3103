/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The damped power-method solver.
//!
//! # The iteration
//!
//! Let *N* be the number of nodes, *d* ∈ (0, 1) the damping factor, *D*
//! the number of dangling nodes (nodes with no inbound links), and let
//!
//! > *r*₀ = (1 − *d*) / *N*  and  *r̃* = *d* · *r*₀ · (*D* / *N*) + *r*₀.
//!
//! Starting from the uniform vector *r*₀, each sweep computes, for every
//! node *c*,
//!
//! > *R*′\[*c*\] = *d* · ∑ *R*\[from\] · weight + *r̃*
//!
//! over the compressed inbound slice of *c*, or just *r̃* if the slice is
//! empty. The two vectors then swap roles (a ping-pong pair: no in-place
//! update), and the iteration stops when the stopping predicate is
//! satisfied; the canonical criterion is 𝓁∞(*R*′ − *R*) ≤ tolerance. On
//! termination the vector is normalized to unit 𝓁₁ norm.
//!
//! The *r̃* correction redistributes dangling mass as if the rank of every
//! dangling node were *r*₀: the redistribution term is fixed across
//! sweeps instead of being recomputed from the current dangling mass. The
//! perturbation this introduces is contractive, so convergence is
//! guaranteed for any positive tolerance when *d* < 1.
//!
//! # Parallelism
//!
//! Each thread grabs a chunk of nodes from an [`AtomicUsize`] cursor and
//! writes the new vector through [`SyncCell`]. A node's slice is
//! accumulated serially in slice order and every slot has exactly one
//! writer, so the result does not depend on the number of threads; the
//! 𝓁∞ delta is an order-free maximum.
//!
//! [`SyncCell`]: sync_cell_slice::SyncCell
//! [`AtomicUsize`]: std::sync::atomic::AtomicUsize

pub mod preds {
    //! Stopping conditions for the solver.
    //!
    //! The iteration publishes an [`IterationInfo`] after every sweep and
    //! stops as soon as the supplied predicate evaluates to true on it.
    //! The canonical criterion is [`Tolerance`]; a driver that needs to
    //! bound wall-clock time combines it with an [`IterationCap`] through
    //! the combinators of the [`predicates`] crate:
    //!
    //! ```
    //! use predicates::prelude::*;
    //! use cybergraph_rank::power::preds::{IterationCap, Tolerance};
    //!
    //! # fn main() -> Result<(), cybergraph_rank::EngineError> {
    //! let stop = Tolerance::new(1e-6)?.or(IterationCap(100));
    //! # let _ = stop;
    //! # Ok(())
    //! # }
    //! ```

    use crate::EngineError;
    use predicates::Predicate;
    use predicates::reflection::PredicateReflection;
    use std::fmt;

    /// Convergence information published after each sweep.
    #[derive(Debug, Clone, Copy)]
    pub struct IterationInfo {
        /// The index of the sweep that just completed, starting from 1.
        pub iteration: usize,
        /// The 𝓁∞ norm of the difference between the sweep's output and
        /// input vectors.
        pub delta: f64,
    }

    /// Stops once the 𝓁∞ delta is within the given tolerance.
    #[derive(Debug, Clone, Copy)]
    pub struct Tolerance {
        tolerance: f64,
    }

    impl Tolerance {
        /// Creates the criterion.
        ///
        /// A tolerance that is not a positive number (including NaN) is
        /// rejected with
        /// [`NumericalDegeneracy`](EngineError::NumericalDegeneracy).
        pub fn new(tolerance: f64) -> Result<Self, EngineError> {
            if tolerance > 0.0 {
                Ok(Self { tolerance })
            } else {
                Err(EngineError::NumericalDegeneracy {
                    param: "tolerance",
                    domain: "positive",
                    value: tolerance,
                })
            }
        }
    }

    impl fmt::Display for Tolerance {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "delta ≤ {}", self.tolerance)
        }
    }

    impl PredicateReflection for Tolerance {}

    impl Predicate<IterationInfo> for Tolerance {
        fn eval(&self, info: &IterationInfo) -> bool {
            info.delta <= self.tolerance
        }
    }

    /// Stops after the given number of sweeps, whatever the delta.
    ///
    /// The iteration itself never fails and would otherwise run to
    /// convergence; a cap is how a surrounding driver bounds wall-clock
    /// time, polling between sweeps.
    #[derive(Debug, Clone, Copy)]
    pub struct IterationCap(pub usize);

    impl fmt::Display for IterationCap {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "iteration ≥ {}", self.0)
        }
    }

    impl PredicateReflection for IterationCap {}

    impl Predicate<IterationInfo> for IterationCap {
        fn eval(&self, info: &IterationInfo) -> bool {
            info.iteration >= self.0
        }
    }
}

use crate::EngineError;
use crate::compress::CompressedInbound;
use crate::utils::scratch;
use cybergraph::utils::{Granularity, RAYON_MIN_LEN};
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog};
use kahan::KahanSum;
use predicates::Predicate;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};
use sync_cell_slice::SyncSlice;

/// The result of a solver run: the normalized rank vector plus
/// convergence statistics.
pub(crate) struct PowerSolution {
    pub(crate) rank: Box<[f64]>,
    pub(crate) iterations: usize,
    pub(crate) delta: f64,
}

/// Runs the damped power iteration on the compressed inbound view until
/// the predicate is satisfied, then normalizes the result to unit 𝓁₁
/// norm.
pub(crate) fn solve(
    compressed: &CompressedInbound,
    dangling: usize,
    damping_factor: f64,
    granularity: Granularity,
    predicate: &impl Predicate<preds::IterationInfo>,
    pl: &mut impl ProgressLog,
    cpl: &mut impl ConcurrentProgressLog,
) -> Result<PowerSolution, EngineError> {
    let num_nodes = compressed.num_nodes();
    debug_assert!(num_nodes > 0);

    let default_rank = (1.0 - damping_factor) / num_nodes as f64;
    // Dangling mass is redistributed as if every dangling node had the
    // default rank; see the module documentation.
    let corrected_default = damping_factor * default_rank * (dangling as f64 / num_nodes as f64)
        + default_rank;

    let mut current = scratch(num_nodes, default_rank)?;
    let mut next = scratch(num_nodes, default_rank)?;

    let node_granularity = granularity
        .node_granularity(num_nodes, Some(compressed.num_links()))
        .max(1);

    let mut iterations = 0;
    let mut delta;

    pl.item_name("iteration");
    pl.expected_updates(None);
    pl.start(format!(
        "Computing rank (damping factor {damping_factor}, granularity {node_granularity})..."
    ));

    loop {
        let delta_accum = Mutex::new(0.0_f64);
        let node_cursor = AtomicUsize::new(0);
        let next_sync = next.as_sync_slice();
        let current_ref: &[f64] = &current;

        cpl.item_name("node");
        cpl.expected_updates(Some(num_nodes));
        cpl.start(format!("Iteration {}...", iterations + 1));

        rayon::broadcast(|_| {
            let mut local_cpl = cpl.clone();
            let mut local_delta = 0.0_f64;

            loop {
                let start = node_cursor.fetch_add(node_granularity, Ordering::Relaxed);
                if start >= num_nodes {
                    break;
                }
                let len = node_granularity.min(num_nodes - start);

                for c in start..start + len {
                    let links = compressed.links(c);
                    let new_rank = if links.is_empty() {
                        // Dangling targets receive the corrected default
                        // only.
                        corrected_default
                    } else {
                        let mut sigma: KahanSum<f64> = KahanSum::new();
                        for link in links {
                            sigma += current_ref[link.from] * link.weight;
                        }
                        damping_factor * sigma.sum() + corrected_default
                    };

                    local_delta = local_delta.max((new_rank - current_ref[c]).abs());

                    // SAFETY: each node is owned by exactly one worker.
                    unsafe { next_sync[c].set(new_rank) };
                }

                local_cpl.update_with_count(len);
            }

            let mut delta_accum = delta_accum.lock().unwrap();
            *delta_accum = delta_accum.max(local_delta);
        });

        cpl.done();

        delta = delta_accum.into_inner().unwrap();
        std::mem::swap(&mut current, &mut next);
        iterations += 1;

        log::info!("Iteration {iterations}: delta = {delta}");
        pl.update_and_display();

        if predicate.eval(&preds::IterationInfo {
            iteration: iterations,
            delta,
        }) {
            break;
        }
    }

    pl.done();

    // Normalize to unit 𝓁₁ norm. Every entry is at least the corrected
    // default, which is positive for a damping factor below 1, so the
    // normalizer cannot vanish.
    let mut norm: KahanSum<f64> = KahanSum::new();
    for &rank in &current {
        norm += rank;
    }
    let norm = norm.sum();
    current
        .par_iter_mut()
        .with_min_len(RAYON_MIN_LEN)
        .for_each(|rank| *rank /= norm);

    Ok(PowerSolution {
        rank: current,
        iterations,
        delta,
    })
}
