/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The batch ranking pipeline.
//!
//! One invocation runs nine stages in a strictly forward data flow: CSR
//! offsets are already part of the [`StakeGraph`]; the engine aggregates
//! per-node stake totals, computes the stationary-weight diagnostic and the
//! entropy field, evaluates the local link weights, compresses the inbound
//! adjacency, runs the damped power iteration to the configured tolerance,
//! and finally publishes `light = rank ⊙ entropy` and the per-user karma
//! attribution. Scratch buffers are dropped at the earliest point where no
//! later stage needs them; the peak is between compression and the
//! iteration, where the raw inbound view and the compressed view coexist.

use crate::EngineError;
use crate::compress::compress_inbound;
use crate::kernels;
use crate::power::{self, preds};
use crate::utils::scratch;
use cybergraph::StakeGraph;
use cybergraph::utils::{Granularity, RAYON_MIN_LEN};
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog, no_logging};
use kahan::KahanSum;
use predicates::Predicate;
use predicates::prelude::*;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

/// The four scalar fields computed by the engine.
#[derive(Debug, Clone)]
pub struct Fields {
    /// The damped stationary distribution over nodes, normalized to unit
    /// 𝓁₁ norm.
    pub rank: Box<[f64]>,
    /// The per-node entropy over the stake-weighted link neighborhood.
    pub entropy: Box<[f64]>,
    /// The elementwise product of rank and entropy.
    pub light: Box<[f64]>,
    /// The per-user attribution of light through authored outbound links.
    pub karma: Box<[f64]>,
}

/// Caller-allocated output buffers for [`compute_into`].
#[derive(Debug)]
pub struct FieldsMut<'a> {
    /// Must have one slot per node.
    pub rank: &'a mut [f64],
    /// Must have one slot per node.
    pub entropy: &'a mut [f64],
    /// Must have one slot per node.
    pub light: &'a mut [f64],
    /// Must have one slot per user.
    pub karma: &'a mut [f64],
}

/// Configuration for [`compute_into`].
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// The damping factor, in (0, 1).
    pub damping_factor: f64,
    /// The 𝓁∞ convergence threshold on successive rank iterates; must be
    /// positive.
    pub tolerance: f64,
    /// An optional cap on the number of iterations.
    pub max_iter: Option<usize>,
    /// The parallel task granularity.
    pub granularity: Granularity,
}

impl core::default::Default for Params {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            tolerance: CyberRank::DEFAULT_TOLERANCE,
            max_iter: None,
            granularity: Granularity::default(),
        }
    }
}

/// Statistics of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    /// The number of iterations performed by the solver.
    pub iterations: usize,
    /// The 𝓁∞ delta after the last iteration.
    pub delta: f64,
}

/// Computes the four fields into caller-allocated buffers.
///
/// Buffer lengths are validated before any allocation; the engine borrows
/// the graph for the duration of the call and releases all scratch before
/// returning. On error the contents of the buffers are unspecified.
pub fn compute_into(
    graph: &StakeGraph,
    params: &Params,
    out: FieldsMut<'_>,
) -> Result<RunStats, EngineError> {
    let num_nodes = graph.num_nodes();
    let num_users = graph.num_users();
    for (array, got, expected) in [
        ("rank", out.rank.len(), num_nodes),
        ("entropy", out.entropy.len(), num_nodes),
        ("light", out.light.len(), num_nodes),
        ("karma", out.karma.len(), num_users),
    ] {
        if got != expected {
            return Err(EngineError::Precondition {
                array,
                got,
                expected,
            });
        }
    }

    let mut engine = CyberRank::new(graph);
    engine
        .damping_factor(params.damping_factor)
        .tolerance(params.tolerance)
        .max_iter(params.max_iter)
        .granularity(params.granularity);
    engine.run()?;

    out.rank.copy_from_slice(engine.rank());
    out.entropy.copy_from_slice(engine.entropy());
    out.light.copy_from_slice(engine.light());
    out.karma.copy_from_slice(engine.karma());
    Ok(RunStats {
        iterations: engine.iterations(),
        delta: engine.delta(),
    })
}

/// Computes rank, entropy, light, and karma over a [`StakeGraph`].
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run) (or [`run_with_logging`](Self::run_with_logging) to
/// get progress reports). After completion the fields are available via
/// the [`rank`](Self::rank), [`entropy`](Self::entropy),
/// [`light`](Self::light), and [`karma`](Self::karma) methods.
///
/// # Examples
///
/// Two users disagreeing on the strength of a link:
///
/// ```
/// use cybergraph::StakeGraph;
/// use cybergraph_rank::CyberRank;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Both users author 0 → 1; user 0 also authors 0 → 2.
/// let g = StakeGraph::from_links(
///     3,
///     vec![3, 7],
///     [(0, 1, 0), (0, 1, 1), (0, 2, 0)],
/// )?;
///
/// let mut engine = CyberRank::new(&g);
/// engine.damping_factor(0.85).tolerance(1e-9);
/// engine.run()?;
///
/// // Node 1 is supported by more stake than node 2.
/// assert!(engine.rank()[1] > engine.rank()[2]);
/// assert!((engine.rank().iter().sum::<f64>() - 1.0).abs() < 1e-12);
/// # Ok(())
/// # }
/// ```
pub struct CyberRank<'a> {
    graph: &'a StakeGraph,
    damping_factor: f64,
    tolerance: f64,
    max_iter: Option<usize>,
    granularity: Granularity,

    rank: Box<[f64]>,
    entropy: Box<[f64]>,
    light: Box<[f64]>,
    karma: Box<[f64]>,
    iterations: usize,
    delta: f64,
}

impl std::fmt::Debug for CyberRank<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CyberRank")
            .field("damping_factor", &self.damping_factor)
            .field("tolerance", &self.tolerance)
            .field("max_iter", &self.max_iter)
            .field("granularity", &self.granularity)
            .field("iterations", &self.iterations)
            .field("delta", &self.delta)
            .finish_non_exhaustive()
    }
}

impl<'a> CyberRank<'a> {
    /// The default 𝓁∞ convergence threshold.
    pub const DEFAULT_TOLERANCE: f64 = 1E-6;

    /// Creates a new computation over the given graph.
    pub fn new(graph: &'a StakeGraph) -> Self {
        Self {
            graph,
            damping_factor: 0.85,
            tolerance: Self::DEFAULT_TOLERANCE,
            max_iter: None,
            granularity: Granularity::default(),
            rank: Box::default(),
            entropy: Box::default(),
            light: Box::default(),
            karma: Box::default(),
            iterations: 0,
            delta: f64::INFINITY,
        }
    }

    /// Sets the damping factor.
    ///
    /// The value is validated by [`run`](Self::run): a damping factor
    /// outside (0, 1) is rejected with
    /// [`NumericalDegeneracy`](EngineError::NumericalDegeneracy) before
    /// any allocation.
    pub fn damping_factor(&mut self, damping_factor: f64) -> &mut Self {
        self.damping_factor = damping_factor;
        self
    }

    /// Sets the 𝓁∞ convergence threshold on successive rank iterates.
    ///
    /// The value is validated by [`run`](Self::run): a non-positive
    /// tolerance is rejected with
    /// [`NumericalDegeneracy`](EngineError::NumericalDegeneracy) before
    /// any allocation.
    pub fn tolerance(&mut self, tolerance: f64) -> &mut Self {
        self.tolerance = tolerance;
        self
    }

    /// Caps the number of iterations.
    ///
    /// The core iteration runs to convergence; a cap is the hook a
    /// surrounding driver uses to bound wall-clock time.
    pub fn max_iter(&mut self, max_iter: Option<usize>) -> &mut Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the parallel task granularity.
    pub fn granularity(&mut self, granularity: Granularity) -> &mut Self {
        self.granularity = granularity;
        self
    }

    /// Returns the rank vector, normalized to unit 𝓁₁ norm.
    ///
    /// Empty before the first completed [`run`](Self::run).
    pub fn rank(&self) -> &[f64] {
        &self.rank
    }

    /// Returns the entropy field.
    ///
    /// Empty before the first completed [`run`](Self::run).
    pub fn entropy(&self) -> &[f64] {
        &self.entropy
    }

    /// Returns the light field (rank ⊙ entropy).
    ///
    /// Empty before the first completed [`run`](Self::run).
    pub fn light(&self) -> &[f64] {
        &self.light
    }

    /// Returns the per-user karma attribution.
    ///
    /// Empty before the first completed [`run`](Self::run).
    pub fn karma(&self) -> &[f64] {
        &self.karma
    }

    /// Returns the number of iterations performed by the last call to
    /// [`run`](Self::run).
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the 𝓁∞ delta after the last iteration.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Consumes the engine and returns the computed fields.
    pub fn into_fields(self) -> Fields {
        Fields {
            rank: self.rank,
            entropy: self.entropy,
            light: self.light,
            karma: self.karma,
        }
    }

    /// Runs the computation until the tolerance is met (or the iteration
    /// cap is reached, if one is set).
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    /// Runs the computation, logging progress.
    ///
    /// `pl` is a sequential [`ProgressLog`] used for stage transitions and
    /// iteration counting. `cpl` is a [`ConcurrentProgressLog`] used for
    /// node-level progress inside each iteration. Their options will be
    /// preserved, making it thus possible to customize the logs.
    pub fn run_with_logging(
        &mut self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<(), EngineError> {
        let tolerance = preds::Tolerance::new(self.tolerance)?;
        match self.max_iter {
            Some(max_iter) => {
                self.run_with_predicate(tolerance.or(preds::IterationCap(max_iter)), pl, cpl)
            }
            None => self.run_with_predicate(tolerance, pl, cpl),
        }
    }

    /// Runs the computation until the given stopping predicate is
    /// satisfied.
    ///
    /// This is the most general entry point; the predicate receives the
    /// iteration number and the current 𝓁∞ delta after every iteration.
    pub fn run_with_predicate(
        &mut self,
        predicate: impl Predicate<preds::IterationInfo>,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<(), EngineError> {
        if !(self.damping_factor > 0.0 && self.damping_factor < 1.0) {
            return Err(EngineError::NumericalDegeneracy {
                param: "damping factor",
                domain: "in (0, 1)",
                value: self.damping_factor,
            });
        }

        let graph = self.graph;
        let num_nodes = graph.num_nodes();
        let num_users = graph.num_users();

        if num_nodes == 0 {
            self.rank = Box::default();
            self.entropy = Box::default();
            self.light = Box::default();
            self.karma = scratch(num_users, 0.0)?;
            self.iterations = 0;
            self.delta = 0.0;
            return Ok(());
        }

        log::info!("Damping factor: {}", self.damping_factor);
        log::info!("Stopping criterion: {}", predicate);

        pl.info(format_args!("Aggregating per-node stakes..."));
        let total_out_stake = kernels::total_stake(graph.outbound(), graph.stakes())?;
        let total_in_stake = kernels::total_stake(graph.inbound(), graph.stakes())?;

        let stationary =
            kernels::stationary_weights(self.damping_factor, &total_in_stake, &total_out_stake)?;
        let mut mass: KahanSum<f64> = KahanSum::new();
        for &weight in &stationary {
            mass += weight;
        }
        log::debug!("Stationary weight mass: {}", mass.sum());
        drop(stationary);

        pl.info(format_args!("Computing entropy field..."));
        let entropy = kernels::entropy_field(graph, &total_out_stake, &total_in_stake)?;

        pl.info(format_args!("Computing local link weights..."));
        let link_weights = kernels::link_weights(graph, &total_out_stake, &total_in_stake)?;

        pl.info(format_args!("Compressing inbound adjacency..."));
        let compressed = compress_inbound(graph, &total_out_stake)?;
        log::info!(
            "Compressed {} raw links into {}",
            graph.num_links(),
            compressed.num_links()
        );

        let dangling = graph
            .inbound()
            .counts()
            .iter()
            .filter(|&&count| count == 0)
            .count();
        log::info!("{} dangling nodes", dangling);

        // The stake totals are dead from here on. The raw inbound view and
        // the compressed view now coexist until the solver returns; this
        // is the memory peak of the pipeline.
        drop(total_out_stake);
        drop(total_in_stake);

        let solution = power::solve(
            &compressed,
            dangling,
            self.damping_factor,
            self.granularity,
            &predicate,
            &mut *pl,
            &mut *cpl,
        )?;
        drop(compressed);

        pl.info(format_args!("Attributing light and karma..."));
        let mut light = scratch(num_nodes, 0.0_f64)?;
        light
            .par_iter_mut()
            .enumerate()
            .with_min_len(RAYON_MIN_LEN)
            .for_each(|(c, l)| *l = solution.rank[c] * entropy[c]);

        // Karma is accumulated serially: many links may share an author,
        // and the attribution must match the sequential reference sum.
        let mut karma = scratch(num_users, 0.0_f64)?;
        let outbound = graph.outbound();
        for c in 0..num_nodes {
            let start = outbound.start(c);
            for (offset, &author) in outbound.authors(c).iter().enumerate() {
                karma[author] += light[c] * link_weights[start + offset];
            }
        }
        drop(link_weights);

        self.rank = solution.rank;
        self.entropy = entropy;
        self.light = light;
        self.karma = karma;
        self.iterations = solution.iterations;
        self.delta = solution.delta;
        Ok(())
    }
}
