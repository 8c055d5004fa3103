/*
 * SPDX-FileCopyrightText: 2026 The CyberGraph Authors
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{
    FloatVectorFormat, GlobalArgs, GranularityArgs, LinksArgs, NumThreadsArg, get_thread_pool,
    with_suffix,
};
use anyhow::{Context, Result, ensure};
use clap::Parser;
use cybergraph::StakeGraph;
use cybergraph_rank::CyberRank;
use dsi_progress_logger::{ProgressLog, concurrent_progress_logger, progress_logger};
use std::io::BufRead;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "compute",
    about = "Compute the rank, entropy, light, and karma fields of a stake-weighted knowledge graph.",
    long_about = None
)]
pub struct CliArgs {
    /// The file containing the links, one `source target author` triple
    /// per line.
    pub links: PathBuf,

    #[arg(short, long)]
    /// The file containing the user stakes, one nonnegative integer per
    /// line; the stake of user `u` is on line `u + 1`.
    pub stakes: PathBuf,

    #[arg(short, long)]
    /// The basename of the output files (`.rank`, `.entropy`, `.light`,
    /// and `.karma` are appended).
    pub output: PathBuf,

    #[arg(short, long, default_value_t = 0.85)]
    /// The damping factor (must be in (0, 1)).
    pub damping_factor: f64,

    #[arg(short, long, default_value_t = 1e-6)]
    /// The ℓ∞ threshold on successive rank iterates to stop.
    pub tolerance: f64,

    #[arg(long)]
    /// Maximum number of iterations.
    pub max_iter: Option<usize>,

    #[arg(long)]
    /// The number of nodes; inferred from the links when missing.
    pub num_nodes: Option<usize>,

    #[arg(long, value_enum, default_value_t = FloatVectorFormat::Ascii)]
    /// The output format for the vectors.
    pub fmt: FloatVectorFormat,

    #[arg(long)]
    /// Decimal digits for text output formats.
    pub precision: Option<usize>,

    #[clap(flatten)]
    pub links_args: LinksArgs,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,

    #[clap(flatten)]
    pub granularity: GranularityArgs,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        args.damping_factor > 0.0 && args.damping_factor < 1.0,
        "The damping factor must be in (0, 1), got {}",
        args.damping_factor
    );
    ensure!(
        args.tolerance > 0.0,
        "The tolerance must be positive, got {}",
        args.tolerance
    );

    let mut pl = progress_logger![];
    pl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let mut cpl = concurrent_progress_logger![];
    cpl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        cpl.log_interval(log_interval);
    }

    let thread_pool = get_thread_pool(args.num_threads.num_threads);

    log::info!("Loading stakes from {}", args.stakes.display());
    let stakes = load_stakes(&args.stakes)?;

    log::info!("Loading links from {}", args.links.display());
    let links = load_links(&args.links, &args.links_args)?;

    let num_nodes = match args.num_nodes {
        Some(num_nodes) => num_nodes,
        None => links
            .iter()
            .map(|&(source, target, _)| source.max(target) + 1)
            .max()
            .unwrap_or(0),
    };

    let graph = StakeGraph::from_links(num_nodes, stakes, links)
        .context("Could not build the graph")?;
    log::info!(
        "{} nodes, {} users, {} links",
        graph.num_nodes(),
        graph.num_users(),
        graph.num_links()
    );

    let mut engine = CyberRank::new(&graph);
    engine
        .damping_factor(args.damping_factor)
        .tolerance(args.tolerance)
        .max_iter(args.max_iter)
        .granularity(args.granularity.into_granularity());

    thread_pool.install(|| engine.run_with_logging(&mut pl, &mut cpl))?;

    log::info!(
        "Completed after {} iteration(s), delta = {}",
        engine.iterations(),
        engine.delta()
    );

    args.fmt.store(
        with_suffix(&args.output, ".rank"),
        engine.rank(),
        args.precision,
    )?;
    args.fmt.store(
        with_suffix(&args.output, ".entropy"),
        engine.entropy(),
        args.precision,
    )?;
    args.fmt.store(
        with_suffix(&args.output, ".light"),
        engine.light(),
        args.precision,
    )?;
    args.fmt.store(
        with_suffix(&args.output, ".karma"),
        engine.karma(),
        args.precision,
    )?;

    Ok(())
}

/// Reads a text file containing one nonnegative integer stake per line.
fn load_stakes(path: impl AsRef<Path>) -> Result<Vec<u64>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open stakes file {}", path.display()))?;
    let reader = std::io::BufReader::new(file);
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|(i, line)| {
            let line = line
                .with_context(|| format!("Error reading line {} of {}", i + 1, path.display()))?;
            line.trim().parse::<u64>().with_context(|| {
                format!(
                    "Error parsing line {} of {}: {:?}",
                    i + 1,
                    path.display(),
                    line
                )
            })
        })
        .collect()
}

/// Reads a text file containing one `source target author` triple per
/// line.
fn load_links(path: impl AsRef<Path>, links_args: &LinksArgs) -> Result<Vec<(usize, usize, usize)>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Could not open links file {}", path.display()))?;
    let reader = std::io::BufReader::new(file);

    let mut links = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("Error reading line {} of {}", i + 1, path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with(links_args.line_comment_symbol) {
            continue;
        }
        let mut columns = line
            .split(links_args.separator)
            .filter(|column| !column.is_empty());
        let mut next_column = |name: &str| -> Result<usize> {
            let column = columns.next().with_context(|| {
                format!(
                    "Missing {} column at line {} of {}",
                    name,
                    i + 1,
                    path.display()
                )
            })?;
            column.trim().parse::<usize>().with_context(|| {
                format!(
                    "Error parsing {} at line {} of {}: {:?}",
                    name,
                    i + 1,
                    path.display(),
                    column
                )
            })
        };
        let source = next_column("source")?;
        let target = next_column("target")?;
        let author = next_column("author")?;
        links.push((source, target, author));
    }
    Ok(links)
}
