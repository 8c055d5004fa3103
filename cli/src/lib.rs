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

use anyhow::{Context, Result, anyhow, bail, ensure};
use clap::{Args, Parser, Subcommand, ValueEnum};
use cybergraph::utils::Granularity;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod compute;

/// Clap value parser for a positive number of threads.
pub fn num_threads_parser(arg: &str) -> Result<usize> {
    let num_threads = arg.parse::<usize>()?;
    ensure!(num_threads > 0, "Number of threads must be greater than 0");
    Ok(num_threads)
}

/// Shared CLI arguments selecting the number of worker threads.
#[derive(Args, Debug)]
pub struct NumThreadsArg {
    #[arg(short = 'j', long, default_value_t = rayon::current_num_threads().max(1), value_parser = num_threads_parser)]
    /// The number of threads to use.
    pub num_threads: usize,
}

/// Shared CLI arguments selecting the size of parallel tasks, by nodes or
/// by links.
#[derive(Args, Debug)]
pub struct GranularityArgs {
    #[arg(long, conflicts_with("node_granularity"))]
    /// How many links a parallel task should tentatively cover.
    pub link_granularity: Option<u64>,

    #[arg(long, conflicts_with("link_granularity"))]
    /// How many nodes a parallel task should tentatively cover.
    pub node_granularity: Option<usize>,
}

impl GranularityArgs {
    pub fn into_granularity(&self) -> Granularity {
        match (self.link_granularity, self.node_granularity) {
            (Some(_), Some(_)) => unreachable!(),
            (Some(link_granularity), None) => Granularity::Links(link_granularity),
            (None, Some(node_granularity)) => Granularity::Nodes(node_granularity),
            (None, None) => Granularity::default(),
        }
    }
}

/// Shared CLI arguments for reading files containing link triples.
#[derive(Args, Debug)]
pub struct LinksArgs {
    #[arg(long, default_value_t = '#')]
    /// Skip lines starting with this symbol.
    pub line_comment_symbol: char,

    #[arg(long, default_value_t = '\t')]
    /// The symbol separating the columns of a triple.
    pub separator: char,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
/// Formats for storing and loading vectors of floats.
pub enum FloatVectorFormat {
    /// ASCII format, one float per line.
    Ascii,
    /// A JSON array.
    Json,
}

impl FloatVectorFormat {
    /// Stores float values in the specified `path` using the format
    /// defined by `self`.
    ///
    /// `precision` truncates the values to the specified number of decimal
    /// digits; if `None`, the shortest representation that round-trips is
    /// used.
    pub fn store(
        &self,
        path: impl AsRef<Path>,
        values: &[f64],
        precision: Option<usize>,
    ) -> Result<()> {
        ensure_parent_dir(&path)?;
        let path_display = path.as_ref().display();
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Could not create vector at {}", path_display))?;
        let mut file = BufWriter::new(file);

        match self {
            FloatVectorFormat::Ascii => {
                log::info!("Storing in ASCII format at {}", path_display);
                for value in values.iter() {
                    match precision {
                        None => writeln!(file, "{}", value),
                        Some(precision) => writeln!(file, "{value:.precision$}"),
                    }
                    .with_context(|| format!("Could not write vector to {}", path_display))?;
                }
            }
            FloatVectorFormat::Json => {
                log::info!("Storing in JSON format at {}", path_display);
                write!(file, "[")?;
                let mut first = true;
                for value in values.iter() {
                    if !first {
                        write!(file, ", ")?;
                    }
                    first = false;
                    match precision {
                        None => write!(file, "{}", value),
                        Some(precision) => write!(file, "{value:.precision$}"),
                    }
                    .with_context(|| format!("Could not write vector to {}", path_display))?;
                }
                write!(file, "]")?;
            }
        }

        Ok(())
    }

    /// Loads float values from the specified `path` using the format
    /// defined by `self`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<f64>> {
        let path = path.as_ref();
        let path_display = path.display();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Could not open {}", path_display))?;
        let reader = BufReader::new(file);

        match self {
            FloatVectorFormat::Ascii => {
                log::info!("Loading ASCII format from {}", path_display);
                reader
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
                    .map(|(i, line)| {
                        let line = line.with_context(|| {
                            format!("Error reading line {} of {}", i + 1, path_display)
                        })?;
                        line.trim().parse::<f64>().map_err(|e| {
                            anyhow!("Error parsing line {} of {}: {}", i + 1, path_display, e)
                        })
                    })
                    .collect()
            }
            FloatVectorFormat::Json => {
                log::info!("Loading JSON format from {}", path_display);
                let mut content = String::new();
                let mut reader = reader;
                std::io::Read::read_to_string(&mut reader, &mut content)
                    .with_context(|| format!("Could not read {}", path_display))?;
                let content = content.trim();
                let inner = content
                    .strip_prefix('[')
                    .and_then(|c| c.strip_suffix(']'))
                    .ok_or_else(|| anyhow!("Expected a JSON array in {}", path_display))?;
                inner
                    .split(',')
                    .filter(|token| !token.trim().is_empty())
                    .enumerate()
                    .map(|(i, token)| {
                        token.trim().parse::<f64>().map_err(|e| {
                            anyhow!(
                                "Error parsing element {} of {}: {}",
                                i + 1,
                                path_display,
                                e
                            )
                        })
                    })
                    .collect()
            }
        }
    }
}

/// Builds the Rayon thread pool the engine will run on.
pub fn get_thread_pool(num_threads: usize) -> rayon::ThreadPool {
    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .expect("Could not build the thread pool");
    log::info!("Using {} threads", thread_pool.current_num_threads());
    thread_pool
}

/// Returns the path with `suffix` appended to its filename.
///
/// # Panics
///
/// Panics if the path has no filename.
pub fn with_suffix(path: impl AsRef<Path>, suffix: impl AsRef<str>) -> PathBuf {
    let path = path.as_ref();
    let mut filename = path
        .file_name()
        .expect("The output basename must have a filename")
        .to_owned();
    filename.push(suffix.as_ref());
    path.with_file_name(filename)
}

/// Creates all missing parent directories of the given file path.
fn ensure_parent_dir(file_path: impl AsRef<Path>) -> Result<()> {
    match file_path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create the directory {}", parent.display())),
        _ => Ok(()),
    }
}

/// Parses a log-interval duration such as `10s`, `5m`, `1h30m`, or
/// `1d2h3m4s567`.
///
/// The units are `s`econds, `m`inutes, `h`ours, and `d`ays; trailing
/// digits without a unit (or a bare number) count as milliseconds.
fn parse_duration(value: &str) -> Result<Duration> {
    ensure!(!value.trim().is_empty(), "Empty duration");
    let mut total = Duration::ZERO;
    let mut digits = String::new();
    for c in value.chars().filter(|c| !c.is_whitespace()) {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let amount = digits
            .parse::<u64>()
            .with_context(|| format!("Missing number before {c:?} in duration {value:?}"))?;
        digits.clear();
        let seconds = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 60 * 60 * 24,
            _ => bail!("Unknown duration unit {c:?} in {value:?}"),
        };
        total += Duration::from_secs(amount * seconds);
    }
    if !digits.is_empty() {
        total += Duration::from_millis(digits.parse::<u64>()?);
    }
    Ok(total)
}

/// Initializes the `env_logger` logger, with timestamps and a default
/// `info` filter.
pub fn init_env_logger() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init()?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    #[arg(long, value_parser = parse_duration, global=true, display_order = 1000)]
    /// The interval between progress reports, e.g. "30s" or "5m" (a bare
    /// number counts as milliseconds). Defaults to 10s.
    pub log_interval: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    Compute(compute::CliArgs),
}

#[derive(Parser, Debug)]
#[command(name = "cybergraph", version)]
/// Tools to compute rank, entropy, light, and karma over stake-weighted
/// knowledge graphs.
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
    #[clap(flatten)]
    pub args: GlobalArgs,
}

/// The entry point of the command-line interface.
pub fn cli_main<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let start = std::time::Instant::now();
    let cli = Cli::parse_from(args);
    match cli.command {
        SubCommands::Compute(args) => {
            compute::main(cli.args, args)?;
        }
    }

    log::info!(
        "The command took {}",
        pretty_print_elapsed(start.elapsed().as_secs_f64())
    );

    Ok(())
}

/// Pretty-prints seconds in a human-readable format.
fn pretty_print_elapsed(elapsed: f64) -> String {
    let mut result = String::new();
    let mut elapsed_seconds = elapsed as u64;
    let days = elapsed_seconds / (60 * 60 * 24);
    elapsed_seconds %= 60 * 60 * 24;
    let hours = elapsed_seconds / (60 * 60);
    elapsed_seconds %= 60 * 60;
    let minutes = elapsed_seconds / 60;

    if days > 0 {
        result.push_str(&format!("{days}d "));
    }
    if hours > 0 {
        result.push_str(&format!("{hours}h "));
    }
    if minutes > 0 {
        result.push_str(&format!("{minutes}m "));
    }
    result.push_str(&format!("{:.3}s", elapsed % 60.0));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(
            parse_duration("1d2h3m4s567").unwrap(),
            Duration::from_millis(93_784_567)
        );
        assert!(parse_duration("").is_err());
        assert!(parse_duration("5x").is_err());
    }

    #[test]
    fn test_float_vector_roundtrip_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector");
        let values = [0.5, -1.25, 1e-9, 3.0];
        FloatVectorFormat::Ascii.store(&path, &values, None).unwrap();
        assert_eq!(FloatVectorFormat::Ascii.load(&path).unwrap(), values);
    }

    #[test]
    fn test_float_vector_roundtrip_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector");
        let values = [0.5, -1.25, 1e-9, 3.0];
        FloatVectorFormat::Json.store(&path, &values, None).unwrap();
        assert_eq!(FloatVectorFormat::Json.load(&path).unwrap(), values);
    }

    #[test]
    fn test_float_vector_precision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector");
        FloatVectorFormat::Ascii
            .store(&path, &[1.0 / 3.0], Some(3))
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0.333\n");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix("dir/basename", ".rank"),
            PathBuf::from("dir/basename.rank")
        );
    }
}
