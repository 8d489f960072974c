use crate::CliError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wayfinder_lib::{NavConfig, StrategyKind};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Wayfinder - Build, inspect and replay indoor navigation graphs
pub struct Settings {
    /// Raise log verbosity (-v for debug, -vv for trace); RUST_LOG wins when set
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON file with navigation tuning (snap, arrival and layer switch distances)
    #[clap(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print layer, waypoint and line statistics of a persisted graph
    Inspect {
        /// Graph file
        #[clap(value_name = "GRAPH")]
        graph: PathBuf,

        /// Print the report as JSON
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Draw the track segments of GPX files as lines into a graph
    Import {
        /// GPX files to import
        #[clap(value_name = "GPX", required = true)]
        gpx_files: Vec<PathBuf>,

        /// Existing graph to extend; a new graph is started when omitted
        #[clap(short, long, value_name = "FILE")]
        graph: Option<PathBuf>,

        /// Layer receiving the lines, created when missing
        #[clap(short, long, default_value = "Ground")]
        layer: String,

        /// Snap distance in meters, overriding the configuration
        #[clap(long)]
        snap_distance: Option<f64>,

        /// Where to write the resulting graph
        #[clap(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Replay a recorded walk through the router, one directive per position
    Route {
        /// Graph file
        #[clap(value_name = "GRAPH")]
        graph: PathBuf,

        /// GPX file whose track points are the live positions
        #[clap(short, long, value_name = "FILE")]
        walk: PathBuf,

        /// Destination waypoint, by name or by its id in the graph file
        #[clap(short, long)]
        destination: String,

        /// Region table JSON; all layers form one region when omitted
        #[clap(long, value_name = "FILE")]
        regions: Option<PathBuf>,

        /// Region to navigate in (defaults to the first one)
        #[clap(short, long)]
        region: Option<String>,

        /// Path search strategy
        #[clap(short, long, default_value_t = StrategyKind::Dijkstra)]
        strategy: StrategyKind,

        /// Seed for the randomized strategies
        #[clap(long)]
        seed: Option<u64>,
    },
}

impl Settings {
    pub fn from_cli() -> Self {
        Settings::parse()
    }

    /// Navigation configuration from `--config`, or the defaults
    pub fn nav_config(&self) -> Result<NavConfig, CliError> {
        match &self.config {
            Some(path) => NavConfig::load(path).map_err(|source| CliError::Config {
                path: path.clone(),
                source,
            }),
            None => Ok(NavConfig::default()),
        }
    }
}
