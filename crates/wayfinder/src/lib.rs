//! Wayfinder - Command Line Front End
//!
//! Drives the navigation library on files: inspect persisted graphs, grow
//! them from recorded GPX tracks, and replay recorded walks through the live
//! router.

mod commands;
mod error;
mod logging;
mod settings;

pub use commands::{InspectReport, LayerSummary, ReplayStep, replay, summarize};
pub use error::CliError;
pub use logging::setup_logging;
pub use settings::{Command, Settings};

/// Run the selected subcommand
pub fn run(settings: &Settings) -> Result<(), CliError> {
    let config = settings.nav_config()?;
    match &settings.command {
        Command::Inspect { graph, json } => commands::run_inspect(graph, *json),
        Command::Import {
            gpx_files,
            graph,
            layer,
            snap_distance,
            output,
        } => {
            let mut config = config;
            if let Some(snap) = snap_distance {
                config.snap_distance_m = *snap;
            }
            commands::run_import(config, gpx_files, graph.as_deref(), layer, output)
        }
        Command::Route {
            graph,
            walk,
            destination,
            regions,
            region,
            strategy,
            seed,
        } => commands::run_route(
            config,
            commands::RouteOptions {
                graph,
                walk,
                destination,
                regions: regions.as_deref(),
                region: region.as_deref(),
                strategy: *strategy,
                seed: *seed,
            },
        ),
    }
}
