use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "racesim",
    about = "Autonomous racers on a waypoint track with race outcome prediction"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs, runs are simulated in parallel
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file
    #[clap(short, long)]
    pub parfile_path: PathBuf,

    /// Set simulation timestep size in seconds, should be in the range [0.001, 0.1]
    #[clap(short, long, default_value = "0.02")]
    pub timestep_size: f64,

    /// Set seed of the random number generator, run i uses seed + i
    #[clap(short, long, default_value = "0")]
    pub seed: u64,

    /// Set path of the result file (default: output/last_run.txt)
    #[clap(short, long)]
    pub output_path: Option<PathBuf>,
}
