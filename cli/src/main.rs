use anyhow::Context;
use clap::Parser;
use log::{debug, info, warn};
use racesim::core::handle_race::handle_race;
use racesim::interfaces::results_interface::RaceState;
use racesim::post::race_result::RaceResult;
use racesim::pre::read_sim_pars::{read_sim_pars, SimPars};
use racesim::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::thread;
use std::time::Instant;

/// run_single simulates one race. Race snapshots are consumed by a separate thread while the
/// race is running.
fn run_single(sim_pars: &SimPars, sim_opts: &SimOpts) -> anyhow::Result<RaceResult> {
    let (tx, rx) = flume::unbounded::<RaceState>();

    let consumer = thread::spawn(move || {
        let mut no_snapshots = 0usize;
        let mut final_result = None;

        for race_state in rx.iter() {
            if race_state.final_result.is_some() {
                final_result = race_state.final_result;
            } else {
                no_snapshots += 1;
            }
        }
        (no_snapshots, final_result)
    });

    let result = handle_race(sim_pars, sim_opts.timestep_size, sim_opts.seed, Some(&tx));
    drop(tx);

    let (no_snapshots, final_result) = consumer
        .join()
        .map_err(|_| anyhow::anyhow!("Result consumer thread panicked!"))?;
    info!(
        "Received {} race snapshots, final result received: {}",
        no_snapshots,
        final_result.is_some()
    );

    result
}

/// run_multiple simulates several races with different seeds in parallel and summarizes the
/// positions of the human racer.
fn run_multiple(sim_pars: &SimPars, sim_opts: &SimOpts) -> anyhow::Result<RaceResult> {
    let results: Vec<anyhow::Result<RaceResult>> = (0..sim_opts.no_sim_runs as u64)
        .into_par_iter()
        .map(|i| handle_race(sim_pars, sim_opts.timestep_size, sim_opts.seed + i, None))
        .collect();

    let mut human_positions = vec![];
    let mut wins = 0usize;
    let mut last_result = None;

    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(result) => {
                if let Some(pos) = result.position_of(0) {
                    human_positions.push(pos);
                }
                if let Some(winner) = result.winner() {
                    debug!("Run {}: {} won in {:.3}s", i, winner.name, winner.time);
                    if winner.racer_id == 0 {
                        wins += 1;
                    }
                }
                last_result = Some(result);
            }
            Err(e) => warn!("Simulation run {} failed: {:#}", i, e),
        }
    }

    if !human_positions.is_empty() {
        let avg = human_positions.iter().sum::<usize>() as f64 / human_positions.len() as f64;
        info!(
            "Human racer won {} of {} runs, average position {:.2}",
            wins,
            human_positions.len(),
            avg
        );
    }

    last_result.context("All simulation runs failed!")
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    let default_level = if sim_opts.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if !(0.001..=0.1).contains(&sim_opts.timestep_size) {
        anyhow::bail!(
            "Timestep size must be in the range [0.001, 0.1], but is {}!",
            sim_opts.timestep_size
        );
    }

    // get simulation parameters
    info!(
        "Reading simulation parameters from {}",
        sim_opts.parfile_path.to_string_lossy()
    );
    let sim_pars = read_sim_pars(&sim_opts.parfile_path)?;

    info!(
        "Simulating {} laps on {} with {} racers and a time step size of {:.3}s",
        sim_pars.race_pars.tot_no_laps,
        sim_pars.track_pars.name,
        sim_pars.race_pars.no_racers(),
        sim_opts.timestep_size
    );

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    let race_result = if sim_opts.no_sim_runs > 1 {
        run_multiple(&sim_pars, &sim_opts)?
    } else {
        run_single(&sim_pars, &sim_opts)?
    };

    info!("Execution time: {}ms", t_start.elapsed().as_millis());

    // POST-PROCESSING -----------------------------------------------------------------------------
    race_result.print_results()?;
    let out_path = race_result.write_results_to_file(sim_opts.output_path.as_deref())?;
    info!("Results written to {}", out_path.to_string_lossy());

    Ok(())
}
