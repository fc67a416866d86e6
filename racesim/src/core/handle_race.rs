use crate::core::race::Race;
use crate::core::world::{KinematicWorld, TriggerKind};
use crate::interfaces::results_interface::{RaceState, RacerState, MAX_UPDATE_FREQUENCY};
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::SimPars;
use anyhow::Context;
use flume::Sender;
use log::{debug, info, warn};

/// race_state returns a snapshot of the race for the results consumer.
fn race_state(race: &Race) -> RaceState {
    RaceState {
        racer_states: race
            .racers
            .iter()
            .map(|racer| RacerState {
                racer_id: racer.id,
                name: racer.name.to_owned(),
                color: racer.color,
                position: [racer.agent.position.x, racer.agent.position.y],
                heading: racer.agent.heading,
                speed: racer.agent.speed(),
                compl_laps: racer.laps.compl_laps(),
                recovering: racer
                    .controller
                    .as_ref()
                    .map_or(false, |controller| controller.is_recovering()),
            })
            .collect(),
        racetime: race.get_racetime(),
        human_finished: race.get_human_finished(),
        final_result: None,
    }
}

/// handle_race creates and simulates a race on the basis of the inserted parameters, and returns
/// the results for post-processing. If a sender is inserted, race snapshots and the final result
/// are sent to it.
pub fn handle_race(
    sim_pars: &SimPars,
    timestep_size: f64,
    seed: u64,
    tx: Option<&Sender<RaceState>>,
) -> anyhow::Result<RaceResult> {
    let track = sim_pars.create_track()?;
    let mut race = Race::new(&sim_pars.race_pars, track, timestep_size, seed)?;
    let mut world = KinematicWorld::new(&race.track, &race.racers);

    let max_racetime = sim_pars.race_pars.max_racetime;
    let mut t_race_update_print = 0.0;
    let mut t_race_update_tx = 0.0;

    let result = loop {
        race.simulate_timestep(&world);

        for event in world.step(&mut race.racers, race.timestep_size) {
            match event.kind {
                TriggerKind::Checkpoint(i) => race.on_checkpoint(event.racer, i),
                TriggerKind::Finish => race.on_finish_line(event.racer),
            }
        }

        if let Some(result) = race.take_final_result() {
            break result;
        }

        if race.cur_racetime > max_racetime {
            warn!(
                "Aborting race after {:.3}s, {} did not finish",
                race.cur_racetime,
                race.human().name
            );
            anyhow::bail!(
                "Human racer did not finish within the maximum race time of {:.1}s!",
                max_racetime
            );
        }

        if race.cur_racetime > t_race_update_print + 9.9999 {
            debug!(
                "Simulating... Current race time is {:.3}s, human racer completed {} laps",
                race.cur_racetime,
                race.human().laps.compl_laps()
            );
            t_race_update_print = race.cur_racetime;
        }

        if let Some(tx) = tx {
            if race.cur_racetime > t_race_update_tx + 1.0 / MAX_UPDATE_FREQUENCY - 0.001 {
                tx.send(race_state(&race))
                    .context("Failed to send race state!")?;
                t_race_update_tx = race.cur_racetime;
            }
        }
    };

    info!(
        "Race on {} finished after {:.3}s",
        result.track_name, result.racetime
    );

    // send final result once
    if let Some(tx) = tx {
        let mut final_msg = race_state(&race);
        final_msg.final_result = Some(result.to_owned());
        tx.send(final_msg)
            .context("Failed to send final race result!")?;
    }

    Ok(result)
}
