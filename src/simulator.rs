//! Runs the arena inside a Bevy app, one tick per update, until the match is over.

use bevy::{app::AppExit, prelude::*};

use crate::resource::ArenaRes;

/// Ticks between two progress reports.
const PROGRESS_INTERVAL: u64 = 2500;

pub struct Simulator;

impl Plugin for Simulator {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, announce)
            .add_systems(Update, simulate);
    }
}

fn announce(arena: NonSend<ArenaRes>) {
    for robot in arena.robots() {
        info!(
            "{:?} {:?} robot {} starts at ({:.3}, {:.3}) heading {:.1}°",
            robot.color(),
            robot.kind(),
            robot.id(),
            robot.pose().x(),
            robot.pose().y(),
            robot.pose().orientation().to_deg(),
        );
    }
}

fn simulate(mut arena: NonSendMut<ArenaRes>, mut exit: EventWriter<AppExit>) {
    let match_ticks = arena.config().match_ticks;
    if arena.current_tick_index() >= match_ticks {
        return;
    }

    let report = arena.step();
    for (robot, error) in &report.failures {
        warn!("tick {}: robot {robot} failed: {error}", report.tick_index);
    }

    if report.tick_index % PROGRESS_INTERVAL == 0 {
        info!(
            "tick {} ({:.1} s simulated)",
            report.tick_index,
            arena.elapsed().as_secs_f64()
        );
    }

    if report.tick_index >= match_ticks {
        info!("match over after {:.1} s", arena.elapsed().as_secs_f64());
        for robot in arena.robots() {
            info!(
                "robot {} ended at ({:.3}, {:.3}), carrying {:?}",
                robot.id(),
                robot.pose().x(),
                robot.pose().y(),
                robot.carried().map(|o| o.kind()),
            );
        }
        exit.send(AppExit);
    }
}
