use std::{env, error::Error, time::Duration};

use bevy::{
    app::ScheduleRunnerPlugin,
    log::{Level, LogPlugin},
    prelude::*,
};
use robot_arena::{
    arena::Arena,
    config::SimulationConfig,
    controller::ControlModule,
    resource::ArenaRes,
    simulator::Simulator,
};

#[cfg(not(feature = "native-controller"))]
fn control_module(config: &SimulationConfig) -> Box<dyn ControlModule> {
    use robot_arena::controller::{NativeModule, Wanderer};

    Box::new(NativeModule::new(Wanderer::new(config.servo_calibration)))
}

#[cfg(feature = "native-controller")]
fn control_module(_config: &SimulationConfig) -> Box<dyn ControlModule> {
    Box::new(robot_arena::controller::ForeignModule::new())
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)),
        LogPlugin {
            level: Level::INFO,
            filter: "robot_arena=info".to_string(),
            ..default()
        },
    ));

    let config = match env::args().nth(1) {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    let modules = config.clone();
    let arena = Arena::from_config(config, |_| control_module(&modules))?;

    app.insert_non_send_resource(ArenaRes::from(arena))
        .add_plugins(Simulator)
        .run();

    Ok(())
}
