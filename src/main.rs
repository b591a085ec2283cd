// src/main.rs
mod arbiter;
mod config;
mod console;
mod drivers;
mod engine;
mod heart_utils;
mod indicator;
mod monitor;
mod outputs;
mod presence;
mod scenario;
mod types;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, bail, Context};
use log::{info, warn};

use config::MonitorConfig;
use console::Dashboard;
use drivers::{sink_for_path, FingerSwitch, SampleSource, SerialPpgSensor, SimulatedPpg};
use outputs::{BitmapDisplay, Display, LogAlarm, LogDisplay};
use types::*;

const MENU: &str = "\
Select a scenario:
  1  health monitoring
  2  hands-off detection
  3  high heart rate detection
  s  stop the running scenario
  f  lift / place the finger (simulation)
  q  quit";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    serial: Option<String>,
    frame_png: Option<String>,
    scenario: Option<Scenario>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut parsed = CliArgs::default();
        while let Some(flag) = args.next() {
            let mut value = || args.next().ok_or_else(|| anyhow!("{flag} needs a value"));
            match flag.as_str() {
                "--config" => parsed.config = Some(PathBuf::from(value()?)),
                "--serial" => parsed.serial = Some(value()?),
                "--frame-png" => parsed.frame_png = Some(value()?),
                "--scenario" => {
                    let choice = value()?;
                    parsed.scenario = Some(
                        Scenario::from_choice(&choice)
                            .ok_or_else(|| anyhow!("unknown scenario {choice:?}"))?,
                    );
                }
                other => bail!("unknown argument {other:?}"),
            }
        }
        Ok(parsed)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse(std::env::args().skip(1))?;
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if args.serial.is_some() {
        config.serial_port = args.serial.clone();
    }
    if args.frame_png.is_some() {
        config.frame_png_path = args.frame_png.clone();
    }
    config.validate().context("invalid configuration")?;

    // 1. sensor
    let mode = if config.serial_port.is_some() {
        ConnectionMode::Hardware
    } else {
        ConnectionMode::Simulation
    };
    let mut finger: Option<FingerSwitch> = None;
    let source: Box<dyn SampleSource + Send> = match (&mode, &config.serial_port) {
        (ConnectionMode::Hardware, Some(port)) => {
            let sensor = SerialPpgSensor::connect(port, config.serial_baud)
                .with_context(|| format!("opening PPG sensor on {port}"))?;
            info!("hardware mode: {} @ {} baud", sensor.port_name(), config.serial_baud);
            Box::new(sensor)
        }
        _ => {
            let sim = SimulatedPpg::new(config.sampling_rate_hz, config.sim_bpm, config.sim_seed);
            finger = Some(sim.finger_switch());
            info!("simulation mode: {:.0} bpm", config.sim_bpm);
            Box::new(sim)
        }
    };

    // 2. display
    let display: Box<dyn Display> = match &config.frame_png_path {
        Some(path) => {
            info!("display frames -> {path}");
            Box::new(BitmapDisplay::new(sink_for_path(path)))
        }
        None => Box::new(LogDisplay),
    };

    // 3. engine + dashboard
    let (tx, rx) = mpsc::channel();
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let dashboard = Dashboard::new(config.dashboard_interval());
    let engine = engine::spawn_thread(config, source, display, LogAlarm::default(), tx, rx_cmd)
        .context("starting monitor engine")?;
    let console = thread::spawn(move || dashboard.run(rx));

    if let Some(scenario) = args.scenario {
        tx_cmd.send(ControlCommand::SelectScenario(scenario)).ok();
    }
    println!("{MENU}");

    // 4. control surface
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let command = match line.trim() {
            "" => continue,
            "q" => ControlCommand::Quit,
            "s" => ControlCommand::StopScenario,
            "f" => {
                match &finger {
                    Some(switch) => {
                        let present = switch.toggle();
                        println!("finger {}", if present { "placed" } else { "lifted" });
                    }
                    None => warn!("finger toggle is only available in simulation mode"),
                }
                continue;
            }
            choice => match Scenario::from_choice(choice) {
                Some(scenario) => ControlCommand::SelectScenario(scenario),
                None => {
                    println!("{MENU}");
                    continue;
                }
            },
        };
        let quit = matches!(command, ControlCommand::Quit);
        if tx_cmd.send(command).is_err() || quit {
            break;
        }
    }
    // stdin closed or quit requested
    tx_cmd.send(ControlCommand::Quit).ok();

    engine
        .join()
        .map_err(|_| anyhow!("monitor engine panicked"))?;
    console
        .join()
        .map_err(|_| anyhow!("dashboard panicked"))?;
    info!("bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CliArgs> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags() {
        let args = parse(&["--serial", "/dev/ttyUSB0", "--scenario", "2"]).unwrap();
        assert_eq!(args.serial.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(args.scenario, Some(Scenario::HandsOff));
        assert_eq!(args.config, None);
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(parse(&["--scenario", "9"]).is_err());
        assert!(parse(&["--frame-png"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
