// src/engine.rs
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::arbiter::OutputArbiter;
use crate::config::MonitorConfig;
use crate::drivers::{MonitorError, RetryingSource, SampleSource};
use crate::monitor::MonitorSession;
use crate::outputs::{Alarm, Display, RenderWorker};
use crate::presence::Transition;
use crate::types::*;

/// Pause between polls while no scenario is running.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Spawn the control loop. It owns the session, the sensor, the buzzer and the
/// render worker, and runs until `Quit` arrives or the command channel closes.
pub fn spawn_thread<S, D, A>(
    config: MonitorConfig,
    source: S,
    display: D,
    mut alarm: A,
    tx: Sender<MonitorMessage>,
    rx_cmd: Receiver<ControlCommand>,
) -> Result<JoinHandle<()>, MonitorError>
where
    S: SampleSource + Send + 'static,
    D: Display + 'static,
    A: Alarm + Send + 'static,
{
    let mut session = MonitorSession::new(&config, StdRng::from_entropy(), Instant::now())?;
    let handle = thread::spawn(move || {
        let mut source = RetryingSource::new(
            source,
            config.read_attempts,
            config.read_retry_delay(),
            config.finger_threshold,
        );
        let renderer = RenderWorker::spawn(display);
        let mut arbiter = OutputArbiter::new();
        let alarm_on = Duration::from_millis(config.alarm_on_ms);
        let alarm_off = Duration::from_millis(config.alarm_off_ms);
        let show_splash = |arbiter: &mut OutputArbiter| {
            renderer.submit(config.splash_text.as_str(), Rgb::GREEN);
            arbiter.invalidate();
        };
        show_splash(&mut arbiter);
        tx.send(MonitorMessage::Log("Monitor engine ready.".to_owned())).ok();

        'frames: loop {
            // ============================================================
            // 1. control commands
            // ============================================================
            loop {
                match rx_cmd.try_recv() {
                    Ok(ControlCommand::SelectScenario(scenario)) => {
                        session.select_scenario(scenario, Instant::now());
                        tx.send(MonitorMessage::Log(format!("Running {scenario}"))).ok();
                    }
                    Ok(ControlCommand::StopScenario) => {
                        session.stop_scenario(Instant::now());
                        if alarm.is_active() {
                            alarm.silence();
                            tx.send(MonitorMessage::AlarmStatus(false)).ok();
                        }
                        show_splash(&mut arbiter);
                        tx.send(MonitorMessage::Log("Scenario stopped".to_owned())).ok();
                    }
                    Ok(ControlCommand::Quit) | Err(TryRecvError::Disconnected) => break 'frames,
                    Err(TryRecvError::Empty) => break,
                }
            }
            if session.scenario().is_none() {
                thread::sleep(IDLE_POLL);
                continue;
            }

            // ============================================================
            // 2. one frame of the pipeline
            // ============================================================
            let reading = source.next_sample();
            let report = session.step(reading.intensity, Instant::now());
            match report.transition {
                Some(Transition::Placed) => {
                    tx.send(MonitorMessage::Log("Finger detected".to_owned())).ok();
                }
                Some(Transition::Removed) => {
                    tx.send(MonitorMessage::Log("Finger removed".to_owned())).ok();
                }
                None => {}
            }

            // 3. display, only when the screen changes
            if let Some(decision) = arbiter.arbitrate(&report.decision) {
                renderer.submit(decision.text, decision.color);
            }

            // 4. buzzer
            if report.decision.buzzer {
                if !alarm.is_active() {
                    tx.send(MonitorMessage::AlarmStatus(true)).ok();
                }
                alarm.pulse(alarm_on, alarm_off);
            } else if alarm.is_active() {
                alarm.silence();
                tx.send(MonitorMessage::AlarmStatus(false)).ok();
            }

            // 5. dashboard
            tx.send(MonitorMessage::Snapshot(report.snapshot)).ok();
            thread::sleep(config.frame_interval());
        }

        alarm.silence();
        show_splash(&mut arbiter);
        info!(
            "engine stopped after {} display updates ({} drawn)",
            arbiter.dispatch_count(),
            renderer.rendered()
        );
        renderer.shutdown();
        tx.send(MonitorMessage::Stopped).ok();
    });
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::ManualSource;
    use crate::outputs::LogAlarm;
    use std::sync::mpsc::channel;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingDisplay {
        screens: Arc<Mutex<Vec<(String, Rgb)>>>,
    }

    impl Display for RecordingDisplay {
        fn render(&mut self, text: &str, color: Rgb) -> Result<(), MonitorError> {
            self.screens.lock().unwrap().push((text.to_owned(), color));
            Ok(())
        }
    }

    #[test]
    fn runs_a_scenario_and_stops_on_quit() {
        let config = MonitorConfig {
            frame_interval_ms: 1,
            read_retry_delay_ms: 0,
            ..MonitorConfig::default()
        };
        let splash = config.splash_text.clone();
        let display = RecordingDisplay::default();
        let screens = Arc::clone(&display.screens);
        // a finger-less sensor: every read fails and falls back to "no finger"
        let source = ManualSource::new(Vec::new());
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(config, source, display, LogAlarm::default(), tx, rx_cmd).unwrap();
        tx_cmd
            .send(ControlCommand::SelectScenario(Scenario::Baseline))
            .unwrap();
        let mut snapshots = 0;
        for message in rx.iter() {
            if let MonitorMessage::Snapshot(snapshot) = message {
                assert_eq!(snapshot.presence, Presence::Off);
                assert_eq!(snapshot.bpm_display, "--");
                snapshots += 1;
                if snapshots == 20 {
                    tx_cmd.send(ControlCommand::Quit).unwrap();
                }
            }
        }
        handle.join().unwrap();
        assert!(snapshots >= 20);
        let screens = screens.lock().unwrap();
        assert_eq!(screens.last().map(|s| s.0.as_str()), Some(splash.as_str()));
        assert!(screens.len() <= 3);
    }
}
