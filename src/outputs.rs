// src/outputs.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::drivers::plot::{render_text_frame, FrameSink, PanelStyle};
use crate::drivers::MonitorError;
use crate::types::Rgb;

/// The colour panel. Rendering may be slow; it only ever runs on the render worker.
pub trait Display: Send {
    fn render(&mut self, text: &str, color: Rgb) -> Result<(), MonitorError>;
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn render(&mut self, text: &str, color: Rgb) -> Result<(), MonitorError> {
        (**self).render(text, color)
    }
}

/// The buzzer. Calls must be idempotent: the loop repeats them every frame.
pub trait Alarm {
    fn pulse(&mut self, on: Duration, off: Duration);
    fn silence(&mut self);
    fn is_active(&self) -> bool;
}

/// Renders text into a panel-sized bitmap and hands it to a [`FrameSink`].
pub struct BitmapDisplay<S: FrameSink> {
    sink: S,
    style: PanelStyle,
}

impl<S: FrameSink> BitmapDisplay<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            style: PanelStyle::default(),
        }
    }
}

impl<S: FrameSink> Display for BitmapDisplay<S> {
    fn render(&mut self, text: &str, color: Rgb) -> Result<(), MonitorError> {
        let frame = render_text_frame(text, color, &self.style)?;
        self.sink.write_frame(&frame)
    }
}

/// Display that only logs what it would show.
#[derive(Default)]
pub struct LogDisplay;

impl Display for LogDisplay {
    fn render(&mut self, text: &str, color: Rgb) -> Result<(), MonitorError> {
        info!("display <- {:?} {:?}", text.replace('\n', " | "), color);
        Ok(())
    }
}

/// Buzzer stand-in that logs its on/off edges.
#[derive(Default)]
pub struct LogAlarm {
    active: bool,
}

impl Alarm for LogAlarm {
    fn pulse(&mut self, on: Duration, off: Duration) {
        if !self.active {
            info!("buzzer pulsing ({on:?} on / {off:?} off)");
            self.active = true;
        }
    }

    fn silence(&mut self) {
        if self.active {
            info!("buzzer silenced");
            self.active = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

struct RenderJob {
    text: String,
    color: Rgb,
}

#[derive(Default)]
struct Slot {
    pending: Option<RenderJob>,
    closed: bool,
}

type Shared = Arc<(Mutex<Slot>, Condvar)>;

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One background thread that renders the most recent submitted screen.
///
/// Submitting while a job is still pending replaces it, so a slow display
/// never builds up a backlog and the last screen submitted is always the last
/// one drawn.
pub struct RenderWorker {
    shared: Shared,
    rendered: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    pub fn spawn<D: Display + 'static>(mut display: D) -> Self {
        let shared: Shared = Arc::new((Mutex::new(Slot::default()), Condvar::new()));
        let rendered = Arc::new(AtomicUsize::new(0));
        let handle = {
            let shared = Arc::clone(&shared);
            let rendered = Arc::clone(&rendered);
            thread::spawn(move || {
                let (slot, ready) = &*shared;
                loop {
                    let job = {
                        let mut guard = lock(slot);
                        loop {
                            if let Some(job) = guard.pending.take() {
                                break Some(job);
                            }
                            if guard.closed {
                                break None;
                            }
                            guard = ready.wait(guard).unwrap_or_else(PoisonError::into_inner);
                        }
                    };
                    let Some(job) = job else { break };
                    if let Err(e) = display.render(&job.text, job.color) {
                        warn!("display render failed: {e}");
                    }
                    rendered.fetch_add(1, Ordering::Relaxed);
                }
            })
        };
        Self {
            shared,
            rendered,
            handle: Some(handle),
        }
    }

    /// Queue a screen. Returns true if it replaced one that was never drawn.
    pub fn submit(&self, text: impl Into<String>, color: Rgb) -> bool {
        let (slot, ready) = &*self.shared;
        let replaced = lock(slot)
            .pending
            .replace(RenderJob {
                text: text.into(),
                color,
            })
            .is_some();
        ready.notify_one();
        if replaced {
            debug!("dropped a stale display frame");
        }
        replaced
    }

    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::Relaxed)
    }

    /// Draw whatever is still pending, then stop the thread.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        let (slot, ready) = &*self.shared;
        lock(slot).closed = true;
        ready.notify_one();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render worker panicked");
            }
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.close();
    }
}
