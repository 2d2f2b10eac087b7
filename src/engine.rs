// src/engine.rs
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{MonitorConfig, MAX_WINDOW_CAPACITY};
use crate::drivers::{
    AcquisitionError, LogTable, NetworkSampleSource, Renderer, SlidingWindow, ValuePipeline,
    WindowFrame,
};
use crate::registry::SensorRegistry;
use crate::types::{AcquisitionMode, FeedEvent, SourceDescriptor, StyleHint};

/// Nominal x-axis spacing of network samples; arrival is event driven.
pub const NETWORK_SAMPLE_PERIOD_SECS: f64 = 1.0;

/// Mutable state of the monitor, reset on every source switch.
#[derive(Debug)]
pub struct Session {
    pub mode: AcquisitionMode,
    pub active_source: Option<SourceDescriptor>,
    /// Log column offset; 0 or 1 for custom files, fixed by the source otherwise.
    pub channel: usize,
    pub window_capacity: usize,
    pub poll_interval: Duration,
    pub custom_path: Option<PathBuf>,
    pub last_table: Option<LogTable>,
}

// Frozen at arm time; edits made while replaying swap in a new plan for the next tick.
#[derive(Clone, Debug, PartialEq)]
struct ReplayPlan {
    path: PathBuf,
    channel: usize,
    capacity: usize,
}

struct ReplayTimer {
    plan: ReplayPlan,
    period: Duration,
    next_due: Instant,
}

/// Owns the single active acquisition mode and everything it writes to.
///
/// All window mutation happens on the thread that calls [`poll`](Self::poll);
/// the network reader only hands records over through a channel.
pub struct AcquisitionController<R: Renderer> {
    registry: SensorRegistry,
    session: Session,
    window: SlidingWindow,
    renderer: R,
    feed: NetworkSampleSource,
    feed_rx: Option<Receiver<FeedEvent>>,
    pipeline: Option<ValuePipeline>,
    timer: Option<ReplayTimer>,
    style: StyleHint,
}

impl<R: Renderer> AcquisitionController<R> {
    pub fn new(
        config: &MonitorConfig,
        registry: SensorRegistry,
        renderer: R,
    ) -> Result<Self, AcquisitionError> {
        check_capacity(config.window_capacity as i64)?;
        Ok(Self {
            registry,
            session: Session {
                mode: AcquisitionMode::Idle,
                active_source: None,
                channel: config.channel,
                window_capacity: config.window_capacity,
                poll_interval: config.poll_interval(),
                custom_path: None,
                last_table: None,
            },
            window: SlidingWindow::with_capacity(config.window_capacity)?,
            renderer,
            feed: NetworkSampleSource::new(config.feed_timeouts()),
            feed_rx: None,
            pipeline: None,
            timer: None,
            style: StyleHint::default(),
        })
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.session.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn style(&self) -> &StyleHint {
        &self.style
    }

    /// Most recent live value that passed validation.
    pub fn last_value(&self) -> Option<f64> {
        self.pipeline.as_ref().and_then(|p| p.last_accepted())
    }

    pub fn snapshot(&self) -> WindowFrame {
        let period = match self.session.mode {
            AcquisitionMode::FileReplay => self.session.poll_interval.as_secs_f64(),
            _ => NETWORK_SAMPLE_PERIOD_SECS,
        };
        self.window.snapshot(period)
    }

    pub fn select_source_by_name(&mut self, name: &str) -> Result<(), AcquisitionError> {
        let source = self.registry.lookup(name)?.clone();
        self.select_source(source);
        Ok(())
    }

    /// Seeds the window from the source's log once, then follows its live feed.
    pub fn select_source(&mut self, source: SourceDescriptor) {
        self.stop();
        self.reset_window();
        let plan = ReplayPlan {
            path: source.log_path.clone(),
            channel: source.channel_index,
            capacity: self.session.window_capacity,
        };
        self.style = source.style();
        if !self.reload(&plan) {
            info!("{}: no log history, waiting for live values", source.name);
        }

        let (tx, rx) = channel();
        self.feed.start(&source.host, source.port, tx);
        self.feed_rx = Some(rx);
        self.pipeline = Some(ValuePipeline::for_source(&source));
        info!("{}: streaming from {}", source.name, source.addr());
        self.session.channel = source.channel_index;
        self.session.active_source = Some(source);
        self.session.mode = AcquisitionMode::NetworkStream;
    }

    /// Replays `path` in full every poll interval.
    pub fn select_custom_file(
        &mut self,
        path: &Path,
        channel: i64,
    ) -> Result<(), AcquisitionError> {
        let channel = check_channel(channel)?;
        self.stop();
        self.reset_window();
        let plan = ReplayPlan {
            path: path.to_path_buf(),
            channel,
            capacity: self.session.window_capacity,
        };
        self.style = StyleHint {
            label: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| StyleHint::default().label),
            ..StyleHint::default()
        };
        self.session.channel = channel;
        self.session.custom_path = Some(path.to_path_buf());
        self.session.mode = AcquisitionMode::FileReplay;
        self.reload(&plan);
        info!(
            "replaying {} channel {channel} every {:?}",
            path.display(),
            self.session.poll_interval
        );
        self.timer = Some(ReplayTimer {
            plan,
            period: self.session.poll_interval,
            next_due: Instant::now() + self.session.poll_interval,
        });
        Ok(())
    }

    /// Resizes the window. Out-of-range requests leave everything as it was.
    pub fn set_window_capacity(&mut self, n: i64) -> Result<(), AcquisitionError> {
        let capacity = check_capacity(n)?;
        self.session.window_capacity = capacity;
        info!("window capacity set to {capacity}");
        match self.session.mode {
            AcquisitionMode::NetworkStream => {
                if let Some(source) = self.session.active_source.clone() {
                    self.select_source(source);
                }
            }
            AcquisitionMode::FileReplay => {
                self.reset_window();
                let plan = self.timer.as_mut().map(|timer| {
                    timer.plan.capacity = capacity;
                    timer.plan.clone()
                });
                if !plan.is_some_and(|plan| self.reload(&plan)) {
                    self.redraw();
                }
            }
            AcquisitionMode::Idle => self.reset_window(),
        }
        Ok(())
    }

    pub fn set_channel(&mut self, c: i64) -> Result<(), AcquisitionError> {
        let channel = check_channel(c)?;
        match self.session.mode {
            AcquisitionMode::NetworkStream => {
                Err(AcquisitionError::ChannelFixed(self.session.mode))
            }
            AcquisitionMode::FileReplay => {
                if let Some(timer) = self.timer.as_mut() {
                    timer.plan.channel = channel;
                }
                self.session.channel = channel;
                info!("channel set to {channel}");
                Ok(())
            }
            AcquisitionMode::Idle => {
                self.session.channel = channel;
                Ok(())
            }
        }
    }

    /// Tears down whatever is running and clears the window. Idempotent.
    pub fn stop(&mut self) {
        if self.session.mode == AcquisitionMode::Idle
            && self.timer.is_none()
            && !self.feed.is_running()
            && self.window.is_empty()
            && self.session.active_source.is_none()
        {
            return;
        }
        // Disarm first so no tick can land on a cleared session.
        self.timer = None;
        self.feed.stop();
        self.feed_rx = None;
        self.pipeline = None;
        self.window.clear();
        self.session.mode = AcquisitionMode::Idle;
        self.session.active_source = None;
        self.session.custom_path = None;
        self.session.last_table = None;
        self.renderer.clear();
        debug!("acquisition stopped");
    }

    /// Foreground pump: applies queued network records and fires a due replay tick.
    ///
    /// Returns true when the renderer was updated.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut rendered = false;
        for event in self.drain_feed() {
            match event {
                FeedEvent::Line(record) => rendered |= self.on_record(&record),
                FeedEvent::Error(e) if e.is_transport() => {
                    warn!("live feed ended: {e}");
                    self.halt_feed();
                    break;
                }
                FeedEvent::Error(e) => warn!("live feed: {e}"),
            }
        }

        let due_plan = match self.timer.as_mut() {
            Some(timer) if now >= timer.next_due => {
                timer.next_due = now + timer.period;
                Some(timer.plan.clone())
            }
            _ => None,
        };
        if let Some(plan) = due_plan {
            rendered |= self.reload(&plan);
        }
        rendered
    }

    fn drain_feed(&mut self) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        if let Some(rx) = &self.feed_rx {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        events
    }

    fn on_record(&mut self, record: &str) -> bool {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return false;
        };
        match pipeline.process(record) {
            Some(value) => {
                self.window.push(value);
                self.redraw();
                true
            }
            None => false,
        }
    }

    // Reader is gone; keep the last window on screen.
    fn halt_feed(&mut self) {
        self.feed.stop();
        self.feed_rx = None;
        self.pipeline = None;
        self.session.mode = AcquisitionMode::Idle;
    }

    fn reload(&mut self, plan: &ReplayPlan) -> bool {
        match LogTable::read(&plan.path) {
            Ok(table) => {
                let values = table.tail_column(plan.channel, plan.capacity);
                self.window.load_all(&values);
                self.session.last_table = Some(table);
                self.redraw();
                debug!("reloaded {} values from {}", values.len(), plan.path.display());
                true
            }
            Err(e) => {
                warn!("{e}; keeping previous window");
                false
            }
        }
    }

    fn reset_window(&mut self) {
        // Capacity was validated on the way in.
        if let Err(e) = self.window.reset(self.session.window_capacity as i64) {
            warn!("{e}");
        }
    }

    fn redraw(&mut self) {
        let frame = self.snapshot();
        self.renderer.clear();
        self.renderer.render(&frame.xs, &frame.ys, &self.style);
    }
}

impl<R: Renderer> Drop for AcquisitionController<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn check_capacity(n: i64) -> Result<usize, AcquisitionError> {
    if n > 0 && n < MAX_WINDOW_CAPACITY as i64 {
        Ok(n as usize)
    } else {
        Err(AcquisitionError::InvalidCapacity {
            requested: n,
            max: MAX_WINDOW_CAPACITY,
        })
    }
}

fn check_channel(c: i64) -> Result<usize, AcquisitionError> {
    match c {
        0 | 1 => Ok(c as usize),
        _ => Err(AcquisitionError::InvalidChannel(c)),
    }
}
