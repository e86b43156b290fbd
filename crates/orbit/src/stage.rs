use crate::config::{self, Config, ConfigError};
use crate::events::AppEvent;
use crate::reveal::{self, MountLatch, RevealController, RevealStyle};
use crate::ring::{Frame, Ring};
use async_channel::Receiver;
use serde::Serialize;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub struct Section {
    pub title: String,
    pub ring: Ring,
    pub reveal: RevealController,
    pub mount: MountLatch,
    /// Whether the last emitted frame carried the shown reveal style.
    shown: bool,
}

impl Section {
    fn new(title: &str, ring: Ring, reveal: RevealController) -> Self {
        Self {
            title: title.to_string(),
            ring,
            reveal,
            mount: MountLatch::default(),
            shown: false,
        }
    }

    /// The reveal delay ran out, or the style flipped, since the last emit.
    fn reveal_outdated(&self, now: Duration) -> bool {
        self.reveal.is_shown(now) != self.shown
    }
}

/// One emitted line: a section's ring frame plus its page-level state.
#[derive(Debug, Serialize)]
pub struct SectionFrame<'a> {
    pub section: usize,
    pub title: &'a str,
    pub focused: bool,
    pub mounted: bool,
    pub reveal: RevealStyle,
    #[serde(flatten)]
    pub frame: Frame,
}

/// Every configured ring, routing input to the focused one and writing a JSON
/// frame per changed section.
pub struct Stage<W: Write> {
    sections: Vec<Section>,
    focus: usize,
    out: W,
}

impl<W: Write> Stage<W> {
    pub fn from_config(config: &Config, out: W) -> Self {
        let sections = config
            .sections
            .iter()
            .map(|cfg| {
                Section::new(
                    &cfg.title,
                    Ring::new(cfg.images.clone(), cfg.settings(&config.ring)),
                    RevealController::new(config.reveal.clone()),
                )
            })
            .collect();

        Self {
            sections,
            focus: 0,
            out,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: AppEvent, now: Duration) -> std::io::Result<()> {
        match event {
            AppEvent::Focus(index) => {
                if index >= self.sections.len() {
                    log::warn!("No section {} to focus", index);
                    return Ok(());
                }
                if index == self.focus {
                    return Ok(());
                }
                let previous = std::mem::replace(&mut self.focus, index);
                self.emit(previous, now)?;
                self.emit(index, now)
            }
            AppEvent::Resize(width) => {
                let changed: Vec<usize> = self
                    .sections
                    .iter_mut()
                    .enumerate()
                    .filter_map(|(i, s)| s.ring.resize(width).then_some(i))
                    .collect();
                changed.into_iter().try_for_each(|i| self.emit(i, now))
            }
            AppEvent::Visibility { section, ratio } => {
                let Some(s) = self.sections.get_mut(section) else {
                    log::warn!("Visibility for unknown section {}", section);
                    return Ok(());
                };
                let latched = s.mount.observe(ratio.is_finite() && ratio > 0.0);
                let flipped = s.reveal.observe(ratio, now);
                if latched {
                    log::debug!("Mounted section '{}'", s.title);
                }
                if latched || flipped {
                    self.emit(section, now)?;
                }
                Ok(())
            }
            AppEvent::ConfigReload => Ok(()),
            input => self.route(input, now),
        }
    }

    fn route(&mut self, input: AppEvent, now: Duration) -> std::io::Result<()> {
        let focus = self.focus;
        let Some(section) = self.sections.get_mut(focus) else {
            return Ok(());
        };
        if !section.mount.is_mounted() {
            log::debug!("Ignoring {} for unmounted section '{}'", input, section.title);
            return Ok(());
        }

        let ring = &mut section.ring;
        let changed = match input {
            AppEvent::PointerDown(x) => ring.pointer_down(x),
            AppEvent::PointerMove(x) => ring.pointer_move(x),
            AppEvent::PointerUp => ring.pointer_up(),
            AppEvent::PointerCancel => ring.pointer_cancel(),
            AppEvent::Key(action) => ring.key(action),
            AppEvent::KeyRelease => ring.key_release(),
            _ => false,
        };
        if changed {
            self.emit(focus, now)?;
        }
        Ok(())
    }

    pub fn tick(&mut self, dt: Duration, now: Duration) -> std::io::Result<()> {
        let mut dirty = Vec::new();
        for (i, section) in self.sections.iter_mut().enumerate() {
            let animated = section.mount.is_mounted() && section.ring.tick(dt);
            if animated || section.reveal.is_pending(now) || section.reveal_outdated(now) {
                dirty.push(i);
            }
        }
        dirty.into_iter().try_for_each(|i| self.emit(i, now))
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        self.sections.iter().any(|s| {
            (s.mount.is_mounted() && s.ring.is_animating())
                || s.reveal.is_pending(now)
                || s.reveal_outdated(now)
        })
    }

    /// Rebuilds sections from a new config, keeping rotation and mount state by position.
    pub fn reconfigure(&mut self, config: &Config, now: Duration) -> std::io::Result<()> {
        let mut old = std::mem::take(&mut self.sections).into_iter();
        self.sections = config
            .sections
            .iter()
            .map(|cfg| {
                let settings = cfg.settings(&config.ring);
                match old.next() {
                    Some(mut section) => {
                        section.title = cfg.title.clone();
                        section.ring.reconfigure(cfg.images.clone(), settings);
                        section.reveal = RevealController::new(config.reveal.clone());
                        if section.mount.is_mounted() {
                            section.reveal.observe(1.0, now);
                        }
                        section
                    }
                    None => Section::new(
                        &cfg.title,
                        Ring::new(cfg.images.clone(), settings),
                        RevealController::new(config.reveal.clone()),
                    ),
                }
            })
            .collect();

        if self.focus >= self.sections.len() {
            self.focus = 0;
        }
        self.emit_all(now)
    }

    /// Applies a freshly loaded config; a failed load keeps the current sections.
    pub fn reload(
        &mut self,
        loaded: Result<Config, ConfigError>,
        now: Duration,
    ) -> std::io::Result<()> {
        match loaded {
            Ok(config) => {
                self.reconfigure(&config, now)?;
                log::info!("Configuration reloaded ({} sections)", self.sections.len());
            }
            Err(e) => log::error!("Failed to reload config: {}", e),
        }
        Ok(())
    }

    pub fn emit_all(&mut self, now: Duration) -> std::io::Result<()> {
        (0..self.sections.len()).try_for_each(|i| self.emit(i, now))
    }

    fn emit(&mut self, index: usize, now: Duration) -> std::io::Result<()> {
        let Some(section) = self.sections.get_mut(index) else {
            return Ok(());
        };
        section.shown = section.reveal.is_shown(now);
        let mounted = section.mount.is_mounted();
        let mut frame = section.ring.frame();
        if !mounted {
            frame.panels.clear();
            frame.frontmost = None;
        }
        let line = SectionFrame {
            section: index,
            title: &section.title,
            focused: index == self.focus,
            mounted,
            reveal: section.reveal.style(now),
            frame,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// Drives the stage from incoming events, ticking at `FRAME_INTERVAL` while anything moves.
pub async fn run<W: Write>(
    config: Config,
    rx: Receiver<AppEvent>,
    out: W,
) -> anyhow::Result<()> {
    log::debug!(
        "Report visibility at ratios {:?}",
        reveal::thresholds(config.reveal.show_ratio())
    );
    let started = Instant::now();
    let mut stage = Stage::from_config(&config, out);
    stage.emit_all(Duration::ZERO)?;

    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        let event = if stage.is_animating(started.elapsed()) {
            tokio::select! {
                event = rx.recv() => event,
                _ = frames.tick() => {
                    let dt = last_tick.elapsed();
                    last_tick = Instant::now();
                    stage.tick(dt, started.elapsed())?;
                    continue;
                }
            }
        } else {
            let event = rx.recv().await;
            last_tick = Instant::now();
            frames.reset();
            event
        };

        let Ok(event) = event else {
            log::info!("Event channel closed, stopping");
            return Ok(());
        };

        let now = started.elapsed();
        match event {
            AppEvent::ConfigReload => stage.reload(config::load_config(), now)?,
            event => stage.handle(event, now)?,
        }
    }
}
