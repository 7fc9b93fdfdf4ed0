// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! Daemon context and the main event loop.

use std::{
    fs, process,
    process::Command,
    time::{Duration, Instant},
};

use crate::backlight::{BacklightError, Direction, LcdBacklight};
use crate::config::Config;
use crate::input::{EventSources, HotkeyEvent, InputError, SourceSet, WaitOutcome};
use crate::kbd_backlight::KbdBacklight;
use crate::machine::{self, MachineError};
use crate::notify::NotifySink;
use crate::signals;

const PIDFILE: &str = "/run/mbp-hotkeyd.pid";

/// Poll timeout of the main loop; also the ambient check cadence.
pub const LOOP_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("machine identification failed: {}", _0)]
    Machine(#[from] MachineError),
    #[error("no LCD backlight found: {}", _0)]
    Backlight(#[from] BacklightError),
    #[error(transparent)]
    Input(#[from] InputError),
}

pub struct Daemon<S: SourceSet = EventSources> {
    lcd:     LcdBacklight,
    kbd:     Option<KbdBacklight>,
    sources: S,
    notify:  NotifySink,
}

impl Daemon {
    /// Startup sequence: identify the machine, select its driver
    /// bundle, probe the backlight, open the event sources. Any
    /// failure here is fatal; the process has nothing to do without
    /// a recognized machine, a working backlight and input events.
    pub fn new(config: &Config) -> Result<Self, DaemonError> {
        let machine = machine::identify()?;
        let bundle = machine::driver_bundle(machine);

        let lcd = LcdBacklight::probe(bundle.lcd, &config.lcd)?;
        let sources = EventSources::open(bundle.input)?;
        let kbd = KbdBacklight::probe(&config.kbd);

        log::info!("multiplexing {} event source(s)", sources.len());

        Ok(Self { lcd, kbd, sources, notify: NotifySink::new() })
    }
}

impl<S: SourceSet> Daemon<S> {
    pub fn run(&mut self) -> Result<(), DaemonError> {
        signals::install();
        write_pidfile();

        let result = self.event_loop();
        remove_pidfile();
        result
    }

    /// One wait per iteration. A degraded set is reopened wholesale at
    /// the next entry; a reopen that finds zero usable sources ends
    /// the loop with its error.
    fn event_loop(&mut self) -> Result<(), DaemonError> {
        let mut ambient = AmbientTimer::new(LOOP_TIMEOUT);
        let mut reopen = false;

        while signals::running() {
            // Event devices typically vanish across suspend/resume.
            if reopen {
                self.sources.reopen()?;
                reopen = false;
            }

            match self.sources.wait(LOOP_TIMEOUT)? {
                WaitOutcome::Interrupted => (),
                WaitOutcome::Degraded => reopen = true,
                WaitOutcome::TimedOut => {
                    if self.auto_kbd_enabled() {
                        self.ambient_check();
                        ambient.reset(Instant::now());
                    }
                }
                WaitOutcome::Ready => {
                    for event in self.sources.drain() {
                        self.dispatch(event);
                    }

                    if self.auto_kbd_enabled() && ambient.fire(Instant::now()) {
                        self.ambient_check();
                    }
                }
            }
        }

        Ok(())
    }

    fn dispatch(&mut self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::BrightnessUp => self.step_lcd(Direction::Up),
            HotkeyEvent::BrightnessDown => self.step_lcd(Direction::Down),
            HotkeyEvent::KbdIllumUp => self.step_kbd(Direction::Up),
            HotkeyEvent::KbdIllumDown => self.step_kbd(Direction::Down),
            HotkeyEvent::KbdIllumToggle => {
                if let Some(kbd) = &mut self.kbd {
                    if let Some(change) = kbd.toggle() {
                        self.notify.send("kbd", change);
                    }
                }
            }
            HotkeyEvent::Eject => eject_cd(),
        }
    }

    fn step_lcd(&mut self, direction: Direction) {
        if let Some(change) = self.lcd.step(direction) {
            self.notify.send("lcd", change);
        }
    }

    fn step_kbd(&mut self, direction: Direction) {
        if let Some(kbd) = &mut self.kbd {
            if let Some(change) = kbd.step(direction) {
                self.notify.send("kbd", change);
            }
        }
    }

    fn auto_kbd_enabled(&self) -> bool {
        self.kbd.as_ref().map_or(false, KbdBacklight::auto_enabled)
    }

    fn ambient_check(&mut self) {
        if let Some(kbd) = &mut self.kbd {
            if let Some(change) = kbd.ambient_check() {
                self.notify.send("kbd", change);
            }
        }
    }
}

fn eject_cd() {
    // SIGCHLD is ignored, so the kernel reaps the child.
    if let Err(why) = Command::new("eject").spawn() {
        log::warn!("could not spawn eject: {}", why);
    }
}

fn write_pidfile() {
    if let Err(why) = fs::write(PIDFILE, format!("{}\n", process::id())) {
        log::warn!("could not write pidfile {}: {}", PIDFILE, why);
    }
}

fn remove_pidfile() { let _ = fs::remove_file(PIDFILE); }

/// Monotonic debounce for the ambient light check: at most one check
/// per poll-timeout interval.
pub(crate) struct AmbientTimer {
    last:     Instant,
    interval: Duration,
}

impl AmbientTimer {
    pub fn new(interval: Duration) -> Self { Self { last: Instant::now(), interval } }

    /// True when a full interval has elapsed; arms the next interval.
    pub fn fire(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }

    /// Restarts the interval without firing, after an out-of-band check.
    pub fn reset(&mut self, now: Instant) { self.last = now; }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::path::Path;

    use crate::backlight::sysfs::SysfsBacklight;
    use crate::backlight::LcdDriver;
    use crate::config::LcdConfig;

    struct ScriptedSources {
        waits:        VecDeque<Result<WaitOutcome, InputError>>,
        reopens:      VecDeque<Result<(), InputError>>,
        reopen_count: usize,
    }

    impl SourceSet for ScriptedSources {
        fn wait(&mut self, _timeout: Duration) -> Result<WaitOutcome, InputError> {
            self.waits.pop_front().expect("wait past end of script")
        }

        fn reopen(&mut self) -> Result<(), InputError> {
            self.reopen_count += 1;
            self.reopens.pop_front().expect("reopen past end of script")
        }

        fn drain(&mut self) -> Vec<HotkeyEvent> { Vec::new() }
    }

    fn scripted_daemon(dir: &Path, sources: ScriptedSources) -> Daemon<ScriptedSources> {
        fs::write(dir.join("brightness"), "100").unwrap();
        fs::write(dir.join("actual_brightness"), "100").unwrap();
        fs::write(dir.join("max_brightness"), "255").unwrap();

        let driver = LcdDriver::Sysfs(SysfsBacklight::probe_dir(dir.to_path_buf()).unwrap());
        let lcd = LcdBacklight::initialize(driver, &LcdConfig::default());

        Daemon { lcd, kbd: None, sources, notify: NotifySink::new() }
    }

    #[test]
    fn degraded_set_is_reopened_and_the_loop_continues() {
        let dir = tempfile::tempdir().unwrap();
        let sources = ScriptedSources {
            waits:        VecDeque::from([
                Ok(WaitOutcome::Degraded),
                Err(InputError::Poll(io::Error::other("poll failed"))),
            ]),
            reopens:      VecDeque::from([Ok(())]),
            reopen_count: 0,
        };

        let mut daemon = scripted_daemon(dir.path(), sources);
        let result = daemon.event_loop();

        // the set was reopened once, then the loop polled again
        assert_eq!(daemon.sources.reopen_count, 1);
        assert!(matches!(result, Err(DaemonError::Input(InputError::Poll(_)))));
    }

    #[test]
    fn empty_set_after_reopen_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let sources = ScriptedSources {
            waits:        VecDeque::from([Ok(WaitOutcome::Degraded)]),
            reopens:      VecDeque::from([Err(InputError::NoDevices)]),
            reopen_count: 0,
        };

        let mut daemon = scripted_daemon(dir.path(), sources);
        let result = daemon.event_loop();

        assert_eq!(daemon.sources.reopen_count, 1);
        assert!(matches!(result, Err(DaemonError::Input(InputError::NoDevices))));
    }

    #[test]
    fn debounce_suppresses_checks_within_the_interval() {
        let base = Instant::now();
        let mut timer = AmbientTimer { last: base, interval: Duration::from_millis(200) };

        assert!(!timer.fire(base + Duration::from_millis(50)));
        assert!(!timer.fire(base + Duration::from_millis(199)));
        assert!(timer.fire(base + Duration::from_millis(200)));
    }

    #[test]
    fn debounce_rearms_after_firing() {
        let base = Instant::now();
        let mut timer = AmbientTimer { last: base, interval: Duration::from_millis(200) };

        assert!(timer.fire(base + Duration::from_millis(300)));
        // armed from the fire at +300ms
        assert!(!timer.fire(base + Duration::from_millis(400)));
        assert!(timer.fire(base + Duration::from_millis(500)));
    }

    #[test]
    fn reset_restarts_the_interval() {
        let base = Instant::now();
        let mut timer = AmbientTimer { last: base, interval: Duration::from_millis(200) };

        timer.reset(base + Duration::from_millis(190));
        assert!(!timer.fire(base + Duration::from_millis(380)));
        assert!(timer.fire(base + Duration::from_millis(390)));
    }
}
