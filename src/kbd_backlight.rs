// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! Keyboard backlight LED with ambient-light-driven auto adjustment.
//!
//! Unlike the LCD backlight, this one is optional: machines without the
//! SMC LED node keep full hotkey handling, minus illumination keys.

use std::path::{Path, PathBuf};

use crate::backlight::{Direction, StepChange};
use crate::config::KbdConfig;
use crate::util::{parse_file, write_file};

const LED_DIR: &str = "/sys/class/leds/smc::kbd_backlight";
const AMBIENT_SENSOR: &str = "/sys/devices/platform/applesmc.768/light";

pub struct KbdBacklight {
    led:    PathBuf,
    sensor: Option<PathBuf>,
    max:    u32,
    level:  u32,
    /// Level to restore on toggle.
    saved:  u32,
    /// Set while the ambient logic has the light on; it only ever
    /// undoes what it set itself.
    auto_lit: bool,

    auto_on:      bool,
    step:         u32,
    on_threshold: u32,
    on_level:     u32,
}

impl KbdBacklight {
    pub fn probe(config: &KbdConfig) -> Option<Self> {
        Self::probe_paths(PathBuf::from(LED_DIR), PathBuf::from(AMBIENT_SENSOR), config)
    }

    pub(crate) fn probe_paths(led: PathBuf, sensor: PathBuf, config: &KbdConfig) -> Option<Self> {
        let max: u32 = match parse_file(led.join("max_brightness")) {
            Ok(max) => max,
            Err(why) => {
                log::info!("no keyboard backlight found: {}", why);
                return None;
            }
        };

        let level = parse_file(led.join("brightness")).unwrap_or(0);

        let sensor = if sensor.exists() {
            Some(sensor)
        } else {
            log::info!("no ambient light sensor found, auto adjustment disabled");
            None
        };

        // Same ordering constraint as the LCD config: limits depend on
        // the maximum the probe reports.
        let ceiling = (max / 2).max(1);
        let step = (config.step.max(1) as u32).min(ceiling);
        let on_level = (config.on_level.max(0) as u32).min(max);

        log::info!("keyboard backlight initialized at {}/{}", level, max);

        Some(Self {
            led,
            sensor,
            max,
            level,
            saved: 0,
            auto_lit: false,
            auto_on: config.auto_on,
            step,
            on_threshold: config.on_threshold,
            on_level,
        })
    }

    pub fn auto_enabled(&self) -> bool { self.auto_on && self.sensor.is_some() }

    pub fn step(&mut self, direction: Direction) -> Option<StepChange> {
        let old = self.get();
        let new = crate::backlight::step_value(old, self.step, direction, self.max, 0);

        log::debug!("kbd stepping {:?} {} -> {}", direction, old, new);

        if !self.set(new) {
            return None;
        }

        // A manual adjustment takes the light away from the auto logic.
        self.auto_lit = false;
        self.level = new;
        Some(StepChange { old, new })
    }

    pub fn toggle(&mut self) -> Option<StepChange> {
        let old = self.level;
        let new = if old > 0 {
            0
        } else if self.saved > 0 {
            self.saved
        } else {
            self.on_level
        };

        if !self.set(new) {
            return None;
        }

        // State, the saved restore level included, only moves once the
        // hardware write went through.
        if old > 0 {
            self.saved = old;
        }
        self.auto_lit = false;
        self.level = new;
        Some(StepChange { old, new })
    }

    /// Debounced ambient check; fires from the main loop at most once
    /// per poll-timeout interval.
    pub fn ambient_check(&mut self) -> Option<StepChange> {
        let sensor = self.sensor.as_deref()?;

        let lux = match read_ambient(sensor) {
            Some(lux) => lux,
            None => {
                log::debug!("could not read ambient light sensor");
                return None;
            }
        };

        let target = auto_target(lux, self.on_threshold, self.level, self.auto_lit, self.on_level)?;
        let old = self.level;

        log::debug!("ambient light {} lux, kbd {} -> {}", lux, old, target);

        if !self.set(target) {
            return None;
        }

        self.auto_lit = target > 0;
        self.level = target;
        Some(StepChange { old, new: target })
    }

    fn get(&self) -> u32 {
        match parse_file(self.led.join("brightness")) {
            Ok(value) => value,
            Err(why) => {
                log::warn!("could not read kbd brightness node: {}", why);
                0
            }
        }
    }

    fn set(&self, value: u32) -> bool {
        match write_file(self.led.join("brightness"), value) {
            Ok(()) => true,
            Err(why) => {
                log::warn!("could not write kbd brightness node: {}", why);
                false
            }
        }
    }
}

fn read_ambient(sensor: &Path) -> Option<u32> {
    parse_ambient(&std::fs::read_to_string(sensor).ok()?)
}

/// The applesmc light node reports `(left,right)` sensor values; only
/// the first one is meaningful on these machines.
fn parse_ambient(raw: &str) -> Option<u32> {
    raw.trim().trim_start_matches('(').split([',', ')']).next()?.trim().parse().ok()
}

fn auto_target(lux: u32, threshold: u32, level: u32, auto_lit: bool, on_level: u32) -> Option<u32> {
    if lux <= threshold && level == 0 {
        Some(on_level)
    } else if lux > threshold && auto_lit && level > 0 {
        Some(0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_applesmc_light_format() {
        assert_eq!(parse_ambient("(20,0)"), Some(20));
        assert_eq!(parse_ambient("(255,255)\n"), Some(255));
        assert_eq!(parse_ambient("(0,0)"), Some(0));
        assert_eq!(parse_ambient("garbage"), None);
        assert_eq!(parse_ambient(""), None);
    }

    #[test]
    fn auto_turns_on_in_the_dark() {
        assert_eq!(auto_target(5, 20, 0, false, 100), Some(100));
        assert_eq!(auto_target(20, 20, 0, false, 100), Some(100));
    }

    #[test]
    fn auto_only_undoes_its_own_level() {
        // lit by the user: bright ambient light must not turn it off
        assert_eq!(auto_target(200, 20, 150, false, 100), None);
        // lit by the auto logic: it may turn it back off
        assert_eq!(auto_target(200, 20, 100, true, 100), Some(0));
    }

    #[test]
    fn auto_is_quiescent_in_steady_state() {
        assert_eq!(auto_target(5, 20, 100, true, 100), None);
        assert_eq!(auto_target(200, 20, 0, false, 100), None);
    }

    #[test]
    fn probe_without_led_node_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("led");
        let sensor = dir.path().join("light");

        assert!(KbdBacklight::probe_paths(absent, sensor, &KbdConfig::default()).is_none());
    }

    #[test]
    fn probe_clamps_config_against_hardware_max() {
        let dir = tempfile::tempdir().unwrap();
        let led = dir.path().join("led");
        fs::create_dir(&led).unwrap();
        fs::write(led.join("max_brightness"), "255").unwrap();
        fs::write(led.join("brightness"), "0").unwrap();

        let config = KbdConfig { auto_on: true, step: 9999, on_threshold: 20, on_level: 9999 };
        let kbd =
            KbdBacklight::probe_paths(led, dir.path().join("light"), &config).unwrap();

        assert_eq!(kbd.step, 127);
        assert_eq!(kbd.on_level, 255);
        assert!(!kbd.auto_enabled());
    }

    #[test]
    fn toggle_restores_previous_level() {
        let dir = tempfile::tempdir().unwrap();
        let led = dir.path().join("led");
        fs::create_dir(&led).unwrap();
        fs::write(led.join("max_brightness"), "255").unwrap();
        fs::write(led.join("brightness"), "120").unwrap();

        let mut kbd = KbdBacklight::probe_paths(
            led.clone(),
            dir.path().join("light"),
            &KbdConfig::default(),
        )
        .unwrap();

        let off = kbd.toggle().unwrap();
        assert_eq!(off, StepChange { old: 120, new: 0 });
        assert_eq!(fs::read_to_string(led.join("brightness")).unwrap(), "0");

        let on = kbd.toggle().unwrap();
        assert_eq!(on, StepChange { old: 0, new: 120 });
        assert_eq!(fs::read_to_string(led.join("brightness")).unwrap(), "120");
    }

    #[test]
    fn failed_toggle_write_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let led = dir.path().join("led");
        fs::create_dir(&led).unwrap();
        fs::write(led.join("max_brightness"), "255").unwrap();
        fs::write(led.join("brightness"), "120").unwrap();

        let mut kbd = KbdBacklight::probe_paths(
            led.clone(),
            dir.path().join("light"),
            &KbdConfig::default(),
        )
        .unwrap();
        kbd.saved = 60;

        // writes to the node fail from here on
        fs::remove_file(led.join("brightness")).unwrap();
        fs::create_dir(led.join("brightness")).unwrap();

        assert!(kbd.toggle().is_none());
        assert_eq!(kbd.level, 120);
        assert_eq!(kbd.saved, 60);
    }
}
