// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! Radeon X1600 backlight through the kernel backlight class.

use std::{fs, path::PathBuf};

use super::{probe_error, BacklightError};
use crate::util::{parse_file, write_file};

const SYSFS_DIR: &str = "/sys/class/backlight/radeonbl0";

pub struct SysfsBacklight {
    dir: PathBuf,
    max: u32,
}

impl SysfsBacklight {
    pub fn probe() -> Result<Self, BacklightError> { Self::probe_dir(PathBuf::from(SYSFS_DIR)) }

    pub(crate) fn probe_dir(dir: PathBuf) -> Result<Self, BacklightError> {
        // brightness must be writable, actual_brightness readable
        let brightness = dir.join("brightness");
        if let Err(why) = fs::OpenOptions::new().append(true).open(&brightness) {
            log::debug!("failed to access brightness node: {}", why);
            return Err(probe_error(&brightness, why));
        }

        let actual = dir.join("actual_brightness");
        if let Err(why) = fs::File::open(&actual) {
            log::debug!("failed to access actual_brightness node: {}", why);
            return Err(probe_error(&actual, why));
        }

        let max_node = dir.join("max_brightness");
        let max = parse_file(&max_node).map_err(|why| probe_error(&max_node, why))?;

        Ok(Self { dir, max })
    }

    pub fn get(&self) -> u32 {
        match parse_file(self.dir.join("actual_brightness")) {
            Ok(value) => value,
            Err(why) => {
                log::warn!("could not read sysfs actual_brightness node: {}", why);
                0
            }
        }
    }

    pub fn set(&self, value: u32) -> bool {
        match write_file(self.dir.join("brightness"), value) {
            Ok(()) => true,
            Err(why) => {
                log::warn!("could not write sysfs brightness node: {}", why);
                false
            }
        }
    }

    pub fn max(&self) -> u32 { self.max }
}
