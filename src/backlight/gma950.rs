// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! Intel GMA950 backlight through the BLC PWM control register.
//!
//! The register sits in the IGD's MMIO space at `BLC_PWM_CTL`; bits
//! 31:17 hold the modulation ceiling (the maximum), bits 15:0 the
//! current duty cycle. The MMIO base comes from the device's sysfs
//! `resource` file and the register is accessed through /dev/mem.

use std::{
    fs,
    io::{self, Read, Seek, Write},
    path::Path,
};

use super::{probe_error, BacklightError};

const PCI_RESOURCE: &str = "/sys/bus/pci/devices/0000:00:02.0/resource";
const DEV_MEM: &str = "/dev/mem";
const BLC_PWM_CTL: u64 = 0x0006_1254;

pub struct Gma950Backlight {
    mem:      fs::File,
    register: u64,
    max:      u32,
}

impl Gma950Backlight {
    pub fn probe() -> Result<Self, BacklightError> {
        Self::probe_paths(Path::new(PCI_RESOURCE), Path::new(DEV_MEM))
    }

    pub(crate) fn probe_paths(resource: &Path, mem_path: &Path) -> Result<Self, BacklightError> {
        let base = mmio_base(resource)?;
        let register = base + BLC_PWM_CTL;

        // set() writes through this handle; both directions are
        // checked here, not at the first failing step
        let mut mem = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(mem_path)
            .map_err(|why| probe_error(mem_path, why))?;

        let value =
            read_register(&mut mem, register).map_err(|why| probe_error(mem_path, why))?;

        let max = ceiling(value);
        if max == 0 {
            return Err(BacklightError::NotFound(format!(
                "BLC PWM register at {:#x} reports no modulation ceiling",
                register
            )));
        }

        Ok(Self { mem, register, max })
    }

    pub fn get(&mut self) -> u32 {
        match read_register(&mut self.mem, self.register) {
            Ok(value) => duty(value),
            Err(why) => {
                log::warn!("could not read BLC PWM register: {}", why);
                0
            }
        }
    }

    pub fn set(&mut self, value: u32) -> bool {
        let encoded = encode(self.max, value);
        match write_register(&mut self.mem, self.register, encoded) {
            Ok(()) => true,
            Err(why) => {
                log::warn!("could not write BLC PWM register: {}", why);
                false
            }
        }
    }

    pub fn max(&self) -> u32 { self.max }
}

/// First BAR start address from a sysfs PCI `resource` file.
fn mmio_base(resource: &Path) -> Result<u64, BacklightError> {
    let text = fs::read_to_string(resource).map_err(|why| probe_error(resource, why))?;

    let base = text
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .and_then(|start| u64::from_str_radix(start.trim_start_matches("0x"), 16).ok())
        .unwrap_or(0);

    if base == 0 {
        return Err(BacklightError::NotFound(resource.display().to_string()));
    }

    Ok(base)
}

fn read_register(mem: &mut fs::File, address: u64) -> io::Result<u32> {
    mem.seek(io::SeekFrom::Start(address))?;

    let mut buffer = [0; 4];
    mem.read_exact(&mut buffer)?;
    Ok(u32::from_ne_bytes(buffer))
}

fn write_register(mem: &mut fs::File, address: u64, value: u32) -> io::Result<()> {
    mem.seek(io::SeekFrom::Start(address))?;
    mem.write_all(&value.to_ne_bytes())
}

fn duty(register: u32) -> u32 { register & 0xFFFF }

fn ceiling(register: u32) -> u32 { register >> 17 }

fn encode(max: u32, value: u32) -> u32 { (max << 17) | (value & 0xFFFF) }
