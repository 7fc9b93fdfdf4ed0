// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! DMI machine identification and the per-model capability table.

use std::{fs, io};

use crate::backlight::LcdFlavor;
use crate::input::InputGeneration;

const DMI_SYS_VENDOR: &str = "/sys/class/dmi/id/sys_vendor";
const DMI_PRODUCT_NAME: &str = "/sys/class/dmi/id/product_name";

const APPLE_VENDORS: &[&str] = &["Apple Computer, Inc.", "Apple Inc."];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Machine {
    /// MacBookPro1,1 / MacBookPro1,2 (Core Duo)
    MacBookPro1,
    /// MacBookPro2,1 / MacBookPro2,2 (Core2 Duo)
    MacBookPro2,
    /// MacBook1,1 (Core Duo)
    MacBook1,
    /// MacBook2,1 (Core2 Duo)
    MacBook2,
}

#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("root privileges required for DMI machine detection")]
    InsufficientPrivilege,
    #[error("failed to read {}: {}", _0, _1)]
    Dmi(&'static str, io::Error),
    #[error("unknown vendor '{}'", _0)]
    UnknownVendor(String),
    #[error("unknown Apple machine '{}'", _0)]
    UnknownModel(String),
}

/// The operations bundle selected for a recognized machine. Lookup is
/// total over `Machine`: unrecognized hardware never makes it this far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DriverBundle {
    pub lcd:   LcdFlavor,
    pub input: InputGeneration,
}

pub fn driver_bundle(machine: Machine) -> DriverBundle {
    match machine {
        Machine::MacBookPro1 => {
            DriverBundle { lcd: LcdFlavor::SysfsRadeon, input: InputGeneration::Geyser3 }
        }
        Machine::MacBookPro2 => {
            DriverBundle { lcd: LcdFlavor::SysfsRadeon, input: InputGeneration::Geyser4 }
        }
        Machine::MacBook1 => {
            DriverBundle { lcd: LcdFlavor::Gma950, input: InputGeneration::Geyser3 }
        }
        Machine::MacBook2 => {
            DriverBundle { lcd: LcdFlavor::Gma950, input: InputGeneration::Geyser4 }
        }
    }
}

/// Identifies the machine from the DMI tables. The vendor string is
/// checked first; on a foreign vendor the model is never queried.
pub fn identify() -> Result<Machine, MachineError> {
    if unsafe { libc::geteuid() } != 0 {
        return Err(MachineError::InsufficientPrivilege);
    }

    let vendor = read_dmi(DMI_SYS_VENDOR)?;
    log::debug!("DMI system vendor: [{}]", vendor.trim());

    let machine = classify(&vendor, || {
        let product = read_dmi(DMI_PRODUCT_NAME)?;
        log::debug!("DMI product name: [{}]", product.trim());
        Ok(product)
    })?;

    log::info!("DMI machine check: running on a {:?}", machine);

    Ok(machine)
}

fn read_dmi(path: &'static str) -> Result<String, MachineError> {
    fs::read_to_string(path).map_err(|why| MachineError::Dmi(path, why))
}

fn classify<F>(vendor: &str, model: F) -> Result<Machine, MachineError>
where
    F: FnOnce() -> Result<String, MachineError>,
{
    if !APPLE_VENDORS.contains(&vendor.trim()) {
        return Err(MachineError::UnknownVendor(vendor.trim().to_owned()));
    }

    let model = model()?;

    match model.trim() {
        "MacBookPro1,1" | "MacBookPro1,2" => Ok(Machine::MacBookPro1),
        "MacBookPro2,1" | "MacBookPro2,2" => Ok(Machine::MacBookPro2),
        "MacBook1,1" => Ok(Machine::MacBook1),
        "MacBook2,1" => Ok(Machine::MacBook2),
        other => Err(MachineError::UnknownModel(other.to_owned())),
    }
}
