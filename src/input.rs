// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! Hotkey event sources: evdev enumeration, classification and the
//! multiplexed wait.
//!
//! The device nodes cease to exist when suspending, so an error
//! condition on any member degrades the whole set; recovery is a
//! close-everything-reopen-everything affair because the device
//! enumeration itself has to be redone.

use std::{io, os::unix::io::AsRawFd, time::Duration};

use evdev::{Device, InputEventKind, Key};

const APPLE_USB_VENDOR: u16 = 0x05ac;

/// Internal keyboard generation, part of the machine's driver bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputGeneration {
    /// Geyser III (Core Duo machines)
    Geyser3,
    /// Geyser IV (Core2 Duo machines)
    Geyser4,
}

fn matches_ids(generation: InputGeneration, vendor: u16, product: u16) -> bool {
    if vendor != APPLE_USB_VENDOR {
        return false;
    }

    match generation {
        InputGeneration::Geyser3 => (0x0217..=0x0219).contains(&product),
        InputGeneration::Geyser4 => (0x021a..=0x021c).contains(&product),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HotkeyEvent {
    BrightnessUp,
    BrightnessDown,
    KbdIllumUp,
    KbdIllumDown,
    KbdIllumToggle,
    Eject,
}

fn map_key(key: Key) -> Option<HotkeyEvent> {
    match key {
        Key::KEY_BRIGHTNESSUP => Some(HotkeyEvent::BrightnessUp),
        Key::KEY_BRIGHTNESSDOWN => Some(HotkeyEvent::BrightnessDown),
        Key::KEY_KBDILLUMUP => Some(HotkeyEvent::KbdIllumUp),
        Key::KEY_KBDILLUMDOWN => Some(HotkeyEvent::KbdIllumDown),
        Key::KEY_KBDILLUMTOGGLE => Some(HotkeyEvent::KbdIllumToggle),
        Key::KEY_EJECTCD => Some(HotkeyEvent::Eject),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("no suitable event devices found")]
    NoDevices,
    #[error("poll failed: {}", _0)]
    Poll(io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// One or more sources have events pending.
    Ready,
    /// No events within the timeout.
    TimedOut,
    /// A source signaled error/hangup; the whole set wants a reopen.
    Degraded,
    /// A signal arrived during the wait.
    Interrupted,
}

/// What the main loop needs from a set of event sources.
pub trait SourceSet {
    /// Blocks until any source becomes readable, errors out or the
    /// timeout elapses.
    fn wait(&mut self, timeout: Duration) -> Result<WaitOutcome, InputError>;

    /// Closes every source and enumerates from scratch. Zero usable
    /// sources after a reopen is fatal to the caller.
    fn reopen(&mut self) -> Result<(), InputError>;

    /// Drains key events from every source the last wait reported
    /// ready.
    fn drain(&mut self) -> Vec<HotkeyEvent>;
}

pub struct EventSources {
    generation: InputGeneration,
    devices:    Vec<Device>,
    ready:      Vec<usize>,
}

impl EventSources {
    pub fn open(generation: InputGeneration) -> Result<Self, InputError> {
        let mut devices = Vec::new();

        for (path, device) in evdev::enumerate() {
            let id = device.input_id();
            if !matches_ids(generation, id.vendor(), id.product()) {
                continue;
            }

            if let Err(why) = set_nonblocking(&device) {
                log::warn!("skipping {}: {}", path.display(), why);
                continue;
            }

            log::info!(
                "using event device {} ({})",
                path.display(),
                device.name().unwrap_or("unnamed")
            );
            devices.push(device);
        }

        if devices.is_empty() {
            return Err(InputError::NoDevices);
        }

        Ok(Self { generation, devices, ready: Vec::new() })
    }

    pub fn len(&self) -> usize { self.devices.len() }

    pub fn is_empty(&self) -> bool { self.devices.is_empty() }
}

impl SourceSet for EventSources {
    fn reopen(&mut self) -> Result<(), InputError> {
        log::info!("reopening event devices");
        self.devices.clear();
        self.ready.clear();

        *self = Self::open(self.generation)?;
        Ok(())
    }

    /// The only suspension point in the process.
    fn wait(&mut self, timeout: Duration) -> Result<WaitOutcome, InputError> {
        let mut fds: Vec<libc::pollfd> = self
            .devices
            .iter()
            .map(|device| libc::pollfd {
                fd:      device.as_raw_fd(),
                events:  libc::POLLIN,
                revents: 0,
            })
            .collect();

        let ret = unsafe {
            libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout.as_millis() as libc::c_int)
        };

        if ret < 0 {
            let why = io::Error::last_os_error();
            if why.raw_os_error() == Some(libc::EINTR) {
                return Ok(WaitOutcome::Interrupted);
            }
            return Err(InputError::Poll(why));
        }

        if ret == 0 {
            return Ok(WaitOutcome::TimedOut);
        }

        let revents: Vec<libc::c_short> = fds.iter().map(|fd| fd.revents).collect();
        match scan_revents(&revents) {
            Scan::Degraded => {
                log::warn!("error condition signaled on event device, reopening");
                Ok(WaitOutcome::Degraded)
            }
            Scan::Ready(ready) => {
                self.ready = ready;
                Ok(WaitOutcome::Ready)
            }
        }
    }

    /// Press and autorepeat both count; releases do not.
    fn drain(&mut self) -> Vec<HotkeyEvent> {
        let ready = std::mem::take(&mut self.ready);
        let mut out = Vec::new();

        for index in ready {
            match self.devices[index].fetch_events() {
                Ok(events) => {
                    for event in events {
                        if let InputEventKind::Key(key) = event.kind() {
                            if event.value() == 1 || event.value() == 2 {
                                if let Some(hotkey) = map_key(key) {
                                    out.push(hotkey);
                                }
                            }
                        }
                    }
                }
                Err(why) if why.kind() == io::ErrorKind::WouldBlock => (),
                Err(why) => log::warn!("failed to read events: {}", why),
            }
        }

        out
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Scan {
    Degraded,
    Ready(Vec<usize>),
}

fn scan_revents(revents: &[libc::c_short]) -> Scan {
    let mut ready = Vec::new();

    for (index, &flags) in revents.iter().enumerate() {
        if flags & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Scan::Degraded;
        }

        if flags & libc::POLLIN != 0 {
            ready.push(index);
        }
    }

    Scan::Ready(ready)
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();

    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let ret = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geyser_generations_by_usb_id() {
        assert!(matches_ids(InputGeneration::Geyser3, 0x05ac, 0x0217));
        assert!(matches_ids(InputGeneration::Geyser3, 0x05ac, 0x0219));
        assert!(!matches_ids(InputGeneration::Geyser3, 0x05ac, 0x021a));

        assert!(matches_ids(InputGeneration::Geyser4, 0x05ac, 0x021a));
        assert!(matches_ids(InputGeneration::Geyser4, 0x05ac, 0x021c));
        assert!(!matches_ids(InputGeneration::Geyser4, 0x05ac, 0x0217));

        // right product, wrong vendor
        assert!(!matches_ids(InputGeneration::Geyser3, 0x046d, 0x0217));
    }

    #[test]
    fn hotkey_mapping() {
        assert_eq!(map_key(Key::KEY_BRIGHTNESSUP), Some(HotkeyEvent::BrightnessUp));
        assert_eq!(map_key(Key::KEY_BRIGHTNESSDOWN), Some(HotkeyEvent::BrightnessDown));
        assert_eq!(map_key(Key::KEY_KBDILLUMTOGGLE), Some(HotkeyEvent::KbdIllumToggle));
        assert_eq!(map_key(Key::KEY_EJECTCD), Some(HotkeyEvent::Eject));
        assert_eq!(map_key(Key::KEY_A), None);
    }

    #[test]
    fn hangup_on_any_source_degrades_the_set() {
        assert_eq!(scan_revents(&[libc::POLLIN, libc::POLLHUP]), Scan::Degraded);
        assert_eq!(scan_revents(&[libc::POLLERR]), Scan::Degraded);
        assert_eq!(scan_revents(&[0, libc::POLLNVAL, libc::POLLIN]), Scan::Degraded);
    }

    #[test]
    fn readable_sources_are_reported_in_order() {
        assert_eq!(scan_revents(&[libc::POLLIN, 0, libc::POLLIN]), Scan::Ready(vec![0, 2]));
        assert_eq!(scan_revents(&[0, 0]), Scan::Ready(vec![]));
    }
}
