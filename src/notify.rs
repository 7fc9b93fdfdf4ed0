// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! Best-effort backlight change notifications over a unix datagram
//! socket. Nobody listening is the normal case; sends are never
//! retried.

use serde::Serialize;
use std::os::unix::net::UnixDatagram;

use crate::backlight::StepChange;

pub const SOCKET_PATH: &str = "/run/mbp-hotkeyd/notify.sock";

#[derive(Serialize)]
struct Notification<'a> {
    device: &'a str,
    old:    u32,
    new:    u32,
}

pub struct NotifySink {
    socket: Option<UnixDatagram>,
}

impl NotifySink {
    pub fn new() -> Self {
        let socket = match UnixDatagram::unbound() {
            Ok(socket) => {
                let _ = socket.set_nonblocking(true);
                Some(socket)
            }
            Err(why) => {
                log::warn!("notification socket unavailable: {}", why);
                None
            }
        };

        Self { socket }
    }

    pub fn send(&self, device: &str, change: StepChange) {
        let Some(socket) = &self.socket else { return };

        let message = Notification { device, old: change.old, new: change.new };
        let payload = match serde_json::to_vec(&message) {
            Ok(payload) => payload,
            Err(_) => return,
        };

        if let Err(why) = socket.send_to(&payload, SOCKET_PATH) {
            log::debug!("dropping {} backlight notification: {}", device, why);
        }
    }
}

impl Default for NotifySink {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_without_listener_is_silent() {
        let sink = NotifySink::new();
        // The socket path does not exist in the test environment; the
        // send must be swallowed without panicking.
        sink.send("lcd", StepChange { old: 10, new: 20 });
    }

    #[test]
    fn notification_serializes_old_and_new() {
        let payload =
            serde_json::to_string(&Notification { device: "lcd", old: 200, new: 255 }).unwrap();
        assert_eq!(payload, r#"{"device":"lcd","old":200,"new":255}"#);
    }
}
