// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

use std::sync::atomic::{AtomicBool, Ordering};

static RUNNING: AtomicBool = AtomicBool::new(true);

pub fn running() -> bool { RUNNING.load(Ordering::SeqCst) }

/// SIGINT and SIGTERM request a clean shutdown: the flag is checked at
/// each loop entry, in-flight hardware I/O is never interrupted.
pub fn install() {
    extern "C" fn handler(_signal: libc::c_int) { RUNNING.store(false, Ordering::SeqCst); }

    let handler = handler as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
        // eject children are reaped by the kernel
        libc::signal(libc::SIGCHLD, libc::SIG_IGN);
    }
}
