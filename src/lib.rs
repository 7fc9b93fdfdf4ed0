// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

#![deny(clippy::all)]
#![deny(unused_imports)]
#![allow(clippy::match_like_matches_macro)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::single_match)]

pub mod backlight;
pub mod config;
pub mod daemon;
pub mod input;
pub mod kbd_backlight;
pub mod logging;
pub mod machine;
pub mod notify;
pub mod signals;
pub mod util;
