// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt::Display, fs, io, path::Path, str::FromStr};

pub fn parse_file<T: FromStr, P: AsRef<Path>>(path: P) -> io::Result<T> {
    fs::read_to_string(path.as_ref())?.trim().parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed to parse {}", path.as_ref().display()),
        )
    })
}

pub fn write_file<P: AsRef<Path>, V: Display>(path: P, value: V) -> io::Result<()> {
    fs::write(path, format!("{}", value))
}
