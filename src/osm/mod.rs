// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod reader;

pub use reader::{
    derive_restrictions_from_buffer, derive_restrictions_from_file, derive_restrictions_from_io,
    Error, FileFormat,
};
