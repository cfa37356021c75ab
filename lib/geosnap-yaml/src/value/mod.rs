/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod fs;
mod net;
mod primary;

pub use fs::{as_dir_path, as_file_path};
pub use net::as_url;
pub use primary::{as_nonzero_usize, as_string};
