/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod record;
pub use record::GeoIpCityRecord;

mod db;
pub use db::GeoIpCityDb;

pub mod file;
