/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::Write as _;
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

use geosnap_geoip_db::GeoIpCityDb;

/// A dataset with `10.0.{i}.0/24 -> City{i}` entries.
pub(crate) fn city_csv(entries: usize) -> String {
    let mut s = String::from(
        "network,country_code,country_name,region_code,region_name,city,zip_code,time_zone,latitude,longitude,metro_code\n",
    );
    for i in 0..entries {
        let _ = writeln!(
            s,
            "10.0.{i}.0/24,US,United States,CA,California,City{i},9400{i},America/Los_Angeles,37.{i},-122.{i},80{i}"
        );
    }
    s
}

pub(crate) fn city_db(entries: usize) -> GeoIpCityDb {
    geosnap_geoip_db::file::load_city_from_csv(city_csv(entries).as_bytes()).unwrap()
}

pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
