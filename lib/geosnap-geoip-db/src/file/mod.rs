/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use flate2::bufread::MultiGzDecoder;
use ip_network::IpNetwork;
use ip_network_table::IpNetworkTable;

use crate::{GeoIpCityDb, GeoIpCityRecord};

pub fn load_city(file: &Path) -> anyhow::Result<GeoIpCityDb> {
    if let Some(ext) = file.extension() {
        match ext.to_str() {
            Some("gz") => {
                let f = File::open(file)
                    .map_err(|e| anyhow!("failed to open gzip file {}: {e}", file.display()))?;
                let f = MultiGzDecoder::new(BufReader::new(f));
                return load_city_from_csv(f).context(format!(
                    "failed to read records from file {}",
                    file.display()
                ));
            }
            Some(_) => {}
            None => {}
        }
    }
    let f = File::open(file).map_err(|e| anyhow!("failed to open file {}: {e}", file.display()))?;
    load_city_from_csv(f).context(format!(
        "failed to read records from file {}",
        file.display()
    ))
}

struct ColumnIndex {
    network: usize,
    country_code: usize,
    country_name: usize,
    region_code: usize,
    region_name: usize,
    city: usize,
    zip_code: usize,
    time_zone: usize,
    latitude: usize,
    longitude: usize,
    metro_code: usize,
}

impl ColumnIndex {
    fn parse(headers: &csv::StringRecord) -> anyhow::Result<Self> {
        let mut index = ColumnIndex {
            network: usize::MAX,
            country_code: usize::MAX,
            country_name: usize::MAX,
            region_code: usize::MAX,
            region_name: usize::MAX,
            city: usize::MAX,
            zip_code: usize::MAX,
            time_zone: usize::MAX,
            latitude: usize::MAX,
            longitude: usize::MAX,
            metro_code: usize::MAX,
        };
        for (column, s) in headers.iter().enumerate() {
            match s.trim() {
                "network" => index.network = column,
                "country_code" => index.country_code = column,
                "country_name" => index.country_name = column,
                "region_code" => index.region_code = column,
                "region_name" => index.region_name = column,
                "city" => index.city = column,
                "zip_code" => index.zip_code = column,
                "time_zone" => index.time_zone = column,
                "latitude" => index.latitude = column,
                "longitude" => index.longitude = column,
                "metro_code" => index.metro_code = column,
                _ => {}
            }
        }
        if index.network == usize::MAX {
            return Err(anyhow!("no network column found in csv header"));
        }
        Ok(index)
    }
}

fn get_string(record: &csv::StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn get_parsed<T: FromStr>(record: &csv::StringRecord, index: usize) -> Option<T> {
    record.get(index).and_then(|s| T::from_str(s.trim()).ok())
}

pub fn load_city_from_csv<R: io::Read>(stream: R) -> anyhow::Result<GeoIpCityDb> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(stream);
    let headers = rdr
        .headers()
        .map_err(|e| anyhow!("no csv header line found: {e}"))?;
    let index = ColumnIndex::parse(headers)?;

    let mut table = IpNetworkTable::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| anyhow!("invalid record {i}: {e}"))?;

        let Some(network) = get_parsed::<IpNetwork>(&record, index.network) else {
            continue;
        };

        let mut r = GeoIpCityRecord::new(network);
        r.country_code = get_string(&record, index.country_code);
        r.country_name = get_string(&record, index.country_name);
        r.region_code = get_string(&record, index.region_code);
        r.region_name = get_string(&record, index.region_name);
        r.city = get_string(&record, index.city);
        r.zip_code = get_string(&record, index.zip_code);
        r.time_zone = get_string(&record, index.time_zone);
        r.latitude = get_parsed(&record, index.latitude);
        r.longitude = get_parsed(&record, index.longitude);
        r.metro_code = get_parsed(&record, index.metro_code);

        table.insert(network, r);
    }

    Ok(GeoIpCityDb::new(table))
}
