/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::Write;
use std::net::IpAddr;

use anyhow::anyhow;
use serde::Serialize;

use geosnap_geoip_db::GeoIpCityRecord;
use geosnap_snapshot::{LookupError, SnapshotCache};

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    ip: IpAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metro_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: i64,
}

impl LookupResponse {
    fn empty(ip: IpAddr, timestamp: i64) -> Self {
        LookupResponse {
            ip,
            network: None,
            country_code: None,
            country_name: None,
            region_code: None,
            region_name: None,
            city: None,
            zip_code: None,
            time_zone: None,
            latitude: None,
            longitude: None,
            metro_code: None,
            error: None,
            timestamp,
        }
    }

    pub fn found(ip: IpAddr, record: GeoIpCityRecord, timestamp: i64) -> Self {
        LookupResponse {
            network: Some(record.network.to_string()),
            country_code: record.country_code,
            country_name: record.country_name,
            region_code: record.region_code,
            region_name: record.region_name,
            city: record.city,
            zip_code: record.zip_code,
            time_zone: record.time_zone,
            latitude: record.latitude,
            longitude: record.longitude,
            metro_code: record.metro_code,
            ..LookupResponse::empty(ip, timestamp)
        }
    }

    pub fn failed(ip: IpAddr, e: LookupError, timestamp: i64) -> Self {
        LookupResponse {
            error: Some(e.to_string()),
            ..LookupResponse::empty(ip, timestamp)
        }
    }

    pub fn is_found(&self) -> bool {
        self.error.is_none()
    }
}

/// Write one json line per address, and return how many were found.
pub fn write_lookups<W: Write>(
    cache: &SnapshotCache,
    ip_list: &[IpAddr],
    timestamp: i64,
    out: &mut W,
) -> anyhow::Result<usize> {
    let mut found = 0;
    for ip in ip_list {
        let rsp = match cache.lookup(*ip) {
            Ok(record) => LookupResponse::found(*ip, record, timestamp),
            Err(e) => LookupResponse::failed(*ip, e, timestamp),
        };
        if rsp.is_found() {
            found += 1;
        }
        serde_json::to_writer(&mut *out, &rsp)
            .map_err(|e| anyhow!("failed to serialize lookup response: {e}"))?;
        writeln!(out).map_err(|e| anyhow!("failed to write output: {e}"))?;
    }
    out.flush()
        .map_err(|e| anyhow!("failed to flush output: {e}"))?;
    Ok(found)
}
