/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use ip_network::IpNetwork;

#[derive(Clone, Debug, PartialEq)]
pub struct GeoIpCityRecord {
    pub network: IpNetwork,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub region_code: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub time_zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metro_code: Option<u32>,
}

impl GeoIpCityRecord {
    pub fn new(network: IpNetwork) -> Self {
        GeoIpCityRecord {
            network,
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
        }
    }
}
