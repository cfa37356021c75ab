/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;

use ip_network_table::IpNetworkTable;

use crate::GeoIpCityRecord;

/// A decoded city dataset, indexed for longest prefix match.
pub struct GeoIpCityDb {
    table: IpNetworkTable<GeoIpCityRecord>,
}

impl GeoIpCityDb {
    pub(crate) fn new(table: IpNetworkTable<GeoIpCityRecord>) -> Self {
        GeoIpCityDb { table }
    }

    pub fn lookup(&self, ip: IpAddr) -> Option<&GeoIpCityRecord> {
        self.table.longest_match(ip).map(|(_net, r)| r)
    }

    /// Return the number of (ipv4, ipv6) records.
    pub fn len(&self) -> (usize, usize) {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        let (v4, v6) = self.table.len();
        v4 == 0 && v6 == 0
    }
}
