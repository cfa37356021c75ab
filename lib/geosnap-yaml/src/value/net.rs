/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::anyhow;
use url::Url;
use yaml_rust::Yaml;

pub fn as_url(v: &Yaml) -> anyhow::Result<Url> {
    if let Yaml::String(s) = v {
        let url = Url::from_str(s).map_err(|e| anyhow!("invalid url: {e}"))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            s => Err(anyhow!("unsupported url scheme {s}")),
        }
    } else {
        Err(anyhow!("yaml value type for 'url' should be 'string'"))
    }
}
