/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::{DatasetSourceConfig, HttpSourceConfig, SnapshotCacheConfig, UnpackConfig};

impl HttpSourceConfig {
    fn parse_yaml_map(map: &yaml_rust::yaml::Hash) -> anyhow::Result<Self> {
        let v = geosnap_yaml::hash_get_required(map, "url")?;
        let url = geosnap_yaml::value::as_url(v).context("invalid url value for key url")?;
        let mut config = HttpSourceConfig::new(url);

        geosnap_yaml::foreach_kv(map, |k, v| match geosnap_yaml::key::normalize(k).as_str() {
            "url" => Ok(()),
            "timeout" => {
                let timeout = geosnap_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                config.set_timeout(timeout);
                Ok(())
            }
            "user_agent" => {
                let user_agent = geosnap_yaml::value::as_string(v)?;
                config.set_user_agent(user_agent);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;

        Ok(config)
    }
}

impl DatasetSourceConfig {
    pub fn parse_yaml(value: &Yaml, lookup_dir: &Path) -> anyhow::Result<Self> {
        match value {
            Yaml::String(_) => {
                let url = geosnap_yaml::value::as_url(value).context("invalid url string value")?;
                Ok(DatasetSourceConfig::Http(HttpSourceConfig::new(url)))
            }
            Yaml::Hash(map) => {
                if let Ok(v) = geosnap_yaml::hash_get_required(map, "file") {
                    if map.len() != 1 {
                        return Err(anyhow!("no other keys are allowed for file source"));
                    }
                    let path = geosnap_yaml::value::as_file_path(v, lookup_dir)
                        .context("invalid file path value for key file")?;
                    Ok(DatasetSourceConfig::File(path))
                } else {
                    let config = HttpSourceConfig::parse_yaml_map(map)?;
                    Ok(DatasetSourceConfig::Http(config))
                }
            }
            _ => Err(anyhow!(
                "yaml type for 'dataset source config' should be 'string' or 'map'"
            )),
        }
    }
}

impl SnapshotCacheConfig {
    pub fn parse_yaml(value: &Yaml, lookup_dir: &Path) -> anyhow::Result<Self> {
        match value {
            Yaml::Hash(map) => {
                let v = geosnap_yaml::hash_get_required(map, "source")?;
                let source = DatasetSourceConfig::parse_yaml(v, lookup_dir)
                    .context("invalid dataset source value for key source")?;
                let mut config = SnapshotCacheConfig::new(source);
                let mut unpack = UnpackConfig::default();

                geosnap_yaml::foreach_kv(map, |k, v| match geosnap_yaml::key::normalize(k).as_str() {
                    "source" => Ok(()),
                    "work_dir" => {
                        let dir = geosnap_yaml::value::as_dir_path(v, lookup_dir, true)?;
                        config.set_work_dir(dir);
                        Ok(())
                    }
                    "download_file" => {
                        let name = geosnap_yaml::value::as_string(v)?;
                        config.set_download_file(name);
                        Ok(())
                    }
                    "dataset_file" => {
                        let name = geosnap_yaml::value::as_string(v)?;
                        config.set_dataset_file(name);
                        Ok(())
                    }
                    "refresh_interval" => {
                        let time = geosnap_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        config.set_refresh_interval(time);
                        Ok(())
                    }
                    "retry_min_interval" => {
                        let time = geosnap_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        config.set_retry_min_interval(time);
                        Ok(())
                    }
                    "retry_max_interval" => {
                        let time = geosnap_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                        config.set_retry_max_interval(time);
                        Ok(())
                    }
                    "pipe_capacity" => {
                        let capacity = geosnap_yaml::value::as_nonzero_usize(v)?;
                        unpack.set_pipe_capacity(capacity);
                        Ok(())
                    }
                    "chunk_size" => {
                        let size = geosnap_yaml::humanize::as_usize(v)?;
                        let size = size
                            .try_into()
                            .map_err(|_| anyhow!("chunk size should not be zero"))?;
                        unpack.set_chunk_size(size);
                        Ok(())
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;

                config.set_unpack(unpack);
                config.check()?;
                Ok(config)
            }
            Yaml::String(_) => {
                let source = DatasetSourceConfig::parse_yaml(value, lookup_dir)?;
                Ok(SnapshotCacheConfig::new(source))
            }
            _ => Err(anyhow!(
                "yaml type for 'geoip snapshot cache config' should be 'map'"
            )),
        }
    }
}
