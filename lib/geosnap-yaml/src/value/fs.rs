/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;
use yaml_rust::Yaml;

fn as_path(v: &Yaml, lookup_dir: &Path) -> anyhow::Result<PathBuf> {
    if let Yaml::String(path) = v {
        let path = PathBuf::from_str(path).map_err(|e| anyhow!("invalid path: {e:?}"))?;
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(lookup_dir.join(path))
        }
    } else {
        Err(anyhow!("yaml value type for path should be string"))
    }
}

pub fn as_file_path(v: &Yaml, lookup_dir: &Path) -> anyhow::Result<PathBuf> {
    let path = as_path(v, lookup_dir)?;
    if !path.is_file() {
        return Err(anyhow!("path {} is not an existed regular file", path.display()));
    }
    path.canonicalize()
        .map_err(|e| anyhow!("invalid path {}: {e:?}", path.display()))
}

pub fn as_dir_path(v: &Yaml, lookup_dir: &Path, auto_create: bool) -> anyhow::Result<PathBuf> {
    let path = as_path(v, lookup_dir)?;
    if path.exists() {
        if !path.is_dir() {
            return Err(anyhow!("the path is existed but not a directory"));
        }
    } else if auto_create {
        std::fs::create_dir_all(&path)
            .map_err(|e| anyhow!("failed to create dir {}: {e:?}", path.display()))?;
    } else {
        return Err(anyhow!("dir {} is not existed", path.display()));
    }
    path.canonicalize()
        .map_err(|e| anyhow!("invalid path {}: {e:?}", path.display()))
}
