/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, YamlLoader};

/// Load the first yaml document in the file.
pub fn load_doc(path: &Path) -> anyhow::Result<Yaml> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read file {}: {e}", path.display()))?;
    let docs = YamlLoader::load_from_str(&content)
        .context(format!("invalid yaml file {}", path.display()))?;
    docs.into_iter()
        .next()
        .ok_or_else(|| anyhow!("no yaml document found in file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_first_doc() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"geoip:\n  refresh_interval: 1h\n---\nother: 1\n")
            .unwrap();
        let doc = load_doc(f.path()).unwrap();
        assert!(doc["geoip"].as_hash().is_some());
        assert!(doc["other"].is_badvalue());
    }

    #[test]
    fn load_empty() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert!(load_doc(f.path()).is_err());
        assert!(load_doc(Path::new("/nonexistent/geosnap.yaml")).is_err());
    }
}
