/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};
use url::Url;
use yaml_rust::Yaml;

use geosnap_snapshot::{DatasetSourceConfig, HttpSourceConfig, SnapshotCacheConfig};

const ARG_CONFIG_FILE: &str = "config-file";
const ARG_URL: &str = "url";
const ARG_FILE: &str = "file";
const ARG_WORK_DIR: &str = "work-dir";
const ARG_VERBOSE: &str = "verbose";
const ARG_WAIT_TIMEOUT: &str = "wait-timeout";
const ARG_WATCH: &str = "watch";
const ARG_IP_LIST: &str = "ip-list";

const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct ProcArgs {
    pub verbose_level: u8,
    pub cache_config: SnapshotCacheConfig,
    pub wait_timeout: Duration,
    pub watch: bool,
    pub ip_list: Vec<IpAddr>,
}

pub fn add_args(app: Command) -> Command {
    app.arg(
        Arg::new(ARG_CONFIG_FILE)
            .help("Config file in yaml format, with the cache config under key geoip")
            .value_name("CONFIG FILE")
            .short('c')
            .long(ARG_CONFIG_FILE)
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
    )
    .arg(
        Arg::new(ARG_URL)
            .help("Download the compressed dataset from this url")
            .value_name("URL")
            .long(ARG_URL)
            .num_args(1)
            .value_hint(ValueHint::Url)
            .conflicts_with(ARG_FILE),
    )
    .arg(
        Arg::new(ARG_FILE)
            .help("Copy the compressed dataset from this local file")
            .value_name("FILE")
            .long(ARG_FILE)
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
    )
    .arg(
        Arg::new(ARG_WORK_DIR)
            .help("Directory to keep the downloaded and decompressed files")
            .value_name("DIR")
            .short('w')
            .long(ARG_WORK_DIR)
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .value_hint(ValueHint::DirPath),
    )
    .arg(
        Arg::new(ARG_VERBOSE)
            .help("Show verbose output")
            .short('v')
            .long(ARG_VERBOSE)
            .action(ArgAction::Count),
    )
    .arg(
        Arg::new(ARG_WAIT_TIMEOUT)
            .help("Time to wait for the first dataset to be installed")
            .value_name("TIMEOUT")
            .long(ARG_WAIT_TIMEOUT)
            .num_args(1)
            .default_value("5m"),
    )
    .arg(
        Arg::new(ARG_WATCH)
            .help("Keep refreshing the dataset in the background until interrupted")
            .long(ARG_WATCH)
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new(ARG_IP_LIST)
            .help("IP addresses to look up")
            .value_name("IP")
            .action(ArgAction::Append)
            .value_parser(value_parser!(IpAddr)),
    )
}

fn load_config_file(path: &Path) -> anyhow::Result<SnapshotCacheConfig> {
    let doc = geosnap_yaml::load_doc(path)?;
    let lookup_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let Yaml::Hash(map) = &doc else {
        return Err(anyhow!("yaml type for the main config should be 'map'"));
    };
    let mut cache_config = None;
    geosnap_yaml::foreach_kv(map, |k, v| match geosnap_yaml::key::normalize(k).as_str() {
        "geoip" => {
            let config = SnapshotCacheConfig::parse_yaml(v, &lookup_dir)
                .context(format!("invalid geoip snapshot cache config value for key {k}"))?;
            cache_config = Some(config);
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;
    cache_config.ok_or_else(|| anyhow!("no geoip config found in file {}", path.display()))
}

fn parse_wait_timeout(s: &str) -> anyhow::Result<Duration> {
    match humanize_rs::duration::parse(s) {
        Ok(d) => Ok(d),
        Err(_) => {
            let secs = u64::from_str(s).map_err(|_| anyhow!("invalid duration {s}"))?;
            Ok(Duration::from_secs(secs))
        }
    }
}

pub fn parse_args(args: &ArgMatches) -> anyhow::Result<ProcArgs> {
    let override_source = if let Some(s) = args.get_one::<String>(ARG_URL) {
        let url = Url::parse(s).map_err(|e| anyhow!("invalid url {s}: {e}"))?;
        Some(DatasetSourceConfig::Http(HttpSourceConfig::new(url)))
    } else {
        args.get_one::<PathBuf>(ARG_FILE)
            .map(|p| DatasetSourceConfig::File(p.clone()))
    };

    let mut cache_config = if let Some(path) = args.get_one::<PathBuf>(ARG_CONFIG_FILE) {
        let mut config = load_config_file(path)
            .context(format!("failed to load config file {}", path.display()))?;
        if let Some(source) = override_source {
            config.set_source(source);
        }
        config
    } else {
        let source = override_source
            .ok_or_else(|| anyhow!("no dataset source set, use a config file or --url/--file"))?;
        SnapshotCacheConfig::new(source)
    };
    if let Some(dir) = args.get_one::<PathBuf>(ARG_WORK_DIR) {
        cache_config.set_work_dir(dir.clone());
    }
    cache_config.check()?;

    let wait_timeout = match args.get_one::<String>(ARG_WAIT_TIMEOUT) {
        Some(s) => parse_wait_timeout(s)?,
        None => DEFAULT_WAIT_TIMEOUT,
    };

    let ip_list: Vec<IpAddr> = args
        .get_many::<IpAddr>(ARG_IP_LIST)
        .map(|ips| ips.copied().collect())
        .unwrap_or_default();
    let watch = args.get_flag(ARG_WATCH);
    if ip_list.is_empty() && !watch {
        return Err(anyhow!("nothing to do, give some IP addresses or use --watch"));
    }

    Ok(ProcArgs {
        verbose_level: args.get_count(ARG_VERBOSE),
        cache_config,
        wait_timeout,
        watch,
        ip_list,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> anyhow::Result<ProcArgs> {
        let args = add_args(Command::new("geosnap")).try_get_matches_from(argv)?;
        parse_args(&args)
    }

    #[test]
    fn url_source() {
        let args = parse(&[
            "geosnap",
            "--url",
            "https://example.net/GeoLite2-City.csv.gz",
            "-vv",
            "--wait-timeout",
            "30s",
            "192.0.2.1",
            "2001:db8::1",
        ])
        .unwrap();
        assert_eq!(args.verbose_level, 2);
        assert_eq!(args.wait_timeout, Duration::from_secs(30));
        assert!(!args.watch);
        assert_eq!(args.ip_list.len(), 2);
        let DatasetSourceConfig::Http(http) = args.cache_config.source() else {
            panic!("not a http source");
        };
        assert_eq!(http.url().as_str(), "https://example.net/GeoLite2-City.csv.gz");
    }

    #[test]
    fn file_source_watch() {
        let args = parse(&[
            "geosnap",
            "--file",
            "/data/city.csv.gz",
            "--work-dir",
            "/tmp/geosnap",
            "--wait-timeout",
            "12",
            "--watch",
        ])
        .unwrap();
        assert!(args.watch);
        assert!(args.ip_list.is_empty());
        assert_eq!(args.wait_timeout, Duration::from_secs(12));
        assert_eq!(args.cache_config.work_dir(), Path::new("/tmp/geosnap"));
        assert_eq!(
            args.cache_config.source(),
            &DatasetSourceConfig::File(PathBuf::from("/data/city.csv.gz"))
        );
    }

    #[test]
    fn config_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("geosnap.yaml");
        std::fs::write(
            &conf,
            "geoip:\n  source: https://example.net/city.csv.gz\n  work_dir: data\n  refresh_interval: 24h\n",
        )
        .unwrap();
        let conf_s = conf.to_str().unwrap();

        let args = parse(&["geosnap", "-c", conf_s, "10.0.0.1"]).unwrap();
        assert_eq!(args.wait_timeout, DEFAULT_WAIT_TIMEOUT);
        assert_eq!(args.cache_config.refresh_interval(), Duration::from_secs(86400));
        assert!(args.cache_config.work_dir().ends_with("data"));

        let args = parse(&[
            "geosnap",
            "-c",
            conf_s,
            "--file",
            "/data/city.csv.gz",
            "10.0.0.1",
        ])
        .unwrap();
        assert!(matches!(
            args.cache_config.source(),
            DatasetSourceConfig::File(_)
        ));

        std::fs::write(&conf, "other: 1\n").unwrap();
        assert!(parse(&["geosnap", "-c", conf_s, "10.0.0.1"]).is_err());
    }

    #[test]
    fn invalid_args() {
        assert!(parse(&["geosnap", "10.0.0.1"]).is_err());
        assert!(parse(&["geosnap", "--url", "https://example.net/a.gz"]).is_err());
        assert!(parse(&["geosnap", "--url", "not a url", "10.0.0.1"]).is_err());
        assert!(parse(&["geosnap", "--url", "ftp://example.net/a.gz", "10.0.0.1"]).is_err());
        assert!(parse(&["geosnap", "--url", "file:///data/a.gz", "10.0.0.1"]).is_err());
        assert!(parse(&["geosnap", "--url", "https://example.net/a.gz", "not-an-ip"]).is_err());
        assert!(
            parse(&[
                "geosnap",
                "--url",
                "https://example.net/a.gz",
                "--file",
                "/a.gz",
                "10.0.0.1"
            ])
            .is_err()
        );
        assert!(
            parse(&[
                "geosnap",
                "--url",
                "https://example.net/a.gz",
                "--wait-timeout",
                "soon",
                "10.0.0.1"
            ])
            .is_err()
        );
    }
}
