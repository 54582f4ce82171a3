//! CLI argument definitions for the Campus Guide server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use campus_core::config::CampusConfig;

const DEFAULT_CONFIG_FILE: &str = "campus.toml";

/// Campus Guide - admissions assistant chat server.
#[derive(Parser, Debug)]
#[command(name = "campus-guide", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// HTTP port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Directory of knowledge documents (.txt, .md, .pdf).
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Load the knowledge directory into the database before serving.
    #[arg(long = "load-knowledge")]
    pub load_knowledge: bool,

    /// Replace sources that are already loaded.
    #[arg(long = "upsert", requires = "load_knowledge")]
    pub upsert: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CAMPUS_CONFIG env var > ./campus.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_from(|key| std::env::var(key).ok())
    }

    fn resolve_config_path_from<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        match lookup("CAMPUS_CONFIG").filter(|p| !p.trim().is_empty()) {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    /// Apply flag overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut CampusConfig) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref dir) = self.data_dir {
            config.knowledge.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.server.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("campus-guide").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert!(args.config.is_none());
        assert!(!args.load_knowledge);
        assert!(!args.upsert);
    }

    #[test]
    fn test_config_path_priority() {
        let args = parse(&["--config", "/etc/campus.toml"]);
        assert_eq!(
            args.resolve_config_path_from(|_| Some("/tmp/other.toml".to_string())),
            PathBuf::from("/etc/campus.toml")
        );

        let args = parse(&[]);
        assert_eq!(
            args.resolve_config_path_from(|_| Some("/tmp/other.toml".to_string())),
            PathBuf::from("/tmp/other.toml")
        );
        assert_eq!(
            args.resolve_config_path_from(|_| None),
            PathBuf::from("campus.toml")
        );
    }

    #[test]
    fn test_overrides_win() {
        let args = parse(&[
            "--host",
            "127.0.0.1",
            "-p",
            "8080",
            "--data-dir",
            "/srv/knowledge",
            "--log-level",
            "debug",
        ]);
        let mut config = CampusConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.knowledge.data_dir, "/srv/knowledge");
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = CampusConfig::default();
        config.server.port = 9000;
        parse(&[]).apply_overrides(&mut config);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_upsert_requires_load_knowledge() {
        assert!(CliArgs::try_parse_from(["campus-guide", "--upsert"]).is_err());
        let args = parse(&["--load-knowledge", "--upsert"]);
        assert!(args.load_knowledge && args.upsert);
    }
}
