// config.rs

use crate::error::Error;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";
const LOG_FILE: &str = "tasklane.log";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Generic REST resource, not scoped to the signed-in user.
    #[default]
    Rest,
    /// Hosted data service; rows are filtered by the signed-in user.
    Hosted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub base_url: String,
    /// Keep only the first `limit` records of a listing.
    pub limit: Option<usize>,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jsonplaceholder.typicode.com".to_string(),
            limit: Some(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    pub url: String,
    pub anon_key: String,
    pub table: String,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            table: "todos".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub rest: RestConfig,
    pub hosted: HostedConfig,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            rest: RestConfig::default(),
            hosted: HostedConfig::default(),
            request_timeout_secs: 15,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads `path`; a missing file gives the defaults.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(Error::Config(format!("Open {} failed: {}", path.display(), e))),
        };
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(dir) = path.parent() {
            create_dir_all(dir)
                .map_err(|e| Error::Config(format!("Create {} failed: {}", dir.display(), e)))?;
        }
        let file = File::create(path)
            .map_err(|e| Error::Config(format!("Open {} failed: {}", path.display(), e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| Error::Config(format!("Write {} failed: {}", path.display(), e)))
    }

    /// Writes to the platform config directory.
    pub fn save(&self) -> Result<(), Error> {
        let paths = Paths::resolve()
            .ok_or_else(|| Error::Config("no home directory found".to_string()))?;
        self.save_to(&paths.config_file())
    }

    /// Loads the config file from the platform config directory, then
    /// applies environment overrides and validates the result.
    pub fn load() -> Result<Self, Error> {
        let mut cfg = match Paths::resolve() {
            Some(paths) => Config::load_from(&paths.config_file())?,
            None => Config::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `TASKLANE_BACKEND`, `TASKLANE_REST_URL`, `TASKLANE_HOSTED_URL` and
    /// `TASKLANE_HOSTED_KEY` win over the file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        if let Some(backend) = var("TASKLANE_BACKEND") {
            self.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "rest" => BackendKind::Rest,
                "hosted" => BackendKind::Hosted,
                other => return Err(Error::Config(format!("Unknown backend '{}'", other))),
            };
        }
        if let Some(url) = var("TASKLANE_REST_URL") {
            self.rest.base_url = url;
        }
        if let Some(url) = var("TASKLANE_HOSTED_URL") {
            self.hosted.url = url;
        }
        if let Some(key) = var("TASKLANE_HOSTED_KEY") {
            self.hosted.anon_key = key;
        }
        Ok(())
    }

    /// Sign-in always goes through the hosted auth service, so its URL and
    /// key are required whichever todo backend is selected.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hosted.url.trim().is_empty() {
            return Err(Error::Config(
                "hosted.url is empty (set it in config.json or TASKLANE_HOSTED_URL)".to_string(),
            ));
        }
        if self.hosted.anon_key.trim().is_empty() {
            return Err(Error::Config(
                "hosted.anon_key is empty (set it in config.json or TASKLANE_HOSTED_KEY)".to_string(),
            ));
        }
        if self.backend == BackendKind::Rest && self.rest.base_url.trim().is_empty() {
            return Err(Error::Config("rest.base_url is empty".to_string()));
        }
        if self.hosted.table.trim().is_empty() {
            return Err(Error::Config("hosted.table is empty".to_string()));
        }
        Ok(())
    }
}

/// Where the app keeps its files.
#[derive(Clone, Debug)]
pub struct Paths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl Paths {
    pub fn resolve() -> Option<Self> {
        let dirs = ProjectDirs::from("", "", "tasklane")?;
        Some(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
