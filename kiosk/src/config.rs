use std::env;
use std::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories_next::BaseDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::shell::window::{AspectRatio, ExitPolicy};

pub const CONFIG_PATH_ENV: &str = "KIOSK_CONFIG";
pub const CONTENT_URL_ENV: &str = "KIOSK_CONTENT_URL";

/// Chromium switches passed to engines that accept them.
pub const PERFORMANCE_FLAGS: &[&str] = &[
    "enable-gpu",
    "ignore-gpu-blocklist",
    "enable-zero-copy",
    "disable-frame-rate-limit",
    "disable-gpu-vsync",
    "disable-gpu-driver-bug-workarounds",
    "disable-software-rasterizer",
    "enable-native-gpu-memory-buffers",
    "powerPreference=high-performance",
    "high-dpi-support=1",
    "force-device-scale-factor=1",
    "disable-backgrounding-occluded-windows",
    "disable-breakpad",
    "disable-features=AudioServiceOutOfProcess,MouseSubsampling,\
     SubpixelFontScaling,SharedImageCacheOnDisk,SkiaVulkan",
    "enable-async-dns",
];

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    pub enabled: bool,
    pub owner: String,
    pub repo: String,

    /// Version of the running app; set by the app, never read from disk.
    #[serde(skip)]
    pub current_version: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            owner: String::new(),
            repo: String::new(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    /// Also names the per-user config directory.
    pub app_name: String,
    pub title: String,
    pub content_url: String,
    pub aspect_ratio: AspectRatio,
    pub start_fullscreen: bool,
    pub hold_to_quit_ms: u64,
    pub zoom_factor: f64,
    pub pixelated: bool,
    pub devtools: bool,

    /// Defaults to `blocklist.txt` in the config directory.
    pub block_list: Option<PathBuf>,
    pub update: UpdateConfig,

    /// Defaults to the platform convention.
    pub exit_policy: Option<ExitPolicy>,
    pub browser_args: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            app_name: "Kiosk".to_string(),
            title: "Kiosk".to_string(),
            content_url: "about:blank".to_string(),
            aspect_ratio: AspectRatio::WIDESCREEN,
            start_fullscreen: true,
            hold_to_quit_ms: 500,
            zoom_factor: 1.0,
            pixelated: true,
            devtools: true,
            block_list: None,
            update: UpdateConfig::default(),
            exit_policy: None,
            browser_args: PERFORMANCE_FLAGS
                .iter()
                .map(|flag| flag.to_string())
                .collect(),
        }
    }
}

impl ShellConfig {
    pub fn config_dir(&self) -> Option<PathBuf> {
        BaseDirs::new().map(|base| base.config_dir().join(&self.app_name))
    }

    pub fn cache_dir(&self) -> Option<PathBuf> {
        BaseDirs::new().map(|base| base.cache_dir().join(&self.app_name))
    }

    pub fn config_file_path(&self) -> Option<PathBuf> {
        env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| self.config_dir().map(|dir| dir.join("config.yaml")))
    }

    pub fn block_list_path(&self) -> Option<PathBuf> {
        self.block_list.clone().or_else(|| {
            self.config_dir().map(|dir| dir.join("blocklist.txt"))
        })
    }

    /// `browser_args` as a single Chromium command-line string.
    pub fn browser_args_line(&self) -> String {
        self.browser_args
            .iter()
            .map(|arg| format!("--{}", arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Layers the user's config file (if any) and environment overrides on
    /// top of `self`, which carries the app's defaults.
    pub fn load(self) -> Result<Self, Box<dyn Error>> {
        let mut config = match self.config_file_path() {
            Some(path) => self.merge_file_if_exists(&path)?,
            None => self,
        };

        if let Ok(url) = env::var(CONTENT_URL_ENV) {
            info!("{} override: {}", CONTENT_URL_ENV, url);
            config.content_url = url;
        }

        Ok(config)
    }

    pub fn merge_file_if_exists(
        self,
        path: &Path,
    ) -> Result<Self, Box<dyn Error>> {
        match fs::read_to_string(path) {
            Ok(yaml) => {
                info!("Loading config from {}", path.display());
                self.merge_yaml(&yaml)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No config file at {}", path.display());
                Ok(self)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Keys present in `yaml` replace the corresponding defaults; everything
    /// else keeps the value from `self`.
    pub fn merge_yaml(self, yaml: &str) -> Result<Self, Box<dyn Error>> {
        let current_version = self.update.current_version.clone();
        let mut base = serde_yml::to_value(&self)?;
        let overlay: serde_yml::Value = serde_yml::from_str(yaml)?;

        if !overlay.is_null() {
            merge_values(&mut base, overlay);
        }

        let mut merged: Self = serde_yml::from_value(base)?;
        merged.update.current_version = current_version;
        Ok(merged)
    }
}

fn merge_values(base: &mut serde_yml::Value, overlay: serde_yml::Value) {
    match (base, overlay) {
        (serde_yml::Value::Mapping(base), serde_yml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
