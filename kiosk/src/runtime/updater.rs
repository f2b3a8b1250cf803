//! Release feed backed by GitHub releases. Checks once, downloads the
//! platform installer into the cache directory, and launches it on request.

use std::error::Error;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, error, info};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::shell::{UpdateFeed, UpdateSignal};

const API_ROOT: &str = "https://api.github.com";
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone, Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// `major.minor.patch`, ignoring any leading `v` and pre-release or build
/// suffix.
pub fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    let core = version.split(['-', '+']).next()?;
    let mut parts = core.split('.').map(|part| part.parse::<u64>().ok());

    let major = parts.next()??;
    let minor = parts.next().unwrap_or(Some(0))?;
    let patch = parts.next().unwrap_or(Some(0))?;
    Some((major, minor, patch))
}

pub fn is_newer(candidate: &str, current: &str) -> bool {
    match (parse_version(candidate), parse_version(current)) {
        (Some(candidate), Some(current)) => candidate > current,
        _ => false,
    }
}

/// Installer suffixes for the running platform, most preferred first.
pub fn installer_suffixes() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &[".exe", ".msi"]
    } else if cfg!(target_os = "macos") {
        &[".dmg", ".pkg"]
    } else {
        &[".AppImage", ".deb"]
    }
}

pub fn pick_asset<'a>(
    assets: &'a [ReleaseAsset],
    suffixes: &[&str],
) -> Option<&'a ReleaseAsset> {
    suffixes.iter().find_map(|suffix| {
        assets.iter().find(|asset| {
            asset.name.ends_with(suffix) && !asset.name.ends_with(".blockmap")
        })
    })
}

/// Runs the check on a worker thread and reports through `emit`. The
/// downloaded installer's path is kept for [`GithubUpdater::install`].
pub struct GithubUpdater {
    download_dir: PathBuf,
    downloaded: Arc<Mutex<Option<PathBuf>>>,
}

impl GithubUpdater {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        let download_dir = cache_dir
            .unwrap_or_else(std::env::temp_dir)
            .join("updates");

        Self {
            download_dir,
            downloaded: Arc::new(Mutex::new(None)),
        }
    }

    pub fn check<F>(&self, feed: UpdateFeed, emit: F)
    where
        F: Fn(UpdateSignal) + Send + 'static,
    {
        let download_dir = self.download_dir.clone();
        let downloaded = Arc::clone(&self.downloaded);

        thread::spawn(move || {
            match check_and_download(&feed, &download_dir, &emit) {
                Ok(Some(path)) => {
                    if let Ok(mut slot) = downloaded.lock() {
                        *slot = Some(path);
                    }
                    emit(UpdateSignal::Downloaded);
                }
                Ok(None) => emit(UpdateSignal::NotAvailable),
                Err(err) => emit(UpdateSignal::Failed(err.to_string())),
            }
        });
    }

    /// Launches the downloaded installer. The caller exits afterwards so the
    /// installer can replace the running binary.
    pub fn install(&self) -> Result<(), Box<dyn Error>> {
        let path = self
            .downloaded
            .lock()
            .map_err(|err| err.to_string())?
            .clone()
            .ok_or("No update has been downloaded")?;

        info!("Launching installer {}", path.display());
        launch_installer(&path)
    }
}

fn client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("kiosk/", env!("CARGO_PKG_VERSION")))
        .build()
}

fn check_and_download(
    feed: &UpdateFeed,
    download_dir: &Path,
    emit: &dyn Fn(UpdateSignal),
) -> Result<Option<PathBuf>, Box<dyn Error>> {
    let client = client()?;
    let url = format!(
        "{}/repos/{}/{}/releases/latest",
        API_ROOT, feed.owner, feed.repo
    );
    debug!("Checking {}", url);

    let release: Release = client
        .get(&url)
        .header(ACCEPT, "application/vnd.github+json")
        .send()?
        .error_for_status()?
        .json()?;

    if !is_newer(&release.tag_name, &feed.current_version) {
        debug!(
            "Latest release {} is not newer than {}",
            release.tag_name, feed.current_version
        );
        return Ok(None);
    }

    let asset = pick_asset(&release.assets, installer_suffixes())
        .ok_or_else(|| {
            format!(
                "Release {} has no installer for this platform",
                release.tag_name
            )
        })?;

    info!("Update {} available: {}", release.tag_name, asset.name);
    emit(UpdateSignal::Available {
        version: release.tag_name.trim_start_matches(['v', 'V']).to_string(),
    });

    fs::create_dir_all(download_dir)?;
    let path = download_dir.join(&asset.name);
    download(&client, asset, &path, emit)?;
    Ok(Some(path))
}

fn download(
    client: &Client,
    asset: &ReleaseAsset,
    path: &Path,
    emit: &dyn Fn(UpdateSignal),
) -> Result<(), Box<dyn Error>> {
    let mut response = client
        .get(&asset.browser_download_url)
        .send()?
        .error_for_status()?;
    let total = response.content_length().unwrap_or(asset.size);

    let partial = path.with_extension("part");
    let mut file = File::create(&partial)?;
    let mut buffer = vec![0; CHUNK_SIZE];
    let mut transferred = 0u64;
    let mut last_percent = -1.0;

    loop {
        let read = response.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        transferred += read as u64;

        let percent = if total > 0 {
            transferred as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        if percent.floor() > last_percent {
            last_percent = percent.floor();
            emit(UpdateSignal::Progress {
                percent,
                transferred,
                total,
            });
        }
    }

    file.flush()?;
    drop(file);
    fs::rename(&partial, path)?;
    info!("Downloaded {} bytes to {}", transferred, path.display());
    Ok(())
}

fn launch_installer(path: &Path) -> Result<(), Box<dyn Error>> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(path).spawn()?;
    }

    #[cfg(unix)]
    #[cfg(not(target_os = "macos"))]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(path, permissions)?;
        Command::new(path).spawn()?;
    }

    #[cfg(not(unix))]
    {
        Command::new(path).spawn()?;
    }

    Ok(())
}

/// Logs rather than returns; used where there is no caller to report to.
pub fn install_or_log(updater: &GithubUpdater) -> bool {
    match updater.install() {
        Ok(()) => true,
        Err(err) => {
            error!("Update install failed: {}", err);
            false
        }
    }
}
