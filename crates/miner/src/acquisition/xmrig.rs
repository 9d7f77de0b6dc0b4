use super::{AcquisitionError, ExecutableSource};
use crate::console::Console;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub const XMRIG_VERSION: &str = "6.19.2";
pub const XMRIG_RELEASES_URL: &str = "https://github.com/xmrig/xmrig/releases/download";

/// Downloads and unpacks a pinned XMRig release into the install directory.
pub struct XmrigInstaller {
    client: Client,
    version: String,
    base_url: String,
    install_dir: PathBuf,
}

impl XmrigInstaller {
    pub fn new(install_dir: &Path) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("midas-miner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcquisitionError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            version: XMRIG_VERSION.to_string(),
            base_url: XMRIG_RELEASES_URL.to_string(),
            install_dir: install_dir.to_path_buf(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub const fn executable_name() -> &'static str {
        if cfg!(windows) {
            "xmrig.exe"
        } else {
            "xmrig"
        }
    }

    pub fn archive_name(&self) -> String {
        if cfg!(windows) {
            format!("xmrig-{}-msvc-win64.zip", self.version)
        } else {
            format!("xmrig-{}-linux-x64.tar.gz", self.version)
        }
    }

    pub fn download_url(&self) -> String {
        format!(
            "{}/v{}/{}",
            self.base_url.trim_end_matches('/'),
            self.version,
            self.archive_name()
        )
    }

    /// The executable if a previous run already installed the pinned
    /// version, either directly in the install dir or in the
    /// `xmrig-<version>/` directory the release archive unpacks into.
    pub fn installed_path(&self) -> Option<PathBuf> {
        let name = Self::executable_name();
        [
            self.install_dir.join(name),
            self.release_dir().join(name),
        ]
        .into_iter()
        .find(|candidate| candidate.is_file())
    }

    fn release_dir(&self) -> PathBuf {
        self.install_dir.join(format!("xmrig-{}", self.version))
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<(), AcquisitionError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AcquisitionError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AcquisitionError::RequestFailed(format!(
                "HTTP {} for {url}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| AcquisitionError::FileSystemError(e.to_string()))?;

        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AcquisitionError::RequestFailed(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| AcquisitionError::FileSystemError(e.to_string()))?;
            written += chunk.len();
        }
        file.flush()
            .await
            .map_err(|e| AcquisitionError::FileSystemError(e.to_string()))?;

        debug!("Downloaded {written} bytes to {}", destination.display());
        Ok(())
    }

    async fn install(&self) -> Result<PathBuf, AcquisitionError> {
        tokio::fs::create_dir_all(&self.install_dir)
            .await
            .map_err(|e| AcquisitionError::FileSystemError(e.to_string()))?;

        let url = self.download_url();
        let archive = self.install_dir.join(self.archive_name());

        let spinner = Console::spinner(&format!("Downloading XMRig {}...", self.version));
        let downloaded = self.download(&url, &archive).await;
        spinner.finish_and_clear();

        let unpacked = match downloaded {
            Ok(()) => {
                let extract_from = archive.clone();
                let extract_into = self.install_dir.clone();
                tokio::task::spawn_blocking(move || extract_archive(&extract_from, &extract_into))
                    .await
                    .map_err(|e| AcquisitionError::ExtractionFailed(e.to_string()))
                    .and_then(|extracted| extracted)
            }
            Err(e) => Err(e),
        };

        // The archive is never reused, whether or not unpacking worked.
        remove_archive(&archive);
        unpacked?;

        let executable = self.installed_path().ok_or_else(|| {
            AcquisitionError::ExecutableMissing(self.install_dir.join(Self::executable_name()))
        })?;
        make_executable(&executable)?;

        Console::success(&format!("XMRig {} installed", self.version));
        Ok(executable)
    }
}

#[async_trait]
impl ExecutableSource for XmrigInstaller {
    async fn resolved_executable_path(&self) -> Result<PathBuf, AcquisitionError> {
        if let Some(existing) = self.installed_path() {
            debug!("Using installed XMRig at {}", existing.display());
            return Ok(existing);
        }

        info!("XMRig {} not found, downloading", self.version);
        self.install().await
    }
}

fn remove_archive(archive: &Path) {
    match fs::remove_file(archive) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove {}: {e}", archive.display()),
    }
}

fn extract_archive(archive: &Path, into: &Path) -> Result<(), AcquisitionError> {
    let file =
        fs::File::open(archive).map_err(|e| AcquisitionError::FileSystemError(e.to_string()))?;
    let name = archive.to_string_lossy();

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let decoder = flate2::read::GzDecoder::new(file);
        tar::Archive::new(decoder)
            .unpack(into)
            .map_err(|e| AcquisitionError::ExtractionFailed(e.to_string()))
    } else if name.ends_with(".zip") {
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| AcquisitionError::ExtractionFailed(e.to_string()))?;
        zip.extract(into)
            .map_err(|e| AcquisitionError::ExtractionFailed(e.to_string()))
    } else {
        Err(AcquisitionError::ExtractionFailed(format!(
            "unsupported archive format: {name}"
        )))
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), AcquisitionError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| AcquisitionError::FileSystemError(e.to_string()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), AcquisitionError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn release_tarball(version: &str) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let body = b"#!/bin/sh\necho xmrig\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("xmrig-{version}/xmrig"), &body[..])
            .unwrap();

        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_download_url() {
        let dir = tempfile::tempdir().unwrap();
        let installer = XmrigInstaller::new(dir.path()).unwrap();
        let url = installer.download_url();
        assert!(url.starts_with("https://github.com/xmrig/xmrig/releases/download/v6.19.2/"));
        assert!(url.ends_with(&installer.archive_name()));
    }

    #[test]
    fn test_installed_path_in_release_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let installer = XmrigInstaller::new(dir.path()).unwrap();
        let name = XmrigInstaller::executable_name();
        assert!(installer.installed_path().is_none());

        let nested = dir.path().join("xmrig-6.19.2");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(name), b"bin").unwrap();
        assert_eq!(installer.installed_path(), Some(nested.join(name)));
    }

    #[test]
    fn test_installed_path_ignores_other_versions_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let installer = XmrigInstaller::new(dir.path()).unwrap();
        let name = XmrigInstaller::executable_name();

        for stale in ["xmrig-6.18.0", "data", "logs"] {
            let nested = dir.path().join(stale);
            fs::create_dir_all(&nested).unwrap();
            fs::write(nested.join(name), b"bin").unwrap();
        }
        assert!(installer.installed_path().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stale_version_triggers_download() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v6.19.2/xmrig-6.19.2-linux-x64.tar.gz")
            .with_status(200)
            .with_body(release_tarball("6.19.2"))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("xmrig-6.18.0");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("xmrig"), b"old").unwrap();

        let installer = XmrigInstaller::new(dir.path())
            .unwrap()
            .with_base_url(server.url());
        let path = installer.resolved_executable_path().await.unwrap();
        mock.assert_async().await;

        assert_eq!(path, dir.path().join("xmrig-6.19.2").join("xmrig"));
        assert_eq!(fs::read(stale.join("xmrig")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_existing_install_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(XmrigInstaller::executable_name());
        fs::write(&path, b"bin").unwrap();

        // An unroutable base URL proves no request is made.
        let installer = XmrigInstaller::new(dir.path())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        assert_eq!(installer.resolved_executable_path().await.unwrap(), path);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_and_extract() {
        use std::os::unix::fs::PermissionsExt;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v6.19.2/xmrig-6.19.2-linux-x64.tar.gz")
            .with_status(200)
            .with_body(release_tarball("6.19.2"))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let installer = XmrigInstaller::new(dir.path())
            .unwrap()
            .with_base_url(server.url());

        let path = installer.resolved_executable_path().await.unwrap();
        mock.assert_async().await;

        assert_eq!(path, dir.path().join("xmrig-6.19.2").join("xmrig"));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(!dir.path().join(installer.archive_name()).exists());
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let installer = XmrigInstaller::new(dir.path())
            .unwrap()
            .with_base_url(server.url());

        let err = installer.resolved_executable_path().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::RequestFailed(_)));
        assert!(!dir.path().join(installer.archive_name()).exists());
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_removed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .with_body("truncated release")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let installer = XmrigInstaller::new(dir.path())
            .unwrap()
            .with_base_url(server.url());

        let err = installer.resolved_executable_path().await.unwrap_err();
        assert!(matches!(err, AcquisitionError::ExtractionFailed(_)));
        assert!(!dir.path().join(installer.archive_name()).exists());
        assert!(installer.installed_path().is_none());
    }

    #[test]
    fn test_extract_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("xmrig.rar");
        fs::write(&archive, b"not an archive").unwrap();
        assert!(matches!(
            extract_archive(&archive, dir.path()),
            Err(AcquisitionError::ExtractionFailed(_))
        ));
    }
}
