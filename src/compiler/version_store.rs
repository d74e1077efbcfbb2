//! C1: Version Store.
//!
//! Maintains a directory of compiler binaries named by version, downloading
//! them from the well-known `binaries.soliditylang.org` mirror on demand.
//! Mirrors the shape of the corpus's own compiler fetcher (a `folder` plus a
//! per-version download path), generalized from a GitHub-hosted version
//! list to a direct-mirror-by-platform-triple scheme and with the download
//! serialized per version instead of relying on a refresh cron job.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::{fs, sync::Mutex as AsyncMutex};
use tracing::{debug, info};
use url::Url;

use crate::types::CompilerVersion;

const DEFAULT_MIRROR_BASE: &str = "https://binaries.soliditylang.org/";

#[derive(Error, Debug)]
pub enum VersionStoreError {
    #[error("compiler version {0} not found on the mirror (status {1})")]
    NotFound(String, reqwest::StatusCode),
    #[error("request to the compiler mirror failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("io error managing the compiler binary: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported host platform for compiler downloads")]
    UnsupportedPlatform,
    #[error("invalid mirror url: {0}")]
    Url(#[from] url::ParseError),
}

/// Per-process-lifetime directory of compiler binaries. Created lazily
/// (nothing on disk is touched until the first `download` or `has_version`
/// call) and retained for the life of the owning `VersionStore` value --
/// callers construct one explicitly and pass it around rather than reaching
/// for a process-global singleton, so tests can use independent stores.
pub struct VersionStore {
    bin_dir: PathBuf,
    mirror_base: Url,
    http: reqwest::Client,
    download_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl VersionStore {
    pub fn new(bin_dir: PathBuf) -> Result<Self, VersionStoreError> {
        Self::with_mirror(bin_dir, Url::parse(DEFAULT_MIRROR_BASE)?)
    }

    pub fn with_mirror(bin_dir: PathBuf, mirror_base: Url) -> Result<Self, VersionStoreError> {
        Ok(Self {
            bin_dir,
            mirror_base,
            http: reqwest::Client::new(),
            download_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Deterministic path used by both `has_version` and the driver:
    /// `<bin_dir>/solc-<v>` plus the platform-native executable suffix.
    pub fn path_of(&self, version: &CompilerVersion) -> PathBuf {
        let filename = if cfg!(windows) {
            format!("solc-{}.exe", version.as_str())
        } else {
            format!("solc-{}", version.as_str())
        };
        self.bin_dir.join(filename)
    }

    pub async fn has_version(&self, version: &CompilerVersion) -> bool {
        fs::metadata(self.path_of(version)).await.is_ok()
    }

    /// Enumerates binaries whose filename matches the `solc-<v>` convention.
    /// A missing directory yields an empty sequence, not an error.
    pub async fn list_versions(&self) -> Result<Vec<CompilerVersion>, VersionStoreError> {
        let mut entries = match fs::read_dir(&self.bin_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let without_exe = name.strip_suffix(".exe").unwrap_or(&name);
            if let Some(version) = without_exe.strip_prefix("solc-") {
                versions.push(CompilerVersion::new(version.to_string()));
            }
        }
        Ok(versions)
    }

    /// Downloads `version` from the mirror if it is not already present.
    /// Concurrent calls for the same version are serialized through a
    /// per-version async lock so a torn/partial binary is never observed by
    /// another caller; the actual write goes through a temp file plus an
    /// atomic rename for the same reason.
    pub async fn download(&self, version: &CompilerVersion) -> Result<PathBuf, VersionStoreError> {
        let target = self.path_of(version);
        let lock = self.lock_for(version);
        let _guard = lock.lock().await;

        if fs::metadata(&target).await.is_ok() {
            return Ok(target);
        }

        let platform = host_platform_triple()?;
        let suffix = if platform.starts_with("windows") {
            ".exe"
        } else {
            ""
        };
        let url = self.mirror_base.join(&format!(
            "{platform}/solc-{platform}-v{}{suffix}",
            version.as_str()
        ))?;

        info!(%url, version = %version, "downloading compiler binary");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(VersionStoreError::NotFound(version.to_string(), status));
        }
        let bytes = response.bytes().await?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = target.with_extension("part");
        fs::write(&tmp_path, &bytes).await?;
        set_executable(&tmp_path).await?;
        fs::rename(&tmp_path, &target).await?;
        debug!(path = %target.display(), "compiler binary ready");

        Ok(target)
    }

    fn lock_for(&self, version: &CompilerVersion) -> Arc<AsyncMutex<()>> {
        let mut locks = self.download_locks.lock();
        locks
            .entry(version.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> Result<(), std::io::Error> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).await?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).await
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> Result<(), std::io::Error> {
    Ok(())
}

fn host_platform_triple() -> Result<&'static str, VersionStoreError> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", _) => Ok("linux-amd64"),
        ("macos", _) => Ok("macosx-amd64"),
        ("windows", _) => Ok("windows-amd64"),
        _ => Err(VersionStoreError::UnsupportedPlatform),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn version(v: &str) -> CompilerVersion {
        CompilerVersion::new(v.to_string())
    }

    #[tokio::test]
    async fn has_version_false_for_missing_directory() {
        let dir = tempdir().unwrap();
        let store = VersionStore::new(dir.path().join("does-not-exist")).unwrap();
        assert!(!store.has_version(&version("0.8.20")).await);
    }

    #[tokio::test]
    async fn list_versions_is_empty_for_missing_directory() {
        let dir = tempdir().unwrap();
        let store = VersionStore::new(dir.path().join("does-not-exist")).unwrap();
        assert_eq!(store.list_versions().await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn download_writes_an_executable_binary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/linux-amd64/solc-linux-amd64-v0.8.20"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-binary".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let mirror = Url::parse(&format!("{}/", server.uri())).unwrap();
        let store = VersionStore::with_mirror(dir.path().to_path_buf(), mirror).unwrap();

        let v = version("0.8.20");
        assert!(!store.has_version(&v).await);
        let path = store.download(&v).await.unwrap();
        assert!(store.has_version(&v).await);

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, b"fake-binary");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o100, 0o100, "binary should be executable");
        }
    }

    #[tokio::test]
    async fn download_of_missing_version_is_compiler_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let mirror = Url::parse(&format!("{}/", server.uri())).unwrap();
        let store = VersionStore::with_mirror(dir.path().to_path_buf(), mirror).unwrap();

        let err = store.download(&version("0.0.1")).await.unwrap_err();
        assert!(matches!(err, VersionStoreError::NotFound(_, _)));
    }

    #[tokio::test]
    async fn concurrent_downloads_of_the_same_version_do_not_race() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/linux-amd64/solc-linux-amd64-v0.8.20"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake-binary".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let mirror = Url::parse(&format!("{}/", server.uri())).unwrap();
        let store = Arc::new(VersionStore::with_mirror(dir.path().to_path_buf(), mirror).unwrap());

        let v = version("0.8.20");
        let (r1, r2) = tokio::join!(
            {
                let store = store.clone();
                let v = v.clone();
                async move { store.download(&v).await }
            },
            {
                let store = store.clone();
                let v = v.clone();
                async move { store.download(&v).await }
            }
        );
        assert!(r1.is_ok());
        assert!(r2.is_ok());
        let contents = std::fs::read(r1.unwrap()).unwrap();
        assert_eq!(contents, b"fake-binary");
    }
}
