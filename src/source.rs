//! The GEOS source pipeline entity.
//!
//! [`GeosSource`] owns a working root and layers four capabilities on it:
//! root allocation, archive download, extraction with version-gated source
//! patches, and the cmake configure/build/install drive. Each stage pulls
//! in the previous one when its precondition is missing, so every stage is
//! safely re-callable.

use std::fs;
use std::path::{Path, PathBuf};

use crate::build::{self, BuildPlan, CwdGuard, Platform};
use crate::error::{Error, Result};
use crate::extract;
use crate::fetch;
use crate::lock;
use crate::output;
use crate::version::Version;

/// Base URL of the upstream release tag archives.
const GEOS_BASEURL: &str = "https://github.com/libgeos/geos/archive/refs/tags";

/// Default install prefix, relative to the user's home directory.
const DEFAULT_INSTALL_SUBDIR: &str = ".local/share/libgeos";

/// A specific GEOS release staged in a local working root.
///
/// The root is either caller-supplied (persistent, never auto-removed) or
/// self-allocated (ephemeral, removed on [`close`](Self::close) or drop).
///
/// # Example
///
/// ```no_run
/// use geos_build::GeosSource;
///
/// let source = GeosSource::new("3.11.1")?;
/// source.build(None, 4)?;
/// source.close();
/// # Ok::<(), geos_build::Error>(())
/// ```
#[derive(Debug)]
pub struct GeosSource {
    version: Version,
    root: PathBuf,
    ephemeral: bool,
}

impl GeosSource {
    /// Stage `version` in a freshly allocated temporary root.
    ///
    /// The root is ephemeral: it is removed, best-effort, when the value is
    /// closed or dropped.
    pub fn new(version: &str) -> Result<Self> {
        let version: Version = version.parse()?;
        let root = tempfile::Builder::new()
            .prefix("tmp_geos_build_")
            .tempdir()
            .map_err(Error::fs("cannot allocate temporary root"))?
            .keep();

        Ok(Self {
            version,
            root,
            ephemeral: true,
        })
    }

    /// Stage `version` in a caller-supplied root.
    ///
    /// The directory is created if absent (pre-existing is not an error) and
    /// is never removed by this crate.
    pub fn with_root(version: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let version: Version = version.parse()?;
        let root: PathBuf = root.into();
        fs::create_dir_all(&root)
            .map_err(Error::fs(format!("cannot create root {}", root.display())))?;
        let root = std::path::absolute(&root)
            .map_err(Error::fs(format!("cannot resolve root {}", root.display())))?;

        Ok(Self {
            version,
            root,
            ephemeral: false,
        })
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Path the downloaded archive lands at.
    pub fn archive_path(&self) -> PathBuf {
        self.root.join(format!("geos-{}.zip", self.version))
    }

    /// Top-level folder the archive extracts to.
    pub fn source_dir(&self) -> PathBuf {
        self.root.join(format!("geos-{}", self.version))
    }

    /// Out-of-source build tree used by cmake.
    pub fn build_dir(&self) -> PathBuf {
        self.source_dir().join("build")
    }

    /// Download the release archive into the root.
    ///
    /// Streams through a temp file so a failed transfer never leaves a
    /// partial archive at the final path. The file inherits the server's
    /// `Last-Modified` timestamp when one is sent.
    pub fn download(&self) -> Result<()> {
        self.download_from(GEOS_BASEURL)
    }

    /// Internal: download with a configurable base URL (for testing).
    fn download_from(&self, base_url: &str) -> Result<()> {
        let url = format!("{}/{}.zip", base_url, self.version);
        output::detail(&format!("downloading {}", url));
        let total_bytes = fetch::download_to(&url, &self.archive_path())?;
        output::detail(&format!(
            "downloaded geos-{}.zip ({} bytes)",
            self.version, total_bytes
        ));
        Ok(())
    }

    /// Decompress the archive into the root and apply the source patches.
    ///
    /// Downloads the archive first if it is absent. When the destination
    /// folder already exists it is removed first, unless `overwrite` is
    /// false, in which case [`Error::DestinationExists`] is returned and the
    /// existing tree stays untouched.
    pub fn extract(&self, overwrite: bool) -> Result<()> {
        let archive = self.archive_path();
        if !archive.exists() {
            self.download()?;
        }

        let source_dir = self.source_dir();
        if source_dir.exists() {
            if !overwrite {
                return Err(Error::DestinationExists(source_dir));
            }
            fs::remove_dir_all(&source_dir)
                .map_err(Error::fs(format!("cannot remove {}", source_dir.display())))?;
        }

        // The archive's own top-level folder becomes the source dir.
        extract::unzip(&archive, &self.root)?;

        extract::make_tools_executable(&source_dir)?;
        extract::patch_capi_link(&source_dir)?;

        // The revision header is only generated by the build from 3.6.0 on.
        if self.version.below(3, 6, 0) {
            extract::ensure_revision_header(&source_dir)?;
        }

        output::detail(&format!("extracted geos-{}", self.version));
        Ok(())
    }

    /// Configure, compile, and install the library with cmake.
    ///
    /// Always re-extracts first so the patches are freshly applied even if
    /// a previous partial build left stale state. `install_dir` defaults to
    /// `~/.local/share/libgeos`; relative paths are resolved against the
    /// current directory. Non-zero cmake exits surface as [`Error::Build`].
    pub fn build(&self, install_dir: Option<&Path>, jobs: u32) -> Result<()> {
        // The cwd change below is process-global; hold the root lock for
        // the whole configure+build window.
        let _lock = lock::acquire_build_lock(&self.root)?;

        self.extract(true)?;

        let install_dir = match install_dir {
            Some(dir) => std::path::absolute(dir)
                .map_err(Error::fs(format!("cannot resolve {}", dir.display())))?,
            None => default_install_dir()?,
        };

        let plan = BuildPlan::new(Platform::host(), &self.version, &install_dir, jobs);

        let build_dir = self.build_dir();
        fs::create_dir_all(&build_dir)
            .map_err(Error::fs(format!("cannot create {}", build_dir.display())))?;
        fs::create_dir_all(&install_dir)
            .map_err(Error::fs(format!("cannot create {}", install_dir.display())))?;

        let _cwd = CwdGuard::enter(&build_dir)?;
        build::configure(&plan)?;
        build::compile(&plan)?;

        output::detail(&format!("installed geos {} to {}", self.version, install_dir.display()));
        Ok(())
    }

    /// Dispose of the entity, removing an ephemeral root.
    ///
    /// Removal is best-effort: failures are reported as warnings, never
    /// raised. Dropping without calling this performs the same cleanup.
    pub fn close(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if !self.ephemeral {
            return;
        }
        self.ephemeral = false;
        if self.root.exists()
            && let Err(e) = fs::remove_dir_all(&self.root)
        {
            output::warning(&format!(
                "could not remove temporary root {}: {}",
                self.root.display(),
                e
            ));
        }
    }
}

impl Drop for GeosSource {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn default_install_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| Error::Filesystem {
        context: "cannot determine home directory for default install dir".to_string(),
        source: std::io::Error::other("no home directory"),
    })?;
    Ok(home.join(DEFAULT_INSTALL_SUBDIR))
}
