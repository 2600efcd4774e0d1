//! Archive extraction and version-specific source patching.
//!
//! Upstream GEOS tag archives are plain zips whose single top-level folder
//! names the release (`geos-3.11.1/`). Extraction lands that folder in the
//! working root; the patch helpers then fix up the tree so the build
//! produces a self-contained C API library.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Link directive shipped in `capi/CMakeLists.txt`.
const CAPI_LINK_SHARED: &str = "target_link_libraries(geos_c geos)";
/// Replacement linking the C API against the static core library, so the
/// installed `geos_c` does not depend on a separate `libgeos` shared object.
const CAPI_LINK_STATIC: &str = "target_link_libraries(geos_c geos-static)";

/// Revision header that pre-3.6.0 archives reference but never generate.
const REVISION_HEADER: &str = "geos_svn_revision.h";
const REVISION_MACRO: &str = "#define GEOS_SVN_REVISION 0";

/// Decompress a zip archive into `dest`.
///
/// Entries with unsafe paths (absolute or escaping the destination) are
/// skipped. Unix file modes stored in the archive are restored.
pub fn unzip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .map_err(Error::fs(format!("cannot open {}", archive_path.display())))?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Archive {
        path: archive_path.to_path_buf(),
        source: e,
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| Error::Archive {
            path: archive_path.to_path_buf(),
            source: e,
        })?;

        let outpath = match entry.enclosed_name() {
            Some(path) => dest.join(path),
            None => continue,
        };

        if entry.is_dir() {
            fs::create_dir_all(&outpath)
                .map_err(Error::fs(format!("cannot create directory {}", outpath.display())))?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)
                    .map_err(Error::fs(format!("cannot create directory {}", parent.display())))?;
            }

            let mut outfile = File::create(&outpath)
                .map_err(Error::fs(format!("cannot create {}", outpath.display())))?;
            std::io::copy(&mut entry, &mut outfile)
                .map_err(Error::fs(format!("write error for {}", outpath.display())))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&outpath, fs::Permissions::from_mode(mode)).ok();
                }
            }
        }
    }

    Ok(())
}

/// Make every `tools/*.sh` script under `source_dir` executable (0o755).
///
/// Processed in sorted order for determinism. No-op on non-unix platforms.
pub fn make_tools_executable(source_dir: &Path) -> Result<()> {
    let pattern = format!("{}/tools/*.sh", source_dir.display());
    let mut scripts: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| Error::Filesystem {
            context: format!("invalid glob pattern '{}'", pattern),
            source: std::io::Error::other(e),
        })?
        .filter_map(|r| r.ok())
        .collect();
    scripts.sort();

    for script in scripts {
        set_mode(&script, 0o755)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(Error::fs(format!("chmod failed for {}", path.display())))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Patch `capi/CMakeLists.txt` to link `geos_c` against the static core
/// library instead of the shared one.
///
/// Exact literal substitution, line by line; every non-matching line passes
/// through byte-identical and the file stays UTF-8.
pub fn patch_capi_link(source_dir: &Path) -> Result<()> {
    let cmake_file = source_dir.join("capi").join("CMakeLists.txt");
    let text = fs::read_to_string(&cmake_file)
        .map_err(Error::fs(format!("cannot read {}", cmake_file.display())))?;

    let patched: String = text
        .split_inclusive('\n')
        .map(|line| line.replace(CAPI_LINK_SHARED, CAPI_LINK_STATIC))
        .collect();

    fs::write(&cmake_file, patched)
        .map_err(Error::fs(format!("cannot rewrite {}", cmake_file.display())))
}

/// Create `geos_svn_revision.h` with a zero revision if it is absent.
///
/// Pre-3.6.0 archives do not generate this header themselves, but the
/// build references it unconditionally. An existing file is left untouched.
pub fn ensure_revision_header(source_dir: &Path) -> Result<()> {
    let header = source_dir.join(REVISION_HEADER);
    if header.exists() {
        return Ok(());
    }
    fs::write(&header, REVISION_MACRO)
        .map_err(Error::fs(format!("cannot write {}", header.display())))
}
