//! Integration tests for the download/extract/patch pipeline.
//!
//! These run against fabricated release archives placed directly in the
//! working root, so no network access or cmake binary is needed.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use geos_build::{Error, GeosSource};

/// CMakeLists content matching the shape of the upstream `capi/` descriptor.
const CAPI_CMAKELISTS: &str = "\
# C API library
add_library(geos_c SHARED ${geos_c_SOURCES})
target_link_libraries(geos_c geos)
set_target_properties(geos_c PROPERTIES VERSION ${CAPI_VERSION})
install(TARGETS geos_c DESTINATION lib)
";

/// Write a fake release archive at the source's archive path.
///
/// The zip carries the upstream layout: a single `geos-<version>/` top-level
/// folder with `capi/CMakeLists.txt`, a couple of `tools/` entries, and a
/// source file.
fn stage_archive(source: &GeosSource, extra_entries: &[(&str, &str)]) {
    let top = format!("geos-{}", source.version());
    let mut entries = vec![
        (format!("{}/README.md", top), "GEOS".to_string()),
        (format!("{}/capi/CMakeLists.txt", top), CAPI_CMAKELISTS.to_string()),
        (
            format!("{}/tools/repo_revision.sh", top),
            "#!/bin/sh\necho 0\n".to_string(),
        ),
        (
            format!("{}/tools/ci_script.sh", top),
            "#!/bin/sh\nexit 0\n".to_string(),
        ),
        (format!("{}/tools/notes.txt", top), "not a script".to_string()),
        (
            format!("{}/src/geom/Geometry.cpp", top),
            "// geometry\n".to_string(),
        ),
    ];
    for (name, content) in extra_entries {
        entries.push((format!("{}/{}", top, name), content.to_string()));
    }

    let file = File::create(source.archive_path()).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in &entries {
        zip.start_file(name.as_str(), options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn staged_source(version: &str, root: &Path) -> GeosSource {
    let source = GeosSource::with_root(version, root).unwrap();
    stage_archive(&source, &[]);
    source
}

// =============================================================================
// Extraction and overwrite semantics
// =============================================================================

#[test]
fn test_extract_unpacks_upstream_layout() {
    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.9.0", temp.path());

    source.extract(true).unwrap();

    let tree = source.source_dir();
    assert!(tree.join("README.md").exists());
    assert!(tree.join("capi/CMakeLists.txt").exists());
    assert!(tree.join("src/geom/Geometry.cpp").exists());
}

#[test]
fn test_extract_declines_existing_destination() {
    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.9.0", temp.path());
    source.extract(true).unwrap();

    // Leave a marker to prove the tree is untouched after the refusal.
    let marker = source.source_dir().join("marker.txt");
    fs::write(&marker, "do not remove").unwrap();

    let err = source.extract(false).unwrap_err();
    assert!(matches!(err, Error::DestinationExists(_)));
    assert_eq!(fs::read_to_string(&marker).unwrap(), "do not remove");
}

#[test]
fn test_extract_overwrite_replaces_stale_tree() {
    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.9.0", temp.path());
    source.extract(true).unwrap();

    let stale = source.source_dir().join("stale-build-output.o");
    fs::write(&stale, "stale").unwrap();

    source.extract(true).unwrap();
    assert!(!stale.exists());
    assert!(source.source_dir().join("README.md").exists());
}

#[test]
fn test_extract_twice_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.9.0", temp.path());

    source.extract(true).unwrap();
    let first = fs::read_to_string(source.source_dir().join("capi/CMakeLists.txt")).unwrap();

    source.extract(true).unwrap();
    let second = fs::read_to_string(source.source_dir().join("capi/CMakeLists.txt")).unwrap();

    assert_eq!(first, second);
}

// =============================================================================
// Source patching
// =============================================================================

#[test]
fn test_extract_patches_capi_link_directive() {
    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.9.0", temp.path());

    source.extract(true).unwrap();

    let patched = fs::read_to_string(source.source_dir().join("capi/CMakeLists.txt")).unwrap();
    assert!(!patched.contains("target_link_libraries(geos_c geos)\n"));
    assert!(patched.contains("target_link_libraries(geos_c geos-static)\n"));

    // Every line except the link directive is byte-identical.
    let expected: String = CAPI_CMAKELISTS
        .split_inclusive('\n')
        .map(|line| {
            line.replace(
                "target_link_libraries(geos_c geos)",
                "target_link_libraries(geos_c geos-static)",
            )
        })
        .collect();
    assert_eq!(patched, expected);
}

#[test]
fn test_legacy_version_gains_revision_header() {
    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.5.0", temp.path());

    source.extract(true).unwrap();

    let header = source.source_dir().join("geos_svn_revision.h");
    assert_eq!(
        fs::read_to_string(header).unwrap(),
        "#define GEOS_SVN_REVISION 0"
    );
}

#[test]
fn test_legacy_version_keeps_shipped_revision_header() {
    let temp = tempfile::tempdir().unwrap();
    let source = GeosSource::with_root("3.5.0", temp.path()).unwrap();
    stage_archive(
        &source,
        &[("geos_svn_revision.h", "#define GEOS_SVN_REVISION 4321")],
    );

    source.extract(true).unwrap();

    assert_eq!(
        fs::read_to_string(source.source_dir().join("geos_svn_revision.h")).unwrap(),
        "#define GEOS_SVN_REVISION 4321"
    );
}

#[test]
fn test_modern_version_never_gets_revision_header() {
    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.6.0", temp.path());

    source.extract(true).unwrap();

    assert!(!source.source_dir().join("geos_svn_revision.h").exists());
}

#[cfg(unix)]
#[test]
fn test_extract_marks_tools_scripts_executable() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempfile::tempdir().unwrap();
    let source = staged_source("3.9.0", temp.path());

    source.extract(true).unwrap();

    let tools = source.source_dir().join("tools");
    for script in ["repo_revision.sh", "ci_script.sh"] {
        let mode = fs::metadata(tools.join(script)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755, "{} should be 0755", script);
    }
    let plain = fs::metadata(tools.join("notes.txt")).unwrap().permissions().mode();
    assert_eq!(plain & 0o111, 0, "notes.txt must not become executable");
}

// =============================================================================
// Root lifecycle
// =============================================================================

#[test]
fn test_ephemeral_root_vanishes_after_close() {
    let source = GeosSource::new("3.8.1").unwrap();
    let root = source.root().to_path_buf();
    assert!(root.is_dir());

    source.close();
    assert!(!root.exists());
}

#[test]
fn test_persistent_root_keeps_artifacts() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("work");

    {
        // with_root creates the directory itself.
        let source = staged_source("3.9.0", &root);
        source.extract(true).unwrap();
    }

    assert!(root.join("geos-3.9.0.zip").exists());
    assert!(root.join("geos-3.9.0/README.md").exists());
}
