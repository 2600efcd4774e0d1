//! Download, patch, and build the GEOS geometry library from source.
//!
//! Downstream tooling that links against GEOS needs a working native
//! library at a known install prefix, without caring about the build quirks
//! of each release. This crate wraps the whole pipeline behind one entity:
//!
//! 1. **Root** - a working directory, caller-supplied or temporary.
//! 2. **Fetch** - download the release zip from the upstream tag archive.
//! 3. **Extract/patch** - unpack it and apply version-gated source fixes.
//! 4. **Build** - drive cmake configure/build/install with the right
//!    arguments for the platform and release.
//!
//! Stages are layered: `build()` extracts, `extract()` downloads if the
//! archive is missing. Each stage can be re-run safely.
//!
//! # Example
//!
//! ```no_run
//! use geos_build::GeosSource;
//! use std::path::Path;
//!
//! // Persistent root: artifacts survive for later reuse.
//! let source = GeosSource::with_root("3.11.1", "/tmp/geos-work")?;
//! source.build(Some(Path::new("/opt/libgeos")), 4)?;
//! # Ok::<(), geos_build::Error>(())
//! ```
//!
//! The archive decoder (`zip`), HTTP client (`ureq`), and build system
//! (`cmake` on `PATH`) are external collaborators; the value here is the
//! sequencing, idempotence, and argument construction around them.

mod build;
mod error;
mod extract;
mod fetch;
mod lock;
pub mod output;
mod source;
mod version;

pub use build::{BuildPlan, Platform};
pub use error::{Error, Result};
pub use source::GeosSource;
pub use version::{Version, VersionError};
