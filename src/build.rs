//! CMake argument assembly and invocation.
//!
//! Argument construction is a pure function over the target platform,
//! release version, and job count, so the platform/version quirks stay
//! unit-testable without ever spawning a process. Actual invocation is two
//! `cmake` calls: configure, then build-and-install.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::output;
use crate::version::Version;

/// Platform the build arguments are assembled for.
///
/// Carried as a value rather than read from `cfg!` at the point of use so
/// the Windows code paths stay testable from any host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows { win64: bool },
}

impl Platform {
    /// The platform of the running host.
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows {
                win64: cfg!(target_pointer_width = "64"),
            }
        } else {
            Platform::Unix
        }
    }
}

/// Assembled cmake arguments and environment for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Arguments for the configure step, after the source dir reference.
    pub configure_args: Vec<String>,
    /// Arguments for the build-and-install step, after `--build .`.
    pub build_args: Vec<String>,
    /// Environment overrides for the build-and-install step.
    pub env: Vec<(String, String)>,
}

impl BuildPlan {
    pub fn new(platform: Platform, version: &Version, install_dir: &Path, jobs: u32) -> Self {
        let legacy = version.below(3, 6, 0);

        let mut configure_args = vec![
            format!("-DCMAKE_INSTALL_PREFIX={}", install_dir.display()),
            "-DGEOS_ENABLE_TESTS=OFF".to_string(),
            "-DCMAKE_BUILD_TYPE=Release".to_string(),
        ];
        // Old releases do not auto-detect a usable generator on Windows.
        if matches!(platform, Platform::Windows { .. }) && legacy {
            configure_args.splice(0..0, ["-G".to_string(), "NMake Makefiles".to_string()]);
        }

        let mut build_args = vec![
            "--config".to_string(),
            "Release".to_string(),
            "--target".to_string(),
            "install".to_string(),
        ];
        let mut env = Vec::new();

        match platform {
            Platform::Unix => {
                // Make reads job counts from the environment, so the setting
                // also reaches any sub-make the install target spawns.
                env.push(("MAKEFLAGS".to_string(), format!("-j {}", jobs)));
            }
            Platform::Windows { win64 } if legacy => {
                // NMake has no job-count flag; batch mode is the closest
                // thing to parallelism on this path.
                build_args.extend([
                    "--".to_string(),
                    format!("WIN64={}", if win64 { "YES" } else { "NO" }),
                    format!("BUILD_BATCH={}", if jobs > 1 { "YES" } else { "NO" }),
                ]);
            }
            Platform::Windows { .. } => {
                build_args.splice(0..0, ["-j".to_string(), jobs.to_string()]);
            }
        }

        BuildPlan {
            configure_args,
            build_args,
            env,
        }
    }
}

/// Run the cmake configure step from the current directory, referencing the
/// parent directory as the source tree.
pub(crate) fn configure(plan: &BuildPlan) -> Result<()> {
    run_cmake("configure", &[".."], &plan.configure_args, &[])
}

/// Run the cmake build-and-install step from the current directory.
pub(crate) fn compile(plan: &BuildPlan) -> Result<()> {
    run_cmake("build", &["--build", "."], &plan.build_args, &plan.env)
}

fn run_cmake(step: &str, base: &[&str], args: &[String], env: &[(String, String)]) -> Result<()> {
    let mut cmd = Command::new("cmake");
    cmd.args(base).args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let status = cmd
        .status()
        .map_err(|e| Error::Build(format!("cmake failed to start ({}): {}", step, e)))?;

    if !status.success() {
        return Err(Error::Build(format!(
            "cmake {} step failed with exit code: {:?}",
            step,
            status.code()
        )));
    }
    Ok(())
}

/// Scoped change of the process working directory.
///
/// The previous directory is restored on drop, on every exit path. The
/// working directory is process-global state, so holders of this guard must
/// not overlap.
pub(crate) struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous =
            env::current_dir().map_err(Error::fs("cannot read current working directory"))?;
        env::set_current_dir(dir)
            .map_err(Error::fs(format!("cannot enter {}", dir.display())))?;
        Ok(Self { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if env::set_current_dir(&self.previous).is_err() {
            output::warning(&format!(
                "could not restore working directory to {}",
                self.previous.display()
            ));
        }
    }
}
