//! OS/arch naming and binary path resolution (§6).
//!
//! This crate implements only the *interface* the core exposes to the
//! external collaborator responsible for choosing and laying out prebuilt
//! native binaries (§1's Out-of-scope list). It knows the closed set of
//! supported `(os, arch)` pairs and a path-join convention; it does not
//! download, verify, or cache binaries — that is the collaborator's job.
//!
//! Grounded in the same `Os`/`Arch`/`Platform` shape the binary-fetching
//! side of this workspace already uses to describe a target triple.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Darwin,
    Linux,
    Win32,
}

impl Os {
    pub const fn as_str(self) -> &'static str {
        match self {
            Os::Darwin => "darwin",
            Os::Linux => "linux",
            Os::Win32 => "win32",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    Arm64,
    Ia32,
}

impl Arch {
    pub const fn as_str(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
            Arch::Ia32 => "ia32",
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("unsupported platform: {os}:{arch}")]
    Unsupported { os: String, arch: String },
}

/// A supported `(os, arch)` pair. Construction is restricted to the closed
/// set enumerated by [`Platform::all`]; there is no "unknown" variant,
/// unlike a general-purpose platform-detection utility, because the
/// native endpoint only ever ships for these combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The closed set `{darwin:{x64,arm64}, linux:{x64,arm64},
    /// win32:{x64,arm64,ia32}}` (§6).
    pub const fn all() -> &'static [Platform] {
        &[
            Platform::new(Os::Darwin, Arch::X64),
            Platform::new(Os::Darwin, Arch::Arm64),
            Platform::new(Os::Linux, Arch::X64),
            Platform::new(Os::Linux, Arch::Arm64),
            Platform::new(Os::Win32, Arch::X64),
            Platform::new(Os::Win32, Arch::Arm64),
            Platform::new(Os::Win32, Arch::Ia32),
        ]
    }

    /// Looks up a platform by its wire-level os/arch names, validating
    /// against the closed set rather than accepting any string.
    pub fn lookup(os: &str, arch: &str) -> Result<Platform, PlatformError> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.os.as_str() == os && p.arch.as_str() == arch)
            .ok_or_else(|| PlatformError::Unsupported {
                os: os.to_string(),
                arch: arch.to_string(),
            })
    }

    /// The current process's platform, if it is one of the supported
    /// combinations.
    pub fn current() -> Result<Platform, PlatformError> {
        Self::lookup(current_os_name(), current_arch_name())
    }

    /// The conventional binary file name for this platform: `process-proxy`
    /// on Unix-like platforms, `process-proxy.exe` on Windows.
    pub fn binary_name(self) -> &'static str {
        match self.os {
            Os::Win32 => "process-proxy.exe",
            Os::Darwin | Os::Linux => "process-proxy",
        }
    }

    /// Resolves the absolute path of the native binary for this platform
    /// under a given root directory, using the conventional
    /// `<root>/<os>-<arch>/<binary_name>` layout. The actual directory
    /// layout on disk remains the external collaborator's choice (§1); this
    /// is only the naming convention the core assumes when asked to
    /// resolve a path.
    pub fn binary_path(self, root: &std::path::Path) -> PathBuf {
        root.join(format!("{}-{}", self.os.as_str(), self.arch.as_str()))
            .join(self.binary_name())
    }
}

fn current_os_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "linux" => "linux",
        "windows" => "win32",
        other => other,
    }
}

fn current_arch_name() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}
