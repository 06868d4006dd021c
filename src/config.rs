//! Configuration types for a page-generation job.
//!
//! Everything the job needs besides the entry id lives in [`JobConfig`],
//! built via its [`JobConfigBuilder`]. The CLI fills the builder from flags
//! and `PAGEGEN_*` environment variables; library callers set only what they
//! need and rely on the defaults for the rest.

use crate::error::PageGenError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Ghostscript TIFF output devices: `tiffgray`, `tiff24nc`, `tiffg4`, …
static TIFF_DEVICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^tiff[a-z0-9]+$").unwrap());

/// Default rasterisation resolution in DPI.
pub const DEFAULT_RESOLUTION: u32 = 300;

/// Default Ghostscript output device: 24-bit RGB, uncompressed.
pub const DEFAULT_DEVICE: &str = "tiff24nc";

/// Connection parameters for the document repository.
#[derive(Clone, Default)]
pub struct RepositoryConfig {
    /// Base URL of the repository API server, e.g. `http://lfserver/LFRepositoryAPI`.
    /// A bare host name is accepted and treated as `http://`.
    pub server: String,

    /// Repository name on that server.
    pub repository: String,

    pub username: String,

    pub password: String,

    /// Per-request HTTP timeout in seconds. Default: 120.
    pub timeout_secs: u64,
}

impl RepositoryConfig {
    /// The server address with a scheme, without a trailing slash.
    pub fn base_url(&self) -> String {
        let server = self.server.trim().trim_end_matches('/');
        if server.starts_with("http://") || server.starts_with("https://") {
            server.to_string()
        } else {
            format!("http://{server}")
        }
    }
}

impl fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("server", &self.server)
            .field("repository", &self.repository)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Ghostscript rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RasterOptions {
    /// Output resolution in DPI (`-r`). Range: 50–1200. Default: 300.
    pub resolution: u32,

    /// Ghostscript output device (`-sDEVICE=`). Must be a TIFF device.
    /// Default: `tiff24nc`.
    pub device: String,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            device: DEFAULT_DEVICE.to_string(),
        }
    }
}

/// Configuration for one page-generation job.
///
/// # Example
/// ```rust
/// use lf_pagegen::JobConfig;
///
/// let config = JobConfig::builder()
///     .server("http://lfserver/LFRepositoryAPI")
///     .repository("CITY")
///     .username("svc_pagegen")
///     .password("secret")
///     .resolution(300)
///     .device("tiff24nc")
///     .build()
///     .unwrap();
/// assert_eq!(config.raster.resolution, 300);
/// ```
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub repository: RepositoryConfig,

    /// Folder receiving the downloaded PDF and the produced TIFF.
    /// Created on demand. Default: the system temp dir.
    pub temp_dir: PathBuf,

    pub raster: RasterOptions,

    /// Ghostscript executable. Default: `gs` (`gswin64c` on Windows).
    pub ghostscript: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            repository: RepositoryConfig {
                timeout_secs: 120,
                ..RepositoryConfig::default()
            },
            temp_dir: std::env::temp_dir(),
            raster: RasterOptions::default(),
            ghostscript: PathBuf::from(default_ghostscript()),
        }
    }
}

/// Platform name of the console Ghostscript binary.
pub fn default_ghostscript() -> &'static str {
    if cfg!(windows) {
        "gswin64c"
    } else {
        "gs"
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.repository.server = server.into();
        self
    }

    pub fn repository(mut self, name: impl Into<String>) -> Self {
        self.config.repository.repository = name.into();
        self
    }

    pub fn username(mut self, user: impl Into<String>) -> Self {
        self.config.repository.username = user.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.repository.password = pwd.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.repository.timeout_secs = secs;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn resolution(mut self, dpi: u32) -> Self {
        self.config.raster.resolution = dpi;
        self
    }

    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.config.raster.device = device.into();
        self
    }

    pub fn ghostscript(mut self, exe: impl Into<PathBuf>) -> Self {
        self.config.ghostscript = exe.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, PageGenError> {
        let c = &self.config;
        let required = [
            ("server", &c.repository.server),
            ("repository", &c.repository.repository),
            ("username", &c.repository.username),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(PageGenError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        if !(50..=1200).contains(&c.raster.resolution) {
            return Err(PageGenError::InvalidConfig(format!(
                "resolution must be 50–1200 DPI, got {}",
                c.raster.resolution
            )));
        }
        if !TIFF_DEVICE.is_match(&c.raster.device) {
            return Err(PageGenError::InvalidConfig(format!(
                "device '{}' is not a Ghostscript TIFF device (e.g. tiff24nc, tiffg4)",
                c.raster.device
            )));
        }
        if c.repository.timeout_secs == 0 {
            return Err(PageGenError::InvalidConfig(
                "HTTP timeout must be ≥ 1 second".into(),
            ));
        }
        if c.temp_dir.as_os_str().is_empty() {
            return Err(PageGenError::InvalidConfig(
                "temp folder must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> JobConfigBuilder {
        JobConfig::builder()
            .server("lfserver")
            .repository("REPO")
            .username("user")
            .password("pw")
    }

    #[test]
    fn default_raster_options() {
        let config = base().build().unwrap();
        assert_eq!(config.raster.resolution, 300);
        assert_eq!(config.raster.device, "tiff24nc");
        assert_eq!(config.repository.timeout_secs, 120);
    }

    #[test]
    fn missing_server_rejected() {
        let err = JobConfig::builder()
            .repository("REPO")
            .username("user")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("server"), "got: {err}");
    }

    #[test]
    fn resolution_bounds() {
        assert!(base().resolution(49).build().is_err());
        assert!(base().resolution(1201).build().is_err());
        assert!(base().resolution(50).build().is_ok());
        assert!(base().resolution(1200).build().is_ok());
    }

    #[test]
    fn only_tiff_devices_accepted() {
        for ok in ["tiff24nc", "tiffgray", "tiffg4", "tiff12nc", "tiffscaled8"] {
            assert!(base().device(ok).build().is_ok(), "{ok} should be accepted");
        }
        for bad in ["png16m", "pdfwrite", "tiff", "TIFF24NC", "tiff24nc -dSAFER", ""] {
            assert!(base().device(bad).build().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(base().timeout_secs(0).build().is_err());
    }

    #[test]
    fn base_url_adds_scheme_and_trims_slash() {
        let mut repo = RepositoryConfig {
            server: "lfserver/LFRepositoryAPI/".into(),
            ..RepositoryConfig::default()
        };
        assert_eq!(repo.base_url(), "http://lfserver/LFRepositoryAPI");
        repo.server = "https://lf.example.org".into();
        assert_eq!(repo.base_url(), "https://lf.example.org");
    }

    #[test]
    fn debug_redacts_password() {
        let config = base().password("hunter2").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
