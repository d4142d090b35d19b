use crate::compress::GzipEncoder;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load offset of the ramdisk relative to the base address on jflte.
pub const RAMDISK_OFFSET: &str = "0x02000000";
pub const DUALBOOT_SUFFIX: &str = "_dualboot";
pub const RAMDISK_ARCHIVE: &str = "ramdisks.tar.xz";
pub const HELPER_SCRIPT: &str = "dualboot.sh";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `ramdisks/`, `patches/` and `binaries/`.
    pub data_dir: PathBuf,
    /// Diff tool to run instead of `patch` from `PATH`.
    pub patch_tool: Option<PathBuf>,
    /// Parent directory for the per-run temporary directories.
    pub temp_dir: Option<PathBuf>,
    pub ramdisk_override: Option<String>,
    pub gzip_encoder: GzipEncoder,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            patch_tool: None,
            temp_dir: None,
            ramdisk_override: None,
            gzip_encoder: GzipEncoder::default(),
        }
    }

    /// The data files ship one level above the directory containing the executable.
    pub fn default_data_dir() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("locating the running executable")?;
        let bin_dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(bin_dir.join(".."))
    }

    pub fn ramdisk_dir(&self) -> PathBuf {
        self.data_dir.join("ramdisks")
    }

    pub fn patch_dir(&self) -> PathBuf {
        self.data_dir.join("patches")
    }

    pub fn binaries_dir(&self) -> PathBuf {
        self.data_dir.join("binaries")
    }

    pub fn ramdisk_archive(&self) -> PathBuf {
        self.ramdisk_dir().join(RAMDISK_ARCHIVE)
    }

    pub fn patch_file(&self, name: &str) -> PathBuf {
        self.patch_dir().join(name)
    }

    pub fn helper_script(&self) -> PathBuf {
        self.patch_dir().join(HELPER_SCRIPT)
    }

    pub fn binary(&self, name: &str) -> PathBuf {
        self.binaries_dir()
            .join(format!("{}{}", name, std::env::consts::EXE_SUFFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_layout() {
        let config = Config::new("/opt/dualboot");
        assert_eq!(
            config.ramdisk_archive(),
            Path::new("/opt/dualboot/ramdisks/ramdisks.tar.xz")
        );
        assert_eq!(
            config.patch_file("miui.dualboot.patch"),
            Path::new("/opt/dualboot/patches/miui.dualboot.patch")
        );
        assert_eq!(
            config.helper_script(),
            Path::new("/opt/dualboot/patches/dualboot.sh")
        );
        assert!(
            config
                .binary("mkbootimg")
                .starts_with("/opt/dualboot/binaries")
        );
    }

    #[test]
    fn default_data_dir_is_relative_to_executable() {
        let dir = Config::default_data_dir().unwrap();
        assert!(dir.ends_with(".."));
    }
}
