use crate::archive::patch_zip;
use crate::bootimg::patch_boot_image;
use crate::classifier::{Classification, classify};
use crate::config::{Config, DUALBOOT_SUFFIX};
use crate::error::PatchError;
use crate::tools::Tools;
use crate::utils::move_file;
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Zip,
    Img,
}

impl FileType {
    /// Decided by the literal, case sensitive suffix of the path.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.as_os_str().to_string_lossy();
        if name.ends_with(".zip") {
            Some(FileType::Zip)
        } else if name.ends_with(".img") {
            Some(FileType::Img)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileType::Zip => "zip",
            FileType::Img => "img",
        }
    }
}

/// `foo.zip` becomes `foo_dualboot.zip` next to the original.
pub fn dualboot_path(path: &Path, file_type: FileType) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        "{}{}.{}",
        stem,
        DUALBOOT_SUFFIX,
        file_type.extension()
    ))
}

/// Runs the whole conversion for `input` and returns the path of the patched file.
///
/// Temporary directories are removed before this returns, whether it succeeds or not.
pub fn patch_file(config: &Config, input: &Path) -> Result<PathBuf> {
    if !input.exists() {
        return Err(PatchError::InputMissing(input.to_path_buf()).into());
    }
    let input = std::path::absolute(input)
        .with_context(|| format!("resolving {}", input.display()))?;
    let file_type = FileType::detect(&input).ok_or(PatchError::UnsupportedFile)?;

    let (detection, mut info) = match classify(&input) {
        Classification::Supported(detection, info) => (detection, info),
        Classification::AlreadyDualBoot => return Err(PatchError::AlreadyDualBoot.into()),
        Classification::Unsupported => {
            return Err(match file_type {
                FileType::Zip => PatchError::UnsupportedZip,
                FileType::Img => PatchError::UnsupportedFile,
            }
            .into());
        }
    };
    println!("{}", detection.label);
    for note in detection.notes {
        println!("{}", note);
    }

    if let Some(ramdisk) = &config.ramdisk_override {
        println!("Using ramdisk {}", ramdisk);
        info.ramdisk = Some(ramdisk.clone());
    }
    debug!(?info, ?file_type, "classified input");

    let tools = Tools::from_config(config);
    let mut workspace = Workspace::new(config.temp_dir.as_deref());

    let produced = match file_type {
        FileType::Zip => patch_zip(config, &tools, &mut workspace, &input, &info)?,
        FileType::Img => patch_boot_image(config, &tools, &mut workspace, &input, &info)?,
    };

    let output = dualboot_path(&input, file_type);
    move_file(&produced, &output)
        .with_context(|| format!("moving result to {}", output.display()))?;
    workspace.close()?;

    match file_type {
        FileType::Zip => println!("Successfully patched zip"),
        FileType::Img => println!("Successfully patched boot image"),
    }
    info!(path = %output.display(), "patched");
    println!("Path: {}", output.display());
    Ok(output)
}
