//! External boot image and patch tools.
//!
//! Every tool is run synchronously; success is a zero exit status. Standard output is captured
//! and only shown at debug level, standard error is passed through to the user.

use crate::config::Config;
use crate::error::PatchError;
use anyhow::{Result, bail};
use itertools::Itertools;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, instrument};

pub const UNPACKBOOTIMG: &str = "unpackbootimg";
pub const MKBOOTIMG: &str = "mkbootimg";

#[derive(Debug, Clone)]
pub struct Tools {
    pub unpackbootimg: PathBuf,
    pub mkbootimg: PathBuf,
    pub patch: PathBuf,
}

/// Arguments for a `mkbootimg` run.
#[derive(Debug)]
pub struct PackArgs<'a> {
    pub kernel: &'a Path,
    pub ramdisk: &'a Path,
    pub cmdline: &'a str,
    pub base: &'a str,
    pub page_size: &'a str,
    pub ramdisk_offset: &'a str,
    pub output: &'a Path,
}

#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
}

fn render_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(OsStr::to_string_lossy)
        .join(" ")
}

#[instrument(skip_all, fields(program = %program.display()))]
pub fn run_command(program: &Path, args: &[OsString]) -> Result<ToolOutput, PatchError> {
    let rendered = render_command(program, args);
    debug!(command = %rendered, "running");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| PatchError::ToolSpawn {
            command: rendered,
            source,
        })?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !stdout.is_empty() {
        debug!(stdout = %stdout.trim_end(), "tool output");
    }
    debug!(status = %output.status, "finished");
    Ok(ToolOutput {
        status: output.status,
        stdout,
    })
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_checked(program: &Path, args: Vec<OsString>, message: &'static str) -> Result<ToolOutput> {
    let output = run_command(program, &args)?;
    if !output.status.success() {
        return Err(PatchError::ToolFailed {
            tool: tool_name(program),
            message,
            status: output.status,
        }
        .into());
    }
    Ok(output)
}

impl Tools {
    pub fn from_config(config: &Config) -> Self {
        let patch = match &config.patch_tool {
            Some(tool) => tool.clone(),
            // Windows wants anything named patch.exe to run as Administrator
            None if cfg!(windows) => config.binaries_dir().join("hctap.exe"),
            None => which::which("patch").unwrap_or_else(|_| PathBuf::from("patch")),
        };
        Self {
            unpackbootimg: config.binary(UNPACKBOOTIMG),
            mkbootimg: config.binary(MKBOOTIMG),
            patch,
        }
    }

    /// Fails early with a readable message if the boot image tools were not shipped.
    pub fn check_boot_tools(&self) -> Result<()> {
        let missing = [&self.unpackbootimg, &self.mkbootimg]
            .into_iter()
            .filter(|tool| !tool.is_file())
            .map(|tool| format!("  {}", tool.display()))
            .join("\n");
        if !missing.is_empty() {
            bail!("Missing boot image tools:\n{}", missing);
        }
        Ok(())
    }

    pub fn unpack(&self, boot_image: &Path, out_dir: &Path) -> Result<()> {
        let args = vec![
            "-i".into(),
            boot_image.into(),
            "-o".into(),
            out_dir.into(),
        ];
        run_checked(&self.unpackbootimg, args, "Failed to extract boot image")?;
        Ok(())
    }

    pub fn pack(&self, pack: &PackArgs<'_>) -> Result<()> {
        let args = vec![
            "--kernel".into(),
            pack.kernel.into(),
            "--ramdisk".into(),
            pack.ramdisk.into(),
            "--cmdline".into(),
            pack.cmdline.into(),
            "--base".into(),
            pack.base.into(),
            "--pagesize".into(),
            pack.page_size.into(),
            "--ramdisk_offset".into(),
            pack.ramdisk_offset.into(),
            "--output".into(),
            pack.output.into(),
        ];
        run_checked(&self.mkbootimg, args, "Failed to create boot image")?;
        Ok(())
    }

    /// Applies a unified diff with strip level 1 inside `dir`.
    pub fn apply_patch(&self, patch_file: &Path, dir: &Path) -> Result<()> {
        let args = vec![
            "-p".into(),
            "1".into(),
            "-d".into(),
            dir.into(),
            "-i".into(),
            patch_file.into(),
        ];
        run_checked(&self.patch, args, "Failed to apply patch")?;
        Ok(())
    }
}
