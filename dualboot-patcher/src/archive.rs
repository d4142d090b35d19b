use crate::bootimg::patch_boot_image;
use crate::classifier::FileInfo;
use crate::config::{Config, HELPER_SCRIPT};
use crate::tools::Tools;
use crate::utils::move_file;
use crate::workspace::Workspace;
use anyhow::{Context, Result, bail};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const OUTPUT_FILE: &str = "complete.zip";

/// Patches a flashable zip and returns the path of the rebuilt archive inside a temporary
/// directory.
pub fn patch_zip(
    config: &Config,
    tools: &Tools,
    workspace: &mut Workspace,
    zip_file: &Path,
    info: &FileInfo,
) -> Result<PathBuf> {
    println!("--- Please wait. This may take a while ---");

    let root = workspace.create_dir()?;
    extract_zip(zip_file, &root)?;

    if info.has_boot_image {
        let boot_image = root.join(&info.boot_image);
        if !boot_image.is_file() {
            bail!("{} not found in {}", info.boot_image, zip_file.display());
        }
        let new_boot_image = patch_boot_image(config, tools, workspace, &boot_image, info)?;
        fs::remove_file(&boot_image)?;
        move_file(&new_boot_image, &boot_image)?;
    } else {
        println!("No boot image to patch");
    }

    fs::copy(config.helper_script(), root.join(HELPER_SCRIPT))
        .with_context(|| format!("copying {}", config.helper_script().display()))?;

    if let Some(patch) = &info.patch {
        tools.apply_patch(&config.patch_file(patch), &root)?;
    }

    let output = root.join(OUTPUT_FILE);
    write_zip(&root, &output)?;
    Ok(output)
}

pub fn extract_zip(zip_file: &Path, dest: &Path) -> Result<()> {
    let file =
        File::open(zip_file).with_context(|| format!("opening {}", zip_file.display()))?;
    let mut archive = ZipArchive::new(file)?;
    debug!(entries = archive.len(), dest = %dest.display(), "extracting zip");
    archive
        .extract(dest)
        .with_context(|| format!("extracting {}", zip_file.display()))?;
    Ok(())
}

/// Zips every file below `root` except `output` itself, using paths relative to `root`.
pub fn write_zip(root: &Path, output: &Path) -> Result<()> {
    let mut zip = ZipWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if path == output || !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root)?;
        let name = relative
            .iter()
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let metadata = fs::metadata(path)?;

        zip.start_file(name, file_options(&metadata))?;
        let mut source = File::open(path)?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

fn file_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= u32::MAX as u64);
    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode() & 0o7777)
    };
    options
}
