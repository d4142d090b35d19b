use crate::classifier::FileInfo;
use crate::config::{Config, RAMDISK_OFFSET};
use crate::error::PatchError;
use crate::header::BootHeaderV0;
use crate::ramdisk::RamdiskStore;
use crate::tools::{PackArgs, Tools};
use crate::utils::{parse_hex_u32, read_first_line};
use crate::workspace::Workspace;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const KERNEL_FILE: &str = "kernel.img";
pub const RAMDISK_FILE: &str = "ramdisk.cpio.gz";
pub const OUTPUT_FILE: &str = "complete.img";

/// Boot image parameters recovered from the files `unpackbootimg` leaves next to the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootParams {
    pub base: String,
    pub cmdline: String,
    pub page_size: String,
}

/// `<dir>/<image name><suffix>`, the naming scheme of `unpackbootimg`.
pub fn sidecar(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn read_sidecar(prefix: &Path, suffix: &str) -> Result<String> {
    let path = sidecar(prefix, suffix);
    read_first_line(&path).with_context(|| format!("reading {}", path.display()))
}

impl BootParams {
    pub fn read(prefix: &Path) -> Result<Self> {
        Ok(Self {
            base: format!("0x{}", read_sidecar(prefix, "-base")?),
            cmdline: read_sidecar(prefix, "-cmdline")?,
            page_size: read_sidecar(prefix, "-pagesize")?,
        })
    }
}

/// Replaces the ramdisk of `boot_image` with the one named in `info` and returns the path of
/// the rebuilt image inside a fresh temporary directory.
pub fn patch_boot_image(
    config: &Config,
    tools: &Tools,
    workspace: &mut Workspace,
    boot_image: &Path,
    info: &FileInfo,
) -> Result<PathBuf> {
    let ramdisk_name = info.ramdisk.as_deref().ok_or(PatchError::NoRamdisk)?;
    tools.check_boot_tools()?;

    let tempdir = workspace.create_dir()?;
    match BootHeaderV0::probe(boot_image) {
        Ok(Some(header)) => debug!(
            page_size = header.page_size,
            base = %format!("{:#010x}", header.base()),
            cmdline = %header.cmdline(),
            "input boot image"
        ),
        Ok(None) => warn!(path = %boot_image.display(), "no Android boot image header found"),
        Err(e) => return Err(e).with_context(|| format!("reading {}", boot_image.display())),
    }

    tools.unpack(boot_image, &tempdir)?;

    let file_name = boot_image
        .file_name()
        .with_context(|| format!("{} has no file name", boot_image.display()))?;
    let prefix = tempdir.join(file_name);
    let params = BootParams::read(&prefix)?;
    debug!(?params, "read boot image parameters");

    for suffix in ["-base", "-cmdline", "-pagesize"] {
        fs::remove_file(sidecar(&prefix, suffix))?;
    }
    let stock_ramdisk = sidecar(&prefix, "-ramdisk.gz");
    if stock_ramdisk.exists() {
        fs::remove_file(&stock_ramdisk)?;
    }
    let kernel = tempdir.join(KERNEL_FILE);
    fs::rename(sidecar(&prefix, "-zImage"), &kernel)
        .with_context(|| format!("{} has no kernel", boot_image.display()))?;

    let store = RamdiskStore::new(config.ramdisk_archive());
    let ramdisk_data = store.fetch_gzipped(ramdisk_name, config.gzip_encoder)?;
    let ramdisk = tempdir.join(RAMDISK_FILE);
    fs::write(&ramdisk, ramdisk_data)?;

    let output = tempdir.join(OUTPUT_FILE);
    let packed = tools.pack(&PackArgs {
        kernel: &kernel,
        ramdisk: &ramdisk,
        cmdline: &params.cmdline,
        base: &params.base,
        page_size: &params.page_size,
        ramdisk_offset: RAMDISK_OFFSET,
        output: &output,
    });

    fs::remove_file(&kernel)?;
    fs::remove_file(&ramdisk)?;
    packed?;

    verify_repacked(&output, &params)?;
    Ok(output)
}

/// Checks the header written by `mkbootimg` against the values it was given. Images without an
/// Android header are left alone.
pub fn verify_repacked(image: &Path, params: &BootParams) -> Result<()> {
    let Some(header) = BootHeaderV0::probe(image)
        .with_context(|| format!("reading {}", image.display()))?
    else {
        debug!(path = %image.display(), "skipping header verification");
        return Ok(());
    };

    if params.page_size.trim() != header.page_size.to_string() {
        return mismatch("page size", params.page_size.clone(), header.page_size.to_string());
    }
    if params.cmdline != header.cmdline() {
        return mismatch("cmdline", params.cmdline.clone(), header.cmdline());
    }
    if parse_hex_u32(&params.base) != Some(header.base()) {
        return mismatch("base", params.base.clone(), format!("{:#010x}", header.base()));
    }
    if parse_hex_u32(RAMDISK_OFFSET) != Some(header.ramdisk_offset()) {
        return mismatch(
            "ramdisk offset",
            RAMDISK_OFFSET.to_owned(),
            format!("{:#010x}", header.ramdisk_offset()),
        );
    }
    Ok(())
}

fn mismatch(field: &'static str, expected: String, actual: String) -> Result<()> {
    Err(PatchError::HeaderMismatch {
        field,
        expected,
        actual,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::tests::sample_header;
    use bytemuck::bytes_of;

    fn params(base: &str, cmdline: &str, page_size: &str) -> BootParams {
        BootParams {
            base: base.to_owned(),
            cmdline: cmdline.to_owned(),
            page_size: page_size.to_owned(),
        }
    }

    #[test]
    fn sidecar_appends_to_file_name() {
        assert_eq!(
            sidecar(Path::new("/tmp/x/boot.img"), "-pagesize"),
            Path::new("/tmp/x/boot.img-pagesize")
        );
    }

    #[test]
    fn reads_params_from_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("boot.img");
        fs::write(sidecar(&prefix, "-base"), "80200000\n").unwrap();
        fs::write(
            sidecar(&prefix, "-cmdline"),
            "console=null androidboot.hardware=qcom user_debug=31\n",
        )
        .unwrap();
        fs::write(sidecar(&prefix, "-pagesize"), "2048\n").unwrap();

        assert_eq!(
            BootParams::read(&prefix).unwrap(),
            params(
                "0x80200000",
                "console=null androidboot.hardware=qcom user_debug=31",
                "2048"
            )
        );
    }

    #[test]
    fn missing_sidecar_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(BootParams::read(&dir.path().join("boot.img")).is_err());
    }

    #[test]
    fn no_ramdisk_fails_before_touching_tools() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        let tools = Tools::from_config(&config);
        let mut workspace = Workspace::new(Some(dir.path()));
        let info = FileInfo::default();

        let err = patch_boot_image(&config, &tools, &mut workspace, Path::new("boot.img"), &info)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PatchError>(),
            Some(PatchError::NoRamdisk)
        ));
        assert!(workspace.is_empty());
    }

    #[test]
    fn verification_accepts_matching_header() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join(OUTPUT_FILE);
        let header = sample_header(0x8020_0000, 2048, "console=null");
        fs::write(&image, bytes_of(&header)).unwrap();

        verify_repacked(&image, &params("0x80200000", "console=null", "2048")).unwrap();
    }

    #[test]
    fn verification_reports_mismatches() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join(OUTPUT_FILE);
        let header = sample_header(0x8020_0000, 2048, "console=null");
        fs::write(&image, bytes_of(&header)).unwrap();

        let err = verify_repacked(&image, &params("0x80200000", "console=null", "4096"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PatchError>(),
            Some(PatchError::HeaderMismatch { field: "page size", .. })
        ));

        let err = verify_repacked(&image, &params("0x10000000", "console=null", "2048"))
            .unwrap_err();
        assert!(err.to_string().contains("base"));
    }

    #[test]
    fn verification_skips_foreign_images() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join(OUTPUT_FILE);
        fs::write(&image, "FAKEBOOT").unwrap();
        verify_repacked(&image, &params("0x0", "", "2048")).unwrap();
    }
}
