use crate::compress::{CompressFormat, GzipEncoder, get_decoder, gzip, parse_compress_format};
use crate::cpio::CpioIndex;
use crate::error::PatchError;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Named ramdisks packed in an xz compressed tarball.
pub struct RamdiskStore {
    archive: PathBuf,
}

impl RamdiskStore {
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
        }
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    fn open(&self) -> Result<tar::Archive<Box<dyn Read>>> {
        let file = File::open(&self.archive)
            .with_context(|| format!("opening {}", self.archive.display()))?;
        let decoder = get_decoder(CompressFormat::XZ, BufReader::new(file))?;
        Ok(tar::Archive::new(decoder))
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut archive = self.open()?;
        let mut names = Vec::new();
        for entry in archive.entries()? {
            let entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            names.push(member_name(&entry.path()?));
        }
        names.sort();
        Ok(names)
    }

    /// Returns the raw bytes of the member called `name`.
    pub fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let mut archive = self.open()?;
        for entry in archive.entries()? {
            let mut entry = entry?;
            if member_name(&entry.path()?) != name {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut data)
                .with_context(|| format!("reading {} from {}", name, self.archive.display()))?;
            debug!(name, size = data.len(), "extracted ramdisk");
            return Ok(data);
        }
        Err(PatchError::RamdiskNotFound {
            name: name.to_owned(),
            archive: self.archive.clone(),
        }
        .into())
    }

    /// Fetches `name` and returns it as a gzip compressed cpio archive.
    pub fn fetch_gzipped(&self, name: &str, encoder: GzipEncoder) -> Result<Vec<u8>> {
        let data = self.fetch(name)?;
        ensure_gzip(name, data, encoder)
    }
}

fn member_name(path: &Path) -> String {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.to_string_lossy().into_owned()
}

/// Converts a ramdisk to gzip. Gzip input and `.gz` members are passed through untouched, other
/// known formats are decompressed first and plain data is compressed as is.
pub fn ensure_gzip(name: &str, data: Vec<u8>, encoder: GzipEncoder) -> Result<Vec<u8>> {
    let format = parse_compress_format(&data);
    if name.ends_with(".gz") && format != CompressFormat::GZIP {
        warn!(name, ?format, "ramdisk is named .gz but is not gzip data, using it unchanged");
        return Ok(data);
    }

    match format {
        CompressFormat::GZIP => {
            inspect(name, &decode(name, format, &data)?);
            Ok(data)
        }
        CompressFormat::UNKNOWN => {
            inspect(name, &data);
            debug!(name, ?encoder, "compressing ramdisk with gzip");
            Ok(gzip(&data, encoder)?)
        }
        f if f.is_decodable() => {
            let raw = decode(name, f, &data)?;
            inspect(name, &raw);
            debug!(name, ?f, ?encoder, "recompressing ramdisk with gzip");
            Ok(gzip(&raw, encoder)?)
        }
        f => bail!("ramdisk {} uses unsupported compression {:?}", name, f),
    }
}

fn decode(name: &str, format: CompressFormat, data: &[u8]) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    get_decoder(format, data)?
        .read_to_end(&mut raw)
        .with_context(|| format!("decompressing {:?} ramdisk {}", format, name))?;
    Ok(raw)
}

fn inspect(name: &str, raw: &[u8]) {
    match CpioIndex::load_from_data(raw) {
        Ok(index) if !index.contains("init") => {
            warn!(name, entries = index.len(), "ramdisk has no /init");
        }
        Ok(index) => debug!(name, entries = index.len(), "ramdisk looks sane"),
        Err(e) => warn!(name, error = %e, "ramdisk is not a newc cpio archive"),
    }
}
