use crate::utils::align_to;
use anyhow::{Result, bail};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::{io, str};

pub const TYPE_MASK: u32 = 0o170000;
pub const TYPE_DIR: u32 = 0o040000;
pub const TYPE_REGULAR: u32 = 0o100000;
pub const TYPE_SYMLINK: u32 = 0o120000;

const NEWC_MAGIC: &[u8] = b"070701";
const TRAILER: &str = "TRAILER!!!";

/// Entry index of a newc ramdisk. File contents are not retained.
pub struct CpioIndex {
    entries: BTreeMap<String, CpioEntryInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpioEntryInfo {
    pub mode: u32,
    pub size: u32,
}

impl CpioEntryInfo {
    pub fn is_dir(&self) -> bool {
        self.mode & TYPE_MASK == TYPE_DIR
    }

    pub fn is_regular(&self) -> bool {
        self.mode & TYPE_MASK == TYPE_REGULAR
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & TYPE_MASK == TYPE_SYMLINK
    }
}

fn read_hex_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    str::from_utf8(&bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid utf-8 header field"))
        .and_then(|string| {
            u32::from_str_radix(string, 16).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "Invalid hex u32 header field")
            })
        })
}

fn norm_path(path: &str) -> String {
    Itertools::intersperse(
        path.split('/').filter(|x| !x.is_empty() && *x != "."),
        "/",
    )
    .collect()
}

impl CpioIndex {
    pub fn load_from_data(data: &[u8]) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut cursor = Cursor::new(data);
        loop {
            if cursor.position() as usize >= data.len() {
                break;
            }
            let mut magic = [0u8; 6];
            cursor.read_exact(&mut magic)?;
            if magic.as_slice() != NEWC_MAGIC {
                bail!("unsupported cpio header at offset {}", cursor.position() - 6);
            }

            let _ino = read_hex_u32(&mut cursor)?;
            let mode = read_hex_u32(&mut cursor)?;
            let _uid = read_hex_u32(&mut cursor)?;
            let _gid = read_hex_u32(&mut cursor)?;
            let _nlink = read_hex_u32(&mut cursor)?;
            let _mtime = read_hex_u32(&mut cursor)?;
            let file_size = read_hex_u32(&mut cursor)?;
            let _dev_major = read_hex_u32(&mut cursor)?;
            let _dev_minor = read_hex_u32(&mut cursor)?;
            let _rdev_major = read_hex_u32(&mut cursor)?;
            let _rdev_minor = read_hex_u32(&mut cursor)?;
            let name_len = read_hex_u32(&mut cursor)? as usize;
            let _checksum = read_hex_u32(&mut cursor)?;

            let mut name_bytes = vec![0u8; name_len];
            cursor.read_exact(&mut name_bytes)?;
            if name_bytes.last() != Some(&0) {
                bail!("Entry name was not NUL-terminated")
            }
            while name_bytes.last() == Some(&0) {
                name_bytes.pop();
            }
            let name = String::from_utf8(name_bytes)?;
            cursor.set_position(align_to(cursor.position(), 4));
            if name == TRAILER {
                break;
            }

            let data_end = cursor.position() + file_size as u64;
            if data_end > data.len() as u64 {
                bail!("entry {} is truncated", name);
            }
            cursor.set_position(align_to(data_end, 4));
            let name = norm_path(&name);
            if name.is_empty() || name == ".." {
                continue;
            }
            entries.insert(
                name,
                CpioEntryInfo {
                    mode,
                    size: file_size,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn entry(&self, name: &str) -> Option<&CpioEntryInfo> {
        self.entries.get(&norm_path(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
