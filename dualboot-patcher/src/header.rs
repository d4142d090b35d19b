use crate::utils::{ReadExt, trim_end};
use bytemuck::{Pod, Zeroable};
use std::fs::File;
use std::io;
use std::path::Path;

pub const BOOT_MAGIC: &[u8] = b"ANDROID!";
pub const BOOT_NAME_SIZE: usize = 16;
pub const BOOT_ARGS_SIZE: usize = 512;
pub const BOOT_EXTRA_ARGS_SIZE: usize = 1024;
pub const BOOT_ID_SIZE: usize = 32;

/// mkbootimg places the kernel at `base + KERNEL_OFFSET` unless told otherwise.
pub const KERNEL_OFFSET: u32 = 0x0000_8000;

/// Boot image header, version 0 layout. Versions 1 and 2 only append fields.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct BootHeaderV0 {
    pub magic: [u8; 8],
    pub kernel_size: u32,
    pub kernel_addr: u32,
    pub ramdisk_size: u32,
    pub ramdisk_addr: u32,
    pub second_size: u32,
    pub second_addr: u32,
    pub tags_addr: u32,
    pub page_size: u32,
    pub header_version: u32,
    pub os_version: u32,
    pub name: [u8; BOOT_NAME_SIZE],
    pub cmdline: [u8; BOOT_ARGS_SIZE],
    pub id: [u8; BOOT_ID_SIZE],
    pub extra_cmdline: [u8; BOOT_EXTRA_ARGS_SIZE],
}

impl BootHeaderV0 {
    pub const SIZE: usize = size_of::<Self>();

    pub fn parse(data: &[u8]) -> Option<Self> {
        if !data.starts_with(BOOT_MAGIC) || data.len() < Self::SIZE {
            return None;
        }
        Some(bytemuck::pod_read_unaligned(&data[..Self::SIZE]))
    }

    /// Reads the header at the start of `path`. `Ok(None)` means the file is not an Android boot image.
    pub fn probe(path: &Path) -> io::Result<Option<Self>> {
        let mut file = File::open(path)?;
        let mut header = Self::zeroed();
        match file.read_pod(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        if &header.magic[..] != BOOT_MAGIC {
            return Ok(None);
        }
        Ok(Some(header))
    }

    pub fn base(&self) -> u32 {
        self.kernel_addr.wrapping_sub(KERNEL_OFFSET)
    }

    pub fn ramdisk_offset(&self) -> u32 {
        self.ramdisk_addr.wrapping_sub(self.base())
    }

    /// Full kernel command line, including the v0 extra args area.
    pub fn cmdline(&self) -> String {
        let mut cmdline = String::from_utf8_lossy(trim_end(&self.cmdline)).into_owned();
        let extra = trim_end(&self.extra_cmdline);
        if !extra.is_empty() {
            cmdline.push_str(&String::from_utf8_lossy(extra));
        }
        cmdline
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(trim_end(&self.name)).into_owned()
    }
}
