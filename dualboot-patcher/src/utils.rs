use bytemuck::{Pod, bytes_of_mut};
use std::fmt::{Debug, Display, LowerHex};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

pub trait ReadExt {
    fn read_pod<F: Pod>(&mut self, data: &mut F) -> io::Result<()>;
}

impl<T: Read> ReadExt for T {
    fn read_pod<F: Pod>(&mut self, data: &mut F) -> io::Result<()> {
        self.read_exact(bytes_of_mut(data))
    }
}

pub fn align_to<N: num_traits::PrimInt + Display + Debug + LowerHex>(num: N, alignment: N) -> N {
    let one = N::one();
    assert_eq!(
        alignment & (alignment - one),
        N::zero(),
        "invalid alignment 0x{:x}",
        alignment
    );
    (num + alignment - one) & !(alignment - one)
}

pub fn trim_end(data: &[u8]) -> &[u8] {
    &data[..data.iter().position(|&b| b == 0).unwrap_or(data.len())]
}

/// First line of a text file without its line terminator.
pub fn read_first_line(path: &Path) -> io::Result<String> {
    let content = fs::read_to_string(path)?;
    let line = content.split('\n').next().unwrap_or_default();
    Ok(line.trim_end_matches('\r').to_owned())
}

/// Moves a file, falling back to copy + remove when `rename` cannot cross filesystems.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// Parses `0x`-prefixed or bare hexadecimal numbers as written by the boot image tools.
pub fn parse_hex_u32(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}
