use bzip2::read::BzDecoder;
use flate2::Compression as GzCompression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use lz4::Decoder as LZ4FrameDecoder;
use lzma_rust2::{LzmaReader, XzReader};
use std::io::{BufWriter, Read, Write};
use std::num::NonZeroU64;
use zopfli::{BlockType, GzipEncoder as ZopFliEncoder, Options as ZopfliOptions};

const GZIP1_MAGIC: &[u8] = b"\x1f\x8b";
const GZIP2_MAGIC: &[u8] = b"\x1f\x9e";
const LZOP_MAGIC: &[u8] = b"\x89LZO";
const XZ_MAGIC: &[u8] = b"\xfd7zXZ";
const BZIP_MAGIC: &[u8] = b"BZh";
const LZ4_LEG_MAGIC: &[u8] = b"\x02\x21\x4c\x18";
const LZ41_MAGIC: &[u8] = b"\x03\x21\x4c\x18";
const LZ42_MAGIC: &[u8] = b"\x04\x22\x4d\x18";

#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum CompressFormat {
    UNKNOWN,
    GZIP,
    LZOP,
    XZ,
    LZMA,
    BZIP2,
    LZ4,
    LZ4_LEGACY,
}

impl CompressFormat {
    /// Whether [`get_decoder`] can turn this format back into raw data.
    pub fn is_decodable(self) -> bool {
        matches!(
            self,
            CompressFormat::GZIP
                | CompressFormat::XZ
                | CompressFormat::LZMA
                | CompressFormat::BZIP2
                | CompressFormat::LZ4
        )
    }
}

/// Encoder used when a ramdisk has to be (re)compressed to gzip.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum GzipEncoder {
    #[default]
    Deflate,
    Zopfli,
}

fn guess_lzma(data: &[u8]) -> bool {
    if data.len() <= 13 {
        return false;
    }

    if data[0] != b'\x5d' {
        return false;
    }

    let dict_size = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);

    if dict_size == 0 || (dict_size & (dict_size - 1)) != 0 {
        return false;
    }

    &data[5..13] == b"\xff\xff\xff\xff\xff\xff\xff\xff"
}

pub fn parse_compress_format(data: &[u8]) -> CompressFormat {
    if data.starts_with(GZIP1_MAGIC) || data.starts_with(GZIP2_MAGIC) {
        CompressFormat::GZIP
    } else if data.starts_with(LZOP_MAGIC) {
        CompressFormat::LZOP
    } else if data.starts_with(XZ_MAGIC) {
        CompressFormat::XZ
    } else if data.starts_with(BZIP_MAGIC) {
        CompressFormat::BZIP2
    } else if data.starts_with(LZ41_MAGIC) || data.starts_with(LZ42_MAGIC) {
        CompressFormat::LZ4
    } else if data.starts_with(LZ4_LEG_MAGIC) {
        CompressFormat::LZ4_LEGACY
    } else if guess_lzma(data) {
        CompressFormat::LZMA
    } else {
        CompressFormat::UNKNOWN
    }
}

pub trait WriteFinish<W: Write>: Write {
    fn finish(self: Box<Self>) -> std::io::Result<W>;
}

impl<W: Write> WriteFinish<W> for GzEncoder<W> {
    fn finish(self: Box<Self>) -> std::io::Result<W> {
        Self::finish(*self)
    }
}

impl<W: Write> WriteFinish<W> for BufWriter<ZopFliEncoder<W>> {
    fn finish(self: Box<Self>) -> std::io::Result<W> {
        let inner = self.into_inner()?;
        ZopFliEncoder::finish(inner)
    }
}

pub fn get_decoder<'a, R: Read + 'a>(
    format: CompressFormat,
    r: R,
) -> anyhow::Result<Box<dyn Read + 'a>> {
    Ok(match format {
        CompressFormat::XZ => Box::new(XzReader::new(r, true)),
        CompressFormat::LZMA => Box::new(LzmaReader::new_mem_limit(r, u32::MAX, None)?),
        CompressFormat::BZIP2 => Box::new(BzDecoder::new(r)),
        CompressFormat::LZ4 => Box::new(LZ4FrameDecoder::new(r)?),
        CompressFormat::GZIP => Box::new(MultiGzDecoder::new(r)),
        other => anyhow::bail!("no decoder for {:?}", other),
    })
}

pub fn get_gzip_encoder<'a, W: Write + ?Sized>(
    encoder: GzipEncoder,
    w: &'a mut W,
) -> std::io::Result<Box<dyn WriteFinish<&'a mut W> + 'a>> {
    Ok(match encoder {
        GzipEncoder::Zopfli => {
            let opt = ZopfliOptions {
                iteration_count: NonZeroU64::MIN,
                maximum_block_splits: 1,
                ..Default::default()
            };
            Box::new(ZopFliEncoder::new_buffered(opt, BlockType::Dynamic, w)?)
        }
        GzipEncoder::Deflate => Box::new(GzEncoder::new(w, GzCompression::best())),
    })
}

/// Gzip-compresses `data` with the requested encoder.
pub fn gzip(data: &[u8], encoder: GzipEncoder) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut writer = get_gzip_encoder(encoder, &mut out)?;
    writer.write_all(data)?;
    writer.finish()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        get_decoder(CompressFormat::GZIP, data)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn detects_magic() {
        assert_eq!(parse_compress_format(b"\x1f\x8b\x08\x00"), CompressFormat::GZIP);
        assert_eq!(parse_compress_format(b"\xfd7zXZ\x00\x00"), CompressFormat::XZ);
        assert_eq!(parse_compress_format(b"BZh91AY"), CompressFormat::BZIP2);
        assert_eq!(parse_compress_format(b"\x04\x22\x4d\x18"), CompressFormat::LZ4);
        assert_eq!(parse_compress_format(b"070701000000"), CompressFormat::UNKNOWN);
        assert_eq!(parse_compress_format(b""), CompressFormat::UNKNOWN);
    }

    #[test]
    fn lzma_guess_requires_power_of_two_dict() {
        let mut header = vec![0x5d, 0x00, 0x00, 0x80, 0x00];
        header.extend_from_slice(&[0xff; 8]);
        header.push(0);
        assert_eq!(parse_compress_format(&header), CompressFormat::LZMA);

        header[1] = 0x03;
        assert_eq!(parse_compress_format(&header), CompressFormat::UNKNOWN);
    }

    #[test]
    fn gzip_output_is_detected_and_decodes() {
        let payload = b"070701 fake cpio payload".repeat(64);
        for encoder in [GzipEncoder::Deflate, GzipEncoder::Zopfli] {
            let compressed = gzip(&payload, encoder).unwrap();
            assert_eq!(parse_compress_format(&compressed), CompressFormat::GZIP);
            assert_eq!(gunzip(&compressed), payload);
        }
    }

    #[test]
    fn lzop_has_no_decoder() {
        assert!(!CompressFormat::LZOP.is_decodable());
        assert!(get_decoder(CompressFormat::LZOP, &b""[..]).is_err());
    }
}
