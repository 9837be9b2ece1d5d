use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use brotli::{CompressorWriter as BrotliEncoder, Decompressor as BrotliDecoder};
use flate2::{read::GzDecoder, write::GzEncoder};

/// Gzip streams start with these two bytes; brotli has no magic.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whole-buffer compression used for point files and region sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    GZip,
    Brotli,
}

impl Compression {
    /// Pick the coder from a file extension (`.gz`, `.br`), `None` otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::GZip,
            Some("br") => Self::Brotli,
            _ => Self::None,
        }
    }

    /// Detect the coder of a point file: gzip by magic bytes, brotli otherwise.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) { Self::GZip } else { Self::Brotli }
    }
}

/// Compress `data` in one shot.
pub fn compress(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::GZip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::best());
            encoder.write_all(data)
                .context("[common::compress] Failed to gzip data")?;
            encoder.finish()
                .context("[common::compress] Failed to finish gzip stream")
        }
        Compression::Brotli => {
            let mut out = Vec::new();
            {
                let mut encoder = BrotliEncoder::new(&mut out, 4096, 11, 24);
                encoder.write_all(data)
                    .context("[common::compress] Failed to brotli-compress data")?;
                encoder.flush()
                    .context("[common::compress] Failed to flush brotli stream")?;
            }
            Ok(out)
        }
    }
}

/// Decompress `data` in one shot.
pub fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    reader(data, compression).read_to_end(&mut out)
        .with_context(|| format!("[common::compress] Failed to decompress {compression:?} data"))?;
    Ok(out)
}

/// Wrap a reader so that it yields decompressed bytes.
pub fn reader<'a, R: Read + 'a>(inner: R, compression: Compression) -> Box<dyn Read + 'a> {
    match compression {
        Compression::None => Box::new(inner),
        Compression::GZip => Box::new(GzDecoder::new(inner)),
        Compression::Brotli => Box::new(BrotliDecoder::new(inner, 4096)),
    }
}
