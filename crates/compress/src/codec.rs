use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};
use tracing::instrument;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

pub(crate) const GZIP_LEVEL: flate2::Compression = flate2::Compression::best();
const XZ_PRESET: u32 = 9;

impl Compression {
    /// Encode everything from `reader` into `writer` and finish the stream.
    ///
    /// Returns the number of payload bytes consumed, and the writer.
    #[instrument(skip(reader, writer), fields(format = %self, payload_size))]
    pub fn compress_stream<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<(u64, W)> {
        let (size, writer) = match self {
            Compression::None => (io::copy(&mut reader, &mut writer).or_raise(|| ErrorKind::Io)?, writer),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(writer, GZIP_LEVEL);
                let size = io::copy(&mut reader, &mut encoder).or_raise(|| ErrorKind::Io)?;
                (size, encoder.finish().or_raise(|| ErrorKind::Io)?)
            },
            Compression::Xz => {
                let mut encoder = XzEncoder::new(writer, XZ_PRESET);
                let size = io::copy(&mut reader, &mut encoder).or_raise(|| ErrorKind::Io)?;
                (size, encoder.finish().or_raise(|| ErrorKind::Io)?)
            },
        };
        tracing::Span::current().record("payload_size", size);
        Ok((size, writer))
    }

    /// A reader yielding the decoded payload of `reader`.
    ///
    /// ```
    /// use rekit_compress::Compression;
    /// use std::io::Read;
    ///
    /// let packed = Compression::Gzip.compress(b"PRG bank").unwrap();
    /// let mut payload = Vec::new();
    /// Compression::Gzip.wrap_reader(packed.as_slice()).unwrap().read_to_end(&mut payload).unwrap();
    /// assert_eq!(payload, b"PRG bank");
    /// ```
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            Compression::Xz => Box::new(XzDecoder::new(reader)),
        })
    }

    /// In-memory [`compress_stream`](Self::compress_stream).
    pub fn compress(&self, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(self.compress_stream(payload, Vec::new())?.1)
    }

    /// In-memory decode.
    pub fn decompress(&self, packed: &[u8]) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        self.wrap_reader(packed)?.read_to_end(&mut payload).or_raise(|| ErrorKind::Corrupt)?;
        Ok(payload)
    }
}
