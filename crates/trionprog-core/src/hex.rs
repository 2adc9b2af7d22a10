//! ASCII hex image decoding
//!
//! Bitstream images are plain text: two hex digits per byte, high nibble
//! first, with any amount of whitespace in between. Tab, space, LF, CR and
//! NUL are separators. Anything else makes the whole image corrupt.
//!
//! Validation ([`decode_size`]) and decoding ([`HexDecoder`]) are separate
//! passes over the source. The image is validated in full before the first
//! device command, and each later pass reopens the source from the start.

use std::fs::File;
use std::io::{BufReader, Bytes, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// True for bytes that may appear between hex digits
pub fn is_separator(byte: u8) -> bool {
    matches!(byte, b'\t' | b' ' | b'\n' | b'\r' | 0)
}

/// Value of a hex digit (either case)
pub fn nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Validate a hex stream and return the number of bytes it decodes to
///
/// Reads the whole stream. A trailing odd digit does not count.
pub fn decode_size<R: Read>(reader: R) -> Result<usize> {
    let mut digits = 0usize;
    for (offset, byte) in BufReader::new(reader).bytes().enumerate() {
        let byte = byte.map_err(io_error)?;
        if nibble(byte).is_some() {
            digits += 1;
        } else if !is_separator(byte) {
            log::debug!(
                "Invalid character 0x{:02X} at offset {} in hex image",
                byte,
                offset
            );
            return Err(Error::CorruptImage {
                offset: offset as u64,
            });
        }
    }
    Ok(digits / 2)
}

/// Lazy hex-to-binary decoder
///
/// Yields one byte per pair of hex digits and skips everything else. Run
/// [`decode_size`] over the same data first; the decoder does not validate.
pub struct HexDecoder<R> {
    bytes: Bytes<BufReader<R>>,
}

impl<R: Read> HexDecoder<R> {
    /// Decode from the start of `reader`
    pub fn new(reader: R) -> Self {
        HexDecoder {
            bytes: BufReader::new(reader).bytes(),
        }
    }

    /// Decode into `buf` until it is full or the source ends
    ///
    /// Returns the number of bytes produced; less than `buf.len()` only at
    /// end of stream.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut produced = 0;
        for slot in buf.iter_mut() {
            match self.next() {
                Some(byte) => *slot = byte?,
                None => break,
            }
            produced += 1;
        }
        Ok(produced)
    }
}

impl<R: Read> Iterator for HexDecoder<R> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut high = None;
        for byte in self.bytes.by_ref() {
            let value = match byte {
                Ok(b) => match nibble(b) {
                    Some(v) => v,
                    None => continue,
                },
                Err(e) => return Some(Err(io_error(e))),
            };
            match high {
                None => high = Some(value),
                Some(h) => return Some(Ok((h << 4) | value)),
            }
        }
        None
    }
}

fn io_error(e: std::io::Error) -> Error {
    log::debug!("Reading hex image failed: {}", e);
    Error::IoError
}

/// A hex image that can be reopened for every pass
pub trait HexSource {
    /// Reader over the image text
    type Reader<'a>: Read
    where
        Self: 'a;

    /// Open the image from the beginning
    fn open(&self) -> Result<Self::Reader<'_>>;
}

impl HexSource for [u8] {
    type Reader<'a>
        = &'a [u8]
    where
        Self: 'a;

    fn open(&self) -> Result<Self::Reader<'_>> {
        Ok(self)
    }
}

impl HexSource for str {
    type Reader<'a>
        = &'a [u8]
    where
        Self: 'a;

    fn open(&self) -> Result<Self::Reader<'_>> {
        Ok(self.as_bytes())
    }
}

/// Hex image in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexFile {
    path: PathBuf,
}

impl HexFile {
    /// Refer to the file at `path`; nothing is opened yet
    pub fn new(path: impl AsRef<Path>) -> Self {
        HexFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the image
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HexSource for HexFile {
    type Reader<'a>
        = File
    where
        Self: 'a;

    fn open(&self) -> Result<File> {
        File::open(&self.path).map_err(|e| {
            log::debug!("Failed to open {}: {}", self.path.display(), e);
            Error::IoError
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode bytes with a varying mix of separators between digits
    fn encode_with_noise(data: &[u8]) -> String {
        const SEPARATORS: [&str; 6] = ["", " ", "\t", "\r\n", "\0", "  \n"];
        let mut out = String::new();
        for (i, b) in data.iter().enumerate() {
            let hex = format!("{:02x}", b);
            let (hi, lo) = hex.split_at(1);
            out.push_str(hi);
            out.push_str(SEPARATORS[i % 4]);
            if i % 3 == 0 {
                out.push_str(&lo.to_uppercase());
            } else {
                out.push_str(lo);
            }
            out.push_str(SEPARATORS[(i * 7) % SEPARATORS.len()]);
        }
        out
    }

    #[test]
    fn test_round_trip_with_whitespace() {
        let data: Vec<u8> = (0..=255u8).chain((0..300).map(|i| (i * 37 % 251) as u8)).collect();
        let text = encode_with_noise(&data);

        assert_eq!(decode_size(text.as_bytes()).unwrap(), data.len());

        let mut decoder = HexDecoder::new(text.as_bytes());
        let decoded: Vec<u8> = decoder.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(decoded, data);
        assert!(decoder.next().is_none());
    }

    #[test]
    fn test_fill_in_pages() {
        let text = "00 01 02 03\n04 05 06";
        let mut decoder = HexDecoder::new(text.as_bytes());
        let mut page = [0u8; 4];
        assert_eq!(decoder.fill(&mut page).unwrap(), 4);
        assert_eq!(page, [0, 1, 2, 3]);
        assert_eq!(decoder.fill(&mut page).unwrap(), 3);
        assert_eq!(&page[..3], &[4, 5, 6]);
        assert_eq!(decoder.fill(&mut page).unwrap(), 0);
    }

    #[test]
    fn test_corruption_anywhere() {
        let clean = "0011 2233\n4455";
        for pos in 0..=clean.len() {
            for bad in ["g", "x", "-", ",", "\u{e9}", "\x0b"] {
                let mut text = clean.to_string();
                text.insert_str(pos, bad);
                assert_eq!(
                    decode_size(text.as_bytes()),
                    Err(Error::CorruptImage {
                        offset: pos as u64
                    }),
                    "{:?}",
                    text
                );
            }
        }
    }

    #[test]
    fn test_separators_only() {
        assert_eq!(decode_size(" \t\r\n\0".as_bytes()).unwrap(), 0);
        assert_eq!(decode_size("".as_bytes()).unwrap(), 0);
    }

    #[test]
    fn test_odd_digit_is_dropped() {
        assert_eq!(decode_size("abc".as_bytes()).unwrap(), 1);
        let decoded: Vec<u8> = HexDecoder::new("abc".as_bytes())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, vec![0xAB]);
    }

    #[test]
    fn test_sources_reopen() {
        let text = "dead beef";
        let source: &str = text;
        for _ in 0..2 {
            let reader = source.open().unwrap();
            assert_eq!(decode_size(reader).unwrap(), 4);
        }

        let missing = HexFile::new("/nonexistent/image.hex");
        assert_eq!(missing.open().err(), Some(Error::IoError));
    }
}
