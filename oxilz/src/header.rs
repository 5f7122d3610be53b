//! Container header.
//!
//! ```text
//! offset  size  field
//!      0     1  properties byte, (pb * 5 + lp) * 9 + lc
//!      1     4  dictionary size, u32 LE
//!      5     8  uncompressed length, u64 LE
//! ```

use oxilz_core::error::Result;
use oxilz_core::traits::PROPERTIES_SIZE;
use oxilz_engine::PropertyBlock;
use std::fmt;
use std::io::{self, Read, Write};

/// Size of the container header in bytes.
pub const HEADER_SIZE: usize = PROPERTIES_SIZE + 8;

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Raw coder property block.
    pub properties: [u8; PROPERTIES_SIZE],
    /// Number of bytes the payload decodes to.
    pub uncompressed_size: u64,
}

impl ContainerHeader {
    /// Serialize the header.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..PROPERTIES_SIZE].copy_from_slice(&self.properties);
        out[PROPERTIES_SIZE..].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        out
    }

    /// Parse a complete header.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut properties = [0u8; PROPERTIES_SIZE];
        properties.copy_from_slice(&bytes[..PROPERTIES_SIZE]);
        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[PROPERTIES_SIZE..]);
        Self {
            properties,
            uncompressed_size: u64::from_le_bytes(size),
        }
    }

    /// Write the header to `output`.
    pub fn write_to<W: Write>(&self, output: &mut W) -> io::Result<()> {
        output.write_all(&self.to_bytes())
    }
}

/// Outcome of reading a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRead {
    /// All 13 bytes were present.
    Complete(ContainerHeader),
    /// The input ended after `available` bytes.
    Truncated {
        /// Bytes read before the input ended.
        available: usize,
    },
}

/// Read a container header.
///
/// Running out of input is reported as [`HeaderRead::Truncated`], not as an
/// error. Only genuine I/O failures are errors.
pub fn read_header<R: Read>(input: &mut R) -> Result<HeaderRead> {
    let mut buf = [0u8; HEADER_SIZE];
    let mut filled = 0;

    while filled < HEADER_SIZE {
        match input.read(&mut buf[filled..]) {
            Ok(0) => return Ok(HeaderRead::Truncated { available: filled }),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(HeaderRead::Complete(ContainerHeader::from_bytes(&buf)))
}

/// Human-readable description of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
    /// Dictionary size in bytes.
    pub dict_size: u32,
    /// Declared uncompressed length.
    pub uncompressed_size: u64,
}

impl ContainerInfo {
    /// Decode the property block of a header.
    pub fn from_header(header: &ContainerHeader) -> Result<Self> {
        let block = PropertyBlock::from_bytes(&header.properties)?;
        Ok(Self {
            lc: block.props.lc,
            lp: block.props.lp,
            pb: block.props.pb,
            dict_size: block.dict_size,
            uncompressed_size: header.uncompressed_size,
        })
    }
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lc={} lp={} pb={} dict={} size={}",
            self.lc, self.lp, self.pb, self.dict_size, self.uncompressed_size
        )
    }
}
