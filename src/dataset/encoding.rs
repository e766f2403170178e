use std::fmt;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};

use super::error::DatasetError;

/// On-disk numeric type of the intensity samples.
///
/// Samples are stored little-endian; they are always widened to `f64` in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleEncoding {
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// IEEE 754 single precision
    #[default]
    Float32,
    /// IEEE 754 double precision
    Float64,
}

impl SampleEncoding {
    /// Number of bytes per sample
    pub fn width(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Canonical tag, as accepted by [`FromStr`]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Int16 => "short",
            Self::Int32 => "integer",
            Self::Float32 => "float",
            Self::Float64 => "double",
        }
    }

    /// Decode `out.len()` samples from `bytes`.
    ///
    /// `bytes` must hold exactly `out.len() * self.width()` bytes.
    pub fn decode_into(self, bytes: &[u8], out: &mut [f64]) {
        debug_assert_eq!(bytes.len(), out.len() * self.width());
        let chunks = bytes.chunks_exact(self.width());
        match self {
            Self::Int16 => {
                for (value, chunk) in out.iter_mut().zip(chunks) {
                    *value = LittleEndian::read_i16(chunk) as f64;
                }
            }
            Self::Int32 => {
                for (value, chunk) in out.iter_mut().zip(chunks) {
                    *value = LittleEndian::read_i32(chunk) as f64;
                }
            }
            Self::Float32 => {
                for (value, chunk) in out.iter_mut().zip(chunks) {
                    *value = LittleEndian::read_f32(chunk) as f64;
                }
            }
            Self::Float64 => LittleEndian::read_f64_into(bytes, out),
        }
    }

    /// Encode `values` into `out`, replacing its contents.
    ///
    /// Integer encodings round to the nearest value and saturate at the type bounds.
    pub fn encode_into(self, values: &[f64], out: &mut Vec<u8>) {
        out.clear();
        out.resize(values.len() * self.width(), 0);
        let chunks = out.chunks_exact_mut(self.width());
        match self {
            Self::Int16 => {
                for (chunk, value) in chunks.zip(values) {
                    LittleEndian::write_i16(chunk, value.round() as i16);
                }
            }
            Self::Int32 => {
                for (chunk, value) in chunks.zip(values) {
                    LittleEndian::write_i32(chunk, value.round() as i32);
                }
            }
            Self::Float32 => {
                for (chunk, value) in chunks.zip(values) {
                    LittleEndian::write_f32(chunk, *value as f32);
                }
            }
            Self::Float64 => LittleEndian::write_f64_into(values, out),
        }
    }
}

impl FromStr for SampleEncoding {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" | "int16" | "i16" => Ok(Self::Int16),
            "integer" | "int" | "int32" | "i32" => Ok(Self::Int32),
            "float" | "float32" | "f32" | "single" => Ok(Self::Float32),
            "double" | "float64" | "f64" | "numeric" => Ok(Self::Float64),
            _ => Err(DatasetError::UnknownEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
