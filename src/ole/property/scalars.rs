use bytes::BufMut;
use chrono::{DateTime, Utc};

use super::{CodePageString, PropertyError, PropertyResult, tolerate};
use crate::common::DecodeOptions;
use crate::common::binary::ByteCursor;
use crate::ole::class_id::ClassId;
use crate::ole::consts::MAX_RECORD_LENGTH;

/// 100-nanosecond intervals between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH: i64 = 116_444_736_000_000_000;

/// A Windows FILETIME split into its two 32-bit halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Filetime {
    pub low: u32,
    pub high: u32,
}

impl Filetime {
    pub fn from_ticks(ticks: u64) -> Self {
        Self {
            low: ticks as u32,
            high: (ticks >> 32) as u32,
        }
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }

    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        let ticks = time.timestamp() * 10_000_000
            + (time.timestamp_subsec_nanos() / 100) as i64
            + FILETIME_UNIX_EPOCH;
        Self::from_ticks(ticks.max(0) as u64)
    }

    /// `None` for the zero timestamp and for values chrono cannot represent.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let ticks = self.ticks();
        if ticks == 0 {
            return None;
        }
        let since_epoch = ticks as i64 - FILETIME_UNIX_EPOCH;
        let secs = since_epoch.div_euclid(10_000_000);
        let nanos = (since_epoch.rem_euclid(10_000_000) * 100) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> PropertyResult<Self> {
        Ok(Self {
            low: cursor.read_u32()?,
            high: cursor.read_u32()?,
        })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.low);
        buf.put_u32_le(self.high);
    }
}

/// `VT_CY`: a signed 64-bit integer scaled by 10 000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Currency(pub i64);

impl Currency {
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 10_000.0
    }
}

/// `VT_DECIMAL`: a 96-bit integer with a power-of-ten scale and a sign byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decimal {
    pub reserved: u16,
    pub scale: u8,
    pub sign: u8,
    pub hi32: u32,
    pub lo64: u64,
}

impl Decimal {
    pub fn to_f64(&self) -> f64 {
        let magnitude = (((self.hi32 as u128) << 64) | self.lo64 as u128) as f64;
        let value = magnitude / 10f64.powi(self.scale as i32);
        if self.sign == 0x80 { -value } else { value }
    }

    pub(crate) fn read(
        cursor: &mut ByteCursor<'_>,
        options: &DecodeOptions,
    ) -> PropertyResult<Self> {
        let offset = cursor.position();
        let reserved = cursor.read_u16()?;
        if reserved != 0 {
            tolerate(
                options.rejects_anomalies(),
                PropertyError::NonZeroReserved {
                    offset,
                    value: reserved as u32,
                },
            )?;
        }
        Ok(Self {
            reserved,
            scale: cursor.read_u8()?,
            sign: cursor.read_u8()?,
            hi32: cursor.read_u32()?,
            lo64: cursor.read_u64()?,
        })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u16_le(self.reserved);
        buf.put_u8(self.scale);
        buf.put_u8(self.sign);
        buf.put_u32_le(self.hi32);
        buf.put_u64_le(self.lo64);
    }
}

/// A length-prefixed byte run (`VT_BLOB`, `VT_BLOB_OBJECT`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> PropertyResult<Self> {
        let size = cursor.read_u32()? as usize;
        if size > MAX_RECORD_LENGTH {
            return Err(PropertyError::CapacityExceeded {
                what: "Blob",
                requested: size as u64,
                limit: MAX_RECORD_LENGTH as u64,
            });
        }
        Ok(Blob(cursor.read_bytes(size)?.to_vec()))
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le(self.0.len() as u32);
        buf.put_slice(&self.0);
    }
}

/// `VT_CF`: clipboard format tag plus data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipboardData {
    pub format: i32,
    pub data: Vec<u8>,
}

impl ClipboardData {
    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> PropertyResult<Self> {
        let offset = cursor.position();
        let size = cursor.read_u32()? as usize;
        if size < 4 {
            log::warn!(
                "ClipboardData at offset #{offset} declares size {size}, shorter than its format tag"
            );
            return Ok(Self::default());
        }
        if size > MAX_RECORD_LENGTH {
            return Err(PropertyError::CapacityExceeded {
                what: "ClipboardData",
                requested: size as u64,
                limit: MAX_RECORD_LENGTH as u64,
            });
        }
        let format = cursor.read_i32()?;
        let data = cursor.read_bytes(size - 4)?.to_vec();
        Ok(Self { format, data })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.put_u32_le((self.data.len() + 4) as u32);
        buf.put_i32_le(self.format);
        buf.put_slice(&self.data);
    }
}

/// `VT_VERSIONED_STREAM`: a version GUID and the name of a sibling stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionedStream {
    pub version_guid: ClassId,
    pub stream_name: CodePageString,
}

impl VersionedStream {
    pub(crate) fn read(
        cursor: &mut ByteCursor<'_>,
        options: &DecodeOptions,
    ) -> PropertyResult<Self> {
        Ok(Self {
            version_guid: ClassId::read(cursor)?,
            stream_name: CodePageString::read(cursor, options)?,
        })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        buf.put_slice(self.version_guid.as_bytes());
        self.stream_name.write(buf);
    }
}
