use bytes::BufMut;

use super::{
    Array, Blob, ClipboardData, CodePageString, Currency, Decimal, Filetime, PropertyError,
    PropertyResult, UnicodeString, Vector, VersionedStream, check_reserved, skip_padding, tolerate,
};
use crate::common::DecodeOptions;
use crate::common::binary::{ByteCursor, put_zero_padding};
use crate::ole::class_id::ClassId;
use crate::ole::consts::*;

/// The payload of a typed property value.
///
/// Every case corresponds to exactly one `VT_*` tag; [`Variant::vt`] gives it
/// back, so a value never disagrees with its type.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Empty,
    Null,
    I1(i8),
    I2(i16),
    I4(i32),
    I8(i64),
    UI1(u8),
    UI2(u16),
    UI4(u32),
    /// Unsigned 64-bit, widened so values above `i64::MAX` keep their sign.
    UI8(i128),
    Int(i32),
    UInt(u32),
    R4(f32),
    R8(f64),
    Currency(Currency),
    /// OLE automation date: days since 1899-12-30.
    Date(f64),
    Bstr(CodePageString),
    Lpstr(CodePageString),
    Lpwstr(UnicodeString),
    /// An HRESULT / SCODE.
    Error(u32),
    Bool(bool),
    Decimal(Decimal),
    Filetime(Filetime),
    Blob(Blob),
    BlobObject(Blob),
    Stream(CodePageString),
    Storage(CodePageString),
    StreamedObject(CodePageString),
    StoredObject(CodePageString),
    ClipboardData(ClipboardData),
    Clsid(ClassId),
    VersionedStream(VersionedStream),
    Vector(Vector),
    Array(Array),
}

impl Variant {
    pub fn vt(&self) -> u16 {
        match self {
            Variant::Empty => VT_EMPTY,
            Variant::Null => VT_NULL,
            Variant::I1(_) => VT_I1,
            Variant::I2(_) => VT_I2,
            Variant::I4(_) => VT_I4,
            Variant::I8(_) => VT_I8,
            Variant::UI1(_) => VT_UI1,
            Variant::UI2(_) => VT_UI2,
            Variant::UI4(_) => VT_UI4,
            Variant::UI8(_) => VT_UI8,
            Variant::Int(_) => VT_INT,
            Variant::UInt(_) => VT_UINT,
            Variant::R4(_) => VT_R4,
            Variant::R8(_) => VT_R8,
            Variant::Currency(_) => VT_CY,
            Variant::Date(_) => VT_DATE,
            Variant::Bstr(_) => VT_BSTR,
            Variant::Lpstr(_) => VT_LPSTR,
            Variant::Lpwstr(_) => VT_LPWSTR,
            Variant::Error(_) => VT_ERROR,
            Variant::Bool(_) => VT_BOOL,
            Variant::Decimal(_) => VT_DECIMAL,
            Variant::Filetime(_) => VT_FILETIME,
            Variant::Blob(_) => VT_BLOB,
            Variant::BlobObject(_) => VT_BLOB_OBJECT,
            Variant::Stream(_) => VT_STREAM,
            Variant::Storage(_) => VT_STORAGE,
            Variant::StreamedObject(_) => VT_STREAMED_OBJECT,
            Variant::StoredObject(_) => VT_STORED_OBJECT,
            Variant::ClipboardData(_) => VT_CF,
            Variant::Clsid(_) => VT_CLSID,
            Variant::VersionedStream(_) => VT_VERSIONED_STREAM,
            Variant::Vector(v) => VT_VECTOR | v.element_type(),
            Variant::Array(a) => VT_ARRAY | a.element_type(),
        }
    }

    /// Decode the payload of a value tagged `vt`. No header, no trailing padding.
    pub(crate) fn read_payload(
        vt: u16,
        cursor: &mut ByteCursor<'_>,
        options: &DecodeOptions,
    ) -> PropertyResult<Self> {
        if vt & VT_VECTOR != 0 {
            if vt & VT_ARRAY != 0 {
                return Err(PropertyError::UnknownType(vt));
            }
            return Ok(Variant::Vector(Vector::read(vt & VT_TYPEMASK, cursor, options)?));
        }
        if vt & VT_ARRAY != 0 {
            return Ok(Variant::Array(Array::read(vt & VT_TYPEMASK, cursor, options)?));
        }

        let value = match vt {
            VT_EMPTY => Variant::Empty,
            VT_NULL => Variant::Null,
            VT_I1 => Variant::I1(cursor.read_i8()?),
            VT_I2 => Variant::I2(cursor.read_i16()?),
            VT_I4 => Variant::I4(cursor.read_i32()?),
            VT_I8 => Variant::I8(cursor.read_i64()?),
            VT_UI1 => Variant::UI1(cursor.read_u8()?),
            VT_UI2 => Variant::UI2(cursor.read_u16()?),
            VT_UI4 => Variant::UI4(cursor.read_u32()?),
            VT_UI8 => Variant::UI8(read_unsigned_64(cursor)?),
            VT_INT => Variant::Int(cursor.read_i32()?),
            VT_UINT => Variant::UInt(cursor.read_u32()?),
            VT_R4 => Variant::R4(cursor.read_f32()?),
            VT_R8 => Variant::R8(cursor.read_f64()?),
            VT_CY => Variant::Currency(Currency(cursor.read_i64()?)),
            VT_DATE => Variant::Date(cursor.read_f64()?),
            VT_BSTR => Variant::Bstr(CodePageString::read(cursor, options)?),
            VT_LPSTR => Variant::Lpstr(CodePageString::read(cursor, options)?),
            VT_LPWSTR => Variant::Lpwstr(UnicodeString::read(cursor, options)?),
            VT_ERROR => Variant::Error(cursor.read_u32()?),
            VT_BOOL => Variant::Bool(read_variant_bool(cursor, options)?),
            VT_DECIMAL => Variant::Decimal(Decimal::read(cursor, options)?),
            VT_FILETIME => Variant::Filetime(Filetime::read(cursor)?),
            VT_BLOB => Variant::Blob(Blob::read(cursor)?),
            VT_BLOB_OBJECT => Variant::BlobObject(Blob::read(cursor)?),
            VT_STREAM => Variant::Stream(CodePageString::read(cursor, options)?),
            VT_STORAGE => Variant::Storage(CodePageString::read(cursor, options)?),
            VT_STREAMED_OBJECT => Variant::StreamedObject(CodePageString::read(cursor, options)?),
            VT_STORED_OBJECT => Variant::StoredObject(CodePageString::read(cursor, options)?),
            VT_CF => Variant::ClipboardData(ClipboardData::read(cursor)?),
            VT_CLSID => Variant::Clsid(ClassId::read(cursor)?),
            VT_VERSIONED_STREAM => {
                Variant::VersionedStream(VersionedStream::read(cursor, options)?)
            },
            other => return Err(PropertyError::UnknownType(other)),
        };
        Ok(value)
    }

    pub(crate) fn write_payload(&self, buf: &mut Vec<u8>) -> PropertyResult<()> {
        match self {
            Variant::Empty | Variant::Null => {},
            Variant::I1(v) => buf.put_i8(*v),
            Variant::I2(v) => buf.put_i16_le(*v),
            Variant::I4(v) | Variant::Int(v) => buf.put_i32_le(*v),
            Variant::I8(v) => buf.put_i64_le(*v),
            Variant::UI1(v) => buf.put_u8(*v),
            Variant::UI2(v) => buf.put_u16_le(*v),
            Variant::UI4(v) | Variant::UInt(v) | Variant::Error(v) => buf.put_u32_le(*v),
            Variant::UI8(v) => {
                let value =
                    u64::try_from(*v).map_err(|_| PropertyError::ValueOutOfRange(v.to_string()))?;
                buf.put_u64_le(value);
            },
            Variant::R4(v) => buf.put_f32_le(*v),
            Variant::R8(v) | Variant::Date(v) => buf.put_f64_le(*v),
            Variant::Currency(c) => buf.put_i64_le(c.0),
            Variant::Bstr(s)
            | Variant::Lpstr(s)
            | Variant::Stream(s)
            | Variant::Storage(s)
            | Variant::StreamedObject(s)
            | Variant::StoredObject(s) => s.write(buf),
            Variant::Lpwstr(s) => s.write(buf),
            Variant::Bool(b) => buf.put_u16_le(if *b { 0xFFFF } else { 0 }),
            Variant::Decimal(d) => d.write(buf),
            Variant::Filetime(ft) => ft.write(buf),
            Variant::Blob(b) | Variant::BlobObject(b) => b.write(buf),
            Variant::ClipboardData(cf) => cf.write(buf),
            Variant::Clsid(id) => buf.put_slice(id.as_bytes()),
            Variant::VersionedStream(vs) => vs.write(buf),
            Variant::Vector(v) => v.write(buf)?,
            Variant::Array(a) => a.write(buf)?,
        }
        Ok(())
    }

    /// Text of string-typed values, decoded with `codepage` where needed.
    pub fn as_text(&self, codepage: u16) -> Option<String> {
        match self {
            Variant::Bstr(s) | Variant::Lpstr(s) => Some(s.to_text(codepage)),
            Variant::Lpwstr(s) => Some(s.to_text()),
            _ => None,
        }
    }

    /// Integer view of the integral variants.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::I1(v) => Some(*v as i64),
            Variant::I2(v) => Some(*v as i64),
            Variant::I4(v) | Variant::Int(v) => Some(*v as i64),
            Variant::I8(v) => Some(*v),
            Variant::UI1(v) => Some(*v as i64),
            Variant::UI2(v) => Some(*v as i64),
            Variant::UI4(v) | Variant::UInt(v) => Some(*v as i64),
            Variant::UI8(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

fn read_unsigned_64(cursor: &mut ByteCursor<'_>) -> PropertyResult<i128> {
    // Reverse the little-endian bytes behind a zero sign byte.
    let le = cursor.read_array::<8>()?;
    let mut be = [0u8; 16];
    for (i, b) in le.iter().rev().enumerate() {
        be[8 + i] = *b;
    }
    Ok(i128::from_be_bytes(be))
}

fn read_variant_bool(cursor: &mut ByteCursor<'_>, options: &DecodeOptions) -> PropertyResult<bool> {
    let offset = cursor.position();
    let raw = cursor.read_u16()?;
    match raw {
        0 => Ok(false),
        0xFFFF => Ok(true),
        other => {
            tolerate(
                options.rejects_anomalies(),
                PropertyError::ValueOutOfRange(format!(
                    "VARIANT_BOOL 0x{other:04X} at offset #{offset}"
                )),
            )?;
            Ok(true)
        },
    }
}

/// A `{type, value}` pair as stored in a property-set section.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedPropertyValue {
    value: Variant,
}

impl TypedPropertyValue {
    pub fn new(value: Variant) -> Self {
        Self { value }
    }

    #[inline]
    pub fn vt(&self) -> u16 {
        self.value.vt()
    }

    #[inline]
    pub fn value(&self) -> &Variant {
        &self.value
    }

    pub fn into_value(self) -> Variant {
        self.value
    }

    /// Read the type tag, the reserved word, the payload and any padding.
    pub fn read(cursor: &mut ByteCursor<'_>, options: &DecodeOptions) -> PropertyResult<Self> {
        let vt = cursor.read_u16()?;
        check_reserved(cursor, options)?;
        let value = Variant::read_payload(vt, cursor, options)?;
        if vt != VT_EMPTY {
            skip_padding(cursor);
        }
        Ok(Self { value })
    }

    /// Decode the value starting at `offset` and report how many bytes it
    /// used, padding included.
    pub fn decode(
        data: &[u8],
        offset: usize,
        options: &DecodeOptions,
    ) -> PropertyResult<(Self, usize)> {
        let mut cursor = ByteCursor::at(data, offset)?;
        let value = Self::read(&mut cursor, options)?;
        Ok((value, cursor.position() - offset))
    }

    pub fn write(&self, buf: &mut Vec<u8>) -> PropertyResult<()> {
        buf.put_u16_le(self.vt());
        buf.put_u16_le(0);
        self.value.write_payload(buf)?;
        if self.vt() != VT_EMPTY {
            put_zero_padding(buf, 0, 4);
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> PropertyResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Encoded size including padding.
    pub fn size(&self) -> PropertyResult<usize> {
        Ok(self.to_bytes()?.len())
    }
}

impl From<Variant> for TypedPropertyValue {
    fn from(value: Variant) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::property::ArrayDimension;
    use proptest::prelude::*;

    fn round_trip(value: Variant) -> TypedPropertyValue {
        let original = TypedPropertyValue::new(value);
        let bytes = original.to_bytes().unwrap();
        assert_eq!(bytes.len() % 4, 0, "encoded value must be padded");
        let (decoded, consumed) =
            TypedPropertyValue::decode(&bytes, 0, &DecodeOptions::new()).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, original);
        decoded
    }

    #[test]
    fn test_scalar_round_trips() {
        round_trip(Variant::I2(-7));
        round_trip(Variant::Bool(true));
        round_trip(Variant::R8(0.125));
        round_trip(Variant::Currency(Currency(123_4567)));
        round_trip(Variant::Filetime(Filetime::from_ticks(0x01D2_3456_789A_BCDE)));
        round_trip(Variant::Lpwstr(UnicodeString::new("title")));
        round_trip(Variant::Lpstr(CodePageString::from_text("author", 1252)));
        round_trip(Variant::Clsid(ClassId::from_bytes([7; 16])));
        round_trip(Variant::Blob(Blob(vec![1, 2, 3, 4, 5])));
    }

    #[test]
    fn test_unsigned_64_keeps_sign() {
        let decoded = round_trip(Variant::UI8(u64::MAX as i128));
        assert_eq!(decoded.value(), &Variant::UI8(18_446_744_073_709_551_615));
        let raw = [21u8, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let (value, _) = TypedPropertyValue::decode(&raw, 0, &DecodeOptions::new()).unwrap();
        match value.value() {
            Variant::UI8(v) => assert!(*v > 0),
            other => panic!("Unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let raw = [0x99u8, 0x00, 0, 0, 1, 2, 3, 4];
        let err = TypedPropertyValue::decode(&raw, 0, &DecodeOptions::new()).unwrap_err();
        assert!(matches!(err, PropertyError::UnknownType(0x0099)));
    }

    #[test]
    fn test_reserved_field_tolerance() {
        let raw = [VT_I4 as u8, 0, 0x01, 0x00, 9, 0, 0, 0];
        let (value, _) = TypedPropertyValue::decode(&raw, 0, &DecodeOptions::new()).unwrap();
        assert_eq!(value.value(), &Variant::I4(9));
        let err = TypedPropertyValue::decode(&raw, 0, &DecodeOptions::strict()).unwrap_err();
        assert!(matches!(err, PropertyError::NonZeroReserved { offset: 2, value: 1 }));
    }

    #[test]
    fn test_non_zero_padding_is_left_for_next_value() {
        // VT_I2 value, one zero pad byte, then a stray 0x55
        let raw = [VT_I2 as u8, 0, 0, 0, 0x34, 0x12, 0x00, 0x55];
        let (value, consumed) = TypedPropertyValue::decode(&raw, 0, &DecodeOptions::new()).unwrap();
        assert_eq!(value.value(), &Variant::I2(0x1234));
        assert_eq!(consumed, 7);
    }

    #[test]
    fn test_empty_value_is_not_padded() {
        let bytes = TypedPropertyValue::new(Variant::Empty).to_bytes().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_vector_and_array_round_trip() {
        let vector = Vector::new(
            VT_LPWSTR,
            vec![
                Variant::Lpwstr(UnicodeString::new("a")),
                Variant::Lpwstr(UnicodeString::new("bcd")),
            ],
        )
        .unwrap();
        round_trip(Variant::Vector(vector));

        let array = Array::new(
            VT_I4,
            vec![
                ArrayDimension {
                    size: 2,
                    index_offset: 0,
                },
                ArrayDimension {
                    size: 2,
                    index_offset: 1,
                },
            ],
            vec![
                Variant::I4(1),
                Variant::I4(2),
                Variant::I4(3),
                Variant::I4(4),
            ],
        )
        .unwrap();
        round_trip(Variant::Array(array));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_padding_lands_on_four(text in "[a-zA-Z0-9 ]{0,40}", n in any::<i16>(), prefix in 0usize..3) {
            let values = [
                TypedPropertyValue::new(Variant::Lpwstr(UnicodeString::new(&text))),
                TypedPropertyValue::new(Variant::Lpstr(CodePageString::from_text(&text, 1252))),
                TypedPropertyValue::new(Variant::I2(n)),
            ];
            for value in values {
                // The structure starts at a four-byte boundary inside a larger buffer.
                let mut data = vec![0xEEu8; prefix * 4];
                let start = data.len();
                value.write(&mut data).unwrap();
                let (decoded, consumed) =
                    TypedPropertyValue::decode(&data, start, &DecodeOptions::new()).unwrap();
                prop_assert_eq!(&decoded, &value);
                prop_assert_eq!(consumed % 4, 0);
            }
        }

        #[test]
        fn prop_unicode_round_trip(text in "\\PC{0,30}") {
            let value = TypedPropertyValue::new(Variant::Lpwstr(UnicodeString::new(&text)));
            let bytes = value.to_bytes().unwrap();
            let (decoded, _) = TypedPropertyValue::decode(&bytes, 0, &DecodeOptions::new()).unwrap();
            match decoded.value() {
                Variant::Lpwstr(s) => prop_assert_eq!(s.to_text(), text),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
