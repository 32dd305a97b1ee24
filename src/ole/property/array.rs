use bytes::BufMut;
use smallvec::SmallVec;

use super::{PropertyError, PropertyResult, TypedPropertyValue, Variant, skip_padding, tolerate};
use crate::common::DecodeOptions;
use crate::common::binary::{ByteCursor, put_zero_padding};
use crate::ole::consts::*;

const MAX_DIMENSIONS: u32 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDimension {
    pub size: u32,
    pub index_offset: i32,
}

/// A `VT_ARRAY` payload: header, 1..=31 dimensions, then every scalar as a
/// full typed value.
///
/// A decoded scalar whose type differs from the declared element type is
/// kept as read unless decoding is strict.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    element_type: u16,
    dimensions: SmallVec<[ArrayDimension; 4]>,
    values: Vec<Variant>,
}

fn is_array_element(vt: u16) -> bool {
    matches!(
        vt,
        VT_I2
            | VT_I4
            | VT_R4
            | VT_R8
            | VT_CY
            | VT_DATE
            | VT_BSTR
            | VT_ERROR
            | VT_BOOL
            | VT_VARIANT
            | VT_DECIMAL
            | VT_I1
            | VT_UI1
            | VT_UI2
            | VT_UI4
            | VT_INT
            | VT_UINT
    )
}

/// Product of the dimension sizes, or a capacity error.
fn scalar_count(dimensions: &[ArrayDimension]) -> PropertyResult<u64> {
    let total = dimensions
        .iter()
        .try_fold(1u64, |acc, d| acc.checked_mul(d.size as u64));
    match total {
        Some(n) if n <= MAX_ARRAY_ELEMENTS => Ok(n),
        _ => Err(PropertyError::CapacityExceeded {
            what: "Array",
            requested: total.unwrap_or(u64::MAX),
            limit: MAX_ARRAY_ELEMENTS,
        }),
    }
}

impl Array {
    pub fn new(
        element_type: u16,
        dimensions: Vec<ArrayDimension>,
        values: Vec<Variant>,
    ) -> PropertyResult<Self> {
        if !is_array_element(element_type) {
            return Err(PropertyError::UnknownType(VT_ARRAY | element_type));
        }
        if dimensions.is_empty() || dimensions.len() > MAX_DIMENSIONS as usize {
            return Err(PropertyError::InvalidDimensionCount(dimensions.len() as u32));
        }
        let expected = scalar_count(&dimensions)?;
        if expected != values.len() as u64 {
            return Err(PropertyError::ScalarCountMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            element_type,
            dimensions: dimensions.into(),
            values,
        })
    }

    #[inline]
    pub fn element_type(&self) -> u16 {
        self.element_type
    }

    pub fn dimensions(&self) -> &[ArrayDimension] {
        &self.dimensions
    }

    pub fn values(&self) -> &[Variant] {
        &self.values
    }

    /// Always the product of the declared dimension sizes.
    pub fn number_of_scalar_values(&self) -> u64 {
        self.dimensions.iter().map(|d| d.size as u64).product()
    }

    pub(crate) fn read(
        flagged_type: u16,
        cursor: &mut ByteCursor<'_>,
        options: &DecodeOptions,
    ) -> PropertyResult<Self> {
        let header_type = cursor.read_i32()?;
        let element_type = u16::try_from(header_type)
            .ok()
            .filter(|&vt| is_array_element(vt))
            .ok_or(PropertyError::UnknownType(VT_ARRAY | flagged_type))?;
        if element_type != flagged_type {
            log::warn!(
                "Array header declares element type 0x{element_type:04X} under tag 0x{:04X}",
                VT_ARRAY | flagged_type
            );
        }

        let dimension_count = cursor.read_u32()?;
        if !(1..=MAX_DIMENSIONS).contains(&dimension_count) {
            return Err(PropertyError::InvalidDimensionCount(dimension_count));
        }
        let mut dimensions = SmallVec::with_capacity(dimension_count as usize);
        for _ in 0..dimension_count {
            dimensions.push(ArrayDimension {
                size: cursor.read_u32()?,
                index_offset: cursor.read_i32()?,
            });
        }

        let count = scalar_count(&dimensions)?;
        // Each scalar needs at least a four-byte header.
        let mut values = Vec::with_capacity((count as usize).min(cursor.remaining() / 4));
        for _ in 0..count {
            let value = TypedPropertyValue::read(cursor, options)?;
            if element_type != VT_VARIANT {
                if value.vt() != element_type {
                    tolerate(
                        options.rejects_anomalies(),
                        PropertyError::ElementTypeMismatch {
                            expected: element_type,
                            actual: value.vt(),
                        },
                    )?;
                }
                skip_padding(cursor);
            }
            values.push(value.into_value());
        }

        Ok(Self {
            element_type,
            dimensions,
            values,
        })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> PropertyResult<()> {
        buf.put_i32_le(self.element_type as i32);
        buf.put_u32_le(self.dimensions.len() as u32);
        for d in &self.dimensions {
            buf.put_u32_le(d.size);
            buf.put_i32_le(d.index_offset);
        }
        for value in &self.values {
            TypedPropertyValue::new(value.clone()).write(buf)?;
            if self.element_type != VT_VARIANT {
                put_zero_padding(buf, 0, 4);
            }
        }
        Ok(())
    }
}
