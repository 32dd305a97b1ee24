use bytes::BufMut;

use super::{PropertyError, PropertyResult, TypedPropertyValue, Variant};
use crate::common::DecodeOptions;
use crate::common::binary::ByteCursor;
use crate::ole::consts::*;

/// A `VT_VECTOR` payload: a count followed by values of one element type.
///
/// Fixed-size elements are packed; string elements pad themselves; elements
/// of a `VT_VARIANT` vector are full typed values with their own headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    element_type: u16,
    elements: Vec<Variant>,
}

fn is_vector_element(vt: u16) -> bool {
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
            | VT_I1
            | VT_UI1
            | VT_UI2
            | VT_UI4
            | VT_I8
            | VT_UI8
            | VT_LPSTR
            | VT_LPWSTR
            | VT_FILETIME
            | VT_CF
            | VT_CLSID
    )
}

impl Vector {
    /// Build a vector, checking that every element matches `element_type`.
    pub fn new(element_type: u16, elements: Vec<Variant>) -> PropertyResult<Self> {
        if !is_vector_element(element_type) {
            return Err(PropertyError::UnknownType(VT_VECTOR | element_type));
        }
        if element_type != VT_VARIANT
            && let Some(bad) = elements.iter().find(|e| e.vt() != element_type)
        {
            return Err(PropertyError::ValueOutOfRange(format!(
                "element of type 0x{:04X} in a vector of 0x{element_type:04X}",
                bad.vt()
            )));
        }
        Ok(Self {
            element_type,
            elements,
        })
    }

    #[inline]
    pub fn element_type(&self) -> u16 {
        self.element_type
    }

    #[inline]
    pub fn elements(&self) -> &[Variant] {
        &self.elements
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub(crate) fn read(
        element_type: u16,
        cursor: &mut ByteCursor<'_>,
        options: &DecodeOptions,
    ) -> PropertyResult<Self> {
        if !is_vector_element(element_type) {
            return Err(PropertyError::UnknownType(VT_VECTOR | element_type));
        }
        let count = cursor.read_u32()?;
        if count > MAX_VECTOR_ELEMENTS {
            return Err(PropertyError::CapacityExceeded {
                what: "Vector",
                requested: count as u64,
                limit: MAX_VECTOR_ELEMENTS as u64,
            });
        }
        let mut elements = Vec::with_capacity((count as usize).min(cursor.remaining()));
        for _ in 0..count {
            let element = if element_type == VT_VARIANT {
                TypedPropertyValue::read(cursor, options)?.into_value()
            } else {
                Variant::read_payload(element_type, cursor, options)?
            };
            elements.push(element);
        }
        Ok(Self {
            element_type,
            elements,
        })
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) -> PropertyResult<()> {
        buf.put_u32_le(self.elements.len() as u32);
        for element in &self.elements {
            if self.element_type == VT_VARIANT {
                TypedPropertyValue::new(element.clone()).write(buf)?;
            } else {
                element.write_payload(buf)?;
            }
        }
        Ok(())
    }
}
