//! The self-describing descriptor value format.
//!
//! Rich layer data (most notably type-tool blocks) stores its properties
//! as descriptors: a name, a class id and a keyed list of values, where
//! each value announces its own type with a 4-byte tag and values nest
//! arbitrarily. The decoder below is a direct recursion over that
//! grammar.
//!
//! `tdta` values embed the legacy text grammar of [`crate::engine_data`];
//! the blob is decoded on an independent copy of its bytes and the outer
//! cursor realigned to the declared blob length, so a grammar that stops
//! short can never misalign the descriptor stream.
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use strata_core::bytestream::ByteCursor;
use strata_core::log::warn;

use crate::engine_data::{EngineDataParser, PsValue};
use crate::errors::{EngineParseError, PsdDecodeErrors};

/// A decoded descriptor: named, classed, and a key → value mapping.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Descriptor {
    pub name:     String,
    pub class_id: String,
    pub items:    BTreeMap<String, DescriptorValue>
}

impl Descriptor {
    pub fn get(&self, key: &str) -> Option<&DescriptorValue> {
        self.items.get(key)
    }
}

/// One value inside a descriptor, tagged by its 4-byte OS type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorValue {
    /// `TEXT`
    Text(String),
    /// `enum`
    Enumerated { type_id: String, value: String },
    /// `Objc` / `GlbO`, structurally identical
    Descriptor(Descriptor),
    /// `VlLs`
    List(Vec<DescriptorValue>),
    /// `doub`
    Double(f64),
    /// `UntF`
    UnitFloat { unit: [u8; 4], value: f64 },
    /// `long`
    Integer(i32),
    /// `bool`
    Boolean(bool),
    /// `type` / `GlbC`
    Class { name: String, class_id: String },
    /// `alis`
    Alias(Vec<u8>),
    /// `obj `
    Reference(Vec<Reference>),
    /// `tdta`; `None` when the embedded grammar failed to parse
    EngineData(Option<PsValue>)
}

impl DescriptorValue {
    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match self {
            DescriptorValue::Descriptor(d) => Some(d),
            _ => None
        }
    }

    pub fn as_engine_data(&self) -> Option<&PsValue> {
        match self {
            DescriptorValue::EngineData(v) => v.as_ref(),
            _ => None
        }
    }
}

/// One item of an `obj ` reference value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Reference {
    Property {
        name:     String,
        class_id: String,
        key_id:   String
    },
    Class {
        name:     String,
        class_id: String
    },
    EnumeratedReference {
        name:     String,
        class_id: String,
        type_id:  String,
        value:    String
    },
    Offset {
        name:     String,
        class_id: String,
        offset:   u32
    },
    Identifier(u32),
    Index(u32),
    Name(String)
}

/// Read the length-prefixed string form used for keys and class ids.
///
/// A declared length of zero means the value is the next four literal
/// bytes (a 4-byte tag doubling as the string), not an empty string.
fn read_id_string(cursor: &mut ByteCursor) -> Result<String, PsdDecodeErrors> {
    let length = cursor.get_u32_be()? as usize;
    if length == 0 {
        Ok(cursor.get_fixed_string(4)?)
    } else {
        Ok(cursor.get_fixed_string(length)?)
    }
}

/// Decode a descriptor body: name, class id, then `count` keyed values.
pub(crate) fn read_descriptor(cursor: &mut ByteCursor) -> Result<Descriptor, PsdDecodeErrors> {
    let name = cursor.get_unicode_string()?;
    let class_id = read_id_string(cursor)?;
    let count = cursor.get_u32_be()?;

    let mut items = BTreeMap::new();
    for _ in 0..count {
        let key = read_id_string(cursor)?;
        let value = read_os_type_value(cursor)?;
        items.insert(key, value);
    }
    Ok(Descriptor { name, class_id, items })
}

/// Decode one tagged value.
///
/// The tag set is closed; a tag outside it is fatal since descriptor
/// values carry no skippable length of their own.
pub(crate) fn read_os_type_value(
    cursor: &mut ByteCursor
) -> Result<DescriptorValue, PsdDecodeErrors> {
    let mut tag = [0_u8; 4];
    tag.copy_from_slice(cursor.read_exact(4)?);

    let value = match &tag {
        b"TEXT" => DescriptorValue::Text(cursor.get_unicode_string()?),
        b"enum" => {
            let type_id = read_id_string(cursor)?;
            let value = read_id_string(cursor)?;
            DescriptorValue::Enumerated { type_id, value }
        }
        b"Objc" | b"GlbO" => DescriptorValue::Descriptor(read_descriptor(cursor)?),
        b"VlLs" => {
            let count = cursor.get_u32_be()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(read_os_type_value(cursor)?);
            }
            DescriptorValue::List(values)
        }
        b"doub" => DescriptorValue::Double(cursor.get_f64_be()?),
        b"UntF" => {
            let mut unit = [0_u8; 4];
            unit.copy_from_slice(cursor.read_exact(4)?);
            DescriptorValue::UnitFloat { unit, value: cursor.get_f64_be()? }
        }
        b"long" => DescriptorValue::Integer(cursor.get_int(4)? as i32),
        b"bool" => DescriptorValue::Boolean(cursor.get_u8()? != 0),
        b"type" | b"GlbC" => {
            let name = cursor.get_unicode_string()?;
            let class_id = read_id_string(cursor)?;
            DescriptorValue::Class { name, class_id }
        }
        b"alis" => {
            let length = cursor.get_u32_be()? as usize;
            DescriptorValue::Alias(cursor.read_exact(length)?.to_vec())
        }
        b"obj " => DescriptorValue::Reference(read_reference(cursor)?),
        b"tdta" => {
            let length = cursor.get_u32_be()? as usize;
            let start = cursor.position();
            let blob = cursor.read_exact(length)?;
            let engine = match EngineDataParser::new(blob).parse() {
                Ok(value) => Some(value),
                Err(EngineParseError::UnexpectedEnd) => None,
                Err(EngineParseError::BadSyntax(_line)) => {
                    warn!("Legacy text data failed to parse in line {}", _line);
                    None
                }
            };
            // the grammar ran on its own copy; realign no matter what it consumed
            cursor.skip_to_end_of(start, length)?;
            DescriptorValue::EngineData(engine)
        }
        _ => return Err(PsdDecodeErrors::UnknownOsType(tag))
    };
    Ok(value)
}

/// Decode the item list of an `obj ` reference.
fn read_reference(cursor: &mut ByteCursor) -> Result<Vec<Reference>, PsdDecodeErrors> {
    let count = cursor.get_u32_be()?;
    let mut items = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let mut form = [0_u8; 4];
        form.copy_from_slice(cursor.read_exact(4)?);

        let item = match &form {
            b"prop" => Reference::Property {
                name:     cursor.get_unicode_string()?,
                class_id: read_id_string(cursor)?,
                key_id:   read_id_string(cursor)?
            },
            b"Clss" => Reference::Class {
                name:     cursor.get_unicode_string()?,
                class_id: read_id_string(cursor)?
            },
            b"Enmr" => Reference::EnumeratedReference {
                name:     cursor.get_unicode_string()?,
                class_id: read_id_string(cursor)?,
                type_id:  read_id_string(cursor)?,
                value:    read_id_string(cursor)?
            },
            b"rele" => Reference::Offset {
                name:     cursor.get_unicode_string()?,
                class_id: read_id_string(cursor)?,
                offset:   cursor.get_u32_be()?
            },
            b"Idnt" => Reference::Identifier(cursor.get_u32_be()?),
            b"indx" => Reference::Index(cursor.get_u32_be()?),
            b"name" => Reference::Name(cursor.get_unicode_string()?),
            _ => return Err(PsdDecodeErrors::UnknownOsType(form))
        };
        items.push(item);
    }
    Ok(items)
}
