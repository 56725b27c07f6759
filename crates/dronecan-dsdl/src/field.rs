//! Field codecs: the building blocks of a [`TypeDefinition`].
//!
//! A [`Field`] is an immutable descriptor carrying its canonical schema text
//! fragment, its maximum encoded width, an optional nested-type signature and
//! the encode/decode behavior for one kind of value. Codecs are stateless; the
//! only context they see is the `tail` flag, set when the field is the last
//! one of the outermost definition being encoded. Only variable-length arrays
//! consult it (tail array optimization).

use std::fmt;
use std::sync::Arc;

use half::f16;

use crate::bits::{bit_length, sign_extend, BitReader, BitWriter};
use crate::definition::TypeDefinition;
use crate::error::{DsdlError, Result};
use crate::types::MessageType;
use crate::value::Value;

/// Overflow designation recorded in schema text.
///
/// Purely descriptive: encoding always keeps the low bits of the value in
/// both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cast {
    #[default]
    Saturated,
    Truncated,
}

impl fmt::Display for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cast::Saturated => f.write_str("saturated"),
            Cast::Truncated => f.write_str("truncated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatWidth {
    Half,
    Single,
    Double,
}

impl FloatWidth {
    fn bits(self) -> u32 {
        match self {
            FloatWidth::Half => 16,
            FloatWidth::Single => 32,
            FloatWidth::Double => 64,
        }
    }
}

#[derive(Debug, Clone)]
enum Kind {
    Void(u32),
    Uint(u32),
    Int(u32),
    Bool,
    Float(FloatWidth),
    Array { element: Box<Field>, count: usize },
    VariableArray { element: Box<Field>, max: usize },
    Bytes(usize),
    VariableBytes(usize),
    String(usize),
    Enumeration { bits: u32, options: Vec<String> },
    Flags(Vec<String>),
    Mapped { inner: Box<Field>, table: Vec<(String, Value)> },
    Reference(Arc<TypeDefinition>),
}

impl Kind {
    fn label(&self) -> &'static str {
        match self {
            Kind::Void(_) => "void",
            Kind::Uint(_) => "uint",
            Kind::Int(_) => "int",
            Kind::Bool => "bool",
            Kind::Float(_) => "float",
            Kind::Array { .. } | Kind::VariableArray { .. } => "array",
            Kind::Bytes(_) | Kind::VariableBytes(_) => "bytes",
            Kind::String(_) => "string",
            Kind::Enumeration { .. } => "enumeration",
            Kind::Flags(_) => "flags",
            Kind::Mapped { .. } => "mapped",
            Kind::Reference(_) => "reference",
        }
    }
}

/// One field codec.
#[derive(Debug, Clone)]
pub struct Field {
    dsdl: String,
    max_bits: u64,
    signature: Option<u64>,
    kind: Kind,
}

impl Field {
    fn scalar(dsdl: String, bits: u32, kind: Kind) -> Self {
        Self {
            dsdl,
            max_bits: u64::from(bits),
            signature: None,
            kind,
        }
    }

    /// `n` padding bits: written as zero, skipped on read.
    pub fn void(bits: u32) -> Self {
        Self::scalar(format!("void{bits}"), bits, Kind::Void(bits))
    }

    pub fn uint(bits: u32) -> Self {
        Self::uint_cast(bits, Cast::Saturated)
    }

    pub fn uint_cast(bits: u32, cast: Cast) -> Self {
        Self::scalar(format!("{cast} uint{bits}"), bits, Kind::Uint(bits))
    }

    /// Unsigned integer up to 64 bits wide.
    ///
    /// Values are carried as `u64`, so this is the same codec as
    /// [`uint`](Self::uint); it exists for definitions that spell out wide
    /// fields explicitly.
    pub fn biguint(bits: u32) -> Self {
        Self::uint(bits)
    }

    pub fn int(bits: u32) -> Self {
        Self::int_cast(bits, Cast::Saturated)
    }

    pub fn int_cast(bits: u32, cast: Cast) -> Self {
        Self::scalar(format!("{cast} int{bits}"), bits, Kind::Int(bits))
    }

    pub fn boolean() -> Self {
        Self::boolean_cast(Cast::Saturated)
    }

    pub fn boolean_cast(cast: Cast) -> Self {
        Self::scalar(format!("{cast} bool"), 1, Kind::Bool)
    }

    pub fn float16() -> Self {
        Self::float(FloatWidth::Half, Cast::Saturated)
    }

    pub fn float16_cast(cast: Cast) -> Self {
        Self::float(FloatWidth::Half, cast)
    }

    pub fn float32() -> Self {
        Self::float(FloatWidth::Single, Cast::Saturated)
    }

    pub fn float32_cast(cast: Cast) -> Self {
        Self::float(FloatWidth::Single, cast)
    }

    pub fn float64() -> Self {
        Self::float(FloatWidth::Double, Cast::Saturated)
    }

    pub fn float64_cast(cast: Cast) -> Self {
        Self::float(FloatWidth::Double, cast)
    }

    fn float(width: FloatWidth, cast: Cast) -> Self {
        let bits = width.bits();
        Self::scalar(format!("{cast} float{bits}"), bits, Kind::Float(width))
    }

    /// Exactly `count` elements, no length prefix.
    pub fn array(element: Field, count: usize) -> Self {
        Self {
            dsdl: format!("{}[{count}]", element.dsdl),
            max_bits: element.max_bits.saturating_mul(count as u64),
            signature: element.signature,
            kind: Kind::Array {
                element: Box::new(element),
                count,
            },
        }
    }

    /// Up to `max` elements behind a length prefix of `ceil(log2(max + 1))`
    /// bits. The prefix is omitted when the array is the tail field and each
    /// element is at least one byte wide.
    ///
    /// The reported maximum width counts elements only, not the prefix.
    pub fn variable_array(element: Field, max: usize) -> Self {
        Self {
            dsdl: format!("{}[<={max}]", element.dsdl),
            max_bits: element.max_bits.saturating_mul(max as u64),
            signature: element.signature,
            kind: Kind::VariableArray {
                element: Box::new(element),
                max,
            },
        }
    }

    pub fn byte_array(count: usize) -> Self {
        Self {
            dsdl: format!("saturated uint8[{count}]"),
            max_bits: 8 * count as u64,
            signature: None,
            kind: Kind::Bytes(count),
        }
    }

    pub fn variable_byte_array(max: usize) -> Self {
        Self {
            dsdl: format!("saturated uint8[<={max}]"),
            max_bits: 8 * max as u64,
            signature: None,
            kind: Kind::VariableBytes(max),
        }
    }

    /// UTF-8 text of at most `max` bytes, laid out as a variable byte array.
    pub fn string(max: usize) -> Self {
        Self {
            dsdl: format!("saturated uint8[<={max}]"),
            max_bits: 8 * max as u64,
            signature: None,
            kind: Kind::String(max),
        }
    }

    /// `bits`-wide index into an ordered option list.
    pub fn enumeration<I, S>(bits: u32, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::scalar(
            format!("saturated uint{bits}"),
            bits,
            Kind::Enumeration {
                bits,
                options: options.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// One bit per option; bit `i` (from the least significant end) is option `i`.
    pub fn flags<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        let bits = options.len() as u32;
        Self::scalar(format!("saturated uint{bits}"), bits, Kind::Flags(options))
    }

    /// Wrap a numeric field with a name table.
    ///
    /// Encode accepts a [`Value::Name`] from the table or a raw value; decode
    /// yields the name when the raw value is in the table.
    pub fn mapped<I, K, V>(inner: Field, table: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            dsdl: inner.dsdl.clone(),
            max_bits: inner.max_bits,
            signature: inner.signature,
            kind: Kind::Mapped {
                inner: Box::new(inner),
                table: table.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            },
        }
    }

    /// Nest a composite type. The nested signature joins the parent's
    /// field-signature list.
    pub fn reference(message: &MessageType) -> Self {
        Self {
            dsdl: message.name().to_string(),
            max_bits: message.max_bits(),
            signature: Some(message.signature()),
            kind: Kind::Reference(Arc::clone(message.definition())),
        }
    }

    pub fn type_array(message: &MessageType, count: usize) -> Self {
        Self::array(Self::reference(message), count)
    }

    pub fn variable_type_array(message: &MessageType, max: usize) -> Self {
        Self::variable_array(Self::reference(message), max)
    }

    /// Canonical schema text fragment, without the field name.
    pub fn dsdl(&self) -> &str {
        &self.dsdl
    }

    pub fn max_bits(&self) -> u64 {
        self.max_bits
    }

    /// Signature of the nested composite type, if this field carries one.
    pub fn signature(&self) -> Option<u64> {
        self.signature
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, Kind::Void(_))
    }

    fn mismatch(&self, found: Option<&Value>) -> DsdlError {
        DsdlError::Mismatch {
            field: self.kind.label(),
            found: found.map_or("absent", Value::kind),
        }
    }

    /// Encode one value. `value` is ignored by void fields and required by
    /// every other kind.
    pub fn encode(&self, bits: &mut BitWriter, value: Option<&Value>, tail: bool) -> Result<()> {
        if let Kind::Void(n) = self.kind {
            return bits.write(n, 0);
        }
        let value = value.ok_or_else(|| self.mismatch(None))?;

        match &self.kind {
            Kind::Void(_) => Ok(()),
            Kind::Uint(n) => {
                let raw = match value {
                    Value::Unsigned(v) => *v,
                    Value::Signed(v) => *v as u64,
                    Value::Bool(b) => u64::from(*b),
                    other => return Err(self.mismatch(Some(other))),
                };
                bits.write(*n, raw)
            }
            Kind::Int(n) => {
                let raw = match value {
                    Value::Signed(v) => *v as u64,
                    Value::Unsigned(v) => *v,
                    Value::Bool(b) => u64::from(*b),
                    Value::Float(v) => v.trunc() as i64 as u64,
                    other => return Err(self.mismatch(Some(other))),
                };
                bits.write(*n, raw)
            }
            Kind::Bool => match value {
                Value::Bool(b) => bits.write(1, u64::from(*b)),
                other => Err(self.mismatch(Some(other))),
            },
            Kind::Float(width) => {
                let v = match value {
                    Value::Float(v) => *v,
                    Value::Unsigned(v) => *v as f64,
                    Value::Signed(v) => *v as f64,
                    other => return Err(self.mismatch(Some(other))),
                };
                let raw = match width {
                    FloatWidth::Half => u64::from(f16::from_f64(v).to_bits()),
                    FloatWidth::Single => u64::from((v as f32).to_bits()),
                    FloatWidth::Double => v.to_bits(),
                };
                bits.write(width.bits(), raw)
            }
            Kind::Array { element, count } => {
                let Value::Array(items) = value else {
                    return Err(self.mismatch(Some(value)));
                };
                if items.len() != *count {
                    return Err(DsdlError::ArrayLength {
                        expected: *count,
                        found: items.len(),
                    });
                }
                items
                    .iter()
                    .try_for_each(|item| element.encode(bits, Some(item), false))
            }
            Kind::VariableArray { element, max } => {
                let Value::Array(items) = value else {
                    return Err(self.mismatch(Some(value)));
                };
                let optimized = tail && element.max_bits >= 8;
                let count = write_count(bits, *max, items.len(), optimized)?;
                items[..count]
                    .iter()
                    .try_for_each(|item| element.encode(bits, Some(item), false))
            }
            Kind::Bytes(count) => {
                let Value::Bytes(data) = value else {
                    return Err(self.mismatch(Some(value)));
                };
                if data.len() != *count {
                    return Err(DsdlError::ArrayLength {
                        expected: *count,
                        found: data.len(),
                    });
                }
                write_bytes(bits, data)
            }
            Kind::VariableBytes(max) => {
                let Value::Bytes(data) = value else {
                    return Err(self.mismatch(Some(value)));
                };
                let count = write_count(bits, *max, data.len(), tail)?;
                write_bytes(bits, &data[..count])
            }
            Kind::String(max) => {
                let Value::String(text) = value else {
                    return Err(self.mismatch(Some(value)));
                };
                let mut end = text.len().min(*max);
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                let count = write_count(bits, *max, end, tail)?;
                write_bytes(bits, &text.as_bytes()[..count])
            }
            Kind::Enumeration { bits: n, options } => {
                let name = match value {
                    Value::Name(name) | Value::String(name) => name,
                    other => return Err(self.mismatch(Some(other))),
                };
                let index = options
                    .iter()
                    .position(|option| option == name)
                    .ok_or_else(|| DsdlError::UnknownOption(name.clone()))?;
                bits.write(*n, index as u64)
            }
            Kind::Flags(options) => {
                let Value::Flags(set) = value else {
                    return Err(self.mismatch(Some(value)));
                };
                let mut mask = 0u64;
                for name in set {
                    let index = options
                        .iter()
                        .position(|option| option == name)
                        .ok_or_else(|| DsdlError::UnknownOption(name.clone()))?;
                    mask |= 1u64.checked_shl(index as u32).unwrap_or(0);
                }
                bits.write(options.len() as u32, mask)
            }
            Kind::Mapped { inner, table } => match value {
                Value::Name(name) => {
                    let raw = table
                        .iter()
                        .find(|(entry, _)| entry == name)
                        .map(|(_, raw)| raw)
                        .ok_or_else(|| DsdlError::UnknownOption(name.clone()))?;
                    inner.encode(bits, Some(raw), tail)
                }
                raw => inner.encode(bits, Some(raw), tail),
            },
            Kind::Reference(definition) => definition.encode(bits, value, tail),
        }
    }

    /// Decode one value. Void fields consume their bits and yield `None`.
    pub fn decode(&self, bits: &mut BitReader<'_>, tail: bool) -> Result<Option<Value>> {
        let value = match &self.kind {
            Kind::Void(n) => {
                bits.read(*n)?;
                return Ok(None);
            }
            Kind::Uint(n) => Value::Unsigned(bits.read(*n)?),
            Kind::Int(n) => Value::Signed(sign_extend(bits.read(*n)?, *n)),
            Kind::Bool => Value::Bool(bits.read(1)? != 0),
            Kind::Float(width) => {
                let raw = bits.read(width.bits())?;
                Value::Float(match width {
                    FloatWidth::Half => f16::from_bits(raw as u16).to_f64(),
                    FloatWidth::Single => f64::from(f32::from_bits(raw as u32)),
                    FloatWidth::Double => f64::from_bits(raw),
                })
            }
            Kind::Array { element, count } => {
                let mut items = Vec::with_capacity(*count);
                for _ in 0..*count {
                    if let Some(item) = element.decode(bits, false)? {
                        items.push(item);
                    }
                }
                Value::Array(items)
            }
            Kind::VariableArray { element, max } => {
                let mut items = Vec::new();
                if tail && element.max_bits >= 8 {
                    while bits.remaining_bits() >= 8 {
                        if let Some(item) = element.decode(bits, false)? {
                            items.push(item);
                        }
                    }
                } else {
                    let count = bits.read(bit_length(*max))?;
                    for _ in 0..count {
                        if let Some(item) = element.decode(bits, false)? {
                            items.push(item);
                        }
                    }
                }
                Value::Array(items)
            }
            Kind::Bytes(count) => Value::Bytes(read_bytes(bits, *count)?),
            Kind::VariableBytes(max) => Value::Bytes(read_variable_bytes(bits, *max, tail)?),
            Kind::String(max) => {
                let data = read_variable_bytes(bits, *max, tail)?;
                Value::String(String::from_utf8_lossy(&data).into_owned())
            }
            Kind::Enumeration { bits: n, options } => {
                let index = bits.read(*n)?;
                let option = usize::try_from(index)
                    .ok()
                    .and_then(|i| options.get(i))
                    .ok_or(DsdlError::EnumIndex {
                        index,
                        count: options.len(),
                    })?;
                Value::Name(option.clone())
            }
            Kind::Flags(options) => {
                let mask = bits.read(options.len() as u32)?;
                Value::Flags(
                    options
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask >> i & 1 == 1)
                        .map(|(_, name)| name.clone())
                        .collect(),
                )
            }
            Kind::Mapped { inner, table } => {
                let Some(raw) = inner.decode(bits, tail)? else {
                    return Ok(None);
                };
                match table.iter().find(|(_, entry)| same_number(entry, &raw)) {
                    Some((name, _)) => Value::Name(name.clone()),
                    None => raw,
                }
            }
            Kind::Reference(definition) => definition.decode(bits, tail)?,
        };
        Ok(Some(value))
    }
}

/// Table entries may be stored signed or unsigned regardless of the inner
/// field, so integers compare by value.
fn same_number(entry: &Value, raw: &Value) -> bool {
    match (entry.as_i64(), raw.as_i64()) {
        (Some(a), Some(b)) => a == b,
        _ => match (entry.as_u64(), raw.as_u64()) {
            (Some(a), Some(b)) => a == b,
            _ => entry == raw,
        },
    }
}

/// Write the length prefix unless tail-optimized; returns the element count
/// to emit, clamped to `max`.
fn write_count(bits: &mut BitWriter, max: usize, len: usize, optimized: bool) -> Result<usize> {
    let count = len.min(max);
    if !optimized {
        bits.write(bit_length(max), count as u64)?;
    }
    Ok(count)
}

fn write_bytes(bits: &mut BitWriter, data: &[u8]) -> Result<()> {
    data.iter().try_for_each(|b| bits.write(8, u64::from(*b)))
}

fn read_bytes(bits: &mut BitReader<'_>, count: usize) -> Result<Vec<u8>> {
    (0..count).map(|_| bits.read(8).map(|b| b as u8)).collect()
}

fn read_variable_bytes(bits: &mut BitReader<'_>, max: usize, tail: bool) -> Result<Vec<u8>> {
    if tail {
        let mut data = Vec::with_capacity(bits.remaining_bits() / 8);
        while bits.remaining_bits() >= 8 {
            data.push(bits.read(8)? as u8);
        }
        return Ok(data);
    }
    let count = bits.read(bit_length(max))? as usize;
    read_bytes(bits, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(field: &Field, value: &Value, tail: bool) -> Vec<u8> {
        let mut w = BitWriter::new();
        field.encode(&mut w, Some(value), tail).unwrap();
        w.as_bytes().to_vec()
    }

    fn decode(field: &Field, data: &[u8], tail: bool) -> Option<Value> {
        field.decode(&mut BitReader::new(data), tail).unwrap()
    }

    #[test]
    fn schema_text_fragments() {
        assert_eq!(Field::void(5).dsdl(), "void5");
        assert_eq!(Field::uint(16).dsdl(), "saturated uint16");
        assert_eq!(Field::int_cast(7, Cast::Truncated).dsdl(), "truncated int7");
        assert_eq!(Field::boolean().dsdl(), "saturated bool");
        assert_eq!(Field::float16().dsdl(), "saturated float16");
        assert_eq!(Field::array(Field::uint(8), 3).dsdl(), "saturated uint8[3]");
        assert_eq!(
            Field::variable_array(Field::float32(), 5).dsdl(),
            "saturated float32[<=5]"
        );
        assert_eq!(Field::string(80).dsdl(), "saturated uint8[<=80]");
        assert_eq!(Field::flags(["a", "b", "c"]).dsdl(), "saturated uint3");
    }

    #[test]
    fn max_bits() {
        assert_eq!(Field::array(Field::uint(12), 4).max_bits(), 48);
        assert_eq!(Field::variable_array(Field::uint(8), 10).max_bits(), 80);
        assert_eq!(Field::variable_byte_array(3).max_bits(), 24);
        assert_eq!(Field::void(3).max_bits(), 3);
    }

    #[test]
    fn signed_round_trip_and_sign_extension() {
        let field = Field::int(12);
        for v in [-2048i64, -1, 0, 1, 2047] {
            let data = encode(&field, &Value::Signed(v), false);
            assert_eq!(decode(&field, &data, false), Some(Value::Signed(v)));
        }
    }

    #[test]
    fn out_of_range_wraps_regardless_of_cast() {
        let saturated = encode(&Field::uint(4), &Value::Unsigned(0x1F), false);
        let truncated = encode(&Field::uint_cast(4, Cast::Truncated), &Value::Unsigned(0x1F), false);
        assert_eq!(saturated, vec![0xF0]);
        assert_eq!(saturated, truncated);
    }

    #[test]
    fn float_widths() {
        assert_eq!(encode(&Field::float16(), &Value::Float(1.25), false), vec![0x00, 0x3D]);
        let data = encode(&Field::float32(), &Value::Float(-0.5), false);
        assert_eq!(data, (-0.5f32).to_le_bytes().to_vec());
        let data = encode(&Field::float64(), &Value::Float(1e300), false);
        assert_eq!(data, 1e300f64.to_le_bytes().to_vec());
        assert_eq!(decode(&Field::float64(), &data, false), Some(Value::Float(1e300)));
    }

    #[test]
    fn void_writes_zeros_and_yields_nothing() {
        let field = Field::void(3);
        let mut w = BitWriter::new();
        field.encode(&mut w, None, false).unwrap();
        assert_eq!(w.position(), 3);
        let mut r = BitReader::new(&[0xFF]);
        assert_eq!(field.decode(&mut r, false).unwrap(), None);
        assert_eq!(r.position(), 3);
    }

    #[test]
    fn fixed_array_requires_exact_length() {
        let field = Field::array(Field::uint(8), 2);
        let err = Field::encode(&field, &mut BitWriter::new(), Some(&Value::Array(vec![])), false)
            .unwrap_err();
        assert!(matches!(err, DsdlError::ArrayLength { expected: 2, found: 0 }));
    }

    #[test]
    fn variable_array_prefix_width() {
        // max 5 needs a 3-bit prefix.
        let field = Field::variable_array(Field::uint(8), 5);
        let value = Value::Array(vec![Value::Unsigned(0xFF)]);
        let data = encode(&field, &value, false);
        assert_eq!(data, vec![0b0011_1111, 0b1110_0000]);
        assert_eq!(decode(&field, &data, false), Some(value));
    }

    #[test]
    fn tail_optimization_drops_prefix() {
        let field = Field::variable_array(Field::uint(8), 5);
        let value = Value::Array(vec![Value::Unsigned(1), Value::Unsigned(2)]);
        let data = encode(&field, &value, true);
        assert_eq!(data, vec![1, 2]);
        assert_eq!(decode(&field, &data, true), Some(value));
    }

    #[test]
    fn narrow_elements_keep_prefix_even_as_tail() {
        let field = Field::variable_array(Field::uint(4), 3);
        let value = Value::Array(vec![Value::Unsigned(0xA)]);
        let data = encode(&field, &value, true);
        assert_eq!(data, vec![0b0110_1000]);
        assert_eq!(decode(&field, &data, true), Some(value));
    }

    #[test]
    fn variable_array_clamps_to_max() {
        let field = Field::variable_byte_array(2);
        let data = encode(&field, &Value::Bytes(vec![1, 2, 3]), true);
        assert_eq!(data, vec![1, 2]);
    }

    #[test]
    fn string_truncates_on_char_boundary() {
        let field = Field::string(4);
        let data = encode(&field, &Value::from("aé€"), true);
        // "a" (1) + "é" (2) fits, "€" (3) does not.
        assert_eq!(data, "aé".as_bytes().to_vec());
        assert_eq!(decode(&field, &data, true), Some(Value::from("aé")));
    }

    #[test]
    fn string_decode_is_lossy() {
        let field = Field::string(4);
        assert_eq!(
            decode(&field, &[0xFF, b'a'], true),
            Some(Value::from("\u{FFFD}a"))
        );
    }

    #[test]
    fn enumeration_round_trip_and_errors() {
        let field = Field::enumeration(2, ["ok", "warning", "error"]);
        let data = encode(&field, &Value::Name("error".into()), false);
        assert_eq!(data, vec![0b1000_0000]);
        assert_eq!(decode(&field, &data, false), Some(Value::Name("error".into())));

        let err = field.decode(&mut BitReader::new(&[0xC0]), false).unwrap_err();
        assert!(matches!(err, DsdlError::EnumIndex { index: 3, count: 3 }));

        let err = field
            .encode(&mut BitWriter::new(), Some(&Value::Name("bogus".into())), false)
            .unwrap_err();
        assert!(matches!(err, DsdlError::UnknownOption(name) if name == "bogus"));
    }

    #[test]
    fn flags_decode_in_declaration_order() {
        let field = Field::flags(["a", "b", "c"]);
        let set = Value::Flags(vec!["c".into(), "a".into()]);
        let data = encode(&field, &set, false);
        // mask 0b101 in a 3-bit field.
        assert_eq!(data, vec![0b1010_0000]);
        assert_eq!(
            decode(&field, &data, false),
            Some(Value::Flags(vec!["a".into(), "c".into()]))
        );
    }

    #[test]
    fn mapped_names_and_raw_values() {
        let field = Field::mapped(Field::uint(8), [("idle", 0u8), ("busy", 7u8)]);
        assert_eq!(field.dsdl(), "saturated uint8");

        let data = encode(&field, &Value::Name("busy".into()), false);
        assert_eq!(data, vec![7]);
        assert_eq!(decode(&field, &data, false), Some(Value::Name("busy".into())));

        let data = encode(&field, &Value::Unsigned(9), false);
        assert_eq!(decode(&field, &data, false), Some(Value::Unsigned(9)));
    }

    #[test]
    fn mapped_table_literals_match_any_integer_variant() {
        let field = Field::mapped(Field::uint(2), [("OK", 0), ("WARNING", 1)]);
        let data = encode(&field, &Value::Name("WARNING".into()), false);
        assert_eq!(data, vec![0x40]);
        assert_eq!(decode(&field, &data, false), Some(Value::Name("WARNING".into())));

        let field = Field::mapped(Field::int(4), [("down", -1), ("up", 1)]);
        let data = encode(&field, &Value::Name("down".into()), false);
        assert_eq!(decode(&field, &data, false), Some(Value::Name("down".into())));
    }

    #[test]
    fn signed_field_truncates_floats() {
        let field = Field::int(8);
        let data = encode(&field, &Value::Float(-3.9), false);
        assert_eq!(decode(&field, &data, false), Some(Value::Signed(-3)));
        let data = encode(&field, &Value::Float(2.7), false);
        assert_eq!(decode(&field, &data, false), Some(Value::Signed(2)));
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let err = Field::boolean()
            .encode(&mut BitWriter::new(), Some(&Value::Unsigned(1)), false)
            .unwrap_err();
        assert!(matches!(
            err,
            DsdlError::Mismatch {
                field: "bool",
                found: "unsigned"
            }
        ));

        let err = Field::uint(8).encode(&mut BitWriter::new(), None, false).unwrap_err();
        assert!(matches!(err, DsdlError::Mismatch { found: "absent", .. }));
    }
}
