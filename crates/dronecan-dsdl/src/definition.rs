use bytes::Bytes;
use tracing::trace;

use crate::bits::{bit_length, BitReader, BitWriter};
use crate::error::{DsdlError, Result};
use crate::field::Field;
use crate::value::{Composite, UnionValue, Value};

/// How field names are written into canonical schema text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldNaming {
    /// `uptimeSec` is rendered as `uptime_sec`.
    #[default]
    SnakeCase,
    /// Names are rendered exactly as declared.
    Preserve,
}

/// An ordered set of named fields, optionally a union.
///
/// Declaration order is the wire layout order.
#[derive(Debug, Clone, Default)]
pub struct TypeDefinition {
    union: bool,
    fields: Vec<(String, Field)>,
}

impl TypeDefinition {
    /// A structure: every field encoded in order.
    pub fn structure() -> Self {
        Self::default()
    }

    /// A union: a tag selects exactly one field.
    pub fn union() -> Self {
        Self {
            union: true,
            fields: Vec::new(),
        }
    }

    /// Append a field. Void fields still take a name; it is never rendered.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn fields(&self) -> &[(String, Field)] {
        &self.fields
    }

    pub fn is_union(&self) -> bool {
        self.union
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sum of the fields' maximum widths.
    pub fn max_bits(&self) -> u64 {
        self.fields.iter().map(|(_, f)| f.max_bits()).sum()
    }

    /// Signatures of nested composite fields, in declaration order.
    pub fn field_signatures(&self) -> Vec<u64> {
        self.fields.iter().filter_map(|(_, f)| f.signature()).collect()
    }

    fn tag_bits(&self) -> u32 {
        bit_length(self.fields.len())
    }

    /// Encode `value` into `bits`. `tail` is forwarded to the last field only.
    pub fn encode(&self, bits: &mut BitWriter, value: &Value, tail: bool) -> Result<()> {
        if self.union {
            let selected = match value {
                Value::Union(union) => union.clone(),
                Value::Composite(candidates) => UnionValue::select(self, candidates)?,
                other => {
                    return Err(DsdlError::Mismatch {
                        field: "union",
                        found: other.kind(),
                    })
                }
            };
            return self.encode_union(bits, &selected);
        }

        let Value::Composite(composite) = value else {
            return Err(DsdlError::Mismatch {
                field: "composite",
                found: value.kind(),
            });
        };

        let last = self.fields.len().saturating_sub(1);
        for (i, (name, field)) in self.fields.iter().enumerate() {
            let value = composite.get(name);
            if value.is_none() && !field.is_void() {
                return Err(DsdlError::MissingField(name.clone()));
            }
            field.encode(bits, value, tail && i == last)?;
        }
        Ok(())
    }

    fn encode_union(&self, bits: &mut BitWriter, selected: &UnionValue) -> Result<()> {
        let index = self
            .fields
            .iter()
            .position(|(name, _)| name == selected.field())
            .ok_or_else(|| DsdlError::UnknownUnionField(selected.field().to_string()))?;
        bits.write(self.tag_bits(), index as u64)?;
        self.fields[index].1.encode(bits, Some(selected.value()), false)
    }

    /// Decode one value from `bits`. `tail` is forwarded to the last field only.
    pub fn decode(&self, bits: &mut BitReader<'_>, tail: bool) -> Result<Value> {
        if self.union {
            let index = bits.read(self.tag_bits())?;
            let (name, field) = usize::try_from(index)
                .ok()
                .and_then(|i| self.fields.get(i))
                .ok_or(DsdlError::UnionTag {
                    index,
                    count: self.fields.len(),
                })?;
            let value = field
                .decode(bits, false)?
                .unwrap_or_else(|| Value::Composite(Composite::new()));
            return Ok(Value::Union(UnionValue::new(name.as_str(), value)));
        }

        let last = self.fields.len().saturating_sub(1);
        let mut composite = Composite::new();
        for (i, (name, field)) in self.fields.iter().enumerate() {
            if let Some(value) = field.decode(bits, tail && i == last)? {
                composite.insert(name.as_str(), value);
            }
        }
        Ok(Value::Composite(composite))
    }

    /// Encode a whole payload (tail array optimization enabled).
    pub fn encoded(&self, value: &Value) -> Result<Bytes> {
        let mut bits = BitWriter::new();
        self.encode(&mut bits, value, true)?;
        trace!(bits = bits.position(), "encoded payload");
        Ok(bits.into_bytes())
    }

    /// Decode a whole payload (tail array optimization enabled).
    pub fn decoded(&self, data: &[u8]) -> Result<Value> {
        self.decode(&mut BitReader::new(data), true)
    }

    /// Canonical schema text: one line per field, `@union` first for unions.
    pub fn render(&self, naming: FieldNaming) -> String {
        let marker = self.union.then(|| "@union".to_string());
        let lines = self.fields.iter().map(|(name, field)| {
            if field.is_void() {
                return field.dsdl().to_string();
            }
            let name = match naming {
                FieldNaming::SnakeCase => camel_to_snake(name),
                FieldNaming::Preserve => name.clone(),
            };
            format!("{} {name}", field.dsdl())
        });
        marker.into_iter().chain(lines).collect::<Vec<_>>().join("\n")
    }
}

/// `vendorSpecificStatusCode` -> `vendor_specific_status_code`.
fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
