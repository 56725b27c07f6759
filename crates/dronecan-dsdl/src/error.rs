/// Errors raised while encoding or decoding against a type definition.
///
/// These are schema or programming errors, not transport faults: each one
/// aborts the encode/decode call that raised it.
#[derive(Debug, thiserror::Error)]
pub enum DsdlError {
    /// A bit stream operation asked for more than 64 bits.
    #[error("bit count {0} outside 0..=64")]
    BitCount(u32),

    /// A union value named none of the union's fields.
    #[error("union value has no populated field")]
    EmptyUnion,

    /// A union value named a field the union does not declare.
    #[error("union field `{0}` is not declared")]
    UnknownUnionField(String),

    /// A decoded union tag has no corresponding field.
    #[error("union tag {index} has no corresponding field ({count} declared)")]
    UnionTag { index: u64, count: usize },

    /// A composite value lacks a declared (non-void) field.
    #[error("missing value for field `{0}`")]
    MissingField(String),

    /// A value does not fit the kind of field it was given to.
    #[error("{field} field cannot encode {found} value")]
    Mismatch {
        field: &'static str,
        found: &'static str,
    },

    /// A fixed-length array value has the wrong number of elements.
    #[error("fixed array expects {expected} elements, got {found}")]
    ArrayLength { expected: usize, found: usize },

    /// A decoded enumeration index has no option.
    #[error("enumeration index {index} out of range ({count} options)")]
    EnumIndex { index: u64, count: usize },

    /// An enumeration, flag or mapped name is not among the declared options.
    #[error("unknown option `{0}`")]
    UnknownOption(String),
}

pub type Result<T> = std::result::Result<T, DsdlError>;
