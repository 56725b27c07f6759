use std::sync::Arc;

use crate::definition::{FieldNaming, TypeDefinition};
use crate::signature::compose;

/// A message type: a named definition with an optional broadcast id.
///
/// Types without an id can still be nested inside other types via
/// [`Field::reference`](crate::Field::reference) but cannot be broadcast.
#[derive(Debug, Clone)]
pub struct MessageType {
    name: String,
    id: Option<u16>,
    definition: Arc<TypeDefinition>,
    dsdl: String,
    signature: u64,
    max_bits: u64,
}

impl MessageType {
    pub fn new(name: impl Into<String>, id: Option<u16>, definition: TypeDefinition) -> Self {
        Self::with_field_naming(name, id, definition, FieldNaming::default())
    }

    pub fn with_field_naming(
        name: impl Into<String>,
        id: Option<u16>,
        definition: TypeDefinition,
        naming: FieldNaming,
    ) -> Self {
        let name = name.into();
        let dsdl = join_text([name.clone(), definition.render(naming)]);
        let signature = compose(&dsdl, &definition.field_signatures());
        let max_bits = definition.max_bits();
        Self {
            name,
            id,
            definition: Arc::new(definition),
            dsdl,
            signature,
            max_bits,
        }
    }

    /// Full type name, e.g. `uavcan.protocol.NodeStatus`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<u16> {
        self.id
    }

    pub fn definition(&self) -> &Arc<TypeDefinition> {
        &self.definition
    }

    /// Canonical schema text: the name line followed by one line per field.
    pub fn dsdl(&self) -> &str {
        &self.dsdl
    }

    pub fn signature(&self) -> u64 {
        self.signature
    }

    pub fn max_bits(&self) -> u64 {
        self.max_bits
    }
}

/// A service type: a request and a response definition sharing one id.
#[derive(Debug, Clone)]
pub struct ServiceType {
    name: String,
    id: u8,
    request: Arc<TypeDefinition>,
    response: Arc<TypeDefinition>,
    dsdl: String,
    signature: u64,
}

impl ServiceType {
    pub fn new(
        name: impl Into<String>,
        id: u8,
        request: TypeDefinition,
        response: TypeDefinition,
    ) -> Self {
        Self::with_field_naming(name, id, request, response, FieldNaming::default())
    }

    pub fn with_field_naming(
        name: impl Into<String>,
        id: u8,
        request: TypeDefinition,
        response: TypeDefinition,
        naming: FieldNaming,
    ) -> Self {
        let name = name.into();
        let dsdl = join_text([
            name.clone(),
            request.render(naming),
            "---".to_string(),
            response.render(naming),
        ]);
        let nested: Vec<u64> = request
            .field_signatures()
            .into_iter()
            .chain(response.field_signatures())
            .collect();
        let signature = compose(&dsdl, &nested);
        Self {
            name,
            id,
            request: Arc::new(request),
            response: Arc::new(response),
            dsdl,
            signature,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn request(&self) -> &Arc<TypeDefinition> {
        &self.request
    }

    pub fn response(&self) -> &Arc<TypeDefinition> {
        &self.response
    }

    /// Canonical schema text: name, request lines, `---`, response lines.
    pub fn dsdl(&self) -> &str {
        &self.dsdl
    }

    pub fn signature(&self) -> u64 {
        self.signature
    }
}

fn join_text<const N: usize>(parts: [String; N]) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
