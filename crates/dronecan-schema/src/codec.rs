//! Encode/decode by type name.
//!
//! Encoding failures are caller errors and propagate. Decoding failures come
//! from received traffic: they are logged and reported as `None` so one bad
//! transfer never halts a receive loop.

use bytes::Bytes;
use dronecan_dsdl::{TypeDefinition, Value};
use tracing::warn;

use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;

#[derive(Debug, Clone, Copy)]
enum Part {
    Message,
    Request,
    Response,
}

impl Part {
    fn label(self) -> &'static str {
        match self {
            Part::Message => "message",
            Part::Request => "request",
            Part::Response => "response",
        }
    }
}

impl SchemaRegistry {
    fn definition(&self, name: &str, part: Part) -> Result<&TypeDefinition> {
        match part {
            Part::Message => self
                .message_by_name(name)
                .map(|ty| ty.definition().as_ref())
                .ok_or_else(|| SchemaError::UnknownMessage(name.to_string())),
            Part::Request => self
                .service_by_name(name)
                .map(|ty| ty.request().as_ref())
                .ok_or_else(|| SchemaError::UnknownService(name.to_string())),
            Part::Response => self
                .service_by_name(name)
                .map(|ty| ty.response().as_ref())
                .ok_or_else(|| SchemaError::UnknownService(name.to_string())),
        }
    }

    fn encode_part(&self, name: &str, part: Part, value: &Value) -> Result<Bytes> {
        Ok(self.definition(name, part)?.encoded(value)?)
    }

    fn decode_part(&self, name: &str, part: Part, payload: &[u8]) -> Option<Value> {
        let definition = match self.definition(name, part) {
            Ok(definition) => definition,
            Err(err) => {
                warn!(kind = part.label(), name, error = %err, "cannot decode unknown type");
                return None;
            }
        };
        match definition.decoded(payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    kind = part.label(),
                    name,
                    len = payload.len(),
                    error = %err,
                    "failed to decode payload"
                );
                None
            }
        }
    }

    /// Serialize a message of type `name`.
    pub fn encode_message(&self, name: &str, value: &Value) -> Result<Bytes> {
        self.encode_part(name, Part::Message, value)
    }

    /// Serialize a request of service `name`.
    pub fn encode_request(&self, name: &str, value: &Value) -> Result<Bytes> {
        self.encode_part(name, Part::Request, value)
    }

    /// Serialize a response of service `name`.
    pub fn encode_response(&self, name: &str, value: &Value) -> Result<Bytes> {
        self.encode_part(name, Part::Response, value)
    }

    /// Deserialize a message of type `name`; `None` if unknown or malformed.
    pub fn decode_message(&self, name: &str, payload: &[u8]) -> Option<Value> {
        self.decode_part(name, Part::Message, payload)
    }

    /// Deserialize a request of service `name`; `None` if unknown or malformed.
    pub fn decode_request(&self, name: &str, payload: &[u8]) -> Option<Value> {
        self.decode_part(name, Part::Request, payload)
    }

    /// Deserialize a response of service `name`; `None` if unknown or malformed.
    pub fn decode_response(&self, name: &str, payload: &[u8]) -> Option<Value> {
        self.decode_part(name, Part::Response, payload)
    }
}
