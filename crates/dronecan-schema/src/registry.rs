use std::collections::HashMap;
use std::sync::Arc;

use dronecan_dsdl::{MessageType, ServiceType, TypeDefinition};
use dronecan_frame::{Frame, SignatureLookup};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, SchemaError};

/// Id- and name-keyed registry of message and service types.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    messages: HashMap<u16, Arc<MessageType>>,
    message_names: HashMap<String, u16>,
    services: HashMap<u8, Arc<ServiceType>>,
    service_names: HashMap<String, u8>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            messages: HashMap::new(),
            message_names: HashMap::new(),
            services: HashMap::new(),
            service_names: HashMap::new(),
            config,
        }
    }

    /// Register a message type. The type must carry an id.
    pub fn register_message(&mut self, ty: Arc<MessageType>) -> Result<()> {
        let id = ty
            .id()
            .ok_or_else(|| SchemaError::MissingId(ty.name().to_string()))?;

        if !self.config.allow_replace {
            if let Some(existing) = self.messages.get(&id) {
                return Err(SchemaError::DuplicateMessageId {
                    id,
                    existing: existing.name().to_string(),
                });
            }
            if self.message_names.contains_key(ty.name()) {
                return Err(SchemaError::DuplicateName(ty.name().to_string()));
            }
        }

        if let Some(old) = self.messages.remove(&id) {
            self.message_names.remove(old.name());
            debug!(id, old = old.name(), new = ty.name(), "replaced message type");
        }
        if let Some(old_id) = self.message_names.remove(ty.name()) {
            self.messages.remove(&old_id);
        }

        debug!(id, name = ty.name(), signature = ty.signature(), "registered message type");
        self.message_names.insert(ty.name().to_string(), id);
        self.messages.insert(id, ty);
        Ok(())
    }

    /// Register a service type.
    pub fn register_service(&mut self, ty: Arc<ServiceType>) -> Result<()> {
        let id = ty.id();

        if !self.config.allow_replace {
            if let Some(existing) = self.services.get(&id) {
                return Err(SchemaError::DuplicateServiceId {
                    id,
                    existing: existing.name().to_string(),
                });
            }
            if self.service_names.contains_key(ty.name()) {
                return Err(SchemaError::DuplicateName(ty.name().to_string()));
            }
        }

        if let Some(old) = self.services.remove(&id) {
            self.service_names.remove(old.name());
            debug!(id, old = old.name(), new = ty.name(), "replaced service type");
        }
        if let Some(old_id) = self.service_names.remove(ty.name()) {
            self.services.remove(&old_id);
        }

        debug!(id, name = ty.name(), signature = ty.signature(), "registered service type");
        self.service_names.insert(ty.name().to_string(), id);
        self.services.insert(id, ty);
        Ok(())
    }

    /// Build and register a message type using the configured field naming.
    pub fn define_message(
        &mut self,
        name: &str,
        id: u16,
        definition: TypeDefinition,
    ) -> Result<Arc<MessageType>> {
        let ty = Arc::new(MessageType::with_field_naming(
            name,
            Some(id),
            definition,
            self.config.field_naming,
        ));
        self.register_message(Arc::clone(&ty))?;
        Ok(ty)
    }

    /// Build and register a service type using the configured field naming.
    pub fn define_service(
        &mut self,
        name: &str,
        id: u8,
        request: TypeDefinition,
        response: TypeDefinition,
    ) -> Result<Arc<ServiceType>> {
        let ty = Arc::new(ServiceType::with_field_naming(
            name,
            id,
            request,
            response,
            self.config.field_naming,
        ));
        self.register_service(Arc::clone(&ty))?;
        Ok(ty)
    }

    pub fn message_by_id(&self, id: u16) -> Option<&Arc<MessageType>> {
        self.messages.get(&id)
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Arc<MessageType>> {
        self.message_names
            .get(name)
            .and_then(|id| self.messages.get(id))
    }

    pub fn service_by_id(&self, id: u8) -> Option<&Arc<ServiceType>> {
        self.services.get(&id)
    }

    pub fn service_by_name(&self, name: &str) -> Option<&Arc<ServiceType>> {
        self.service_names
            .get(name)
            .and_then(|id| self.services.get(id))
    }

    /// Registered message ids, ascending.
    pub fn message_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.messages.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Registered service ids, ascending.
    pub fn service_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.services.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.messages.len() + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureLookup for SchemaRegistry {
    fn signature_for(&self, frame: &Frame) -> Option<u64> {
        match frame {
            Frame::Message { id, .. } => self.message_by_id(*id).map(|ty| ty.signature()),
            Frame::Anonymous { id, .. } => self
                .message_by_id(u16::from(*id))
                .map(|ty| ty.signature()),
            Frame::Service { id, .. } => self.service_by_id(*id).map(|ty| ty.signature()),
        }
    }
}
