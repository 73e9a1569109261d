//! Explicit lookup from domain object type to mapper.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MapperError, MapperResult};
use crate::traits::Mapper;

/// Table of mappers keyed by the domain object type they handle.
///
/// Built once by the application and handed to each session, instead of
/// resolving mappers through process-wide state.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl MapperRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mapper` for its `Object` type, replacing any previous one.
    pub fn register<M>(&mut self, mapper: M) -> &mut Self
    where
        M: Mapper + 'static,
        M::Object: 'static,
    {
        self.register_shared(Arc::new(mapper))
    }

    /// Register an already shared mapper.
    pub fn register_shared<M>(&mut self, mapper: Arc<M>) -> &mut Self
    where
        M: Mapper + 'static,
        M::Object: 'static,
    {
        self.mappers.insert(TypeId::of::<M::Object>(), mapper);
        self
    }

    /// Resolve the mapper of type `M` registered for `M::Object`.
    pub fn resolve<M>(&self) -> MapperResult<Arc<M>>
    where
        M: Mapper + 'static,
        M::Object: 'static,
    {
        let entry = self
            .mappers
            .get(&TypeId::of::<M::Object>())
            .ok_or(MapperError::Unregistered(type_name::<M::Object>()))?;
        Arc::clone(entry)
            .downcast::<M>()
            .map_err(|_| MapperError::MapperMismatch(type_name::<M::Object>()))
    }

    /// Returns `true` if a mapper is registered for objects of type `O`.
    pub fn contains<O: 'static>(&self) -> bool {
        self.mappers.contains_key(&TypeId::of::<O>())
    }

    /// Number of registered mappers.
    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("mapper_count", &self.len())
            .finish()
    }
}
