//! The set of resources a dashboard serves.

use std::{fmt, sync::Arc};

use crate::{
    errors::DashboardError,
    resources::{Resource, ResourceDescriptor, ResourceExt},
};

/// Compile-time resource registration.
///
/// ```ignore
/// dashboard::inventory::submit! {
///     dashboard::ResourceRegistration { factory: users_resource }
/// }
/// ```
pub struct ResourceRegistration {
    pub factory: fn() -> Arc<dyn Resource>,
}

inventory::collect!(ResourceRegistration);

/// Every resource submitted with [`inventory::submit!`].
pub fn registered_resources() -> impl Iterator<Item = &'static ResourceRegistration> {
    inventory::iter::<ResourceRegistration>()
}

/// Registered resources, unique by uri key, in registration order.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: Vec<Arc<dyn Resource>>,
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.resources.iter().map(|resource| resource.uri_key())).finish()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every compile-time registered resource.
    pub fn with_registered() -> Result<Self, DashboardError> {
        let mut registry = Self::new();
        for registration in registered_resources() {
            registry.register((registration.factory)())?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) -> Result<(), DashboardError> {
        let uri_key = resource.uri_key();
        if self.get(&uri_key).is_some() {
            return Err(DashboardError::DuplicateResource { uri_key });
        }
        log::debug!("registered resource `{uri_key}`");
        self.resources.push(resource);
        Ok(())
    }

    pub fn get(&self, uri_key: &str) -> Option<Arc<dyn Resource>> {
        self.resources
            .iter()
            .find(|resource| resource.uri_key() == uri_key)
            .cloned()
    }

    pub fn resolve(&self, uri_key: &str) -> Result<Arc<dyn Resource>, DashboardError> {
        self.get(uri_key).ok_or_else(|| DashboardError::ResourceNotFound {
            uri_key: uri_key.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Resource>> {
        self.resources.iter()
    }

    pub fn descriptors(&self) -> Vec<ResourceDescriptor> {
        self.resources.iter().map(|resource| resource.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
