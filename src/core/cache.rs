//! Type descriptor cache
//!
//! Descriptors are built once per record type and shared as
//! `Arc<TypeDescriptor>`. A miss builds outside the lock; when two threads
//! race on the same type, the first published descriptor wins and both get
//! it.

use crate::core::descriptor::TypeDescriptor;
use crate::core::error::{XmlError, XmlResult};
use crate::core::value::XmlRecord;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::debug;

static GLOBAL_CACHE: OnceLock<Arc<DescriptorCache>> = OnceLock::new();

/// Memoizing store of type descriptors keyed by type
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl DescriptorCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used when no other cache is configured
    pub fn global() -> Arc<DescriptorCache> {
        GLOBAL_CACHE
            .get_or_init(|| Arc::new(DescriptorCache::new()))
            .clone()
    }

    /// Descriptor of a record's type, building it on first use
    pub fn descriptor(&self, record: &dyn XmlRecord) -> XmlResult<Arc<TypeDescriptor>> {
        let id = record.schema_id();
        {
            let entries = self.entries.read().map_err(|_| poisoned())?;
            if let Some(descriptor) = entries.get(&id) {
                return Ok(descriptor.clone());
            }
        }

        let built = Arc::new(TypeDescriptor::build(
            record.schema_name(),
            record.schema_fields(),
        )?);

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let published = entries.entry(id).or_insert_with(|| {
            debug!(
                type_name = built.type_name,
                fields = built.fields.len(),
                "published type descriptor"
            );
            built.clone()
        });
        Ok(published.clone())
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the cache holds no descriptor
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached descriptor
    ///
    /// Descriptors already handed out stay valid; later lookups rebuild.
    pub fn reset(&self) -> XmlResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        debug!(dropped = entries.len(), "reset descriptor cache");
        entries.clear();
        Ok(())
    }
}

fn poisoned() -> XmlError {
    XmlError::InternalError("descriptor cache lock poisoned".to_string())
}
