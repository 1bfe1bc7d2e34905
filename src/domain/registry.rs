//! Glove registry
//!
//! Owns every registered glove. Ids are indices into the registration order
//! and are never reused while the registry lives; only a full [`clear`]
//! removes gloves.
//!
//! [`clear`]: GloveRegistry::clear

use crate::domain::error::{GloveError, Result};
use crate::domain::glove::Glove;
use crate::domain::models::GloveId;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default)]
pub struct GloveRegistry {
    gloves: Vec<Arc<Glove>>,
}

impl GloveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `identifier` and add a new glove for it.
    pub fn register(&mut self, identifier: &str) -> Result<GloveId> {
        let id = GloveId(self.gloves.len());
        let glove = Glove::new(id, identifier)?;
        info!(
            "Registered {} ({:?}, IMU: {}) as {}",
            identifier,
            glove.profile().topology,
            glove.profile().has_imu,
            id
        );
        self.gloves.push(Arc::new(glove));
        Ok(id)
    }

    pub fn get(&self, id: GloveId) -> Result<&Arc<Glove>> {
        self.gloves.get(id.0).ok_or(GloveError::InvalidHandle(id))
    }

    pub fn len(&self) -> usize {
        self.gloves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gloves.is_empty()
    }

    /// Registered identifiers in id order.
    pub fn identifiers(&self) -> Vec<String> {
        self.gloves
            .iter()
            .map(|g| g.identifier().to_string())
            .collect()
    }

    /// Drop every glove. Connections must already be torn down.
    pub fn clear(&mut self) {
        self.gloves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_registration_order() {
        let mut registry = GloveRegistry::new();
        let a = registry.register("{00001001}").unwrap();
        let b = registry.register("{00600501}").unwrap();
        assert_eq!(a, GloveId(0));
        assert_eq!(b, GloveId(1));
        assert_eq!(registry.get(b).unwrap().id(), b);
        assert_eq!(registry.identifiers(), vec!["{00001001}", "{00600501}"]);
    }

    #[test]
    fn test_malformed_identifier_is_not_registered() {
        let mut registry = GloveRegistry::new();
        assert!(registry.register("{006xx}").is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.register("{00001501}").unwrap(), GloveId(0));
    }

    #[test]
    fn test_unknown_id_is_invalid_handle() {
        let registry = GloveRegistry::new();
        assert!(matches!(
            registry.get(GloveId(0)),
            Err(GloveError::InvalidHandle(GloveId(0)))
        ));
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = GloveRegistry::new();
        registry.register("{00001001}").unwrap();
        registry.clear();
        assert_eq!(registry.len(), 0);
        assert!(registry.get(GloveId(0)).is_err());
    }
}
