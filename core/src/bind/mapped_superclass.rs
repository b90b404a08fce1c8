//! Mapped superclass binding
//!
//! A chain of mapped superclasses is bound from the top down so every
//! [`MappedSuperclass`] can point at an already registered parent.

use super::BindingState;
use super::model::{AttributeMetadata, EntityHierarchy, KeyMapping, MappedSuperclassTypeMetadata};
use crate::Result;
use crate::mapping::{MappedSuperclass, MappedSuperclassId, Metadata};
use crate::quarry_trace_bind;

/// A bound mapped superclass and the chain above it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappedSuperclassBinding {
    id: MappedSuperclassId,
    superclass: Option<Box<MappedSuperclassBinding>>,
}

impl MappedSuperclassBinding {
    /// Bind `metadata` after every mapped superclass above it
    pub fn bind(
        metadata: &MappedSuperclassTypeMetadata,
        hierarchy: &EntityHierarchy,
        state: &mut BindingState,
    ) -> Result<Self> {
        let superclass = match metadata.super_type.as_deref() {
            Some(parent) => Some(Box::new(Self::bind(parent, hierarchy, state)?)),
            None => None,
        };

        let declares = |name: &str| metadata.attributes.iter().any(|a| a.name == name);
        let identifier_property = match &hierarchy.id_mapping {
            KeyMapping::Basic { attribute } | KeyMapping::Aggregated { attribute } => {
                declares(attribute).then(|| attribute.clone())
            }
            KeyMapping::NonAggregated { .. } => None,
        };
        let version = hierarchy
            .version_attribute
            .as_ref()
            .filter(|name| declares(name))
            .cloned();

        let mapped = MappedSuperclass {
            class_name: metadata.class.name.clone(),
            superclass: superclass.as_ref().map(|s| s.id),
            declared_properties: metadata.attributes.iter().map(|a| a.name.clone()).collect(),
            identifier_property,
            version,
        };
        let id = state.metadata.add_mapped_superclass(mapped);
        quarry_trace_bind!("mapped_superclass", class = %metadata.class.name);
        Ok(Self { id, superclass })
    }

    /// Id of the bound mapped superclass
    #[inline]
    #[must_use]
    pub fn id(&self) -> MappedSuperclassId {
        self.id
    }

    /// The bound mapped superclass
    pub fn binding<'a>(&self, metadata: &'a Metadata) -> Result<&'a MappedSuperclass> {
        metadata.mapped_superclass(self.id)
    }

    /// Ids from the top of the chain down to this one
    #[must_use]
    pub fn chain(&self) -> Vec<MappedSuperclassId> {
        let mut ids = self.superclass.as_ref().map_or_else(Vec::new, |s| s.chain());
        ids.push(self.id);
        ids
    }
}

/// Attributes of a mapped superclass chain, topmost class first
#[must_use]
pub fn inherited_attributes(metadata: &MappedSuperclassTypeMetadata) -> Vec<&AttributeMetadata> {
    let mut attributes = metadata
        .super_type
        .as_deref()
        .map_or_else(Vec::new, inherited_attributes);
    attributes.extend(metadata.attributes.iter());
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::model::{ClassDetails, EntityTypeMetadata};

    fn chain() -> MappedSuperclassTypeMetadata {
        MappedSuperclassTypeMetadata {
            class: ClassDetails::new("Auditable"),
            attributes: vec![AttributeMetadata::basic("createdAt", "Instant")],
            super_type: Some(Box::new(MappedSuperclassTypeMetadata {
                class: ClassDetails::new("BaseEntity"),
                attributes: vec![
                    AttributeMetadata::basic("id", "Long"),
                    AttributeMetadata::basic("version", "int"),
                ],
                super_type: None,
            })),
        }
    }

    #[test]
    fn test_chain_bound_top_down() {
        let mut hierarchy = EntityHierarchy::new(
            EntityTypeMetadata::new(ClassDetails::new("Order")),
            KeyMapping::Basic { attribute: "id".into() },
        );
        hierarchy.version_attribute = Some("version".into());
        let mut state = BindingState::new();
        let binding = MappedSuperclassBinding::bind(&chain(), &hierarchy, &mut state).unwrap();

        let ids = binding.chain();
        assert_eq!(ids.len(), 2);
        let base = state.metadata.mapped_superclass(ids[0]).unwrap();
        assert_eq!(base.class_name, "BaseEntity");
        assert_eq!(base.identifier_property.as_deref(), Some("id"));
        assert_eq!(base.version.as_deref(), Some("version"));

        let auditable = binding.binding(&state.metadata).unwrap();
        assert_eq!(auditable.superclass, Some(ids[0]));
        assert_eq!(auditable.declared_properties, vec!["createdAt"]);
        assert!(auditable.identifier_property.is_none());
    }

    #[test]
    fn test_inherited_attributes_order() {
        let chain = chain();
        let names: Vec<&str> = inherited_attributes(&chain).iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "version", "createdAt"]);
    }
}
