//! Class metadata consumed by the binder
//!
//! These records describe classes and their members the way an annotation
//! scanner would report them. They deserialize from JSON mapping documents.

use serde::{Deserialize, Serialize};

use super::annotations::{Annotated, AnnotationUsage};
use crate::mapping::{CacheAccessType, InheritanceType, OptimisticLockStyle};
use crate::Result;

/// A method of a class
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDetails {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<AnnotationUsage>,
}

impl Annotated for MethodDetails {
    fn annotations(&self) -> &[AnnotationUsage] {
        &self.annotations
    }
}

/// A class with its annotations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetails {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<AnnotationUsage>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub serializable: bool,
    #[serde(default)]
    pub overrides_equals: bool,
    #[serde(default)]
    pub overrides_hash_code: bool,
    #[serde(default)]
    pub methods: Vec<MethodDetails>,
}

impl ClassDetails {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            is_abstract: false,
            serializable: false,
            overrides_equals: false,
            overrides_hash_code: false,
            methods: Vec::new(),
        }
    }

    /// Add an annotation
    #[must_use]
    pub fn annotated(mut self, usage: AnnotationUsage) -> Self {
        self.annotations.push(usage);
        self
    }

    /// Simple name without package
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl Annotated for ClassDetails {
    fn annotations(&self) -> &[AnnotationUsage] {
        &self.annotations
    }
}

/// A field or property accessor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetails {
    pub type_name: String,
    #[serde(default)]
    pub annotations: Vec<AnnotationUsage>,
}

impl Annotated for MemberDetails {
    fn annotations(&self) -> &[AnnotationUsage] {
        &self.annotations
    }
}

/// What kind of mapping an attribute needs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeNature {
    Basic,
    Embedded,
    Any,
    ToOne,
    Plural,
}

/// An embeddable class and its attributes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddableTypeMetadata {
    pub class: ClassDetails,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadata>,
}

/// A persistent attribute
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeMetadata {
    pub name: String,
    pub nature: AttributeNature,
    pub member: MemberDetails,
    /// Embeddable type for embedded attributes and embedded ids
    #[serde(default)]
    pub embeddable: Option<EmbeddableTypeMetadata>,
}

impl AttributeMetadata {
    /// A basic attribute of `type_name`
    #[must_use]
    pub fn basic(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nature: AttributeNature::Basic,
            member: MemberDetails {
                type_name: type_name.into(),
                annotations: Vec::new(),
            },
            embeddable: None,
        }
    }

    /// Add a member annotation
    #[must_use]
    pub fn annotated(mut self, usage: AnnotationUsage) -> Self {
        self.member.annotations.push(usage);
        self
    }
}

/// A mapped superclass and the chain above it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedSuperclassTypeMetadata {
    pub class: ClassDetails,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadata>,
    #[serde(default)]
    pub super_type: Option<Box<MappedSuperclassTypeMetadata>>,
}

/// An entity class with its subtypes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeMetadata {
    pub class: ClassDetails,
    /// `@Entity(name)`; the simple class name when absent
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeMetadata>,
    #[serde(default)]
    pub sub_types: Vec<EntityTypeMetadata>,
    /// Mapped superclass directly above this entity
    #[serde(default)]
    pub super_type: Option<MappedSuperclassTypeMetadata>,
}

impl EntityTypeMetadata {
    #[must_use]
    pub fn new(class: ClassDetails) -> Self {
        Self {
            class,
            entity_name: None,
            attributes: Vec::new(),
            sub_types: Vec::new(),
            super_type: None,
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a subtype
    #[must_use]
    pub fn sub_type(mut self, sub_type: EntityTypeMetadata) -> Self {
        self.sub_types.push(sub_type);
        self
    }

    /// Resolved entity name
    #[must_use]
    pub fn entity_name(&self) -> String {
        self.entity_name
            .clone()
            .unwrap_or_else(|| self.class.simple_name().to_string())
    }

    /// Whether any subtype exists
    #[inline]
    #[must_use]
    pub fn has_sub_types(&self) -> bool {
        !self.sub_types.is_empty()
    }

    /// Find an attribute declared here or on a mapped superclass above
    #[must_use]
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.attributes.iter().find(|a| a.name == name).or_else(|| {
            let mut current = self.super_type.as_ref();
            while let Some(mapped) = current {
                if let Some(found) = mapped.attributes.iter().find(|a| a.name == name) {
                    return Some(found);
                }
                current = mapped.super_type.as_deref();
            }
            None
        })
    }
}

/// Shape of a hierarchy's identifier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "nature")]
pub enum KeyMapping {
    /// One basic `@Id` attribute
    Basic { attribute: String },
    /// One `@EmbeddedId` attribute
    Aggregated { attribute: String },
    /// Several `@Id` attributes, optionally with an `@IdClass`
    NonAggregated {
        attributes: Vec<String>,
        #[serde(default)]
        id_class: Option<String>,
    },
}

/// Cache region settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRegion {
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub access_type: Option<CacheAccessType>,
    #[serde(default = "default_true")]
    pub lazy_properties_included: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for CacheRegion {
    fn default() -> Self {
        Self {
            region_name: None,
            access_type: None,
            lazy_properties_included: true,
        }
    }
}

/// An entity hierarchy: the root plus hierarchy-wide settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityHierarchy {
    pub root: EntityTypeMetadata,
    /// Taken from `@Inheritance` on the root when absent
    #[serde(default)]
    pub inheritance_type: Option<InheritanceType>,
    pub id_mapping: KeyMapping,
    #[serde(default)]
    pub version_attribute: Option<String>,
    #[serde(default)]
    pub tenant_id_attribute: Option<String>,
    #[serde(default)]
    pub cache_region: Option<CacheRegion>,
    #[serde(default)]
    pub natural_id_cache_region: Option<String>,
    #[serde(default)]
    pub optimistic_lock_style: Option<OptimisticLockStyle>,
}

impl EntityHierarchy {
    #[must_use]
    pub fn new(root: EntityTypeMetadata, id_mapping: KeyMapping) -> Self {
        Self {
            root,
            inheritance_type: None,
            id_mapping,
            version_attribute: None,
            tenant_id_attribute: None,
            cache_region: None,
            natural_id_cache_region: None,
            optimistic_lock_style: None,
        }
    }

    /// Names of attributes bound specially and skipped by the attribute loop
    #[must_use]
    pub fn excluded_attributes(&self) -> Vec<&str> {
        let mut excluded: Vec<&str> = match &self.id_mapping {
            KeyMapping::Basic { attribute } | KeyMapping::Aggregated { attribute } => {
                vec![attribute.as_str()]
            }
            KeyMapping::NonAggregated { attributes, .. } => {
                attributes.iter().map(String::as_str).collect()
            }
        };
        excluded.extend(self.version_attribute.as_deref());
        excluded.extend(self.tenant_id_attribute.as_deref());
        excluded
    }
}

/// Parse a JSON mapping document holding a list of hierarchies
pub fn load_hierarchies(json: &str) -> Result<Vec<EntityHierarchy>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::annotations::AnnotationKind;

    #[test]
    fn test_load_document() {
        let hierarchies = load_hierarchies(
            r#"[{
                "root": {
                    "class": {
                        "name": "com.shop.Order",
                        "annotations": [{"kind": "Inheritance", "attributes": {"strategy": "JOINED"}}]
                    },
                    "attributes": [
                        {"name": "id", "nature": "basic", "member": {"typeName": "Long"}},
                        {"name": "total", "nature": "basic", "member": {"typeName": "BigDecimal"}}
                    ]
                },
                "idMapping": {"nature": "basic", "attribute": "id"},
                "versionAttribute": "version"
            }]"#,
        )
        .unwrap();
        let hierarchy = &hierarchies[0];
        assert_eq!(hierarchy.root.entity_name(), "Order");
        assert!(hierarchy.root.class.has_annotation(AnnotationKind::Inheritance));
        assert_eq!(hierarchy.excluded_attributes(), vec!["id", "version"]);
    }

    #[test]
    fn test_find_attribute_on_mapped_superclass() {
        let base = MappedSuperclassTypeMetadata {
            class: ClassDetails::new("BaseEntity"),
            attributes: vec![AttributeMetadata::basic("createdAt", "Instant")],
            super_type: None,
        };
        let mut entity = EntityTypeMetadata::new(ClassDetails::new("Order"));
        entity.super_type = Some(base);
        assert!(entity.find_attribute("createdAt").is_some());
        assert!(entity.find_attribute("missing").is_none());
    }
}
