//! Identifier resolution
//!
//! Every name resolves in three tiers: an explicit annotation value wins,
//! otherwise the implicit strategy derives one; the physical strategy then
//! rewrites it, and finally the global quoting policy may mark it quoted.
//! Quote markup in explicit text and global quoting both end up as
//! [`Identifier::is_quoted`], never as characters inside the name.

use heck::ToSnakeCase;
use quarry_types::{Identifier, QuotedIdentifierTarget};

use super::BindingOptions;
use crate::Result;

/// Derives names nobody spelled out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImplicitNamingStrategy {
    /// JPA defaults: entity name for tables, attribute name for columns
    #[default]
    JpaCompliant,
    /// Like `JpaCompliant`, but join key columns are `<table>_<column>`
    ComponentPath,
}

impl ImplicitNamingStrategy {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "jpa" | "default" => Some(Self::JpaCompliant),
            "component-path" => Some(Self::ComponentPath),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::JpaCompliant => "jpa",
            Self::ComponentPath => "component-path",
        }
    }

    /// Implicit primary table name of an entity
    #[must_use]
    pub fn primary_table_name(&self, entity_name: &str) -> String {
        entity_name.rsplit('.').next().unwrap_or(entity_name).to_string()
    }

    /// Implicit column name of a basic attribute
    #[must_use]
    pub fn basic_column_name(&self, attribute_path: &str) -> String {
        match self {
            Self::JpaCompliant => attribute_path
                .rsplit('.')
                .next()
                .unwrap_or(attribute_path)
                .to_string(),
            Self::ComponentPath => attribute_path.replace('.', "_"),
        }
    }

    /// Implicit name of a primary-key join column
    #[must_use]
    pub fn primary_key_join_column_name(&self, referenced_table: &str, referenced_column: &str) -> String {
        match self {
            Self::JpaCompliant => referenced_column.to_string(),
            Self::ComponentPath => format!("{referenced_table}_{referenced_column}"),
        }
    }

    /// Implicit discriminator column name
    #[must_use]
    pub const fn discriminator_column_name(&self) -> &'static str {
        "DTYPE"
    }
}

/// Rewrites logical names into physical ones
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhysicalNamingStrategy {
    /// Names are used as-is
    #[default]
    Identity,
    /// `OrderLine` becomes `order_line`
    SnakeCase,
}

impl PhysicalNamingStrategy {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "identity" | "default" => Some(Self::Identity),
            "snake-case" | "camel-case-to-underscores" => Some(Self::SnakeCase),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::SnakeCase => "snake-case",
        }
    }

    /// Apply the strategy, keeping the quoting flag
    #[must_use]
    pub fn to_physical(&self, logical: Identifier) -> Identifier {
        match self {
            Self::Identity => logical,
            Self::SnakeCase => {
                let quoted = logical.is_quoted();
                Identifier::new(logical.text().to_snake_case(), quoted)
            }
        }
    }
}

/// Naming strategies plus quoting policy, resolved once per run
#[derive(Clone, Debug)]
pub struct NamingContext {
    implicit: ImplicitNamingStrategy,
    physical: PhysicalNamingStrategy,
    options: BindingOptions,
}

impl NamingContext {
    /// Resolve strategies from options
    pub fn new(options: &BindingOptions) -> Result<Self> {
        Ok(Self {
            implicit: options.implicit_naming()?,
            physical: options.physical_naming()?,
            options: options.clone(),
        })
    }

    /// The implicit strategy
    #[inline]
    #[must_use]
    pub fn implicit(&self) -> ImplicitNamingStrategy {
        self.implicit
    }

    /// Explicit text if present and not blank, otherwise the implicit name
    #[must_use]
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        implicit: impl FnOnce(&ImplicitNamingStrategy) -> String,
        target: QuotedIdentifierTarget,
    ) -> Identifier {
        let logical = explicit
            .and_then(Identifier::to_identifier)
            .unwrap_or_else(|| {
                let name = implicit(&self.implicit);
                Identifier::to_identifier(&name).unwrap_or_else(|| Identifier::new(name, false))
            });
        let physical = self.physical.to_physical(logical);
        if self.options.is_quoted(target) {
            physical.quote()
        } else {
            physical
        }
    }

    /// Table name
    #[must_use]
    pub fn table_name(&self, explicit: Option<&str>, entity_name: &str) -> Identifier {
        self.resolve(
            explicit,
            |s| s.primary_table_name(entity_name),
            QuotedIdentifierTarget::TableName,
        )
    }

    /// Column name
    #[must_use]
    pub fn column_name(&self, explicit: Option<&str>, attribute_path: &str) -> Identifier {
        self.resolve(
            explicit,
            |s| s.basic_column_name(attribute_path),
            QuotedIdentifierTarget::ColumnName,
        )
    }

    /// Schema name, falling back to the configured default
    #[must_use]
    pub fn schema_name(&self, explicit: Option<&str>) -> Option<Identifier> {
        let text = explicit
            .filter(|s| !s.trim().is_empty())
            .or(self.options.default_schema.as_deref())?;
        Some(self.resolve(Some(text), |_| String::new(), QuotedIdentifierTarget::SchemaName))
    }

    /// Catalog name, falling back to the configured default
    #[must_use]
    pub fn catalog_name(&self, explicit: Option<&str>) -> Option<Identifier> {
        let text = explicit
            .filter(|s| !s.trim().is_empty())
            .or(self.options.default_catalog.as_deref())?;
        Some(self.resolve(Some(text), |_| String::new(), QuotedIdentifierTarget::CatalogName))
    }
}
