//! Binding configuration
//!
//! Loaded from `quarry.toml` or built in code.
//!
//! ```toml
//! dialect = "postgresql"
//! defaultSchema = "sales"
//! quotedIdentifiers = ["table-name"]
//! sharedCacheMode = "ENABLE_SELECTIVE"
//! physicalNamingStrategy = "snake-case"
//! ```

use std::path::Path;

use quarry_types::{Dialect, QuotedIdentifierTarget};
use serde::{Deserialize, Serialize};

use super::SharedCacheMode;
use super::naming::{ImplicitNamingStrategy, PhysicalNamingStrategy};
use crate::mapping::CacheAccessType;
use crate::{MappingError, Result};

/// Default configuration file name
pub const CONFIG_FILE: &str = "quarry.toml";

/// Options shared by every binding step of one run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BindingOptions {
    pub default_catalog: Option<String>,
    pub default_schema: Option<String>,
    pub dialect: Dialect,
    /// Quote every identifier
    pub global_quoting: bool,
    /// Identifier kinds quoted even without markup
    pub quoted_identifiers: Vec<QuotedIdentifierTarget>,
    pub shared_cache_mode: SharedCacheMode,
    pub default_cache_access_type: Option<CacheAccessType>,
    /// Joined hierarchies drop even explicitly declared discriminators
    pub ignore_explicit_discriminator_columns_for_joined_subclass: bool,
    /// Joined hierarchies get a discriminator without an explicit declaration
    pub implicit_discriminators_for_joined_inheritance: bool,
    pub implicit_naming_strategy: String,
    pub physical_naming_strategy: String,
    /// Leave unresolvable second passes queued instead of failing
    pub allow_unresolved_second_passes: bool,
    /// Soft-delete column name used when `@SoftDelete` names none
    pub soft_delete_column: Option<String>,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            default_catalog: None,
            default_schema: None,
            dialect: Dialect::default(),
            global_quoting: false,
            quoted_identifiers: Vec::new(),
            shared_cache_mode: SharedCacheMode::Unspecified,
            default_cache_access_type: None,
            ignore_explicit_discriminator_columns_for_joined_subclass: false,
            implicit_discriminators_for_joined_inheritance: false,
            implicit_naming_strategy: ImplicitNamingStrategy::JpaCompliant.as_str().to_string(),
            physical_naming_strategy: PhysicalNamingStrategy::Identity.as_str().to_string(),
            allow_unresolved_second_passes: false,
            soft_delete_column: None,
        }
    }
}

impl BindingOptions {
    /// Load from `quarry.toml` in the current directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MappingError::ConfigNotFound(path.into())
            } else {
                MappingError::ConfigIo(path.into(), e)
            }
        })?;

        let options: Self =
            toml::from_str(&content).map_err(|e| MappingError::ConfigParse(path.into(), e))?;

        options.validate()?;
        Ok(options)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.implicit_naming()?;
        self.physical_naming()?;
        if let Some(column) = &self.soft_delete_column
            && column.trim().is_empty()
        {
            return Err(MappingError::Config("softDeleteColumn must not be blank".into()));
        }
        Ok(())
    }

    /// Resolved implicit naming strategy
    pub fn implicit_naming(&self) -> Result<ImplicitNamingStrategy> {
        ImplicitNamingStrategy::parse(&self.implicit_naming_strategy).ok_or_else(|| {
            MappingError::Config(format!(
                "unknown implicit naming strategy '{}'",
                self.implicit_naming_strategy
            ))
        })
    }

    /// Resolved physical naming strategy
    pub fn physical_naming(&self) -> Result<PhysicalNamingStrategy> {
        PhysicalNamingStrategy::parse(&self.physical_naming_strategy).ok_or_else(|| {
            MappingError::Config(format!(
                "unknown physical naming strategy '{}'",
                self.physical_naming_strategy
            ))
        })
    }

    /// Whether identifiers of `target` kind are quoted
    #[must_use]
    pub fn is_quoted(&self, target: QuotedIdentifierTarget) -> bool {
        self.global_quoting || self.quoted_identifiers.contains(&target)
    }

    /// Enable the implicit joined discriminator
    #[must_use]
    pub fn implicit_joined_discriminators(mut self, enabled: bool) -> Self {
        self.implicit_discriminators_for_joined_inheritance = enabled;
        self
    }

    /// Ignore explicit joined discriminators
    #[must_use]
    pub fn ignore_joined_discriminators(mut self, enabled: bool) -> Self {
        self.ignore_explicit_discriminator_columns_for_joined_subclass = enabled;
        self
    }

    /// Tolerate unresolved second passes
    #[must_use]
    pub fn allow_unresolved(mut self, allowed: bool) -> Self {
        self.allow_unresolved_second_passes = allowed;
        self
    }

    /// Set the shared cache mode
    #[must_use]
    pub fn shared_cache_mode(mut self, mode: SharedCacheMode) -> Self {
        self.shared_cache_mode = mode;
        self
    }
}
