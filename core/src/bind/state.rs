//! Mutable state and read-only context of one binding run

use std::collections::BTreeMap;

use quarry_types::{Dialect, Identifier, TableId};

use super::second_pass::{ResolutionCallback, SecondPassQueue};
use super::table::TableReference;
use super::{BindingOptions, NamingContext};
use crate::Result;
use crate::mapping::Metadata;

/// Everything a binding run produces or defers
///
/// Owned by exactly one run and threaded through every binder by `&mut`.
#[derive(Debug, Default)]
pub struct BindingState {
    pub metadata: Metadata,
    entity_tables: BTreeMap<String, TableReference>,
    secondary_tables: BTreeMap<(String, String), TableReference>,
    pub(crate) second_passes: SecondPassQueue,
}

impl BindingState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the primary table of an entity
    pub fn register_entity_table(&mut self, entity_name: &str, table: TableReference) {
        self.entity_tables.insert(entity_name.to_string(), table);
    }

    /// Primary table of an entity
    #[must_use]
    pub fn entity_table(&self, entity_name: &str) -> Option<&TableReference> {
        self.entity_tables.get(entity_name)
    }

    /// Record a secondary table under the logical name annotations use
    pub fn register_secondary_table(
        &mut self,
        entity_name: &str,
        logical_name: &Identifier,
        table: TableReference,
    ) {
        self.secondary_tables.insert(
            (entity_name.to_string(), logical_name.canonical_name()),
            table,
        );
    }

    /// Secondary table of an entity by logical name
    #[must_use]
    pub fn secondary_table(&self, entity_name: &str, logical_name: &str) -> Option<TableId> {
        let name = Identifier::to_identifier(logical_name)?;
        self.secondary_tables
            .get(&(entity_name.to_string(), name.canonical_name()))
            .map(TableReference::table)
    }

    /// Defer work until its target is bound
    pub fn queue_second_pass(&mut self, callback: Box<dyn ResolutionCallback>) {
        self.second_passes.push(callback);
    }

    /// Number of queued callbacks
    #[inline]
    #[must_use]
    pub fn pending_second_passes(&self) -> usize {
        self.second_passes.len()
    }

    /// Finish the run
    #[must_use]
    pub fn into_metadata(self) -> Metadata {
        self.metadata
    }
}

/// Options and naming strategies shared read-only by every binder
#[derive(Clone, Debug)]
pub struct BindingContext {
    options: BindingOptions,
    naming: NamingContext,
}

impl BindingContext {
    /// Resolve naming strategies once for the run
    pub fn new(options: BindingOptions) -> Result<Self> {
        options.validate()?;
        let naming = NamingContext::new(&options)?;
        Ok(Self { options, naming })
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &BindingOptions {
        &self.options
    }

    #[inline]
    #[must_use]
    pub fn naming(&self) -> &NamingContext {
        &self.naming
    }

    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_types::Table;

    #[test]
    fn test_secondary_table_lookup_is_case_insensitive() {
        let mut state = BindingState::new();
        let table = state
            .metadata
            .database
            .add_table(Table::new(Identifier::new("ORDER_DETAILS", false)));
        state.register_secondary_table(
            "Order",
            &Identifier::new("ORDER_DETAILS", false),
            TableReference::Secondary {
                table,
                optional: true,
            },
        );
        assert_eq!(state.secondary_table("Order", "order_details"), Some(table));
        assert_eq!(state.secondary_table("Customer", "order_details"), None);
    }

    #[test]
    fn test_context_rejects_bad_options() {
        let options = BindingOptions {
            physical_naming_strategy: "shouting".into(),
            ..BindingOptions::default()
        };
        assert!(BindingContext::new(options).is_err());
    }
}
