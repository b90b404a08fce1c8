//! Mutation targets from bound collection mappings
//!
//! The persister-building step: read a collection role out of the bound
//! [`Metadata`] and flatten it into the rendered names a coordinator needs.

use quarry_core::MappingError;
use quarry_core::mapping::{
    Collection, CollectionKind, InheritanceType, Metadata, TemporalStrategy, Value,
};
use quarry_types::{Column, Dialect};

use crate::{MutationError, Result};
use crate::target::{
    AuditTable, CollectionMutationTarget, CollectionNature, CollectionTableMapping, HistoryTable,
    SubclassTable, TemporalColumns,
};

fn rendered(columns: Vec<&Column>, dialect: Dialect) -> Vec<String> {
    columns
        .into_iter()
        .map(|column| column.quoted_name(dialect))
        .collect()
}

fn nature(kind: &CollectionKind) -> CollectionNature {
    match kind {
        CollectionKind::Bag => CollectionNature::Bag,
        CollectionKind::IdentifierBag { .. } => CollectionNature::IdentifierBag,
        CollectionKind::Set => CollectionNature::Set,
        CollectionKind::List { .. } => CollectionNature::List,
        CollectionKind::Array { .. } | CollectionKind::PrimitiveArray { .. } => CollectionNature::Array,
        CollectionKind::Map { .. } => CollectionNature::Map,
    }
}

/// Build the mutation target of collection `role`
///
/// One-to-many collections write the element entity's table, with the
/// element entity's identifier columns standing in for element columns.
/// When that entity's hierarchy keeps one table per concrete class, every
/// class of the hierarchy below it gets a subclass table slot.
pub fn build_mutation_target(metadata: &Metadata, role: &str, dialect: Dialect) -> Result<CollectionMutationTarget> {
    let collection = metadata
        .collection(role)
        .ok_or_else(|| MappingError::Mapping(format!("Unknown collection role: {role}")))?;

    let key_columns = rendered(collection.key.columns(), dialect);
    let index_columns = collection
        .kind
        .index()
        .map(|index| rendered(index.columns(), dialect))
        .unwrap_or_default();
    let identifier_column = collection
        .kind
        .identifier()
        .and_then(|identifier| identifier.selectables.iter().find_map(|s| s.as_column()))
        .map(|column| column.quoted_name(dialect));

    let mut table = match &collection.element {
        Value::OneToMany(one_to_many) => {
            let id = metadata
                .entity_by_name(&one_to_many.associated_entity_name)
                .ok_or_else(|| MappingError::UnknownEntity(one_to_many.associated_entity_name.clone()))?;
            let entity_table = metadata
                .database
                .table(metadata.entity(id)?.table)
                .map_err(MappingError::from)?;
            let element_columns = metadata
                .identifier(id)?
                .map(|identifier| rendered(identifier.columns(), dialect))
                .unwrap_or_default();
            CollectionTableMapping::new(entity_table.qualified_name(dialect), key_columns, element_columns)
                .one_to_many(true)
        }
        element => {
            if element.selectables().iter().any(|s| s.is_formula()) {
                return Err(MutationError::Unsupported(format!(
                    "collection {role} has a formula element and cannot write rows"
                )));
            }
            let table_id = collection.collection_table.ok_or_else(|| {
                MappingError::Mapping(format!("Collection {role} has no collection table"))
            })?;
            let collection_table = metadata.database.table(table_id).map_err(MappingError::from)?;
            CollectionTableMapping::new(
                collection_table.qualified_name(dialect),
                key_columns,
                rendered(element.columns(), dialect),
            )
        }
    }
    .index_columns(index_columns);
    if let Some(column) = identifier_column {
        table = table.identifier_column(column);
    }

    let mut target = CollectionMutationTarget::new(role, nature(&collection.kind), table)
        .dialect(dialect)
        .inverse(collection.inverse)
        .mutable(collection.mutable)
        .index_base(i64::from(collection.base_index()));

    if let Some(audit) = &collection.audit {
        target = target.audit(AuditTable {
            table_name: audit.table_name.clone(),
            transaction_id_column: audit.transaction_id_column.clone(),
            modification_type_column: audit.modification_type_column.clone(),
        });
    }
    if let Some(temporal) = &collection.temporal {
        let columns = TemporalColumns {
            starting_column: temporal.starting_column.clone(),
            ending_column: temporal.ending_column.clone(),
        };
        target = match &temporal.strategy {
            TemporalStrategy::SingleTable => target.temporal(columns),
            TemporalStrategy::HistoryTable { table_name } => target.history(HistoryTable {
                table_name: table_name.clone(),
                columns,
            }),
        };
    }

    target = with_subclass_tables(target, collection, metadata, dialect)?;
    crate::quarry_trace_mutation!(
        "target",
        role = %role,
        table = %target.table.table_name,
        subclass_tables = target.has_subclass_tables()
    );
    Ok(target)
}

fn with_subclass_tables(
    mut target: CollectionMutationTarget,
    collection: &Collection,
    metadata: &Metadata,
    dialect: Dialect,
) -> Result<CollectionMutationTarget> {
    let Value::OneToMany(one_to_many) = &collection.element else {
        return Ok(target);
    };
    let Some(id) = metadata.entity_by_name(&one_to_many.associated_entity_name) else {
        return Ok(target);
    };
    let root = metadata.root_class(id)?;
    if root.inheritance != InheritanceType::TablePerClass || !metadata.entity(id)?.has_subclasses() {
        return Ok(target);
    }

    for class_id in metadata.subclass_closure(id)? {
        let class = metadata.entity(class_id)?;
        let table = metadata.database.table(class.table).map_err(MappingError::from)?;
        target = target.subclass_table(SubclassTable {
            subclass_id: class.subclass_id(),
            entity_name: class.entity_name.clone(),
            table_name: table.qualified_name(dialect),
        });
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::mapping::{
        AuditMapping, OneToMany, PersistentClass, SimpleValue, SubclassStrategy, TemporalMapping,
    };
    use quarry_types::{Formula, Identifier, Table, TableId};

    fn table(metadata: &mut Metadata, name: &str, columns: &[&str]) -> TableId {
        let mut table = Table::new(Identifier::new(name, false));
        for column in columns {
            table.add_column(Column::new(column));
        }
        metadata.database.add_table(table)
    }

    fn basic(table: TableId, columns: &[&str]) -> Value {
        let mut value = SimpleValue::new(Some(table));
        for column in columns {
            value.add_column(Column::new(column));
        }
        Value::Basic(value)
    }

    fn with_payments(metadata: &mut Metadata) {
        let payment = table(metadata, "payment", &["id", "order_id"]);
        let card = table(metadata, "card_payment", &["id", "order_id", "card_number"]);
        let cash = table(metadata, "cash_payment", &["id", "order_id"]);

        let root = metadata
            .add_root(PersistentClass::root("Payment", payment, InheritanceType::TablePerClass))
            .unwrap();
        metadata.root_class_mut(root).unwrap().identifier = Some(basic(payment, &["id"]));
        for (name, table) in [("CardPayment", card), ("CashPayment", cash)] {
            metadata
                .add_subclass(PersistentClass::subclass(name, table, root, SubclassStrategy::Union))
                .unwrap();
        }
    }

    #[test]
    fn test_list_target_from_collection_table() {
        let mut metadata = Metadata::new();
        let lines = table(&mut metadata, "order_lines", &["order_id", "position", "sku"]);
        let index = basic(lines, &["position"]);
        let mut collection = Collection::new(
            "Order.lines",
            "Order",
            CollectionKind::List { index, base_index: 1 },
            Some(lines),
            basic(lines, &["order_id"]),
            basic(lines, &["sku"]),
        );
        collection.audit = Some(AuditMapping::new("order_lines_aud"));
        collection.temporal = Some(TemporalMapping {
            starting_column: "valid_from".into(),
            ending_column: "valid_to".into(),
            strategy: TemporalStrategy::HistoryTable {
                table_name: "order_lines_history".into(),
            },
        });
        metadata.add_collection(collection).unwrap();

        let target = build_mutation_target(&metadata, "Order.lines", Dialect::PostgreSQL).unwrap();
        assert_eq!(target.nature, CollectionNature::List);
        assert_eq!(target.table.table_name, "order_lines");
        assert_eq!(target.table.key_columns, vec!["order_id"]);
        assert_eq!(target.table.index_columns, vec!["position"]);
        assert_eq!(target.table.element_columns, vec!["sku"]);
        assert_eq!(target.index_base, 1);
        assert!(target.row_update_possible);
        assert_eq!(target.audit.as_ref().unwrap().transaction_id_column, "REV");
        assert_eq!(target.history.as_ref().unwrap().table_name, "order_lines_history");
        assert!(target.temporal.is_none());
    }

    #[test]
    fn test_one_to_many_over_table_per_class_hierarchy() {
        let mut metadata = Metadata::new();
        with_payments(&mut metadata);
        let payment = metadata.entity_named("Payment").unwrap().table;
        let collection = Collection::new(
            "Order.payments",
            "Order",
            CollectionKind::Set,
            None,
            basic(payment, &["order_id"]),
            Value::OneToMany(OneToMany {
                associated_entity_name: "Payment".into(),
                ignore_not_found: false,
            }),
        );
        metadata.add_collection(collection).unwrap();

        let target = build_mutation_target(&metadata, "Order.payments", Dialect::SQLite).unwrap();
        assert!(target.is_one_to_many());
        assert_eq!(target.table.table_name, "payment");
        assert_eq!(target.table.element_columns, vec!["id"]);
        assert_eq!(target.subclass_tables.len(), 3);
        assert_eq!(target.table_for_subclass(0).unwrap().table_name, "payment");
        assert_eq!(target.table_for_subclass(1).unwrap().table_name, "card_payment");
        assert_eq!(target.table_for_subclass(2).unwrap().table_name, "cash_payment");
    }

    #[test]
    fn test_formula_element_is_unsupported() {
        let mut metadata = Metadata::new();
        let tags = table(&mut metadata, "order_tags", &["order_id"]);
        let element = SimpleValue::new(Some(tags)).formula(Formula::new("upper(tag)"));
        metadata
            .add_collection(Collection::new(
                "Order.tags",
                "Order",
                CollectionKind::Set,
                Some(tags),
                basic(tags, &["order_id"]),
                Value::Basic(element),
            ))
            .unwrap();

        let error = build_mutation_target(&metadata, "Order.tags", Dialect::SQLite).unwrap_err();
        assert!(matches!(error, MutationError::Unsupported(_)), "{error}");
    }

    #[test]
    fn test_unknown_role() {
        let error = build_mutation_target(&Metadata::new(), "Order.missing", Dialect::SQLite).unwrap_err();
        assert!(error.to_string().contains("Order.missing"));
    }
}
