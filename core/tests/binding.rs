//! End-to-end binding of JSON mapping documents

use std::io::Write;

use quarry_core::MappingError;
use quarry_core::bind::{BindingOptions, bind_hierarchies, load_hierarchies};
use quarry_core::mapping::{InheritanceType, SubclassStrategy, Value};

const JOINED_ORDERS: &str = r#"[{
    "root": {
        "class": {
            "name": "com.shop.Order",
            "annotations": [{"kind": "Inheritance", "attributes": {"strategy": "JOINED"}}]
        },
        "attributes": [
            {"name": "id", "nature": "basic", "member": {"typeName": "Long"}},
            {"name": "placedAt", "nature": "basic", "member": {"typeName": "Instant"}}
        ],
        "subTypes": [
            {
                "class": {"name": "com.shop.OnlineOrder"},
                "attributes": [{"name": "url", "nature": "basic", "member": {"typeName": "String"}}]
            },
            {
                "class": {
                    "name": "com.shop.StoreOrder",
                    "annotations": [
                        {"kind": "PrimaryKeyJoinColumn", "attributes": {"name": "order_id"}}
                    ]
                },
                "attributes": [{"name": "storeCode", "nature": "basic", "member": {"typeName": "String"}}]
            }
        ]
    },
    "idMapping": {"nature": "basic", "attribute": "id"}
}]"#;

#[test]
fn test_joined_hierarchy_without_discriminator() {
    let hierarchies = load_hierarchies(JOINED_ORDERS).unwrap();
    let model = bind_hierarchies(&hierarchies, &BindingOptions::default()).unwrap();
    let metadata = &model.metadata;

    let order = metadata.entity_by_name("Order").unwrap();
    let root = metadata.root_class(order).unwrap();
    assert_eq!(root.inheritance, InheritanceType::Joined);
    assert!(root.discriminator.is_none());

    let store = metadata.entity_named("StoreOrder").unwrap();
    let Some(SubclassStrategy::Joined { key: Some(key) }) = store.as_subclass().map(|s| &s.strategy) else {
        panic!("joined key not bound");
    };
    assert_eq!(key.value.selectables[0].text(), "order_id");

    let table = metadata.database.table(store.table).unwrap();
    assert_eq!(table.primary_key().unwrap().columns[0].text(), "order_id");
    let fk = &table.foreign_keys()[0];
    assert_eq!(fk.referenced_table, metadata.entity_named("Order").unwrap().table);
}

#[test]
fn test_joined_hierarchy_with_implicit_discriminator() {
    let hierarchies = load_hierarchies(JOINED_ORDERS).unwrap();
    let options = BindingOptions::default().implicit_joined_discriminators(true);
    let model = bind_hierarchies(&hierarchies, &options).unwrap();
    let metadata = &model.metadata;

    let order = metadata.entity_by_name("Order").unwrap();
    let discriminator = metadata.root_class(order).unwrap().discriminator.as_ref().unwrap();
    assert_eq!(discriminator.selectables[0].text(), "DTYPE");
    assert_eq!(
        metadata.entity_named("OnlineOrder").unwrap().discriminator_value.as_deref(),
        Some("OnlineOrder")
    );
}

#[test]
fn test_subclass_ids_are_stable() {
    let hierarchies = load_hierarchies(JOINED_ORDERS).unwrap();
    let model = bind_hierarchies(&hierarchies, &BindingOptions::default()).unwrap();
    let metadata = &model.metadata;
    let online = metadata.entity_by_name("OnlineOrder").unwrap();
    let store = metadata.entity_by_name("StoreOrder").unwrap();

    assert_eq!(metadata.subclass_id(online).unwrap(), 1);
    assert_eq!(metadata.subclass_id(store).unwrap(), 2);
    assert_eq!(metadata.subclass_id(online).unwrap(), 1);
}

#[test]
fn test_composite_identifier_column_order_and_warnings() {
    let hierarchies = load_hierarchies(
        r#"[{
            "root": {
                "class": {"name": "com.shop.OrderLine"},
                "attributes": [
                    {
                        "name": "id",
                        "nature": "embedded",
                        "member": {"typeName": "com.shop.OrderLineId"},
                        "embeddable": {
                            "class": {"name": "com.shop.OrderLineId", "serializable": true},
                            "attributes": [
                                {"name": "orderNo", "nature": "basic", "member": {"typeName": "Long"}},
                                {"name": "lineNo", "nature": "basic", "member": {"typeName": "int"}}
                            ]
                        }
                    },
                    {"name": "quantity", "nature": "basic", "member": {"typeName": "int"}}
                ]
            },
            "idMapping": {"nature": "aggregated", "attribute": "id"}
        }]"#,
    )
    .unwrap();
    let model = bind_hierarchies(&hierarchies, &BindingOptions::default()).unwrap();
    let line = model.metadata.entity_named("OrderLine").unwrap();
    let table = model.metadata.database.table(line.table).unwrap();

    let pk: Vec<&str> = table.primary_key().unwrap().columns.iter().map(|c| c.text()).collect();
    assert_eq!(pk, vec!["orderNo", "lineNo"]);

    let identifier = model.metadata.identifier(model.metadata.entity_by_name("OrderLine").unwrap());
    let Some(Value::Component(component)) = identifier.unwrap() else {
        panic!("expected a component identifier");
    };
    let parts: Vec<&str> = component.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(parts, vec!["orderNo", "lineNo"]);
    assert_eq!(model.report.warnings.len(), 2);
}

#[test]
fn test_secondary_table_with_unknown_referenced_column() {
    let hierarchies = load_hierarchies(
        r#"[{
            "root": {
                "class": {
                    "name": "Customer",
                    "annotations": [{
                        "kind": "SecondaryTable",
                        "attributes": {
                            "name": "CustomerDetails",
                            "pkJoinColumns": [
                                {"kind": "PrimaryKeyJoinColumn", "attributes": {"name": "cust_id", "referencedColumnName": "uuid"}}
                            ]
                        }
                    }]
                },
                "attributes": [{"name": "id", "nature": "basic", "member": {"typeName": "Long"}}]
            },
            "idMapping": {"nature": "basic", "attribute": "id"}
        }]"#,
    )
    .unwrap();
    let error = bind_hierarchies(&hierarchies, &BindingOptions::default()).unwrap_err();
    assert!(matches!(error, MappingError::MissingReferencedColumn { .. }), "{error}");
}

#[test]
fn test_snake_case_naming_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "physicalNamingStrategy = \"snake-case\"").unwrap();
    writeln!(file, "quotedIdentifiers = [\"table-name\"]").unwrap();
    let options = BindingOptions::load_from(file.path()).unwrap();

    let hierarchies = load_hierarchies(
        r#"[{
            "root": {
                "class": {"name": "com.shop.PurchaseOrder"},
                "attributes": [
                    {"name": "id", "nature": "basic", "member": {"typeName": "Long"}},
                    {"name": "dueDate", "nature": "basic", "member": {"typeName": "LocalDate"}}
                ]
            },
            "idMapping": {"nature": "basic", "attribute": "id"}
        }]"#,
    )
    .unwrap();
    let model = bind_hierarchies(&hierarchies, &options).unwrap();
    let order = model.metadata.entity_named("PurchaseOrder").unwrap();
    let table = model.metadata.database.table(order.table).unwrap();

    assert_eq!(table.name(), "purchase_order");
    assert!(table.name.is_quoted());
    assert!(table.column_by_name("due_date").is_some());
}

#[test]
fn test_config_errors() {
    let missing = BindingOptions::load_from(std::path::Path::new("/nonexistent/quarry.toml"));
    assert!(matches!(missing, Err(MappingError::ConfigNotFound(_))));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "implicitNamingStrategy = \"legacy\"").unwrap();
    assert!(matches!(
        BindingOptions::load_from(file.path()),
        Err(MappingError::Config(_))
    ));
}
