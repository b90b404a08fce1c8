mod common;

use std::sync::Arc;

use common::RecordingSession;
use quarry_mutation::{
    AuditTable, CollectionCoordinatorFactory, CollectionCoordinators, CollectionEntry,
    CollectionMutationTarget, CollectionNature, CollectionSemantics, CollectionTableMapping,
    HistoryTable, JdbcValue, PersistentCollection, SnapshotCollection, SubclassTable, TemporalColumns,
};

fn letters(values: &[&str]) -> Vec<CollectionEntry> {
    values.iter().map(|v| CollectionEntry::of(*v)).collect()
}

/// Delete, update, then insert, the order a flush runs them in
fn flush(
    coordinators: &CollectionCoordinators,
    collection: &dyn PersistentCollection,
    key: &[JdbcValue],
    session: &RecordingSession,
) {
    coordinators.delete.delete_rows(collection, key, session).unwrap();
    coordinators.update.update_rows(key, collection, session).unwrap();
    coordinators.insert.insert_rows(collection, key, None, session).unwrap();
}

fn order_lines() -> CollectionMutationTarget {
    let table = CollectionTableMapping::new("order_lines", vec!["order_id".into()], vec!["product".into()])
        .index_columns(vec!["position".into()]);
    CollectionMutationTarget::new("Order.lines", CollectionNature::List, table)
}

#[test]
fn test_list_removal_flush() {
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(order_lines()));
    let mut collection = SnapshotCollection::new(CollectionSemantics::List, letters(&["A", "B", "C"]));
    collection.remove(1);
    let session = RecordingSession::new();

    flush(&coordinators, &collection, &[JdbcValue::Int(10)], &session);

    let statements = session.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].sql, "delete from order_lines where order_id=? and position=?");
    assert_eq!(statements[0].values, vec![JdbcValue::Int(10), JdbcValue::Int(2)]);
    // C moved from position 2 to 1; A is untouched
    assert_eq!(
        statements[1].sql,
        "update order_lines set product=? where order_id=? and position=?"
    );
    assert_eq!(
        statements[1].values,
        vec!["C".into(), JdbcValue::Int(10), JdbcValue::Int(1)]
    );
    assert_eq!(session.created(), session.released());
}

#[test]
fn test_list_updates_run_last_to_first_after_removal() {
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(order_lines()));
    let mut collection = SnapshotCollection::new(CollectionSemantics::List, letters(&["A", "B", "C", "D"]));
    collection.remove(0);
    let session = RecordingSession::new();

    coordinators
        .update
        .update_rows(&[JdbcValue::Int(10)], &collection, &session)
        .unwrap();

    let positions: Vec<_> = session
        .statements()
        .into_iter()
        .map(|s| s.values[2].clone())
        .collect();
    assert_eq!(positions, vec![JdbcValue::Int(2), JdbcValue::Int(1), JdbcValue::Int(0)]);
}

#[test]
fn test_map_flush_by_key() {
    let table = CollectionTableMapping::new("order_notes", vec!["order_id".into()], vec!["note".into()])
        .index_columns(vec!["label".into()]);
    let target = CollectionMutationTarget::new("Order.notes", CollectionNature::Map, table);
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
    let mut collection = SnapshotCollection::new(
        CollectionSemantics::Map,
        [
            CollectionEntry::of("fragile").keyed("shipping"),
            CollectionEntry::of("net 30").keyed("billing"),
        ],
    );
    collection.push(CollectionEntry::of("keep upright").keyed("shipping"));
    collection.push(CollectionEntry::of("gift").keyed("wrapping"));
    collection.remove_where(|entry| entry.index == Some("billing".into()));
    let session = RecordingSession::new();

    flush(&coordinators, &collection, &[JdbcValue::Int(3)], &session);

    assert_eq!(
        session.sql(),
        vec![
            "delete from order_notes where order_id=? and label=?",
            "update order_notes set note=? where order_id=? and label=?",
            "insert into order_notes (order_id, label, note) values (?, ?, ?)",
        ]
    );
    let statements = session.statements();
    assert_eq!(statements[0].values[1], "billing".into());
    assert_eq!(statements[1].values, vec!["keep upright".into(), JdbcValue::Int(3), "shipping".into()]);
    assert_eq!(statements[2].values, vec![JdbcValue::Int(3), "wrapping".into(), "gift".into()]);
}

#[test]
fn test_identifier_bag_updates_by_row_id() {
    let table = CollectionTableMapping::new("order_memos", vec!["order_id".into()], vec!["memo".into()])
        .identifier_column("memo_id");
    let target = CollectionMutationTarget::new("Order.memos", CollectionNature::IdentifierBag, table);
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
    let mut collection = SnapshotCollection::new(
        CollectionSemantics::IdentifierBag,
        [CollectionEntry::of("call back").identified(100)],
    );
    collection.set(0, CollectionEntry::of("called").identified(100));
    let session = RecordingSession::new();

    flush(&coordinators, &collection, &[JdbcValue::Int(3)], &session);

    let statements = session.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].sql, "update order_memos set memo=? where order_id=? and memo_id=?");
    assert_eq!(statements[0].values, vec!["called".into(), JdbcValue::Int(3), JdbcValue::Int(100)]);
}

#[test]
fn test_table_per_subclass_delete_releases_each_executor_once() {
    let table = CollectionTableMapping::new("payment", vec!["order_id".into()], vec!["id".into()])
        .one_to_many(true);
    let subclasses = [
        (0, "Payment", "payment"),
        (1, "CardPayment", "card_payment"),
        (2, "CashPayment", "cash_payment"),
        (3, "Voucher", "voucher"),
        (4, "GiftCard", "gift_card"),
    ];
    let target = subclasses
        .into_iter()
        .fold(
            CollectionMutationTarget::new("Order.payments", CollectionNature::Set, table),
            |target, (subclass_id, entity, table_name)| {
                target.subclass_table(SubclassTable {
                    subclass_id,
                    entity_name: entity.into(),
                    table_name: table_name.into(),
                })
            },
        );
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
    let mut collection = SnapshotCollection::new(
        CollectionSemantics::Set,
        [
            CollectionEntry::of(1).subclass(1),
            CollectionEntry::of(2).subclass(3),
            CollectionEntry::of(3).subclass(1),
            CollectionEntry::of(4).subclass(4),
            CollectionEntry::of(5).subclass(3),
        ],
    );
    collection.clear();
    let session = RecordingSession::new();

    coordinators
        .delete
        .delete_rows(&collection, &[JdbcValue::Int(10)], &session)
        .unwrap();

    let mut created = session.created();
    created.sort();
    assert_eq!(
        created,
        vec![
            "Order.payments#DELETE_ROWS#1".to_string(),
            "Order.payments#DELETE_ROWS#3".to_string(),
            "Order.payments#DELETE_ROWS#4".to_string(),
        ]
    );
    let mut released = session.released();
    released.sort();
    assert_eq!(released, created);

    let statements = session.statements();
    assert_eq!(statements.len(), 5);
    assert_eq!(
        statements[1].sql,
        "update voucher set order_id=null where order_id=? and id=?"
    );
    assert!(statements.iter().all(|s| !s.sql.contains("cash_payment") && !s.sql.contains(" payment ")));
}

#[test]
fn test_one_to_many_list_relinks_shifted_rows() {
    let table = CollectionTableMapping::new("order_items", vec!["order_id".into()], vec!["id".into()])
        .index_columns(vec!["position".into()])
        .one_to_many(true);
    let target = CollectionMutationTarget::new("Order.items", CollectionNature::List, table);
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
    let mut collection = SnapshotCollection::new(
        CollectionSemantics::List,
        [CollectionEntry::of(1), CollectionEntry::of(2), CollectionEntry::of(3)],
    );
    collection.remove(0);
    let session = RecordingSession::new();

    flush(&coordinators, &collection, &[JdbcValue::Int(10)], &session);

    let statements = session.statements();
    let keys: Vec<_> = statements.iter().map(|s| s.batch_key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "Order.items#DELETE_ROWS",
            "Order.items#UPDATE_DELETE",
            "Order.items#UPDATE_DELETE",
            "Order.items#UPDATE_INSERT",
            "Order.items#UPDATE_INSERT",
        ]
    );
    // last-to-first: item 3 is linked at position 1 before item 2 at position 0
    assert_eq!(statements[3].values, vec![JdbcValue::Int(10), JdbcValue::Int(1), JdbcValue::Int(3)]);
    assert_eq!(statements[4].values, vec![JdbcValue::Int(10), JdbcValue::Int(0), JdbcValue::Int(2)]);
}

#[test]
fn test_shadow_tables_follow_primary_writes() {
    let target = order_lines()
        .audit(AuditTable {
            table_name: "order_lines_aud".into(),
            transaction_id_column: "REV".into(),
            modification_type_column: "REVTYPE".into(),
        })
        .history(HistoryTable {
            table_name: "order_lines_history".into(),
            columns: TemporalColumns {
                starting_column: "valid_from".into(),
                ending_column: "valid_to".into(),
            },
        });
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(target));
    let mut collection = SnapshotCollection::new(CollectionSemantics::List, letters(&["A"]));
    collection.set(0, CollectionEntry::of("B"));
    let session = RecordingSession::new();

    coordinators
        .update
        .update_rows(&[JdbcValue::Int(10)], &collection, &session)
        .unwrap();

    let keys: Vec<_> = session.statements().into_iter().map(|s| s.batch_key).collect();
    assert_eq!(
        keys,
        vec![
            "Order.lines#UPDATE",
            "Order.lines#HISTORY_END",
            "Order.lines#HISTORY_INSERT",
            "Order.lines#AUDIT",
        ]
    );
    let statements = session.statements();
    assert_eq!(
        statements[1].sql,
        "update order_lines_history set valid_to=? where order_id=? and position=? and valid_to is null"
    );
    assert_eq!(statements[3].values.last(), Some(&JdbcValue::Int(1)));
    assert_eq!(statements[3].values[0], JdbcValue::Int(1001));
}

#[test]
fn test_immutable_collection_writes_nothing() {
    let coordinators = CollectionCoordinatorFactory::build(Arc::new(order_lines().mutable(false)));
    let collection = SnapshotCollection::created(CollectionSemantics::List, letters(&["A", "B"]));
    let session = RecordingSession::new();

    flush(&coordinators, &collection, &[JdbcValue::Int(10)], &session);
    coordinators.remove.delete_all_rows(&[JdbcValue::Int(10)], &session).unwrap();

    assert!(session.created().is_empty());
}
