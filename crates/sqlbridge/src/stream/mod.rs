//! Transfer streams: batched insert, cursor-based select, and the
//! source-to-target row copy built from the two.

mod insert;
mod listener;
mod select;

pub use insert::InsertStream;
pub use listener::{TransferListener, TransferReport};
pub use select::SelectStream;

use tracing::{info, warn};

use crate::driver::SqlValue;
use crate::error::{BridgeError, Result};
use crate::meta::RelationDef;
use crate::sql::StatementGenerator;
use crate::store::Store;

/// Copy every row of `source_relation` into `target_relation`.
///
/// Columns align by case-insensitive name: each insertable target column
/// must exist in the source projection. Batch size and commit cadence come
/// from the target store's config. On failure the error carries the failing
/// statement and location, and the rows already durable are logged.
pub fn copy_rows(
    source: &Store,
    source_relation: &RelationDef,
    target: &Store,
    target_relation: &RelationDef,
) -> Result<TransferReport> {
    let mut select = SelectStream::open(source, source_relation)?;
    let mut insert = InsertStream::open(target, target_relation)?;

    // Map each insertable target column to its 0-based source index once.
    let generator = StatementGenerator::new(target.config());
    let mut indices = Vec::new();
    for col in generator.insert_columns(target_relation) {
        let index = source_relation
            .columns()
            .iter()
            .position(|c| c.matches_name(&col.name))
            .ok_or_else(|| {
                BridgeError::not_found_at(
                    "column",
                    col.name.clone(),
                    source_relation.full_name(),
                )
            })?;
        indices.push(index);
    }

    while select.next()? {
        let row: Result<Vec<SqlValue>> = indices.iter().map(|&i| select.value(i)).collect();
        if let Err(e) = insert.insert(row?) {
            warn!(
                "copy into {} failed with {} rows durably committed",
                target_relation.full_name(),
                insert.listener().rows_committed()
            );
            return Err(e);
        }
    }

    let report = insert.close()?;
    info!(
        "copied {} rows from {} to {} in {:?} ({} batches, {} commits)",
        report.rows_committed,
        source_relation.full_name(),
        target_relation.full_name(),
        report.elapsed,
        report.batches,
        report.commits
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::StoreConfig;
    use crate::driver::{DriverCapabilities, MockDriver};
    use crate::location::Location;
    use crate::store::ExtensionRegistry;
    use crate::types::{AnsiType, HostType, TypeBuilder};

    fn seeded_driver(caps: DriverCapabilities) -> Arc<MockDriver> {
        let driver = Arc::new(MockDriver::with_capabilities(caps));
        driver.declare_type(
            TypeBuilder::new("bigint", -5)
                .host(HostType::I64)
                .ansi(AnsiType::BigInt),
        );
        driver.declare_type(
            TypeBuilder::new("varchar", 12)
                .host(HostType::Text)
                .ansi(AnsiType::Varchar)
                .precision(1, 8000),
        );
        driver
    }

    fn store_with(driver: &Arc<MockDriver>, batch_size: usize, commit_interval: usize) -> Store {
        let config = StoreConfig::new("main")
            .with_batch_size(batch_size)
            .with_commit_interval(commit_interval);
        Store::new(config, Arc::clone(driver) as _, &ExtensionRegistry::new())
    }

    fn users(store: &Store) -> RelationDef {
        let mut rel = RelationDef::table(Location::object("main", &["dbo", "users"]).unwrap());
        let id = rel.create_column("id", store.type_by_name("bigint").unwrap());
        id.auto_increment = true;
        let name = rel.create_column("name", store.type_by_name("varchar").unwrap());
        name.precision = Some(50);
        rel
    }

    fn insert_n(stream: &mut InsertStream<'_>, n: usize) {
        for i in 0..n {
            stream
                .insert(vec![SqlValue::Text(format!("user{i}"))])
                .unwrap();
        }
    }

    // =========================================================================
    // Batching and commit cadence
    // =========================================================================

    #[test]
    fn test_rows_committed_equals_rows_inserted_at_boundaries() {
        // Batch sizes 1, exactly the threshold, and one past the threshold.
        for rows in [1usize, 4, 5] {
            let driver = seeded_driver(DriverCapabilities::default());
            let store = store_with(&driver, 4, 2);
            let rel = users(&store);
            let mut stream = InsertStream::open(&store, &rel).unwrap();
            insert_n(&mut stream, rows);
            let report = stream.close().unwrap();
            assert_eq!(report.rows_committed, rows as u64, "rows={rows}");
            assert_eq!(driver.rows_written(), rows, "rows={rows}");
        }
    }

    #[test]
    fn test_commit_every_nth_batch() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 2, 3);
        let rel = users(&store);
        let mut stream = InsertStream::open(&store, &rel).unwrap();

        // 6 rows = 3 batches of 2 = exactly one interval commit.
        insert_n(&mut stream, 6);
        assert_eq!(stream.listener().batches(), 3);
        assert_eq!(stream.listener().commits(), 1);
        assert_eq!(stream.listener().rows_committed(), 6);

        let report = stream.close().unwrap();
        // Close adds the final commit.
        assert_eq!(report.commits, 2);
        assert_eq!(report.rows_committed, 6);
    }

    #[test]
    fn test_flush_forces_submit_and_commit() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 100, 10);
        let rel = users(&store);
        let mut stream = InsertStream::open(&store, &rel).unwrap();

        insert_n(&mut stream, 3);
        assert_eq!(stream.listener().rows_committed(), 0);
        stream.flush().unwrap();
        assert_eq!(stream.listener().rows_committed(), 3);
        assert_eq!(driver.rows_written(), 3);
        stream.close().unwrap();
    }

    #[test]
    fn test_close_is_idempotent_and_insert_after_close_fails() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 10, 10);
        let rel = users(&store);
        let mut stream = InsertStream::open(&store, &rel).unwrap();
        insert_n(&mut stream, 2);
        let first = stream.close().unwrap();
        let second = stream.close().unwrap();
        assert_eq!(first.rows_committed, second.rows_committed);
        assert!(matches!(
            stream.insert(vec![SqlValue::Null]).unwrap_err(),
            BridgeError::State(_)
        ));
    }

    // =========================================================================
    // Capability fallbacks
    // =========================================================================

    #[test]
    fn test_binding_without_batch_falls_back_to_per_row_statements() {
        let caps = DriverCapabilities {
            batch_execute: false,
            ..Default::default()
        };
        let driver = seeded_driver(caps);
        let store = store_with(&driver, 2, 1);
        let rel = users(&store);
        let mut stream = InsertStream::open(&store, &rel).unwrap();
        insert_n(&mut stream, 4);
        let report = stream.close().unwrap();
        assert_eq!(report.rows_committed, 4);
        assert_eq!(driver.rows_written(), 4);
    }

    #[test]
    fn test_no_binding_falls_back_to_literal_statements() {
        let caps = DriverCapabilities {
            batch_execute: false,
            parameter_binding: false,
            ..Default::default()
        };
        let driver = seeded_driver(caps);
        let store = store_with(&driver, 2, 1);
        let rel = users(&store);
        let mut stream = InsertStream::open(&store, &rel).unwrap();
        stream
            .insert(vec![SqlValue::Text("O'Brien".into())])
            .unwrap();
        let report = stream.close().unwrap();
        assert_eq!(report.rows_committed, 1);

        let executed = driver.executed();
        let insert = executed.iter().find(|s| s.starts_with("INSERT")).unwrap();
        assert!(insert.contains("'O''Brien'"), "{insert}");
        assert!(!insert.contains('?'));
    }

    #[test]
    fn test_values_are_coerced_against_column_types() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 10, 1);
        let mut rel = RelationDef::table(Location::object("main", &["dbo", "t"]).unwrap());
        rel.get_or_create_column("n", store.type_by_name("bigint").unwrap())
            .unwrap();

        let mut stream = InsertStream::open(&store, &rel).unwrap();
        // i32 widens into the bigint column.
        stream.insert(vec![SqlValue::I32(7)]).unwrap();
        // A boolean cannot become an integer.
        assert!(matches!(
            stream.insert(vec![SqlValue::Bool(true)]).unwrap_err(),
            BridgeError::InvalidArgument(_)
        ));
        stream.close().unwrap();
    }

    #[test]
    fn test_row_arity_is_checked() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 10, 1);
        let rel = users(&store);
        let mut stream = InsertStream::open(&store, &rel).unwrap();
        assert!(stream
            .insert(vec![SqlValue::I64(1), SqlValue::Null])
            .is_err());
        stream.close().unwrap();
    }

    // =========================================================================
    // Connection ownership
    // =========================================================================

    #[test]
    fn test_single_writer_store_shares_one_connection() {
        let caps = DriverCapabilities {
            max_writer_connections: 1,
            ..Default::default()
        };
        let driver = seeded_driver(caps);
        let store = store_with(&driver, 2, 1);
        let users_rel = users(&store);
        let mut orders = RelationDef::table(Location::object("main", &["dbo", "orders"]).unwrap());
        orders
            .get_or_create_column("note", store.type_by_name("varchar").unwrap())
            .unwrap();

        // The type lookups above opened the store connection.
        assert_eq!(driver.connections_opened(), 1);

        let mut a = InsertStream::open(&store, &users_rel).unwrap();
        let mut b = InsertStream::open(&store, &orders).unwrap();
        a.insert(vec![SqlValue::Text("x".into())]).unwrap();
        b.insert(vec![SqlValue::Text("y".into())]).unwrap();
        a.close().unwrap();
        b.close().unwrap();

        // Both streams used the shared connection, never a second one.
        assert_eq!(driver.connections_opened(), 1);
        // And the shared connection's commit mode was never toggled.
        assert!(driver.auto_commit_log().is_empty());
    }

    #[test]
    fn test_multi_writer_store_opens_dedicated_connections() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 2, 1);
        let rel = users(&store);
        assert_eq!(driver.connections_opened(), 1);

        let mut stream = InsertStream::open(&store, &rel).unwrap();
        insert_n(&mut stream, 1);
        stream.close().unwrap();

        assert_eq!(driver.connections_opened(), 2);
        // Auto-commit off at open, restored at close, on the dedicated
        // connection (id 1).
        assert_eq!(driver.auto_commit_log(), vec![(1, false), (1, true)]);
    }

    #[test]
    fn test_commit_mode_restored_even_when_flush_fails() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 10, 1);
        let rel = users(&store);
        let mut stream = InsertStream::open(&store, &rel).unwrap();
        insert_n(&mut stream, 2);
        driver.fail_matching("INSERT");

        let err = stream.close().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("INSERT"), "{text}");
        assert!(text.contains("dbo.users@main"), "{text}");

        // Cleanup ran on the failure path.
        assert_eq!(driver.auto_commit_log(), vec![(1, false), (1, true)]);
        // And the caller can still see what was durable.
        assert_eq!(stream.listener().rows_committed(), 0);
        assert_eq!(stream.listener().errors().len(), 1);
    }

    // =========================================================================
    // Select stream
    // =========================================================================

    fn scripted_select(driver: &Arc<MockDriver>, store: &Store) -> RelationDef {
        let rel = users(store);
        driver.script_query(
            "SELECT \"id\", \"name\" FROM \"dbo\".\"users\"",
            &["id", "name"],
            vec![
                vec![SqlValue::I64(1), SqlValue::Text("ada".into())],
                vec![SqlValue::I64(2), SqlValue::Null],
            ],
        );
        rel
    }

    #[test]
    fn test_select_accessors_are_zero_based() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 10, 1);
        let rel = scripted_select(&driver, &store);

        let mut stream = SelectStream::open(&store, &rel).unwrap();
        assert_eq!(stream.column_count(), 2);
        assert!(stream.next().unwrap());
        assert_eq!(stream.i64(0).unwrap(), Some(1));
        assert_eq!(stream.string(1).unwrap(), Some("ada".to_string()));
        assert!(stream.next().unwrap());
        assert_eq!(stream.string(1).unwrap(), None);
        assert!(!stream.next().unwrap());
    }

    #[test]
    fn test_before_first_reexecutes_forward_only_cursor() {
        let driver = seeded_driver(DriverCapabilities::default());
        let store = store_with(&driver, 10, 1);
        let rel = scripted_select(&driver, &store);

        let mut stream = SelectStream::open(&store, &rel).unwrap();
        assert!(stream.next().unwrap());
        assert!(stream.next().unwrap());
        stream.before_first().unwrap();
        assert!(stream.next().unwrap());
        assert_eq!(stream.i64(0).unwrap(), Some(1));

        let runs = driver
            .executed()
            .iter()
            .filter(|s| s.starts_with("SELECT"))
            .count();
        assert_eq!(runs, 2);
    }

    #[test]
    fn test_before_first_rewinds_scrollable_cursor_without_reexecute() {
        let caps = DriverCapabilities {
            scrollable_cursors: true,
            ..Default::default()
        };
        let driver = seeded_driver(caps);
        let store = store_with(&driver, 10, 1);
        let rel = scripted_select(&driver, &store);

        let mut stream = SelectStream::open(&store, &rel).unwrap();
        assert!(stream.next().unwrap());
        stream.before_first().unwrap();
        assert!(stream.next().unwrap());

        let runs = driver
            .executed()
            .iter()
            .filter(|s| s.starts_with("SELECT"))
            .count();
        assert_eq!(runs, 1);
    }

    // =========================================================================
    // End-to-end copy
    // =========================================================================

    #[test]
    fn test_copy_rows_between_stores() {
        let source_driver = seeded_driver(DriverCapabilities::default());
        let source = store_with(&source_driver, 10, 1);
        let source_rel = scripted_select(&source_driver, &source);

        let target_driver = seeded_driver(DriverCapabilities::default());
        let target = store_with(&target_driver, 1, 1);
        let mut target_rel =
            RelationDef::table(Location::object("main", &["dbo", "users_copy"]).unwrap());
        target_rel.copy_struct(&source_rel).unwrap();

        let report = copy_rows(&source, &source_rel, &target, &target_rel).unwrap();
        // The id column is autoincrement, so only name is loaded.
        assert_eq!(report.rows_committed, 2);
        assert_eq!(target_driver.rows_written(), 2);

        let insert = target_driver
            .executed()
            .iter()
            .find(|s| s.starts_with("INSERT"))
            .cloned()
            .unwrap();
        assert!(insert.contains("\"name\""));
        assert!(!insert.contains("\"id\""));
    }

    #[test]
    fn test_copy_rows_missing_source_column() {
        let source_driver = seeded_driver(DriverCapabilities::default());
        let source = store_with(&source_driver, 10, 1);
        let source_rel = scripted_select(&source_driver, &source);

        let target_driver = seeded_driver(DriverCapabilities::default());
        let target = store_with(&target_driver, 10, 1);
        let mut target_rel =
            RelationDef::table(Location::object("main", &["dbo", "t"]).unwrap());
        target_rel
            .get_or_create_column("missing", target.type_by_name("varchar").unwrap())
            .unwrap();

        assert!(matches!(
            copy_rows(&source, &source_rel, &target, &target_rel).unwrap_err(),
            BridgeError::NotFound { .. }
        ));
    }
}
