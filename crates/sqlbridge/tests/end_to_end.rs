//! End-to-end scenarios across the metadata model, type catalog, statement
//! generation and transfer streams.

use std::sync::Arc;

use sqlbridge::{
    copy_rows, AnsiType, DriverCapabilities, ExtensionRegistry, HostType, InsertStream,
    Location, MockDriver, RelationDef, SelectStream, SqlValue, StatementGenerator, Store,
    StoreConfig, TypeBuilder,
};

fn seeded_driver(caps: DriverCapabilities) -> Arc<MockDriver> {
    let driver = Arc::new(MockDriver::with_capabilities(caps));
    driver.declare_type(
        TypeBuilder::new("bigint", -5)
            .host(HostType::I64)
            .ansi(AnsiType::BigInt),
    );
    driver.declare_type(
        TypeBuilder::new("int", 4)
            .host(HostType::I32)
            .ansi(AnsiType::Integer),
    );
    driver.declare_type(
        TypeBuilder::new("varchar", 12)
            .host(HostType::Text)
            .ansi(AnsiType::Varchar)
            .precision(1, 8000),
    );
    driver
}

fn store_named(name: &str, driver: &Arc<MockDriver>) -> Store {
    Store::new(
        StoreConfig::new(name),
        Arc::clone(driver) as _,
        &ExtensionRegistry::new(),
    )
}

/// Declare a VARCHAR(50) name column and a BIGINT autoincrement id column;
/// the generated CREATE carries both, and the id column stays out of the
/// parameterized INSERT.
#[test]
fn scenario_create_and_insert_respect_autoincrement() {
    let driver = seeded_driver(DriverCapabilities::default());
    let store = store_named("main", &driver);

    let mut rel = RelationDef::table(Location::parse("dbo.people@main").unwrap());
    let id = rel.create_column("id", store.type_by_name("bigint").unwrap());
    id.auto_increment = true;
    id.nullable = false;
    let name = rel.create_column("name", store.type_by_name("varchar").unwrap());
    name.precision = Some(50);
    name.nullable = false;

    store.create_relation(&rel).unwrap();
    let create = driver
        .executed()
        .iter()
        .find(|s| s.starts_with("CREATE TABLE"))
        .cloned()
        .unwrap();
    assert!(create.contains("\"id\" bigint"), "{create}");
    assert!(create.contains("\"name\" varchar(50)"), "{create}");

    let generator = StatementGenerator::new(store.config());
    let insert = generator.insert(&rel).unwrap();
    assert!(!insert.contains("\"id\""), "{insert}");
    assert!(insert.contains("\"name\""), "{insert}");
}

/// Register INT with no parent and INT IDENTITY as its alias child; after
/// the build, the host-type map resolves `i32` to an INTEGER-classified
/// type and the alias name resolves to the child sharing the parent's host.
#[test]
fn scenario_parent_alias_type_unification() {
    let driver = Arc::new(MockDriver::new());
    driver.declare_type(
        TypeBuilder::new("INT", 4)
            .host(HostType::I32)
            .ansi(AnsiType::Integer),
    );
    driver.declare_type(
        TypeBuilder::new("INT IDENTITY", 4)
            .parent("int")
            .alias("int identity")
            .auto_increment(),
    );
    let store = store_named("main", &driver);

    let by_host = store.type_for_host(HostType::I32).unwrap();
    assert_eq!(by_host.ansi, Some(AnsiType::Integer));

    let child = store.type_by_name("int identity").unwrap();
    assert!(child.auto_increment);
    assert!(child.is_alias());
    assert_eq!(child.host, by_host.host);
}

/// A store with writer-concurrency limit 1 runs two insert streams to
/// different tables over the same shared connection.
#[test]
fn scenario_single_writer_streams_share_connection() {
    let caps = DriverCapabilities {
        max_writer_connections: 1,
        ..Default::default()
    };
    let driver = seeded_driver(caps);
    let store = store_named("embedded", &driver);

    let mut first = RelationDef::table(Location::parse("main.a@embedded").unwrap());
    first
        .get_or_create_column("v", store.type_by_name("varchar").unwrap())
        .unwrap();
    let mut second = RelationDef::table(Location::parse("main.b@embedded").unwrap());
    second
        .get_or_create_column("v", store.type_by_name("varchar").unwrap())
        .unwrap();

    let mut a = InsertStream::open(&store, &first).unwrap();
    let mut b = InsertStream::open(&store, &second).unwrap();
    a.insert(vec![SqlValue::Text("1".into())]).unwrap();
    b.insert(vec![SqlValue::Text("2".into())]).unwrap();
    a.close().unwrap();
    b.close().unwrap();

    assert_eq!(driver.connections_opened(), 1);
    assert_eq!(driver.rows_written(), 2);
}

/// Copy a relation's definition across stores, then a full row copy, then
/// verify the shapes diff clean in both directions.
#[test]
fn scenario_cross_store_copy_round_trip() {
    let source_driver = seeded_driver(DriverCapabilities::default());
    let source = store_named("main", &source_driver);

    let mut source_rel = RelationDef::table(Location::parse("dbo.items@main").unwrap());
    source_rel
        .get_or_create_column("id", source.type_by_name("bigint").unwrap())
        .unwrap();
    let label = source_rel.create_column("label", source.type_by_name("varchar").unwrap());
    label.precision = Some(20);
    source_rel.set_primary_key(&["id"]).unwrap();

    source_driver.script_query(
        "SELECT \"id\", \"label\" FROM \"dbo\".\"items\"",
        &["id", "label"],
        (1..=5)
            .map(|i| vec![SqlValue::I64(i), SqlValue::Text(format!("item{i}"))])
            .collect(),
    );

    let target_driver = seeded_driver(DriverCapabilities::default());
    let target = store_named("backup", &target_driver);
    let mut target_rel = RelationDef::table(Location::parse("dbo.items@backup").unwrap());
    target_rel.copy_data_def(&source_rel).unwrap();
    assert!(target_rel.diff(&source_rel).is_empty());
    assert!(source_rel.diff(&target_rel).is_empty());

    target.create_relation(&target_rel).unwrap();
    let report = copy_rows(&source, &source_rel, &target, &target_rel).unwrap();
    assert_eq!(report.rows_committed, 5);
    assert_eq!(target_driver.rows_written(), 5);

    // The select side walks the same rows again after a rewind.
    let mut select = SelectStream::open(&source, &source_rel).unwrap();
    let mut seen = 0;
    while select.next().unwrap() {
        seen += 1;
    }
    select.before_first().unwrap();
    while select.next().unwrap() {
        seen += 1;
    }
    assert_eq!(seen, 10);
}
