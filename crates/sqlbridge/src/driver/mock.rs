//! In-memory mock driver for tests.
//!
//! Records every statement it is asked to execute, serves scripted query
//! results and introspection metadata, and can simulate capability gaps
//! (no batching, no binding, forward-only cursors, single-writer limits)
//! and externally dropped connections.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::StoreConfig;
use crate::error::{BridgeError, Result};
use crate::location::Location;
use crate::types::TypeBuilder;

use super::{
    ColumnInfo, Connection, Cursor, Driver, DriverCapabilities, ForeignKeyInfo, PrimaryKeyInfo,
    SqlValue,
};

#[derive(Default)]
struct SharedState {
    connections_opened: usize,
    executed: Vec<String>,
    rows_written: usize,
    commits: usize,
    rollbacks: usize,
    auto_commit_log: Vec<(usize, bool)>,
    killed: HashSet<usize>,
    fail_matching: Option<String>,
    results: HashMap<String, (Vec<String>, Vec<Vec<SqlValue>>)>,
    columns: HashMap<String, Vec<ColumnInfo>>,
    primary_keys: HashMap<String, PrimaryKeyInfo>,
    foreign_keys: HashMap<String, Vec<ForeignKeyInfo>>,
    objects: HashSet<String>,
    types: Vec<TypeBuilder>,
}

/// Scriptable in-memory driver.
pub struct MockDriver {
    product: String,
    caps: DriverCapabilities,
    state: Arc<Mutex<SharedState>>,
}

impl MockDriver {
    /// A mock driver with default capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(DriverCapabilities::default())
    }

    /// A mock driver with explicit capabilities.
    pub fn with_capabilities(caps: DriverCapabilities) -> Self {
        Self {
            product: "MockStore".to_string(),
            caps,
            state: Arc::new(Mutex::new(SharedState::default())),
        }
    }

    /// Override the reported product name.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().expect("mock driver state poisoned")
    }

    // ===== Scripting =====

    /// Serve the given rows for an exact query text.
    pub fn script_query<S: Into<String>>(
        &self,
        sql: impl Into<String>,
        columns: &[S],
        rows: Vec<Vec<SqlValue>>,
    ) where
        S: Clone,
    {
        let names = columns.iter().cloned().map(Into::into).collect();
        self.lock().results.insert(sql.into(), (names, rows));
    }

    /// Serve the given column metadata for a location.
    pub fn script_columns(&self, location: &Location, columns: Vec<ColumnInfo>) {
        let mut state = self.lock();
        state.objects.insert(location.to_string());
        state.columns.insert(location.to_string(), columns);
    }

    /// Serve the given primary key for a location.
    pub fn script_primary_key(&self, location: &Location, pk: PrimaryKeyInfo) {
        self.lock().primary_keys.insert(location.to_string(), pk);
    }

    /// Serve the given foreign keys for a location.
    pub fn script_foreign_keys(&self, location: &Location, fks: Vec<ForeignKeyInfo>) {
        self.lock().foreign_keys.insert(location.to_string(), fks);
    }

    /// Mark an object as existing.
    pub fn add_object(&self, location: &Location) {
        self.lock().objects.insert(location.to_string());
    }

    /// Add a vendor-declared type.
    pub fn declare_type(&self, builder: TypeBuilder) {
        self.lock().types.push(builder);
    }

    /// Make any statement containing the given fragment fail.
    pub fn fail_matching(&self, fragment: impl Into<String>) {
        self.lock().fail_matching = Some(fragment.into());
    }

    /// Simulate the server dropping every connection opened so far.
    pub fn kill_connections(&self) {
        let mut state = self.lock();
        let opened = state.connections_opened;
        state.killed.extend(0..opened);
    }

    // ===== Inspection =====

    /// Every statement executed, in order, across all connections.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Number of INSERT rows written.
    pub fn rows_written(&self) -> usize {
        self.lock().rows_written
    }

    /// Number of commits across all connections.
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    /// Number of connections ever opened.
    pub fn connections_opened(&self) -> usize {
        self.lock().connections_opened
    }

    /// Auto-commit changes as (connection id, enabled) in call order.
    pub fn auto_commit_log(&self) -> Vec<(usize, bool)> {
        self.lock().auto_commit_log.clone()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MockDriver {
    fn product_name(&self) -> &str {
        &self.product
    }

    fn capabilities(&self) -> DriverCapabilities {
        self.caps
    }

    fn connect(&self, _config: &StoreConfig) -> Result<Box<dyn Connection>> {
        let mut state = self.lock();
        let id = state.connections_opened;
        state.connections_opened += 1;
        Ok(Box::new(MockConnection {
            id,
            caps: self.caps,
            state: Arc::clone(&self.state),
            auto_commit: true,
            closed: false,
        }))
    }
}

/// Connection handed out by [`MockDriver`].
pub struct MockConnection {
    id: usize,
    caps: DriverCapabilities,
    state: Arc<Mutex<SharedState>>,
    auto_commit: bool,
    closed: bool,
}

impl MockConnection {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().expect("mock driver state poisoned")
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BridgeError::driver("connection is closed"));
        }
        Ok(())
    }

    fn record(&self, sql: &str) -> Result<()> {
        self.check_open()?;
        let mut state = self.lock();
        if let Some(fragment) = &state.fail_matching {
            if sql.contains(fragment.as_str()) {
                return Err(BridgeError::driver("simulated statement failure"));
            }
        }
        state.executed.push(sql.to_string());
        if sql.trim_start().to_ascii_uppercase().starts_with("INSERT") {
            state.rows_written += 1;
        }
        Ok(())
    }
}

impl Connection for MockConnection {
    fn execute(&mut self, sql: &str) -> Result<u64> {
        self.record(sql)?;
        Ok(0)
    }

    fn execute_bound(&mut self, sql: &str, _params: &[SqlValue]) -> Result<u64> {
        if !self.caps.parameter_binding {
            return Err(BridgeError::Unsupported(
                "driver does not support parameter binding".to_string(),
            ));
        }
        self.record(sql)?;
        Ok(1)
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64> {
        if !self.caps.batch_execute {
            return Err(BridgeError::Unsupported(
                "driver does not support batch execution".to_string(),
            ));
        }
        self.check_open()?;
        {
            let state = self.lock();
            if let Some(fragment) = &state.fail_matching {
                if sql.contains(fragment.as_str()) {
                    return Err(BridgeError::driver("simulated statement failure"));
                }
            }
        }
        let mut state = self.lock();
        for _ in rows {
            state.executed.push(sql.to_string());
            state.rows_written += 1;
        }
        Ok(rows.len() as u64)
    }

    fn query(&mut self, sql: &str) -> Result<Box<dyn Cursor>> {
        self.record(sql)?;
        let state = self.lock();
        let (names, rows) = state
            .results
            .get(sql)
            .cloned()
            .unwrap_or((Vec::new(), Vec::new()));
        Ok(Box::new(MockCursor {
            names,
            rows,
            pos: None,
            forward_only: !self.caps.scrollable_cursors,
        }))
    }

    fn set_auto_commit(&mut self, enabled: bool) -> Result<()> {
        self.check_open()?;
        self.auto_commit = enabled;
        self.lock().auto_commit_log.push((self.id, enabled));
        Ok(())
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn commit(&mut self) -> Result<()> {
        self.check_open()?;
        self.lock().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.check_open()?;
        self.lock().rollbacks += 1;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed || self.lock().killed.contains(&self.id)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn read_columns(&mut self, location: &Location) -> Result<Vec<ColumnInfo>> {
        self.check_open()?;
        Ok(self
            .lock()
            .columns
            .get(&location.to_string())
            .cloned()
            .unwrap_or_default())
    }

    fn read_primary_key(&mut self, location: &Location) -> Result<Option<PrimaryKeyInfo>> {
        self.check_open()?;
        Ok(self.lock().primary_keys.get(&location.to_string()).cloned())
    }

    fn read_foreign_keys(&mut self, location: &Location) -> Result<Vec<ForeignKeyInfo>> {
        self.check_open()?;
        Ok(self
            .lock()
            .foreign_keys
            .get(&location.to_string())
            .cloned()
            .unwrap_or_default())
    }

    fn declared_types(&mut self) -> Result<Vec<TypeBuilder>> {
        self.check_open()?;
        Ok(self.lock().types.clone())
    }

    fn object_exists(&mut self, location: &Location) -> Result<bool> {
        self.check_open()?;
        Ok(self.lock().objects.contains(&location.to_string()))
    }
}

struct MockCursor {
    names: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    pos: Option<usize>,
    forward_only: bool,
}

impl Cursor for MockCursor {
    fn advance(&mut self) -> Result<bool> {
        let next = match self.pos {
            None => 0,
            Some(p) => p + 1,
        };
        if next < self.rows.len() {
            self.pos = Some(next);
            Ok(true)
        } else {
            self.pos = Some(self.rows.len());
            Ok(false)
        }
    }

    fn value(&self, column: usize) -> Result<SqlValue> {
        let row = self
            .pos
            .filter(|&p| p < self.rows.len())
            .map(|p| &self.rows[p])
            .ok_or_else(|| {
                BridgeError::State("cursor is not positioned on a row".to_string())
            })?;
        if column == 0 || column > row.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "cursor column {column} out of range 1..={}",
                row.len()
            )));
        }
        Ok(row[column - 1].clone())
    }

    fn column_count(&self) -> usize {
        self.names.len()
    }

    fn column_names(&self) -> &[String] {
        &self.names
    }

    fn is_forward_only(&self) -> bool {
        self.forward_only
    }

    fn rewind(&mut self) -> Result<()> {
        if self.forward_only {
            return Err(BridgeError::Unsupported(
                "cursor is forward-only".to_string(),
            ));
        }
        self.pos = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_statements_and_commits() {
        let driver = MockDriver::new();
        let config = StoreConfig::new("mock");
        let mut conn = driver.connect(&config).unwrap();
        conn.execute("CREATE TABLE t (a int)").unwrap();
        conn.execute_bound("INSERT INTO t (a) VALUES (?)", &[SqlValue::I32(1)])
            .unwrap();
        conn.commit().unwrap();

        assert_eq!(driver.executed().len(), 2);
        assert_eq!(driver.rows_written(), 1);
        assert_eq!(driver.commit_count(), 1);
        assert_eq!(driver.connections_opened(), 1);
    }

    #[test]
    fn test_capability_gaps_surface_as_unsupported() {
        let caps = DriverCapabilities {
            batch_execute: false,
            parameter_binding: false,
            ..Default::default()
        };
        let driver = MockDriver::with_capabilities(caps);
        let mut conn = driver.connect(&StoreConfig::new("mock")).unwrap();
        assert!(matches!(
            conn.execute_bound("INSERT", &[]).unwrap_err(),
            BridgeError::Unsupported(_)
        ));
        assert!(matches!(
            conn.execute_batch("INSERT", &[]).unwrap_err(),
            BridgeError::Unsupported(_)
        ));
    }

    #[test]
    fn test_scripted_query_and_cursor() {
        let driver = MockDriver::new();
        driver.script_query(
            "SELECT a FROM t",
            &["a"],
            vec![vec![SqlValue::I32(1)], vec![SqlValue::I32(2)]],
        );
        let mut conn = driver.connect(&StoreConfig::new("mock")).unwrap();
        let mut cursor = conn.query("SELECT a FROM t").unwrap();

        assert!(cursor.value(1).is_err());
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.value(1).unwrap(), SqlValue::I32(1));
        assert!(cursor.advance().unwrap());
        assert!(!cursor.advance().unwrap());
        assert!(cursor.is_forward_only());
        assert!(cursor.rewind().is_err());
    }

    #[test]
    fn test_killed_connections_read_as_closed() {
        let driver = MockDriver::new();
        let mut conn = driver.connect(&StoreConfig::new("mock")).unwrap();
        assert!(!conn.is_closed());
        driver.kill_connections();
        assert!(conn.is_closed());
        assert!(conn.execute("SELECT 1").is_err());

        // Connections opened after the kill are healthy.
        let conn2 = driver.connect(&StoreConfig::new("mock")).unwrap();
        assert!(!conn2.is_closed());
    }

    #[test]
    fn test_fail_matching() {
        let driver = MockDriver::new();
        driver.fail_matching("boom");
        let mut conn = driver.connect(&StoreConfig::new("mock")).unwrap();
        assert!(conn.execute("SELECT 1").is_ok());
        assert!(conn.execute("INSERT INTO boom VALUES (1)").is_err());
    }
}
