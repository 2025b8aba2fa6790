//! Batched row insertion.

use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::driver::{Connection, SqlValue};
use crate::error::{BridgeError, Result};
use crate::meta::{ColumnDef, RelationDef};
use crate::sql::StatementGenerator;
use crate::store::{wrap_driver, Store};

use super::{TransferListener, TransferReport};

enum StreamConn<'a> {
    /// The store's shared connection, borrowed per submit under its lock.
    /// Used on single-writer stores; its commit mode is never touched.
    Shared(&'a Store),
    /// A connection owned by this stream for its whole lifetime.
    Dedicated {
        conn: Box<dyn Connection>,
        restore_auto_commit: bool,
    },
}

/// Writes rows to one relation in logical batches with a commit cadence.
///
/// Rows accumulate until `batch_size` is reached, then the batch is
/// submitted (driver batch execute when supported, bound statements
/// otherwise, literal statements when the driver cannot bind at all).
/// Every `commit_interval` batches a commit is issued. [`close`](Self::close)
/// flushes, commits, and releases the connection on every exit path.
pub struct InsertStream<'a> {
    store: &'a Store,
    relation: RelationDef,
    sql: String,
    columns: Vec<ColumnDef>,
    use_batch: bool,
    use_binding: bool,
    conn: StreamConn<'a>,
    pending: Vec<Vec<SqlValue>>,
    batch_size: usize,
    commit_interval: usize,
    batches_since_commit: usize,
    listener: TransferListener,
    closed: bool,
}

impl<'a> InsertStream<'a> {
    /// Open an insert stream into the given relation.
    ///
    /// On a store with a writer-concurrency limit of 1 the stream shares
    /// the store's connection; otherwise it opens a dedicated one and turns
    /// its auto-commit off for the duration of the load.
    pub fn open(store: &'a Store, relation: &RelationDef) -> Result<InsertStream<'a>> {
        let caps = store.capabilities();
        let generator = StatementGenerator::new(store.config());
        let columns: Vec<ColumnDef> = generator
            .insert_columns(relation)
            .into_iter()
            .cloned()
            .collect();
        let sql = generator.insert(relation)?;

        let use_binding = caps.parameter_binding;
        let use_batch = caps.batch_execute && use_binding;
        if !use_binding {
            debug!(
                "driver for store {} cannot bind parameters, using literal statements",
                store.name()
            );
        }

        let conn = if store.writer_limit() <= 1 {
            debug!(
                "store {} is single-writer, sharing the store connection",
                store.name()
            );
            StreamConn::Shared(store)
        } else {
            let mut conn = store.open_dedicated_connection()?;
            conn.set_auto_commit(false)?;
            StreamConn::Dedicated {
                conn,
                restore_auto_commit: true,
            }
        };

        Ok(InsertStream {
            store,
            relation: relation.clone(),
            sql,
            columns,
            use_batch,
            use_binding,
            conn,
            pending: Vec::new(),
            batch_size: store.config().batch_size.max(1),
            commit_interval: store.config().commit_interval.max(1),
            batches_since_commit: 0,
            listener: TransferListener::new(),
            closed: false,
        })
    }

    /// The transfer counts so far. Valid after a failure too: committed
    /// rows reported here are durable.
    pub fn listener(&self) -> &TransferListener {
        &self.listener
    }

    /// Queue one row, aligned to the relation's insertable columns. Each
    /// value is coerced (extension hook first) and checked against its
    /// column's type. Submits a batch when the size threshold is reached.
    pub fn insert(&mut self, row: Vec<SqlValue>) -> Result<()> {
        if self.closed {
            return Err(BridgeError::State(
                "insert stream is closed".to_string(),
            ));
        }
        if row.len() != self.columns.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "row has {} values but {} takes {} insertable columns",
                row.len(),
                self.relation.full_name(),
                self.columns.len()
            )));
        }

        let ext = self.store.extension().cloned();
        let mut coerced = Vec::with_capacity(row.len());
        for (value, col) in row.into_iter().zip(&self.columns) {
            let value = match &ext {
                Some(e) => e.coerce_for_load(&col.sql_type, value)?,
                None => value,
            };
            coerced.push(value.cast_to(col.sql_type.host)?);
        }

        self.pending.push(coerced);
        if self.pending.len() >= self.batch_size {
            self.submit()?;
        }
        Ok(())
    }

    /// Force submission and commit of everything queued, without waiting
    /// for the size threshold. Needed for dependent loads where a parent
    /// must be durable before its children reference it.
    pub fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Err(BridgeError::State(
                "insert stream is closed".to_string(),
            ));
        }
        self.submit()?;
        self.commit()
    }

    /// Flush remaining rows, perform a final commit, and release the
    /// connection. The connection's commit mode is restored and a dedicated
    /// connection is closed even when the flush fails.
    pub fn close(&mut self) -> Result<TransferReport> {
        if self.closed {
            return Ok(self.listener.report());
        }
        self.closed = true;
        let flushed = self.submit().and_then(|()| self.commit());
        let released = self.release();
        flushed?;
        released?;
        Ok(self.listener.report())
    }

    fn submit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let rows = std::mem::take(&mut self.pending);
        let count = rows.len();

        let sql = &self.sql;
        let relation = &self.relation;
        let config = self.store.config();
        let use_batch = self.use_batch;
        let use_binding = self.use_binding;
        let result = match &mut self.conn {
            StreamConn::Dedicated { conn, .. } => submit_rows(
                conn.as_mut(),
                use_batch,
                use_binding,
                sql,
                config,
                relation,
                &rows,
            ),
            StreamConn::Shared(store) => store.with_connection(|conn| {
                submit_rows(conn, use_batch, use_binding, sql, config, relation, &rows)
            }),
        };
        if let Err(e) = result {
            self.listener.record_error(&e);
            return Err(e);
        }

        self.listener.record_batch(count as u64);
        self.batches_since_commit += 1;
        debug!(
            "submitted batch of {} rows to {} ({} total)",
            count,
            self.relation.full_name(),
            self.listener.rows_submitted()
        );
        if self.batches_since_commit >= self.commit_interval {
            self.commit()?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let result = match &mut self.conn {
            StreamConn::Dedicated { conn, .. } => conn.commit(),
            StreamConn::Shared(store) => store.with_connection(|conn| conn.commit()),
        };
        if let Err(e) = result {
            self.listener.record_error(&e);
            return Err(wrap_driver(e, &self.sql, &self.relation.location));
        }
        self.listener.record_commit();
        self.batches_since_commit = 0;
        debug!(
            "committed {} rows to {}",
            self.listener.rows_committed(),
            self.relation.full_name()
        );
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if let StreamConn::Dedicated {
            conn,
            restore_auto_commit,
        } = &mut self.conn
        {
            let restored = if *restore_auto_commit {
                *restore_auto_commit = false;
                conn.set_auto_commit(true)
            } else {
                Ok(())
            };
            let closed = conn.close();
            restored.and(closed)
        } else {
            Ok(())
        }
    }
}

impl Drop for InsertStream<'_> {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "insert stream for {} dropped without close, releasing connection",
                self.relation.full_name()
            );
            self.closed = true;
            if let Err(e) = self.release() {
                warn!("releasing dropped insert stream failed: {e}");
            }
        }
    }
}

/// Submit one logical batch over whichever execution strategy the driver
/// supports. Errors carry the exact statement text and target location.
fn submit_rows(
    conn: &mut dyn Connection,
    use_batch: bool,
    use_binding: bool,
    sql: &str,
    config: &StoreConfig,
    relation: &RelationDef,
    rows: &[Vec<SqlValue>],
) -> Result<()> {
    if use_batch {
        conn.execute_batch(sql, rows)
            .map_err(|e| wrap_driver(e, sql, &relation.location))?;
        return Ok(());
    }
    if use_binding {
        for row in rows {
            conn.execute_bound(sql, row)
                .map_err(|e| wrap_driver(e, sql, &relation.location))?;
        }
        return Ok(());
    }
    let generator = StatementGenerator::new(config);
    for row in rows {
        let literal = generator.insert_literal(relation, row)?;
        conn.execute(&literal)
            .map_err(|e| wrap_driver(e, &literal, &relation.location))?;
    }
    Ok(())
}
