//! Query executor - steps prepared statements, retrying while the database is busy

use rusqlite::{CachedStatement, Connection, ErrorCode, Row, ToSql};

use crate::{Error, Result};

/// Execute a cached statement and decode every row it yields.
///
/// Each pass binds `bindings` and steps the statement to completion. A
/// `SQLITE_BUSY` step restarts the pass immediately, without backoff and
/// without a retry limit; rows decoded by an interrupted pass are dropped.
/// Any other failure is returned as [`Error::Query`].
///
/// The statement is consumed: dropping it hands it back to the connection's
/// statement cache with its bindings cleared.
pub fn query<T, F>(
    mut stmt: CachedStatement<'_>,
    bindings: &[&dyn ToSql],
    mut decode: F,
) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut retries: u64 = 0;
    loop {
        match step_all(&mut stmt, bindings, &mut decode) {
            Err(err) if is_busy(&err) => {
                retries += 1;
                tracing::trace!("database busy, retrying (attempt {})", retries);
            }
            Err(err) => return Err(Error::Query(err)),
            Ok(rows) => {
                if retries > 0 {
                    tracing::debug!("statement completed after {} busy retries", retries);
                }
                return Ok(rows);
            }
        }
    }
}

/// Execute a statement that returns no rows (inserts).
pub fn execute(stmt: CachedStatement<'_>, bindings: &[&dyn ToSql]) -> Result<()> {
    query(stmt, bindings, |_| Ok(())).map(|_| ())
}

fn step_all<T, F>(
    stmt: &mut CachedStatement<'_>,
    bindings: &[&dyn ToSql],
    decode: &mut F,
) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut rows = stmt.query(bindings)?;
    let mut decoded = Vec::new();
    while let Some(row) = rows.next()? {
        decoded.push(decode(row)?);
    }
    Ok(decoded)
}

/// Run a statement-less engine call (BEGIN, COMMIT), retrying while busy.
pub fn retry_busy<T>(mut call: impl FnMut() -> rusqlite::Result<T>) -> Result<T> {
    loop {
        match call() {
            Err(err) if is_busy(&err) => tracing::trace!("database busy, retrying"),
            other => return other.map_err(Error::Query),
        }
    }
}

/// Run `body` inside an immediate transaction.
///
/// The transaction commits when `body` succeeds and rolls back otherwise,
/// so either every write in `body` lands or none does.
pub fn transaction<T>(conn: &Connection, body: impl FnOnce() -> Result<T>) -> Result<T> {
    retry_busy(|| conn.execute_batch("BEGIN IMMEDIATE"))?;

    let outcome = body().and_then(|value| {
        retry_busy(|| conn.execute_batch("COMMIT"))?;
        Ok(value)
    });

    if outcome.is_err() && !conn.is_autocommit() {
        if let Err(err) = conn.execute_batch("ROLLBACK") {
            tracing::warn!("rollback failed: {}", err);
        }
    }
    outcome
}

/// True when the engine reported a transient lock conflict.
pub fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::DatabaseBusy
    )
}

/// Turn a UNIQUE constraint failure on an insert into [`Error::DuplicateName`].
pub fn map_duplicate(err: Error, name: &str) -> Error {
    match err {
        Error::Query(source @ rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateName {
                name: name.to_string(),
                source,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn scratch() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE items (name TEXT UNIQUE NOT NULL, n INTEGER)", [])
            .unwrap();
        conn
    }

    #[test]
    fn test_insert_then_select() {
        let conn = scratch();
        let insert = "INSERT INTO items (name, n) VALUES (?1, ?2)";
        execute(conn.prepare_cached(insert).unwrap(), params!["a", 1]).unwrap();
        execute(conn.prepare_cached(insert).unwrap(), params!["b", 2]).unwrap();

        let rows = query(
            conn.prepare_cached("SELECT name, n FROM items ORDER BY n").unwrap(),
            params![],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .unwrap();
        assert_eq!(rows, vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn test_no_rows_is_empty() {
        let conn = scratch();
        let rows = query(
            conn.prepare_cached("SELECT n FROM items WHERE name = ?1").unwrap(),
            params!["missing"],
            |row| row.get::<_, i64>(0),
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unique_violation_maps_to_duplicate() {
        let conn = scratch();
        let insert = "INSERT INTO items (name, n) VALUES (?1, ?2)";
        execute(conn.prepare_cached(insert).unwrap(), params!["a", 1]).unwrap();

        let err = execute(conn.prepare_cached(insert).unwrap(), params!["a", 2]).unwrap_err();
        let err = map_duplicate(err, "a");
        assert!(matches!(err, Error::DuplicateName { ref name, .. } if name == "a"));
    }

    #[test]
    fn test_other_failures_stay_query_errors() {
        let conn = scratch();
        let err = execute(
            conn.prepare_cached("INSERT INTO items (name, n) VALUES (?1, ?2)").unwrap(),
            params![rusqlite::types::Null, 1],
        )
        .unwrap_err();
        let err = map_duplicate(err, "nothing");
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let conn = scratch();
        let insert = "INSERT INTO items (name, n) VALUES (?1, ?2)";

        let result: Result<()> = transaction(&conn, || {
            execute(conn.prepare_cached(insert)?, params!["first", 1])?;
            execute(conn.prepare_cached(insert)?, params!["first", 2])
        });
        assert!(result.is_err());
        assert!(conn.is_autocommit());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        transaction(&conn, || execute(conn.prepare_cached(insert)?, params!["second", 3]))
            .unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_busy_writer_is_retried() {
        use std::sync::mpsc;
        use std::time::Duration;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("busy.sqlite");

        let writer = Connection::open(&path).unwrap();
        writer
            .execute("CREATE TABLE items (name TEXT UNIQUE NOT NULL, n INTEGER)", [])
            .unwrap();

        let (prepared_tx, prepared_rx) = mpsc::channel();
        let (locked_tx, locked_rx) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let conn = Connection::open(&path).unwrap();
            conn.busy_timeout(Duration::ZERO).unwrap();
            let stmt = conn
                .prepare_cached("INSERT INTO items (name, n) VALUES (?1, ?2)")
                .unwrap();
            prepared_tx.send(()).unwrap();
            locked_rx.recv().unwrap();

            execute(stmt, params!["late", 7]).unwrap();
            conn.query_row("SELECT n FROM items WHERE name = 'late'", [], |row| {
                row.get::<_, i64>(0)
            })
            .unwrap()
        });

        prepared_rx.recv().unwrap();
        writer.execute_batch("BEGIN EXCLUSIVE").unwrap();
        locked_tx.send(()).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        writer.execute_batch("COMMIT").unwrap();

        assert_eq!(handle.join().unwrap(), 7);
    }
}
