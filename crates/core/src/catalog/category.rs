use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::Category;
use crate::error::{is_unique_violation, Error, Result};

/// Look up a category id by exact name.
pub fn find(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Return the id of the category called `name`, inserting it if absent.
///
/// Must run on the same transaction as the item insert that depends on it. A
/// concurrent creator winning the race surfaces as `CategoryConflict`.
pub fn resolve_or_create(conn: &Connection, name: &str) -> Result<i64> {
    if let Some(id) = find(conn, name)? {
        tracing::debug!(category = %name, category_id = id, "reusing category");
        return Ok(id);
    }

    match conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name]) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(Error::CategoryConflict(name.to_string())),
        Err(e) => return Err(e.into()),
    }
    let id = conn.last_insert_rowid();
    tracing::debug!(category = %name, category_id = id, "created category");
    Ok(id)
}

pub fn list(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema;

    fn make_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn test_resolve_creates_then_reuses() {
        let conn = make_conn();
        let first = resolve_or_create(&conn, "fashion").unwrap();
        let second = resolve_or_create(&conn, "fashion").unwrap();
        assert_eq!(first, second);
        assert_eq!(list(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_distinct_names_get_distinct_ids() {
        let conn = make_conn();
        let a = resolve_or_create(&conn, "fashion").unwrap();
        let b = resolve_or_create(&conn, "food").unwrap();
        assert_ne!(a, b);
        let names: Vec<String> = list(&conn).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["fashion", "food"]);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let conn = make_conn();
        let lower = resolve_or_create(&conn, "toys").unwrap();
        let upper = resolve_or_create(&conn, "Toys").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_find_missing() {
        let conn = make_conn();
        assert!(find(&conn, "nothing").unwrap().is_none());
    }

    #[test]
    fn test_insert_race_becomes_conflict() {
        // Simulate the losing side of a race: the row appears between lookup and insert.
        let conn = make_conn();
        conn.execute_batch(
            "CREATE TEMP TRIGGER sneak BEFORE INSERT ON categories
             WHEN NEW.name = 'contested'
              AND NOT EXISTS (SELECT 1 FROM categories WHERE name = 'contested')
             BEGIN
                 INSERT INTO categories (name) VALUES ('contested');
             END;",
        )
        .unwrap();

        let err = resolve_or_create(&conn, "contested").unwrap_err();
        assert!(matches!(err, Error::CategoryConflict(ref n) if n == "contested"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_insert_failures_stay_storage_errors() {
        let conn = make_conn();
        conn.execute_batch(
            "CREATE TEMP TRIGGER refuse BEFORE INSERT ON categories
             BEGIN
                 SELECT RAISE(ABORT, 'refused');
             END;",
        )
        .unwrap();
        let err = resolve_or_create(&conn, "anything").unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(!err.is_retryable());
    }
}
