//! Tests for the connection manager's query contract
//! Run with: cargo test --test manager_test

use serde_json::{json, Value};
use slotdb::{Bindings, ConnectionManager, DbError, FetchMode, MemoryLogger, QueryOutput, Settings};
use std::sync::Arc;

fn memory_manager() -> (ConnectionManager, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::new());
    let manager = ConnectionManager::connect(Settings::memory(), Some(logger.clone())).unwrap();
    manager
        .query(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER)",
            &Bindings::None,
            FetchMode::Assoc,
            false,
        )
        .unwrap();
    (manager, logger)
}

fn insert_user(manager: &ConnectionManager, name: &str, age: i64) -> QueryOutput {
    manager
        .query(
            "INSERT INTO users (name, age) VALUES (?, ?)",
            &Bindings::from(vec![json!(name), json!(age)]),
            FetchMode::Assoc,
            false,
        )
        .unwrap()
}

mod connect_tests {
    use super::*;

    #[test]
    fn test_missing_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::sqlite(dir.path().to_string_lossy(), "fresh");
        let path = settings.database_path();
        assert!(!path.exists());

        let manager = ConnectionManager::connect(settings, None).unwrap();
        assert!(path.exists());

        manager
            .query("CREATE TABLE t (v TEXT)", &Bindings::None, FetchMode::Assoc, false)
            .unwrap();
        let out = manager
            .query("INSERT INTO t (v) VALUES ('x')", &Bindings::None, FetchMode::Assoc, false)
            .unwrap();
        assert_eq!(out, QueryOutput::Affected(1));
    }

    #[test]
    fn test_existing_database_rows_keep_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::sqlite(dir.path().to_string_lossy(), "shop");
        {
            let manager = ConnectionManager::connect(settings.clone(), None).unwrap();
            manager
                .execute("CREATE TABLE items (sku TEXT, price REAL, qty INTEGER)", &Bindings::None)
                .unwrap();
            manager
                .execute("INSERT INTO items VALUES ('a-1', 9.5, 3)", &Bindings::None)
                .unwrap();
        }

        let manager = ConnectionManager::connect(settings, None).unwrap();
        let rows = manager
            .query("SELECT qty, sku, price FROM items", &Bindings::None, FetchMode::Assoc, false)
            .unwrap()
            .into_rows()
            .unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["qty", "sku", "price"]);
        assert_eq!(rows[0], json!({"qty": 3, "sku": "a-1", "price": 9.5}));
    }

    #[test]
    fn test_unreachable_server_fails_with_logged_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no").join("such").join("dir");
        let logger = Arc::new(MemoryLogger::new());
        let settings = Settings::sqlite(missing.to_string_lossy(), "app");

        let err = ConnectionManager::connect(settings, Some(logger.clone())).unwrap_err();
        assert!(matches!(err, DbError::ConnectionFailed { ref database, .. } if database == "app"));

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "Could not connect to the database app");
        assert!(records[1].is_error);
    }

    #[test]
    fn test_unsupported_driver() {
        let mut settings = Settings::memory();
        settings.driver = "pgsql".to_string();
        let err = ConnectionManager::connect(settings, None).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedDriver(_)));
    }

    #[test]
    fn test_charset_applied_on_creation() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::sqlite(dir.path().to_string_lossy(), "wide").with_charset("utf16le");
        let manager = ConnectionManager::connect(settings, None).unwrap();
        manager.execute("CREATE TABLE t (v TEXT)", &Bindings::None).unwrap();
        let rows = manager
            .select("PRAGMA encoding", &Bindings::None, FetchMode::Column)
            .unwrap();
        assert_eq!(rows, vec![json!("UTF-16le")]);
    }
}

mod verb_shape_tests {
    use super::*;

    #[test]
    fn test_insert_returns_count_and_last_insert_id() {
        let (manager, _) = memory_manager();
        assert_eq!(manager.last_insert_id().unwrap(), None);

        assert_eq!(insert_user(&manager, "ada", 36), QueryOutput::Affected(1));
        assert_eq!(manager.last_insert_id().unwrap(), Some(1));

        let out = manager
            .query(
                "INSERT INTO users (name, age) VALUES ('bob', 20), ('cy', 30)",
                &Bindings::None,
                FetchMode::Assoc,
                false,
            )
            .unwrap();
        assert_eq!(out.affected(), Some(2));
        assert_eq!(manager.last_insert_id().unwrap(), Some(3));
    }

    #[test]
    fn test_update_matching_nothing_returns_zero() {
        // Zero rows matched is a normal result, not an error
        let (manager, logger) = memory_manager();
        insert_user(&manager, "ada", 36);
        let out = manager
            .query(
                "UPDATE users SET age = 1 WHERE id = ?",
                &Bindings::from(vec![json!(999)]),
                FetchMode::Assoc,
                false,
            )
            .unwrap();
        assert_eq!(out, QueryOutput::Affected(0));
        assert!(logger.is_empty());
    }

    #[test]
    fn test_delete_returns_removed_rows() {
        let (manager, _) = memory_manager();
        for (name, age) in [("a", 10), ("b", 20), ("c", 30)] {
            insert_user(&manager, name, age);
        }
        let out = manager
            .query("DELETE FROM users WHERE age >= 20", &Bindings::None, FetchMode::Assoc, false)
            .unwrap();
        assert_eq!(out, QueryOutput::Affected(2));
    }

    #[test]
    fn test_leading_with_yields_nothing() {
        let (manager, _) = memory_manager();
        insert_user(&manager, "ada", 36);
        let sql = "WITH adults AS (SELECT * FROM users WHERE age > 18) SELECT name FROM adults";

        let out = manager.query(sql, &Bindings::None, FetchMode::Assoc, false).unwrap();
        assert!(out.is_nothing());

        let rows = manager.select(sql, &Bindings::None, FetchMode::Assoc).unwrap();
        assert_eq!(rows, vec![json!({"name": "ada"})]);
    }

    #[test]
    fn test_ddl_yields_nothing() {
        let (manager, _) = memory_manager();
        insert_user(&manager, "ada", 36);
        let out = manager
            .query("CREATE INDEX users_age ON users (age)", &Bindings::None, FetchMode::Assoc, false)
            .unwrap();
        assert_eq!(out, QueryOutput::Nothing);
        assert_eq!(manager.execute("DROP INDEX users_age", &Bindings::None).unwrap(), 0);
    }

    #[test]
    fn test_lowercase_and_padded_select() {
        let (manager, _) = memory_manager();
        insert_user(&manager, "ada", 36);
        let out = manager
            .query("   select name from users  ", &Bindings::None, FetchMode::Num, false)
            .unwrap();
        assert_eq!(out, QueryOutput::Rows(vec![json!(["ada"])]));
    }

    #[test]
    fn test_named_bindings() {
        let (manager, _) = memory_manager();
        insert_user(&manager, "ada", 36);
        insert_user(&manager, "bob", 12);
        let mut named = serde_json::Map::new();
        named.insert("min".into(), json!(18));
        let rows = manager
            .query(
                "SELECT name FROM users WHERE age > :min",
                &Bindings::Named(named),
                FetchMode::Column,
                false,
            )
            .unwrap();
        assert_eq!(rows, QueryOutput::Rows(vec![json!("ada")]));
    }

    #[test]
    fn test_into_json() {
        assert_eq!(QueryOutput::Affected(4).into_json(), json!(4));
        assert_eq!(QueryOutput::Nothing.into_json(), Value::Null);
        assert_eq!(QueryOutput::Rows(vec![]).into_json(), json!([]));
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_execute_failure_is_returned_and_logged() {
        let (manager, logger) = memory_manager();
        let err = manager
            .query(
                "INSERT INTO users (name) VALUES (?)",
                &Bindings::from(vec![Value::Null]),
                FetchMode::Assoc,
                false,
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Execute { .. }));

        let messages = logger.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("query failed: "));
    }

    #[test]
    fn test_prepare_failure_logs_error_then_sql() {
        let (manager, logger) = memory_manager();
        let err = manager
            .query("SELECT * FROM nowhere", &Bindings::None, FetchMode::Assoc, false)
            .unwrap_err();
        assert!(matches!(err, DbError::Prepare { .. }));

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_error);
        assert_eq!(records[1].text, "SELECT * FROM nowhere");
    }

    #[test]
    fn test_no_logger_is_silent() {
        let manager = ConnectionManager::connect(Settings::memory(), None).unwrap();
        let err = manager
            .query("SELEC 1", &Bindings::None, FetchMode::Assoc, false)
            .unwrap_err();
        assert!(matches!(err, DbError::Prepare { .. }));
    }

    fn assert_binding_rejected(manager: &ConnectionManager, logger: &MemoryLogger, sql: &str, bindings: Bindings) {
        let err = manager
            .query(sql, &bindings, FetchMode::Assoc, false)
            .unwrap_err();
        assert!(matches!(err, DbError::Execute { .. }), "unexpected error: {:?}", err);

        let messages = logger.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("query failed: "));
    }

    #[test]
    fn test_too_few_positional_values() {
        let (manager, logger) = memory_manager();
        assert_binding_rejected(
            &manager,
            &logger,
            "INSERT INTO users (name, age) VALUES (?, ?)",
            Bindings::from(vec![json!("ada")]),
        );
        assert!(manager.table().exists("users").unwrap());
        let rows = manager
            .select("SELECT COUNT(*) FROM users", &Bindings::None, FetchMode::Column)
            .unwrap();
        assert_eq!(rows, vec![json!(0)]);
    }

    #[test]
    fn test_too_many_positional_values() {
        let (manager, logger) = memory_manager();
        assert_binding_rejected(
            &manager,
            &logger,
            "INSERT INTO users (name, age) VALUES (?, ?)",
            Bindings::from(vec![json!("ada"), json!(36), json!("extra")]),
        );
    }

    #[test]
    fn test_missing_named_key() {
        let (manager, logger) = memory_manager();
        let mut named = serde_json::Map::new();
        named.insert("name".into(), json!("ada"));
        assert_binding_rejected(
            &manager,
            &logger,
            "INSERT INTO users (name, age) VALUES (:name, :age)",
            Bindings::Named(named),
        );
    }

    #[test]
    fn test_placeholders_without_bindings() {
        let (manager, logger) = memory_manager();
        insert_user(&manager, "ada", 36);
        assert_binding_rejected(
            &manager,
            &logger,
            "SELECT * FROM users WHERE name = ?",
            Bindings::None,
        );
    }
}

mod introspection_tests {
    use super::*;

    #[test]
    fn test_last_statement_and_debug_dump() {
        let (manager, _) = memory_manager();
        let bindings = Bindings::from(vec![json!("ada"), json!(36)]);
        manager
            .query("INSERT INTO users (name, age) VALUES (?, ?)", &bindings, FetchMode::Assoc, true)
            .unwrap();
        assert_eq!(
            manager.last_statement().unwrap().as_deref(),
            Some("INSERT INTO users (name, age) VALUES (?, ?)")
        );

        let dump = manager
            .debug_dump_params("SELECT * FROM users WHERE name = ?", &Bindings::from(vec![json!("ada")]))
            .unwrap();
        assert!(dump.starts_with("SQL: [34] SELECT * FROM users WHERE name = ?"));
        assert!(dump.contains("Params:  1"));
        assert!(dump.contains("Value: \"ada\""));
    }

    #[test]
    fn test_table_helper() {
        let (manager, _) = memory_manager();
        manager
            .execute("CREATE TABLE audit (at TEXT DEFAULT CURRENT_TIMESTAMP)", &Bindings::None)
            .unwrap();
        let table = manager.table();

        assert_eq!(table.names().unwrap(), vec!["audit".to_string(), "users".to_string()]);
        assert!(table.exists("users").unwrap());
        assert!(!table.exists("ghosts").unwrap());

        let columns = table.columns("users").unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "age"]);
        assert_eq!(columns[0].pk, 1);
        assert!(columns[1].notnull);
        assert_eq!(columns[2].col_type, "INTEGER");

        let audit = table.columns("audit").unwrap();
        assert_eq!(audit[0].dflt_value.as_deref(), Some("CURRENT_TIMESTAMP"));

        let sql = table.create_sql("audit").unwrap().unwrap();
        assert!(sql.starts_with("CREATE TABLE audit"));
        assert_eq!(table.create_sql("ghosts").unwrap(), None);
    }
}
