//! End-to-end: statement text -> Session -> rendered output, on a temp root.

use tabstore_core::Config;
use tabstore_sql::{render, Session, SqlError};
use tempfile::TempDir;

fn session() -> (Session, TempDir) {
    let dir = TempDir::new().unwrap();
    let session = Session::new(Config::ephemeral(dir.path())).unwrap();
    (session, dir)
}

/// Run a script and return the rendered output of its last statement.
fn script(session: &mut Session, lines: &[&str]) -> String {
    let mut last = String::new();
    for line in lines {
        let outcome = session.run(line).unwrap_or_else(|e| panic!("{} failed: {}", line, e));
        last = render(&outcome);
    }
    last
}

#[test]
fn test_select_renders_schema_order() {
    let (mut s, _dir) = session();
    let out = script(
        &mut s,
        &[
            "CREATE DATABASE shop;",
            "USE shop;",
            "CREATE TABLE users (id INT PRIMARY KEY, name TEXT NOT NULL, city TEXT);",
            "INSERT INTO users (city, name) VALUES ('Paris', 'Ann');",
            "INSERT INTO users (city, name) VALUES ('Lyon', 'Bob');",
            "SELECT * FROM users ORDER BY name DESC;",
        ],
    );
    let expected = "\
+----+------+-------+
| id | name | city  |
+----+------+-------+
| 2  | Bob  | Lyon  |
| 1  | Ann  | Paris |
+----+------+-------+
";
    assert_eq!(out, expected);
}

#[test]
fn test_like_and_or_through_parser() {
    let (mut s, _dir) = session();
    script(
        &mut s,
        &[
            "CREATE DATABASE d",
            "USE d",
            "CREATE TABLE t (id INT PRIMARY KEY, city TEXT)",
            "INSERT INTO t (city) VALUES ('Paris')",
            "INSERT INTO t (city) VALUES ('Lyon')",
            "INSERT INTO t (city) VALUES ('Pau')",
        ],
    );
    assert_eq!(script(&mut s, &["SELECT COUNT(*) FROM t WHERE city LIKE 'Pa%'"]), "2\n");
    assert_eq!(
        script(&mut s, &["SELECT COUNT(*) FROM t WHERE city = 'Lyon' OR city = 'Pau'"]),
        "2\n"
    );
    assert_eq!(
        script(&mut s, &["SELECT COUNT(*) FROM t WHERE city LIKE 'P%' AND city LIKE '%s'"]),
        "1\n"
    );
}

#[test]
fn test_aggregate_formatting() {
    let (mut s, _dir) = session();
    script(
        &mut s,
        &[
            "CREATE DATABASE d",
            "USE d",
            "CREATE TABLE scores (id INT PRIMARY KEY, points INT)",
            "INSERT INTO scores (points) VALUES (3)",
            "INSERT INTO scores (points) VALUES (4)",
        ],
    );
    assert_eq!(script(&mut s, &["SELECT SUM(points) FROM scores"]), "7.00\n");
    assert_eq!(script(&mut s, &["SELECT AVG(points) FROM scores"]), "3.50\n");
    assert_eq!(script(&mut s, &["SELECT AVG(points) FROM scores WHERE id = 99"]), "0.00\n");

    let err = s.run("SELECT SUM(*) FROM scores").unwrap_err();
    assert!(matches!(err, SqlError::Engine(tabstore_core::Error::AggregateType { .. })));
}

#[test]
fn test_mutations_report_counts() {
    let (mut s, _dir) = session();
    script(
        &mut s,
        &[
            "CREATE DATABASE d",
            "USE d",
            "CREATE TABLE t (id INT PRIMARY KEY, tag TEXT)",
            "INSERT INTO t (tag) VALUES ('a')",
            "INSERT INTO t (tag) VALUES ('a')",
        ],
    );
    assert_eq!(script(&mut s, &["UPDATE t SET tag = 'b' WHERE tag = 'a'"]), "2 row(s) updated.\n");
    assert_eq!(script(&mut s, &["DELETE FROM t WHERE tag = 'zzz'"]), "0 row(s) deleted.\n");
    assert_eq!(script(&mut s, &["DELETE FROM t WHERE id = 1"]), "1 row(s) deleted.\n");

    let out = script(&mut s, &["DELETE FROM t WHERE id = 2", "SELECT * FROM t"]);
    assert!(out.contains("(no rows)"));
}

#[test]
fn test_front_end_rejections() {
    let (mut s, _dir) = session();
    script(&mut s, &["CREATE DATABASE d", "USE d", "CREATE TABLE t (id INT PRIMARY KEY)"]);

    assert_eq!(s.run("DELETE FROM t"), Err(SqlError::MissingWhere("DELETE")));
    assert_eq!(s.run("SELECT * FROM t LIMIT -3"), Err(SqlError::InvalidLimit(-3)));
    assert!(matches!(s.run("SELEKT * FROM t"), Err(SqlError::Parse { position: 0, .. })));
    assert!(matches!(
        s.run("SELECT * FROM t WHERE zip = 1"),
        Err(SqlError::Engine(tabstore_core::Error::UnknownColumn { .. }))
    ));
}

#[test]
fn test_drop_table_and_database() {
    let (mut s, dir) = session();
    script(&mut s, &["CREATE DATABASE d", "USE d", "CREATE TABLE t (id INT PRIMARY KEY)"]);
    assert!(dir.path().join("d").join("t.tbl").exists());

    script(&mut s, &["DROP TABLE t"]);
    assert!(!dir.path().join("d").join("t.tbl").exists());

    script(&mut s, &["DROP DATABASE d"]);
    assert!(!dir.path().join("d").exists());
    assert_eq!(s.run("SHOW TABLES"), Err(SqlError::NoActiveDatabase));
}
