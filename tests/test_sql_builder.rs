//! Unit tests for the SqlBuilder query construction.

#![cfg(feature = "table")]

use wheel_scanner::SqlBuilder;

// ---------------------------------------------------------------------------
// Basic construction
// ---------------------------------------------------------------------------

#[test]
fn new_creates_select_star_from_table() {
    let (sql, params) = SqlBuilder::new("option_chain").build();
    assert_eq!(sql, "SELECT *\nFROM option_chain");
    assert!(params.is_empty());
}

#[test]
fn select_replaces_default_star() {
    let (sql, _) = SqlBuilder::new("option_chain")
        .select(&["symbol", "strike"])
        .build();
    assert!(sql.starts_with("SELECT symbol, strike\n"));
}

#[test]
fn distinct_adds_keyword() {
    let (sql, _) = SqlBuilder::new("option_chain")
        .select(&["expiration"])
        .distinct()
        .build();
    assert!(sql.starts_with("SELECT DISTINCT expiration"));
}

// ---------------------------------------------------------------------------
// WHERE conditions
// ---------------------------------------------------------------------------

#[test]
fn where_clause_binds_params() {
    let (sql, params) = SqlBuilder::new("option_chain")
        .where_clause("UPPER(underlying) = UPPER(?)", &["spy"])
        .build();
    assert!(sql.contains("WHERE UPPER(underlying) = UPPER(?)"));
    assert_eq!(params, vec!["spy"]);
}

#[test]
fn where_clauses_are_and_combined_in_order() {
    let (sql, params) = SqlBuilder::new("option_chain")
        .where_clause("CAST(expiration AS DATE) = CAST(? AS DATE)", &["2025-06-13"])
        .where_clause("LOWER(\"type\") = ?", &["put"])
        .build();
    assert!(sql.contains(
        "WHERE CAST(expiration AS DATE) = CAST(? AS DATE) AND LOWER(\"type\") = ?"
    ));
    assert_eq!(params, vec!["2025-06-13", "put"]);
}

#[test]
fn values_are_never_interpolated() {
    let hostile = "x'; DROP TABLE option_chain; --";
    let (sql, params) = SqlBuilder::new("option_chain")
        .where_clause("symbol = ?", &[hostile])
        .build();
    assert!(!sql.contains("DROP"));
    assert_eq!(params, vec![hostile]);
}

#[test]
fn condition_without_params_is_allowed() {
    let (sql, params) = SqlBuilder::new("option_chain")
        .where_clause("bid IS NOT NULL", &[])
        .build();
    assert!(sql.contains("WHERE bid IS NOT NULL"));
    assert!(params.is_empty());
}

// ---------------------------------------------------------------------------
// ORDER BY
// ---------------------------------------------------------------------------

#[test]
fn order_by_adds_clause() {
    let (sql, _) = SqlBuilder::new("option_chain")
        .order_by(&["expiration ASC", "strike DESC"])
        .build();
    assert!(sql.ends_with("ORDER BY expiration ASC, strike DESC"));
}

#[test]
fn clause_order_is_where_then_order_by() {
    let (sql, _) = SqlBuilder::new("option_chain")
        .order_by(&["strike ASC"])
        .where_clause("strike > ?", &["90"])
        .build();
    let where_pos = sql.find("WHERE").unwrap();
    let order_pos = sql.find("ORDER BY").unwrap();
    assert!(where_pos < order_pos);
}
