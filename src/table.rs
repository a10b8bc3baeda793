//! Tabular chain source backed by an in-memory DuckDB table.
//!
//! Loads an exported option chain (CSV, newline-delimited JSON or Parquet)
//! into the `option_chain` table and serves it as flat [`ChainRow`]s, one
//! expiration at a time. The table schema is introspected on load so that
//! single-ticker exports without an `underlying` column, or per-kind exports
//! without a `type` column, still work.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use duckdb::{types::ValueRef, Connection as DuckDbConnection};

use crate::error::{Result, ScanError};
use crate::models::{ChainRow, OptionType, RawContract};
use crate::normalizer::parse_expiration;
use crate::scanner::ExpirationSource;
use crate::sql_builder::SqlBuilder;

pub const CHAIN_TABLE: &str = "option_chain";

/// Expiration as a plain `YYYY-MM-DD` string, whether the column was
/// detected as DATE, TIMESTAMP, TIMESTAMPTZ or VARCHAR.
const EXPIRATION_AS_DATE_TEXT: &str = "CAST(CAST(expiration AS DATE) AS VARCHAR) AS expiration";

/// Columns the table must provide.
const REQUIRED_COLUMNS: [&str; 3] = ["symbol", "strike", "expiration"];

pub struct ChainTable {
    conn: DuckDbConnection,
    columns: RefCell<HashSet<String>>,
}

impl ChainTable {
    /// Open an empty in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self {
            conn,
            columns: RefCell::new(HashSet::new()),
        })
    }

    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.load(path.as_ref(), "read_csv_auto('{}', header=true)")
    }

    pub fn load_ndjson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.load(path.as_ref(), "read_json_auto('{}', format='newline_delimited')")
    }

    pub fn load_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.load(path.as_ref(), "read_parquet('{}')")
    }

    /// Replace the chain table with the contents of `path`, read by `reader`
    /// (a table function template with one `{}` slot for the path).
    fn load(&self, path: &Path, reader: &str) -> Result<()> {
        if !path.exists() {
            return Err(ScanError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("chain file not found: {}", path.display()),
            )));
        }
        // Forward slashes and doubled quotes for DuckDB string literals
        let path_str = path.to_string_lossy().replace('\\', "/").replace('\'', "''");
        let source = reader.replace("{}", &path_str);
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM {}",
            CHAIN_TABLE, source
        ))?;

        let columns = self.describe()?;
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains(**c)) {
            return Err(ScanError::InvalidArgument(format!(
                "chain file {} has no '{}' column",
                path.display(),
                missing
            )));
        }
        tracing::debug!(path = %path.display(), columns = columns.len(), "loaded chain table");
        *self.columns.borrow_mut() = columns;
        Ok(())
    }

    fn describe(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT column_name FROM (DESCRIBE {})",
            CHAIN_TABLE
        ))?;
        let mut rows = stmt.query([])?;
        let mut columns = HashSet::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            columns.insert(name.to_lowercase());
        }
        Ok(columns)
    }

    pub fn is_loaded(&self) -> bool {
        !self.columns.borrow().is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.borrow().contains(&name.to_lowercase())
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(ScanError::InvalidArgument("no chain file loaded".into()))
        }
    }

    /// Restrict a query to one underlying when the table carries several.
    fn scope_to_ticker(&self, qb: &mut SqlBuilder, ticker: &str) {
        if self.has_column("underlying") {
            qb.where_clause("UPPER(underlying) = UPPER(?)", &[ticker]);
        }
    }

    /// Execute SQL and return rows as column-name maps.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        // Column metadata is only available after execution
        let column_names: Vec<String> = match rows.as_ref() {
            Some(s) => s.column_names().into_iter().map(|s| s.to_string()).collect(),
            None => Vec::new(),
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = HashMap::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                map.insert(name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }
        Ok(out)
    }

    /// Distinct expirations for `ticker`, ascending.
    pub fn expiration_dates(&self, ticker: &str) -> Result<Vec<NaiveDate>> {
        self.ensure_loaded()?;
        let mut qb = SqlBuilder::new(CHAIN_TABLE);
        qb.select(&[EXPIRATION_AS_DATE_TEXT]).distinct();
        self.scope_to_ticker(&mut qb, ticker);
        let (sql, params) = qb.build();

        let mut dates = Vec::new();
        for row in self.execute(&sql, &params)? {
            match row.get("expiration").and_then(|v| v.as_str()) {
                Some(s) => match parse_expiration(s) {
                    Ok(d) => dates.push(d),
                    Err(e) => tracing::warn!(value = s, error = %e, "ignoring expiration"),
                },
                None => continue,
            }
        }
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    /// First expiration on or after `as_of`.
    pub fn nearest_expiration(&self, ticker: &str, as_of: NaiveDate) -> Result<Option<NaiveDate>> {
        Ok(self
            .expiration_dates(ticker)?
            .into_iter()
            .find(|d| *d >= as_of))
    }

    /// Rows for one expiration and kind.
    pub fn rows(
        &self,
        ticker: &str,
        option_type: OptionType,
        expiration: NaiveDate,
    ) -> Result<Vec<Result<ChainRow>>> {
        self.ensure_loaded()?;
        let has_type = self.has_column("type");
        let expiration_str = expiration.to_string();

        let mut qb = SqlBuilder::new(CHAIN_TABLE);
        qb.select(&["* REPLACE (CAST(CAST(expiration AS DATE) AS VARCHAR) AS expiration)"])
            .where_clause("CAST(expiration AS DATE) = CAST(? AS DATE)", &[expiration_str.as_str()]);
        if has_type {
            qb.where_clause("LOWER(\"type\") = ?", &[option_type.as_str()]);
        }
        self.scope_to_ticker(&mut qb, ticker);
        qb.order_by(&["strike ASC"]);
        let (sql, params) = qb.build();

        let rows = self
            .execute(&sql, &params)?
            .into_iter()
            .map(|row| {
                let value = serde_json::Value::Object(row.into_iter().collect());
                let mut parsed: ChainRow = serde_json::from_value(value)
                    .map_err(|e| ScanError::Parse(format!("chain row: {}", e)))?;
                if !has_type {
                    parsed.option_type = Some(option_type.as_str().to_string());
                }
                Ok(parsed)
            })
            .collect();
        Ok(rows)
    }
}

impl ExpirationSource for ChainTable {
    fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>> {
        self.expiration_dates(ticker)
    }

    fn contracts(
        &self,
        ticker: &str,
        option_type: OptionType,
        expiration: NaiveDate,
    ) -> Result<Vec<Result<RawContract>>> {
        Ok(self
            .rows(ticker, option_type, expiration)?
            .into_iter()
            .map(|r| r.map(RawContract::Row))
            .collect())
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    use serde_json::Value;
    match val {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(n) => Value::Number(n.into()),
        ValueRef::SmallInt(n) => Value::Number(n.into()),
        ValueRef::Int(n) => Value::Number(n.into()),
        ValueRef::BigInt(n) => Value::Number(n.into()),
        ValueRef::UTinyInt(n) => Value::Number(n.into()),
        ValueRef::USmallInt(n) => Value::Number(n.into()),
        ValueRef::UInt(n) => Value::Number(n.into()),
        ValueRef::UBigInt(n) => Value::Number(n.into()),
        ValueRef::HugeInt(n) => i64::try_from(n)
            .map(|i| Value::Number(i.into()))
            .unwrap_or_else(|_| Value::String(n.to_string())),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).to_string()),
        // Dates arrive pre-cast to VARCHAR; anything else is not part of a chain row
        _ => Value::Null,
    }
}
