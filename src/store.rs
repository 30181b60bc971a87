//! Remote store seams
//!
//! The maintenance and provisioning flows only talk to the backend through
//! these two traits. `RestClient` implements both against PostgREST; tests
//! use in-memory doubles.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{EMPLOYEE_ID, EMPLOYEE_NAME, EMPLOYEE_SCORE};
use crate::error::StoreError;
use crate::name_pattern::NameFilter;

/// Opaque employee key. The backend may hand out uuids or integers; the id
/// is kept in its textual form and passed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "Value", into = "Value")]
pub struct EmployeeId {
    raw: String,
    numeric: bool,
}

impl EmployeeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            numeric: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<Value> for EmployeeId {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::new(s),
            Value::Number(n) => Self {
                raw: n.to_string(),
                numeric: true,
            },
            other => Self::new(other.to_string()),
        }
    }
}

impl From<EmployeeId> for Value {
    fn from(id: EmployeeId) -> Self {
        if id.numeric {
            if let Ok(n) = id.raw.parse::<i64>() {
                return Value::from(n);
            }
        }
        Value::String(id.raw)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Row of the `employees` table as selected by the tools
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Employee {
    pub id: EmployeeId,
    #[serde(rename = "nome_completo")]
    pub name: String,
    #[serde(rename = "pontuacao", default)]
    pub score: Option<i64>,
}

impl Employee {
    /// Null scores are shown as zero
    pub fn display_score(&self) -> i64 {
        self.score.unwrap_or(0)
    }
}

/// Column list for every employee select
pub fn employee_columns() -> String {
    format!("{},{},{}", EMPLOYEE_ID, EMPLOYEE_NAME, EMPLOYEE_SCORE)
}

/// Table reads and writes used by the record maintenance flow
pub trait EmployeeStore {
    /// Employees whose full name matches the filter, in backend order
    fn find_by_name(&self, filter: &NameFilter) -> Result<Vec<Employee>, StoreError>;

    /// Bulk delete every history row referencing any of `ids`
    fn delete_history(&self, ids: &[EmployeeId]) -> Result<(), StoreError>;

    /// Set the score of exactly one employee
    fn set_score(&self, id: &EmployeeId, score: i64) -> Result<(), StoreError>;

    fn fetch_by_ids(&self, ids: &[EmployeeId]) -> Result<Vec<Employee>, StoreError>;
}

/// Named remote procedure with a single text argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureCall {
    pub name: String,
    pub argument: String,
}

impl ProcedureCall {
    pub fn new(name: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
        }
    }
}

/// Arbitrary SQL execution through remote procedures
pub trait SqlGateway {
    /// Returns `StoreError::ProcedureUnavailable` when the backend does not
    /// know the procedure at all.
    fn execute(&self, call: &ProcedureCall, sql: &str) -> Result<(), StoreError>;
}

impl<T: EmployeeStore + ?Sized> EmployeeStore for &T {
    fn find_by_name(&self, filter: &NameFilter) -> Result<Vec<Employee>, StoreError> {
        (**self).find_by_name(filter)
    }

    fn delete_history(&self, ids: &[EmployeeId]) -> Result<(), StoreError> {
        (**self).delete_history(ids)
    }

    fn set_score(&self, id: &EmployeeId, score: i64) -> Result<(), StoreError> {
        (**self).set_score(id, score)
    }

    fn fetch_by_ids(&self, ids: &[EmployeeId]) -> Result<Vec<Employee>, StoreError> {
        (**self).fetch_by_ids(ids)
    }
}

impl<T: SqlGateway + ?Sized> SqlGateway for &T {
    fn execute(&self, call: &ProcedureCall, sql: &str) -> Result<(), StoreError> {
        (**self).execute(call, sql)
    }
}
