use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// Column name to value mapping used by INSERT and UPDATE
pub type Record = serde_json::Map<String, Value>;

/// Column name to comparator mapping used to scope UPDATE and SELECT
pub type Condition = BTreeMap<String, ConditionClause>;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Insert,
    Update,
    Select,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Insert => f.write_str("INSERT"),
            Command::Update => f.write_str("UPDATE"),
            Command::Select => f.write_str("SELECT"),
        }
    }
}

/// Condition comparator
///
/// Only equality is implemented. Any other operator string is kept verbatim so
/// the command can be rejected as a whole instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Unsupported(String),
}

impl Comparator {
    pub fn as_str(&self) -> &str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Unsupported(operator) => operator,
        }
    }
}

impl Serialize for Comparator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Comparator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let operator = String::deserialize(deserializer)?;
        if operator.eq_ignore_ascii_case("eq") {
            Ok(Comparator::Eq)
        } else {
            Ok(Comparator::Unsupported(operator))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionClause {
    pub operator: Comparator,
    pub value: Value,
}

impl ConditionClause {
    pub fn equals(value: impl Into<Value>) -> Self {
        Self {
            operator: Comparator::Eq,
            value: value.into(),
        }
    }
}

/// Logical command, the plaintext of the transport `message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandEnvelope {
    pub datacore: String,
    pub folder: String,
    pub command: Command,
    pub group: String,
    pub property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pageno: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordperpage: Option<String>,
}

/// 1-based page window for SELECT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Parses the string-encoded `pageno` / `recordperpage` pair
    pub fn parse(pageno: Option<&str>, recordperpage: Option<&str>) -> DomainResult<Self> {
        let number = parse_positive("pageno", pageno)?.unwrap_or(1);
        let size = parse_positive("recordperpage", recordperpage)?.unwrap_or(DEFAULT_PAGE_SIZE);

        if size > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidEnvelope(format!(
                "recordperpage must be at most {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self { number, size })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

fn parse_positive(name: &str, value: Option<&str>) -> DomainResult<Option<u32>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(DomainError::InvalidEnvelope(format!(
            "{} must be a positive integer, got {:?}",
            name, value
        ))),
    }
}

/// Splits the SELECT `fields` projection; an empty result means every column
pub fn parse_fields(fields: Option<&str>) -> Vec<String> {
    match fields.map(str::trim) {
        None | Some("") | Some("*") => Vec::new(),
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Rejects any comparator other than equality before the store sees the command
pub fn ensure_supported_operators(condition: &Condition) -> DomainResult<()> {
    for (column, clause) in condition {
        if let Comparator::Unsupported(operator) = &clause.operator {
            return Err(DomainError::UnsupportedOperator(format!(
                "{} on column {}",
                operator, column
            )));
        }
    }
    Ok(())
}

/// Unwraps values pre-quoted as SQL literals (`'ABC'` becomes `ABC`, and
/// `'O''Neil'` becomes `O'Neil`)
///
/// Some callers quote string values before encryption; values are always bound
/// as parameters, so the quotes are stripped rather than stored. Unquoted
/// values are left untouched.
pub fn strip_legacy_quotes(value: Value) -> Value {
    match value {
        Value::String(s) if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') => {
            Value::String(s[1..s.len() - 1].replace("''", "'"))
        }
        other => other,
    }
}

pub fn normalize_record(record: Record) -> Record {
    record
        .into_iter()
        .map(|(column, value)| (column, strip_legacy_quotes(value)))
        .collect()
}

pub fn normalize_condition(condition: Condition) -> Condition {
    condition
        .into_iter()
        .map(|(column, clause)| {
            (
                column,
                ConditionClause {
                    operator: clause.operator,
                    value: strip_legacy_quotes(clause.value),
                },
            )
        })
        .collect()
}
