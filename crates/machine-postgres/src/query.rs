use chrono::{DateTime, Utc};
use machine_domain::{
    parse_timestamp, Comparator, Condition, DomainError, DomainResult, Page, Record,
};
use serde_json::Value;
use tokio_postgres::types::ToSql;

use crate::folder_table::{Column, ColumnType, FolderTable};

/// Parameter value coerced to the type of its target column
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(Option<i64>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
}

impl SqlValue {
    pub fn as_param(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlValue::Integer(v) => v,
            SqlValue::Text(v) => v,
            SqlValue::Timestamp(v) => v,
        }
    }

    fn is_null(&self) -> bool {
        matches!(
            self,
            SqlValue::Integer(None) | SqlValue::Text(None) | SqlValue::Timestamp(None)
        )
    }
}

/// SQL text with `$n` placeholders and the values bound to them, in order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlFragment {
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(SqlValue::as_param).collect()
    }

    fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }
}

/// Coerces a JSON value to the column type; strings holding numbers or
/// timestamps are accepted since the wire carries most values as strings
pub fn coerce(column: &Column, value: &Value) -> DomainResult<SqlValue> {
    let invalid = |reason: &str| DomainError::InvalidValue {
        column: column.name.to_string(),
        reason: reason.to_string(),
    };

    match (column.kind, value) {
        (ColumnType::Integer, Value::Null) => Ok(SqlValue::Integer(None)),
        (ColumnType::Integer, Value::Number(n)) => n
            .as_i64()
            .map(|n| SqlValue::Integer(Some(n)))
            .ok_or_else(|| invalid("expected an integer")),
        (ColumnType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|n| SqlValue::Integer(Some(n)))
            .map_err(|_| invalid("expected an integer")),

        (ColumnType::Text, Value::Null) => Ok(SqlValue::Text(None)),
        (ColumnType::Text, Value::String(s)) => Ok(SqlValue::Text(Some(s.clone()))),
        (ColumnType::Text, Value::Number(n)) => Ok(SqlValue::Text(Some(n.to_string()))),
        (ColumnType::Text, Value::Bool(b)) => Ok(SqlValue::Text(Some(b.to_string()))),

        (ColumnType::Timestamp, Value::Null) => Ok(SqlValue::Timestamp(None)),
        (ColumnType::Timestamp, Value::String(s)) => parse_timestamp(s)
            .map(|at| SqlValue::Timestamp(Some(at)))
            .map_err(|_| invalid("expected a timestamp")),

        (ColumnType::Integer, _) => Err(invalid("expected an integer")),
        (ColumnType::Text, _) => Err(invalid("expected a scalar")),
        (ColumnType::Timestamp, _) => Err(invalid("expected a timestamp")),
    }
}

/// Validated assignments in table column order
fn assignments(
    table: &FolderTable,
    record: &Record,
) -> DomainResult<Vec<(&'static Column, SqlValue)>> {
    let mut assigned = record
        .iter()
        .map(|(name, value)| {
            let column = table.column(name)?;
            if !column.assignable {
                return Err(DomainError::InvalidValue {
                    column: column.name.to_string(),
                    reason: "column is read-only".to_string(),
                });
            }
            Ok((column, coerce(column, value)?))
        })
        .collect::<DomainResult<Vec<_>>>()?;

    assigned.sort_by_key(|(column, _)| table.position(column.name));

    // Lookup is case-insensitive, so `objecttype` and `ObjectType` collide
    if let Some(pair) = assigned.windows(2).find(|pair| pair[0].0.name == pair[1].0.name) {
        return Err(DomainError::InvalidValue {
            column: pair[0].0.name.to_string(),
            reason: "column is assigned more than once".to_string(),
        });
    }

    Ok(assigned)
}

/// Appends the condition as `AND`-joined equality comparisons
///
/// A null value compares with `IS NULL`. Any comparator other than equality
/// rejects the whole condition.
pub fn apply_condition(
    table: &FolderTable,
    condition: &Condition,
    fragment: &mut SqlFragment,
) -> DomainResult<String> {
    let mut clauses = Vec::with_capacity(condition.len());

    for (name, clause) in condition {
        let column = table.column(name)?;
        match &clause.operator {
            Comparator::Eq => {}
            Comparator::Unsupported(operator) => {
                return Err(DomainError::UnsupportedOperator(format!(
                    "{} on column {}",
                    operator, column.name
                )))
            }
        }

        let value = coerce(column, &clause.value)?;
        if value.is_null() {
            clauses.push(format!("{} IS NULL", column.name));
        } else {
            let placeholder = fragment.bind(value);
            clauses.push(format!("{} = {}", column.name, placeholder));
        }
    }

    Ok(clauses.join(" AND "))
}

/// Appends the record as a comma-separated `column = $n` assignment list
pub fn apply_record(
    table: &FolderTable,
    record: &Record,
    fragment: &mut SqlFragment,
) -> DomainResult<String> {
    let set = assignments(table, record)?
        .into_iter()
        .map(|(column, value)| format!("{} = {}", column.name, fragment.bind(value)))
        .collect::<Vec<_>>();

    Ok(set.join(", "))
}

pub fn insert_statement(table: &FolderTable, record: &Record) -> DomainResult<SqlFragment> {
    let mut fragment = SqlFragment::default();
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();

    for (column, value) in assignments(table, record)? {
        columns.push(column.name);
        placeholders.push(fragment.bind(value));
    }

    if columns.is_empty() {
        return Err(DomainError::InvalidEnvelope(
            "record must contain at least one column".to_string(),
        ));
    }

    fragment.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table.table,
        columns.join(", "),
        placeholders.join(", "),
        FolderTable::column_list(&table.all_columns())
    );
    Ok(fragment)
}

pub fn update_statement(
    table: &FolderTable,
    record: &Record,
    condition: &Condition,
) -> DomainResult<SqlFragment> {
    if condition.is_empty() {
        return Err(DomainError::InvalidEnvelope(
            "UPDATE requires a condition".to_string(),
        ));
    }

    let mut fragment = SqlFragment::default();
    let set = apply_record(table, record, &mut fragment)?;
    if set.is_empty() {
        return Err(DomainError::InvalidEnvelope(
            "record must contain at least one column".to_string(),
        ));
    }
    let filter = apply_condition(table, condition, &mut fragment)?;

    fragment.sql = format!(
        "UPDATE {} SET {}, updated_at = NOW() WHERE {}",
        table.table, set, filter
    );
    Ok(fragment)
}

/// SELECT statement plus the projected columns, in result order
#[derive(Debug)]
pub struct SelectStatement {
    pub fragment: SqlFragment,
    pub columns: Vec<&'static Column>,
}

pub fn select_statement(
    table: &FolderTable,
    fields: &[String],
    condition: &Condition,
    page: Page,
) -> DomainResult<SelectStatement> {
    let columns = if fields.is_empty() {
        table.all_columns()
    } else {
        fields
            .iter()
            .map(|name| table.column(name))
            .collect::<DomainResult<Vec<_>>>()?
    };

    let mut fragment = SqlFragment::default();
    let filter = apply_condition(table, condition, &mut fragment)?;

    let mut sql = format!(
        "SELECT {} FROM {}",
        FolderTable::column_list(&columns),
        table.table
    );
    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filter);
    }

    let limit = fragment.bind(SqlValue::Integer(Some(i64::from(page.size))));
    let offset = fragment.bind(SqlValue::Integer(Some(page.offset() as i64)));
    sql.push_str(&format!(" ORDER BY id LIMIT {} OFFSET {}", limit, offset));

    fragment.sql = sql;
    Ok(SelectStatement { fragment, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use machine_domain::{ConditionClause, Folder};
    use serde_json::json;

    fn machine_types() -> &'static FolderTable {
        FolderTable::for_folder(Folder::MachineType)
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_condition_on_id_binds_one_parameter() {
        let condition = Condition::from([("id".to_string(), ConditionClause::equals(5))]);
        let mut fragment = SqlFragment::default();

        let sql = apply_condition(machine_types(), &condition, &mut fragment).unwrap();

        assert_eq!(sql, "id = $1");
        assert_eq!(fragment.params, vec![SqlValue::Integer(Some(5))]);
    }

    #[test]
    fn test_condition_value_never_interpolated() {
        let condition = Condition::from([(
            "objecttype".to_string(),
            ConditionClause::equals("x' OR '1'='1"),
        )]);
        let mut fragment = SqlFragment::default();

        let sql = apply_condition(machine_types(), &condition, &mut fragment).unwrap();

        assert_eq!(sql, "objecttype = $1");
        assert_eq!(
            fragment.params,
            vec![SqlValue::Text(Some("x' OR '1'='1".to_string()))]
        );
    }

    #[test]
    fn test_condition_null_uses_is_null() {
        let condition = Condition::from([("description".to_string(), ConditionClause::equals(Value::Null))]);
        let mut fragment = SqlFragment::default();

        let sql = apply_condition(machine_types(), &condition, &mut fragment).unwrap();

        assert_eq!(sql, "description IS NULL");
        assert!(fragment.params.is_empty());
    }

    #[test]
    fn test_unsupported_operator_rejects_condition() {
        let condition = Condition::from([
            ("id".to_string(), ConditionClause::equals(1)),
            (
                "objecttype".to_string(),
                ConditionClause {
                    operator: Comparator::Unsupported("like".to_string()),
                    value: json!("A%"),
                },
            ),
        ]);
        let mut fragment = SqlFragment::default();

        let result = apply_condition(machine_types(), &condition, &mut fragment);
        assert!(matches!(result, Err(DomainError::UnsupportedOperator(_))));
    }

    #[test]
    fn test_unknown_condition_column() {
        let condition = Condition::from([("1=1 --".to_string(), ConditionClause::equals(1))]);
        let mut fragment = SqlFragment::default();

        let result = apply_condition(machine_types(), &condition, &mut fragment);
        assert!(matches!(result, Err(DomainError::UnknownColumn { .. })));
    }

    #[test]
    fn test_apply_record_binds_each_column() {
        let mut fragment = SqlFragment::default();
        let set = apply_record(
            machine_types(),
            &record(json!({"objecttype": "ABC", "active": "Y"})),
            &mut fragment,
        )
        .unwrap();

        assert_eq!(set, "objecttype = $1, active = $2");
        assert_eq!(
            fragment.params,
            vec![
                SqlValue::Text(Some("ABC".to_string())),
                SqlValue::Text(Some("Y".to_string()))
            ]
        );
    }

    #[test]
    fn test_record_cannot_assign_id() {
        let mut fragment = SqlFragment::default();
        let result = apply_record(machine_types(), &record(json!({"id": 3})), &mut fragment);
        assert!(matches!(result, Err(DomainError::InvalidValue { column, .. }) if column == "id"));
    }

    #[test]
    fn test_case_variant_duplicate_columns_rejected() {
        let duplicated = record(json!({"objecttype": "A", "ObjectType": "B"}));

        let insert = insert_statement(machine_types(), &duplicated);
        assert!(matches!(
            insert,
            Err(DomainError::InvalidValue { ref column, .. }) if column == "objecttype"
        ));

        let update = update_statement(
            machine_types(),
            &duplicated,
            &Condition::from([("id".to_string(), ConditionClause::equals(1))]),
        );
        assert!(matches!(update, Err(DomainError::InvalidValue { .. })));
    }

    #[test]
    fn test_update_statement_numbers_placeholders_across_fragments() {
        let statement = update_statement(
            machine_types(),
            &record(json!({"objecttype": "ABC", "description": "Test", "active": "Y"})),
            &Condition::from([("id".to_string(), ConditionClause::equals("1"))]),
        )
        .unwrap();

        assert_eq!(
            statement.sql,
            "UPDATE machine_types SET objecttype = $1, description = $2, active = $3, updated_at = NOW() WHERE id = $4"
        );
        assert_eq!(statement.params[3], SqlValue::Integer(Some(1)));
    }

    #[test]
    fn test_insert_statement() {
        let statement = insert_statement(
            FolderTable::for_folder(Folder::MachineGroup),
            &record(json!({"machinetypeid": "2", "groupname": "Press"})),
        )
        .unwrap();

        assert!(statement
            .sql
            .starts_with("INSERT INTO machine_groups (machinetypeid, groupname) VALUES ($1, $2) RETURNING id, "));
        assert_eq!(statement.params[0], SqlValue::Integer(Some(2)));
    }

    #[test]
    fn test_select_statement_with_projection_and_page() {
        let statement = select_statement(
            machine_types(),
            &["id".to_string(), "objecttype".to_string()],
            &Condition::from([("active".to_string(), ConditionClause::equals("Y"))]),
            Page { number: 3, size: 10 },
        )
        .unwrap();

        assert_eq!(
            statement.fragment.sql,
            "SELECT id, objecttype FROM machine_types WHERE active = $1 ORDER BY id LIMIT $2 OFFSET $3"
        );
        assert_eq!(statement.fragment.params[2], SqlValue::Integer(Some(20)));
        assert_eq!(statement.columns.len(), 2);
    }

    #[test]
    fn test_select_without_condition() {
        let statement =
            select_statement(machine_types(), &[], &Condition::new(), Page::default()).unwrap();

        assert_eq!(
            statement.fragment.sql,
            "SELECT id, objecttype, description, active, created_at, updated_at FROM machine_types ORDER BY id LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_coercion_failures() {
        let table = FolderTable::for_folder(Folder::MachineProductivity);

        let quantity = table.column("quantity").unwrap();
        assert!(matches!(
            coerce(quantity, &json!("lots")),
            Err(DomainError::InvalidValue { .. })
        ));
        assert_eq!(coerce(quantity, &json!(" 12 ")).unwrap(), SqlValue::Integer(Some(12)));

        let date = table.column("productiondate").unwrap();
        assert!(matches!(
            coerce(date, &json!("20240102030405")).unwrap(),
            SqlValue::Timestamp(Some(_))
        ));
        assert!(coerce(date, &json!(12)).is_err());
    }
}
