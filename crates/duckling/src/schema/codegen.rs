use std::borrow::Cow;

use super::{Schema, Table};
use crate::reorder::dependency_order;
use crate::schema::{
    comment_on_column_sql, create_index_sql, create_sequence_sql, create_table_sql, in_schema,
};
use duckling_config::Config;

/// Generate SQL to create all sequences, tables, indices and comments.
///
/// Returns a complete SQL script that can be executed to create the schema.
/// Foreign keys are declared inside CREATE TABLE, so tables are emitted with
/// referenced tables first. Unqualified tables are placed in
/// `config.schema` when it is set.
pub fn schema_to_sql(schema: &Schema, config: &Config) -> String {
    let placed: Vec<Cow<'_, Table>> = schema
        .tables
        .values()
        .map(|t| in_schema(t, config.schema.as_deref()))
        .collect();
    let tables: Vec<&Table> = placed.iter().map(|t| t.as_ref()).collect();
    let ordered: Vec<&Table> = if config.ignore_relationships {
        tables.clone()
    } else {
        dependency_order(&tables).into_iter().copied().collect()
    };

    let mut sql = String::new();

    // Sequences first, table defaults refer to them
    for table in &ordered {
        for col in table.auto_increment_columns() {
            sql.push_str(&create_sequence_sql(table, col));
            sql.push_str(";\n");
        }
    }
    if ordered.iter().any(|t| t.auto_increment_columns().next().is_some()) {
        sql.push('\n');
    }

    for table in &ordered {
        sql.push_str(&create_table_sql(table, config));
        sql.push_str(";\n\n");
    }

    if !config.inline_indexes {
        for table in &ordered {
            for idx in &table.indices {
                sql.push_str(&create_index_sql(table, idx));
                sql.push_str(";\n");
            }
        }
        if ordered.iter().any(|t| !t.indices.is_empty()) {
            sql.push('\n');
        }
    }

    for table in &ordered {
        for col in &table.columns {
            if let Some(comment) = col.comment_text() {
                sql.push_str(&comment_on_column_sql(&table.name, &col.name, Some(comment)));
                sql.push_str(";\n");
            }
        }
    }

    sql.trim_end().to_string()
}
