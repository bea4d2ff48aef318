//! Ordering of models so that referenced tables are created first.

use crate::TableRef;
use std::collections::HashSet;

/// Order tables so that every table comes after the tables it references.
///
/// Names without a model, and references to tables outside of `tables`,
/// impose no constraint. Tables caught in a reference cycle keep their
/// given order after everything that could be scheduled.
pub fn dependency_order<T: TableRef>(tables: &[T]) -> Vec<&T> {
    let names: HashSet<&str> = tables.iter().map(|t| t.table_name()).collect();
    let mut created: HashSet<&str> = HashSet::new();
    let mut scheduled = vec![false; tables.len()];
    let mut ordered: Vec<&T> = Vec::with_capacity(tables.len());

    // Keep sweeping until everything is scheduled or a sweep makes no progress
    while ordered.len() < tables.len() {
        let mut made_progress = false;

        for (i, table) in tables.iter().enumerate() {
            if scheduled[i] {
                continue;
            }

            let ready = match table.model() {
                Some(model) => model
                    .dependencies()
                    .all(|dep| created.contains(dep) || !names.contains(dep)),
                None => true,
            };
            if ready {
                created.insert(table.table_name());
                ordered.push(table);
                scheduled[i] = true;
                made_progress = true;
            }
        }

        if !made_progress {
            let stuck: Vec<&str> = tables
                .iter()
                .enumerate()
                .filter(|(i, _)| !scheduled[*i])
                .map(|(_, t)| t.table_name())
                .collect();
            tracing::warn!(tables = ?stuck, "reference cycle between tables, keeping declaration order");
            ordered.extend(
                tables
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !scheduled[*i])
                    .map(|(_, t)| t),
            );
            break;
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, DuckType, ForeignKey, Table};

    fn table(name: &str, references: &[&str]) -> Table {
        let mut table =
            Table::new(name).with_column(Column::new("id", DuckType::BigInt).primary_key());
        for target in references {
            let column = format!("{}_id", target);
            table = table
                .with_column(Column::new(column.clone(), DuckType::BigInt))
                .with_foreign_key(ForeignKey {
                    columns: vec![column],
                    references_table: target.to_string(),
                    references_columns: vec!["id".into()],
                });
        }
        table
    }

    fn names<T: TableRef>(ordered: Vec<&T>) -> Vec<&str> {
        ordered.into_iter().map(|t| t.table_name()).collect()
    }

    #[test]
    fn test_referenced_tables_come_first() {
        let tables = vec![
            table("comments", &["posts", "users"]),
            table("posts", &["users"]),
            table("users", &[]),
        ];
        assert_eq!(
            names(dependency_order(&tables)),
            vec!["users", "posts", "comments"]
        );
    }

    #[test]
    fn test_independent_tables_keep_their_order() {
        let tables = vec![table("b", &[]), table("a", &[]), table("c", &["a"])];
        assert_eq!(names(dependency_order(&tables)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_external_and_self_references_are_ignored() {
        let tables = vec![table("category", &["category", "shops"])];
        assert_eq!(names(dependency_order(&tables)), vec!["category"]);
    }

    #[test]
    fn test_cycle_keeps_declaration_order() {
        let tables = vec![table("x", &["y"]), table("y", &["x"]), table("z", &[])];
        assert_eq!(names(dependency_order(&tables)), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_bare_names_are_left_alone() {
        let tables = ["b", "a"];
        assert_eq!(names(dependency_order(&tables)), vec!["b", "a"]);
    }
}
