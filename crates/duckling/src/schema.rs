//! Schema definition and DDL generation.
//!
//! Every builder here returns a single statement without a trailing
//! semicolon, ready for `TracedConn::execute`. [`SchemaCodegen::to_sql`]
//! joins them into a full script.
//!
//! ## Example
//!
//! ```ignore
//! use duckling::Table;
//! use facet::Facet;
//!
//! #[derive(Facet)]
//! #[facet(duckling::table = "users")]
//! pub struct User {
//!     #[facet(duckling::pk)]
//!     pub id: i64,
//!
//!     #[facet(duckling::unique)]
//!     pub email: String,
//!
//!     pub name: String,
//! }
//!
//! let sql = duckling::schema::create_table_sql(&Table::of::<User>()?, &Default::default());
//! ```

pub mod codegen;

use std::borrow::Cow;

use duckling_config::Config;
use duckling_sql::{Lit, qualify, quote_ident, quote_qualified, sequence_name, split_qualified};

pub use duckling_schema::{
    CheckConstraint, Column, Constraint, DuckType, ForeignKey, Index, Schema, SourceLocation,
    Table, TableDef, UniqueConstraint, collect_schema,
};

/// Extension trait for Schema to add SQL generation.
pub trait SchemaCodegen {
    /// Generate SQL to create all sequences, tables, indices and comments.
    fn to_sql(&self, config: &Config) -> String;
}

impl SchemaCodegen for Schema {
    fn to_sql(&self, config: &Config) -> String {
        codegen::schema_to_sql(self, config)
    }
}

/// The table as it is created in `schema`.
///
/// Unqualified table names, and unqualified foreign key targets, are
/// placed in `schema`. Tables that already name a schema, or any table
/// when `schema` is `None`, are borrowed unchanged.
pub fn in_schema<'t>(table: &'t Table, schema: Option<&str>) -> Cow<'t, Table> {
    let Some(schema) = schema else {
        return Cow::Borrowed(table);
    };
    if split_qualified(&table.name).0.is_some() {
        return Cow::Borrowed(table);
    }

    let mut placed = table.clone();
    placed.name = qualify(&table.name, Some(schema));
    for fk in &mut placed.foreign_keys {
        fk.references_table = qualify(&fk.references_table, Some(schema));
    }
    Cow::Owned(placed)
}

/// The column's type, as written in DDL.
pub fn data_type_of(column: &Column) -> String {
    column.sql_type.to_string()
}

/// The column's type followed by ` NOT NULL` and ` DEFAULT ...` as needed.
///
/// Auto-increment columns default to `nextval()` of their sequence.
pub fn full_data_type_of(table: &Table, column: &Column) -> String {
    let mut def = data_type_of(column);
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = column_default(table, column) {
        def.push_str(" DEFAULT ");
        def.push_str(&default);
    }
    def
}

/// The default expression of a column, including sequence defaults.
pub fn column_default(table: &Table, column: &Column) -> Option<String> {
    if column.auto_increment {
        let seq = sequence_name(&table.name, &column.name);
        return Some(format!("nextval({})", Lit(seq)));
    }
    column.default.clone()
}

/// Generate CREATE SEQUENCE SQL for an auto-increment column.
pub fn create_sequence_sql(table: &Table, column: &Column) -> String {
    format!(
        "CREATE SEQUENCE IF NOT EXISTS {} START 1",
        quote_qualified(&sequence_name(&table.name, &column.name))
    )
}

/// Generate DROP SEQUENCE SQL for an auto-increment column.
pub fn drop_sequence_sql(table: &Table, column: &Column) -> String {
    format!(
        "DROP SEQUENCE IF EXISTS {}",
        quote_qualified(&sequence_name(&table.name, &column.name))
    )
}

/// Generate CREATE TABLE SQL statement.
///
/// Foreign keys are declared inline, so referenced tables must exist first.
/// Indices are only part of the statement when `config.inline_indexes` is set.
pub fn create_table_sql(table: &Table, config: &Config) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", quote_qualified(&table.name));

    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|col| format!("    {} {}", quote_ident(&col.name), full_data_type_of(table, col)))
        .collect();

    // A raw sql_type may already carry its own PRIMARY KEY
    let inline_pk = table.columns.iter().any(|c| {
        matches!(&c.sql_type, DuckType::Custom(sql) if sql.to_uppercase().contains("PRIMARY KEY"))
    });
    let pk_columns: Vec<String> = table
        .primary_key_columns()
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect();
    if !inline_pk && !pk_columns.is_empty() {
        parts.push(format!("    PRIMARY KEY ({})", pk_columns.join(", ")));
    }

    if config.inline_indexes {
        for idx in &table.indices {
            parts.push(format!("    {}", inline_index_sql(idx)));
        }
    }

    if config.emit_foreign_keys() {
        for fk in &table.foreign_keys {
            parts.push(format!("    {}", foreign_key_sql(table, fk)));
        }
    }

    for unique in table.unique_constraints() {
        parts.push(format!(
            "    CONSTRAINT {} UNIQUE ({})",
            quote_ident(&unique.name),
            quote_ident(&unique.column)
        ));
    }

    for check in &table.check_constraints {
        parts.push(format!(
            "    CONSTRAINT {} CHECK ({})",
            quote_ident(&check.name),
            check.expr
        ));
    }

    sql.push_str(&parts.join(",\n"));
    sql.push_str("\n)");

    if let Some(options) = config.table_options.as_deref().filter(|o| !o.is_empty()) {
        sql.push(' ');
        sql.push_str(options);
    }

    sql
}

/// The `CONSTRAINT ... FOREIGN KEY ... REFERENCES ...` clause for a foreign key.
pub fn foreign_key_sql(table: &Table, fk: &ForeignKey) -> String {
    let quoted_cols: Vec<_> = fk.columns.iter().map(|c| quote_ident(c)).collect();
    let quoted_ref_cols: Vec<_> = fk.references_columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
        quote_ident(&table.foreign_key_name(fk)),
        quoted_cols.join(", "),
        quote_qualified(&fk.references_table),
        quoted_ref_cols.join(", ")
    )
}

/// The index clause used inside CREATE TABLE.
pub fn inline_index_sql(idx: &Index) -> String {
    let quoted_cols: Vec<_> = idx.columns.iter().map(|c| quote_ident(c)).collect();
    let mut sql = String::new();
    if let Some(class) = idx.class() {
        sql.push_str(class);
        sql.push(' ');
    }
    sql.push_str(&format!("INDEX {} ({})", quote_ident(&idx.name), quoted_cols.join(", ")));
    if let Some(comment) = &idx.comment {
        sql.push_str(&format!(" COMMENT {}", Lit(comment)));
    }
    if let Some(option) = &idx.option {
        sql.push(' ');
        sql.push_str(option);
    }
    sql
}

/// Generate CREATE INDEX SQL statement for a given index.
pub fn create_index_sql(table: &Table, idx: &Index) -> String {
    let class = idx.class().map(|c| format!("{} ", c)).unwrap_or_default();
    let quoted_cols: Vec<_> = idx.columns.iter().map(|c| quote_ident(c)).collect();
    let target = match &idx.using {
        Some(method) => format!("USING {}({})", method, quoted_cols.join(", ")),
        None => format!("({})", quoted_cols.join(", ")),
    };
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} {}",
        class,
        quote_ident(&idx.name),
        quote_qualified(&table.name),
        target
    )
}

/// Generate DROP INDEX SQL. Indexes live in the schema of their table.
pub fn drop_index_sql(table: &str, name: &str) -> String {
    let qualified = match split_qualified(table) {
        (Some(schema), _) => format!("{}.{}", quote_ident(schema), quote_ident(name)),
        (None, _) => quote_ident(name),
    };
    format!("DROP INDEX IF EXISTS {}", qualified)
}

/// Generate COMMENT ON COLUMN SQL. `None` clears the comment.
pub fn comment_on_column_sql(table: &str, column: &str, comment: Option<&str>) -> String {
    let value = comment.map(|c| Lit(c).to_string()).unwrap_or_else(|| "NULL".into());
    format!(
        "COMMENT ON COLUMN {}.{} IS {}",
        quote_qualified(table),
        quote_ident(column),
        value
    )
}

/// Generate ADD COLUMN SQL.
///
/// DuckDB rejects constraints on added columns, so only the type and the
/// default are part of the statement.
pub fn add_column_sql(table: &Table, column: &Column) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_qualified(&table.name),
        quote_ident(&column.name),
        data_type_of(column)
    );
    if let Some(default) = column_default(table, column) {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default);
    }
    sql
}

/// Generate ALTER COLUMN ... TYPE SQL.
pub fn alter_column_type_sql(table: &str, column: &Column) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
        quote_qualified(table),
        quote_ident(&column.name),
        data_type_of(column)
    )
}

/// Generate ALTER COLUMN ... SET/DROP NOT NULL SQL.
pub fn set_not_null_sql(table: &str, column: &str, not_null: bool) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
        quote_qualified(table),
        quote_ident(column),
        if not_null { "SET" } else { "DROP" }
    )
}

/// Generate DROP COLUMN SQL.
pub fn drop_column_sql(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_qualified(table),
        quote_ident(column)
    )
}

/// Generate RENAME COLUMN SQL.
pub fn rename_column_sql(table: &str, from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        quote_qualified(table),
        quote_ident(from),
        quote_ident(to)
    )
}

/// Generate RENAME TO SQL. The new name never carries a schema.
pub fn rename_table_sql(from: &str, to: &str) -> String {
    let (_, to) = split_qualified(to);
    format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_qualified(from),
        quote_ident(to)
    )
}

/// Generate DROP TABLE SQL.
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", quote_qualified(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", DuckType::BigInt).primary_key().auto_increment())
            .with_column(Column::new("email", DuckType::Varchar(Some(255))).unique())
            .with_column(Column::new("name", DuckType::Varchar(None)).nullable())
            .with_column(
                Column::new("created_at", DuckType::TimestampTz).with_default("current_timestamp"),
            )
            .with_column(Column::new("tenant_id", DuckType::BigInt))
            .with_foreign_key(ForeignKey {
                columns: vec!["tenant_id".into()],
                references_table: "tenants".into(),
                references_columns: vec!["id".into()],
            })
            .with_index(Index::new("idx_users_name", vec!["name".into()]))
            .with_check(Some("chk_users_email"), "email <> ''")
    }

    #[test]
    fn test_full_data_type_of() {
        let table = users();
        assert_eq!(
            full_data_type_of(&table, &table.columns[0]),
            "BIGINT NOT NULL DEFAULT nextval('users_id_seq')"
        );
        assert_eq!(full_data_type_of(&table, &table.columns[2]), "VARCHAR");
        assert_eq!(
            full_data_type_of(&table, &table.columns[3]),
            "TIMESTAMPTZ NOT NULL DEFAULT current_timestamp"
        );
    }

    #[test]
    fn snapshot_create_table() {
        insta::assert_snapshot!(create_table_sql(&users(), &Config::default()), @r#"
        CREATE TABLE "users" (
            "id" BIGINT NOT NULL DEFAULT nextval('users_id_seq'),
            "email" VARCHAR(255) NOT NULL,
            "name" VARCHAR,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT current_timestamp,
            "tenant_id" BIGINT NOT NULL,
            PRIMARY KEY ("id"),
            CONSTRAINT "fk_users_tenant_id" FOREIGN KEY ("tenant_id") REFERENCES "tenants"("id"),
            CONSTRAINT "uni_users_email" UNIQUE ("email"),
            CONSTRAINT "chk_users_email" CHECK (email <> '')
        )
        "#);
    }

    #[test]
    fn snapshot_create_table_inline_indexes_without_foreign_keys() {
        let config = Config {
            inline_indexes: true,
            disable_foreign_keys: true,
            table_options: Some("WITH (storage = 'row')".into()),
            ..Config::default()
        };
        let mut table = users();
        table.indices[0].comment = Some("by name".into());
        insta::assert_snapshot!(create_table_sql(&table, &config), @r#"
        CREATE TABLE "users" (
            "id" BIGINT NOT NULL DEFAULT nextval('users_id_seq'),
            "email" VARCHAR(255) NOT NULL,
            "name" VARCHAR,
            "created_at" TIMESTAMPTZ NOT NULL DEFAULT current_timestamp,
            "tenant_id" BIGINT NOT NULL,
            PRIMARY KEY ("id"),
            INDEX "idx_users_name" ("name") COMMENT 'by name',
            CONSTRAINT "uni_users_email" UNIQUE ("email"),
            CONSTRAINT "chk_users_email" CHECK (email <> '')
        ) WITH (storage = 'row')
        "#);
    }

    #[test]
    fn test_custom_primary_key_type_skips_table_constraint() {
        let table = Table::new("kv")
            .with_column(
                Column::new("k", DuckType::Custom("VARCHAR PRIMARY KEY".into())).primary_key(),
            )
            .with_column(Column::new("v", DuckType::Blob).nullable());
        assert_eq!(
            create_table_sql(&table, &Config::default()),
            "CREATE TABLE \"kv\" (\n    \"k\" VARCHAR PRIMARY KEY NOT NULL,\n    \"v\" BLOB\n)"
        );
    }

    #[test]
    fn test_create_index_sql() {
        let table = users();
        assert_eq!(
            create_index_sql(&table, &table.indices[0]),
            "CREATE INDEX IF NOT EXISTS \"idx_users_name\" ON \"users\" (\"name\")"
        );

        let unique = Index::new("uq_users_name_email", vec!["name".into(), "email".into()]).unique();
        assert_eq!(
            create_index_sql(&table, &unique),
            "CREATE UNIQUE INDEX IF NOT EXISTS \"uq_users_name_email\" ON \"users\" (\"name\", \"email\")"
        );

        let mut hnsw = Index::new("idx_items_embedding", vec!["embedding".into()]);
        hnsw.using = Some("HNSW".into());
        assert_eq!(
            create_index_sql(&Table::new("app.items"), &hnsw),
            "CREATE INDEX IF NOT EXISTS \"idx_items_embedding\" ON \"app\".\"items\" USING HNSW(\"embedding\")"
        );
    }

    #[test]
    fn test_in_schema() {
        let table = users();
        assert!(matches!(in_schema(&table, None), Cow::Borrowed(_)));

        let placed = in_schema(&table, Some("crm"));
        assert_eq!(placed.name, "crm.users");
        assert_eq!(placed.foreign_keys[0].references_table, "crm.tenants");
        assert_eq!(placed.indices[0].name, "idx_users_name");
        assert_eq!(placed.unique_constraints()[0].name, "uni_users_email");

        let pinned = Table::new("raw.users");
        assert_eq!(in_schema(&pinned, Some("crm")).name, "raw.users");
    }

    #[test]
    fn test_sequences() {
        let table = Table::new("app.users")
            .with_column(Column::new("id", DuckType::BigInt).primary_key().auto_increment());
        assert_eq!(
            create_sequence_sql(&table, &table.columns[0]),
            "CREATE SEQUENCE IF NOT EXISTS \"app\".\"users_id_seq\" START 1"
        );
        assert_eq!(
            drop_sequence_sql(&table, &table.columns[0]),
            "DROP SEQUENCE IF EXISTS \"app\".\"users_id_seq\""
        );
        assert_eq!(
            full_data_type_of(&table, &table.columns[0]),
            "BIGINT NOT NULL DEFAULT nextval('app.users_id_seq')"
        );
    }

    #[test]
    fn test_alter_statements() {
        let table = users();
        let age = Column::new("age", DuckType::Integer).with_default("0");
        assert_eq!(
            add_column_sql(&table, &age),
            "ALTER TABLE \"users\" ADD COLUMN \"age\" INTEGER DEFAULT 0"
        );
        assert_eq!(
            alter_column_type_sql("users", &age),
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" TYPE INTEGER"
        );
        assert_eq!(
            set_not_null_sql("users", "age", true),
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" SET NOT NULL"
        );
        assert_eq!(
            set_not_null_sql("users", "age", false),
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" DROP NOT NULL"
        );
        assert_eq!(
            drop_column_sql("users", "age"),
            "ALTER TABLE \"users\" DROP COLUMN \"age\""
        );
        assert_eq!(
            rename_column_sql("users", "name", "full_name"),
            "ALTER TABLE \"users\" RENAME COLUMN \"name\" TO \"full_name\""
        );
        assert_eq!(
            rename_table_sql("app.users", "app.members"),
            "ALTER TABLE \"app\".\"users\" RENAME TO \"members\""
        );
        assert_eq!(
            drop_table_sql("users"),
            "DROP TABLE IF EXISTS \"users\" CASCADE"
        );
        assert_eq!(
            drop_index_sql("app.users", "idx_users_name"),
            "DROP INDEX IF EXISTS \"app\".\"idx_users_name\""
        );
    }

    #[test]
    fn test_comment_on_column_sql() {
        assert_eq!(
            comment_on_column_sql("users", "name", Some("the user's name")),
            "COMMENT ON COLUMN \"users\".\"name\" IS 'the user''s name'"
        );
        assert_eq!(
            comment_on_column_sql("users", "name", None),
            "COMMENT ON COLUMN \"users\".\"name\" IS NULL"
        );
    }
}
