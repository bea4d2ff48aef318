//! SQL text helpers for DuckDB.
//!
//! Quoting, schema-qualified names, and the naming conventions used for
//! indices, constraints and auto-increment sequences.

/// A DuckDB string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use duckling_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A DuckDB identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use duckling_sql::Ident;
/// assert_eq!(format!("{}", Ident("order")), "\"order\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Escape a string literal for SQL.
pub fn escape_string(s: &str) -> String {
    format!("{}", Lit(s))
}

/// Quote a single identifier.
///
/// Always quotes, so reserved words like `order` or `group` are safe as
/// column names.
pub fn quote_ident(name: &str) -> String {
    format!("{}", Ident(name))
}

/// Split `schema.table` into its parts.
///
/// Only a single dot is treated as a qualifier; anything else is returned
/// as an unqualified name.
///
/// ```
/// use duckling_sql::split_qualified;
/// assert_eq!(split_qualified("main.users"), (Some("main"), "users"));
/// assert_eq!(split_qualified("users"), (None, "users"));
/// ```
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(schema), Some(table), None) if !schema.is_empty() && !table.is_empty() => {
            (Some(schema), table)
        }
        _ => (None, name),
    }
}

/// Quote a possibly schema-qualified name.
///
/// ```
/// use duckling_sql::quote_qualified;
/// assert_eq!(quote_qualified("analytics.events"), "\"analytics\".\"events\"");
/// assert_eq!(quote_qualified("events"), "\"events\"");
/// ```
pub fn quote_qualified(name: &str) -> String {
    match split_qualified(name) {
        (Some(schema), table) => format!("{}.{}", Ident(schema), Ident(table)),
        (None, table) => quote_ident(table),
    }
}

/// Place an unqualified name in `schema`. Qualified names, and any name
/// when `schema` is `None`, are returned unchanged.
///
/// ```
/// use duckling_sql::qualify;
/// assert_eq!(qualify("users", Some("analytics")), "analytics.users");
/// assert_eq!(qualify("main.users", Some("analytics")), "main.users");
/// assert_eq!(qualify("users", None), "users");
/// ```
pub fn qualify(name: &str, schema: Option<&str>) -> String {
    match (schema, split_qualified(name)) {
        (Some(schema), (None, bare)) => format!("{}.{}", schema, bare),
        _ => name.to_string(),
    }
}

/// Table name with any schema qualifier removed.
fn bare_table(table: &str) -> &str {
    split_qualified(table).1
}

/// Generate a standard index name for a table and columns.
///
/// ```
/// assert_eq!(duckling_sql::index_name("user", &["email"]), "idx_user_email");
/// assert_eq!(duckling_sql::index_name("post", &["author_id", "created_at"]), "idx_post_author_id_created_at");
/// ```
pub fn index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("idx_{}_{}", bare_table(table), cols.join("_"))
}

/// Generate a standard unique index name for a table and columns.
///
/// ```
/// assert_eq!(duckling_sql::unique_index_name("category", &["shop_id", "handle"]), "uq_category_shop_id_handle");
/// ```
pub fn unique_index_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("uq_{}_{}", bare_table(table), cols.join("_"))
}

/// Name of the inline UNIQUE constraint for a single column.
///
/// ```
/// assert_eq!(duckling_sql::unique_constraint_name("users", "email"), "uni_users_email");
/// ```
pub fn unique_constraint_name(table: &str, column: &str) -> String {
    format!("uni_{}_{}", bare_table(table), column)
}

/// Name of a foreign key constraint.
///
/// ```
/// assert_eq!(duckling_sql::foreign_key_name("posts", &["author_id"]), "fk_posts_author_id");
/// ```
pub fn foreign_key_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("fk_{}_{}", bare_table(table), cols.join("_"))
}

/// Name of the sequence backing an auto-increment column.
///
/// The schema qualifier is kept, so the sequence lives next to its table.
///
/// ```
/// assert_eq!(duckling_sql::sequence_name("users", "id"), "users_id_seq");
/// assert_eq!(duckling_sql::sequence_name("app.users", "id"), "app.users_id_seq");
/// ```
pub fn sequence_name(table: &str, column: &str) -> String {
    format!("{}_{}_seq", table, column)
}

/// Generate a deterministic CHECK constraint name for a table and expression.
///
/// Includes the table name and a stable hash of the expression (after
/// whitespace normalization), so reformatting the expression keeps the name.
pub fn check_constraint_name(table: &str, expr: &str) -> String {
    let normalized = normalize_sql_expr_for_hash(expr);
    let hex = blake3::hash(normalized.as_bytes()).to_hex().to_string();
    format!("chk_{}_{}", bare_table(table), &hex[..16])
}

/// Collapse whitespace outside of quoted sections.
pub fn normalize_sql_expr_for_hash(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut pending_space = false;
    let mut quote: Option<char> = None;

    let mut chars = expr.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                // doubled quote is an escape, not the end of the section
                match chars.peek() {
                    Some(&next) if next == q => {
                        out.push(next);
                        chars.next();
                    }
                    _ => quote = None,
                }
            }
            continue;
        }

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
        if ch == '\'' || ch == '"' {
            quote = Some(ch);
        }
    }

    out
}

/// Reduce a CHECK expression to a form that survives DuckDB's rewriting.
///
/// DuckDB stores CHECK expressions re-rendered: wrapped in parentheses,
/// keywords uppercased, `<>` spelled `!=`. Outside string literals this
/// drops whitespace, parentheses and identifier quotes, lowercases, and
/// spells inequality as `!=`, so a model expression and its catalog copy
/// compare equal.
///
/// ```
/// use duckling_sql::check_expr_fingerprint;
/// assert_eq!(check_expr_fingerprint("price >= 0"), check_expr_fingerprint("(price >= 0)"));
/// assert_eq!(check_expr_fingerprint("name <> ''"), check_expr_fingerprint("(\"name\" != '')"));
/// ```
pub fn check_expr_fingerprint(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut in_literal = false;

    let mut chars = expr.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_literal {
            out.push(ch);
            if ch == '\'' {
                match chars.peek() {
                    Some('\'') => {
                        out.push('\'');
                        chars.next();
                    }
                    _ => in_literal = false,
                }
            }
            continue;
        }

        match ch {
            '\'' => {
                in_literal = true;
                out.push(ch);
            }
            '<' if chars.peek() == Some(&'>') => {
                chars.next();
                out.push_str("!=");
            }
            '(' | ')' | '"' => {}
            c if c.is_whitespace() => {}
            c => out.extend(c.to_lowercase()),
        }
    }

    out
}
