//! Reflection of `#[facet(duckling::table)]` structs into [`Table`]s.

use crate::{Attr, CheckConstraint, Column, DuckType, ForeignKey, Index, SchemaError, SourceLocation, Table};
use duckling_sql::{check_constraint_name, index_name, unique_index_name};
use facet::{Facet, Shape, Type, UserType};

/// A registered table definition.
///
/// Submit one per model with `inventory::submit!(TableDef::new::<T>())` so
/// `collect_schema()` can find it.
pub struct TableDef {
    /// The facet shape of the table struct.
    pub shape: &'static Shape,
}

impl TableDef {
    /// Create a new table definition from a Facet type.
    pub const fn new<T: Facet<'static>>() -> Self {
        Self { shape: T::SHAPE }
    }

    /// Get the table name from the `duckling::table` attribute.
    pub fn table_name(&self) -> Option<&'static str> {
        shape_get_attr_str(self.shape, "table")
    }

    /// Convert this definition to a Table struct.
    pub fn to_table(&self) -> Result<Table, SchemaError> {
        let not_a_table = || SchemaError::NotATable {
            type_name: self.shape.to_string(),
        };
        let table_name = self.table_name().ok_or_else(not_a_table)?.to_string();

        let struct_type = match &self.shape.ty {
            Type::User(UserType::Struct(s)) => s,
            _ => return Err(not_a_table()),
        };

        let mut table = Table::new(table_name.clone());

        for attr in self.shape.attributes.iter() {
            if attr.ns != Some("duckling") {
                continue;
            }
            match attr.get_as::<Attr>() {
                Some(Attr::CompositeIndex(composite)) => {
                    let cols = split_columns(composite.columns);
                    let name = composite
                        .name
                        .map(str::to_string)
                        .unwrap_or_else(|| index_name(&table_name, &cols[..]));
                    let mut idx = Index::new(name, cols);
                    idx.using = composite.using.map(str::to_string);
                    table.indices.push(idx);
                }
                Some(Attr::CompositeUnique(composite)) => {
                    let cols = split_columns(composite.columns);
                    let name = composite
                        .name
                        .map(str::to_string)
                        .unwrap_or_else(|| unique_index_name(&table_name, &cols[..]));
                    table.indices.push(Index::new(name, cols).unique());
                }
                Some(Attr::Check(check)) => {
                    let expr = check.expr.to_string();
                    let name = check
                        .name
                        .map(str::to_string)
                        .unwrap_or_else(|| check_constraint_name(&table_name, &expr));
                    table.check_constraints.push(CheckConstraint { name, expr });
                }
                _ => {}
            }
        }

        for field in struct_type.fields {
            if field_has_attr(field, "ignore") {
                continue;
            }

            let field_shape = field.shape.get();
            let col_name = field_get_attr_str(field, "column")
                .map(str::to_string)
                .unwrap_or_else(|| field.name.to_string());

            let (inner_shape, is_option) = unwrap_option(field_shape);

            let sql_type = match field_get_attr_str(field, "sql_type") {
                Some(sql) => DuckType::Custom(sql.to_string()),
                None => shape_to_duck_type(inner_shape).ok_or_else(|| {
                    SchemaError::UnsupportedType {
                        table: table_name.clone(),
                        column: col_name.clone(),
                        rust_type: inner_shape.to_string(),
                    }
                })?,
            };

            let primary_key = field_has_attr(field, "pk");
            let nullable = is_option && !primary_key && !field_has_attr(field, "not_null");
            let auto_increment = field_has_attr(field, "auto")
                || (primary_key && col_name == "id" && sql_type.is_integer());

            let doc = if field.doc.is_empty() {
                None
            } else {
                Some(field.doc.join("\n").trim().to_string())
            };

            table.columns.push(Column {
                name: col_name.clone(),
                field: Some(field.name.to_string()),
                sql_type,
                nullable,
                default: field_get_attr_str(field, "default").map(str::to_string),
                primary_key,
                unique: field_has_attr(field, "unique"),
                auto_increment,
                comment: field_get_attr_str(field, "comment").map(str::to_string),
                doc,
            });

            if let Some(fk_ref) = field_get_attr_str(field, "fk") {
                let (ref_table, ref_col) =
                    parse_fk_reference(fk_ref).ok_or_else(|| SchemaError::InvalidForeignKey {
                        table: table_name.clone(),
                        column: col_name.clone(),
                        reference: fk_ref.to_string(),
                    })?;
                table.foreign_keys.push(ForeignKey {
                    columns: vec![col_name.clone()],
                    references_table: ref_table.to_string(),
                    references_columns: vec![ref_col.to_string()],
                });
            }

            if field_has_attr(field, "index") {
                let name = field_get_attr_str(field, "index")
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| index_name(&table_name, &[&col_name]));
                table.indices.push(Index::new(name, vec![col_name.clone()]));
            }

            if field_has_attr(field, "unique_index") {
                let name = field_get_attr_str(field, "unique_index")
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| unique_index_name(&table_name, &[&col_name]));
                table
                    .indices
                    .push(Index::new(name, vec![col_name.clone()]).unique());
            }
        }

        table.source = SourceLocation {
            file: self.shape.source_file.map(|s| s.to_string()),
            line: self.shape.source_line,
            column: self.shape.source_column,
        };

        table.doc = if self.shape.doc.is_empty() {
            None
        } else {
            Some(self.shape.doc.join("\n").trim().to_string())
        };

        Ok(table)
    }
}

fn split_columns(columns: &str) -> Vec<String> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Unwrap Option<T> to get the inner type and nullability.
fn unwrap_option(shape: &'static Shape) -> (&'static Shape, bool) {
    if shape.decl_id == Option::<()>::SHAPE.decl_id
        && let Some(inner) = shape.inner
    {
        return (inner, true);
    }
    (shape, false)
}

/// Get a string value from a duckling attribute on a shape.
fn shape_get_attr_str(shape: &Shape, key: &str) -> Option<&'static str> {
    shape.attributes.iter().find_map(|attr| {
        if attr.ns == Some("duckling") && attr.key == key {
            attr.get_as::<&str>().copied()
        } else {
            None
        }
    })
}

/// Check if a field has a duckling attribute.
fn field_has_attr(field: &facet::Field, key: &str) -> bool {
    field
        .attributes
        .iter()
        .any(|attr| attr.ns == Some("duckling") && attr.key == key)
}

/// Get a string value from a duckling attribute on a field.
fn field_get_attr_str(field: &facet::Field, key: &str) -> Option<&'static str> {
    field.attributes.iter().find_map(|attr| {
        if attr.ns == Some("duckling") && attr.key == key {
            attr.get_as::<&str>().copied()
        } else {
            None
        }
    })
}

/// Parse a foreign key reference string.
///
/// Supports two formats:
/// - `table.column` (dot-separated)
/// - `table(column)` (parentheses)
///
/// The column is split off at the last dot, so `app.users.id` references
/// `id` on `app.users`.
pub fn parse_fk_reference(fk_ref: &str) -> Option<(&str, &str)> {
    if let Some(paren_idx) = fk_ref.find('(')
        && fk_ref.ends_with(')')
    {
        let table = &fk_ref[..paren_idx];
        let col = &fk_ref[paren_idx + 1..fk_ref.len() - 1];
        if !table.is_empty() && !col.is_empty() {
            return Some((table, col));
        }
        return None;
    }

    if let Some((table, col)) = fk_ref.rsplit_once('.')
        && !table.is_empty()
        && !col.is_empty()
    {
        return Some((table, col));
    }

    None
}

/// Map a Rust type to a DuckDB type.
///
/// Takes a Shape to properly handle generic types like `Vec<u8>`.
pub fn shape_to_duck_type(shape: &Shape) -> Option<DuckType> {
    if matches!(&shape.def, facet::Def::List(_)) {
        let inner = shape.inner?;
        if inner == u8::SHAPE {
            return Some(DuckType::Blob);
        }
        return scalar_duck_type(inner).map(|t| DuckType::List(Box::new(t)));
    }

    if matches!(&shape.def, facet::Def::Slice(_)) {
        if let Some(inner) = shape.inner
            && inner == u8::SHAPE
        {
            return Some(DuckType::Blob);
        }
        return None;
    }

    scalar_duck_type(shape)
}

fn scalar_duck_type(shape: &Shape) -> Option<DuckType> {
    let ty = if shape == i8::SHAPE {
        DuckType::TinyInt
    } else if shape == i16::SHAPE {
        DuckType::SmallInt
    } else if shape == i32::SHAPE {
        DuckType::Integer
    } else if shape == i64::SHAPE || shape == isize::SHAPE {
        DuckType::BigInt
    } else if shape == i128::SHAPE {
        DuckType::HugeInt
    } else if shape == u8::SHAPE {
        DuckType::UTinyInt
    } else if shape == u16::SHAPE {
        DuckType::USmallInt
    } else if shape == u32::SHAPE {
        DuckType::UInteger
    } else if shape == u64::SHAPE || shape == usize::SHAPE {
        DuckType::UBigInt
    } else if shape == f32::SHAPE {
        DuckType::Float
    } else if shape == f64::SHAPE {
        DuckType::Double
    } else if shape == bool::SHAPE {
        DuckType::Boolean
    } else if shape == String::SHAPE {
        DuckType::Varchar(None)
    } else if shape == rust_decimal::Decimal::SHAPE {
        DuckType::Decimal {
            precision: 18,
            scale: 3,
        }
    } else if shape == jiff::Timestamp::SHAPE
        || shape == jiff::Zoned::SHAPE
        || shape == chrono::DateTime::<chrono::Utc>::SHAPE
        || shape == chrono::DateTime::<chrono::Local>::SHAPE
    {
        DuckType::TimestampTz
    } else if shape == chrono::NaiveDateTime::SHAPE {
        DuckType::Timestamp
    } else if shape == jiff::civil::Date::SHAPE || shape == chrono::NaiveDate::SHAPE {
        DuckType::Date
    } else if shape == jiff::civil::Time::SHAPE || shape == chrono::NaiveTime::SHAPE {
        DuckType::Time
    } else if shape == uuid::Uuid::SHAPE {
        DuckType::Uuid
    } else {
        return None;
    };
    Some(ty)
}
