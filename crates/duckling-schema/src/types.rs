//! DuckDB column types and the alias table used to compare them.

use std::fmt;

/// DuckDB column types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuckType {
    /// TINYINT (1 byte)
    TinyInt,
    /// SMALLINT (2 bytes)
    SmallInt,
    /// INTEGER (4 bytes)
    Integer,
    /// BIGINT (8 bytes)
    BigInt,
    /// HUGEINT (16 bytes)
    HugeInt,
    /// UTINYINT
    UTinyInt,
    /// USMALLINT
    USmallInt,
    /// UINTEGER
    UInteger,
    /// UBIGINT
    UBigInt,
    /// FLOAT (4 bytes floating point)
    Float,
    /// DOUBLE (8 bytes floating point)
    Double,
    /// DECIMAL(precision, scale)
    Decimal { precision: u8, scale: u8 },
    /// BOOLEAN
    Boolean,
    /// VARCHAR, optionally with a (purely informational) length
    Varchar(Option<u32>),
    /// BLOB
    Blob,
    /// TIMESTAMP (no time zone)
    Timestamp,
    /// TIMESTAMPTZ
    TimestampTz,
    /// DATE
    Date,
    /// TIME
    Time,
    /// INTERVAL
    Interval,
    /// UUID
    Uuid,
    /// `T[]`
    List(Box<DuckType>),
    /// Raw SQL type text, from `#[facet(duckling::sql_type = "...")]`
    Custom(String),
}

impl DuckType {
    /// Whether values of this type can be produced by `nextval()`.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DuckType::TinyInt
                | DuckType::SmallInt
                | DuckType::Integer
                | DuckType::BigInt
                | DuckType::HugeInt
                | DuckType::UTinyInt
                | DuckType::USmallInt
                | DuckType::UInteger
                | DuckType::UBigInt
        )
    }
}

impl fmt::Display for DuckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuckType::TinyInt => write!(f, "TINYINT"),
            DuckType::SmallInt => write!(f, "SMALLINT"),
            DuckType::Integer => write!(f, "INTEGER"),
            DuckType::BigInt => write!(f, "BIGINT"),
            DuckType::HugeInt => write!(f, "HUGEINT"),
            DuckType::UTinyInt => write!(f, "UTINYINT"),
            DuckType::USmallInt => write!(f, "USMALLINT"),
            DuckType::UInteger => write!(f, "UINTEGER"),
            DuckType::UBigInt => write!(f, "UBIGINT"),
            DuckType::Float => write!(f, "FLOAT"),
            DuckType::Double => write!(f, "DOUBLE"),
            DuckType::Decimal { precision, scale } => write!(f, "DECIMAL({},{})", precision, scale),
            DuckType::Boolean => write!(f, "BOOLEAN"),
            DuckType::Varchar(None) => write!(f, "VARCHAR"),
            DuckType::Varchar(Some(len)) => write!(f, "VARCHAR({})", len),
            DuckType::Blob => write!(f, "BLOB"),
            DuckType::Timestamp => write!(f, "TIMESTAMP"),
            DuckType::TimestampTz => write!(f, "TIMESTAMPTZ"),
            DuckType::Date => write!(f, "DATE"),
            DuckType::Time => write!(f, "TIME"),
            DuckType::Interval => write!(f, "INTERVAL"),
            DuckType::Uuid => write!(f, "UUID"),
            DuckType::List(inner) => write!(f, "{}[]", inner),
            DuckType::Custom(sql) => write!(f, "{}", sql),
        }
    }
}

/// Other spellings DuckDB accepts (or reports) for a type name.
///
/// Keys and values are lowercase base names, without length or precision.
pub fn type_aliases(name: &str) -> &'static [&'static str] {
    match name {
        "int" => &["integer"],
        "int2" => &["smallint"],
        "int4" => &["integer"],
        "int8" => &["bigint"],
        "smallint" => &["int2"],
        "integer" => &["int4"],
        "bigint" => &["int8"],
        "decimal" => &["numeric"],
        "numeric" => &["decimal"],
        "timestamptz" => &["timestamp with time zone"],
        "timestamp with time zone" => &["timestamptz"],
        "bool" => &["boolean"],
        "boolean" => &["bool"],
        "bit" => &["bitstring"],
        "char" => &["character"],
        "varchar" => &["character varying"],
        "float4" => &["real"],
        "float8" => &["double"],
        "blob" => &["binary"],
        _ => &[],
    }
}

/// Lowercased element type name, its parenthesized arguments if any, and
/// how many `[]` list suffixes wrap it.
fn split_type_name(name: &str) -> (String, Option<String>, usize) {
    let mut lower = name.trim().to_lowercase();
    let mut depth = 0;
    while let Some(element) = lower.strip_suffix("[]") {
        lower = element.trim_end().to_string();
        depth += 1;
    }
    match lower.find('(') {
        Some(open) => {
            let base = lower[..open].trim().to_string();
            let args: String = lower[open..].chars().filter(|c| !c.is_whitespace()).collect();
            (base, Some(args), depth)
        }
        None => (lower, None, depth),
    }
}

/// Whether a model type and a catalog-reported type name the same type.
///
/// Base names are compared through [`type_aliases`]. Arguments such as
/// `(18,3)` only matter when both sides carry them, since DuckDB drops
/// VARCHAR lengths.
///
/// ```
/// use duckling_schema::types_match;
/// assert!(types_match("TIMESTAMPTZ", "TIMESTAMP WITH TIME ZONE"));
/// assert!(types_match("VARCHAR(255)", "VARCHAR"));
/// assert!(!types_match("DECIMAL(18,3)", "DECIMAL(10,2)"));
/// ```
pub fn types_match(model: &str, catalog: &str) -> bool {
    let (model_base, model_args, model_depth) = split_type_name(model);
    let (catalog_base, catalog_args, catalog_depth) = split_type_name(catalog);
    if model_depth != catalog_depth {
        return false;
    }

    let same_base = model_base == catalog_base
        || type_aliases(&model_base).iter().any(|a| *a == catalog_base)
        || type_aliases(&catalog_base).iter().any(|a| *a == model_base);
    if !same_base {
        return false;
    }

    match (model_args, catalog_args) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}
