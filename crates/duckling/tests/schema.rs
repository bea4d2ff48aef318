use duckling::{DuckType, SchemaCodegen, Table, collect_schema};
use facet::Facet;

#[derive(Facet)]
#[facet(duckling::table = "users")]
struct User {
    #[facet(duckling::pk)]
    id: i64,
    #[facet(duckling::unique)]
    email: String,
    name: String,
    bio: Option<String>,
    #[facet(duckling::fk = "tenants.id")]
    tenant_id: i64,
}

#[derive(Facet)]
#[facet(duckling::table = "tenants")]
struct Tenant {
    #[facet(duckling::pk)]
    id: i64,
    name: String,
}

/// Events recorded per tenant.
#[derive(Facet)]
#[facet(duckling::table = "events")]
#[facet(duckling::composite_index(columns = "tenant_id,occurred_at"))]
#[facet(duckling::check(expr = "amount >= 0"))]
struct Event {
    #[facet(duckling::pk, duckling::auto)]
    seq: u64,
    #[facet(duckling::fk = "tenants(id)", duckling::index)]
    tenant_id: i64,
    #[facet(duckling::column = "kind", duckling::comment = "what happened")]
    event_kind: String,
    #[facet(duckling::default = "current_timestamp")]
    occurred_at: jiff::Timestamp,
    #[facet(duckling::sql_type = "DECIMAL(10,2)")]
    amount: rust_decimal::Decimal,
    tags: Vec<String>,
    payload: Option<Vec<u8>>,
    #[facet(duckling::ignore)]
    cached_total: f64,
}

inventory::submit!(duckling::TableDef::new::<User>());
inventory::submit!(duckling::TableDef::new::<Tenant>());
inventory::submit!(duckling::TableDef::new::<Event>());

#[test]
fn test_schema_collect() {
    let schema = collect_schema().unwrap();
    assert!(!schema.tables.is_empty(), "Schema should have tables");
    assert!(schema.get_table("users").is_some());
    assert!(schema.get_table("tenants").is_some());
    assert!(schema.get_table("events").is_some());
}

#[test]
fn test_user_table() {
    let user = Table::of::<User>().unwrap();
    assert_eq!(user.name, "users");
    assert_eq!(user.columns.len(), 5);

    let id_col = user.lookup_column("id").unwrap();
    assert!(id_col.primary_key);
    assert!(id_col.auto_increment, "integer pk named id is auto-increment");
    assert_eq!(id_col.sql_type, DuckType::BigInt);

    let email_col = user.lookup_column("email").unwrap();
    assert!(email_col.unique);
    assert!(!email_col.nullable);

    let bio_col = user.lookup_column("bio").unwrap();
    assert!(bio_col.nullable);

    // foreign keys are on the table, not the column
    assert_eq!(user.foreign_keys.len(), 1);
    let fk = &user.foreign_keys[0];
    assert_eq!(fk.columns, vec!["tenant_id"]);
    assert_eq!(fk.references_table, "tenants");
    assert_eq!(fk.references_columns, vec!["id"]);
}

#[test]
fn test_event_table() {
    let event = Table::of::<Event>().unwrap();
    assert_eq!(event.doc.as_deref(), Some("Events recorded per tenant."));

    let names: Vec<&str> = event.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["seq", "tenant_id", "kind", "occurred_at", "amount", "tags", "payload"]
    );

    let seq = event.lookup_column("seq").unwrap();
    assert!(seq.auto_increment);
    assert_eq!(seq.sql_type, DuckType::UBigInt);

    let kind = event.lookup_column("event_kind").unwrap();
    assert_eq!(kind.name, "kind");
    assert_eq!(kind.comment.as_deref(), Some("what happened"));

    let occurred_at = event.lookup_column("occurred_at").unwrap();
    assert_eq!(occurred_at.sql_type, DuckType::TimestampTz);
    assert_eq!(occurred_at.default.as_deref(), Some("current_timestamp"));

    assert_eq!(
        event.lookup_column("amount").unwrap().sql_type,
        DuckType::Custom("DECIMAL(10,2)".into())
    );
    assert_eq!(
        event.lookup_column("tags").unwrap().sql_type,
        DuckType::List(Box::new(DuckType::Varchar(None)))
    );
    let payload = event.lookup_column("payload").unwrap();
    assert_eq!(payload.sql_type, DuckType::Blob);
    assert!(payload.nullable);

    let index_names: Vec<&str> = event.indices.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        index_names,
        vec!["idx_events_tenant_id_occurred_at", "idx_events_tenant_id"]
    );

    assert_eq!(event.foreign_keys[0].references_table, "tenants");
    assert_eq!(event.check_constraints.len(), 1);
    assert!(event.check_constraints[0].name.starts_with("chk_events_"));
}

#[test]
fn test_schema_to_sql_orders_referenced_tables_first() {
    let sql = collect_schema().unwrap().to_sql(&Default::default());
    let tenants = sql.find("CREATE TABLE \"tenants\"").unwrap();
    let users = sql.find("CREATE TABLE \"users\"").unwrap();
    let events = sql.find("CREATE TABLE \"events\"").unwrap();
    assert!(tenants < users);
    assert!(tenants < events);
    assert!(sql.contains("CREATE SEQUENCE IF NOT EXISTS \"events_seq_seq\" START 1;"));
    assert!(sql.contains("COMMENT ON COLUMN \"events\".\"kind\" IS 'what happened';"));
}
