//! Notifications emitted by the schema graph after each successful mutation.
//!
//! Observers are informational only; nothing they do can change or veto a
//! mutation.

use crate::schema::{Constraint, Field, Key, Table};

pub trait SchemaObserver {
    fn table_created(&mut self, _database: &str, _table: &Table) {}

    fn field_added(&mut self, _table: &Table, _field: &Field) {}

    fn key_added(&mut self, _table: &Table, _key: &Key) {}

    fn primary_key_set(&mut self, _table: &Table, _key: &Key) {}

    /// `declaring` and `parent` are the same table for self references.
    fn constraint_added(&mut self, _declaring: &Table, _parent: &Table, _constraint: &Constraint) {
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SchemaObserver for NoopObserver {}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SchemaObserver for TracingObserver {
    fn table_created(&mut self, database: &str, table: &Table) {
        tracing::info!(database, table = table.name(), "Created table");
    }

    fn field_added(&mut self, table: &Table, field: &Field) {
        tracing::debug!(
            table = table.name(),
            field = field.name(),
            data_type = field.data_type(),
            "Added field"
        );
    }

    fn key_added(&mut self, table: &Table, key: &Key) {
        let fields: Vec<&str> = table.key_fields(key).map(|f| f.name()).collect();
        tracing::debug!(
            table = table.name(),
            key = key.name(),
            unique = key.is_unique(),
            fields = ?fields,
            "Added key"
        );
    }

    fn primary_key_set(&mut self, table: &Table, key: &Key) {
        let fields: Vec<&str> = table.key_fields(key).map(|f| f.name()).collect();
        tracing::debug!(table = table.name(), fields = ?fields, "Set primary key");
    }

    fn constraint_added(&mut self, declaring: &Table, parent: &Table, constraint: &Constraint) {
        let foreign_key = declaring.field(constraint.foreign_key().field);
        let references = parent.field(constraint.references().field);
        tracing::info!(
            constraint = constraint.name(),
            table = declaring.name(),
            foreign_key = foreign_key.name(),
            parent_table = parent.name(),
            parent_field = references.name(),
            "Constraint added"
        );
    }
}
