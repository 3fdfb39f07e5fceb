//! In-memory schema graph built from SQL DDL.
//!
//! Tables live in an arena owned by [`Database`] and are addressed by
//! [`TableId`]. Fields and keys are owned by their table. A foreign-key
//! [`Constraint`] is stored once in the database and linked by id from both
//! the declaring table and the table it references, so "who references me"
//! queries need no scan.
//!
//! Every mutation validates before it writes: a failed call leaves the graph
//! exactly as it was.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::observer::{NoopObserver, SchemaObserver};

/// Categorized reason for any failure raised while building a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateName,
    UnknownField,
    UnresolvedReference,
    UnrecognizedStatement,
    UnrecognizedFieldDeclaration,
    UnrecognizedFieldAttribute,
    UnrecognizedTermination,
    UnrecognizedAlterClause,
    UnterminatedStatement,
    Io,
}

/// What kind of named thing collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Table,
    Field,
    Key,
    PrimaryKey,
    Constraint,
    ConstrainingConstraint,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Entity::Table => "table",
            Entity::Field => "field",
            Entity::Key => "key",
            Entity::PrimaryKey => "primary key",
            Entity::Constraint => "constraint",
            Entity::ConstrainingConstraint => "constraining constraint",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Adding duplicate {entity} name: {name} to {scope}")]
    DuplicateName {
        entity: Entity,
        name: String,
        scope: String,
    },
    #[error("Unknown field: {field} in table: {table}")]
    UnknownField { table: String, field: String },
    #[error("Unresolved table reference: {table}")]
    UnresolvedReference { table: String },
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::DuplicateName { .. } => ErrorKind::DuplicateName,
            SchemaError::UnknownField { .. } => ErrorKind::UnknownField,
            SchemaError::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
        }
    }

    fn duplicate(entity: Entity, name: &str, scope: String) -> Self {
        SchemaError::DuplicateName {
            entity,
            name: name.to_string(),
            scope,
        }
    }

    fn unknown_field(table: &Table, field: &str) -> Self {
        SchemaError::UnknownField {
            table: table.name.clone(),
            field: field.to_string(),
        }
    }
}

/// Stable index of a table within its [`Database`].
///
/// Ids are only meaningful for the graph that issued them. The indexing
/// accessors (`table`, `field`, `constraint`) and the `Database` mutators
/// panic on an id from another graph; use `get_table`/`get_field`/
/// `get_constraint` when the origin is not known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

/// Stable index of a field within its [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

/// Stable index of a constraint within its [`Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(usize);

impl TableId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ConstraintId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A field addressed across the whole database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub table: TableId,
    pub field: FieldId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    table: TableId,
    name: String,
    data_type: String,
    /// Cleared by `NOT NULL`
    pub nullable: bool,
    /// Raw default text, quotes included
    pub default_value: Option<String>,
    pub character_set: Option<String>,
    pub collation: Option<String>,
    pub auto_increment: bool,
}

impl Field {
    fn new(table: TableId, name: &str, data_type: &str) -> Self {
        Self {
            table,
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default_value: None,
            character_set: None,
            collation: None,
            auto_increment: false,
        }
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type, uninterpreted (e.g. `varchar(255)`).
    pub fn data_type(&self) -> &str {
        &self.data_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    table: TableId,
    name: String,
    fields: Vec<FieldId>,
    unique: bool,
    primary: bool,
}

impl Key {
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member fields in declaration order.
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }
}

/// Name given to the primary key of every table.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// A single-column foreign key from a child field to a parent field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    id: ConstraintId,
    table: TableId,
    name: String,
    foreign_key: FieldRef,
    references: FieldRef,
    on_delete: Option<String>,
    on_update: Option<String>,
}

impl Constraint {
    pub fn id(&self) -> ConstraintId {
        self.id
    }

    /// The declaring (child) table.
    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field in the declaring table holding the reference.
    pub fn foreign_key(&self) -> FieldRef {
        self.foreign_key
    }

    /// The referenced field in the parent table.
    pub fn references(&self) -> FieldRef {
        self.references
    }

    pub fn on_delete(&self) -> Option<&str> {
        self.on_delete.as_deref()
    }

    pub fn on_update(&self) -> Option<&str> {
        self.on_update.as_deref()
    }
}

/// Referential actions attached to a foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferentialActions {
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Table {
    id: TableId,
    name: String,
    fields: Vec<Field>,
    field_index: HashMap<String, FieldId>,
    keys: Vec<Key>,
    key_index: HashMap<String, usize>,
    primary_key: Option<Key>,
    constraints: Vec<ConstraintId>,
    constraint_index: HashMap<String, ConstraintId>,
    constraining_constraints: Vec<ConstraintId>,
    constraining_index: HashMap<String, ConstraintId>,
}

impl Table {
    fn new(id: TableId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            fields: Vec::new(),
            field_index: HashMap::new(),
            keys: Vec::new(),
            key_index: HashMap::new(),
            primary_key: None,
            constraints: Vec::new(),
            constraint_index: HashMap::new(),
            constraining_constraints: Vec::new(),
            constraining_index: HashMap::new(),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn get_field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0)
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.field_index.get(name).copied()
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<&Field> {
        self.field_id(name).map(|id| self.field(id))
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = &Field> + '_ {
        self.fields.iter()
    }

    pub fn get_key_by_name(&self, name: &str) -> Option<&Key> {
        self.key_index.get(name).map(|&i| &self.keys[i])
    }

    /// Keys in declaration order, primary key excluded.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &Key> + '_ {
        self.keys.iter()
    }

    pub fn primary_key(&self) -> Option<&Key> {
        self.primary_key.as_ref()
    }

    /// Resolve a key's members against this table.
    pub fn key_fields<'a>(&'a self, key: &'a Key) -> impl Iterator<Item = &'a Field> + 'a {
        key.fields.iter().map(move |&id| self.field(id))
    }

    /// Constraints declared by this table.
    pub fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraints
    }

    /// Constraints in other tables (or this one) that reference this table.
    pub fn constraining_constraint_ids(&self) -> &[ConstraintId] {
        &self.constraining_constraints
    }

    fn scope(&self) -> String {
        format!("table: {}", self.name)
    }

    fn resolve_fields<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<FieldId>, SchemaError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.field_id(name)
                    .ok_or_else(|| SchemaError::unknown_field(self, name))
            })
            .collect()
    }
}

/// Root of the schema graph.
pub struct Database {
    name: String,
    tables: Vec<Table>,
    table_index: HashMap<String, TableId>,
    constraints: Vec<Constraint>,
    observer: Box<dyn SchemaObserver + Send>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("tables", &self.tables)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_observer(name, NoopObserver)
    }

    pub fn with_observer(
        name: impl Into<String>,
        observer: impl SchemaObserver + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            table_index: HashMap::new(),
            constraints: Vec::new(),
            observer: Box::new(observer),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_table(&mut self, name: &str) -> Result<TableId, SchemaError> {
        if self.table_index.contains_key(name) {
            return Err(SchemaError::duplicate(
                Entity::Table,
                name,
                format!("database: {}", self.name),
            ));
        }

        let id = TableId(self.tables.len());
        self.tables.push(Table::new(id, name));
        self.table_index.insert(name.to_string(), id);
        self.observer.table_created(&self.name, &self.tables[id.0]);
        Ok(id)
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn get_table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0)
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.table_index.get(name).copied()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<&Table> {
        self.table_id(name).map(|id| self.table(id))
    }

    /// Tables in creation order.
    pub fn tables(&self) -> impl ExactSizeIterator<Item = &Table> + '_ {
        self.tables.iter()
    }

    pub fn add_field(
        &mut self,
        table: TableId,
        name: &str,
        data_type: &str,
    ) -> Result<&mut Field, SchemaError> {
        let observer = &mut self.observer;
        let table = &mut self.tables[table.0];
        if table.field_index.contains_key(name) {
            return Err(SchemaError::duplicate(Entity::Field, name, table.scope()));
        }

        let id = FieldId(table.fields.len());
        table.fields.push(Field::new(table.id, name, data_type));
        table.field_index.insert(name.to_string(), id);
        observer.field_added(table, &table.fields[id.0]);
        Ok(&mut table.fields[id.0])
    }

    pub fn add_key<S: AsRef<str>>(
        &mut self,
        table: TableId,
        name: &str,
        field_names: &[S],
        unique: bool,
    ) -> Result<&Key, SchemaError> {
        let observer = &mut self.observer;
        let table = &mut self.tables[table.0];
        if table.key_index.contains_key(name) {
            return Err(SchemaError::duplicate(Entity::Key, name, table.scope()));
        }
        let fields = table.resolve_fields(field_names)?;

        let index = table.keys.len();
        table.keys.push(Key {
            table: table.id,
            name: name.to_string(),
            fields,
            unique,
            primary: false,
        });
        table.key_index.insert(name.to_string(), index);
        observer.key_added(table, &table.keys[index]);
        Ok(&table.keys[index])
    }

    pub fn set_primary_key<S: AsRef<str>>(
        &mut self,
        table: TableId,
        field_names: &[S],
    ) -> Result<(), SchemaError> {
        let observer = &mut self.observer;
        let table = &mut self.tables[table.0];
        if table.primary_key.is_some() {
            return Err(SchemaError::duplicate(
                Entity::PrimaryKey,
                PRIMARY_KEY_NAME,
                table.scope(),
            ));
        }
        let fields = table.resolve_fields(field_names)?;

        let key = Key {
            table: table.id,
            name: PRIMARY_KEY_NAME.to_string(),
            fields,
            unique: true,
            primary: true,
        };
        observer.primary_key_set(table, &key);
        table.primary_key = Some(key);
        Ok(())
    }

    /// Declare a foreign key on `table` referencing `parent_table.parent_field`.
    ///
    /// The parent must already exist. On success the constraint is listed by
    /// the declaring table, by the parent table as a constraining constraint,
    /// and by the database.
    pub fn add_constraint(
        &mut self,
        table: TableId,
        name: &str,
        foreign_key: &str,
        parent_table: &str,
        parent_field: &str,
        actions: ReferentialActions,
    ) -> Result<&Constraint, SchemaError> {
        let declaring = &self.tables[table.0];
        if declaring.constraint_index.contains_key(name) {
            return Err(SchemaError::duplicate(
                Entity::Constraint,
                name,
                declaring.scope(),
            ));
        }
        let fk_field = declaring
            .field_id(foreign_key)
            .ok_or_else(|| SchemaError::unknown_field(declaring, foreign_key))?;

        let parent_id =
            self.table_id(parent_table)
                .ok_or_else(|| SchemaError::UnresolvedReference {
                    table: parent_table.to_string(),
                })?;
        let parent = &self.tables[parent_id.0];
        let pk_field = parent
            .field_id(parent_field)
            .ok_or_else(|| SchemaError::unknown_field(parent, parent_field))?;
        if parent.constraining_index.contains_key(name) {
            return Err(SchemaError::duplicate(
                Entity::ConstrainingConstraint,
                name,
                parent.scope(),
            ));
        }

        let id = ConstraintId(self.constraints.len());
        self.constraints.push(Constraint {
            id,
            table,
            name: name.to_string(),
            foreign_key: FieldRef {
                table,
                field: fk_field,
            },
            references: FieldRef {
                table: parent_id,
                field: pk_field,
            },
            on_delete: actions.on_delete,
            on_update: actions.on_update,
        });

        let declaring = &mut self.tables[table.0];
        declaring.constraints.push(id);
        declaring.constraint_index.insert(name.to_string(), id);

        let parent = &mut self.tables[parent_id.0];
        parent.constraining_constraints.push(id);
        parent.constraining_index.insert(name.to_string(), id);

        let constraint = &self.constraints[id.0];
        self.observer.constraint_added(
            &self.tables[table.0],
            &self.tables[parent_id.0],
            constraint,
        );
        Ok(constraint)
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.0]
    }

    pub fn get_constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id.0)
    }

    pub fn get_constraint_by_name(&self, table: TableId, name: &str) -> Option<&Constraint> {
        self.tables[table.0]
            .constraint_index
            .get(name)
            .map(|&id| self.constraint(id))
    }

    /// Every constraint in the database, in creation order.
    pub fn constraints(&self) -> impl ExactSizeIterator<Item = &Constraint> + '_ {
        self.constraints.iter()
    }

    /// Constraints declared by `table`.
    pub fn table_constraints(&self, table: TableId) -> impl Iterator<Item = &Constraint> + '_ {
        self.tables[table.0]
            .constraints
            .iter()
            .map(move |&id| self.constraint(id))
    }

    /// Constraints that reference `table`.
    pub fn constraining_constraints(
        &self,
        table: TableId,
    ) -> impl Iterator<Item = &Constraint> + '_ {
        self.tables[table.0]
            .constraining_constraints
            .iter()
            .map(move |&id| self.constraint(id))
    }

    /// The field a [`FieldRef`] points at.
    pub fn field(&self, field: FieldRef) -> &Field {
        self.table(field.table).field(field.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_fields(db: &mut Database, name: &str, fields: &[&str]) -> TableId {
        let id = db.add_table(name).unwrap();
        for field in fields {
            db.add_field(id, field, "int").unwrap();
        }
        id
    }

    #[test]
    fn test_add_table_preserves_order() {
        let mut db = Database::new("dump.sql");
        db.add_table("users").unwrap();
        db.add_table("accounts").unwrap();
        db.add_table("orders").unwrap();

        let names: Vec<&str> = db.tables().map(|t| t.name()).collect();
        assert_eq!(names, vec!["users", "accounts", "orders"]);
    }

    #[test]
    fn test_duplicate_table() {
        let mut db = Database::new("dump.sql");
        db.add_table("users").unwrap();
        let err = db.add_table("users").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(db.tables().len(), 1);
    }

    #[test]
    fn test_field_defaults() {
        let mut db = Database::new("dump.sql");
        let users = db.add_table("users").unwrap();
        let field = db.add_field(users, "name", "varchar(255)").unwrap();

        assert_eq!(field.name(), "name");
        assert_eq!(field.data_type(), "varchar(255)");
        assert!(field.nullable);
        assert_eq!(field.default_value, None);
        assert_eq!(field.character_set, None);
    }

    #[test]
    fn test_field_attributes_refined_in_place() {
        let mut db = Database::new("dump.sql");
        let users = db.add_table("users").unwrap();
        let field = db.add_field(users, "name", "varchar(255)").unwrap();
        field.nullable = false;
        field.default_value = Some("'anon'".to_string());

        let field = db.table(users).get_field_by_name("name").unwrap();
        assert!(!field.nullable);
        assert_eq!(field.default_value.as_deref(), Some("'anon'"));
    }

    #[test]
    fn test_duplicate_field_leaves_table_unchanged() {
        let mut db = Database::new("dump.sql");
        let users = table_with_fields(&mut db, "users", &["id"]);
        let err = db.add_field(users, "id", "bigint").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        let table = db.table(users);
        assert_eq!(table.fields().len(), 1);
        assert_eq!(table.get_field_by_name("id").unwrap().data_type(), "int");
    }

    #[test]
    fn test_add_key() {
        let mut db = Database::new("dump.sql");
        let users = table_with_fields(&mut db, "users", &["id", "email", "tenant"]);
        let key = db.add_key(users, "uq_email", &["tenant", "email"], true).unwrap();

        assert!(key.is_unique());
        assert!(!key.is_primary());
        let table = db.table(users);
        let key = table.get_key_by_name("uq_email").unwrap();
        let members: Vec<&str> = table.key_fields(key).map(|f| f.name()).collect();
        assert_eq!(members, vec!["tenant", "email"]);
    }

    #[test]
    fn test_add_key_unknown_field() {
        let mut db = Database::new("dump.sql");
        let users = table_with_fields(&mut db, "users", &["id"]);
        let err = db.add_key(users, "idx_email", &["email"], false).unwrap_err();

        assert_eq!(
            err,
            SchemaError::UnknownField {
                table: "users".into(),
                field: "email".into()
            }
        );
        assert_eq!(db.table(users).keys().len(), 0);
    }

    #[test]
    fn test_duplicate_key() {
        let mut db = Database::new("dump.sql");
        let users = table_with_fields(&mut db, "users", &["id", "email"]);
        db.add_key(users, "idx", &["id"], false).unwrap();
        let err = db.add_key(users, "idx", &["email"], true).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        let key = db.table(users).get_key_by_name("idx").unwrap();
        assert!(!key.is_unique());
    }

    #[test]
    fn test_primary_key() {
        let mut db = Database::new("dump.sql");
        let users = table_with_fields(&mut db, "users", &["id", "tenant_id"]);
        db.set_primary_key(users, &["id", "tenant_id"]).unwrap();

        let table = db.table(users);
        let pk = table.primary_key().unwrap();
        assert!(pk.is_primary());
        assert!(pk.is_unique());
        assert_eq!(pk.name(), PRIMARY_KEY_NAME);
        let members: Vec<&str> = table.key_fields(pk).map(|f| f.name()).collect();
        assert_eq!(members, vec!["id", "tenant_id"]);
        assert_eq!(table.keys().len(), 0);

        let err = db.set_primary_key(users, &["id"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
    }

    #[test]
    fn test_constraint_registered_three_ways() {
        let mut db = Database::new("dump.sql");
        let parent = table_with_fields(&mut db, "parent", &["id"]);
        let child = table_with_fields(&mut db, "child", &["id", "parent_id"]);
        let constraint = db
            .add_constraint(
                child,
                "fk_child_parent",
                "parent_id",
                "parent",
                "id",
                ReferentialActions::default(),
            )
            .unwrap();
        let id = constraint.id();

        assert_eq!(db.table(child).constraint_ids(), &[id]);
        assert_eq!(db.table(parent).constraining_constraint_ids(), &[id]);
        assert_eq!(db.constraints().len(), 1);

        let constraint = db.get_constraint_by_name(child, "fk_child_parent").unwrap();
        assert_eq!(db.field(constraint.foreign_key()).name(), "parent_id");
        assert_eq!(db.field(constraint.references()).name(), "id");
        assert_eq!(constraint.references().table, parent);
    }

    #[test]
    fn test_self_referencing_constraint() {
        let mut db = Database::new("dump.sql");
        let nodes = table_with_fields(&mut db, "nodes", &["id", "parent_id"]);
        db.add_constraint(
            nodes,
            "fk_parent",
            "parent_id",
            "nodes",
            "id",
            ReferentialActions::default(),
        )
        .unwrap();

        assert_eq!(db.table_constraints(nodes).count(), 1);
        assert_eq!(db.constraining_constraints(nodes).count(), 1);
    }

    #[test]
    fn test_constraint_unresolved_parent_does_not_mutate() {
        let mut db = Database::new("dump.sql");
        let child = table_with_fields(&mut db, "child", &["parent_id"]);
        let err = db
            .add_constraint(
                child,
                "fk",
                "parent_id",
                "parent",
                "id",
                ReferentialActions::default(),
            )
            .unwrap_err();

        assert_eq!(
            err,
            SchemaError::UnresolvedReference {
                table: "parent".into()
            }
        );
        assert!(db.table(child).constraint_ids().is_empty());
        assert_eq!(db.constraints().len(), 0);
    }

    #[test]
    fn test_constraint_unknown_fields() {
        let mut db = Database::new("dump.sql");
        table_with_fields(&mut db, "parent", &["id"]);
        let child = table_with_fields(&mut db, "child", &["parent_id"]);

        let err = db
            .add_constraint(child, "fk", "missing", "parent", "id", Default::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);

        let err = db
            .add_constraint(child, "fk", "parent_id", "parent", "uuid", Default::default())
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownField {
                table: "parent".into(),
                field: "uuid".into()
            }
        );
        assert_eq!(db.constraints().len(), 0);
    }

    #[test]
    fn test_duplicate_constraint() {
        let mut db = Database::new("dump.sql");
        let parent = table_with_fields(&mut db, "parent", &["id"]);
        let child = table_with_fields(&mut db, "child", &["parent_id"]);
        db.add_constraint(child, "fk", "parent_id", "parent", "id", Default::default())
            .unwrap();
        let err = db
            .add_constraint(child, "fk", "parent_id", "parent", "id", Default::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(db.constraints().len(), 1);
        assert_eq!(db.table(parent).constraining_constraint_ids().len(), 1);
    }

    #[test]
    fn test_constraining_name_clash_is_atomic() {
        let mut db = Database::new("dump.sql");
        let parent = table_with_fields(&mut db, "parent", &["id"]);
        let a = table_with_fields(&mut db, "a", &["parent_id"]);
        let b = table_with_fields(&mut db, "b", &["parent_id"]);
        db.add_constraint(a, "fk_parent", "parent_id", "parent", "id", Default::default())
            .unwrap();
        let err = db
            .add_constraint(b, "fk_parent", "parent_id", "parent", "id", Default::default())
            .unwrap_err();

        assert!(matches!(
            err,
            SchemaError::DuplicateName {
                entity: Entity::ConstrainingConstraint,
                ..
            }
        ));
        assert!(db.table(b).constraint_ids().is_empty());
        assert_eq!(db.table(parent).constraining_constraint_ids().len(), 1);
        assert_eq!(db.constraints().len(), 1);
    }

    #[test]
    fn test_lookups_are_idempotent() {
        let mut db = Database::new("dump.sql");
        let users = table_with_fields(&mut db, "users", &["id"]);

        let first = db.get_table_by_name("users").map(|t| t.id());
        let second = db.get_table_by_name("users").map(|t| t.id());
        assert_eq!(first, Some(users));
        assert_eq!(first, second);
        assert!(db.get_table_by_name("orders").is_none());
        assert!(db.get_table_by_name("orders").is_none());

        let table = db.table(users);
        assert_eq!(
            table.get_field_by_name("id").map(|f| f.name()),
            table.get_field_by_name("id").map(|f| f.name())
        );
        assert_eq!(db.tables().len(), 1);
        assert_eq!(table.fields().len(), 1);
    }

    #[test]
    fn test_iterators_restart() {
        let mut db = Database::new("dump.sql");
        table_with_fields(&mut db, "a", &["x", "y"]);
        let first: Vec<&str> = db.tables().flat_map(|t| t.fields()).map(|f| f.name()).collect();
        let second: Vec<&str> = db.tables().flat_map(|t| t.fields()).map(|f| f.name()).collect();
        assert_eq!(first, vec!["x", "y"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_foreign_ids_are_not_found() {
        let mut big = Database::new("big.sql");
        table_with_fields(&mut big, "a", &["x"]);
        let b = table_with_fields(&mut big, "b", &["x", "y"]);
        let y = big.table(b).field_id("y").unwrap();

        let mut small = Database::new("small.sql");
        let a = table_with_fields(&mut small, "a", &["x"]);

        assert!(small.get_table(b).is_none());
        assert!(small.table(a).get_field(y).is_none());
        assert_eq!(big.get_table(b).and_then(|t| t.get_field(y)).map(|f| f.name()), Some("y"));
        assert!(small.get_constraint(ConstraintId(0)).is_none());
    }
}
