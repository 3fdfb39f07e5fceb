//! Plain-text report over a finished [`Database`].

use std::fmt::Write;

use unicode_width::UnicodeWidthStr;

use crate::schema::{Constraint, Database, Field, Key, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detail {
    /// Counts only
    #[default]
    Summary,
    Tables,
    /// Tables plus keys and constraints
    Keys,
    All,
}

impl Detail {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "summary" => Some(Self::Summary),
            "tables" => Some(Self::Tables),
            "keys" => Some(Self::Keys),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

pub fn render(database: &Database, detail: Detail) -> String {
    let mut output = String::new();

    if detail != Detail::Summary {
        for table in database.tables() {
            render_table(&mut output, database, table, detail);
        }
    }

    let _ = writeln!(
        output,
        "{} tables found, {} constraints found",
        database.tables().len(),
        database.constraints().len()
    );
    output
}

fn render_table(output: &mut String, database: &Database, table: &Table, detail: Detail) {
    let _ = writeln!(output, "{}", table.name());
    if detail == Detail::Tables {
        return;
    }

    if detail == Detail::All {
        let name_width = table.fields().map(|f| f.name().width()).max().unwrap_or(0);
        let type_width = table.fields().map(|f| f.data_type().width()).max().unwrap_or(0);
        for field in table.fields() {
            render_field(output, field, name_width, type_width);
        }
    }

    if let Some(pk) = table.primary_key() {
        let _ = writeln!(output, "  PRIMARY KEY ({})", key_columns(table, pk));
    }
    for key in table.keys() {
        let unique = if key.is_unique() { "UNIQUE " } else { "" };
        let _ = writeln!(
            output,
            "  {}KEY {} ({})",
            unique,
            key.name(),
            key_columns(table, key)
        );
    }
    for constraint in database.table_constraints(table.id()) {
        let _ = writeln!(
            output,
            "  CONSTRAINT {}: {}",
            constraint.name(),
            describe_link(database, constraint)
        );
    }
    for constraint in database.constraining_constraints(table.id()) {
        let _ = writeln!(
            output,
            "  REFERENCED BY {}: {}",
            constraint.name(),
            describe_link(database, constraint)
        );
    }
}

fn render_field(output: &mut String, field: &Field, name_width: usize, type_width: usize) {
    let mut line = format!(
        "  {}  {}",
        pad(field.name(), name_width),
        pad(field.data_type(), type_width)
    );
    if !field.nullable {
        line.push_str("  NOT NULL");
    }
    if field.auto_increment {
        line.push_str("  AUTO_INCREMENT");
    }
    if let Some(default) = &field.default_value {
        let _ = write!(line, "  DEFAULT {default}");
    }
    if let Some(charset) = &field.character_set {
        let _ = write!(line, "  CHARACTER SET {charset}");
    }
    if let Some(collation) = &field.collation {
        let _ = write!(line, "  COLLATE {collation}");
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

/// Left-align `text` in a column `width` terminal cells wide.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn key_columns(table: &Table, key: &Key) -> String {
    table
        .key_fields(key)
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_link(database: &Database, constraint: &Constraint) -> String {
    let fk = constraint.foreign_key();
    let pk = constraint.references();
    let mut text = format!(
        "{}.{} -> {}.{}",
        database.table(fk.table).name(),
        database.field(fk).name(),
        database.table(pk.table).name(),
        database.field(pk).name()
    );
    if let Some(action) = constraint.on_delete() {
        let _ = write!(text, " ON DELETE {action}");
    }
    if let Some(action) = constraint.on_update() {
        let _ = write!(text, " ON UPDATE {action}");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::process_sql;

    const DUMP: &str = "\
CREATE TABLE `parent` (
  `id` int NOT NULL
);
CREATE TABLE `child` (
  `id` int NOT NULL,
  `parent_id` int DEFAULT NULL
);
ALTER TABLE `child`
  ADD PRIMARY KEY (`id`),
  ADD KEY `idx_parent` (`parent_id`),
  ADD CONSTRAINT `fk_child_parent` FOREIGN KEY (`parent_id`) REFERENCES `parent` (`id`);
";

    fn database() -> Database {
        process_sql(DUMP, Database::new("dump.sql")).unwrap()
    }

    #[test]
    fn test_detail_from_str() {
        assert_eq!(Detail::from_str("summary"), Some(Detail::Summary));
        assert_eq!(Detail::from_str("keys"), Some(Detail::Keys));
        assert_eq!(Detail::from_str("everything"), None);
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            render(&database(), Detail::Summary),
            "2 tables found, 1 constraints found\n"
        );
    }

    #[test]
    fn test_tables() {
        assert_eq!(
            render(&database(), Detail::Tables),
            "parent\nchild\n2 tables found, 1 constraints found\n"
        );
    }

    #[test]
    fn test_keys() {
        let report = render(&database(), Detail::Keys);
        assert_eq!(
            report,
            "\
parent
  REFERENCED BY fk_child_parent: child.parent_id -> parent.id
child
  PRIMARY KEY (id)
  KEY idx_parent (parent_id)
  CONSTRAINT fk_child_parent: child.parent_id -> parent.id
2 tables found, 1 constraints found
"
        );
    }

    #[test]
    fn test_all_aligns_fields() {
        let report = render(&database(), Detail::All);
        assert!(report.contains("  id         int  NOT NULL\n"));
        assert!(report.contains("  parent_id  int  DEFAULT NULL\n"));
    }

    #[test]
    fn test_pad_uses_display_width() {
        assert_eq!(pad("名前", 6), "名前  ");
        assert_eq!(pad("id", 1), "id");
    }
}
