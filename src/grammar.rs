//! Line grammar for the DDL subset emitted by mysqldump-style dumps.
//!
//! Each parser state owns an ordered rule table. A line is tested against the
//! rules of its table in order and the first match wins, so ordering is part
//! of the grammar: `NOT NULL` before `NULL`, and a `DEFAULT` value is tried
//! single-quoted, then double-quoted, then as a bare token.
//!
//! Every pattern is anchored at both ends. Backtick-quoted identifiers are
//! returned without their backticks.

use std::sync::LazyLock;

use regex::{Captures, Regex};

struct Rule<K> {
    kind: K,
    pattern: Regex,
}

impl<K: Copy> Rule<K> {
    fn new(kind: K, pattern: &str) -> Self {
        Self {
            kind,
            pattern: compile(pattern),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid line grammar pattern {pattern:?}: {e}"))
}

fn first_match<'h, K: Copy>(rules: &[Rule<K>], line: &'h str) -> Option<(K, Captures<'h>)> {
    rules
        .iter()
        .find_map(|rule| rule.pattern.captures(line).map(|caps| (rule.kind, caps)))
}

fn capture<'h>(caps: &Captures<'h>, name: &str) -> &'h str {
    caps.name(name).map_or("", |m| m.as_str())
}

/// `true` for lines holding nothing but whitespace.
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

// Statements

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFragment<'a> {
    /// `-- ...`
    Comment,
    /// `/* ... */;`, including mysqldump's `/*!40101 ... */;`
    BlockComment,
    /// `SET ...;`
    Set,
    /// ``CREATE TABLE `name` (``
    CreateTable { table: &'a str },
    /// ``ALTER TABLE `name` ``
    AlterTable { table: &'a str },
}

#[derive(Debug, Clone, Copy)]
enum StatementKind {
    Comment,
    BlockComment,
    Set,
    CreateTable,
    AlterTable,
}

static STATEMENT_RULES: LazyLock<Vec<Rule<StatementKind>>> = LazyLock::new(|| {
    vec![
        Rule::new(StatementKind::Comment, r"^--"),
        Rule::new(StatementKind::Set, r"^(?i:SET)\s.*;\s*$"),
        Rule::new(StatementKind::BlockComment, r"^/\*.*\*/\s*;\s*$"),
        Rule::new(
            StatementKind::CreateTable,
            r"^\s*(?i:CREATE\s+TABLE)\s+`(?P<table>[^`]+)`\s+\(\s*$",
        ),
        Rule::new(
            StatementKind::AlterTable,
            r"^\s*(?i:ALTER\s+TABLE)\s+`(?P<table>[^`]+)`\s*$",
        ),
    ]
});

/// Classify a line read between statements.
pub fn match_statement(line: &str) -> Option<StatementFragment<'_>> {
    let (kind, caps) = first_match(STATEMENT_RULES.as_slice(), line)?;
    let fragment = match kind {
        StatementKind::Comment => StatementFragment::Comment,
        StatementKind::BlockComment => StatementFragment::BlockComment,
        StatementKind::Set => StatementFragment::Set,
        StatementKind::CreateTable => StatementFragment::CreateTable {
            table: capture(&caps, "table"),
        },
        StatementKind::AlterTable => StatementFragment::AlterTable {
            table: capture(&caps, "table"),
        },
    };
    Some(fragment)
}

// Field declarations

/// ``  `name` type <rest>``
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDeclaration<'a> {
    pub name: &'a str,
    pub data_type: &'a str,
    /// Attributes and terminator following the type
    pub rest: &'a str,
}

static FIELD_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?x)
        ^\s*`(?P<name>[^`]+)`
        \s+(?P<data_type>
            [^\s,(`]+
            (?:\((?:'[^']*'|"[^"]*"|[^)'"])*\)[^\s,]*)?
            (?:\s+(?i:unsigned|zerofill))*
        )
        (?P<rest>(?:[\s,].*)?)$"#,
    )
});

pub fn match_field(line: &str) -> Option<FieldDeclaration<'_>> {
    let caps = FIELD_DECLARATION.captures(line)?;
    Some(FieldDeclaration {
        name: capture(&caps, "name"),
        data_type: capture(&caps, "data_type"),
        rest: capture(&caps, "rest"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    NotNull,
    Null,
    /// Raw value, quotes included
    Default(&'a str),
    CharacterSet(&'a str),
    Collate(&'a str),
    AutoIncrement,
}

/// One step through the text following a field's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeStep<'a> {
    /// An attribute and the text left after it
    Attribute(Attribute<'a>, &'a str),
    /// A lone trailing comma: another field follows
    NextField,
    /// Nothing left: the field list may be closing
    EndOfLine,
}

#[derive(Debug, Clone, Copy)]
enum AttributeKind {
    EndOfLine,
    NotNull,
    Null,
    DefaultSingleQuoted,
    DefaultDoubleQuoted,
    DefaultBare,
    CharacterSet,
    Collate,
    AutoIncrement,
    NextField,
}

static ATTRIBUTE_RULES: LazyLock<Vec<Rule<AttributeKind>>> = LazyLock::new(|| {
    vec![
        Rule::new(AttributeKind::EndOfLine, r"^\s*$"),
        Rule::new(
            AttributeKind::NotNull,
            r"^\s*(?i:NOT\s+NULL)\b\s*(?P<rest>.*)$",
        ),
        Rule::new(AttributeKind::Null, r"^\s*(?i:NULL)\b\s*(?P<rest>.*)$"),
        Rule::new(
            AttributeKind::DefaultSingleQuoted,
            r"^\s*(?i:DEFAULT)\s+(?P<value>'[^']*')\s*(?P<rest>.*)$",
        ),
        Rule::new(
            AttributeKind::DefaultDoubleQuoted,
            r#"^\s*(?i:DEFAULT)\s+(?P<value>"[^"]*")\s*(?P<rest>.*)$"#,
        ),
        Rule::new(
            AttributeKind::DefaultBare,
            r"^\s*(?i:DEFAULT)\s+(?P<value>[^\s,]+)\s*(?P<rest>.*)$",
        ),
        Rule::new(
            AttributeKind::CharacterSet,
            r"^\s*(?i:CHARACTER\s+SET)\s+(?P<value>[^\s,]+)\s*(?P<rest>.*)$",
        ),
        Rule::new(
            AttributeKind::Collate,
            r"^\s*(?i:COLLATE)\s+(?P<value>[^\s,]+)\s*(?P<rest>.*)$",
        ),
        Rule::new(
            AttributeKind::AutoIncrement,
            r"^\s*(?i:AUTO_INCREMENT)\b\s*(?P<rest>.*)$",
        ),
        Rule::new(AttributeKind::NextField, r"^\s*,\s*$"),
    ]
});

/// Match the next attribute at the start of `rest`.
pub fn match_attribute(rest: &str) -> Option<AttributeStep<'_>> {
    let (kind, caps) = first_match(ATTRIBUTE_RULES.as_slice(), rest)?;
    let value = capture(&caps, "value");
    let attribute = match kind {
        AttributeKind::EndOfLine => return Some(AttributeStep::EndOfLine),
        AttributeKind::NextField => return Some(AttributeStep::NextField),
        AttributeKind::NotNull => Attribute::NotNull,
        AttributeKind::Null => Attribute::Null,
        AttributeKind::DefaultSingleQuoted
        | AttributeKind::DefaultDoubleQuoted
        | AttributeKind::DefaultBare => Attribute::Default(value),
        AttributeKind::CharacterSet => Attribute::CharacterSet(value),
        AttributeKind::Collate => Attribute::Collate(value),
        AttributeKind::AutoIncrement => Attribute::AutoIncrement,
    };
    Some(AttributeStep::Attribute(attribute, capture(&caps, "rest")))
}

static CLOSE_PAREN: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*\).*;\s*$"));

/// `) ENGINE=... ;` closing a `CREATE TABLE`.
pub fn match_close_paren(line: &str) -> bool {
    CLOSE_PAREN.is_match(line)
}

// ALTER TABLE clauses

/// Trailing `,` or `;` of an `ALTER TABLE` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// `,`: another clause follows
    Continue,
    /// `;`: the statement ends
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterClause<'a> {
    PrimaryKey {
        fields: Vec<&'a str>,
    },
    Key {
        name: &'a str,
        fields: Vec<&'a str>,
        unique: bool,
    },
    /// Single column on each side; multi-column keys do not match.
    Constraint {
        name: &'a str,
        foreign_key: &'a str,
        parent_table: &'a str,
        parent_field: &'a str,
        on_delete: Option<&'a str>,
        on_update: Option<&'a str>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterLine<'a> {
    pub clause: AlterClause<'a>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone, Copy)]
enum AlterKind {
    PrimaryKey,
    Key,
    Constraint,
}

const REFERENTIAL_ACTION: &str = r"(?:RESTRICT|CASCADE|SET\s+NULL|SET\s+DEFAULT|NO\s+ACTION)";

static ALTER_RULES: LazyLock<Vec<Rule<AlterKind>>> = LazyLock::new(|| {
    vec![
        Rule::new(
            AlterKind::PrimaryKey,
            r"(?xi)
            ^\s*ADD\s+PRIMARY\s+KEY\s*\((?P<fields>[^)]+)\)\s*
            (?P<terminator>[,;])\s*$",
        ),
        Rule::new(
            AlterKind::Key,
            r"(?xi)
            ^\s*ADD\s+(?P<unique>UNIQUE\s+)?KEY\s+`(?P<name>[^`]+)`\s*
            \((?P<fields>[^)]+)\)\s*
            (?P<terminator>[,;])\s*$",
        ),
        Rule::new(
            AlterKind::Constraint,
            &format!(
                r"(?xi)
                ^\s*ADD\s+CONSTRAINT\s+`(?P<name>[^`]+)`\s+
                FOREIGN\s+KEY\s*\(`(?P<fk>[^`]+)`\)\s+
                REFERENCES\s+`(?P<table>[^`]+)`\s*\(`(?P<field>[^`]+)`\)
                (?:\s+ON\s+DELETE\s+(?P<on_delete>{REFERENTIAL_ACTION}))?
                (?:\s+ON\s+UPDATE\s+(?P<on_update>{REFERENTIAL_ACTION}))?\s*
                (?P<terminator>[,;])\s*$"
            ),
        ),
    ]
});

/// Split a parenthesized column list, dropping backticks.
fn field_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(|name| name.trim().trim_matches('`'))
        .collect()
}

/// Classify a line inside an `ALTER TABLE` statement.
pub fn match_alter_clause(line: &str) -> Option<AlterLine<'_>> {
    let (kind, caps) = first_match(ALTER_RULES.as_slice(), line)?;
    let clause = match kind {
        AlterKind::PrimaryKey => AlterClause::PrimaryKey {
            fields: field_list(capture(&caps, "fields")),
        },
        AlterKind::Key => AlterClause::Key {
            name: capture(&caps, "name"),
            fields: field_list(capture(&caps, "fields")),
            unique: caps.name("unique").is_some(),
        },
        AlterKind::Constraint => AlterClause::Constraint {
            name: capture(&caps, "name"),
            foreign_key: capture(&caps, "fk"),
            parent_table: capture(&caps, "table"),
            parent_field: capture(&caps, "field"),
            on_delete: caps.name("on_delete").map(|m| m.as_str()),
            on_update: caps.name("on_update").map(|m| m.as_str()),
        },
    };
    let terminator = match capture(&caps, "terminator") {
        ";" => Terminator::End,
        _ => Terminator::Continue,
    };
    Some(AlterLine { clause, terminator })
}
