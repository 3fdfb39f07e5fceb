//! Line-oriented state machine turning DDL statements into a [`Database`].

use std::io::BufRead;

use crate::grammar::{
    self, AlterClause, Attribute, AttributeStep, StatementFragment, Terminator,
};
use crate::schema::{Database, ErrorKind, Field, ReferentialActions, SchemaError, TableId};

#[derive(Debug, thiserror::Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Unrecognized SQL statement")]
    UnrecognizedStatement,
    #[error("Unrecognized SQL field declaration")]
    UnrecognizedFieldDeclaration,
    #[error("Unrecognized SQL field attribute")]
    UnrecognizedFieldAttribute,
    #[error("Unrecognized SQL field termination")]
    UnrecognizedTermination,
    #[error("Unrecognized SQL alter table command")]
    UnrecognizedAlterClause,
    #[error("Unterminated SQL statement at end of input")]
    UnterminatedStatement,
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseErrorKind {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseErrorKind::Schema(e) => e.kind(),
            ParseErrorKind::UnrecognizedStatement => ErrorKind::UnrecognizedStatement,
            ParseErrorKind::UnrecognizedFieldDeclaration => ErrorKind::UnrecognizedFieldDeclaration,
            ParseErrorKind::UnrecognizedFieldAttribute => ErrorKind::UnrecognizedFieldAttribute,
            ParseErrorKind::UnrecognizedTermination => ErrorKind::UnrecognizedTermination,
            ParseErrorKind::UnrecognizedAlterClause => ErrorKind::UnrecognizedAlterClause,
            ParseErrorKind::UnterminatedStatement => ErrorKind::UnterminatedStatement,
            ParseErrorKind::Io(_) => ErrorKind::Io,
        }
    }
}

/// A fatal parse failure, anchored to the 1-based line that caused it.
#[derive(Debug, thiserror::Error)]
#[error("{reason} on line {line}: {text}")]
pub struct ParseError {
    pub line: usize,
    pub text: String,
    #[source]
    pub reason: ParseErrorKind,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        self.reason.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    ReadNextStatement,
    ReadTableFields(TableId),
    /// Only held while one field line is being consumed
    ReadFieldAttributes(TableId),
    ReadTableFieldsCloseParen(TableId),
    AlterTable(TableId),
}

pub struct StatementParser {
    database: Database,
    state: State,
    line: usize,
    /// Last non-blank line, reported when input ends mid-statement
    last_text: String,
}

impl StatementParser {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            state: State::ReadNextStatement,
            line: 0,
            last_text: String::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Consume one physical line. `line_no` is 1-based.
    pub fn feed(&mut self, line_no: usize, line: &str) -> Result<(), ParseError> {
        if grammar::is_blank(line) {
            return Ok(());
        }
        self.line = line_no;
        self.last_text.clear();
        self.last_text.push_str(line);

        let result = match self.state {
            State::ReadNextStatement => self.read_next_statement(line),
            State::ReadTableFields(table) | State::ReadFieldAttributes(table) => {
                self.read_table_fields(table, line)
            }
            State::ReadTableFieldsCloseParen(_) => self.read_close_paren(line),
            State::AlterTable(table) => self.alter_table(table, line),
        };

        result.map_err(|reason| ParseError {
            line: line_no,
            text: line.to_string(),
            reason,
        })
    }

    /// Succeeds only when input ended between statements.
    pub fn finish(self) -> Result<Database, ParseError> {
        match self.state {
            State::ReadNextStatement => Ok(self.database),
            _ => Err(ParseError {
                line: self.line,
                text: self.last_text,
                reason: ParseErrorKind::UnterminatedStatement,
            }),
        }
    }

    fn transition(&mut self, next: State) {
        if next != self.state {
            tracing::trace!(line = self.line, from = ?self.state, to = ?next, "state transition");
        }
        self.state = next;
    }

    fn read_next_statement(&mut self, line: &str) -> Result<(), ParseErrorKind> {
        match grammar::match_statement(line) {
            Some(
                StatementFragment::Comment
                | StatementFragment::BlockComment
                | StatementFragment::Set,
            ) => {
                tracing::debug!(line = self.line, "skipping");
            }
            Some(StatementFragment::CreateTable { table }) => {
                let table = self.database.add_table(table)?;
                self.transition(State::ReadTableFields(table));
            }
            Some(StatementFragment::AlterTable { table }) => {
                let table = self.database.table_id(table).ok_or_else(|| {
                    SchemaError::UnresolvedReference {
                        table: table.to_string(),
                    }
                })?;
                self.transition(State::AlterTable(table));
            }
            None => return Err(ParseErrorKind::UnrecognizedStatement),
        }
        Ok(())
    }

    fn read_table_fields(&mut self, table: TableId, line: &str) -> Result<(), ParseErrorKind> {
        let declaration =
            grammar::match_field(line).ok_or(ParseErrorKind::UnrecognizedFieldDeclaration)?;
        self.transition(State::ReadFieldAttributes(table));

        let field = self
            .database
            .add_field(table, declaration.name, declaration.data_type)?;
        let next = read_field_attributes(field, declaration.rest, table)?;

        self.transition(next);
        Ok(())
    }

    fn read_close_paren(&mut self, line: &str) -> Result<(), ParseErrorKind> {
        if !grammar::match_close_paren(line) {
            return Err(ParseErrorKind::UnrecognizedTermination);
        }
        self.transition(State::ReadNextStatement);
        Ok(())
    }

    fn alter_table(&mut self, table: TableId, line: &str) -> Result<(), ParseErrorKind> {
        let alter = grammar::match_alter_clause(line).ok_or(ParseErrorKind::UnrecognizedAlterClause)?;

        match alter.clause {
            AlterClause::PrimaryKey { fields } => {
                self.database.set_primary_key(table, &fields)?;
            }
            AlterClause::Key {
                name,
                fields,
                unique,
            } => {
                self.database.add_key(table, name, &fields, unique)?;
            }
            AlterClause::Constraint {
                name,
                foreign_key,
                parent_table,
                parent_field,
                on_delete,
                on_update,
            } => {
                let actions = ReferentialActions {
                    on_delete: on_delete.map(str::to_string),
                    on_update: on_update.map(str::to_string),
                };
                self.database.add_constraint(
                    table,
                    name,
                    foreign_key,
                    parent_table,
                    parent_field,
                    actions,
                )?;
            }
        }

        if alter.terminator == Terminator::End {
            self.transition(State::ReadNextStatement);
        }
        Ok(())
    }
}

/// Apply attributes from `rest` to `field` until the line runs out.
fn read_field_attributes(
    field: &mut Field,
    mut rest: &str,
    table: TableId,
) -> Result<State, ParseErrorKind> {
    loop {
        match grammar::match_attribute(rest) {
            Some(AttributeStep::Attribute(attribute, remainder)) => {
                apply_attribute(field, attribute);
                rest = remainder;
            }
            Some(AttributeStep::NextField) => return Ok(State::ReadTableFields(table)),
            Some(AttributeStep::EndOfLine) => return Ok(State::ReadTableFieldsCloseParen(table)),
            None => return Err(ParseErrorKind::UnrecognizedFieldAttribute),
        }
    }
}

fn apply_attribute(field: &mut Field, attribute: Attribute<'_>) {
    match attribute {
        Attribute::NotNull => field.nullable = false,
        Attribute::Null => field.nullable = true,
        Attribute::Default(value) => field.default_value = Some(value.to_string()),
        Attribute::CharacterSet(value) => field.character_set = Some(value.to_string()),
        Attribute::Collate(value) => field.collation = Some(value.to_string()),
        Attribute::AutoIncrement => field.auto_increment = true,
    }
}

/// Parse an SQL dump held in memory.
pub fn process_sql(input: &str, database: Database) -> Result<Database, ParseError> {
    let mut parser = StatementParser::new(database);
    for (index, line) in input.lines().enumerate() {
        parser.feed(index + 1, line)?;
    }
    parser.finish()
}

/// Parse an SQL dump from any buffered reader, one line at a time.
pub fn process_reader<R: BufRead>(reader: R, database: Database) -> Result<Database, ParseError> {
    let mut parser = StatementParser::new(database);
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| ParseError {
            line: line_no,
            text: String::new(),
            reason: ParseErrorKind::Io(e),
        })?;
        parser.feed(line_no, &line)?;
    }
    parser.finish()
}
