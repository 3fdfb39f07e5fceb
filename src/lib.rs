pub mod grammar;
pub mod observer;
pub mod parser;
pub mod report;
pub mod schema;

use wasm_bindgen::prelude::*;

pub use observer::{NoopObserver, SchemaObserver, TracingObserver};
pub use parser::{ParseError, ParseErrorKind, StatementParser, process_reader, process_sql};
pub use schema::{Database, ErrorKind, SchemaError};

use report::Detail;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse an SQL dump and render the schema report
#[wasm_bindgen(js_name = "sqlSchemaReport")]
pub fn sql_schema_report(
    source: &str,
    name: Option<String>,
    detail: Option<String>,
) -> Result<String, String> {
    let database = Database::new(name.unwrap_or_else(|| "schema.sql".to_string()));
    let database = process_sql(source, database).map_err(|e| e.to_string())?;

    let detail = detail
        .as_deref()
        .and_then(Detail::from_str)
        .unwrap_or(Detail::All);

    Ok(report::render(&database, detail))
}
