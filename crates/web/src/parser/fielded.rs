//! Delimiter separated text (`text/csv`, `text/tsv`) into an array of records.
//!
//! The dialect comes from the content type and can be tuned per request:
//!
//! | header                | meaning                                          |
//! |-----------------------|--------------------------------------------------|
//! | `x-content-delimiter` | field delimiter, tab for TSV and comma otherwise |
//! | `x-content-quote`     | quote character, `"` by default                  |
//! | `x-content-escape`    | escape character, `\` by default                 |
//! | `x-content-columns`   | `true`, `false` or a comma separated name list   |
//!
//! Only the first byte of the delimiter, quote and escape values is used.

use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Value, json};
use tracing::trace;

use crate::body::BodyValue;
use crate::error::BodyError;
use crate::request::Request;

const DELIMITER: &str = "x-content-delimiter";
const QUOTE: &str = "x-content-quote";
const ESCAPE: &str = "x-content-escape";
const COLUMNS: &str = "x-content-columns";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Columns {
    /// The first row names the columns.
    Header,
    /// No names, every row is kept as a list of fields.
    Raw,
    Named(Vec<String>),
}

#[derive(Debug)]
struct Dialect {
    delimiter: u8,
    quote: u8,
    escape: u8,
    columns: Columns,
}

impl Dialect {
    fn from_request(req: &Request, content_type: &str) -> Self {
        let byte_of = |name: &str| req.header().header_str(name).and_then(|value| value.as_bytes().first().copied());

        let default_delimiter = if content_type == "text/tsv" { b'\t' } else { b',' };

        let columns = match req.header().header_str(COLUMNS).map(str::trim) {
            None | Some("" | "true") => Columns::Header,
            Some("false") => Columns::Raw,
            Some(names) => Columns::Named(names.split(',').map(|name| name.trim().to_string()).collect()),
        };

        Self {
            delimiter: byte_of(DELIMITER).unwrap_or(default_delimiter),
            quote: byte_of(QUOTE).unwrap_or(b'"'),
            escape: byte_of(ESCAPE).unwrap_or(b'\\'),
            columns,
        }
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder.delimiter(self.delimiter).quote(self.quote).has_headers(self.columns == Columns::Header);
        if self.escape == self.quote {
            builder.double_quote(true);
        } else {
            builder.escape(Some(self.escape)).double_quote(false);
        }
        builder
    }
}

pub(crate) fn parse(req: &mut Request) -> Result<(), BodyError> {
    let Some(text) = req.body().as_text().filter(|text| !text.is_empty()) else {
        return Ok(());
    };

    let dialect = Dialect::from_request(req, &req.content_type());
    trace!(?dialect, "parse fielded text body");

    let records = read_records(text, &dialect)?;
    req.set_body(BodyValue::Structured(Value::Array(records)));
    Ok(())
}

fn read_records(text: &str, dialect: &Dialect) -> Result<Vec<Value>, csv::Error> {
    let mut reader = dialect.reader_builder().from_reader(text.as_bytes());

    let names = match &dialect.columns {
        Columns::Header => Some(reader.headers()?.iter().map(ToString::to_string).collect::<Vec<_>>()),
        Columns::Named(names) => Some(names.clone()),
        Columns::Raw => None,
    };

    let mut records = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let value = match &names {
            Some(names) => keyed(names, &record, index),
            None => json!({ "index": index, "fields": record.iter().collect::<Vec<_>>() }),
        };
        records.push(value);
    }
    Ok(records)
}

fn keyed(names: &[String], record: &StringRecord, index: usize) -> Value {
    let mut object = Map::with_capacity(names.len() + 1);
    for (name, field) in names.iter().zip(record.iter()) {
        object.insert(name.clone(), Value::String(field.to_string()));
    }
    object.insert("index".to_string(), json!(index));
    Value::Object(object)
}
