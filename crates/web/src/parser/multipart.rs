use http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use micro_ingest_http::protocol::ParseError;
use multer::{Constraints, Multipart, SizeLimit};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, trace};

use crate::config::BodyParserConfig;
use crate::error::BodyError;
use crate::parser::{insert_multi, store};
use crate::request::{Request, UploadedFile};

/// Reads a `multipart/form-data` body straight from the body stream.
///
/// Text fields become the body and are merged into the parameters, file fields are
/// kept on the request as [`UploadedFile`]s.
pub(crate) async fn parse(req: &mut Request, config: &BodyParserConfig) -> Result<(), BodyError> {
    let content_type = req.header().header_str(CONTENT_TYPE.as_str()).unwrap_or_default();
    let boundary = multer::parse_boundary(content_type).map_err(invalid)?;

    let Some(body) = req.take_body_stream() else {
        return Ok(());
    };

    let mut constraints = Constraints::new();
    if config.max_body_size > 0 {
        constraints = constraints.size_limit(SizeLimit::new().whole_stream(config.max_body_size));
    }
    let mut multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut fields = Map::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| classify(e, config))? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(ToString::to_string);
                let data = field.bytes().await.map_err(|e| classify(e, config))?;
                trace!(name = %name, file_name = %file_name, size = data.len(), "read multipart file");
                req.push_file(UploadedFile { name, file_name, content_type, data });
            }
            None => {
                let text = field.text().await.map_err(|e| classify(e, config))?;
                insert_multi(&mut fields, name, Value::String(text));
            }
        }
    }

    debug!(fields = fields.len(), files = req.files().len(), "multipart body parsed");
    store(req, Value::Object(fields), config);
    Ok(())
}

fn classify(e: multer::Error, config: &BodyParserConfig) -> BodyError {
    match e {
        multer::Error::StreamSizeExceeded { .. } => BodyError::payload_too_large(config.max_body_size),
        multer::Error::StreamReadFailed(source) => match source.downcast::<ParseError>() {
            Ok(transport) => BodyError::Transport(*transport),
            Err(other) => invalid(other),
        },
        other => invalid(other),
    }
}

fn invalid(e: impl fmt::Display) -> BodyError {
    BodyError::invalid_content(format!("Invalid multipart body: {e}"))
}
