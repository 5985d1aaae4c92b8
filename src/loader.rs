use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::container::{RawValue, Record};
use crate::domain::TableError;

#[derive(Debug, PartialEq)]
enum FileType {
    JSON,
    JSONL,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    file_type: FileType,
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf, TableError> {
    let expanded =
        shellexpand::full(raw).map_err(|e| TableError::LoadingFailed(e.to_string()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Reads all records of a `.json` (one array) or `.jsonl`/`.ndjson` (one
/// value per line) file. The first value is the header.
pub fn load_records(path: &Path) -> Result<Vec<Record>, TableError> {
    let file_info = get_file_info(path.to_path_buf())?;
    let start_time = Instant::now();
    let content = fs::read_to_string(&file_info.path)?;

    let values = match file_info.file_type {
        FileType::JSON => match serde_json::from_str::<Value>(&content)? {
            Value::Array(values) => values,
            other => {
                return Err(TableError::MalformedRecord(format!(
                    "expected an array of records, got {}",
                    type_name(&other)
                )));
            }
        },
        FileType::JSONL => content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str::<Value>)
            .collect::<Result<Vec<_>, _>>()?,
    };

    let records = parse_records(values)?;
    info!(
        "Read {} records ({} bytes) from {:?} in {}ms",
        records.len(),
        file_info.file_size,
        file_info.path,
        start_time.elapsed().as_millis()
    );
    Ok(records)
}

/// Turns raw JSON values into records. The header may be given either as an
/// object whose keys are the fields or as an array of field names.
pub fn parse_records(values: Vec<Value>) -> Result<Vec<Record>, TableError> {
    let mut values = values.into_iter();
    let Some(header) = values.next() else {
        return Ok(Vec::new());
    };
    let header = match header {
        Value::Array(names) => header_from_names(names)?,
        other => Record::try_from(other)?,
    };
    debug!("Header fields: {:?}", header.keys());

    std::iter::once(Ok(header))
        .chain(values.map(Record::try_from))
        .collect()
}

fn header_from_names(names: Vec<Value>) -> Result<Record, TableError> {
    names
        .into_iter()
        .map(|name| match name {
            Value::String(s) => Ok((s, RawValue::Absent)),
            other => Err(TableError::MalformedRecord(format!(
                "header field names must be strings, got {other}"
            ))),
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn detect_file_type(path: &Path) -> Result<FileType, TableError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("JSON") => Ok(FileType::JSON),
        Some("JSONL") | Some("NDJSON") => Ok(FileType::JSONL),
        _ => Err(TableError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TableError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TableError::FileNotFound,
        ErrorKind::PermissionDenied => TableError::PermissionDenied,
        _ => TableError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TableError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_json_array_with_object_header() {
        let file = write_file(
            ".json",
            r#"[{"name": null, "price": null}, {"name": "Foo", "price": "12"}]"#,
        );
        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keys(), vec!["name".to_string(), "price".to_string()]);
        assert_eq!(records[1].get("price"), Some(&RawValue::from("12")));
    }

    #[test]
    fn header_may_list_field_names() {
        let file = write_file(".json", r#"[["price", "name"], {"name": "Foo", "price": 3}]"#);
        let records = load_records(file.path()).unwrap();
        assert_eq!(records[0].keys(), vec!["price".to_string(), "name".to_string()]);
        assert!(records[0].values().all(RawValue::is_absent));
    }

    #[test]
    fn loads_json_lines() {
        let file = write_file(".jsonl", "[\"a\", \"b\"]\n\n{\"a\": 1, \"b\": 2}\n{\"a\": 3}\n");
        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].get("a"), Some(&RawValue::from(3_i64)));
    }

    #[test]
    fn rejects_non_array_document() {
        let file = write_file(".json", r#"{"name": "Foo"}"#);
        let err = load_records(file.path()).unwrap_err();
        assert!(matches!(err, TableError::MalformedRecord(ref m) if m.contains("an object")));
    }

    #[test]
    fn rejects_non_string_header_names() {
        let err = parse_records(vec![serde_json::json!(["a", 1])]).unwrap_err();
        assert!(matches!(err, TableError::MalformedRecord(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        let file = write_file(".json", "[{");
        assert!(matches!(
            load_records(file.path()),
            Err(TableError::JsonError(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_records(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, TableError::FileNotFound));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = write_file(".csv", "name,price\n");
        assert!(matches!(
            load_records(file.path()),
            Err(TableError::UnknownFileType)
        ));
    }

    #[test]
    fn empty_input_gives_no_records() {
        assert!(parse_records(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn plain_paths_are_kept() {
        let expanded = expand_path("plain/products.json").unwrap();
        assert_eq!(expanded, PathBuf::from("plain/products.json"));
    }
}
