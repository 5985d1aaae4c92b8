use derive_setters::Setters;
use thiserror::Error;

/// Name of a column, taken from the keys of the header record.
pub type Field = String;

pub const HELP_TEXT: &str =
    " <←/→> Column  <s/Enter> Sort  <Click header> Sort  <↑/↓> Scroll  <q> Quit ";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("unknown field '{0}'")]
    UnknownField(Field),
    #[error("field '{0}' already exists")]
    DuplicateField(Field),
    #[error("no records loaded yet")]
    NotLoaded,
    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type, expected .json, .jsonl or .ndjson")]
    UnknownFileType,
}

#[derive(Debug, Clone, Setters)]
pub struct TableConfig {
    /// Report keys of data records that are not part of the header.
    pub verify_no_leftover_keys: bool,
    /// Field sorted (without reversing) right after loading.
    #[setters(strip_option, into)]
    pub initial_sort: Option<Field>,
    /// Display text for cells without a value.
    #[setters(into)]
    pub absent_placeholder: String,
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            verify_no_leftover_keys: true,
            initial_sort: None,
            absent_placeholder: String::new(),
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    SortSelected,
    Click(u16, u16),
    Resize(usize, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_verify_leftover_keys() {
        let cfg = TableConfig::default();
        assert!(cfg.verify_no_leftover_keys);
        assert!(cfg.initial_sort.is_none());
        assert_eq!(cfg.absent_placeholder, "");
    }

    #[test]
    fn config_setters_chain() {
        let cfg = TableConfig::default()
            .verify_no_leftover_keys(false)
            .initial_sort("price")
            .absent_placeholder("∅");
        assert!(!cfg.verify_no_leftover_keys);
        assert_eq!(cfg.initial_sort.as_deref(), Some("price"));
        assert_eq!(cfg.absent_placeholder, "∅");
    }

    #[test]
    fn errors_name_the_field() {
        let err = TableError::UnknownField("weight".into());
        assert_eq!(err.to_string(), "unknown field 'weight'");
    }
}
