use thiserror::Error;

/// Rejections raised while turning list parameters into SQL
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Cannot filter or sort on column: {0}")]
    ColumnNotAllowed(String),

    #[error("Invalid filter: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid page window: {0}")]
    InvalidWindow(String),
}
