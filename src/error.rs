use thiserror::Error;

/// Errors for modal lifecycle operations
#[derive(Debug, Error)]
pub enum ModalError {
    #[error("Modal is already open")]
    AlreadyOpen,
    #[error("Modal has been closed and cannot be reused")]
    Closed,
    #[error("Dialog widget error: {0}")]
    Widget(#[from] anyhow::Error),
}

/// Result alias for modal operations
pub type ModalResult<T> = std::result::Result<T, ModalError>;
