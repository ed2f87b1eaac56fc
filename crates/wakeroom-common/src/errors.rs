#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("room not found: {0}")]
    RoomNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("store error: {0}")]
    Store(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed chat payload: {0}")]
    ProtocolViolation(String),

    #[error("connection closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum WakeroomError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
