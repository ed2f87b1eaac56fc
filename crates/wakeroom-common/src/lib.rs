pub mod clock;
pub mod errors;
pub mod id;

pub use errors::{DirectoryError, SessionError, WakeroomError};
pub use id::{new_id, ConnectionId};

pub type Result<T> = std::result::Result<T, WakeroomError>;
