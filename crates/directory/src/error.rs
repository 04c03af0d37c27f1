use chatrelay_common::UserId;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user {0} already has an active session")]
    SessionExists(UserId),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
