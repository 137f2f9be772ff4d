use packet_db::DbError;
use packet_types::models::RewardId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog has no common rewards")]
    NoCommon,

    #[error("catalog must have exactly one ultra-rare reward, found {0}")]
    UltraRareCount(usize),

    #[error("duplicate reward id {0}")]
    DuplicateId(RewardId),
}

#[derive(Debug, Error)]
pub enum GrantError {
    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("roller produced id {0} which is not in the catalog")]
    UnknownReward(RewardId),

    #[error("grant timed out")]
    Timeout,

    #[error(transparent)]
    Storage(#[from] DbError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),

    #[error("notification timed out")]
    Timeout,
}
