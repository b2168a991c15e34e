use thiserror::Error;

use crate::model::ElevatorId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown elevator {0}")]
    UnknownElevator(ElevatorId),
    #[error("No task to run, remaining tasks: {}", remaining.join(", "))]
    SchedulerDeadlock { remaining: Vec<String> },
    #[error("Corrupt fingerprint record for task '{task}': {reason}")]
    CorruptFingerprint { task: String, reason: String },
    #[error("Corrupt artifact {path}: {reason}")]
    CorruptArtifact { path: String, reason: String },
    #[error("Task '{task}' did not produce artifact '{artifact}'")]
    MissingArtifact { task: String, artifact: String },
}
