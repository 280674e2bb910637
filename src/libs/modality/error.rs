use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModalityError {
    /// A PSI value outside [0, 1], or not a finite number
    #[error("invalid observation at position {index}: {value} is not a finite value in [0, 1]")]
    InvalidObservation {
        /// Zero-based position in the PSI vector
        index: usize,
        value: f64,
    },
    /// A second assignment for an (event, group) already in the table
    #[error("duplicate entry for event {event} in group {group}")]
    DuplicateEntry { event: String, group: String },
    /// Rejected at construction time, never at run time
    #[error("invalid configuration: {0}")]
    Config(String),
}
