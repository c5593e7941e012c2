use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    #[error("max_length must be a positive number of characters (got {0})")]
    InvalidMaxLength(usize),

    #[error("Sentence detector error: {0}")]
    Detector(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("Chapter {index} (\"{title}\") already has an audio path: {existing}")]
    AudioPathAlreadySet {
        index: usize,
        title: String,
        existing: String,
    },

    #[error("Chapter index {0} is out of range")]
    ChapterOutOfRange(usize),
}

pub type Result<T> = std::result::Result<T, SegmentError>;
