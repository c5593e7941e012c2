//! tts-audiobook - turn e-books into narrated audiobooks.
//!
//! The core is [`text`], which splits chapter text into segments no longer
//! than a configured number of characters, and [`assembler`], which groups
//! those segments into a [`book::Book`]. Extraction, synthesis, and packaging
//! wrap external tools.

pub mod assembler;
pub mod audio;
pub mod book;
pub mod config;
pub mod epub;
pub mod error;
pub mod narrator;
pub mod text;
pub mod tts;
