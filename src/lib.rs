//! Recognize a standard-document index mark (spec code plus page code) from OCR text
//! fragments and resolve it to the matching page file on disk.

pub mod confidence;
pub mod config;
pub mod file_index;
pub mod fragment;
pub mod geometry;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod vision;
