//! Extraction job: download CSV objects from an S3-compatible bucket and dump
//! database tables to CSV, both into one export tree on a shared volume.

pub mod config;
pub mod deploy;
pub mod job;
pub mod progress;
