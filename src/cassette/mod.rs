//! HTTP record/replay cassettes.
//!
//! A cassette is a YAML file of port interactions. Recording wraps the live
//! transport and captures every exchange; replaying serves those exchanges
//! back in order, which makes health and identity flows reproducible offline.

pub mod format;
pub mod recorder;
pub mod replayer;
