//! On-disk output: the muxed recording container and its metadata
//! sidecar.

pub mod metadata;
pub mod muxed_writer;

pub use metadata::{read_sidecar, write_sidecar};
pub use muxed_writer::{probe_container, ContainerSummary, FinalizedFile, MuxedFileWriter};
