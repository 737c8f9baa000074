//! Low-level services: output formats, image codecs and the result store

pub mod format;
pub mod io;
pub mod store;

pub use format::{OutputFormat, OutputFormatHandler};
pub use io::{run_blocking, ImageCodec};
pub use store::{ResultStore, PROCESSED_PREFIX, UPLOADS_PREFIX};
