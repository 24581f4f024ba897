//! # fleetwatch-renderer
//!
//! Renders reconciled host records into the monitoring daemon's fixed
//! `define host { … }` block syntax, one output file per partition.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fleetwatch_core::{HostRecord, Schema, SplitBy};
//! use fleetwatch_renderer::Renderer;
//!
//! fn render_all(schema: Schema, hosts: &[HostRecord]) {
//!     let renderer = Renderer::new(schema, SplitBy::None);
//!     if let Ok(partitions) = renderer.partition(hosts) {
//!         for partition in &partitions {
//!             println!("{}: {} bytes", partition.file_name, renderer.render(partition).len());
//!         }
//!     }
//! }
//! ```

pub mod block;
pub mod engine;
pub mod error;

pub use block::render_host;
pub use engine::{
    file_name_for, is_generated_file_name, Partition, Renderer, FILE_EXTENSION, FILE_PREFIX,
    FRAGMENT_SUFFIX,
};
pub use error::RenderError;
