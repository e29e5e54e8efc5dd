//! Windowed exploration of pangenome assembly graphs.
//!
//! A [`session::Session`] keeps a bounded-radius window over a GFA file,
//! enriches the visible nodes with sequence metadata in the background, and
//! maps genome coordinates to nodes through a persisted index.

pub mod bookmarks;
pub mod bus;
pub mod cache;
pub mod config;
pub mod context;
pub mod genome_index;
pub mod gfa;
pub mod model;
pub mod paths;
pub mod progress;
pub mod query;
pub mod session;
pub mod store;
pub mod throttle;
pub mod util;
