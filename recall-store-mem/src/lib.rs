#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

//! # Recall Storage - In-Memory
//!
//! In-memory implementations of every collaborator interface the memory
//! pipeline consumes: key-value store, vector index, graph store,
//! metadata store, and message queue, plus a deterministic embedder and a
//! scripted extractor.
//!
//! These backends carry the full contract semantics (TTL expiry,
//! monotonic version tags, prefetch windows, requeue-to-front) so the
//! pipeline can be exercised end-to-end in a single process: unit tests,
//! integration tests, and local development all run against them.

mod embedder;
mod extractor;
mod graph;
mod kv;
mod metadata;
mod queue;
mod vector;

pub use embedder::HashEmbedder;
pub use extractor::ScriptedExtractor;
pub use graph::InMemoryGraphStore;
pub use kv::InMemoryKv;
pub use metadata::InMemoryMetadataStore;
pub use queue::InMemoryQueue;
pub use vector::InMemoryVectorIndex;
