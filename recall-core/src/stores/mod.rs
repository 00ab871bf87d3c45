//! # Store Abstractions
//!
//! Capability interfaces for the external stores the pipeline writes to and
//! reads from: the distributed key-value cache, the vector index, the graph
//! store, the relational metadata store, and the durable message queue.
//!
//! Concrete implementations are injected at startup; the pipeline never
//! talks to a wire protocol directly.

pub mod graph;
pub mod kv;
pub mod metadata;
pub mod queue;
pub mod vector;

pub use graph::{FactRelation, GraphStore};
pub use kv::KeyValueStore;
pub use metadata::{KeywordHit, MetadataStore};
pub use queue::{Delivery, Disposition, MessageQueue, QueueConsumer};
pub use vector::{VectorHit, VectorIndex, VectorRecord};
