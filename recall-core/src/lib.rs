#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]

//! # Recall Core
//!
//! Long-term and short-term memory pipeline for conversational agents.
//!
//! Conversations are ingested through a durable queue, distilled into
//! user facts by an external language model, persisted across a vector
//! index, a graph store, and a relational metadata store, and served back
//! through a layered cache with sub-second semantic search.
//!
//! ## Core Concepts
//!
//! - **Facts**: extracted user statements with category, confidence,
//!   entities, and an embedding
//! - **Short-term memory**: per-session rolling context in three
//!   summarisation tiers
//! - **Cache tiers**: request scope → distributed cache → materialised
//!   summaries → embedding memoisation → the vector index itself
//! - **Jobs**: asynchronous extraction tracked through a monotonic state
//!   machine
//!
//! ## Module Organization
//!
//! ### Primary APIs
//! - [`service`]: composed facade wiring configuration and backends
//! - [`search`]: cache-walking search and the parallel STM/LTM fan-out
//! - [`repository`]: tri-store fact persistence and hybrid search
//! - [`stm`]: short-term-memory state machine
//! - [`worker`]: queue consumer for extraction jobs
//!
//! ### Support Modules
//! - [`stores`]: capability traits for the external stores
//! - [`cache`]: the individual cache tiers
//! - [`embeddings`]: embedding provider trait and similarity math
//! - [`retry`] / [`breaker`]: resilience primitives
//! - [`jobs`]: job lifecycle management
//! - [`proactive`]: scheduled favourite-summary warming
//!
//! ## Quick Start
//!
//! ```no_run
//! use recall_core::config::MemoryConfig;
//! use recall_core::service::{Backends, MemoryService};
//! use recall_core::types::Role;
//! # async fn example(backends: Backends) -> recall_core::Result<()> {
//! let service = MemoryService::new(MemoryConfig::default(), backends);
//! service.init().await?;
//!
//! // Feed the session's short-term memory.
//! service.add_message("session-1", "user-1", Role::User, "I love pizza").await?;
//!
//! // Combined short-term + long-term search.
//! let results = service.search("user-1", "session-1", "what do I like?", 10).await?;
//! println!("{} results", results.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result`]. Cache failures never surface:
//! every tier degrades to a miss. Store failures on the search miss path
//! and provider failures after retry exhaustion do propagate.

pub mod breaker;
pub mod cache;
pub mod config;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod extraction;
pub mod jobs;
pub mod proactive;
pub mod repository;
pub mod retry;
pub mod search;
pub mod service;
pub mod stm;
pub mod stores;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use breaker::{BreakerRegistry, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use cache::{EmbeddingCache, RemoteCache, RequestCache, SemanticCache, SummaryCache};
pub use config::MemoryConfig;
pub use embeddings::{cosine_similarity, Embedder, ResilientEmbedder};
pub use error::{Error, Result};
pub use extraction::{FactExtractor, ResilientExtractor};
pub use jobs::{ExtractionJobMessage, JobManager, JobUpdate};
pub use proactive::ProactiveCacher;
pub use repository::{FactRepository, HybridSearch};
pub use retry::{RetryConfig, RetryPolicy};
pub use search::{MemoryOrchestrator, SearchOrchestrator};
pub use service::{Backends, MemoryService};
pub use stm::{StmContext, StmMessage, StmStore, Summarizer};
pub use stores::{
    Delivery, Disposition, FactRelation, GraphStore, KeyValueStore, KeywordHit, MessageQueue,
    MetadataStore, QueueConsumer, VectorHit, VectorIndex, VectorRecord,
};
pub use types::{
    ConversationTurn, ExtractionRequest, Fact, FactCandidate, FactCategory, FavoriteSummary, Job,
    JobStatus, Metadata, Role, SearchQuery, SearchResult,
};
pub use worker::ExtractionWorker;
