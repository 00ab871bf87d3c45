//! Component configuration with defaults.
//!
//! Configuration *loading* (env, files) belongs to the embedding
//! application; this module only defines the tunables each component takes.

use std::time::Duration;

use crate::constants::{
    DEFAULT_KEYWORD_WEIGHT, DEFAULT_L1_TTL, DEFAULT_L3_TTL, DEFAULT_LTM_TIMEOUT,
    DEFAULT_PROACTIVE_INTERVAL, DEFAULT_STM_TIER1_MAX_TURNS, DEFAULT_STM_TIER2_SUMMARY_TURNS,
    DEFAULT_STM_TIER3_SUMMARY_TURNS, DEFAULT_STM_TIMEOUT, DEFAULT_STM_TTL, DEFAULT_VECTOR_WEIGHT,
    DEFAULT_WORKER_PREFETCH, EXTRACTION_QUEUE, FAVORITE_SUMMARY_QUERY, PROACTIVE_SWEEP_LIMIT,
    PROACTIVE_SWEEP_THRESHOLD, SEMANTIC_MAX_QUERIES_PER_USER, SEMANTIC_SIMILARITY_THRESHOLD,
};

/// Cache tier tunables.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for L1 search-result entries.
    pub l1_ttl: Duration,
    /// TTL for L3 embedding entries.
    pub l3_ttl: Duration,
    /// Minimum cosine similarity for a semantic-cache hit.
    pub semantic_similarity_threshold: f32,
    /// Cached query vectors retained per user.
    pub semantic_max_queries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_ttl: DEFAULT_L1_TTL,
            l3_ttl: DEFAULT_L3_TTL,
            semantic_similarity_threshold: SEMANTIC_SIMILARITY_THRESHOLD,
            semantic_max_queries: SEMANTIC_MAX_QUERIES_PER_USER,
        }
    }
}

/// Short-term-memory tier thresholds.
#[derive(Debug, Clone)]
pub struct StmConfig {
    /// Maximum turns held verbatim in tier 1.
    pub tier1_max_turns: usize,
    /// Buffered overflow turns that trigger a tier-2 summarisation.
    pub tier2_summary_turns: usize,
    /// Estimated summarised turns that promote tier 2 into tier 3.
    pub tier3_summary_turns: usize,
    /// TTL of the persisted session state.
    pub ttl: Duration,
}

impl Default for StmConfig {
    fn default() -> Self {
        Self {
            tier1_max_turns: DEFAULT_STM_TIER1_MAX_TURNS,
            tier2_summary_turns: DEFAULT_STM_TIER2_SUMMARY_TURNS,
            tier3_summary_turns: DEFAULT_STM_TIER3_SUMMARY_TURNS,
            ttl: DEFAULT_STM_TTL,
        }
    }
}

/// Hybrid search weighting. `vector_weight + keyword_weight` should be ~1.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    pub enabled: bool,
    pub vector_weight: f32,
    pub keyword_weight: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vector_weight: DEFAULT_VECTOR_WEIGHT,
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
        }
    }
}

/// Per-branch deadlines for the combined STM + LTM search.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub stm_timeout: Duration,
    pub ltm_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stm_timeout: DEFAULT_STM_TIMEOUT,
            ltm_timeout: DEFAULT_LTM_TIMEOUT,
        }
    }
}

/// Extraction worker queue settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queue: String,
    pub prefetch: u16,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue: EXTRACTION_QUEUE.to_string(),
            prefetch: DEFAULT_WORKER_PREFETCH,
        }
    }
}

/// Proactive favourite-summary refresh settings.
#[derive(Debug, Clone)]
pub struct ProactiveConfig {
    pub interval: Duration,
    pub favorite_query: String,
    pub sweep_limit: usize,
    pub sweep_threshold: f32,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PROACTIVE_INTERVAL,
            favorite_query: FAVORITE_SUMMARY_QUERY.to_string(),
            sweep_limit: PROACTIVE_SWEEP_LIMIT,
            sweep_threshold: PROACTIVE_SWEEP_THRESHOLD,
        }
    }
}

/// Aggregate configuration for the whole service.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    pub cache: CacheConfig,
    pub stm: StmConfig,
    pub hybrid: HybridConfig,
    pub orchestrator: OrchestratorConfig,
    pub worker: WorkerConfig,
    pub proactive: ProactiveConfig,
}
