//! Cache policy: TTLs and timeouts.
//!
//! Loaded from environment variables with development defaults, then
//! adjusted with builder setters.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use storefront_core::EntityType;

const DEFAULT_SINGLE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_COLLECTION_TTL: Duration = Duration::from_secs(3600);
// Review listings have always been cached for ten minutes.
const REVIEW_COLLECTION_TTL: Duration = Duration::from_secs(600);

/// Which kind of read a TTL applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadKind {
    Single,
    Collection,
}

/// TTLs for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub single: Duration,
    pub collection: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            single: DEFAULT_SINGLE_TTL,
            collection: DEFAULT_COLLECTION_TTL,
        }
    }
}

impl TtlPolicy {
    pub fn new(single: Duration, collection: Duration) -> Self {
        Self { single, collection }
    }

    pub fn for_kind(&self, kind: ReadKind) -> Duration {
        match kind {
            ReadKind::Single => self.single,
            ReadKind::Collection => self.collection,
        }
    }
}

/// Configuration for the read-through cache and invalidation coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePolicy {
    /// TTLs for entity types without an override.
    pub default_ttl: TtlPolicy,
    /// Per-entity-type TTL overrides.
    pub ttl_overrides: HashMap<EntityType, TtlPolicy>,
    /// Upper bound on any single backend call. A read that exceeds it is a
    /// miss; a write or delete that exceeds it is dropped.
    pub operation_timeout: Duration,
    /// Upper bound on an origin load.
    pub loader_timeout: Duration,
    /// Extra attempts for an invalidation delete before giving up.
    pub delete_retries: u32,
    /// How often a process-local backend sweeps expired entries.
    pub sweep_interval: Duration,
}

/// Overrides that apply unless configured otherwise.
fn builtin_overrides(default_ttl: TtlPolicy) -> HashMap<EntityType, TtlPolicy> {
    HashMap::from([(
        EntityType::Review,
        TtlPolicy {
            collection: REVIEW_COLLECTION_TTL,
            ..default_ttl
        },
    )])
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            default_ttl: TtlPolicy::default(),
            ttl_overrides: builtin_overrides(TtlPolicy::default()),
            operation_timeout: Duration::from_millis(250),
            loader_timeout: Duration::from_secs(5),
            delete_retries: 2,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CachePolicy {
    /// Create a new cache policy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Per-entity overrides use `STOREFRONT_CACHE_TTL_<ENTITY>_SINGLE_SECS`
    /// and `STOREFRONT_CACHE_TTL_<ENTITY>_COLLECTION_SECS`, where `<ENTITY>`
    /// is the uppercase entity name.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_ttl = TtlPolicy {
            single: env_duration_secs(
                "STOREFRONT_CACHE_TTL_SINGLE_SECS",
                defaults.default_ttl.single,
            ),
            collection: env_duration_secs(
                "STOREFRONT_CACHE_TTL_COLLECTION_SECS",
                defaults.default_ttl.collection,
            ),
        };

        let mut ttl_overrides = builtin_overrides(default_ttl);
        for entity_type in EntityType::ALL {
            let name = entity_type.as_str().to_ascii_uppercase();
            let single = env_parse::<u64>(&format!("STOREFRONT_CACHE_TTL_{}_SINGLE_SECS", name));
            let collection =
                env_parse::<u64>(&format!("STOREFRONT_CACHE_TTL_{}_COLLECTION_SECS", name));
            if single.is_some() || collection.is_some() {
                let base = ttl_overrides
                    .get(&entity_type)
                    .copied()
                    .unwrap_or(default_ttl);
                ttl_overrides.insert(
                    entity_type,
                    TtlPolicy {
                        single: single.map(Duration::from_secs).unwrap_or(base.single),
                        collection: collection
                            .map(Duration::from_secs)
                            .unwrap_or(base.collection),
                    },
                );
            }
        }

        Self {
            default_ttl,
            ttl_overrides,
            operation_timeout: env_duration_millis(
                "STOREFRONT_CACHE_OP_TIMEOUT_MS",
                defaults.operation_timeout,
            ),
            loader_timeout: env_duration_millis(
                "STOREFRONT_CACHE_LOADER_TIMEOUT_MS",
                defaults.loader_timeout,
            ),
            delete_retries: env_parse("STOREFRONT_CACHE_DELETE_RETRIES")
                .unwrap_or(defaults.delete_retries),
            sweep_interval: env_duration_secs(
                "STOREFRONT_CACHE_SWEEP_SECS",
                defaults.sweep_interval,
            ),
        }
    }

    /// TTL for a read of `kind` on `entity_type`.
    pub fn ttl(&self, entity_type: EntityType, kind: ReadKind) -> Duration {
        self.ttl_overrides
            .get(&entity_type)
            .unwrap_or(&self.default_ttl)
            .for_kind(kind)
    }

    /// Set the default TTLs.
    pub fn with_default_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Override TTLs for one entity type.
    pub fn with_entity_ttl(mut self, entity_type: EntityType, ttl: TtlPolicy) -> Self {
        self.ttl_overrides.insert(entity_type, ttl);
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_loader_timeout(mut self, timeout: Duration) -> Self {
        self.loader_timeout = timeout;
        self
    }

    pub fn with_delete_retries(mut self, retries: u32) -> Self {
        self.delete_retries = retries;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

// ============================================================================
// ENV HELPERS
// ============================================================================

pub(crate) fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

pub(crate) fn env_string_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn env_duration_secs(name: &str, default: Duration) -> Duration {
    env_parse::<u64>(name)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

pub(crate) fn env_duration_millis(name: &str, default: Duration) -> Duration {
    env_parse::<u64>(name)
        .map(Duration::from_millis)
        .unwrap_or(default)
}
