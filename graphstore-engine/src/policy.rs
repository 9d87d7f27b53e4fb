use graphstore_model::CacheLevel;

/// Which tiers hold an object type's body, derived from its cache level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Reads look in the cache before the primary store.
    pub read_cache: bool,
    /// Body writes go to the cache.
    pub write_cache: bool,
    /// Body writes go to the primary store.
    pub write_primary: bool,
}

impl TierPolicy {
    pub fn for_level(level: CacheLevel) -> Self {
        match level {
            CacheLevel::None => Self {
                read_cache: false,
                write_cache: false,
                write_primary: true,
            },
            CacheLevel::External => Self {
                read_cache: true,
                write_cache: true,
                write_primary: true,
            },
            CacheLevel::OnlyCache => Self {
                read_cache: true,
                write_cache: true,
                write_primary: false,
            },
        }
    }
}
