use crate::error::{Result, SindexError};

const MIN_MEMORY_MIB: u32 = 16;
const MAX_MEMORY_MIB: u32 = 65536;

/// Build/search configuration (spec.md §6.5). The core never parses this
/// from a file or environment — that is a host/CLI concern explicitly out
/// of scope per §1 — it only validates what the host constructs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    memory_mib: u32,
    term_len_min: usize,
    term_len_max: usize,
    merge_fanin: usize,
    /// Term occurrence count (within the current build) past which a term
    /// is promoted to `TermKind::Frequent` regardless of the stop list
    /// (SPEC_FULL.md §11, grounded on `invert.c`'s frequent-term tracking).
    /// `u32::MAX` disables the feature, matching spec.md's default of not
    /// mentioning frequent-term detection at all.
    pub frequent_term_threshold: u32,
    pub cache_enable: bool,
    pub wildcard_max_expansion: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            memory_mib: 64,
            term_len_min: 2,
            term_len_max: 1024,
            merge_fanin: default_merge_fanin(),
            frequent_term_threshold: u32::MAX,
            cache_enable: true,
            wildcard_max_expansion: 10_000,
        }
    }
}

fn default_merge_fanin() -> usize {
    // "open-fd-limit - 15" per spec.md §6.5; we don't query rlimit here
    // (that's a host concern), so fall back to a conservative constant a
    // host can override.
    32
}

impl Config {
    pub fn memory_mib(&self) -> u32 {
        self.memory_mib
    }

    pub fn set_memory_mib(&mut self, value: u32) -> Result<()> {
        if !(MIN_MEMORY_MIB..=MAX_MEMORY_MIB).contains(&value) {
            return Err(SindexError::InvalidArgument(format!(
                "indexer.memory_mib must be in [{MIN_MEMORY_MIB}, {MAX_MEMORY_MIB}], got {value}"
            )));
        }
        self.memory_mib = value;
        Ok(())
    }

    pub fn memory_budget_bytes(&self) -> usize {
        self.memory_mib as usize * 1024 * 1024
    }

    pub fn term_len_min(&self) -> usize {
        self.term_len_min
    }

    pub fn term_len_max(&self) -> usize {
        self.term_len_max
    }

    pub fn set_term_len_bounds(&mut self, min_len: usize, max_len: usize) -> Result<()> {
        if min_len == 0 || min_len > max_len {
            return Err(SindexError::InvalidArgument(format!(
                "indexer.term_len_min/max invalid: {min_len}/{max_len}"
            )));
        }
        self.term_len_min = min_len;
        self.term_len_max = max_len;
        Ok(())
    }

    pub fn merge_fanin(&self) -> usize {
        self.merge_fanin
    }

    pub fn set_merge_fanin(&mut self, value: usize) -> Result<()> {
        if value < 2 {
            return Err(SindexError::InvalidArgument(
                "indexer.merge_fanin must be >= 2".to_string(),
            ));
        }
        self.merge_fanin = value;
        Ok(())
    }
}
