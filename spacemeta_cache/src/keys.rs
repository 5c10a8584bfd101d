use std::sync::Arc;

pub const DEFAULT_KEY_PREFIX: &str = "bkmonitorv3:spaces";

const CHANNEL_SUFFIX: &str = "channel";

/// The hashes written by the routing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// space uid -> routed tables and their filters
    SpaceToResultTable,
    /// data label -> table ids
    DataLabelToResultTable,
    /// table id -> physical storage detail
    ResultTableDetail,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpaceToResultTable => "space_to_result_table",
            Self::DataLabelToResultTable => "data_label_to_result_table",
            Self::ResultTableDetail => "result_table_detail",
        }
    }
}

/// Key layout under a configurable prefix.
#[derive(Debug, Clone)]
pub struct CacheKeys {
    prefix: Arc<str>,
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl CacheKeys {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: Arc::from(prefix.as_ref().trim_end_matches(':')),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key(&self, kind: CacheKind) -> String {
        format!("{}:{}", self.prefix, kind.as_str())
    }

    pub fn channel(&self, kind: CacheKind) -> String {
        format!("{}:{}:{CHANNEL_SUFFIX}", self.prefix, kind.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let keys = CacheKeys::default();
        assert_eq!(
            keys.key(CacheKind::SpaceToResultTable),
            "bkmonitorv3:spaces:space_to_result_table"
        );
        assert_eq!(
            keys.channel(CacheKind::ResultTableDetail),
            "bkmonitorv3:spaces:result_table_detail:channel"
        );
    }

    #[test]
    fn trailing_separator_ignored() {
        let keys = CacheKeys::new("test:spaces:");
        assert_eq!(
            keys.key(CacheKind::DataLabelToResultTable),
            "test:spaces:data_label_to_result_table"
        );
    }
}
