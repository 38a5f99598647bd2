/// Record cap used when the caller does not ask for a specific amount.
pub const DEFAULT_MAX_RECORDS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("keyword must not be empty")]
    EmptyKeyword,
    #[error("max records must be greater than zero")]
    ZeroMaxRecords,
}

/// What one run collects. Fixed for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTarget {
    keyword: String,
    max_records: usize,
}

impl RunTarget {
    pub fn new(keyword: impl Into<String>, max_records: usize) -> Result<Self, TargetError> {
        let keyword = keyword.into().trim().to_string();
        if keyword.is_empty() {
            return Err(TargetError::EmptyKeyword);
        }
        if max_records == 0 {
            return Err(TargetError::ZeroMaxRecords);
        }
        Ok(Self {
            keyword,
            max_records,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }
}
