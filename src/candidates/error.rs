use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CandidateError {
    #[error("max_candidates must be at least 1")]
    NoSlots,
    #[error("min_group_diversity ({min_group_diversity}) cannot exceed max_candidates ({max_candidates})")]
    DiversityExceedsMax {
        min_group_diversity: usize,
        max_candidates: usize,
    },
    #[error("max_sample_age_ms {0} is out of range")]
    SampleAgeOutOfRange(u64),
}
