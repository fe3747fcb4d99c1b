mod error;
mod scorer;
mod types;

pub use error::CandidateError;
pub use scorer::CandidateScorer;
pub use types::{Candidate, CandidateConfig, CandidateList, RankedCandidate};
