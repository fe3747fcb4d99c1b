use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::types::{Candidate, CandidateConfig, CandidateList, RankedCandidate};
use crate::signal::SatelliteGroup;

/// Pure ranking over a snapshot of triggered candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateScorer {
    config: CandidateConfig,
}

impl CandidateScorer {
    pub fn new(config: CandidateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CandidateConfig {
        &self.config
    }

    /// Ranks triggered candidates and truncates them to `max_candidates`.
    ///
    /// Ordering is priority, then RSRP, then satellite id. Before filling by
    /// rank, the best candidate of each not-yet-covered group is taken until
    /// `min_group_diversity` groups are represented or the groups run out.
    pub fn rank<I>(&self, receiver_id: &str, evaluated_at: Option<DateTime<Utc>>, candidates: I) -> CandidateList
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut ranked = merge_by_satellite(candidates);
        ranked.sort_by(by_rank);

        let max = self.config.max_candidates;
        let diversity = self.config.min_group_diversity.min(max);
        let mut picked = vec![false; ranked.len()];
        let mut covered: BTreeSet<&SatelliteGroup> = BTreeSet::new();

        for (i, candidate) in ranked.iter().enumerate() {
            if covered.len() >= diversity {
                break;
            }
            if covered.insert(&candidate.group) {
                picked[i] = true;
            }
        }

        let mut remaining = max.saturating_sub(covered.len());
        for slot in picked.iter_mut() {
            if remaining == 0 {
                break;
            }
            if !*slot {
                *slot = true;
                remaining -= 1;
            }
        }

        let candidates = ranked
            .into_iter()
            .zip(picked)
            .filter_map(|(candidate, keep)| keep.then_some(candidate))
            .enumerate()
            .map(|(rank, mut candidate)| {
                candidate.rank = rank + 1;
                candidate
            })
            .collect();

        CandidateList {
            receiver_id: receiver_id.to_string(),
            evaluated_at,
            candidates,
        }
    }
}

fn merge_by_satellite<I>(candidates: I) -> Vec<RankedCandidate>
where
    I: IntoIterator<Item = Candidate>,
{
    let mut merged: BTreeMap<String, RankedCandidate> = BTreeMap::new();
    for candidate in candidates {
        let priority = candidate.event_type.priority();
        match merged.get_mut(&candidate.satellite_id) {
            Some(entry) => {
                if !entry.event_types.contains(&candidate.event_type) {
                    entry.event_types.push(candidate.event_type);
                    entry.event_types.sort();
                }
                entry.priority = entry.priority.max(priority);
                entry.rsrp_dbm = entry.rsrp_dbm.max(candidate.rsrp_dbm);
            }
            None => {
                merged.insert(
                    candidate.satellite_id.clone(),
                    RankedCandidate {
                        rank: 0,
                        satellite_id: candidate.satellite_id,
                        group: candidate.group,
                        event_types: vec![candidate.event_type],
                        priority,
                        rsrp_dbm: candidate.rsrp_dbm,
                    },
                );
            }
        }
    }
    merged.into_values().collect()
}

fn by_rank(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.rsrp_dbm.total_cmp(&a.rsrp_dbm))
        .then_with(|| a.satellite_id.cmp(&b.satellite_id))
}
