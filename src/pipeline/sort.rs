// src/pipeline/sort.rs

//! Deterministic ordering of enriched problems.

use std::collections::BTreeMap;

use crate::models::{Platform, Problem};

/// Priority of platforms missing from the table; sorts after every listed one.
pub const UNKNOWN_PLATFORM_PRIORITY: u32 = 99;

/// Platform tiebreak table; lower sorts first.
#[derive(Debug, Clone, Default)]
pub struct PlatformPriority {
    priorities: BTreeMap<String, u32>,
}

impl PlatformPriority {
    pub fn new(priorities: BTreeMap<String, u32>) -> Self {
        let priorities = priorities
            .into_iter()
            .map(|(name, p)| (name.to_lowercase(), p))
            .collect();
        Self { priorities }
    }

    pub fn of(&self, platform: Platform) -> u32 {
        self.priorities
            .get(platform.as_str())
            .copied()
            .unwrap_or(UNKNOWN_PLATFORM_PRIORITY)
    }
}

/// Stable sort by rating ascending with unrated last, then platform priority.
pub fn sort_problems(problems: &mut [Problem], priority: &PlatformPriority) {
    problems.sort_by_key(|p| (p.rating.is_none(), p.rating.unwrap_or(0), priority.of(p.platform)));
}
