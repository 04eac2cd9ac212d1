// src/pipeline/dedup.rs

//! Cross-platform deduplication by problem identity.

use std::collections::HashSet;

use crate::models::Problem;

/// Drop every problem whose id was already seen, keeping the first occurrence.
///
/// Returns the kept problems in their original order and the number removed.
pub fn dedup_problems(problems: Vec<Problem>) -> (Vec<Problem>, usize) {
    let before = problems.len();
    let mut seen = HashSet::new();
    let kept: Vec<Problem> = problems
        .into_iter()
        .filter(|p| seen.insert(p.problem_id().to_string()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;

    fn sample() -> Vec<Problem> {
        vec![
            Problem::new(Platform::Codeforces, "1", "A", Some("First".into())),
            Problem::new(Platform::AtCoder, "abc300", "abc300_a", None),
            Problem::new(Platform::Codeforces, "1", "A", Some("Second".into())),
            Problem::new(Platform::AtCoder, "abc300", "ABC300_A", Some("Upper".into())),
            Problem::new(Platform::LeetCode, "two-sum", "", None),
        ]
    }

    #[test]
    fn test_keeps_first_occurrence() {
        let (kept, removed) = dedup_problems(sample());

        assert_eq!(removed, 2);
        let ids: Vec<_> = kept.iter().map(|p| p.problem_id()).collect();
        assert_eq!(ids, vec!["CF-1-A", "AT-abc300-abc300_a", "LC-two-sum"]);
        assert_eq!(kept[0].title.as_deref(), Some("First"));
        assert_eq!(kept[1].title, None);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let (once, _) = dedup_problems(sample());
        let (twice, removed) = dedup_problems(once.clone());

        assert_eq!(removed, 0);
        assert_eq!(once, twice);
    }
}
