//! Majority-vote selection with a confidence gate.
//!
//! # Algorithm
//!
//! 1. Read the grouping key (e.g. `gif_path`) from each fragment's metadata.
//!    Fragments without the key are counted as seen but cannot win.
//!    Non-string values vote under their JSON text (`7` votes as `"7"`).
//! 2. No keyed fragment → [`RecallError::NoCandidate`].
//! 3. Group by key. The largest group wins; on equal counts the group whose
//!    first fragment appears earliest in the input wins.
//! 4. Re-filter the full fragment sequence down to the winning key.
//! 5. Confidence is the maximum score in that subset. Below `threshold`
//!    → [`RecallError::LowConfidence`].
//!
//! The tie-break reproduces insertion-ordered counting and is not weighted
//! by relevance. Given the same fragments and threshold the result is always
//! the same.

use std::collections::HashMap;

use crate::error::RecallError;
use crate::models::{CandidateGroup, ContextFragment, Selection};

/// Count keyed fragments per grouping key, in first-seen order.
pub fn tally(fragments: &[ContextFragment], key_field: &str) -> Vec<CandidateGroup> {
    let mut groups: Vec<CandidateGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, frag) in fragments.iter().enumerate() {
        let Some(key) = frag.item_key(key_field) else {
            continue;
        };
        match index.get(key.as_ref()) {
            Some(&pos) => {
                let group = &mut groups[pos];
                group.count += 1;
                group.max_score = group.max_score.max(frag.score);
            }
            None => {
                let key = key.into_owned();
                index.insert(key.clone(), groups.len());
                groups.push(CandidateGroup {
                    item_key: key,
                    count: 1,
                    max_score: frag.score,
                    first_index: i,
                });
            }
        }
    }

    groups
}

/// Pick the majority group, or `None` if no fragment is keyed.
///
/// Scans groups in first-seen order and only replaces the leader on a
/// strictly larger count, so ties keep the earliest group.
pub fn majority(groups: &[CandidateGroup]) -> Option<&CandidateGroup> {
    let mut leader: Option<&CandidateGroup> = None;
    for group in groups {
        match leader {
            Some(best) if group.count <= best.count => {}
            _ => leader = Some(group),
        }
    }
    leader
}

/// Run the majority vote and confidence gate over retrieved fragments.
pub fn select(
    fragments: &[ContextFragment],
    key_field: &str,
    threshold: f64,
) -> Result<Selection, RecallError> {
    let seen = fragments.len();
    let groups = tally(fragments, key_field);
    let keyed: usize = groups.iter().map(|g| g.count).sum();

    let winner = majority(&groups).ok_or(RecallError::NoCandidate { seen })?;

    let confidence = fragments
        .iter()
        .filter(|f| f.item_key(key_field).as_deref() == Some(winner.item_key.as_str()))
        .map(|f| f.score)
        .reduce(f64::max)
        .ok_or(RecallError::NoCandidate { seen })?;

    if confidence.is_nan() || confidence < threshold {
        return Err(RecallError::LowConfidence {
            item_key: winner.item_key.clone(),
            confidence,
            threshold,
        });
    }

    Ok(Selection {
        item_key: winner.item_key.clone(),
        confidence,
        group_size: winner.count,
        keyed,
        seen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    const KEY: &str = "gif_path";

    fn frag(key: Option<&str>, score: f64) -> ContextFragment {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), json!("diary"));
        if let Some(k) = key {
            metadata.insert(KEY.to_string(), Value::String(k.to_string()));
        }
        ContextFragment::new(score, metadata)
    }

    fn paris_rome() -> Vec<ContextFragment> {
        vec![
            frag(Some("paris.gif"), 0.9),
            frag(Some("rome.gif"), 0.95),
            frag(Some("paris.gif"), 0.4),
            frag(Some("rome.gif"), 0.3),
            frag(Some("paris.gif"), 0.5),
        ]
    }

    #[test]
    fn test_majority_beats_higher_score() {
        let sel = select(&paris_rome(), KEY, 0.35).unwrap();
        assert_eq!(sel.item_key, "paris.gif");
        assert!((sel.confidence - 0.9).abs() < 1e-9);
        assert_eq!(sel.group_size, 3);
        assert_eq!(sel.keyed, 5);
        assert_eq!(sel.seen, 5);
    }

    #[test]
    fn test_threshold_above_winner_is_low_confidence() {
        let err = select(&paris_rome(), KEY, 0.95).unwrap_err();
        match err {
            RecallError::LowConfidence {
                item_key,
                confidence,
                threshold,
            } => {
                assert_eq!(item_key, "paris.gif");
                assert!((confidence - 0.9).abs() < 1e-9);
                assert!((threshold - 0.95).abs() < 1e-9);
            }
            other => panic!("expected LowConfidence, got {:?}", other),
        }
    }

    #[test]
    fn test_low_confidence_ignores_losing_groups() {
        // rome.gif holds the best score overall but loses the vote.
        let err = select(&paris_rome(), KEY, 0.92).unwrap_err();
        assert!(matches!(
            err,
            RecallError::LowConfidence { ref item_key, .. } if item_key == "paris.gif"
        ));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let sel = select(&paris_rome(), KEY, 0.9).unwrap();
        assert_eq!(sel.item_key, "paris.gif");
    }

    #[test]
    fn test_no_keys_is_no_candidate() {
        let frags: Vec<_> = (0..5).map(|i| frag(None, 0.1 * i as f64)).collect();
        let err = select(&frags, KEY, 0.35).unwrap_err();
        assert!(matches!(err, RecallError::NoCandidate { seen: 5 }));
    }

    #[test]
    fn test_empty_input_is_no_candidate() {
        let err = select(&[], KEY, 0.0).unwrap_err();
        assert!(matches!(err, RecallError::NoCandidate { seen: 0 }));
    }

    #[test]
    fn test_three_two_one_picks_largest() {
        let frags = vec![
            frag(Some("c.gif"), 0.99),
            frag(Some("b.gif"), 0.98),
            frag(Some("a.gif"), 0.36),
            frag(Some("b.gif"), 0.97),
            frag(Some("a.gif"), 0.1),
            frag(Some("a.gif"), 0.2),
        ];
        let sel = select(&frags, KEY, 0.35).unwrap();
        assert_eq!(sel.item_key, "a.gif");
        assert_eq!(sel.group_size, 3);
    }

    #[test]
    fn test_tie_goes_to_earliest_first_fragment() {
        // b.gif reaches two first, but a.gif appeared first.
        let frags = vec![
            frag(Some("a.gif"), 0.5),
            frag(Some("b.gif"), 0.9),
            frag(Some("b.gif"), 0.9),
            frag(Some("a.gif"), 0.5),
        ];
        for _ in 0..10 {
            let sel = select(&frags, KEY, 0.35).unwrap();
            assert_eq!(sel.item_key, "a.gif");
        }
    }

    #[test]
    fn test_unkeyed_fragments_are_seen_but_cannot_win() {
        let frags = vec![
            frag(None, 0.99),
            frag(None, 0.99),
            frag(Some("a.gif"), 0.4),
        ];
        let sel = select(&frags, KEY, 0.35).unwrap();
        assert_eq!(sel.item_key, "a.gif");
        assert!((sel.confidence - 0.4).abs() < 1e-9);
        assert_eq!(sel.keyed, 1);
        assert_eq!(sel.seen, 3);
    }

    #[test]
    fn test_nan_confidence_never_passes_gate() {
        let frags = vec![frag(Some("a.gif"), f64::NAN)];
        let err = select(&frags, KEY, 0.0).unwrap_err();
        assert!(matches!(err, RecallError::LowConfidence { .. }));
    }

    #[test]
    fn test_tally_preserves_first_seen_order() {
        let groups = tally(&paris_rome(), KEY);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].item_key, "paris.gif");
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].first_index, 0);
        assert!((groups[0].max_score - 0.9).abs() < 1e-9);
        assert_eq!(groups[1].item_key, "rome.gif");
        assert_eq!(groups[1].first_index, 1);
        assert!((groups[1].max_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_keys_vote_as_text() {
        let with_key = |key: Value, score: f64| {
            let mut metadata = Map::new();
            metadata.insert(KEY.to_string(), key);
            ContextFragment::new(score, metadata)
        };
        let frags = vec![
            with_key(json!(7), 0.6),
            with_key(json!(7), 0.8),
            with_key(json!("a.gif"), 0.99),
        ];
        let sel = select(&frags, KEY, 0.35).unwrap();
        assert_eq!(sel.item_key, "7");
        assert!((sel.confidence - 0.8).abs() < 1e-9);
        assert_eq!(sel.group_size, 2);
        assert_eq!(sel.keyed, 3);
    }

    #[test]
    fn test_majority_of_empty_is_none() {
        assert!(majority(&[]).is_none());
    }
}
