//! Token budget packing: a greedy knapsack over scored segments.

use crate::segment::{SegType, Segment};

/// Which segments made it under the budget.
#[derive(Debug)]
pub struct BudgetResult {
    /// Indices into the segment array, ascending by position.
    pub indices: Vec<usize>,
    /// Tokens consumed, including the reserve.
    pub total_tokens: usize,
    pub budget_tokens: usize,
}

impl BudgetResult {
    pub fn count(&self) -> usize {
        self.indices.len()
    }
}

/// Pack segments into `budget_tokens`, holding back `reserve_tokens` for the
/// header, frequency table, and tail.
///
/// Error segments are always included, even when they alone exceed the
/// budget. The remaining room is filled greedily by score.
pub fn pack(segments: &[Segment], budget_tokens: usize, reserve_tokens: usize) -> BudgetResult {
    let available = budget_tokens.saturating_sub(reserve_tokens);
    let mut indices = Vec::new();
    let mut total_tokens = 0;

    for (i, seg) in segments.iter().enumerate() {
        if seg.seg_type == SegType::Error {
            indices.push(i);
            total_tokens += seg.token_count;
        }
    }

    let mut candidates: Vec<(usize, f32)> = segments
        .iter()
        .enumerate()
        .filter(|(_, seg)| seg.seg_type != SegType::Error)
        .map(|(i, seg)| (i, seg.score))
        .collect();
    // Stable: equal scores keep their original segment order.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (i, _) in candidates {
        if total_tokens + segments[i].token_count <= available {
            indices.push(i);
            total_tokens += segments[i].token_count;
        }
    }

    indices.sort_unstable();
    BudgetResult {
        indices,
        total_tokens: total_tokens + reserve_tokens,
        budget_tokens,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn seg(seg_type: SegType, start: usize, tokens: usize, score: f32) -> Segment {
        Segment {
            start_line: start,
            end_line: start,
            seg_type,
            label: seg_type.name().to_string(),
            line_count: 1,
            token_count: tokens,
            score,
        }
    }

    #[test]
    fn errors_always_included_even_over_budget() {
        let segments = vec![
            seg(SegType::Error, 0, 1000, 10.0),
            seg(SegType::Error, 5, 1000, 10.0),
        ];
        let result = pack(&segments, 500, 0);
        assert_eq!(result.count(), 2);
        assert_eq!(result.total_tokens, 2000);
    }

    #[test]
    fn fillers_packed_by_score() {
        let segments = vec![
            seg(SegType::Normal, 0, 100, 1.0),
            seg(SegType::Warning, 5, 100, 5.0),
            seg(SegType::Data, 10, 100, 4.0),
        ];
        let result = pack(&segments, 200, 0);
        // Only two fit; the highest scorers win.
        assert_eq!(result.indices, vec![1, 2]);
    }

    #[test]
    fn indices_sorted_by_position_not_score() {
        let segments = vec![
            seg(SegType::Normal, 0, 10, 1.0),
            seg(SegType::Error, 5, 10, 10.0),
            seg(SegType::Warning, 10, 10, 5.0),
        ];
        let result = pack(&segments, 1000, 0);
        assert_eq!(result.indices, vec![0, 1, 2]);
    }

    #[test]
    fn indices_strictly_increasing() {
        let segments: Vec<Segment> = (0..10)
            .map(|i| seg(SegType::Normal, i * 2, 10, (i % 3) as f32))
            .collect();
        let result = pack(&segments, 1000, 0);
        assert!(result.indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reserve_shrinks_available_room() {
        let segments = vec![seg(SegType::Normal, 0, 150, 1.0)];
        let over = pack(&segments, 200, 100);
        assert_eq!(over.count(), 0);
        assert_eq!(over.total_tokens, 100);

        let fits = pack(&segments, 300, 100);
        assert_eq!(fits.count(), 1);
        assert_eq!(fits.total_tokens, 250);
    }

    #[test]
    fn reserve_larger_than_budget_means_nothing_fits() {
        let segments = vec![seg(SegType::Normal, 0, 1, 1.0)];
        let result = pack(&segments, 100, 500);
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn ties_keep_natural_order() {
        let segments = vec![
            seg(SegType::Normal, 0, 80, 2.0),
            seg(SegType::Normal, 5, 80, 2.0),
        ];
        let result = pack(&segments, 100, 0);
        assert_eq!(result.indices, vec![0]);
    }

    #[test]
    fn empty_input() {
        let result = pack(&[], 100, 0);
        assert_eq!(result.count(), 0);
        assert_eq!(result.total_tokens, 0);
    }
}
