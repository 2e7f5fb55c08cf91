//! Interest scoring for segments.

use crate::dedup::DedupTable;
use crate::mode::Mode;
use crate::segment::{SegType, Segment};
use crate::text::contains_ci;

/// Frequency-outlier thresholds, derived once per scoring pass from the
/// count-sorted dedup table: the counts at the 5%-from-top and
/// 5%-from-bottom ranks.
#[derive(Debug, Clone, Copy)]
struct FreqThresholds {
    top5: usize,
    bot5: usize,
}

fn freq_thresholds(dedup: &DedupTable) -> Option<FreqThresholds> {
    let sorted = dedup.sorted_by_frequency();
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let top_idx = n / 20;
    let bot_idx = n - n / 20 - 1;
    Some(FreqThresholds {
        top5: sorted[top_idx].count,
        bot5: sorted[bot_idx].count,
    })
}

fn score_segment(
    seg: &Segment,
    lines: &[String],
    mode: Option<&Mode>,
    extra_keywords: &[String],
    dedup: &DedupTable,
    thresholds: Option<FreqThresholds>,
) -> f32 {
    let mut score = match seg.seg_type {
        SegType::Error => 10.0,
        SegType::Warning => 5.0,
        SegType::Data => 4.0,
        SegType::Phase => 2.0,
        _ => 0.0,
    };

    for line in seg.lines(lines) {
        if let Some(m) = mode {
            for keyword in &m.keywords {
                if line.contains(keyword.as_str()) {
                    score += 3.0;
                }
            }
            for trigger in &m.block_triggers {
                if contains_ci(line, trigger) {
                    score += 1.0;
                }
            }
        }
        for keyword in extra_keywords {
            if line.contains(keyword.as_str()) {
                score += 3.0;
            }
        }
        if let Some(t) = thresholds
            && let Some(entry) = dedup.lookup_original(line)
        {
            if entry.count >= t.top5 && t.top5 > 1 {
                score += 2.0;
            }
            if entry.count <= t.bot5 && entry.count == 1 {
                score += 2.0;
            }
        }
    }

    score
}

/// Score every segment in place.
pub fn score_all(
    segments: &mut [Segment],
    lines: &[String],
    mode: Option<&Mode>,
    extra_keywords: &[String],
    dedup: &DedupTable,
) {
    let thresholds = freq_thresholds(dedup);
    for seg in segments.iter_mut() {
        seg.score = score_segment(seg, lines, mode, extra_keywords, dedup, thresholds);
    }
}
