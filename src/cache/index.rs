//! Interval query algebra
//!
//! Pure functions over a sorted, non-overlapping slice of interval groups.
//! These answer the two planning questions for a query range: which cached
//! groups intersect it, and which sub-ranges are missing. No I/O happens
//! here; a malformed (unsorted or overlapping) index is an invariant
//! violation upstream, not a runtime error to recover from.

use crate::cache::types::IntervalGroup;
use crate::time::Timestamp;

/// Groups intersecting `[start, end]`, in index order.
///
/// Exploits sortedness: the scan stops at the first group whose start lies
/// beyond `end`, since no later group can reach back into the query range.
pub fn intersection(
    groups: &[IntervalGroup],
    start: Timestamp,
    end: Timestamp,
) -> Vec<IntervalGroup> {
    let mut result = Vec::new();
    for group in groups {
        if group.start > end {
            break;
        }
        let covers_start = group.contains(start);
        let covers_end = group.contains(end);
        let contained = start <= group.start && group.end <= end;
        if covers_start || covers_end || contained {
            result.push(group.clone());
        }
    }
    result
}

/// The parts of `[start, end]` not covered by any group, as ordered
/// `(gap_start, gap_end)` pairs.
///
/// An inverted range (`start > end`) has no gaps; an empty intersection
/// makes the whole query range a single gap.
pub fn difference(
    groups: &[IntervalGroup],
    start: Timestamp,
    end: Timestamp,
) -> Vec<(Timestamp, Timestamp)> {
    if start > end {
        return Vec::new();
    }

    let overlap = intersection(groups, start, end);
    let (first, last) = match (overlap.first(), overlap.last()) {
        (Some(first), Some(last)) => (first.span(), last.span()),
        _ => return vec![(start, end)],
    };

    let mut gaps = Vec::new();
    if start < first.0 {
        gaps.push((start, first.0));
    }
    for pair in overlap.windows(2) {
        if pair[0].end < pair[1].start {
            gaps.push((pair[0].end, pair[1].start));
        }
    }
    if end > last.1 {
        gaps.push((last.1, end));
    }
    gaps
}

/// The group containing `stamp`, if any.
pub fn group_containing(groups: &[IntervalGroup], stamp: Timestamp) -> Option<&IntervalGroup> {
    groups.iter().find(|g| g.contains(stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::SegmentEntry;

    fn ts(n: i64) -> Timestamp {
        Timestamp::from_nanos(n)
    }

    fn group(start: i64, end: i64) -> IntervalGroup {
        IntervalGroup::from_files(vec![SegmentEntry::new(
            format!("{}_{}", start, end),
            ts(start),
            ts(end),
        )])
        .unwrap()
    }

    #[test]
    fn test_intersection_empty_index() {
        assert!(intersection(&[], ts(0), ts(100)).is_empty());
    }

    #[test]
    fn test_intersection_skips_groups_before_query() {
        // A group entirely before the query must not stop the scan.
        let groups = vec![group(0, 10), group(50, 60)];
        let hits = intersection(&groups, ts(50), ts(60));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].span(), (ts(50), ts(60)));
    }

    #[test]
    fn test_intersection_stops_after_query_end() {
        let groups = vec![group(0, 10), group(20, 30), group(100, 200)];
        let hits = intersection(&groups, ts(5), ts(25));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_intersection_boundary_touch() {
        // Spans are inclusive, so touching an endpoint intersects.
        let groups = vec![group(10, 20)];
        assert_eq!(intersection(&groups, ts(20), ts(30)).len(), 1);
        assert_eq!(intersection(&groups, ts(0), ts(10)).len(), 1);
        assert!(intersection(&groups, ts(21), ts(30)).is_empty());
    }

    #[test]
    fn test_difference_empty_index_is_whole_range() {
        assert_eq!(difference(&[], ts(0), ts(100)), vec![(ts(0), ts(100))]);
    }

    #[test]
    fn test_difference_inverted_range() {
        let groups = vec![group(0, 10)];
        assert!(difference(&groups, ts(100), ts(0)).is_empty());
    }

    #[test]
    fn test_difference_leading_and_trailing_gaps() {
        let groups = vec![group(10, 20)];
        let gaps = difference(&groups, ts(0), ts(30));
        assert_eq!(gaps, vec![(ts(0), ts(10)), (ts(20), ts(30))]);
    }

    #[test]
    fn test_difference_single_group_trailing_gap_only() {
        // One intersecting group not fully covering the range: the tail
        // beyond its end must still come out as a gap.
        let groups = vec![group(0, 20)];
        let gaps = difference(&groups, ts(0), ts(30));
        assert_eq!(gaps, vec![(ts(20), ts(30))]);
    }

    #[test]
    fn test_difference_between_groups() {
        let groups = vec![group(0, 10), group(20, 30), group(40, 50)];
        let gaps = difference(&groups, ts(5), ts(45));
        assert_eq!(gaps, vec![(ts(10), ts(20)), (ts(30), ts(40))]);
    }

    #[test]
    fn test_difference_fully_covered() {
        let groups = vec![group(0, 100)];
        assert!(difference(&groups, ts(10), ts(90)).is_empty());
    }

    #[test]
    fn test_coverage_completeness() {
        // Intersection plus difference must tile [start, end] exactly:
        // walking both in time order leaves no hole and no overlap.
        let groups = vec![group(10, 20), group(35, 40), group(60, 80)];
        let start = ts(0);
        let end = ts(70);

        let mut pieces: Vec<(Timestamp, Timestamp)> = Vec::new();
        for g in intersection(&groups, start, end) {
            pieces.push((g.start.max(start), g.end.min(end)));
        }
        pieces.extend(difference(&groups, start, end));
        pieces.sort();

        assert_eq!(pieces.first().unwrap().0, start);
        assert_eq!(pieces.last().unwrap().1, end);
        for pair in pieces.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn test_group_containing() {
        let groups = vec![group(0, 10), group(20, 30)];
        assert_eq!(group_containing(&groups, ts(5)).unwrap().span(), (ts(0), ts(10)));
        assert_eq!(group_containing(&groups, ts(20)).unwrap().span(), (ts(20), ts(30)));
        assert!(group_containing(&groups, ts(15)).is_none());
    }
}
