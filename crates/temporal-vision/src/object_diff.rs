//! Object-level differencing of detection lists.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{Detection, ObjectCountDelta};

/// Compare label counts between two detection lists.
///
/// Labels with equal counts on both sides are omitted: only changes are
/// reported. Output order follows first appearance scanning the before list,
/// then the after list, which keeps results deterministic for a given pair
/// of inputs.
pub fn diff_object_counts(before: &[Detection], after: &[Detection]) -> Vec<ObjectCountDelta> {
    let count_before = label_counts(before);
    let count_after = label_counts(after);

    let mut deltas = Vec::new();
    for label in label_order(before, after) {
        let c1 = count_before.get(label).copied().unwrap_or(0);
        let c2 = count_after.get(label).copied().unwrap_or(0);
        if c1 == c2 {
            continue;
        }
        let delta = i64::from(c2) - i64::from(c1);
        deltas.push(ObjectCountDelta {
            label: label.to_string(),
            count_before: c1,
            count_after: c2,
            delta,
            percent_change: percent_change(c1, delta),
        });
    }
    deltas
}

/// Percent change relative to the before count. A label first appearing
/// (`count_before == 0`) reports a fixed `100%` rather than an undefined
/// ratio; this sentinel is deliberate.
fn percent_change(count_before: u32, delta: i64) -> f64 {
    if count_before > 0 {
        delta as f64 / f64::from(count_before) * 100.0
    } else if delta > 0 {
        100.0
    } else {
        0.0
    }
}

fn label_counts(detections: &[Detection]) -> HashMap<&str, u32> {
    let mut counts = HashMap::new();
    for d in detections {
        *counts.entry(d.label.as_str()).or_insert(0) += 1;
    }
    counts
}

fn label_order<'a>(before: &'a [Detection], after: &'a [Detection]) -> Vec<&'a str> {
    let mut order: Vec<&str> = Vec::new();
    for d in before.iter().chain(after) {
        if !order.contains(&d.label.as_str()) {
            order.push(d.label.as_str());
        }
    }
    order
}

/// Split deltas into increases (largest percent change first) and decreases
/// (most negative percent change first) for report formatting.
pub fn partition_changes(
    deltas: &[ObjectCountDelta],
) -> (Vec<&ObjectCountDelta>, Vec<&ObjectCountDelta>) {
    let mut increases: Vec<&ObjectCountDelta> = deltas.iter().filter(|d| d.delta > 0).collect();
    let mut decreases: Vec<&ObjectCountDelta> = deltas.iter().filter(|d| d.delta < 0).collect();

    increases.sort_by(|a, b| {
        b.percent_change
            .partial_cmp(&a.percent_change)
            .unwrap_or(Ordering::Equal)
    });
    decreases.sort_by(|a, b| {
        a.percent_change
            .partial_cmp(&b.percent_change)
            .unwrap_or(Ordering::Equal)
    });

    (increases, decreases)
}
