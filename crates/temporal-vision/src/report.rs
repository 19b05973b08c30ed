//! Report assembly: severity tiering, date handling, and narrative
//! formatting.

use chrono::NaiveDate;

use crate::annotate::Annotated;
use crate::object_diff::partition_changes;
use crate::types::{
    ChangeError, ChangeRegion, ChangeReport, ChangeResult, ChangeSeverity, ObjectCountDelta,
    ReportMetadata, SimilaritySummary,
};

const RULE_HEAVY: &str =
    "================================================================================";
const RULE_LIGHT: &str =
    "--------------------------------------------------------------------------------";

/// Capture dates are ISO calendar dates.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything the assembler needs from the earlier pipeline stages.
pub struct ReportInputs<'a> {
    pub date_before: Option<&'a str>,
    pub date_after: Option<&'a str>,
    pub location: Option<&'a str>,
    pub caption_before: &'a Annotated<String>,
    pub caption_after: &'a Annotated<String>,
    pub score: f64,
    pub regions: &'a [ChangeRegion],
    pub object_changes: &'a [ObjectCountDelta],
    pub detections_degraded: bool,
}

/// Parse an ISO calendar date (`YYYY-MM-DD`).
pub fn parse_capture_date(raw: &str) -> ChangeResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ChangeError::InvalidDate(raw.to_string()))
}

/// Assemble the structured report and its narrative. Pure aggregation: no
/// external calls, deterministic output for identical inputs.
///
/// An unparsable date is dropped (with a note in the narrative) rather than
/// aborting; degraded captions and detections are likewise named in the
/// narrative instead of being silently empty.
pub fn assemble_report(inputs: ReportInputs<'_>) -> ChangeReport {
    let mut notes: Vec<String> = Vec::new();

    let (date_before, parsed_before) = resolve_date(inputs.date_before, "before", &mut notes);
    let (date_after, parsed_after) = resolve_date(inputs.date_after, "after", &mut notes);
    let time_span_days = match (parsed_before, parsed_after) {
        (Some(d1), Some(d2)) => Some((d2 - d1).num_days()),
        _ => None,
    };

    if inputs.caption_before.degraded || inputs.caption_after.degraded {
        notes.push("image captioning was unavailable; descriptions are empty".to_string());
    }
    if inputs.detections_degraded {
        notes.push(
            "object detection was unavailable; object-level changes may be incomplete"
                .to_string(),
        );
    }

    let severity = ChangeSeverity::from_score(inputs.score);
    let similarity = SimilaritySummary {
        score: inputs.score,
        severity,
        changed_region_count: inputs.regions.len(),
        total_change_area: inputs.regions.iter().map(|r| u64::from(r.area)).sum(),
    };

    let metadata = ReportMetadata {
        date_before,
        date_after,
        location: inputs.location.map(str::to_string),
        time_span_days,
    };

    let narrative = render_narrative(
        &metadata,
        inputs.caption_before,
        inputs.caption_after,
        &similarity,
        inputs.object_changes,
        &notes,
    );

    ChangeReport {
        metadata,
        caption_before: inputs.caption_before.value.clone(),
        caption_after: inputs.caption_after.value.clone(),
        similarity,
        regions: inputs.regions.to_vec(),
        object_changes: inputs.object_changes.to_vec(),
        narrative,
    }
}

fn resolve_date(
    raw: Option<&str>,
    which: &str,
    notes: &mut Vec<String>,
) -> (Option<String>, Option<NaiveDate>) {
    let Some(raw) = raw else {
        return (None, None);
    };
    match parse_capture_date(raw) {
        Ok(date) => (Some(raw.to_string()), Some(date)),
        Err(e) => {
            tracing::warn!("{e}; dropping the {which} date from the report");
            notes.push(format!(
                "the {which} capture date {raw:?} could not be parsed and was omitted"
            ));
            (None, None)
        }
    }
}

fn render_narrative(
    metadata: &ReportMetadata,
    caption_before: &Annotated<String>,
    caption_after: &Annotated<String>,
    similarity: &SimilaritySummary,
    object_changes: &[ObjectCountDelta],
    notes: &[String],
) -> String {
    let mut lines: Vec<String> = vec![
        RULE_HEAVY.to_string(),
        "TEMPORAL CHANGE DETECTION REPORT".to_string(),
        RULE_HEAVY.to_string(),
    ];

    if let Some(location) = &metadata.location {
        lines.push(format!("Location: {location}"));
    }
    if let (Some(d1), Some(d2)) = (&metadata.date_before, &metadata.date_after) {
        lines.push(format!("Capture dates: {d1} to {d2}"));
    }
    if let Some(days) = metadata.time_span_days {
        lines.push(format!(
            "Time span: {days} days ({:.1} years)",
            days as f64 / 365.25
        ));
    }

    lines.push(String::new());
    lines.push("IMAGE DESCRIPTIONS".to_string());
    lines.push(RULE_LIGHT.to_string());
    lines.push(format!("Before: {}", describe(caption_before)));
    lines.push(format!("After: {}", describe(caption_after)));

    lines.push(String::new());
    lines.push("SIMILARITY ANALYSIS".to_string());
    lines.push(RULE_LIGHT.to_string());
    lines.push(format!("Structural similarity: {:.3}", similarity.score));
    lines.push(format!("Assessment: {}", similarity.severity.assessment()));
    lines.push(format!(
        "Changed regions detected: {}",
        similarity.changed_region_count
    ));
    lines.push(format!(
        "Total changed area: {} pixels",
        similarity.total_change_area
    ));

    lines.push(String::new());
    lines.push("OBJECT-LEVEL CHANGES".to_string());
    lines.push(RULE_LIGHT.to_string());
    if object_changes.is_empty() {
        lines.push("No significant object-level changes detected".to_string());
    } else {
        let (increases, decreases) = partition_changes(object_changes);
        if !increases.is_empty() {
            lines.push("Increases:".to_string());
            for c in increases {
                lines.push(format!(
                    "  {}: {} -> {} ({:+}, {:+.1}%)",
                    c.label, c.count_before, c.count_after, c.delta, c.percent_change
                ));
            }
        }
        if !decreases.is_empty() {
            lines.push("Decreases:".to_string());
            for c in decreases {
                lines.push(format!(
                    "  {}: {} -> {} ({:+}, {:.1}%)",
                    c.label, c.count_before, c.count_after, c.delta, c.percent_change
                ));
            }
        }
    }

    lines.push(String::new());
    lines.push("INTERPRETATION".to_string());
    lines.push(RULE_LIGHT.to_string());
    lines.push(similarity.severity.interpretation().to_string());

    if !notes.is_empty() {
        lines.push(String::new());
        lines.push("Notes:".to_string());
        for note in notes {
            lines.push(format!("  - {note}"));
        }
    }

    lines.push(RULE_HEAVY.to_string());
    lines.join("\n")
}

fn describe(caption: &Annotated<String>) -> &str {
    if caption.degraded {
        "(caption unavailable)"
    } else if caption.value.is_empty() {
        "(no caption)"
    } else {
        &caption.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(text: &str) -> Annotated<String> {
        Annotated {
            value: text.to_string(),
            degraded: false,
        }
    }

    fn base_inputs<'a>(
        caption_before: &'a Annotated<String>,
        caption_after: &'a Annotated<String>,
    ) -> ReportInputs<'a> {
        ReportInputs {
            date_before: None,
            date_after: None,
            location: None,
            caption_before,
            caption_after,
            score: 0.9,
            regions: &[],
            object_changes: &[],
            detections_degraded: false,
        }
    }

    #[test]
    fn test_elapsed_days_across_leap_year() {
        let before = caption("a field");
        let after = caption("a field with a road");
        let mut inputs = base_inputs(&before, &after);
        inputs.date_before = Some("2020-01-01");
        inputs.date_after = Some("2021-01-01");

        let report = assemble_report(inputs);
        assert_eq!(report.metadata.time_span_days, Some(366));
        assert!(report.narrative.contains("366 days"));
        assert!(report.narrative.contains("1.0 years"));
    }

    #[test]
    fn test_invalid_date_dropped_not_fatal() {
        let before = caption("a field");
        let after = caption("a field");
        let mut inputs = base_inputs(&before, &after);
        inputs.date_before = Some("January 1st 2020");
        inputs.date_after = Some("2021-01-01");
        inputs.score = 0.95;

        let report = assemble_report(inputs);
        assert_eq!(report.metadata.date_before, None);
        assert_eq!(report.metadata.date_after, Some("2021-01-01".to_string()));
        assert_eq!(report.metadata.time_span_days, None);
        assert!(report.narrative.contains("could not be parsed"));
        // The similarity section is still present.
        assert!(report.narrative.contains("Structural similarity: 0.950"));
    }

    #[test]
    fn test_parse_capture_date_rejects_garbage() {
        assert!(matches!(
            parse_capture_date("2020-13-40"),
            Err(ChangeError::InvalidDate(_))
        ));
        assert!(parse_capture_date("2020-02-29").is_ok());
    }

    #[test]
    fn test_severity_wording_matches_programmatic_flag() {
        let before = caption("dense forest");
        let after = caption("bare soil");
        let mut inputs = base_inputs(&before, &after);
        inputs.score = 0.45;

        let report = assemble_report(inputs);
        assert_eq!(report.similarity.severity, ChangeSeverity::High);
        assert!(report
            .narrative
            .contains(ChangeSeverity::High.assessment()));
        assert!(report
            .narrative
            .contains(ChangeSeverity::High.interpretation()));
    }

    #[test]
    fn test_degraded_annotations_are_noted() {
        let before = Annotated {
            value: String::new(),
            degraded: true,
        };
        let after = caption("a harbor");
        let mut inputs = base_inputs(&before, &after);
        inputs.detections_degraded = true;

        let report = assemble_report(inputs);
        assert!(report.narrative.contains("(caption unavailable)"));
        assert!(report.narrative.contains("captioning was unavailable"));
        assert!(report.narrative.contains("object detection was unavailable"));
        assert_eq!(report.caption_before, "");
    }

    #[test]
    fn test_narrative_is_deterministic() {
        let before = caption("a lake");
        let after = caption("a dry lakebed");
        let deltas = vec![
            ObjectCountDelta {
                label: "boat".to_string(),
                count_before: 3,
                count_after: 0,
                delta: -3,
                percent_change: -100.0,
            },
            ObjectCountDelta {
                label: "truck".to_string(),
                count_before: 0,
                count_after: 2,
                delta: 2,
                percent_change: 100.0,
            },
        ];
        let regions = vec![ChangeRegion {
            x: 4,
            y: 4,
            width: 30,
            height: 20,
            area: 450,
        }];

        let build = || {
            let mut inputs = base_inputs(&before, &after);
            inputs.location = Some("Lake Poopo, Bolivia");
            inputs.score = 0.41;
            inputs.regions = &regions;
            inputs.object_changes = &deltas;
            assemble_report(inputs)
        };

        let first = build();
        let second = build();
        assert_eq!(first.narrative, second.narrative);
        assert!(first.narrative.contains("Increases:"));
        assert!(first.narrative.contains("Decreases:"));
        assert!(first.narrative.contains("Total changed area: 450 pixels"));
    }
}
