//! Source validation and time chunking for batch ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use wind_common::{ObservationError, SourceSeries, WindObservation};

/// A record or source that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestWarning {
    pub source_id: String,
    /// Index of the offending record, `None` for source-level problems
    pub record_index: Option<usize>,
    pub kind: String,
    pub message: String,
}

impl IngestWarning {
    fn new(source_id: &str, record_index: Option<usize>, error: &ObservationError) -> Self {
        Self {
            source_id: source_id.to_string(),
            record_index,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Time range and size of one fused chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub index: usize,
    pub points: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Outcome of the most recent ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub sources: usize,
    pub skipped_sources: usize,
    pub accepted_records: usize,
    pub rejected_records: usize,
    pub warnings: Vec<IngestWarning>,
    pub chunks: Vec<ChunkSummary>,
}

impl IngestReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Validate every source, skipping bad records and sources.
///
/// Returns the accepted observations sorted by time together with a report
/// of what was dropped. Never fails.
pub fn validate_sources(sources: &[SourceSeries]) -> (Vec<WindObservation>, IngestReport) {
    let mut report = IngestReport {
        sources: sources.len(),
        ..Default::default()
    };
    let mut accepted = Vec::new();

    for source in sources {
        let unit = match source.unit() {
            Ok(unit) => unit,
            Err(e) => {
                warn!(source = %source.source_id, error = %e, "Skipping source");
                report.skipped_sources += 1;
                report.rejected_records += source.records.len();
                report.warnings.push(IngestWarning::new(&source.source_id, None, &e));
                continue;
            }
        };

        let mut usable = Vec::with_capacity(source.records.len());
        for (idx, record) in source.records.iter().enumerate() {
            match record.to_observation(unit, &source.source_id) {
                Ok(obs) => usable.push(obs),
                Err(e) => {
                    warn!(source = %source.source_id, record = idx, error = %e, "Skipping record");
                    report.rejected_records += 1;
                    report.warnings.push(IngestWarning::new(&source.source_id, Some(idx), &e));
                }
            }
        }

        if usable.is_empty() {
            let e = ObservationError::EmptySource(source.source_id.clone());
            warn!(source = %source.source_id, "Source has no usable records");
            report.skipped_sources += 1;
            report.warnings.push(IngestWarning::new(&source.source_id, None, &e));
            continue;
        }

        report.accepted_records += usable.len();
        accepted.extend(usable);
    }

    accepted.sort_by_key(|o| o.timestamp);
    (accepted, report)
}

/// Split time-sorted observations into the fewest contiguous chunks of at
/// most `max_points` each, oldest first.
///
/// Chunk sizes differ by at most one, so the newest chunk is never a small
/// remainder.
pub fn chunk_by_time(
    mut observations: Vec<WindObservation>,
    max_points: usize,
) -> Vec<Vec<WindObservation>> {
    observations.sort_by_key(|o| o.timestamp);
    let count = observations.len().div_ceil(max_points.max(1));
    if count == 0 {
        return Vec::new();
    }
    let base = observations.len() / count;
    let extra = observations.len() % count;

    let mut iter = observations.into_iter();
    (0..count)
        .map(|i| {
            let size = base + usize::from(i < extra);
            iter.by_ref().take(size).collect()
        })
        .collect()
}

/// Summaries of a chunk list for the ingest report.
pub fn summarize_chunks(chunks: &[Vec<WindObservation>]) -> Vec<ChunkSummary> {
    chunks
        .iter()
        .enumerate()
        .filter_map(|(index, chunk)| {
            Some(ChunkSummary {
                index,
                points: chunk.len(),
                start: chunk.first()?.timestamp,
                end: chunk.last()?.timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wind_common::observation::RawTimestamp;
    use wind_common::RawRecord;

    fn record(minute: i64, speed: f64) -> RawRecord {
        let t = DateTime::parse_from_rfc3339("2024-04-04T04:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minute);
        RawRecord {
            timestamp: Some(RawTimestamp::Parsed(t)),
            latitude: Some(10.0),
            longitude: Some(20.0),
            wind_direction: Some(45.0),
            wind_speed: Some(speed),
            confidence: None,
        }
    }

    #[test]
    fn test_bad_records_and_sources_are_skipped() {
        let mut good = SourceSeries::new("good", "knots");
        good.push(record(2, 10.0));
        good.push(RawRecord {
            latitude: None,
            ..record(3, 1.0)
        });
        good.push(record(1, 10.0));

        let mut bad_unit = SourceSeries::new("odd", "furlongs/fortnight");
        bad_unit.push(record(0, 1.0));

        let mut bad_time = SourceSeries::new("clock", "m/s");
        bad_time.push(RawRecord {
            timestamp: Some(RawTimestamp::Text("not a time".into())),
            ..record(0, 1.0)
        });

        let (obs, report) = validate_sources(&[good, bad_unit, bad_time]);

        assert_eq!(obs.len(), 2);
        assert!(obs[0].timestamp < obs[1].timestamp);
        assert!((obs[0].wind_speed - 5.1444).abs() < 1e-9);
        assert_eq!(report.sources, 3);
        assert_eq!(report.skipped_sources, 2);
        assert_eq!(report.accepted_records, 2);
        assert_eq!(report.rejected_records, 3);

        let kinds: Vec<&str> = report.warnings.iter().map(|w| w.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["missing_field", "unsupported_unit", "invalid_timestamp", "empty_source"]
        );
    }

    #[test]
    fn test_chunking_preserves_order_and_cap() {
        let (obs, _) = validate_sources(&[{
            let mut s = SourceSeries::new("a", "m/s");
            for m in (0..25).rev() {
                s.push(record(m, 3.0));
            }
            s
        }]);
        let chunks = chunk_by_time(obs, 10);
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![9, 8, 8]);

        let summaries = summarize_chunks(&chunks);
        for pair in summaries.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(summaries[2].index, 2);
    }

    #[test]
    fn test_chunking_one_over_cap_splits_evenly() {
        let (obs, _) = validate_sources(&[{
            let mut s = SourceSeries::new("a", "m/s");
            for m in 0..51 {
                s.push(record(m, 3.0));
            }
            s
        }]);
        let chunks = chunk_by_time(obs, 50);
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![26, 25]);

        let (obs, _) = validate_sources(&[{
            let mut s = SourceSeries::new("a", "m/s");
            for m in 0..50 {
                s.push(record(m, 3.0));
            }
            s
        }]);
        assert_eq!(chunk_by_time(obs, 50).len(), 1);
    }

    #[test]
    fn test_chunking_empty() {
        assert!(chunk_by_time(Vec::new(), 10).is_empty());
    }
}
