//! Reads series back from the metrics backend's render API as CSV.
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GraphiteError {
    #[error("Render request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unexpected row {0:?}")]
    BadRow(String),
}

/// One `series,timestamp,value` row. Missing values are `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesPoint {
    pub series: String,
    pub timestamp: String,
    pub value: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeriesSummary {
    pub points: usize,
    pub non_null: usize,
    pub total: f64,
    pub peak: f64,
}

impl SeriesSummary {
    pub fn from_points(points: &[SeriesPoint]) -> Self {
        let values: Vec<f64> = points.iter().filter_map(|p| p.value).collect();
        Self {
            points: points.len(),
            non_null: values.len(),
            total: values.iter().sum(),
            peak: values.iter().copied().fold(0., f64::max),
        }
    }
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Points={} ({} non-null), Total={:.0}, Peak={:.0}",
            self.points, self.non_null, self.total, self.peak
        )
    }
}

pub struct GraphiteClient {
    client: reqwest::Client,
    base_url: String,
}

impl GraphiteClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// `target` over the trailing `window`, one point per row.
    pub async fn render(
        &self,
        target: &str,
        window: Duration,
    ) -> Result<Vec<SeriesPoint>, GraphiteError> {
        let url = format!("{}/render", self.base_url.trim_end_matches('/'));
        let from = format!("-{}s", window.as_secs());
        debug!("Fetching {target} from {url} over {from}");

        let body = self
            .client
            .get(url)
            .query(&[("target", target), ("from", from.as_str()), ("format", "csv")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_csv(&body)
    }
}

pub fn parse_csv(body: &str) -> Result<Vec<SeriesPoint>, GraphiteError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut points = vec![];
    for record in reader.records() {
        let record = record?;
        let (Some(series), Some(timestamp), Some(value)) =
            (record.get(0), record.get(1), record.get(2))
        else {
            return Err(GraphiteError::BadRow(format!("{record:?}")));
        };

        let value = match value.trim() {
            "" => None,
            v => Some(
                v.parse()
                    .map_err(|_| GraphiteError::BadRow(format!("{record:?}")))?,
            ),
        };

        points.push(SeriesPoint {
            series: series.to_string(),
            timestamp: timestamp.to_string(),
            value,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "stats_counts.vote.tx.valid,2017-03-01 10:00:00,\n\
                        stats_counts.vote.tx.valid,2017-03-01 10:00:10,1200.0\n\
                        stats_counts.vote.tx.valid,2017-03-01 10:00:20,3400.0\n\
                        stats_counts.vote.tx.valid,2017-03-01 10:00:30,\n";

    #[test]
    fn parses_rows_and_nulls() {
        let points = parse_csv(BODY).unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].value, None);
        assert_eq!(points[1].value, Some(1200.));
        assert_eq!(points[2].timestamp, "2017-03-01 10:00:20");
        assert_eq!(points[3].series, "stats_counts.vote.tx.valid");
    }

    #[test]
    fn summary() {
        let summary = SeriesSummary::from_points(&parse_csv(BODY).unwrap());
        assert_eq!(
            summary,
            SeriesSummary {
                points: 4,
                non_null: 2,
                total: 4600.,
                peak: 3400.,
            }
        );
        assert_eq!(
            summary.to_string(),
            "Points=4 (2 non-null), Total=4600, Peak=3400"
        );
    }

    #[test]
    fn empty_body_is_no_points() {
        assert!(parse_csv("").unwrap().is_empty());
        assert_eq!(SeriesSummary::from_points(&[]), SeriesSummary::default());
    }

    #[test]
    fn short_or_garbled_rows_are_errors() {
        assert!(matches!(
            parse_csv("series,2017-03-01 10:00:00\n"),
            Err(GraphiteError::BadRow(_))
        ));
        assert!(matches!(
            parse_csv("series,2017-03-01 10:00:00,lots\n"),
            Err(GraphiteError::BadRow(_))
        ));
    }
}
