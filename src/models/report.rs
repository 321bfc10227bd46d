use crate::errors::{SweepError, SweepResult};
use crate::models::normalize::AlertRow;
use crate::models::sweep::{Outcome, SweepOutput};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Aggregate statistics of one sweep, rendered as the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub total: usize,
    pub success: usize,
    pub empty: usize,
    pub failed: usize,
    pub rows: usize,
    pub distinct_municipalities: usize,
    pub first_week: Option<u32>,
    pub last_week: Option<u32>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl SweepSummary {
    pub fn from_output(output: &SweepOutput) -> Self {
        let mut success = 0;
        let mut empty = 0;
        let mut failed = 0;
        for record in &output.outcomes {
            match record.outcome {
                Outcome::Success { .. } => success += 1,
                Outcome::Empty => empty += 1,
                Outcome::Failure { .. } => failed += 1,
            }
        }

        let distinct: BTreeSet<u32> = output.rows.iter().map(|r| r.geocode).collect();
        let weeks: Vec<u32> = output.rows.iter().filter_map(|r| r.epiweek).collect();
        let dates: Vec<NaiveDate> = output.rows.iter().filter_map(|r| r.week_start).collect();

        Self {
            total: output.outcomes.len(),
            success,
            empty,
            failed,
            rows: output.rows.len(),
            distinct_municipalities: distinct.len(),
            first_week: weeks.iter().min().copied(),
            last_week: weeks.iter().max().copied(),
            first_date: dates.iter().min().copied(),
            last_date: dates.iter().max().copied(),
        }
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "=".repeat(64);
        writeln!(f, "{border}")?;
        writeln!(f, "RESUMO DO DOWNLOAD")?;
        writeln!(f, "{border}")?;
        writeln!(f, "Total de municípios processados: {}", self.total)?;
        writeln!(f, "Municípios com dados baixados:   {}", self.success)?;
        writeln!(f, "Municípios sem dados:            {}", self.empty)?;
        writeln!(f, "Municípios com erro:             {}", self.failed)?;
        writeln!(f, "Total de registros:              {}", self.rows)?;
        writeln!(
            f,
            "Municípios únicos no dataset:    {}",
            self.distinct_municipalities
        )?;
        if let (Some(first), Some(last)) = (self.first_week, self.last_week) {
            writeln!(f, "Período: semanas {first} a {last}")?;
        }
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            writeln!(f, "Datas:   {first} a {last}")?;
        }
        write!(f, "{border}")
    }
}

/// Seal a finished sweep: fail with `NoDataCollected` when not a single
/// municipality succeeded, otherwise hand back the consolidated rows
/// (iteration order, no dedup) and their summary.
pub fn finalize(output: SweepOutput) -> SweepResult<(Vec<AlertRow>, SweepSummary)> {
    let summary = SweepSummary::from_output(&output);
    if summary.success == 0 {
        return Err(SweepError::NoDataCollected {
            processed: summary.total,
        });
    }
    Ok((output.rows, summary))
}

/// Write the consolidated dataset as UTF-8 comma-separated text. The
/// header is the fixed entity/date columns followed by the sorted union
/// of every passthrough column observed across rows; rows missing a
/// column get an empty cell.
pub fn write_csv(rows: &[AlertRow], path: &Path) -> SweepResult<()> {
    let columns = passthrough_columns(rows);

    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = vec!["cidade", "geocode", "data_iniSE", "SE"];
    header.extend(columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.municipality.clone());
        record.push(row.geocode.to_string());
        record.push(
            row.week_start
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        );
        record.push(row.epiweek.map(|w| w.to_string()).unwrap_or_default());
        for column in &columns {
            record.push(row.extra.get(column).map(cell_text).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn passthrough_columns(rows: &[AlertRow]) -> Vec<String> {
    let mut columns = BTreeSet::new();
    for row in rows {
        for key in row.extra.keys() {
            columns.insert(key.clone());
        }
    }
    columns.into_iter().collect()
}

/// Render one JSON value as a CSV cell. Strings go out unquoted, nested
/// structures as compact JSON.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sweep::MunicipalityOutcome;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn row(name: &str, geocode: u32, week: u32, extra: &[(&str, Value)]) -> AlertRow {
        AlertRow {
            municipality: name.to_string(),
            geocode,
            week_start: NaiveDate::from_ymd_opt(2024, 1, 7),
            epiweek: Some(week),
            extra: extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn outcome(name: &str, geocode: u32, outcome: Outcome) -> MunicipalityOutcome {
        MunicipalityOutcome {
            municipality: name.to_string(),
            geocode,
            outcome,
        }
    }

    fn mixed_output() -> SweepOutput {
        SweepOutput {
            rows: vec![
                row("Curitiba", 4106902, 202402, &[("casos", json!(5))]),
                row("Curitiba", 4106902, 202403, &[("casos", json!(8))]),
                row("Maringá", 4115200, 202404, &[("nivel", json!(2))]),
            ],
            outcomes: vec![
                outcome("Curitiba", 4106902, Outcome::Success { rows: 2 }),
                outcome("Maringá", 4115200, Outcome::Success { rows: 1 }),
                outcome("Londrina", 4113700, Outcome::Empty),
                outcome(
                    "Sarandi",
                    4126256,
                    Outcome::Failure {
                        reason: "HTTP status 500".to_string(),
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_summary_counts_and_extents() {
        let summary = SweepSummary::from_output(&mixed_output());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success + summary.empty + summary.failed, summary.total);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.distinct_municipalities, 2);
        assert!(summary.distinct_municipalities <= summary.success);
        assert_eq!(summary.first_week, Some(202402));
        assert_eq!(summary.last_week, Some(202404));
    }

    #[test]
    fn test_finalize_passes_rows_through_in_order() {
        let (rows, summary) = finalize(mixed_output()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].epiweek, Some(202402));
        assert_eq!(rows[2].municipality, "Maringá");
        assert_eq!(summary.success, 2);
    }

    #[test]
    fn test_finalize_without_any_success_is_no_data() {
        let output = SweepOutput {
            rows: Vec::new(),
            outcomes: vec![
                outcome(
                    "Curitiba",
                    4106902,
                    Outcome::Failure {
                        reason: "request failed".to_string(),
                    },
                ),
                outcome(
                    "Londrina",
                    4113700,
                    Outcome::Failure {
                        reason: "request failed".to_string(),
                    },
                ),
            ],
        };

        let err = finalize(output).unwrap_err();
        assert!(matches!(err, SweepError::NoDataCollected { processed: 2 }));
    }

    #[test]
    fn test_summary_display_reports_all_counts() {
        let rendered = SweepSummary::from_output(&mixed_output()).to_string();
        assert!(rendered.contains("RESUMO DO DOWNLOAD"));
        assert!(rendered.contains("processados: 4"));
        assert!(rendered.contains("baixados:   2"));
        assert!(rendered.contains("sem dados:            1"));
        assert!(rendered.contains("com erro:             1"));
        assert!(rendered.contains("semanas 202402 a 202404"));
    }

    #[test]
    fn test_write_csv_union_header_and_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("infodengue.csv");

        let rows = vec![
            row("Curitiba", 4106902, 202402, &[("casos", json!(5))]),
            row(
                "Maringá",
                4115200,
                202404,
                &[("nivel", json!(2)), ("Rt", json!(0.93))],
            ),
        ];
        write_csv(&rows, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();

        // Fixed columns first, then the sorted union of passthrough keys
        assert_eq!(
            lines.next().unwrap(),
            "cidade,geocode,data_iniSE,SE,Rt,casos,nivel"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Curitiba,4106902,2024-01-07,202402,,5,"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Maringá,4115200,2024-01-07,202404,0.93,,2"
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_write_csv_renders_value_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tipos.csv");

        let rows = vec![row(
            "Curitiba",
            4106902,
            202402,
            &[
                ("nome_regional", json!("Metropolitana")),
                ("receptivo", json!(true)),
                ("notif_accum_year", json!(null)),
            ],
        )];
        write_csv(&rows, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let data_line = contents.lines().nth(1).unwrap();
        assert_eq!(
            data_line,
            "Curitiba,4106902,2024-01-07,202402,Metropolitana,,true"
        );
    }
}
