use crate::cli::OutputFormat;
use crate::model::ItemOutcome;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Writes per-item outcomes to `<prefix>.json` or `<prefix>.csv`.
pub fn write_report(
    outcomes: &[ItemOutcome],
    prefix: &str,
    format: &OutputFormat,
) -> anyhow::Result<PathBuf> {
    let path = match format {
        OutputFormat::Json => {
            let fname = PathBuf::from(format!("{prefix}.json"));
            let mut f = File::create(&fname)?;
            writeln!(f, "{}", serde_json::to_string_pretty(outcomes)?)?;
            fname
        }
        OutputFormat::Csv => {
            let fname = PathBuf::from(format!("{prefix}.csv"));
            let mut wtr = csv::Writer::from_path(&fname)?;
            for item in outcomes {
                wtr.serialize(item)?;
            }
            wtr.flush()?;
            fname
        }
    };
    tracing::info!(path = %path.display(), rows = outcomes.len(), "report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemStatus;

    fn outcomes() -> Vec<ItemOutcome> {
        vec![
            ItemOutcome { item: "popup.js".into(), status: ItemStatus::Written, error: None },
            ItemOutcome {
                item: "icons/a.png".into(),
                status: ItemStatus::Failed,
                error: Some("status 404".into()),
            },
        ]
    }

    #[test]
    fn csv_report_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("sync").to_string_lossy().into_owned();
        let path = write_report(&outcomes(), &prefix, &OutputFormat::Csv).unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, ["item,status,error", "popup.js,written,", "icons/a.png,failed,status 404"]);
    }

    #[test]
    fn json_report_round_trips_status_names() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("sync").to_string_lossy().into_owned();
        let path = write_report(&outcomes(), &prefix, &OutputFormat::Json).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value[0]["status"], "written");
        assert_eq!(value[1]["error"], "status 404");
    }
}
