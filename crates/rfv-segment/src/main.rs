mod bootstrap;

use std::path::Path;

use anyhow::{Context, Result};
use rfv_core::settings::Settings;
use rfv_data::analysis::{analyze_file, PipelineOptions, RfvReport};
use rfv_data::cache::ExportCache;
use rfv_data::export::ExportDestination;
use rfv_ui::app::{App, Tab};
use rfv_ui::summary_view::summary_text;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("rfv-segment v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.clear {
        tracing::info!("Saved preferences cleared");
        println!("Saved preferences cleared.");
    }
    let Some(input) = settings.input.clone() else {
        return Ok(());
    };

    tracing::info!(
        "Input: {}, View: {}, Theme: {}, Bins: {}",
        input.display(),
        settings.view,
        settings.theme,
        settings.bins
    );

    // Everything that can fail is checked before anything is shown or written.
    let destination = match &settings.output {
        Some(path) => ExportDestination::to_path(path)?,
        None => ExportDestination::none(),
    };
    let report = segment(&settings, &input)?;

    let mut cache = ExportCache::new();
    if let Some(format) = destination.format() {
        let bytes = cache.get_or_render(&report.customers, format)?;
        if let Some(path) = destination.write_bytes(bytes)? {
            tracing::info!(
                "Exported {} customers to {}",
                report.customers.len(),
                path.display()
            );
        }
    }

    match settings.view.as_str() {
        "summary" => print!("{}", summary_text(&report)),
        _ => App::new(&settings.theme, Tab::Customers, report)
            .with_export(destination, cache)
            .run()?,
    }

    Ok(())
}

/// Build the schema and action table from `settings` and run the pipeline.
fn segment(settings: &Settings, input: &Path) -> Result<RfvReport> {
    let schema = settings.column_schema()?;
    let options = PipelineOptions {
        bins: settings.bins as usize,
        actions: settings.action_table()?,
    };
    analyze_file(input, &schema, settings.sheet.as_deref(), &options)
        .with_context(|| format!("cannot segment {}", input.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    const CSV: &str = "ID_cliente,DiaCompra,CodigoCompra,ValorTotal\n\
                       C1,2021-12-01,P1,100\n\
                       C2,2021-12-05,P2,20\n\
                       C1,2021-12-09,P3,30\n";

    fn settings(args: &[&str]) -> Settings {
        Settings::parse_from(std::iter::once("rfv-segment").chain(args.iter().copied()))
    }

    #[test]
    fn test_segment_with_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let input = tmp.path().join("tx.csv");
        std::fs::write(&input, CSV).expect("write");

        let s = settings(&[input.to_str().unwrap(), "--bins", "5"]);
        let report = segment(&s, &input).unwrap();
        assert_eq!(report.customers.len(), 2);
        assert_eq!(report.histograms[0].bins.len(), 5);
    }

    #[test]
    fn test_segment_with_renamed_columns() {
        let tmp = TempDir::new().expect("tempdir");
        let input = tmp.path().join("tx.csv");
        std::fs::write(
            &input,
            "cust,when,order,amount\nA,2021-01-02,O1,3\nB,2021-01-01,O2,4\n",
        )
        .expect("write");

        let s = settings(&[
            input.to_str().unwrap(),
            "--customer-column",
            "cust",
            "--date-column",
            "when",
            "--purchase-column",
            "order",
            "--value-column",
            "amount",
        ]);
        let report = segment(&s, &input).unwrap();
        assert_eq!(report.customer("B").unwrap().metrics.recency, 1);
    }

    #[test]
    fn test_segment_error_names_the_input() {
        let tmp = TempDir::new().expect("tempdir");
        let input = tmp.path().join("tx.csv");
        std::fs::write(&input, "ID_cliente,DiaCompra\nC1,2021-12-01\n").expect("write");

        let s = settings(&[input.to_str().unwrap()]);
        let err = segment(&s, &input).unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("tx.csv"));
        assert!(text.contains("CodigoCompra"));
    }

    #[test]
    fn test_segment_with_custom_actions() {
        let tmp = TempDir::new().expect("tempdir");
        let input = tmp.path().join("tx.csv");
        std::fs::write(&input, CSV).expect("write");
        let actions = tmp.path().join("actions.json");
        std::fs::write(&actions, r#"{"AAA": "Thank them"}"#).expect("write");

        let s = settings(&[
            input.to_str().unwrap(),
            "--actions",
            actions.to_str().unwrap(),
        ]);
        let report = segment(&s, &input).unwrap();
        assert_eq!(
            report.customer("C1").unwrap().action.as_deref(),
            Some("Thank them")
        );
    }
}
