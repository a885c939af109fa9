use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Print rows as a rounded table or pretty JSON.
pub(crate) fn print_rows<T: Serialize + Tabled>(
    rows: &[T],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
    }
    Ok(())
}
