use sea_orm::DatabaseConnection;
use tabled::Tabled;

use steward::TrackedRepositoryModel;
use steward::repository;

use super::output::{OutputFormat, print_rows};

#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct RepositoryDisplay {
    #[tabled(rename = "Owner")]
    owner_id: i64,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Issues")]
    open_issues: i32,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "Synced")]
    synced_at: String,
}

impl From<&TrackedRepositoryModel> for RepositoryDisplay {
    fn from(model: &TrackedRepositoryModel) -> Self {
        Self {
            owner_id: model.owner_id,
            source: model.source.to_string(),
            key: model.machine_name.clone(),
            label: model.label.clone(),
            open_issues: model.open_issues,
            url: model.url.clone(),
            synced_at: model.synced_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// List tracked repositories, optionally for one account.
pub(crate) async fn handle_repos(
    account: Option<i64>,
    output: OutputFormat,
    db: &DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let models = match account {
        Some(owner_id) => repository::find_by_owner(db, owner_id).await?,
        None => repository::find_all(db).await?,
    };

    if models.is_empty() && matches!(output, OutputFormat::Table) {
        println!("No tracked repositories. Run: steward sync");
        return Ok(());
    }

    let rows: Vec<RepositoryDisplay> = models.iter().map(RepositoryDisplay::from).collect();
    print_rows(&rows, output)
}
