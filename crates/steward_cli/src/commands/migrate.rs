use console::style;
use sea_orm::DatabaseConnection;

use steward::db;
use steward::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            Migrator::up(&db, None).await?;
            println!(
                "{} Applied {} migrations",
                style("✓").green().bold(),
                pending
            );
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("{} Rolled back the last migration", style("✓").green().bold());
        }
        MigrateAction::Status => print_status(&db).await?,
        MigrateAction::Fresh => {
            Migrator::fresh(&db).await?;
            println!(
                "{} Dropped all tables and reapplied migrations",
                style("✓").green().bold()
            );
        }
    }

    Ok(())
}

async fn print_status(db: &DatabaseConnection) -> Result<(), Box<dyn std::error::Error>> {
    for migration in Migrator::get_applied_migrations(db).await? {
        println!("{} {}", style("applied").green(), migration.name());
    }
    for migration in Migrator::get_pending_migrations(db).await? {
        println!("{} {}", style("pending").yellow(), migration.name());
    }
    Ok(())
}
