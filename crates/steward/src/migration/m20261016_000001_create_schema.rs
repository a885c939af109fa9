//! Initial migration: accounts, their repository references, and tracked repositories.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_accounts(manager).await?;
        self.create_account_references(manager).await?;
        self.create_tracked_repositories(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackedRepositories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountReferences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_accounts(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_active")
                    .table(Accounts::Table)
                    .col(Accounts::Active)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_account_references(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccountReferences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountReferences::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccountReferences::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountReferences::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AccountReferences::Uri).text().not_null())
                    .col(
                        ColumnDef::new(AccountReferences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_references_account")
                            .from(AccountReferences::Table, AccountReferences::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A URL appears at most once per profile
        manager
            .create_index(
                Index::create()
                    .name("idx_account_references_account_uri")
                    .table(AccountReferences::Table)
                    .col(AccountReferences::AccountId)
                    .col(AccountReferences::Uri)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_tracked_repositories(
        &self,
        manager: &SchemaManager<'_>,
    ) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackedRepositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackedRepositories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // Ownership
                    .col(
                        ColumnDef::new(TrackedRepositories::OwnerId)
                            .big_integer()
                            .not_null(),
                    )
                    // Identity
                    .col(
                        ColumnDef::new(TrackedRepositories::Source)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrackedRepositories::MachineName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TrackedRepositories::Url).text().not_null())
                    // Content
                    .col(
                        ColumnDef::new(TrackedRepositories::Label)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrackedRepositories::Description)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TrackedRepositories::OpenIssues)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    // Tracking
                    .col(
                        ColumnDef::new(TrackedRepositories::ContentHash)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrackedRepositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TrackedRepositories::SyncedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tracked_repositories_owner")
                            .from(TrackedRepositories::Table, TrackedRepositories::OwnerId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One owner per upstream URL; concurrent claims fail here instead of racing
        manager
            .create_index(
                Index::create()
                    .name("idx_tracked_repos_url")
                    .table(TrackedRepositories::Table)
                    .col(TrackedRepositories::Url)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Natural key used by the diff phase
        manager
            .create_index(
                Index::create()
                    .name("idx_tracked_repos_owner_source_name")
                    .table(TrackedRepositories::Table)
                    .col(TrackedRepositories::OwnerId)
                    .col(TrackedRepositories::Source)
                    .col(TrackedRepositories::MachineName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracked_repos_synced")
                    .table(TrackedRepositories::Table)
                    .col(TrackedRepositories::SyncedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AccountReferences {
    Table,
    Id,
    AccountId,
    Position,
    Uri,
    CreatedAt,
}

#[derive(DeriveIden)]
enum TrackedRepositories {
    Table,
    Id,
    OwnerId,
    Source,
    MachineName,
    Url,
    Label,
    Description,
    OpenIssues,
    ContentHash,
    CreatedAt,
    SyncedAt,
}
