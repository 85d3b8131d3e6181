use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NavNodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NavNodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NavNodes::NodeKey).text().not_null())
                    .col(ColumnDef::new(NavNodes::ParentId).integer())
                    .col(ColumnDef::new(NavNodes::Label).text().not_null())
                    .col(ColumnDef::new(NavNodes::LabelZh).text())
                    .col(ColumnDef::new(NavNodes::Description).text())
                    .col(
                        ColumnDef::new(NavNodes::Kind)
                            .text()
                            .not_null()
                            .default("module"),
                    )
                    .col(
                        ColumnDef::new(NavNodes::Status)
                            .text()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(NavNodes::Icon).text())
                    .col(
                        ColumnDef::new(NavNodes::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(NavNodes::CreatedBy).text())
                    .col(ColumnDef::new(NavNodes::UpdatedBy).text())
                    .col(
                        ColumnDef::new(NavNodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NavNodes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // Deleting a folder takes its descendants with it
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nav_nodes_parent_id")
                            .from(NavNodes::Table, NavNodes::ParentId)
                            .to(NavNodes::Table, NavNodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_nav_nodes_node_key")
                    .table(NavNodes::Table)
                    .col(NavNodes::NodeKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_nav_nodes_parent_sort")
                    .table(NavNodes::Table)
                    .col(NavNodes::ParentId)
                    .col(NavNodes::SortOrder)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NavNodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NavNodes {
    Table,
    Id,
    NodeKey,
    ParentId,
    Label,
    LabelZh,
    Description,
    Kind,
    Status,
    Icon,
    SortOrder,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}
