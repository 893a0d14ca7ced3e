use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_sites_table::Migration),
            Box::new(m20250301_000003_create_machines_table::Migration),
            Box::new(m20250301_000004_create_daily_reports_table::Migration),
            Box::new(m20250301_000005_create_fiches_tables::Migration),
            Box::new(m20250301_000006_create_personnel_and_vehicles_tables::Migration),
            Box::new(m20250301_000007_create_warehouse_tables::Migration),
            Box::new(m20250301_000008_create_notifications_table::Migration),
            Box::new(m20250301_000009_create_audit_logs_table::Migration),
            Box::new(m20250415_000010_add_machine_issue_columns::Migration),
            Box::new(m20250602_000011_create_personnel_attendance_table::Migration),
        ]
    }
}

// Shared identifiers referenced by foreign keys across migrations.

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    FullName,
    PasswordHash,
    Role,
    Language,
    IsActive,
    IsWarehouseManager,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sites {
    Table,
    Id,
    Name,
    Code,
    Address,
    City,
    Country,
    StartDate,
    EndDate,
    Status,
    IsActive,
    CaposquadraId,
    Progress,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Machines {
    Table,
    Id,
    Name,
    Code,
    MachineType,
    Brand,
    ModelName,
    Plate,
    Status,
    Notes,
    SiteId,
    IsActive,
    HasIssue,
    CurrentIssue,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Personnel {
    Table,
    Id,
    FirstName,
    LastName,
    Role,
    Phone,
    Email,
    HireDate,
    Active,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WarehouseItems {
    Table,
    Id,
    Code,
    Name,
    Description,
    Unit,
    CategoryId,
    MinThreshold,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WarehouseRequests {
    Table,
    Id,
    RequesterId,
    SiteId,
    Status,
    Note,
    ManagerReply,
    HandledBy,
    HandledAt,
    ReadByRequester,
    CreatedAt,
    UpdatedAt,
}

mod m20250301_000001_create_users_table {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::FullName).string().null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Users::Language)
                                .string_len(2)
                                .not_null()
                                .default("it"),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::IsWarehouseManager)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_role")
                        .table(Users::Table)
                        .col(Users::Role)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000002_create_sites_table {
    use super::{Sites, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_sites_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sites::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sites::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sites::Name).string().not_null())
                        .col(ColumnDef::new(Sites::Code).string_len(50).null().unique_key())
                        .col(ColumnDef::new(Sites::Address).string().null())
                        .col(ColumnDef::new(Sites::City).string().null())
                        .col(
                            ColumnDef::new(Sites::Country)
                                .string()
                                .not_null()
                                .default("France"),
                        )
                        .col(ColumnDef::new(Sites::StartDate).date().null())
                        .col(ColumnDef::new(Sites::EndDate).date().null())
                        .col(
                            ColumnDef::new(Sites::Status)
                                .string_len(20)
                                .not_null()
                                .default("aperto"),
                        )
                        .col(
                            ColumnDef::new(Sites::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Sites::CaposquadraId).uuid().null())
                        .col(
                            ColumnDef::new(Sites::Progress)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Sites::Description).text().null())
                        .col(
                            ColumnDef::new(Sites::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sites::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sites_caposquadra_id")
                                .from(Sites::Table, Sites::CaposquadraId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sites_caposquadra_id")
                        .table(Sites::Table)
                        .col(Sites::CaposquadraId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sites_status")
                        .table(Sites::Table)
                        .col(Sites::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sites::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000003_create_machines_table {
    use super::{Machines, Sites};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_machines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Machines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Machines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Machines::Name).string().not_null())
                        .col(ColumnDef::new(Machines::Code).string_len(50).null().unique_key())
                        .col(ColumnDef::new(Machines::MachineType).string_len(20).null())
                        .col(ColumnDef::new(Machines::Brand).string().null())
                        .col(ColumnDef::new(Machines::ModelName).string().null())
                        .col(ColumnDef::new(Machines::Plate).string_len(30).null())
                        .col(
                            ColumnDef::new(Machines::Status)
                                .string_len(20)
                                .not_null()
                                .default("attivo"),
                        )
                        .col(ColumnDef::new(Machines::Notes).text().null())
                        .col(ColumnDef::new(Machines::SiteId).uuid().null())
                        .col(
                            ColumnDef::new(Machines::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Machines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Machines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_machines_site_id")
                                .from(Machines::Table, Machines::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_machines_site_id")
                        .table(Machines::Table)
                        .col(Machines::SiteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Machines::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000004_create_daily_reports_table {
    use super::{Sites, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_daily_reports_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DailyReports::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DailyReports::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DailyReports::Date).date().not_null())
                        .col(ColumnDef::new(DailyReports::SiteId).uuid().not_null())
                        .col(
                            ColumnDef::new(DailyReports::TotalHours)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DailyReports::WorkersCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(DailyReports::MachinesUsed).string().null())
                        .col(ColumnDef::new(DailyReports::Activities).text().null())
                        .col(ColumnDef::new(DailyReports::Notes).text().null())
                        .col(ColumnDef::new(DailyReports::Weather).string_len(50).null())
                        .col(ColumnDef::new(DailyReports::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(DailyReports::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DailyReports::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_daily_reports_site_id")
                                .from(DailyReports::Table, DailyReports::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_daily_reports_created_by")
                                .from(DailyReports::Table, DailyReports::CreatedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_daily_reports_site_date")
                        .table(DailyReports::Table)
                        .col(DailyReports::SiteId)
                        .col(DailyReports::Date)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DailyReports::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DailyReports {
        Table,
        Id,
        Date,
        SiteId,
        TotalHours,
        WorkersCount,
        MachinesUsed,
        Activities,
        Notes,
        Weather,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000005_create_fiches_tables {
    use super::{Machines, Sites, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_fiches_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Fiches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Fiches::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Fiches::Date).date().not_null())
                        .col(ColumnDef::new(Fiches::SiteId).uuid().not_null())
                        .col(ColumnDef::new(Fiches::MachineId).uuid().null())
                        .col(ColumnDef::new(Fiches::FicheType).string_len(20).not_null())
                        .col(ColumnDef::new(Fiches::Description).text().not_null())
                        .col(ColumnDef::new(Fiches::Operator).string().null())
                        .col(ColumnDef::new(Fiches::Hours).decimal().null())
                        .col(ColumnDef::new(Fiches::Notes).text().null())
                        .col(ColumnDef::new(Fiches::ExcavationType).string().null())
                        .col(ColumnDef::new(Fiches::Stratigraphy).text().null())
                        .col(ColumnDef::new(Fiches::Material).string().null())
                        .col(ColumnDef::new(Fiches::TotalDepthM).decimal().null())
                        .col(ColumnDef::new(Fiches::PileDiameterMm).decimal().null())
                        .col(ColumnDef::new(Fiches::PanelWidthM).decimal().null())
                        .col(ColumnDef::new(Fiches::PanelHeightM).decimal().null())
                        .col(ColumnDef::new(Fiches::CastingDate).date().null())
                        .col(ColumnDef::new(Fiches::CubicMetresCast).decimal().null())
                        .col(ColumnDef::new(Fiches::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Fiches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_fiches_site_id")
                                .from(Fiches::Table, Fiches::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_fiches_machine_id")
                                .from(Fiches::Table, Fiches::MachineId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_fiches_created_by")
                                .from(Fiches::Table, Fiches::CreatedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_fiches_site_date")
                        .table(Fiches::Table)
                        .col(Fiches::SiteId)
                        .col(Fiches::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(FicheLayers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FicheLayers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FicheLayers::FicheId).uuid().not_null())
                        .col(ColumnDef::new(FicheLayers::Position).integer().not_null())
                        .col(ColumnDef::new(FicheLayers::FromM).decimal().not_null())
                        .col(ColumnDef::new(FicheLayers::ToM).decimal().not_null())
                        .col(ColumnDef::new(FicheLayers::Description).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_fiche_layers_fiche_id")
                                .from(FicheLayers::Table, FicheLayers::FicheId)
                                .to(Fiches::Table, Fiches::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FicheLayers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Fiches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Fiches {
        Table,
        Id,
        Date,
        SiteId,
        MachineId,
        FicheType,
        Description,
        Operator,
        Hours,
        Notes,
        ExcavationType,
        Stratigraphy,
        Material,
        TotalDepthM,
        PileDiameterMm,
        PanelWidthM,
        PanelHeightM,
        CastingDate,
        CubicMetresCast,
        CreatedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum FicheLayers {
        Table,
        Id,
        FicheId,
        Position,
        FromM,
        ToM,
        Description,
    }
}

mod m20250301_000006_create_personnel_and_vehicles_tables {
    use super::Personnel;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000006_create_personnel_and_vehicles_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Personnel::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Personnel::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Personnel::FirstName).string().not_null())
                        .col(ColumnDef::new(Personnel::LastName).string().not_null())
                        .col(ColumnDef::new(Personnel::Role).string().null())
                        .col(ColumnDef::new(Personnel::Phone).string_len(50).null())
                        .col(ColumnDef::new(Personnel::Email).string().null())
                        .col(ColumnDef::new(Personnel::HireDate).date().null())
                        .col(
                            ColumnDef::new(Personnel::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Personnel::Notes).text().null())
                        .col(
                            ColumnDef::new(Personnel::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Personnel::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Vehicles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Vehicles::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Vehicles::Brand).string().not_null())
                        .col(ColumnDef::new(Vehicles::Model).string().not_null())
                        .col(
                            ColumnDef::new(Vehicles::Plate)
                                .string_len(30)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Vehicles::Year).integer().null())
                        .col(ColumnDef::new(Vehicles::MileageKm).big_integer().null())
                        .col(ColumnDef::new(Vehicles::Fuel).string_len(30).null())
                        .col(ColumnDef::new(Vehicles::InsuranceExpiry).date().null())
                        .col(ColumnDef::new(Vehicles::InspectionExpiry).date().null())
                        .col(ColumnDef::new(Vehicles::AssignedTo).uuid().null())
                        .col(ColumnDef::new(Vehicles::Notes).text().null())
                        .col(
                            ColumnDef::new(Vehicles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Vehicles::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_vehicles_assigned_to")
                                .from(Vehicles::Table, Vehicles::AssignedTo)
                                .to(Personnel::Table, Personnel::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Vehicles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Personnel::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Vehicles {
        Table,
        Id,
        Brand,
        Model,
        Plate,
        Year,
        MileageKm,
        Fuel,
        InsuranceExpiry,
        InspectionExpiry,
        AssignedTo,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000007_create_warehouse_tables {
    use super::{Sites, Users, WarehouseItems, WarehouseRequests};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000007_create_warehouse_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseCategories::Name).string().not_null())
                        .col(
                            ColumnDef::new(WarehouseCategories::Slug)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(WarehouseCategories::Description).string().null())
                        .col(ColumnDef::new(WarehouseCategories::Icon).string_len(50).null())
                        .col(ColumnDef::new(WarehouseCategories::Color).string_len(20).null())
                        .col(
                            ColumnDef::new(WarehouseCategories::Ordering)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseCategories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(WarehouseCategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseCategories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseItems::Code)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(WarehouseItems::Name).string().not_null())
                        .col(ColumnDef::new(WarehouseItems::Description).text().null())
                        .col(
                            ColumnDef::new(WarehouseItems::Unit)
                                .string_len(20)
                                .not_null()
                                .default("pz"),
                        )
                        .col(ColumnDef::new(WarehouseItems::CategoryId).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseItems::MinThreshold)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseItems::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(WarehouseItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_items_category_id")
                                .from(WarehouseItems::Table, WarehouseItems::CategoryId)
                                .to(WarehouseCategories::Table, WarehouseCategories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseRequests::RequesterId).uuid().not_null())
                        .col(ColumnDef::new(WarehouseRequests::SiteId).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseRequests::Status)
                                .string_len(20)
                                .not_null()
                                .default("in_attesa"),
                        )
                        .col(ColumnDef::new(WarehouseRequests::Note).text().null())
                        .col(ColumnDef::new(WarehouseRequests::ManagerReply).text().null())
                        .col(ColumnDef::new(WarehouseRequests::HandledBy).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseRequests::HandledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseRequests::ReadByRequester)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(WarehouseRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_requests_requester_id")
                                .from(WarehouseRequests::Table, WarehouseRequests::RequesterId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_requests_site_id")
                                .from(WarehouseRequests::Table, WarehouseRequests::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_requests_status")
                        .table(WarehouseRequests::Table)
                        .col(WarehouseRequests::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseRequestLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseRequestLines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseRequestLines::RequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseRequestLines::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(WarehouseRequestLines::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_request_lines_request_id")
                                .from(
                                    WarehouseRequestLines::Table,
                                    WarehouseRequestLines::RequestId,
                                )
                                .to(WarehouseRequests::Table, WarehouseRequests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_request_lines_item_id")
                                .from(WarehouseRequestLines::Table, WarehouseRequestLines::ItemId)
                                .to(WarehouseItems::Table, WarehouseItems::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseMovements::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(WarehouseMovements::MovementType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseMovements::Quantity)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseMovements::SiteId).uuid().null())
                        .col(ColumnDef::new(WarehouseMovements::UserId).uuid().not_null())
                        .col(ColumnDef::new(WarehouseMovements::Note).string().null())
                        .col(ColumnDef::new(WarehouseMovements::RequestId).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_movements_item_id")
                                .from(WarehouseMovements::Table, WarehouseMovements::ItemId)
                                .to(WarehouseItems::Table, WarehouseItems::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_movements_site_id")
                                .from(WarehouseMovements::Table, WarehouseMovements::SiteId)
                                .to(Sites::Table, Sites::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_movements_user_id")
                                .from(WarehouseMovements::Table, WarehouseMovements::UserId)
                                .to(Users::Table, Users::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_movements_request_id")
                                .from(WarehouseMovements::Table, WarehouseMovements::RequestId)
                                .to(WarehouseRequests::Table, WarehouseRequests::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_movements_item_id")
                        .table(WarehouseMovements::Table)
                        .col(WarehouseMovements::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_movements_created_at")
                        .table(WarehouseMovements::Table)
                        .col(WarehouseMovements::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseMovements::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseRequestLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseRequests::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseCategories {
        Table,
        Id,
        Name,
        Slug,
        Description,
        Icon,
        Color,
        Ordering,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum WarehouseRequestLines {
        Table,
        Id,
        RequestId,
        ItemId,
        Quantity,
    }

    #[derive(DeriveIden)]
    enum WarehouseMovements {
        Table,
        Id,
        ItemId,
        MovementType,
        Quantity,
        SiteId,
        UserId,
        Note,
        RequestId,
        CreatedAt,
    }
}

mod m20250301_000008_create_notifications_table {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000008_create_notifications_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Notifications::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Notifications::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::RecipientUserId).uuid().null())
                        .col(
                            ColumnDef::new(Notifications::RecipientRole)
                                .string_len(20)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Notifications::NotificationType)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Notifications::Message).text().not_null())
                        .col(ColumnDef::new(Notifications::TargetUrl).string().null())
                        .col(
                            ColumnDef::new(Notifications::IsRead)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Notifications::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_notifications_recipient_user_id")
                                .from(Notifications::Table, Notifications::RecipientUserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notifications_recipient_user_id")
                        .table(Notifications::Table)
                        .col(Notifications::RecipientUserId)
                        .col(Notifications::IsRead)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_notifications_recipient_role")
                        .table(Notifications::Table)
                        .col(Notifications::RecipientRole)
                        .col(Notifications::IsRead)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Notifications::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Notifications {
        Table,
        Id,
        RecipientUserId,
        RecipientRole,
        NotificationType,
        Message,
        TargetUrl,
        IsRead,
        CreatedAt,
    }
}

mod m20250301_000009_create_audit_logs_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000009_create_audit_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AuditLogs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(AuditLogs::UserId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::Action).string_len(64).not_null())
                        .col(ColumnDef::new(AuditLogs::TargetType).string_len(64).not_null())
                        .col(ColumnDef::new(AuditLogs::TargetId).string_len(64).null())
                        .col(ColumnDef::new(AuditLogs::ExtraData).json().null())
                        .col(
                            ColumnDef::new(AuditLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_created_at")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AuditLogs {
        Table,
        Id,
        UserId,
        Action,
        TargetType,
        TargetId,
        ExtraData,
        CreatedAt,
    }
}

mod m20250415_000010_add_machine_issue_columns {
    use super::Machines;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250415_000010_add_machine_issue_columns"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // SQLite only accepts one column per ALTER TABLE and has no IF NOT EXISTS for columns.
            if !manager.has_column("machines", "has_issue").await? {
                manager
                    .alter_table(
                        Table::alter()
                            .table(Machines::Table)
                            .add_column(
                                ColumnDef::new(Machines::HasIssue)
                                    .boolean()
                                    .not_null()
                                    .default(false),
                            )
                            .to_owned(),
                    )
                    .await?;
            }
            if !manager.has_column("machines", "current_issue").await? {
                manager
                    .alter_table(
                        Table::alter()
                            .table(Machines::Table)
                            .add_column(ColumnDef::new(Machines::CurrentIssue).string().null())
                            .to_owned(),
                    )
                    .await?;
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .alter_table(
                    Table::alter()
                        .table(Machines::Table)
                        .drop_column(Machines::CurrentIssue)
                        .to_owned(),
                )
                .await?;
            manager
                .alter_table(
                    Table::alter()
                        .table(Machines::Table)
                        .drop_column(Machines::HasIssue)
                        .to_owned(),
                )
                .await
        }
    }
}

mod m20250602_000011_create_personnel_attendance_table {
    use super::{Personnel, Sites};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250602_000011_create_personnel_attendance_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PersonnelAttendance::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PersonnelAttendance::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PersonnelAttendance::PersonnelId).uuid().not_null())
                        .col(ColumnDef::new(PersonnelAttendance::AttendanceDate).date().not_null())
                        .col(
                            ColumnDef::new(PersonnelAttendance::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PersonnelAttendance::SiteId).uuid().null())
                        .col(ColumnDef::new(PersonnelAttendance::Hours).decimal().null())
                        .col(ColumnDef::new(PersonnelAttendance::Note).text().null())
                        .col(
                            ColumnDef::new(PersonnelAttendance::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PersonnelAttendance::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_personnel_attendance_personnel_id")
                                .from(PersonnelAttendance::Table, PersonnelAttendance::PersonnelId)
                                .to(Personnel::Table, Personnel::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_personnel_attendance_site_id")
                                .from(PersonnelAttendance::Table, PersonnelAttendance::SiteId)
                                .to(Sites::Table, Sites::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("uq_personnel_attendance_person_day")
                        .table(PersonnelAttendance::Table)
                        .col(PersonnelAttendance::PersonnelId)
                        .col(PersonnelAttendance::AttendanceDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PersonnelAttendance::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PersonnelAttendance {
        Table,
        Id,
        PersonnelId,
        AttendanceDate,
        Status,
        SiteId,
        Hours,
        Note,
        CreatedAt,
        UpdatedAt,
    }
}
