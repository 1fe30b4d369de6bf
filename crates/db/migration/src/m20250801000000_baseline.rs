use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Users::Table)
                    .col(pk_id_col(manager, Users::Id))
                    .col(uuid_col(Users::Uuid))
                    .col(ColumnDef::new(Users::Username).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(Expr::val(true)),
                    )
                    .col(ColumnDef::new(Users::Permissions).json().not_null())
                    .col(timestamp_col(Users::CreatedAt))
                    .col(timestamp_col(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_uuid")
                    .table(Users::Table)
                    .col(Users::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_users_username")
                    .table(Users::Table)
                    .col(Users::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Locations::Table)
                    .col(pk_id_col(manager, Locations::Id))
                    .col(uuid_col(Locations::Uuid))
                    .col(ColumnDef::new(Locations::Name).string().not_null())
                    .col(timestamp_col(Locations::CreatedAt))
                    .col(timestamp_col(Locations::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_locations_uuid")
                    .table(Locations::Table)
                    .col(Locations::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Mmodels::Table)
                    .col(pk_id_col(manager, Mmodels::Id))
                    .col(uuid_col(Mmodels::Uuid))
                    .col(ColumnDef::new(Mmodels::Name).string().not_null())
                    .col(timestamp_col(Mmodels::CreatedAt))
                    .col(timestamp_col(Mmodels::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_mmodels_uuid")
                    .table(Mmodels::Table)
                    .col(Mmodels::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Items::Table)
                    .col(pk_id_col(manager, Items::Id))
                    .col(uuid_col(Items::Uuid))
                    .col(ColumnDef::new(Items::Name).string().not_null())
                    .col(ColumnDef::new(Items::SerialNumber).string())
                    .col(fk_id_nullable_col(manager, Items::LocationId))
                    .col(fk_id_nullable_col(manager, Items::MmodelId))
                    .col(timestamp_col(Items::CreatedAt))
                    .col(timestamp_col(Items::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_location_id")
                            .from(Items::Table, Items::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_mmodel_id")
                            .from(Items::Table, Items::MmodelId)
                            .to(Mmodels::Table, Mmodels::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_items_uuid")
                    .table(Items::Table)
                    .col(Items::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Technicians::Table)
                    .col(pk_id_col(manager, Technicians::Id))
                    .col(uuid_col(Technicians::Uuid))
                    .col(ColumnDef::new(Technicians::Name).string().not_null())
                    .col(fk_id_nullable_col(manager, Technicians::UserId))
                    .col(
                        ColumnDef::new(Technicians::IsCurrent)
                            .boolean()
                            .not_null()
                            .default(Expr::val(true)),
                    )
                    .col(timestamp_col(Technicians::CreatedAt))
                    .col(timestamp_col(Technicians::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_technicians_user_id")
                            .from(Technicians::Table, Technicians::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_technicians_uuid")
                    .table(Technicians::Table)
                    .col(Technicians::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tickets::Table)
                    .col(pk_id_col(manager, Tickets::Id))
                    .col(uuid_col(Tickets::Uuid))
                    .col(fk_id_nullable_col(manager, Tickets::ItemId))
                    .col(fk_id_nullable_col(manager, Tickets::LocationId))
                    .col(
                        ColumnDef::new(Tickets::ShortDescription)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tickets::LongDescription).text())
                    .col(ColumnDef::new(Tickets::Urgency).integer().not_null())
                    .col(timestamp_col(Tickets::SubmittedAt))
                    .col(fk_id_nullable_col(manager, Tickets::SubmittedById))
                    .col(fk_id_nullable_col(manager, Tickets::TechnicianId))
                    .col(
                        ColumnDef::new(Tickets::IsResolved)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(ColumnDef::new(Tickets::ResolutionNotes).text())
                    .col(ColumnDef::new(Tickets::RecipientEmails).text())
                    .col(
                        ColumnDef::new(Tickets::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(Tickets::CreatedAt))
                    .col(timestamp_col(Tickets::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_item_id")
                            .from(Tickets::Table, Tickets::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_location_id")
                            .from(Tickets::Table, Tickets::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_submitted_by_id")
                            .from(Tickets::Table, Tickets::SubmittedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tickets_technician_id")
                            .from(Tickets::Table, Tickets::TechnicianId)
                            .to(Technicians::Table, Technicians::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tickets_uuid")
                    .table(Tickets::Table)
                    .col(Tickets::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tickets_submitted_at")
                    .table(Tickets::Table)
                    .col(Tickets::SubmittedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tickets_is_resolved")
                    .table(Tickets::Table)
                    .col(Tickets::IsResolved)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(TicketNotes::Table)
                    .col(pk_id_col(manager, TicketNotes::Id))
                    .col(uuid_col(TicketNotes::Uuid))
                    .col(fk_id_col(manager, TicketNotes::TicketId))
                    .col(ColumnDef::new(TicketNotes::When).date().not_null())
                    .col(ColumnDef::new(TicketNotes::Text).text().not_null())
                    .col(fk_id_nullable_col(manager, TicketNotes::SubmittedById))
                    .col(timestamp_col(TicketNotes::CreatedAt))
                    .col(timestamp_col(TicketNotes::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_notes_ticket_id")
                            .from(TicketNotes::Table, TicketNotes::TicketId)
                            .to(Tickets::Table, Tickets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_notes_submitted_by_id")
                            .from(TicketNotes::Table, TicketNotes::SubmittedById)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_ticket_notes_uuid")
                    .table(TicketNotes::Table)
                    .col(TicketNotes::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_ticket_notes_ticket_id")
                    .table(TicketNotes::Table)
                    .col(TicketNotes::TicketId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(History::Table)
                    .col(pk_id_col(manager, History::Id))
                    .col(uuid_col(History::Uuid))
                    .col(timestamp_col(History::When))
                    .col(
                        ColumnDef::new(History::ModelName)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(uuid_nullable_col(History::ObjectId))
                    .col(
                        ColumnDef::new(History::FieldName)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(History::OldValue).text())
                    .col(ColumnDef::new(History::NewValue).text().not_null())
                    .col(fk_id_nullable_col(manager, History::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_history_user_id")
                            .from(History::Table, History::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_history_object")
                    .table(History::Table)
                    .col(History::ModelName)
                    .col(History::ObjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_history_when")
                    .table(History::Table)
                    .col(History::When)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(SavedViews::Table)
                    .col(pk_id_col(manager, SavedViews::Id))
                    .col(uuid_col(SavedViews::Uuid))
                    .col(fk_id_col(manager, SavedViews::UserId))
                    .col(
                        ColumnDef::new(SavedViews::ModelName)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SavedViews::Name).string().not_null())
                    .col(ColumnDef::new(SavedViews::Payload).json().not_null())
                    .col(
                        ColumnDef::new(SavedViews::IsDefault)
                            .boolean()
                            .not_null()
                            .default(Expr::val(false)),
                    )
                    .col(timestamp_col(SavedViews::CreatedAt))
                    .col(timestamp_col(SavedViews::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_saved_views_user_id")
                            .from(SavedViews::Table, SavedViews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_saved_views_uuid")
                    .table(SavedViews::Table)
                    .col(SavedViews::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_saved_views_user_model_name")
                    .table(SavedViews::Table)
                    .col(SavedViews::UserId)
                    .col(SavedViews::ModelName)
                    .col(SavedViews::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SavedViews::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(History::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TicketNotes::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tickets::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Technicians::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Mmodels::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Locations::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn uuid_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().to_owned()
}

fn uuid_nullable_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Uuid,
    Username,
    Email,
    IsActive,
    Permissions,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Locations {
    Table,
    Id,
    Uuid,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Mmodels {
    Table,
    Id,
    Uuid,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Items {
    Table,
    Id,
    Uuid,
    Name,
    SerialNumber,
    LocationId,
    MmodelId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Technicians {
    Table,
    Id,
    Uuid,
    Name,
    UserId,
    IsCurrent,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tickets {
    Table,
    Id,
    Uuid,
    ItemId,
    LocationId,
    ShortDescription,
    LongDescription,
    Urgency,
    SubmittedAt,
    SubmittedById,
    TechnicianId,
    IsResolved,
    ResolutionNotes,
    RecipientEmails,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TicketNotes {
    Table,
    Id,
    Uuid,
    TicketId,
    When,
    Text,
    SubmittedById,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum History {
    Table,
    Id,
    Uuid,
    When,
    ModelName,
    ObjectId,
    FieldName,
    OldValue,
    NewValue,
    UserId,
}

#[derive(Iden)]
enum SavedViews {
    Table,
    Id,
    Uuid,
    UserId,
    ModelName,
    Name,
    Payload,
    IsDefault,
    CreatedAt,
    UpdatedAt,
}
