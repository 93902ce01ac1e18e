//! Initial schema: accounts, catalog, businesses, profiles, memberships,
//! wallets and the points ledger.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string_len(255).not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string_len(255).not_null())
                    .col(ColumnDef::new(Users::FullName).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                    .col(ColumnDef::new(Users::CustomerCode).string_len(6).null().unique_key())
                    .col(ColumnDef::new(Users::IsActive).boolean().not_null().default(true))
                    .col(timestamp(Users::CreatedAt))
                    .col(timestamp(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Categories::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Categories::Name).string_len(100).not_null().unique_key())
                    .col(ColumnDef::new(Categories::Description).text().null())
                    .col(ColumnDef::new(Categories::IsActive).boolean().not_null().default(true))
                    .col(timestamp(Categories::CreatedAt))
                    .col(timestamp(Categories::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubCategories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SubCategories::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SubCategories::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(SubCategories::Name).string_len(100).not_null())
                    .col(timestamp(SubCategories::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sub_categories_category")
                            .from(SubCategories::Table, SubCategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sub_categories_category_name")
                    .table(SubCategories::Table)
                    .col(SubCategories::CategoryId)
                    .col(SubCategories::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Businesses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Businesses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Businesses::OwnerUserId).uuid().not_null())
                    .col(ColumnDef::new(Businesses::Name).string_len(120).not_null())
                    .col(ColumnDef::new(Businesses::Description).text().null())
                    .col(ColumnDef::new(Businesses::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(Businesses::SubCategoryId).uuid().null())
                    .col(ColumnDef::new(Businesses::PrimaryColor).string_len(7).not_null())
                    .col(ColumnDef::new(Businesses::SecondaryColor).string_len(7).not_null())
                    .col(ColumnDef::new(Businesses::LogoUrl).text().null())
                    .col(ColumnDef::new(Businesses::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Businesses::ReferralsEnabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Businesses::WelcomeMessage).text().null())
                    .col(timestamp(Businesses::CreatedAt))
                    .col(timestamp(Businesses::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_businesses_owner")
                            .from(Businesses::Table, Businesses::OwnerUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_businesses_category")
                            .from(Businesses::Table, Businesses::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_businesses_sub_category")
                            .from(Businesses::Table, Businesses::SubCategoryId)
                            .to(SubCategories::Table, SubCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_businesses_owner")
                    .table(Businesses::Table)
                    .col(Businesses::OwnerUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(Profiles::Name).string_len(60).not_null())
                    .col(ColumnDef::new(Profiles::Description).text().null())
                    .col(ColumnDef::new(Profiles::BadgeColor).string_len(7).not_null())
                    .col(ColumnDef::new(Profiles::BadgeIcon).string_len(64).null())
                    .col(ColumnDef::new(Profiles::EarningMultiplierBp).integer().not_null())
                    .col(
                        ColumnDef::new(Profiles::WelcomeBonusPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Profiles::ReferralBonusPoints)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Profiles::Preset).string_len(16).null())
                    .col(ColumnDef::new(Profiles::IsDefault).boolean().not_null().default(false))
                    .col(ColumnDef::new(Profiles::IsDeletable).boolean().not_null().default(true))
                    .col(timestamp(Profiles::CreatedAt))
                    .col(timestamp(Profiles::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profiles_business")
                            .from(Profiles::Table, Profiles::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_business_name")
                    .table(Profiles::Table)
                    .col(Profiles::BusinessId)
                    .col(Profiles::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Customers::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Customers::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(Customers::UserId).uuid().not_null())
                    .col(ColumnDef::new(Customers::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(Customers::ReferredByUserId).uuid().null())
                    .col(timestamp(Customers::JoinedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_business")
                            .from(Customers::Table, Customers::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_user")
                            .from(Customers::Table, Customers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_profile")
                            .from(Customers::Table, Customers::ProfileId)
                            .to(Profiles::Table, Profiles::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_referrer")
                            .from(Customers::Table, Customers::ReferredByUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customers_business_user")
                    .table(Customers::Table)
                    .col(Customers::BusinessId)
                    .col(Customers::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Wallets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Wallets::UserId).uuid().not_null())
                    .col(ColumnDef::new(Wallets::BusinessId).uuid().not_null())
                    .col(counter(Wallets::PointsBalance))
                    .col(counter(Wallets::LifetimeEarned))
                    .col(counter(Wallets::LifetimeRedeemed))
                    .col(counter(Wallets::Version))
                    .col(timestamp(Wallets::CreatedAt))
                    .col(timestamp(Wallets::UpdatedAt))
                    .check(Expr::col(Wallets::PointsBalance).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallets_user")
                            .from(Wallets::Table, Wallets::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallets_business")
                            .from(Wallets::Table, Wallets::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallets_user_business")
                    .table(Wallets::Table)
                    .col(Wallets::UserId)
                    .col(Wallets::BusinessId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PointTransactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PointTransactions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PointTransactions::BusinessId).uuid().not_null())
                    .col(ColumnDef::new(PointTransactions::UserId).uuid().not_null())
                    .col(ColumnDef::new(PointTransactions::WalletId).uuid().not_null())
                    .col(ColumnDef::new(PointTransactions::Sequence).big_integer().not_null())
                    .col(ColumnDef::new(PointTransactions::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(PointTransactions::PurchaseAmountCents).big_integer().null())
                    .col(ColumnDef::new(PointTransactions::BasePoints).big_integer().null())
                    .col(ColumnDef::new(PointTransactions::MultiplierBp).integer().null())
                    .col(ColumnDef::new(PointTransactions::Points).big_integer().not_null())
                    .col(ColumnDef::new(PointTransactions::BalanceAfter).big_integer().not_null())
                    .col(ColumnDef::new(PointTransactions::IdempotencyKey).string_len(128).null())
                    .col(ColumnDef::new(PointTransactions::Note).text().null())
                    .col(ColumnDef::new(PointTransactions::CreatedBy).uuid().null())
                    .col(timestamp(PointTransactions::CreatedAt))
                    .check(Expr::col(PointTransactions::Points).ne(0))
                    .check(Expr::col(PointTransactions::BalanceAfter).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_point_transactions_wallet")
                            .from(PointTransactions::Table, PointTransactions::WalletId)
                            .to(Wallets::Table, Wallets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_point_transactions_business")
                            .from(PointTransactions::Table, PointTransactions::BusinessId)
                            .to(Businesses::Table, Businesses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_point_transactions_wallet_sequence")
                    .table(PointTransactions::Table)
                    .col(PointTransactions::WalletId)
                    .col(PointTransactions::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_point_transactions_idempotency")
                    .table(PointTransactions::Table)
                    .col(PointTransactions::BusinessId)
                    .col(PointTransactions::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_point_transactions_business_created")
                    .table(PointTransactions::Table)
                    .col(PointTransactions::BusinessId)
                    .col(PointTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PointTransactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Businesses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubCategories::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn timestamp<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

fn counter<T: IntoIden>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .big_integer()
        .not_null()
        .default(0)
        .to_owned()
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FullName,
    Role,
    CustomerCode,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Description,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SubCategories {
    Table,
    Id,
    CategoryId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Businesses {
    Table,
    Id,
    OwnerUserId,
    Name,
    Description,
    CategoryId,
    SubCategoryId,
    PrimaryColor,
    SecondaryColor,
    LogoUrl,
    Status,
    ReferralsEnabled,
    WelcomeMessage,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    BusinessId,
    Name,
    Description,
    BadgeColor,
    BadgeIcon,
    EarningMultiplierBp,
    WelcomeBonusPoints,
    ReferralBonusPoints,
    Preset,
    IsDefault,
    IsDeletable,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    BusinessId,
    UserId,
    ProfileId,
    ReferredByUserId,
    JoinedAt,
}

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    UserId,
    BusinessId,
    PointsBalance,
    LifetimeEarned,
    LifetimeRedeemed,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PointTransactions {
    Table,
    Id,
    BusinessId,
    UserId,
    WalletId,
    Sequence,
    Kind,
    PurchaseAmountCents,
    BasePoints,
    MultiplierBp,
    Points,
    BalanceAfter,
    IdempotencyKey,
    Note,
    CreatedBy,
    CreatedAt,
}
