//! Creates the tables backing the OAuth2 engine:
//! - oauth2_client: registered clients and their redirect URI
//! - oauth2_user: resource owners (email + salted password hash)
//! - oauth2_authorization_code: single-use codes awaiting exchange
//! - oauth2_access_token: opaque bearer tokens

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OAuth2Client::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2Client::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuth2Client::HashedSecret).string().not_null())
                    .col(ColumnDef::new(OAuth2Client::Salt).string().not_null())
                    .col(ColumnDef::new(OAuth2Client::RedirectUri).text().not_null())
                    .col(
                        ColumnDef::new(OAuth2Client::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OAuth2User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2User::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuth2User::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OAuth2User::HashedPassword).string().not_null())
                    .col(ColumnDef::new(OAuth2User::Salt).string().not_null())
                    .col(
                        ColumnDef::new(OAuth2User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // The unique constraint on `code` is what rejects a colliding insert.
        manager
            .create_table(
                Table::create()
                    .table(OAuth2AuthorizationCode::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2AuthorizationCode::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuth2AuthorizationCode::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OAuth2AuthorizationCode::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2AuthorizationCode::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OAuth2AccessToken::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuth2AccessToken::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuth2AccessToken::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OAuth2AccessToken::UserId).string().not_null())
                    .col(
                        ColumnDef::new(OAuth2AccessToken::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuth2AccessToken::RefreshCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // The purge task scans by issue time.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_authorization_code_issued_at")
                    .table(OAuth2AuthorizationCode::Table)
                    .col(OAuth2AuthorizationCode::IssuedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth2_access_token_user_id")
                    .table(OAuth2AccessToken::Table)
                    .col(OAuth2AccessToken::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth2_access_token_user_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth2_authorization_code_issued_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(OAuth2AccessToken::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OAuth2AuthorizationCode::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OAuth2User::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OAuth2Client::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum OAuth2Client {
    #[sea_orm(iden = "oauth2_client")]
    Table,
    Id,
    HashedSecret,
    Salt,
    RedirectUri,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OAuth2User {
    #[sea_orm(iden = "oauth2_user")]
    Table,
    Id,
    Email,
    HashedPassword,
    Salt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OAuth2AuthorizationCode {
    #[sea_orm(iden = "oauth2_authorization_code")]
    Table,
    Id,
    Code,
    UserId,
    IssuedAt,
}

#[derive(DeriveIden)]
enum OAuth2AccessToken {
    #[sea_orm(iden = "oauth2_access_token")]
    Table,
    Id,
    Token,
    UserId,
    IssuedAt,
    RefreshCount,
}
