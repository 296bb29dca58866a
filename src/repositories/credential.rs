//! SeaORM-backed [`CredentialLookup`].

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use super::CredentialLookup;
use crate::error::{StoreError, map_db_err};
use crate::models::owner_credential::{ActiveModel, Column, Entity};

#[derive(Clone)]
pub struct CredentialRepository {
    db: DatabaseConnection,
}

impl CredentialRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialLookup for CredentialRepository {
    async fn owner_credential(&self, owner_id: i64) -> Result<Option<String>, StoreError> {
        let credential = Entity::find_by_id(owner_id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("loading owner credential", e))?;
        Ok(credential.map(|row| row.token))
    }

    async fn set_owner_credential(&self, owner_id: i64, token: &str) -> Result<(), StoreError> {
        let model = ActiveModel {
            owner_id: Set(owner_id),
            token: Set(token.to_string()),
            updated_at: Set(Utc::now().fixed_offset()),
        };

        Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::OwnerId)
                    .update_columns([Column::Token, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| map_db_err("storing owner credential", e))?;

        tracing::info!(owner_id, "Owner credential stored");
        Ok(())
    }
}
