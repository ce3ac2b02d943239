use crate::{pool::DbPool, repositories::utils::map_db_error};
use anyhow::Context;
use async_trait::async_trait;
use services::common::RepositoryError;
use services::membership::{
    Membership, MembershipRepository, MutationState, Organization, OrganizationId,
    PermissionLevel, User, UserId,
};
use tokio_postgres::Row;
use tracing::debug;

pub struct PgMembershipRepository {
    pool: DbPool,
}

impl PgMembershipRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, RepositoryError> {
        self.pool
            .get()
            .await
            .context("Failed to get database connection")
            .map_err(RepositoryError::PoolError)
    }

    fn row_to_organization(row: &Row) -> Result<Organization, RepositoryError> {
        let id: i64 = row
            .try_get("org_id")
            .map_err(|e| RepositoryError::DataConversionError(e.into()))?;
        let name: String = row
            .try_get("org_name")
            .map_err(|e| RepositoryError::DataConversionError(e.into()))?;
        Ok(Organization::new(OrganizationId(id), name))
    }

    /// Rebuild a user from the rows of the user/membership join
    fn rows_to_user(id: UserId, rows: &[Row]) -> Result<User, RepositoryError> {
        let mut nickname = None;
        let mut memberships = Vec::with_capacity(rows.len());

        for row in rows {
            nickname = row
                .try_get::<_, Option<String>>("nick")
                .map_err(|e| RepositoryError::DataConversionError(e.into()))?;

            let org_id: Option<i64> = row
                .try_get("org_id")
                .map_err(|e| RepositoryError::DataConversionError(e.into()))?;
            if org_id.is_none() {
                continue;
            }

            let level: i32 = row
                .try_get("permission_level")
                .map_err(|e| RepositoryError::DataConversionError(e.into()))?;
            let level = PermissionLevel::try_from(level)
                .map_err(|e| RepositoryError::DataConversionError(e.into()))?;
            memberships.push(Membership::from_storage(
                Self::row_to_organization(row)?,
                level,
            ));
        }

        Ok(User::from_storage(id, nickname, memberships))
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn add_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let client = self.client().await?;
        let inserted = client
            .execute(
                "INSERT INTO Users (ID, Nick) VALUES ($1, NULL) ON CONFLICT (ID) DO NOTHING",
                &[&id.0],
            )
            .await
            .map_err(map_db_error)?;

        if inserted > 0 {
            debug!(user_id = %id, "Created user");
        }
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<User, RepositoryError> {
        let client = self.client().await?;
        let rows = client
            .query(
                r#"
                SELECT u.Nick AS nick,
                       o.ID AS org_id,
                       o.Name AS org_name,
                       ou.PermissionLevel AS permission_level
                FROM Users u
                LEFT JOIN OrgUsers ou ON ou.UserID = u.ID
                LEFT JOIN Orgs o ON o.ID = ou.OrgID
                WHERE u.ID = $1
                ORDER BY ou.OrgID
                "#,
                &[&id.0],
            )
            .await
            .map_err(map_db_error)?;
        drop(client);

        if rows.is_empty() {
            self.add_user(id).await?;
            return Ok(User::from_storage(id, None, Vec::new()));
        }

        Self::rows_to_user(id, &rows)
    }

    async fn update_user(&self, user: &mut User) -> Result<usize, RepositoryError> {
        let user_dirty = user.mutation_state() != MutationState::Unchanged;
        let dirty_memberships = user
            .memberships()
            .iter()
            .filter(|m| m.mutation_state() != MutationState::Unchanged)
            .count();
        if !user_dirty && dirty_memberships == 0 {
            return Ok(0);
        }

        let mut client = self.client().await?;
        let transaction = client.transaction().await.map_err(map_db_error)?;
        let mut written = 0;

        match user.mutation_state() {
            MutationState::New => {
                transaction
                    .execute(
                        "INSERT INTO Users (ID, Nick) VALUES ($1, $2) \
                         ON CONFLICT (ID) DO UPDATE SET Nick = EXCLUDED.Nick",
                        &[&user.id().0, &user.nickname()],
                    )
                    .await
                    .map_err(map_db_error)?;
                written += 1;
            }
            MutationState::Changed => {
                transaction
                    .execute(
                        "UPDATE Users SET Nick = $2 WHERE ID = $1",
                        &[&user.id().0, &user.nickname()],
                    )
                    .await
                    .map_err(map_db_error)?;
                written += 1;
            }
            MutationState::Unchanged => {}
        }

        for membership in user.memberships() {
            let org_id = membership.organization().id().0;
            let level = membership.permission_level().as_i32();
            let statement = match membership.mutation_state() {
                MutationState::New => {
                    "INSERT INTO OrgUsers (OrgID, UserID, PermissionLevel) VALUES ($1, $2, $3)"
                }
                MutationState::Changed => {
                    "UPDATE OrgUsers SET PermissionLevel = $3 WHERE OrgID = $1 AND UserID = $2"
                }
                MutationState::Unchanged => continue,
            };
            transaction
                .execute(statement, &[&org_id, &user.id().0, &level])
                .await
                .map_err(map_db_error)?;
            written += 1;
        }

        transaction.commit().await.map_err(map_db_error)?;
        user.mark_persisted();

        debug!(user_id = %user.id(), written, "Persisted user changes");
        Ok(written)
    }

    async fn delete_user(&self, user: &User) -> Result<(), RepositoryError> {
        let client = self.client().await?;
        client
            .execute("DELETE FROM Users WHERE ID = $1", &[&user.id().0])
            .await
            .map_err(map_db_error)?;

        debug!(user_id = %user.id(), "Deleted user");
        Ok(())
    }

    async fn get_org_names(&self) -> Result<Vec<String>, RepositoryError> {
        let client = self.client().await?;
        let rows = client
            .query("SELECT Name AS org_name FROM Orgs ORDER BY Name", &[])
            .await
            .map_err(map_db_error)?;

        rows.iter()
            .map(|row| {
                row.try_get("org_name")
                    .map_err(|e| RepositoryError::DataConversionError(e.into()))
            })
            .collect()
    }

    async fn org_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM Orgs WHERE Name = $1) AS found",
                &[&name],
            )
            .await
            .map_err(map_db_error)?;

        row.try_get("found")
            .map_err(|e| RepositoryError::DataConversionError(e.into()))
    }

    async fn add_org(&self, org: &Organization) -> Result<(), RepositoryError> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO Orgs (ID, Name) VALUES ($1, $2)",
                &[&org.id().0, &org.name()],
            )
            .await
            .map_err(map_db_error)?;

        debug!(org_id = %org.id(), name = org.name(), "Created organization");
        Ok(())
    }

    async fn get_org_by_id(
        &self,
        id: OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT ID AS org_id, Name AS org_name FROM Orgs WHERE ID = $1",
                &[&id.0],
            )
            .await
            .map_err(map_db_error)?;

        row.as_ref().map(Self::row_to_organization).transpose()
    }

    async fn get_org_by_name(&self, name: &str) -> Result<Option<Organization>, RepositoryError> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT ID AS org_id, Name AS org_name FROM Orgs WHERE Name = $1",
                &[&name],
            )
            .await
            .map_err(map_db_error)?;

        row.as_ref().map(Self::row_to_organization).transpose()
    }

    async fn delete_user_org(
        &self,
        membership: &Membership,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        let client = self.client().await?;
        client
            .execute(
                "DELETE FROM OrgUsers WHERE OrgID = $1 AND UserID = $2",
                &[&membership.organization().id().0, &user_id.0],
            )
            .await
            .map_err(map_db_error)?;

        debug!(
            user_id = %user_id,
            org_id = %membership.organization().id(),
            "Deleted membership"
        );
        Ok(())
    }
}
