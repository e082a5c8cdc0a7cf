//! Account, Profile, and Server persistence.
//!
//! Backs the session resolver (auth) and the admin REST surface's server
//! CRUD endpoints.

use settlement_types::{Account, AccountId, Profile, ProfileId, Role, Server, ServerId, ServerStatus};
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `accounts`, `profiles`, and `servers` tables.
pub struct AccountStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountStore<'a> {
    /// Create a new account store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a session's bearer token to its account, for the admin REST
    /// auth resolver.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_by_auth_token(&self, token: &str) -> Result<Option<Account>, DbError> {
        let row = sqlx::query_as::<_, AccountRow>(
            r"SELECT id, email, password_hash, auth_token, role::TEXT as role, created_at
              FROM accounts WHERE auth_token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(AccountRow::into_account))
    }

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (e.g. duplicate email).
    pub async fn insert(&self, account: &Account) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO accounts (id, email, password_hash, auth_token, role, created_at)
              VALUES ($1, $2, $3, $4, $5::role, $6)",
        )
        .bind(account.id.into_inner())
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.auth_token)
        .bind(role_to_db(account.role))
        .bind(account.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the profile owned by an account.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn profile_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<Profile>, DbError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"SELECT id, account_id, username, avatar_reference
              FROM profiles WHERE account_id = $1",
        )
        .bind(account_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ProfileRow::into_profile))
    }

    /// Elevate an account to the Administrator role by email, for the
    /// test-only `PUT /test/elevate-admin/{email}` route.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no account has that email, or
    /// [`DbError::Postgres`] if the update fails.
    pub async fn set_role_by_email(&self, email: &str, role: Role) -> Result<(), DbError> {
        let result = sqlx::query(r"UPDATE accounts SET role = $2::role WHERE email = $1")
            .bind(email)
            .bind(role_to_db(role))
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("account with email {email}")));
        }
        Ok(())
    }

    /// Fetch a single server by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such server exists, or
    /// [`DbError::Postgres`] if the query fails.
    pub async fn get_server(&self, server_id: ServerId) -> Result<Server, DbError> {
        let row = sqlx::query_as::<_, ServerRow>(
            r"SELECT id, name, hostname, port, status::TEXT as status, created_at
              FROM servers WHERE id = $1",
        )
        .bind(server_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(ServerRow::into_server)
            .ok_or_else(|| DbError::NotFound(format!("server {server_id}")))
    }

    /// Update a server's name, hostname, port, and status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn update_server(&self, server: &Server) -> Result<(), DbError> {
        sqlx::query(
            r"UPDATE servers SET name = $2, hostname = $3, port = $4, status = $5::server_status
              WHERE id = $1",
        )
        .bind(server.id.into_inner())
        .bind(&server.name)
        .bind(&server.hostname)
        .bind(i32::from(server.port))
        .bind(server_status_to_db(server.status))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete a server.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_server(&self, server_id: ServerId) -> Result<(), DbError> {
        sqlx::query(r"DELETE FROM servers WHERE id = $1")
            .bind(server_id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// List all servers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_servers(&self) -> Result<Vec<Server>, DbError> {
        let rows = sqlx::query_as::<_, ServerRow>(
            r"SELECT id, name, hostname, port, status::TEXT as status, created_at
              FROM servers ORDER BY created_at",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ServerRow::into_server).collect())
    }

    /// Insert a new server.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (e.g. duplicate
    /// `(hostname, port)`).
    pub async fn insert_server(&self, server: &Server) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO servers (id, name, hostname, port, status, created_at)
              VALUES ($1, $2, $3, $4, $5::server_status, $6)",
        )
        .bind(server.id.into_inner())
        .bind(&server.name)
        .bind(&server.hostname)
        .bind(i32::from(server.port))
        .bind(server_status_to_db(server.status))
        .bind(server.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AccountRow {
    id: uuid::Uuid,
    email: String,
    password_hash: String,
    auth_token: String,
    role: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl AccountRow {
    fn into_account(self) -> Account {
        Account {
            id: AccountId::from(self.id),
            email: self.email,
            password_hash: self.password_hash,
            auth_token: self.auth_token,
            role: role_from_db(&self.role),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProfileRow {
    id: uuid::Uuid,
    account_id: uuid::Uuid,
    username: String,
    avatar_reference: Option<String>,
}

impl ProfileRow {
    fn into_profile(self) -> Profile {
        Profile {
            id: ProfileId::from(self.id),
            account_id: AccountId::from(self.account_id),
            username: self.username,
            avatar_reference: self.avatar_reference,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ServerRow {
    id: uuid::Uuid,
    name: String,
    hostname: String,
    port: i32,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl ServerRow {
    fn into_server(self) -> Server {
        Server {
            id: ServerId::from(self.id),
            name: self.name,
            hostname: self.hostname,
            port: u16::try_from(self.port).unwrap_or(u16::MAX),
            status: server_status_from_db(&self.status),
            created_at: self.created_at,
        }
    }
}

const fn role_to_db(role: Role) -> &'static str {
    match role {
        Role::Member => "member",
        Role::Support => "support",
        Role::Administrator => "administrator",
    }
}

fn role_from_db(value: &str) -> Role {
    match value {
        "support" => Role::Support,
        "administrator" => Role::Administrator,
        _ => Role::Member,
    }
}

const fn server_status_to_db(status: ServerStatus) -> &'static str {
    match status {
        ServerStatus::Offline => "offline",
        ServerStatus::Maintenance => "maintenance",
        ServerStatus::Online => "online",
    }
}

fn server_status_from_db(value: &str) -> ServerStatus {
    match value {
        "maintenance" => ServerStatus::Maintenance,
        "online" => ServerStatus::Online,
        _ => ServerStatus::Offline,
    }
}
