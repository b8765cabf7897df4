/// User model and database operations
///
/// Users authenticate by email and carry a role that drives the task
/// authorization policy. Accounts are never hard-deleted by this layer; they
/// are deactivated instead.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'user',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     account_locked BOOLEAN NOT NULL DEFAULT FALSE,
///     failed_login_attempts INTEGER NOT NULL DEFAULT 0,
///     last_login_attempt TIMESTAMPTZ,
///     requires_password_change BOOLEAN NOT NULL DEFAULT FALSE,
///     last_password_change TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::models::user::{CreateUser, Role, User};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("John Doe".to_string()),
///     role: Role::User,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Number of consecutive failed logins after which an account is locked
pub const MAX_FAILED_LOGIN_ATTEMPTS: i32 = 5;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, is_active, account_locked, \
     failed_login_attempts, last_login_attempt, requires_password_change, \
     last_password_change, created_at, updated_at, last_login_at";

/// Role assigned to a user account
///
/// Admins hold every permission. Managers can assign tasks and change task
/// status for tasks they can see. Regular users hold no extra permissions
/// beyond creator/assignee rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Superuser: every permission
    Admin,

    /// Elevated: may assign tasks and change task status
    Manager,

    /// Default role with no extra permissions
    User,
}

/// Fine-grained permission checked by the authorization policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// View every task regardless of the visibility set
    ViewAllTasks,

    /// Change a task's status without being creator or assignee
    ChangeTaskStatus,

    /// Assign tasks to other users
    AssignTask,

    /// Deactivate and manage user accounts
    ManageUsers,
}

impl Role {
    /// Whether the role is the superuser role
    pub fn is_superuser(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Whether the role holds the given permission
    ///
    /// Admins hold everything; managers hold a task-management subset.
    pub fn has_perm(&self, perm: Permission) -> bool {
        match self {
            Role::Admin => true,
            Role::Manager => matches!(perm, Permission::ChangeTaskStatus | Permission::AssignTask),
            Role::User => false,
        }
    }

    /// Role as the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }
}

/// User model representing an account row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, the login identity (case-insensitive via CITEXT)
    pub email: String,

    /// Argon2id password hash, never plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Assigned role
    pub role: Role,

    /// Deactivated accounts cannot log in; this layer never deletes users
    pub is_active: bool,

    /// Locked after too many failed login attempts
    pub account_locked: bool,

    /// Consecutive failed login attempts since the last success
    pub failed_login_attempts: i32,

    /// When the last login attempt (success or failure) happened
    pub last_login_attempt: Option<DateTime<Utc>>,

    /// Forces a password change on next login when set
    pub requires_password_change: bool,

    /// When the password was last changed
    pub last_password_change: DateTime<Utc>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last successfully logged in
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Initial role
    pub role: Role,
}

/// Input for updating a user's profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New display name (use Some(None) to clear)
    pub name: Option<Option<String>>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique constraint) or
    /// the database operation fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.name)
            .bind(data.role)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (case-insensitive via CITEXT)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Updates a user's profile fields
    ///
    /// Only non-None fields are updated; `updated_at` is always stamped.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(name_opt) = data.name {
            q = q.bind(name_opt);
        }

        q.fetch_optional(pool).await
    }

    /// Records a failed login attempt for the account
    ///
    /// Increments the counter and locks the account once it reaches
    /// [`MAX_FAILED_LOGIN_ATTEMPTS`]. The increment and the lock decision
    /// happen in a single statement.
    pub async fn record_failed_login(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users
             SET failed_login_attempts = failed_login_attempts + 1,
                 account_locked = account_locked OR failed_login_attempts + 1 >= $2,
                 last_login_attempt = NOW(),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(MAX_FAILED_LOGIN_ATTEMPTS)
            .fetch_optional(pool)
            .await
    }

    /// Resets the failed-login counter after a successful authentication
    ///
    /// Also stamps `last_login_attempt` and `last_login_at`.
    pub async fn reset_login_attempts(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET failed_login_attempts = 0,
                 last_login_attempt = NOW(),
                 last_login_at = NOW(),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password hash and clears the forced-change flag
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET password_hash = $2,
                 requires_password_change = FALSE,
                 last_password_change = NOW(),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deactivates an account
    ///
    /// Users are never hard-deleted by this layer; deactivation removes the
    /// ability to log in while leaving task history intact.
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists active users (digest recipients), oldest accounts first
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE is_active = TRUE ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }
}
