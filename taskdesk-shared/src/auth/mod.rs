/// Authentication and authorization primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: JWT token generation and validation (HS256)
/// - [`policy`]: pure task-level authorization predicates
///
/// Authentication (who is this) lives in `password` and `jwt`;
/// authorization (what may they do to this task) lives entirely in
/// `policy`, as pure functions handlers call after loading the task.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::auth::password::{hash_password, verify_password};
/// use taskdesk_shared::auth::jwt::{create_token, Claims, TokenType};
/// use taskdesk_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Role::User, TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
pub mod policy;
