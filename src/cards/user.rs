//! User management functionality

use crate::traits::*;
use crate::types::*;

/// User manager for handling account holder operations
pub struct UserManager<S: BalanceStorage> {
    pub(crate) storage: S,
    validator: Box<dyn UserValidator>,
}

impl<S: BalanceStorage> UserManager<S> {
    /// Create a new user manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultUserValidator),
        }
    }

    /// Create a new user manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn UserValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a new user
    pub async fn create_user(&mut self, name: String, email: String) -> BalanceResult<User> {
        let user = User::new(name, email);

        self.validator.validate_user(&user)?;
        self.storage.save_user(&user).await?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> BalanceResult<Option<User>> {
        self.storage.get_user(user_id).await
    }

    /// Get a user by ID, returning an error if not found
    pub async fn get_user_required(&self, user_id: &str) -> BalanceResult<User> {
        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| BalanceError::UserNotFound(user_id.to_string()))
    }

    /// Delete a user along with their cards and balance histories
    pub async fn delete_user(&mut self, user_id: &str) -> BalanceResult<()> {
        if self.storage.get_user(user_id).await?.is_none() {
            return Err(BalanceError::UserNotFound(user_id.to_string()));
        }

        self.storage.delete_user(user_id).await?;
        tracing::info!(user_id, "User deleted");
        Ok(())
    }
}
