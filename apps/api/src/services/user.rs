//! User accounts and their address books.

use serde::Serialize;
use tracing::info;

use tavola_core::{
    Address, AddressChanges, EmployeeProfile, ListParams, NewAddress, NewUser, NewUserByAdmin,
    Page, User, UserChanges, Validate,
};
use tavola_core::validation::validate_password;
use tavola_db::{AddressRepository, DbError, DbSession, UserRepository};

use crate::error::{ApiError, ApiResult};
use crate::password::{hash_password, verify_password};

/// A user together with their current delivery address.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub user: User,
    pub delivery_address: Option<Address>,
}

/// What administrators see: the account plus any employee profile.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: User,
    pub employee_profile: Option<EmployeeProfile>,
}

pub struct UserService<'s> {
    session: &'s mut DbSession,
}

impl<'s> UserService<'s> {
    pub fn new(session: &'s mut DbSession) -> Self {
        UserService { session }
    }

    async fn ensure_email_free(&mut self, email: &str, owner: Option<i64>) -> ApiResult<()> {
        match self.session.users().find_by_email(email).await? {
            Some(existing) if Some(existing.id) != owner => Err(ApiError::AlreadyExists(format!(
                "User with email '{}' already exists.",
                email
            ))),
            _ => Ok(()),
        }
    }

    /// Self-registration. Never grants roles.
    pub async fn create_user(&mut self, new_user: &NewUser) -> ApiResult<User> {
        new_user.validate()?;
        self.ensure_email_free(&new_user.email, None).await?;

        let hash = hash_password(&new_user.password)?;
        let user = self.session.users().create(new_user, &hash, false, false).await?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    pub async fn create_user_by_admin(&mut self, payload: &NewUserByAdmin) -> ApiResult<AdminUserView> {
        payload.validate()?;
        self.ensure_email_free(&payload.user.email, None).await?;

        let hash = hash_password(&payload.user.password)?;
        let user = self
            .session
            .users()
            .create(&payload.user, &hash, payload.is_admin, payload.is_employee)
            .await?;

        let employee_profile = match &payload.employee_profile {
            Some(profile) => Some(self.session.employee_profiles().create(user.id, profile).await?),
            None => None,
        };

        info!(
            user_id = user.id,
            is_admin = user.is_admin,
            is_employee = user.is_employee,
            "User created by admin"
        );
        Ok(AdminUserView {
            user,
            employee_profile,
        })
    }

    /// Checks credentials for the token endpoint.
    pub async fn authenticate(&mut self, email: &str, password: &str) -> ApiResult<User> {
        let user = self
            .session
            .users()
            .find_by_email(email)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User with email '{}' was not found.", email)))?;

        if !verify_password(password, &user.password_hash) {
            return Err(ApiError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn get_by_id(&mut self, id: i64) -> ApiResult<User> {
        Ok(self.session.users().get_by_id(id).await?)
    }

    pub async fn find_by_email(&mut self, email: &str) -> ApiResult<Option<User>> {
        Ok(self.session.users().find_by_email(email).await?)
    }

    pub async fn get_admin_view(&mut self, id: i64) -> ApiResult<AdminUserView> {
        let user = self.session.users().get_by_id(id).await?;
        let employee_profile = self.session.employee_profiles().find_by_user(id).await?;
        Ok(AdminUserView {
            user,
            employee_profile,
        })
    }

    /// Changing the email to one held by another user fails; keeping
    /// one's own email is fine.
    pub async fn update_user(&mut self, user_id: i64, changes: &UserChanges) -> ApiResult<User> {
        changes.validate()?;
        if let Some(email) = &changes.email {
            self.ensure_email_free(email, Some(user_id)).await?;
        }

        let user = self.session.users().update(user_id, changes).await?;
        info!(user_id, "User updated");
        Ok(user)
    }

    pub async fn set_password(&mut self, user_id: i64, password: &str) -> ApiResult<()> {
        validate_password(password).map_err(ApiError::invalid)?;
        let hash = hash_password(password)?;
        self.session.users().set_password_hash(user_id, &hash).await?;
        info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn delete_user(&mut self, user_id: i64) -> ApiResult<()> {
        if self.session.users().delete(user_id).await? {
            info!(user_id, "User deleted");
        }
        Ok(())
    }

    pub async fn list_users(&mut self, params: &ListParams) -> ApiResult<Page<User>> {
        let sort = params.resolve(UserRepository::SORTABLE)?;
        let (users, total) = self.session.users().list(params, sort).await?;
        Ok(Page::new(users, total, params))
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// The most recently added address, used as the default delivery one.
    pub async fn delivery_address(&mut self, user_id: i64) -> ApiResult<Option<Address>> {
        Ok(self.session.addresses().latest_for_user(user_id).await?)
    }

    pub async fn view(&mut self, user: User) -> ApiResult<UserView> {
        let delivery_address = self.delivery_address(user.id).await?;
        Ok(UserView {
            user,
            delivery_address,
        })
    }

    /// Returns the existing row when the user already has this exact address.
    pub async fn add_address(&mut self, user_id: i64, address: &NewAddress) -> ApiResult<Address> {
        address.validate()?;
        Ok(self.session.addresses().find_or_create(user_id, address).await?)
    }

    pub async fn update_address(
        &mut self,
        user_id: i64,
        address_id: i64,
        changes: &AddressChanges,
    ) -> ApiResult<Address> {
        changes.validate()?;
        match self.session.addresses().update(user_id, address_id, changes).await {
            Ok(address) => Ok(address),
            Err(DbError::NotFound { .. }) => Err(ApiError::AddressDoesNotExist(address_id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_address(&mut self, user_id: i64, address_id: i64) -> ApiResult<()> {
        if self.session.addresses().delete_for_user(user_id, address_id).await? {
            info!(user_id, address_id, "Address deleted");
        }
        Ok(())
    }

    pub async fn list_addresses(&mut self, user_id: i64, params: &ListParams) -> ApiResult<Page<Address>> {
        let sort = params.resolve(AddressRepository::SORTABLE)?;
        let (addresses, total) = self
            .session
            .addresses()
            .list_for_user(user_id, params, sort)
            .await?;
        Ok(Page::new(addresses, total, params))
    }
}
