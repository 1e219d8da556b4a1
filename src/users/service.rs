use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{
    email::{is_valid_email, normalize_email},
    model::{validate_name, NewUser, ProfileUpdate, Role, User, UserChanges, UserExtras},
    repo::UserStore,
};
use crate::{
    auth::{
        password::{
            check_password_strength, hash_password, verify_password, verify_unknown_account,
        },
        JwtKeys,
    },
    error::{AppError, AppResult},
};

/// Account creation, credential checks and token issuance.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl IdentityService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    #[instrument(skip(self, password, extras))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        extras: UserExtras,
    ) -> AppResult<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::validation("user must provide an email"));
        }
        let name = validate_name(&extras.name).map_err(AppError::Validation)?;

        let password_hash = hash_password(password)?;
        let user = self
            .store
            .insert(NewUser {
                email,
                password_hash,
                name,
                is_active: extras.is_active,
                role: extras.role,
            })
            .await?;

        info!(user_id = user.id, email = %user.email, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn create_superuser(&self, email: &str, password: &str) -> AppResult<User> {
        let extras = UserExtras {
            role: Role::Superuser,
            ..UserExtras::default()
        };
        self.create_user(email, password, extras).await
    }

    /// Every failure mode collapses into [`AppError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<User> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_by_email(&email).await? else {
            verify_unknown_account(password)?;
            warn!(%email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(%email, user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = user.id, "login for inactive user");
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    pub fn issue_token(&self, user: &User) -> AppResult<String> {
        let token = self.keys.sign(user.id)?;
        info!(user_id = user.id, "token issued");
        Ok(token)
    }

    /// Maps a bearer token back to its active owner.
    pub async fn resolve_token(&self, token: &str) -> AppResult<User> {
        let claims = self.keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("invalid or expired token")
        })?;
        self.resolve(claims.sub).await
    }

    pub async fn resolve(&self, user_id: i64) -> AppResult<User> {
        match self.store.find_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Unauthorized("user inactive or deleted")),
        }
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> AppResult<User> {
        let name = update
            .name
            .as_deref()
            .map(validate_name)
            .transpose()
            .map_err(AppError::Validation)?;
        let password_hash = match update.password.as_deref() {
            Some(plain) => {
                check_password_strength(plain).map_err(AppError::Validation)?;
                Some(hash_password(plain)?)
            }
            None => None,
        };

        let changes = UserChanges {
            name,
            password_hash,
        };
        let user = self
            .store
            .update(user_id, changes)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(user_id = user.id, "profile updated");
        Ok(user)
    }

    /// Checks the address the way the public signup form does, before any store access.
    pub fn validate_signup(email: &str, password: &str) -> AppResult<()> {
        if !is_valid_email(&normalize_email(email)) {
            return Err(AppError::validation("enter a valid email address"));
        }
        check_password_strength(password).map_err(AppError::Validation)
    }

    /// Staff-only listing of every account, ascending id.
    pub async fn list_users(&self, caller: &User) -> AppResult<Vec<User>> {
        if !caller.is_staff() {
            warn!(user_id = caller.id, role = %caller.role, "non-staff user listing denied");
            return Err(AppError::Forbidden);
        }
        self.store.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::JwtConfig,
        users::{memory::MemoryUserStore, MAX_NAME_LEN},
    };

    fn service() -> IdentityService {
        let keys = JwtKeys::from_config(&JwtConfig {
            secret: "test".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        });
        IdentityService::new(Arc::new(MemoryUserStore::new()), keys)
    }

    #[tokio::test]
    async fn create_then_authenticate() {
        let svc = service();
        let user = svc
            .create_user("test@example.com", "ExamplePassword", UserExtras::default())
            .await
            .unwrap();
        assert_eq!(user.email, "test@example.com");
        assert_ne!(user.password_hash, "ExamplePassword");
        assert!(user.is_active);
        assert!(!user.is_staff());
        assert!(!user.is_superuser());

        let authed = svc
            .authenticate("test@example.com", "ExamplePassword")
            .await
            .unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn create_normalizes_email_domain() {
        let svc = service();
        let user = svc
            .create_user("Test2@Example.com", "sample123", UserExtras::default())
            .await
            .unwrap();
        assert_eq!(user.email, "Test2@example.com");

        // lookups go through the same normalization
        assert!(svc.authenticate("Test2@EXAMPLE.COM", "sample123").await.is_ok());
    }

    #[tokio::test]
    async fn create_without_email_fails() {
        let svc = service();
        let err = svc
            .create_user("", "x", UserExtras::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let svc = service();
        svc.create_user("dup@example.com", "pass123", UserExtras::default())
            .await
            .unwrap();
        let err = svc
            .create_user("dup@EXAMPLE.com", "pass123", UserExtras::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));
    }

    #[tokio::test]
    async fn superuser_gets_both_flags() {
        let svc = service();
        let admin = svc
            .create_superuser("admin@example.com", "pass123")
            .await
            .unwrap();
        assert!(admin.is_staff());
        assert!(admin.is_superuser());
    }

    #[tokio::test]
    async fn authentication_failures_look_the_same() {
        let svc = service();
        svc.create_user("a@example.com", "pass123", UserExtras::default())
            .await
            .unwrap();

        let unknown = svc.authenticate("b@example.com", "pass123").await.unwrap_err();
        let wrong = svc.authenticate("a@example.com", "nope123").await.unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unknown_email_still_runs_password_verification() {
        use crate::auth::password::VERIFY_CALLS;

        let svc = service();
        svc.create_user("a@example.com", "pass123", UserExtras::default())
            .await
            .unwrap();

        VERIFY_CALLS.with(|c| c.set(0));
        let _ = svc.authenticate("nobody@example.com", "pass123").await;
        assert_eq!(VERIFY_CALLS.with(|c| c.get()), 1);

        VERIFY_CALLS.with(|c| c.set(0));
        let _ = svc.authenticate("a@example.com", "wrong12").await;
        assert_eq!(VERIFY_CALLS.with(|c| c.get()), 1);
    }

    #[tokio::test]
    async fn overlong_names_are_rejected() {
        let svc = service();
        let extras = UserExtras {
            name: "n".repeat(MAX_NAME_LEN + 45),
            ..UserExtras::default()
        };
        assert!(matches!(
            svc.create_user("long@example.com", "pass123", extras).await,
            Err(AppError::Validation(_))
        ));
        assert!(svc.authenticate("long@example.com", "pass123").await.is_err());

        let user = svc
            .create_user("short@example.com", "pass123", UserExtras::default())
            .await
            .unwrap();
        let err = svc
            .update_profile(
                user.id,
                ProfileUpdate {
                    name: Some("n".repeat(MAX_NAME_LEN + 1)),
                    password: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(svc.resolve(user.id).await.unwrap().name, "");
    }

    #[tokio::test]
    async fn inactive_users_cannot_authenticate() {
        let svc = service();
        let extras = UserExtras {
            is_active: false,
            ..UserExtras::default()
        };
        let user = svc
            .create_user("off@example.com", "pass123", extras)
            .await
            .unwrap();
        assert!(matches!(
            svc.authenticate("off@example.com", "pass123").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.resolve(user.id).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn token_resolves_back_to_its_user() {
        let svc = service();
        let user = svc
            .create_user("t@example.com", "pass123", UserExtras::default())
            .await
            .unwrap();
        let token = svc.issue_token(&user).unwrap();
        let resolved = svc.resolve_token(&token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        assert!(matches!(
            svc.resolve_token("garbage").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn update_profile_rehashes_password() {
        let svc = service();
        let user = svc
            .create_user("p@example.com", "oldpass", UserExtras::default())
            .await
            .unwrap();

        let updated = svc
            .update_profile(
                user.id,
                ProfileUpdate {
                    name: Some("New Name".into()),
                    password: Some("newpass123".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "New Name");
        assert_ne!(updated.password_hash, "newpass123");
        assert!(svc.authenticate("p@example.com", "newpass123").await.is_ok());
        assert!(svc.authenticate("p@example.com", "oldpass").await.is_err());
    }

    #[tokio::test]
    async fn update_profile_rejects_short_password() {
        let svc = service();
        let user = svc
            .create_user("s@example.com", "oldpass", UserExtras::default())
            .await
            .unwrap();
        let err = svc
            .update_profile(
                user.id,
                ProfileUpdate {
                    name: None,
                    password: Some("123".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(svc.authenticate("s@example.com", "oldpass").await.is_ok());
    }

    #[tokio::test]
    async fn only_staff_can_list_users() {
        let svc = service();
        let admin = svc.create_superuser("admin@example.com", "pass123").await.unwrap();
        let user = svc
            .create_user("user@example.com", "pass234", UserExtras::default())
            .await
            .unwrap();

        let all = svc.list_users(&admin).await.unwrap();
        assert_eq!(
            all.iter().map(|u| u.id).collect::<Vec<_>>(),
            vec![admin.id, user.id]
        );
        assert!(matches!(svc.list_users(&user).await, Err(AppError::Forbidden)));
    }

    #[test]
    fn signup_validation() {
        assert!(IdentityService::validate_signup("test@example.com", "testpass123").is_ok());
        assert!(IdentityService::validate_signup("test@example.com", "123").is_err());
        assert!(IdentityService::validate_signup("not-an-email", "testpass123").is_err());
    }
}
