use rand::{distributions::Alphanumeric, Rng};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::i18n::MessageKey;
use crate::state::AppState;

use super::dto::SignUpRequest;
use super::password::hash_password;
use super::repo::{DuplicateEmail, UserStore};
use super::repo_types::User;
use super::validation::validate;

pub(crate) const ACTIVATION_TOKEN_LEN: usize = 32;

pub(crate) fn generate_activation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ACTIVATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Full signup flow: validation, duplicate detection, hashing, persistence
/// and activation-mail delivery. The persisted row is removed again when the
/// mail cannot be delivered, so callers observe all-or-nothing.
pub async fn register(state: &AppState, candidate: &SignUpRequest) -> Result<User, ApiError> {
    let mut errors = validate(candidate);

    // The duplicate pre-check runs alongside the field rules so its outcome
    // merges into the same ordered map. It is skipped when the e-mail field
    // itself already failed.
    if errors.email.is_none() {
        let email = candidate.email.as_deref().unwrap_or_default();
        if state.users.find_by_email(email).await?.is_some() {
            warn!(%email, "signup with e-mail already in use");
            errors.email = Some(MessageKey::EmailInUse);
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Empty errors guarantee all three fields are present.
    let username = candidate.username.as_deref().unwrap_or_default();
    let email = candidate.email.as_deref().unwrap_or_default();
    let password = candidate.password.as_deref().unwrap_or_default();

    let password_hash = hash_password(password)?;
    let token = generate_activation_token();

    let user = match state
        .users
        .create(username, email, &password_hash, &token)
        .await
    {
        Ok(user) => user,
        // Two concurrent signups can both pass the pre-check; the unique
        // constraint is the authoritative duplicate detector.
        Err(e) if e.downcast_ref::<DuplicateEmail>().is_some() => {
            warn!(%email, "concurrent signup lost the unique-constraint race");
            errors.email = Some(MessageKey::EmailInUse);
            return Err(ApiError::Validation(errors));
        }
        Err(e) => return Err(e.into()),
    };

    let activation_url = format!(
        "{}/api/1.0/users/token/{}",
        state.config.public_base_url, token
    );
    if let Err(e) = state.mailer.send_activation(email, &token, &activation_url).await {
        error!(error = %e, user_id = %user.id, "activation e-mail failed; removing user");
        if let Err(del) = state.users.delete(user.id).await {
            error!(error = %del, user_id = %user.id, "rollback delete failed");
        }
        return Err(ApiError::EmailDelivery);
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Flips the user holding the token to active and clears the token. Stale
/// tokens (already-activated users carry none) and unknown tokens both fail.
pub async fn activate(store: &dyn UserStore, token: &str) -> Result<User, ApiError> {
    match store.activate_by_token(token).await? {
        Some(user) => {
            info!(user_id = %user.id, "account activated");
            Ok(user)
        }
        None => {
            warn!("activation attempted with unknown or stale token");
            Err(ApiError::InvalidToken)
        }
    }
}


#[cfg(test)]
mod flow_tests {
    use super::*;
    use std::sync::Arc;

    use axum::async_trait;
    use uuid::Uuid;

    use crate::mailer::Mailer;
    use crate::users::repo::InMemoryUserStore;

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_activation(
            &self,
            _to: &str,
            _token: &str,
            _activation_url: &str,
        ) -> anyhow::Result<()> {
            anyhow::bail!("mail provider is down")
        }
    }

    /// Store whose pre-check never sees existing rows, forcing the
    /// insert-time duplicate path that backs concurrent signups.
    struct BlindStore(InMemoryUserStore);

    #[async_trait]
    impl UserStore for BlindStore {
        async fn create(
            &self,
            username: &str,
            email: &str,
            password_hash: &str,
            activation_token: &str,
        ) -> anyhow::Result<User> {
            self.0.create(username, email, password_hash, activation_token).await
        }

        async fn find_by_email(&self, _email: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }

        async fn activate_by_token(&self, token: &str) -> anyhow::Result<Option<User>> {
            self.0.activate_by_token(token).await
        }

        async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
            self.0.delete(id).await
        }

        async fn count(&self) -> anyhow::Result<i64> {
            self.0.count().await
        }

        async fn delete_all(&self) -> anyhow::Result<()> {
            self.0.delete_all().await
        }
    }

    fn candidate() -> SignUpRequest {
        SignUpRequest {
            username: Some("user1".into()),
            email: Some("user1@mail.com".into()),
            password: Some("P4ssword".into()),
        }
    }

    fn state_with(store: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> AppState {
        AppState::fake_with(store, mailer)
    }

    #[tokio::test]
    async fn registration_stores_hashed_inactive_user_with_token() {
        let store = Arc::new(InMemoryUserStore::new());
        let state = state_with(store.clone(), Arc::new(crate::mailer::LogMailer));

        register(&state, &candidate()).await.expect("signup ok");

        let user = store
            .find_by_email("user1@mail.com")
            .await
            .unwrap()
            .expect("row persisted");
        assert_ne!(user.password_hash, "P4ssword");
        assert!(user.password_hash.starts_with("$argon2"));
        assert!(user.inactive);
        let token = user.activation_token.expect("token issued");
        assert_eq!(token.chars().count(), ACTIVATION_TOKEN_LEN);
    }

    #[tokio::test]
    async fn mail_failure_rolls_back_the_created_user() {
        let store = Arc::new(InMemoryUserStore::new());
        let state = state_with(store.clone(), Arc::new(FailingMailer));

        let err = register(&state, &candidate()).await.unwrap_err();

        assert!(matches!(err, ApiError::EmailDelivery));
        assert_eq!(store.count().await.unwrap(), 0, "no orphan row survives");
    }

    #[tokio::test]
    async fn second_registration_with_same_email_keeps_the_first_row() {
        let store = Arc::new(InMemoryUserStore::new());
        let state = state_with(store.clone(), Arc::new(crate::mailer::LogMailer));

        register(&state, &candidate()).await.expect("first signup ok");

        let mut second = candidate();
        second.username = Some("someone-else".into());
        let err = register(&state, &second).await.unwrap_err();

        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.email, Some(MessageKey::EmailInUse));
                assert!(errors.username.is_none());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.count().await.unwrap(), 1);
        let first = store.find_by_email("user1@mail.com").await.unwrap().unwrap();
        assert_eq!(first.username, "user1");
    }

    #[tokio::test]
    async fn insert_time_duplicate_maps_to_validation_error() {
        let store = Arc::new(BlindStore(InMemoryUserStore::new()));
        let state = state_with(store.clone(), Arc::new(crate::mailer::LogMailer));

        register(&state, &candidate()).await.expect("first signup ok");
        let err = register(&state, &candidate()).await.unwrap_err();

        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.email, Some(MessageKey::EmailInUse))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn activation_token_is_single_use() {
        let store = Arc::new(InMemoryUserStore::new());
        let state = state_with(store.clone(), Arc::new(crate::mailer::LogMailer));

        register(&state, &candidate()).await.expect("signup ok");
        let token = store
            .find_by_email("user1@mail.com")
            .await
            .unwrap()
            .unwrap()
            .activation_token
            .expect("token issued");

        let user = activate(store.as_ref(), &token).await.expect("activation ok");
        assert!(!user.inactive);
        assert!(user.activation_token.is_none());

        let err = activate(store.as_ref(), &token).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let store = InMemoryUserStore::new();
        let err = activate(&store, "no-such-token").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[tokio::test]
    async fn truncation_resets_duplicate_detection() {
        let store = Arc::new(InMemoryUserStore::new());
        let state = state_with(store.clone(), Arc::new(crate::mailer::LogMailer));

        register(&state, &candidate()).await.expect("first signup ok");
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete_all().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        register(&state, &candidate()).await.expect("signup after truncation ok");
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
