use axum::{
    extract::{OriginalUri, Path, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::error::ErrorReply;
use crate::i18n::{Locale, MessageKey};
use crate::state::AppState;

use super::dto::{MessageResponse, SignUpRequest};
use super::service;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(sign_up))
        .route("/users/token/:token", post(activate))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    locale: Locale,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    match service::register(&state, &payload).await {
        Ok(_) => Ok(Json(MessageResponse {
            message: locale.text(MessageKey::UserCreated).to_string(),
        })),
        Err(e) => Err(ErrorReply::new(e, uri.path(), locale)),
    }
}

#[instrument(skip(state))]
pub async fn activate(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    locale: Locale,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ErrorReply> {
    match service::activate(state.users.as_ref(), &token).await {
        Ok(_) => Ok(Json(MessageResponse {
            message: locale.text(MessageKey::AccountActivated).to_string(),
        })),
        Err(e) => Err(ErrorReply::new(e, uri.path(), locale)),
    }
}

#[cfg(test)]
mod handler_tests {
    use super::*;
    use axum::http::{StatusCode, Uri};
    use axum::response::IntoResponse;

    fn invalid_payload() -> SignUpRequest {
        // Invalid e-mail keeps the flow out of the database entirely.
        SignUpRequest {
            username: Some("ab".into()),
            email: Some("not-an-email".into()),
            password: Some("short".into()),
        }
    }

    async fn sign_up_body(locale: Locale) -> (StatusCode, serde_json::Value) {
        let response = sign_up(
            State(AppState::fake()),
            OriginalUri(Uri::from_static("/api/1.0/users")),
            locale,
            Json(invalid_payload()),
        )
        .await
        .unwrap_err()
        .into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn invalid_signup_yields_400_envelope_with_all_fields() {
        let (status, body) = sign_up_body(Locale::En).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["path"], "/api/1.0/users");
        assert_eq!(body["message"], "Validation failure");
        let errors = &body["validationErrors"];
        assert_eq!(errors["username"], "Must have min 4 and max 32 characters");
        assert_eq!(errors["email"], "E-mail is not valid");
        assert_eq!(errors["password"], "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn korean_locale_localizes_the_envelope() {
        let (_, body) = sign_up_body(Locale::Ko).await;
        assert_eq!(body["message"], "유효성 검사 오류");
        assert_eq!(
            body["validationErrors"]["email"],
            "올바른 이메일 형식이 아닙니다"
        );
    }

    #[tokio::test]
    async fn valid_signup_returns_localized_success_message() {
        let response = sign_up(
            State(AppState::fake()),
            OriginalUri(Uri::from_static("/api/1.0/users")),
            Locale::En,
            Json(SignUpRequest {
                username: Some("user1".into()),
                email: Some("user1@mail.com".into()),
                password: Some("P4ssword".into()),
            }),
        )
        .await
        .expect("signup ok");
        assert_eq!(response.0.message, "User saved");
    }

    #[tokio::test]
    async fn signup_then_activation_through_the_handlers() {
        use crate::mailer::LogMailer;
        use crate::users::repo::{InMemoryUserStore, UserStore};
        use std::sync::Arc;

        let store = Arc::new(InMemoryUserStore::new());
        let state = AppState::fake_with(store.clone(), Arc::new(LogMailer));

        sign_up(
            State(state.clone()),
            OriginalUri(Uri::from_static("/api/1.0/users")),
            Locale::En,
            Json(SignUpRequest {
                username: Some("user1".into()),
                email: Some("user1@mail.com".into()),
                password: Some("P4ssword".into()),
            }),
        )
        .await
        .expect("signup ok");

        let token = store
            .find_by_email("user1@mail.com")
            .await
            .unwrap()
            .unwrap()
            .activation_token
            .expect("token issued");

        let response = activate(
            State(state),
            OriginalUri(Uri::from_static("/api/1.0/users/token/x")),
            Locale::En,
            Path(token),
        )
        .await
        .expect("activation ok");
        assert_eq!(response.0.message, "Account is activated");
    }

    #[test]
    fn success_message_serialization() {
        let json = serde_json::to_string(&MessageResponse {
            message: Locale::En.text(MessageKey::AccountActivated).to_string(),
        })
        .unwrap();
        assert!(json.contains("Account is activated"));
    }
}
