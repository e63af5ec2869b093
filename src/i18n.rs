use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Message keys for every user-facing string. Each key resolves in every
/// supported locale, so lookups can never miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    UsernameNull,
    UsernameSize,
    EmailNull,
    EmailInvalid,
    EmailInUse,
    PasswordNull,
    PasswordSize,
    PasswordPattern,
    UserCreated,
    AccountActivated,
    ValidationFailure,
    EmailFailure,
    InvalidToken,
}

/// Negotiated response language. `En` is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ko,
}

impl Locale {
    /// Picks the highest-weighted supported language from an Accept-Language
    /// header value, falling back to English when the header is absent,
    /// malformed or names no supported language. Ties keep header order;
    /// `q=0` marks a language as not acceptable.
    pub fn resolve(header: Option<&str>) -> Locale {
        let Some(header) = header else {
            return Locale::En;
        };
        let mut best: Option<(Locale, f32)> = None;
        for item in header.split(',') {
            // "ko-KR;q=0.9" -> primary subtag "ko", weight 0.9
            let mut parts = item.split(';');
            let tag = parts.next().unwrap_or("").trim();
            let primary = tag.split('-').next().unwrap_or("");
            let Some(locale) = Locale::from_primary_subtag(primary) else {
                continue;
            };
            let q = parts
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(1.0);
            if q <= 0.0 {
                continue;
            }
            if best.map_or(true, |(_, best_q)| q > best_q) {
                best = Some((locale, q));
            }
        }
        best.map(|(locale, _)| locale).unwrap_or(Locale::En)
    }

    fn from_primary_subtag(tag: &str) -> Option<Locale> {
        if tag.eq_ignore_ascii_case("en") {
            Some(Locale::En)
        } else if tag.eq_ignore_ascii_case("ko") {
            Some(Locale::Ko)
        } else {
            None
        }
    }

    pub fn text(self, key: MessageKey) -> &'static str {
        match self {
            Locale::En => english(key),
            Locale::Ko => korean(key),
        }
    }
}

fn english(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        UsernameNull => "Username cannot be null",
        UsernameSize => "Must have min 4 and max 32 characters",
        EmailNull => "E-mail cannot be null",
        EmailInvalid => "E-mail is not valid",
        EmailInUse => "E-mail in use",
        PasswordNull => "Password cannot be null",
        PasswordSize => "Password must be at least 6 characters",
        PasswordPattern => "Password must have at least 1 uppercase, 1 lowercase letter and 1 number",
        UserCreated => "User saved",
        AccountActivated => "Account is activated",
        ValidationFailure => "Validation failure",
        EmailFailure => "E-mail failure",
        InvalidToken => "This account is either active or the token is invalid",
    }
}

fn korean(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        UsernameNull => "사용자 이름을 입력하세요",
        UsernameSize => "4자 이상 32자 이하로 입력하세요",
        EmailNull => "이메일을 입력하세요",
        EmailInvalid => "올바른 이메일 형식이 아닙니다",
        EmailInUse => "이미 사용 중인 이메일입니다",
        PasswordNull => "비밀번호를 입력하세요",
        PasswordSize => "비밀번호는 최소 6자 이상이어야 합니다",
        PasswordPattern => "비밀번호는 대문자, 소문자, 숫자를 각각 1개 이상 포함해야 합니다",
        UserCreated => "사용자가 생성되었습니다",
        AccountActivated => "계정이 활성화되었습니다",
        ValidationFailure => "유효성 검사 오류",
        EmailFailure => "이메일 전송에 실패했습니다",
        InvalidToken => "이미 활성화되었거나 유효하지 않은 토큰입니다",
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Ok(Locale::resolve(header))
    }
}
