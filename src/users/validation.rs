use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::i18n::{Locale, MessageKey};

use super::dto::SignUpRequest;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Email,
    Password,
}

impl Field {
    fn value<'a>(self, candidate: &'a SignUpRequest) -> Option<&'a str> {
        match self {
            Field::Username => candidate.username.as_deref(),
            Field::Email => candidate.email.as_deref(),
            Field::Password => candidate.password.as_deref(),
        }
    }
}

/// One declarative validation rule. `check` passes vacuously on a missing
/// value so that only the null rule fires for absent fields.
struct Rule {
    field: Field,
    key: MessageKey,
    check: fn(Option<&str>) -> bool,
}

fn present(value: Option<&str>) -> bool {
    value.is_some()
}

fn username_size_ok(value: Option<&str>) -> bool {
    value.map_or(true, |s| (4..=32).contains(&s.chars().count()))
}

fn email_shape_ok(value: Option<&str>) -> bool {
    value.map_or(true, is_valid_email)
}

fn password_size_ok(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.chars().count() >= 6)
}

fn password_pattern_ok(value: Option<&str>) -> bool {
    value.map_or(true, |s| {
        s.chars().any(|c| c.is_uppercase())
            && s.chars().any(|c| c.is_lowercase())
            && s.chars().any(|c| c.is_ascii_digit())
    })
}

static RULES: &[Rule] = &[
    Rule { field: Field::Username, key: MessageKey::UsernameNull, check: present },
    Rule { field: Field::Username, key: MessageKey::UsernameSize, check: username_size_ok },
    Rule { field: Field::Email, key: MessageKey::EmailNull, check: present },
    Rule { field: Field::Email, key: MessageKey::EmailInvalid, check: email_shape_ok },
    Rule { field: Field::Password, key: MessageKey::PasswordNull, check: present },
    Rule { field: Field::Password, key: MessageKey::PasswordSize, check: password_size_ok },
    Rule { field: Field::Password, key: MessageKey::PasswordPattern, check: password_pattern_ok },
];

/// Per-field validation outcome, at most one error key per field. Field
/// order (username, email, password) is the declaration order here and in
/// [`LocalizedFieldErrors`], which is what keeps the serialized map ordered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    pub username: Option<MessageKey>,
    pub email: Option<MessageKey>,
    pub password: Option<MessageKey>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }

    fn slot(&mut self, field: Field) -> &mut Option<MessageKey> {
        match field {
            Field::Username => &mut self.username,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }

    pub fn localize(&self, locale: Locale) -> LocalizedFieldErrors {
        LocalizedFieldErrors {
            username: self.username.map(|k| locale.text(k)),
            email: self.email.map(|k| locale.text(k)),
            password: self.password.map(|k| locale.text(k)),
        }
    }
}

/// `validationErrors` object of the error envelope. Serialized directly as
/// a struct so field order survives into the JSON output.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LocalizedFieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'static str>,
}

/// Runs every rule; the first failing rule per field wins. All fields are
/// evaluated regardless of earlier failures.
pub fn validate(candidate: &SignUpRequest) -> FieldErrors {
    let mut errors = FieldErrors::default();
    for rule in RULES {
        if !(rule.check)(rule.field.value(candidate)) {
            let slot = errors.slot(rule.field);
            if slot.is_none() {
                *slot = Some(rule.key);
            }
        }
    }
    errors
}
