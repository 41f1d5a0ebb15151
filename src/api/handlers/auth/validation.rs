//! Field validation for signup, signin and profile updates.
//!
//! Every field is checked and every failure reported at once, keyed by the
//! field name, with messages in the `"field" must ...` form.

use serde_json::Value;

use super::types::{SigninRequest, SignupRequest};
use super::utils::{normalize_email, valid_email};
use crate::api::error::FieldErrors;
use crate::api::handlers::users::UpdateUserRequest;
use crate::store::AccountUpdate;

const MIN_AGE: i64 = 13;

/// Signup input after validation. `email` is normalized.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidSignup {
    pub email: String,
    pub pw1: String,
    pub pw2: String,
    pub username: String,
    pub age: i32,
    pub phone: String,
    pub role: String,
}

impl std::fmt::Debug for ValidSignup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidSignup")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("age", &self.age)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ValidSignin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for ValidSignin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidSignin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

type Rule<T> = Result<T, String>;

fn required<'a>(field: &str, value: Option<&'a str>) -> Rule<&'a str> {
    match value {
        None => Err(format!("\"{field}\" is required")),
        Some(value) if value.trim().is_empty() => {
            Err(format!("\"{field}\" is not allowed to be empty"))
        }
        Some(value) => Ok(value),
    }
}

fn email_rule(field: &str, value: &str) -> Rule<String> {
    let email = normalize_email(value);
    if valid_email(&email) {
        Ok(email)
    } else {
        Err(format!("\"{field}\" must be a valid email"))
    }
}

fn length_rule(field: &str, value: &str, min: usize, max: usize) -> Rule<()> {
    let len = value.chars().count();
    if len < min {
        return Err(format!(
            "\"{field}\" length must be at least {min} characters long"
        ));
    }
    if len > max {
        return Err(format!(
            "\"{field}\" length must be less than or equal to {max} characters long"
        ));
    }
    Ok(())
}

fn password_rule(field: &str, value: &str) -> Rule<String> {
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(format!(
            "\"{field}\" must only contain alpha-numeric characters"
        ));
    }
    length_rule(field, value, 8, 16)?;
    Ok(value.to_string())
}

fn username_rule(field: &str, value: &str) -> Rule<String> {
    length_rule(field, value, 3, 30)?;
    Ok(value.to_string())
}

fn age_rule(field: &str, value: &Value) -> Rule<i32> {
    let not_a_number = || format!("\"{field}\" must be a number");
    let age = match value {
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(age), _) => age,
            // 20.0 is still a whole number; out-of-range values saturate and fail below.
            #[allow(clippy::cast_possible_truncation)]
            (None, Some(age)) if age.fract() == 0.0 => age as i64,
            (None, Some(_)) => return Err(format!("\"{field}\" must be an integer")),
            (None, None) => return Err(not_a_number()),
        },
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| not_a_number())?,
        _ => return Err(not_a_number()),
    };

    if age < MIN_AGE {
        return Err(format!(
            "\"{field}\" must be greater than or equal to {MIN_AGE}"
        ));
    }
    i32::try_from(age).map_err(|_| {
        format!(
            "\"{field}\" must be less than or equal to {}",
            i32::MAX
        )
    })
}

fn phone_rule(field: &str, value: &Value) -> Rule<String> {
    let not_a_number = || format!("\"{field}\" must be a number");
    match value {
        Value::Number(number) => number.as_u64().map(|n| n.to_string()).ok_or_else(not_a_number),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                Err(format!("\"{field}\" is not allowed to be empty"))
            } else if text.chars().all(|c| c.is_ascii_digit()) {
                Ok(text.to_string())
            } else {
                Err(not_a_number())
            }
        }
        _ => Err(not_a_number()),
    }
}

fn role_rule(value: &str) -> String {
    value.trim().to_string()
}

fn collect<T>(errors: &mut FieldErrors, field: &'static str, rule: Rule<T>) -> Option<T> {
    match rule {
        Ok(value) => Some(value),
        Err(message) => {
            errors.insert(field, message);
            None
        }
    }
}

fn required_value<'a>(field: &str, value: Option<&'a Value>) -> Rule<&'a Value> {
    value.ok_or_else(|| format!("\"{field}\" is required"))
}

/// # Errors
/// Returns every failing field with its message.
pub fn validate_signup(request: &SignupRequest) -> Result<ValidSignup, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = collect(
        &mut errors,
        "email",
        required("email", request.email.as_deref()).and_then(|v| email_rule("email", v)),
    );
    let pw1 = collect(
        &mut errors,
        "pw1",
        required("pw1", request.pw1.as_deref()).and_then(|v| password_rule("pw1", v)),
    );
    let pw2 = collect(
        &mut errors,
        "pw2",
        required("pw2", request.pw2.as_deref()).and_then(|v| password_rule("pw2", v)),
    );
    let username = collect(
        &mut errors,
        "username",
        required("username", request.username.as_deref())
            .and_then(|v| username_rule("username", v)),
    );
    let age = collect(
        &mut errors,
        "age",
        required_value("age", request.age.as_ref()).and_then(|v| age_rule("age", v)),
    );
    let phone = collect(
        &mut errors,
        "phone",
        required_value("phone", request.phone.as_ref()).and_then(|v| phone_rule("phone", v)),
    );
    let role = collect(
        &mut errors,
        "role",
        required("role", request.role.as_deref()).map(role_rule),
    );

    match (email, pw1, pw2, username, age, phone, role) {
        (Some(email), Some(pw1), Some(pw2), Some(username), Some(age), Some(phone), Some(role))
            if errors.is_empty() =>
        {
            Ok(ValidSignup {
                email,
                pw1,
                pw2,
                username,
                age,
                phone,
                role,
            })
        }
        _ => Err(errors),
    }
}

/// # Errors
/// Returns every failing field with its message.
pub fn validate_signin(request: &SigninRequest) -> Result<ValidSignin, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = collect(
        &mut errors,
        "email",
        required("email", request.email.as_deref()).and_then(|v| email_rule("email", v)),
    );
    let password = collect(
        &mut errors,
        "password",
        required("password", request.password.as_deref())
            .and_then(|v| password_rule("password", v)),
    );

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok(ValidSignin { email, password }),
        _ => Err(errors),
    }
}

/// Validate only the fields present in an update; absent fields stay `None`.
///
/// # Errors
/// Returns every failing field with its message.
pub fn validate_update(request: &UpdateUserRequest) -> Result<AccountUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();

    let email = request.email.as_deref().and_then(|v| {
        collect(
            &mut errors,
            "email",
            required("email", Some(v)).and_then(|v| email_rule("email", v)),
        )
    });
    let age = request
        .age
        .as_ref()
        .and_then(|v| collect(&mut errors, "age", age_rule("age", v)));
    let phone = request
        .phone
        .as_ref()
        .and_then(|v| collect(&mut errors, "phone", phone_rule("phone", v)));
    let role = request.role.as_deref().and_then(|v| {
        collect(&mut errors, "role", required("role", Some(v)).map(role_rule))
    });

    if errors.is_empty() {
        Ok(AccountUpdate {
            email,
            age,
            phone,
            role,
        })
    } else {
        Err(errors)
    }
}
