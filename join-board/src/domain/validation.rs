//! Field-level form validation.
//!
//! Every rule returns `Ok(())` or the [`FieldError`] whose `Display` is the message shown
//! next to the offending input. Form validators collect all failing fields at once into
//! [`ValidationErrors`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use strum::Display;
use thiserror::Error;
use time::{macros::format_description, Date};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-ZÄÖÜ][a-zäöü]+ [A-ZÄÖÜ][a-zäöü]+$").expect("valid regex"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,63}$").expect("valid regex")
});

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

const MIN_PHONE_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("This field is required")]
    Required,
    #[error("Please enter a first and last name.")]
    MissingName,
    #[error("Enter a valid name. E.g. Max Muster")]
    InvalidName,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("This email address is already taken.")]
    EmailTaken,
    #[error("Please enter a phone number.")]
    MissingPhone,
    #[error("Please use only numbers, the plus sign (+), and spaces.")]
    InvalidPhoneCharacters,
    #[error("The phone number must be at least 9 digits long.")]
    PhoneTooShort,
    #[error("Please enter a valid date in YYYY-MM-DD format.")]
    InvalidDateFormat,
    #[error("Please enter a future date.")]
    DateNotInFuture,
    #[error("Your passwords don't match. Please try again.")]
    PasswordMismatch,
}

/// Form input a [`FieldError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Phone,
    Password,
    Title,
    Category,
    DueDate,
    Subtask,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(Field, FieldError)>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Field, error: FieldError) -> Self {
        Self(vec![(field, error)])
    }

    pub fn check(&mut self, field: Field, result: Result<(), FieldError>) -> &mut Self {
        if let Err(error) = result {
            self.0.push((field, error));
        }
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, e)| e)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Field, FieldError)> {
        self.0.iter()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, error)| format!("{}: {}", field, error))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

pub fn validate_required(value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        Err(FieldError::Required)
    } else {
        Ok(())
    }
}

/// Exactly two capitalised words, German umlauts allowed.
pub fn validate_name(name: &str) -> Result<(), FieldError> {
    if name.trim().is_empty() {
        return Err(FieldError::MissingName);
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(FieldError::InvalidName);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(FieldError::InvalidEmail)
    }
}

/// Digits, `+` and spaces only, with at least nine digits. The character set is checked
/// before the length.
pub fn validate_phone(phone: &str) -> Result<(), FieldError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(FieldError::MissingPhone);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c.is_whitespace())
    {
        return Err(FieldError::InvalidPhoneCharacters);
    }
    if trimmed.chars().filter(char::is_ascii_digit).count() < MIN_PHONE_DIGITS {
        return Err(FieldError::PhoneTooShort);
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` string into a calendar date.
pub fn parse_due_date(raw: &str) -> Result<Date, FieldError> {
    if !DATE_PATTERN.is_match(raw) {
        return Err(FieldError::InvalidDateFormat);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| FieldError::InvalidDateFormat)
}

/// The due date must lie strictly after `today`; a same-day date is rejected.
pub fn validate_due_date(raw: &str, today: Date) -> Result<Date, FieldError> {
    let date = parse_due_date(raw)?;
    if date <= today {
        return Err(FieldError::DateNotInFuture);
    }
    Ok(date)
}

pub fn validate_passwords_match(password: &str, confirm: &str) -> Result<(), FieldError> {
    if password == confirm {
        Ok(())
    } else {
        Err(FieldError::PasswordMismatch)
    }
}

/// Validate the contact form, reporting every failing field.
pub fn validate_contact(name: &str, email: &str, phone: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors
        .check(Field::Name, validate_name(name))
        .check(Field::Email, validate_email(email))
        .check(Field::Phone, validate_phone(phone));
    errors
}

/// Validate the required task fields and the due date.
pub fn validate_task_fields(
    title: &str,
    category: &str,
    due_date: &str,
    today: Date,
) -> Result<Date, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors
        .check(Field::Title, validate_required(title))
        .check(Field::Category, validate_required(category));

    let due = match validate_required(due_date) {
        Err(e) => Err(e),
        Ok(()) => validate_due_date(due_date.trim(), today),
    };

    match due {
        Ok(date) => errors.into_result().map(|_| date),
        Err(e) => {
            errors.check(Field::DueDate, Err(e));
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const TODAY: Date = date!(2026 - 10 - 19);

    #[test]
    fn malformed_due_dates_report_format_error() {
        for raw in ["", "19.10.2026", "2026-1-02", "2026/10/20", "20261020", "2026-10-20x"] {
            assert_eq!(
                validate_due_date(raw, TODAY),
                Err(FieldError::InvalidDateFormat),
                "{raw}"
            );
        }
    }

    #[test]
    fn impossible_calendar_date_is_a_format_error() {
        assert_eq!(
            validate_due_date("2026-02-30", TODAY),
            Err(FieldError::InvalidDateFormat)
        );
    }

    #[test]
    fn today_and_past_dates_are_rejected() {
        assert_eq!(
            validate_due_date("2026-10-19", TODAY),
            Err(FieldError::DateNotInFuture)
        );
        assert_eq!(
            validate_due_date("2020-01-01", TODAY),
            Err(FieldError::DateNotInFuture)
        );
    }

    #[test]
    fn future_date_is_accepted() {
        assert_eq!(
            validate_due_date("2026-10-20", TODAY),
            Ok(date!(2026 - 10 - 20))
        );
    }

    #[test]
    fn name_requires_two_capitalised_words() {
        assert!(validate_name("Max Mustermann").is_ok());
        assert!(validate_name("Jörg Übel").is_ok());
        assert_eq!(validate_name("max mustermann"), Err(FieldError::InvalidName));
        assert_eq!(validate_name("Max"), Err(FieldError::InvalidName));
        assert_eq!(validate_name("Max Von Muster"), Err(FieldError::InvalidName));
        assert_eq!(validate_name("  "), Err(FieldError::MissingName));
    }

    #[test]
    fn email_pattern() {
        assert!(validate_email("anna.muster@example.com").is_ok());
        assert!(validate_email("Anna@Example.COM").is_ok());
        assert_eq!(validate_email("anna@example"), Err(FieldError::InvalidEmail));
        assert_eq!(validate_email("@example.com"), Err(FieldError::InvalidEmail));
    }

    #[test]
    fn phone_checks_characters_before_length() {
        assert!(validate_phone("+49 151 23456789").is_ok());
        assert_eq!(
            validate_phone("abc123"),
            Err(FieldError::InvalidPhoneCharacters)
        );
        assert_eq!(validate_phone("+49 151 23"), Err(FieldError::PhoneTooShort));
        assert_eq!(validate_phone("12 34 56 78"), Err(FieldError::PhoneTooShort));
        assert_eq!(validate_phone(""), Err(FieldError::MissingPhone));
    }

    #[test]
    fn contact_form_reports_every_failing_field() {
        let errors = validate_contact("max", "nope", "123");

        assert_eq!(errors.get(Field::Name), Some(&FieldError::InvalidName));
        assert_eq!(errors.get(Field::Email), Some(&FieldError::InvalidEmail));
        assert_eq!(errors.get(Field::Phone), Some(&FieldError::PhoneTooShort));
    }

    #[test]
    fn task_form_requires_title_category_and_due_date() {
        let errors = validate_task_fields(" ", "", "", TODAY).unwrap_err();

        assert_eq!(errors.get(Field::Title), Some(&FieldError::Required));
        assert_eq!(errors.get(Field::Category), Some(&FieldError::Required));
        assert_eq!(errors.get(Field::DueDate), Some(&FieldError::Required));
    }

    #[test]
    fn task_form_returns_parsed_due_date() {
        let due = validate_task_fields("Write docs", "User Story", "2026-11-01", TODAY).unwrap();
        assert_eq!(due, date!(2026 - 11 - 01));
    }
}
