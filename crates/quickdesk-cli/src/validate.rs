use crate::output::CliError;

pub const MAX_SUBJECT_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: &'static str,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: &'static str,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        let shown = crate::output::truncate(&self.value, 40);
        CliError::with_details(
            format!("invalid {} '{}': {}", self.field, shown, self.reason),
            self.suggestion.clone(),
            self.code,
        )
    }
}

/// Non-empty after trimming, at most `max` characters, and free of control
/// characters other than newline and tab when `multiline`.
fn text_field(
    field: &'static str,
    s: &str,
    max: usize,
    multiline: bool,
    code: &'static str,
) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        return Err(ValidationError::new(
            field,
            s,
            "must not be empty",
            format!("provide a non-empty {field}"),
            code,
        ));
    }
    let len = s.chars().count();
    if len > max {
        return Err(ValidationError::new(
            field,
            s,
            format!("must be <= {max} characters (got {len})"),
            format!("shorten the {field}"),
            code,
        ));
    }
    let bad_control = |ch: char| ch.is_control() && !(multiline && (ch == '\n' || ch == '\t'));
    if s.chars().any(bad_control) {
        return Err(ValidationError::new(
            field,
            s,
            "must not contain control characters",
            format!("remove control characters from the {field}"),
            code,
        ));
    }
    Ok(())
}

pub fn validate_subject(s: &str) -> Result<(), ValidationError> {
    text_field("subject", s, MAX_SUBJECT_LEN, false, "invalid_subject")
}

pub fn validate_description(s: &str) -> Result<(), ValidationError> {
    text_field("description", s, MAX_DESCRIPTION_LEN, true, "invalid_description")
}

/// Category and user display names.
pub fn validate_name(s: &str) -> Result<(), ValidationError> {
    text_field("name", s, MAX_NAME_LEN, false, "invalid_name")
}

pub fn validate_comment(s: &str, max_chars: usize) -> Result<(), ValidationError> {
    text_field("comment", s, max_chars, true, "invalid_comment")
}

/// A loose shape check: one `@` with text on both sides and a dot in the
/// domain.
pub fn validate_email(s: &str) -> Result<(), ValidationError> {
    let value = s.trim();
    let bad = |reason: &str| {
        Err(ValidationError::new(
            "email",
            s,
            reason,
            "use an address like name@example.com",
            "invalid_email",
        ))
    };
    if value.is_empty() {
        return bad("must not be empty");
    }
    if value.chars().count() > MAX_EMAIL_LEN {
        return bad("is too long");
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return bad("must not contain whitespace");
    }
    let Some((local, domain)) = value.split_once('@') else {
        return bad("must contain '@'");
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') || domain.ends_with('.') {
        return bad("is not a valid address");
    }
    Ok(())
}

/// `#RRGGBB`.
pub fn validate_color(s: &str) -> Result<(), ValidationError> {
    let ok = s.len() == 7
        && s.starts_with('#')
        && s.chars().skip(1).all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(
            "color",
            s,
            "must be a #RRGGBB hex color",
            "use one of #EF4444 #F97316 #F59E0B #10B981 #3B82F6 #8B5CF6 #EC4899 #6B7280",
            "invalid_color",
        ))
    }
}
