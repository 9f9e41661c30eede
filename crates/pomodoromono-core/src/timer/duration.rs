//! Duration selection and validation.
//!
//! Free-text minute input goes through two stages: [`DurationInput::edit`]
//! normalizes every keystroke into a digits-only buffer of at most
//! [`MAX_INPUT_DIGITS`] characters, and [`DurationInput::commit`] turns the
//! buffer into a minute count clamped to `[MIN_MINUTES, MAX_MINUTES]`.

use crate::error::ValidationError;

/// Shortest selectable duration in minutes.
pub const MIN_MINUTES: u32 = 1;
/// Longest selectable duration in minutes.
pub const MAX_MINUTES: u32 = 240;
/// Digits the text buffer accepts. Caps raw input at 999 before clamping.
pub const MAX_INPUT_DIGITS: usize = 3;
/// Preset buttons offered when no configuration overrides them.
pub const DEFAULT_PRESETS: [u32; 3] = [15, 25, 45];
/// Preset a fresh session starts with.
pub const DEFAULT_MINUTES: u32 = 25;

/// Clamp a minute count into the selectable range.
pub fn clamp_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_MINUTES, MAX_MINUTES)
}

/// Strip everything but ASCII digits, rejecting results longer than
/// [`MAX_INPUT_DIGITS`].
pub fn normalize(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() > MAX_INPUT_DIGITS {
        return Err(ValidationError::TooLong {
            input: digits,
            max: MAX_INPUT_DIGITS,
        });
    }
    Ok(digits)
}

/// Parse a buffer into clamped minutes.
///
/// Parseable but out-of-range values clamp ("0" becomes 1, "999" becomes 240).
pub fn parse_minutes(buffer: &str) -> Result<u32, ValidationError> {
    if buffer.is_empty() {
        return Err(ValidationError::Empty);
    }
    let value: u64 = buffer
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber(buffer.to_string()))?;
    let capped = u32::try_from(value).unwrap_or(u32::MAX);
    Ok(clamp_minutes(capped))
}

/// Transient text buffer behind the custom-duration field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationInput {
    buffer: String,
}

impl DurationInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with a committed minute value.
    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            buffer: minutes.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Replace the buffer with normalized `raw` text.
    ///
    /// On rejection the previous buffer is kept untouched.
    pub fn edit(&mut self, raw: &str) -> Result<&str, ValidationError> {
        self.buffer = normalize(raw)?;
        Ok(&self.buffer)
    }

    /// Mirror a committed duration back into the field.
    pub fn sync_to(&mut self, minutes: u32) {
        self.buffer = minutes.to_string();
    }

    /// Minutes the buffer would commit to.
    pub fn commit(&self) -> Result<u32, ValidationError> {
        parse_minutes(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_non_digits() {
        assert_eq!(normalize("4a5 m").unwrap(), "45");
        assert_eq!(normalize("").unwrap(), "");
    }

    #[test]
    fn fourth_digit_is_rejected_and_buffer_kept() {
        let mut input = DurationInput::from_minutes(25);
        assert!(input.edit("123").is_ok());
        let err = input.edit("1234").unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                input: "1234".into(),
                max: 3
            }
        );
        assert_eq!(input.as_str(), "123");
    }

    #[test]
    fn non_digits_do_not_count_toward_length() {
        let mut input = DurationInput::new();
        assert_eq!(input.edit("1-2-3").unwrap(), "123");
    }

    #[test]
    fn commit_clamps_into_range() {
        assert_eq!(parse_minutes("0").unwrap(), 1);
        assert_eq!(parse_minutes("999").unwrap(), 240);
        assert_eq!(parse_minutes("240").unwrap(), 240);
        assert_eq!(parse_minutes("1").unwrap(), 1);
        assert_eq!(parse_minutes("37").unwrap(), 37);
    }

    #[test]
    fn commit_rejects_empty_buffer() {
        let input = DurationInput::new();
        assert_eq!(input.commit(), Err(ValidationError::Empty));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_minutes("abc"),
            Err(ValidationError::NotANumber(_))
        ));
    }

    #[test]
    fn huge_values_saturate_before_clamping() {
        assert_eq!(parse_minutes("99999999999").unwrap(), MAX_MINUTES);
    }

    #[test]
    fn sync_to_overwrites_buffer() {
        let mut input = DurationInput::new();
        input.edit("0").unwrap();
        let minutes = input.commit().unwrap();
        input.sync_to(minutes);
        assert_eq!(input.as_str(), "1");
    }
}
