use std::fmt;

use thiserror::Error;

use crate::time_entry::MINUTES_PER_DAY;

/// 入力フォームの項目。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Message,
    Hours,
    Minutes,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Message => "message",
            Field::Hours => "hours",
            Field::Minutes => "minutes",
        };
        f.write_str(name)
    }
}

/// 項目ごとのバリデーションエラー。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task name is required!")]
    TaskNameRequired,
    #[error("Hours cannot be negative")]
    HoursNegative,
    #[error("Minutes cannot be negative")]
    MinutesNegative,
    #[error("Time spent must be greater than 0")]
    DurationRequired,
    #[error("Total time cannot exceed 24 hours")]
    DurationExceeds24h,
}

/// バリデーションで見つかった全てのエラー。
///
/// ルールの評価順に`(Field, ValidationError)`の組を保持する。
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FieldErrors {
    errors: Vec<(Field, ValidationError)>,
}

impl FieldErrors {
    fn push(&mut self, field: Field, error: ValidationError) {
        self.errors.push((field, error));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Field, ValidationError)> {
        self.errors.iter()
    }

    /// 指定した項目に付与されたエラーを返す。
    pub fn for_field(&self, field: Field) -> impl Iterator<Item = ValidationError> + '_ {
        self.errors
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, error)| *error)
    }

    /// いずれかの項目に指定したエラーが含まれるかを返す。
    pub fn contains(&self, error: ValidationError) -> bool {
        self.errors.iter().any(|(_, e)| *e == error)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages = self
            .iter()
            .map(|(field, error)| format!("{}: {}", field, error))
            .collect::<Vec<_>>();
        write!(f, "{}", messages.join(", "))
    }
}

impl std::error::Error for FieldErrors {}

/// 正規化済みの時間。`minutes`は常に60未満。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NormalizedDuration {
    pub hours: u32,
    pub minutes: u32,
}

impl NormalizedDuration {
    pub fn total_minutes(&self) -> u32 {
        self.hours * 60 + self.minutes
    }
}

/// コミットの入力値を検証し、時間を正規化する。
///
/// 全てのルールを評価し、エラーはまとめて返す。値を丸めて受け入れることはしない。
///
/// # Arguments
///
/// * `message` - タスク名
/// * `hours` - 入力された時間
/// * `minutes` - 入力された分。60以上の場合は時間へ繰り上げる
///
/// # Examples
///
/// ```
/// let duration = validate("Fix login bug", 1, 90).unwrap();
/// assert_eq!((duration.hours, duration.minutes), (2, 30));
/// ```
pub fn validate(
    message: &str,
    hours: i64,
    minutes: i64,
) -> Result<NormalizedDuration, FieldErrors> {
    let mut errors = FieldErrors::default();

    if message.trim().is_empty() {
        errors.push(Field::Message, ValidationError::TaskNameRequired);
    }
    if hours < 0 {
        errors.push(Field::Hours, ValidationError::HoursNegative);
    }
    if minutes < 0 {
        errors.push(Field::Minutes, ValidationError::MinutesNegative);
    }

    let total_minutes = hours.saturating_mul(60).saturating_add(minutes);
    if total_minutes == 0 {
        errors.push(Field::Hours, ValidationError::DurationRequired);
        errors.push(Field::Minutes, ValidationError::DurationRequired);
    }

    let max_minutes = i64::from(MINUTES_PER_DAY);
    if total_minutes > max_minutes {
        errors.push(Field::Hours, ValidationError::DurationExceeds24h);
        errors.push(Field::Minutes, ValidationError::DurationExceeds24h);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // 0 < total_minutes <= 1440 が保証されている
    let total_minutes = total_minutes as u32;
    Ok(NormalizedDuration {
        hours: total_minutes / 60,
        minutes: total_minutes % 60,
    })
}
