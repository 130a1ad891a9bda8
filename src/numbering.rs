use diesel::result::{DatabaseErrorKind, Error as DieselError};

pub const DAILY_LOG_PREFIX: &str = "DSL-";
pub const SERVICE_TICKET_PREFIX: &str = "ST-";

/// Attempts before a create gives up and reports a conflict. Concurrent
/// writers computing the same next number lose the insert race and retry.
pub const MAX_NUMBERING_ATTEMPTS: u32 = 3;

const SEQUENCE_WIDTH: usize = 6;

/// Computes the next number in a `PREFIX-NNNNNN` sequence. `last` is the
/// lexicographic maximum of the existing numbers, which is also the numeric
/// maximum because the sequence part is zero padded.
pub fn next_number(prefix: &str, last: Option<&str>) -> String {
    let next = last
        .and_then(|value| value.strip_prefix(prefix))
        .and_then(|digits| digits.parse::<u64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{prefix}{next:0width$}", width = SEQUENCE_WIDTH)
}

pub fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
