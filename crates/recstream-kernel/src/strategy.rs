//! Textual parsing shared by the strategy enums.
//!
//! In-process the strategy enums are closed, so an "unknown" value cannot be
//! constructed. Values arriving as text (CLI flags, config, JSON) are parsed
//! here, and the `unknown` sentinel is rejected the same way an unrecognized
//! value is.

use crate::error::OperationError;

pub(crate) fn parse_named<T: Copy>(
    parameter: &'static str,
    raw: &str,
    table: &[(&str, T)],
) -> Result<T, OperationError> {
    let normalized = raw.trim();
    if normalized.is_empty() || normalized.eq_ignore_ascii_case("unknown") {
        return Err(OperationError::UnknownStrategy { parameter });
    }
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(normalized))
        .map(|(_, value)| *value)
        .ok_or_else(|| OperationError::UnsupportedStrategy {
            parameter,
            value: normalized.to_string(),
        })
}
