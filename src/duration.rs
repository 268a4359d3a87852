use std::time::Duration;

/// Error returned for a malformed duration argument.
#[derive(Clone, PartialEq, Eq)]
pub struct ParseDurationError {
    input: String,
}

impl std::fmt::Display for ParseDurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "invalid duration '{}' (expected e.g. 500ms, 1s, 1m30s)", self.input)
    }
}

impl std::fmt::Debug for ParseDurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for ParseDurationError {}

fn unit_duration(unit: &str, amount: u64) -> Option<Duration> {
    match unit {
        "ns" => Some(Duration::from_nanos(amount)),
        "µs" | "us" => Some(Duration::from_micros(amount)),
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(amount.checked_mul(3600)?)),
        _ => None,
    }
}

/// Parse duration strings like "200ms", "1s" or "1m30s" into `Duration`.
///
/// Every number needs a unit, so a bare "1" is rejected rather than guessed.
pub fn parse_duration(s: &str) -> Result<Duration, ParseDurationError> {
    let error = || ParseDurationError { input: s.to_owned() };
    let mut total = Duration::ZERO;
    let mut rest = s.trim();
    if rest.is_empty() {
        return Err(error());
    }
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(error());
        }
        let amount: u64 = rest[..digits].parse().map_err(|_| error())?;
        rest = &rest[digits..];
        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = unit_duration(&rest[..unit_len], amount).ok_or_else(error)?;
        total = total.checked_add(part).ok_or_else(error)?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}
