use serde_json::Value;

const MULTIPLIERS: [(char, f64); 6] = [
    ('K', 1_000.0),
    ('M', 1_000_000.0),
    ('B', 1_000_000_000.0),
    // Cyrillic Т(ысяч), М(иллионов), Б(иллионов)
    ('\u{0422}', 1_000.0),
    ('\u{041C}', 1_000_000.0),
    ('\u{0411}', 1_000_000_000.0),
];

/// Parses a counter found in a JSON document. Never fails; anything unusable is 0.
pub fn parse_short_number(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().map(truncate))
            .unwrap_or(0),
        Value::String(text) => parse_short_number_str(text),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

pub fn parse_short_number_str(value: &str) -> u64 {
    let normalized = value.trim().to_uppercase();
    if normalized.is_empty() {
        return 0;
    }

    if normalized.chars().all(|character| character.is_ascii_digit()) {
        if let Ok(parsed) = normalized.parse::<u64>() {
            return parsed;
        }
    }

    if let Some(last) = normalized.chars().last()
        && let Some((_, multiplier)) = MULTIPLIERS.iter().find(|(suffix, _)| *suffix == last)
    {
        let number_part = &normalized[..normalized.len() - last.len_utf8()];
        if let Some(number) = parse_decimal(number_part) {
            return truncate(number * multiplier);
        }
    }

    parse_decimal(&normalized).map(truncate).unwrap_or(0)
}

fn parse_decimal(value: &str) -> Option<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn truncate(number: f64) -> u64 {
    if number.is_finite() && number > 0.0 {
        number.trunc() as u64
    } else {
        0
    }
}
