//! CLI output formatting utilities.
//!
//! JSON output is pretty-printed with syntax highlighting; palette colors are
//! rendered as truecolor swatches.

use colored::Colorize;
use serde::Serialize;

use crate::error::TapestryError;

/// Serializes `value` and prints it highlighted.
///
/// # Errors
///
/// Returns an error if `value` cannot be represented as JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), TapestryError> {
    print_highlighted_json(&serde_json::to_value(value)?);
    Ok(())
}

/// Prints JSON with syntax highlighting.
///
/// Colors:
/// - Keys: Cyan
/// - Strings: Green
/// - Numbers: Yellow
/// - Booleans/Null: Magenta
/// - Brackets/Braces: White (default)
pub fn print_highlighted_json(value: &serde_json::Value) {
    let json_str = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    print_highlighted_json_str(&json_str);
}

/// Prints a JSON string with syntax highlighting.
fn print_highlighted_json_str(json: &str) {
    let mut in_string = false;
    let mut is_key = false;
    let mut escape_next = false;
    let mut current_token = String::new();
    let mut after_colon = false;

    for ch in json.chars() {
        if escape_next {
            current_token.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current_token.push(ch);
            escape_next = true;
            continue;
        }

        match ch {
            '"' => {
                if in_string {
                    // End of string
                    current_token.push(ch);
                    if is_key {
                        print!("{}", current_token.cyan());
                    } else {
                        print!("{}", current_token.green());
                    }
                    current_token.clear();
                    in_string = false;
                    is_key = false;
                } else {
                    // Start of string
                    flush_token(&mut current_token, after_colon);
                    current_token.push(ch);
                    in_string = true;
                    // It's a key if we're not after a colon
                    is_key = !after_colon;
                    after_colon = false;
                }
            }
            ':' if !in_string => {
                flush_token(&mut current_token, false);
                print!("{}", ":".white());
                after_colon = true;
            }
            ',' if !in_string => {
                flush_token(&mut current_token, after_colon);
                print!("{}", ",".white());
                after_colon = false;
            }
            '{' | '}' | '[' | ']' if !in_string => {
                flush_token(&mut current_token, after_colon);
                print!("{}", ch.to_string().white().bold());
                after_colon = false;
            }
            _ => {
                current_token.push(ch);
            }
        }
    }

    // Flush any remaining token
    flush_token(&mut current_token, after_colon);
    println!();
}

/// Flushes the current token with appropriate coloring.
fn flush_token(token: &mut String, is_value: bool) {
    if token.is_empty() {
        return;
    }

    let trimmed = token.trim();
    if trimmed.is_empty() {
        print!("{token}");
    } else if is_value {
        // Find the actual value position in the token
        let start = token.find(|c: char| !c.is_whitespace()).unwrap_or(0);
        let end = token.rfind(|c: char| !c.is_whitespace()).map_or(token.len(), |i| i + 1);

        let prefix = &token[..start];
        let value = &token[start..end];
        let suffix = &token[end..];

        // Check if it's a number, boolean, or null
        if value == "true" || value == "false" || value == "null" {
            print!("{}{}{}", prefix, value.magenta(), suffix);
        } else if value.parse::<f64>().is_ok() {
            print!("{}{}{}", prefix, value.yellow(), suffix);
        } else {
            print!("{token}");
        }
    } else {
        print!("{token}");
    }

    token.clear();
}

/// Truncates a string to a maximum number of characters, adding ellipsis if needed.
///
/// This function correctly handles multi-byte UTF-8 characters by counting
/// characters rather than bytes.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();

    if char_count <= max_chars {
        s.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        // Find the byte index of the (max_chars - 1)th character
        let truncate_at = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
        format!("{}…", &s[..truncate_at])
    }
}

/// Parses `#RRGGBB` or `#RRGGBBAA` into its color channels, ignoring alpha.
fn parse_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
        return None;
    }

    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Renders a two-cell block in the given hex color, or blanks if the value
/// is not a hex color.
#[must_use]
pub fn format_swatch(hex: &str) -> String {
    parse_rgb(hex).map_or_else(
        || "  ".to_string(),
        |(r, g, b)| "  ".on_truecolor(r, g, b).to_string(),
    )
}

/// Formats a boolean as a colored string.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello w…");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_min_length() {
        assert_eq!(truncate("hello", 1), "…");
    }

    #[test]
    fn test_truncate_multibyte_utf8() {
        // Accented characters are 2 bytes in UTF-8
        let s = "forêt éclairée.png";
        // Should truncate at character boundary, not byte boundary
        assert_eq!(truncate(s, 8), "forêt é…");
        // Full string should not be truncated
        assert_eq!(truncate(s, 20), s);
    }

    #[test]
    fn test_truncate_emoji() {
        // Test with emoji (4 bytes in UTF-8)
        let s = "hello 🌍 world";
        assert_eq!(truncate(s, 8), "hello 🌍…");
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_rgb("#A1B2C3"), Some((0xA1, 0xB2, 0xC3)));
        assert_eq!(parse_rgb("#0a0b0cff"), Some((10, 11, 12)));
        assert_eq!(parse_rgb("A1B2C3"), None);
        assert_eq!(parse_rgb("#12345"), None);
        assert_eq!(parse_rgb("#zzzzzz"), None);
    }

    #[test]
    fn test_format_swatch_invalid_is_blank() {
        assert_eq!(format_swatch("red"), "  ");
    }

    #[test]
    fn test_format_bool_true() {
        let result = format_bool(true);
        assert!(result.contains('✓'));
    }

    #[test]
    fn test_format_bool_false() {
        let result = format_bool(false);
        assert!(result.contains('✗'));
    }
}
