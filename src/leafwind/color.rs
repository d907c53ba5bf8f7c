use crate::model::Rgb;

/// Parse `#rrggbb` (the `#` is optional, hex digits are case-insensitive).
///
/// Anything else yields `None`; callers drop the color rather than fail.
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_hash() {
        assert_eq!(hex_to_rgb("#ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(hex_to_rgb("ff8000"), Some(Rgb::new(255, 128, 0)));
        assert_eq!(hex_to_rgb("#FFfFfF"), Some(Rgb::new(255, 255, 255)));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(hex_to_rgb(""), None);
        assert_eq!(hex_to_rgb("#fff"), None);
        assert_eq!(hex_to_rgb("#ff80001"), None);
        assert_eq!(hex_to_rgb("#gg0000"), None);
        assert_eq!(hex_to_rgb("##ff8000"), None);
        assert_eq!(hex_to_rgb("#ff 800"), None);
    }

    #[test]
    fn multibyte_input_does_not_panic() {
        assert_eq!(hex_to_rgb("ééé"), None);
    }
}
