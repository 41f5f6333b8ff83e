//! Markup and control-character stripping

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{Result, TextProcessingError};

static SCRIPT_BLOCKS: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>"));

static COMMENTS: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->"));

// Tags that separate words visually; replaced by a space so neighbours don't fuse
static BLOCK_TAGS: Lazy<std::result::Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:p|br|div|li|ul|ol|h[1-6]|tr|td|th|table|section|article|header|footer|blockquote|pre|hr|dd|dt)\b[^<>]*>",
    )
});

static INLINE_TAGS: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9:-]*(?:\s[^<>]*)?/?>"));

static ENTITIES: Lazy<std::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});"));

fn pattern(lazy: &'static Lazy<std::result::Result<Regex, regex::Error>>) -> Result<&'static Regex> {
    match Lazy::force(lazy) {
        Ok(regex) => Ok(regex),
        Err(e) => Err(TextProcessingError::Pattern(e.to_string())),
    }
}

/// Remove tags, comments and script/style bodies, then decode entities
pub fn strip_markup(text: &str) -> Result<String> {
    let text = pattern(&SCRIPT_BLOCKS)?.replace_all(text, " ");
    let text = pattern(&COMMENTS)?.replace_all(&text, " ");
    let text = pattern(&BLOCK_TAGS)?.replace_all(&text, " ");
    let text = pattern(&INLINE_TAGS)?.replace_all(&text, "");
    decode_entities(&text)
}

/// Decode named and numeric character entities; unknown ones are kept verbatim
pub fn decode_entities(text: &str) -> Result<String> {
    let decoded = pattern(&ENTITIES)?.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        match decode_entity(body) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    });
    Ok(decoded.into_owned())
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = body.strip_prefix('#') {
        return dec.parse::<u32>().ok().and_then(char::from_u32);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('–'),
        "mdash" => Some('—'),
        "hellip" => Some('…'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        _ => None,
    }
}

/// Replace control characters with spaces and drop invisible format characters
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

/// Collapse whitespace runs to a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        let out = strip_markup("<p>Hello <b>world</b></p><p>Again</p>").unwrap();
        assert_eq!(collapse_whitespace(&out), "Hello world Again");
    }

    #[test]
    fn test_block_tags_do_not_fuse_words() {
        let out = strip_markup("one<br/>two<li>three</li>").unwrap();
        assert_eq!(collapse_whitespace(&out), "one two three");
    }

    #[test]
    fn test_script_and_comments_removed() {
        let out = strip_markup("a<script>var x = 1 < 2;</script>b<!-- note -->c").unwrap();
        assert_eq!(collapse_whitespace(&out), "a b c");
    }

    #[test]
    fn test_comparison_text_survives() {
        let out = strip_markup("3 < 4 and 5 > 2").unwrap();
        assert_eq!(out, "3 < 4 and 5 > 2");
    }

    #[test]
    fn test_entities() {
        let out = decode_entities("Fish &amp; chips &lt;3 &#65;&#x42; &bogus;").unwrap();
        assert_eq!(out, "Fish & chips <3 AB &bogus;");
    }

    #[test]
    fn test_control_characters() {
        assert_eq!(strip_control("a\u{0007}b\u{200B}c\td"), "a bc d");
    }
}
