//! Case and diacritic folding for word matching

/// Fold a token for fallback matching.
///
/// Lower-cases, folds common Latin diacritics to their base letters and trims
/// leading/trailing punctuation. A token made only of punctuation keeps its
/// folded form so it still has a non-empty key.
pub fn normalize_word(word: &str) -> String {
    let mut folded = String::with_capacity(word.len());
    for c in word.chars().flat_map(char::to_lowercase) {
        match fold_diacritic(c) {
            Some(base) => folded.push_str(base),
            None => folded.push(c),
        }
    }

    let trimmed = folded.trim_matches(|c: char| !c.is_alphanumeric());
    if trimmed.is_empty() {
        folded
    } else {
        trimmed.to_string()
    }
}

fn fold_diacritic(c: char) -> Option<&'static str> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'ĉ' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ģ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' | 'ľ' | 'ĺ' => "l",
        'ñ' | 'ń' | 'ň' | 'ņ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ŕ' | 'ř' => "r",
        'ś' | 'š' | 'ş' => "s",
        'ß' => "ss",
        'ť' | 'ţ' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        // typographic quotes fold to ASCII so "don’t" matches "don't"
        '‘' | '’' => "'",
        _ => return None,
    };
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_punctuation() {
        assert_eq!(normalize_word("Hello,"), "hello");
        assert_eq!(normalize_word("\"World!\""), "world");
        assert_eq!(normalize_word("don't"), "don't");
    }

    #[test]
    fn test_diacritics() {
        assert_eq!(normalize_word("Café"), "cafe");
        assert_eq!(normalize_word("Straße"), "strasse");
        assert_eq!(normalize_word("NAÏVE"), "naive");
        assert_eq!(normalize_word("don’t"), "don't");
    }

    #[test]
    fn test_punctuation_only_token() {
        assert_eq!(normalize_word("—"), "—");
        assert_eq!(normalize_word("..."), "...");
    }
}
