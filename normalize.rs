use once_cell::sync::Lazy;
use regex::Regex;

// Everything outside ASCII letters, digits and the plain space is dropped
// before splitting, so tabs and other whitespace glue their neighbours.
static ILLEGAL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9 ]+").unwrap());

/// Normalize one line and split it into word tokens.
///
/// Illegal characters are removed, the remainder is lowercased and split on
/// runs of whitespace. Lines with nothing left yield no tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    let cleaned = ILLEGAL_CHARS.replace_all(line, "");
    cleaned
        .to_ascii_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_punctuation_and_lowercases() {
        assert_eq!(tokenize("Hello world"), vec!["hello", "world"]);
        assert_eq!(tokenize("hello, World!"), vec!["hello", "world"]);
    }

    #[test]
    fn punctuation_only_line_has_no_tokens() {
        assert!(tokenize("!!! ??? ...").is_empty());
        assert!(tokenize("").is_empty());
        assert!(tokenize("     ").is_empty());
    }

    #[test]
    fn punctuation_inside_word_joins_the_parts() {
        assert_eq!(tokenize("don't stop-over"), vec!["dont", "stopover"]);
    }

    #[test]
    fn tabs_and_non_ascii_are_removed_not_split() {
        assert_eq!(tokenize("a\tb"), vec!["ab"]);
        assert_eq!(tokenize("café au lait"), vec!["caf", "au", "lait"]);
        assert_eq!(tokenize("\u{FFFD}abc"), vec!["abc"]);
    }

    #[test]
    fn digits_are_kept() {
        assert_eq!(tokenize("Route 66, EXIT 9b"), vec!["route", "66", "exit", "9b"]);
    }

    #[test]
    fn repeated_spaces_collapse() {
        assert_eq!(tokenize("  one   two  "), vec!["one", "two"]);
    }

    #[test]
    fn tokenizing_twice_gives_the_same_sequence() {
        let line = "The quick, brown FOX -- jumps over the lazy dog!";
        assert_eq!(tokenize(line), tokenize(line));
    }
}
