/// Lowercased word pieces for feature hashing.
///
/// `+ # . / -` are kept inside a token so `node.js`, `c++` and `ci/cd`
/// survive; leading/trailing `. / -` are trimmed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.' | '/' | '-')))
        .map(|w| w.trim_matches(|c| matches!(c, '.' | '/' | '-')))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn keeps_tech_names_and_drops_punctuation() {
        assert_eq!(
            tokenize("AWS, Docker, Node.js and CI/CD. C++!"),
            vec!["aws", "docker", "node.js", "and", "ci/cd", "c++"]
        );
    }

    #[test]
    fn empty_and_symbol_only_input_yields_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" -- ... , ").is_empty());
    }
}
