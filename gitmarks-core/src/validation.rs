//! Form-path validation.

/// Characters GitHub refuses in repository names.
const ILLEGAL_REPO_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '!', '~', '#'];

/// Repository name as it will be created: spaces become hyphens.
pub fn normalize_repo_name(name: &str) -> String {
    name.replace(' ', "-")
}

/// True when `name`, after normalization, is non-empty and free of illegal
/// characters.
pub fn validate_repo_name(name: &str) -> bool {
    let name = normalize_repo_name(name);
    !name.is_empty() && !name.contains(ILLEGAL_REPO_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_illegal_char_is_rejected() {
        for c in ILLEGAL_REPO_CHARS {
            assert!(!validate_repo_name(&format!("repo{c}name")), "{c} accepted");
        }
    }

    #[test]
    fn spaces_are_normalized() {
        assert_eq!(normalize_repo_name("intro to c"), "intro-to-c");
    }
}
