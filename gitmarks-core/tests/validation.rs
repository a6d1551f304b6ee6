use gitmarks_core::validation::validate_repo_name;

#[test]
fn repo_names() {
    assert!(validate_repo_name("my-repo1"));
    assert!(!validate_repo_name(""));
    assert!(!validate_repo_name("bad/name"));
    assert!(validate_repo_name("has spaces"));
}
