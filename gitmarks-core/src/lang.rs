//! File-extension to highlighting-language resolution.
//!
//! Language ids are grammar names. Some grammars extend others, so a language
//! can only be highlighted after its dependencies are available;
//! [`load_order`] lists them dependencies-first.

/// Text after the last `.` of `name`, or the whole name when there is none.
pub fn extract_extension(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Language id for a file name, if its extension is known.
pub fn language_for(file_name: &str) -> Option<&'static str> {
    ext_to_lang(extract_extension(file_name))
}

fn ext_to_lang(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "html" | "htm" | "xml" | "svg" | "xsl" | "xslt" | "fxml" => "markup",
        "css" => "css",
        "scss" | "sass" => "scss",
        "less" => "less",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" => "typescript",
        "tsx" => "tsx",
        "jsx" => "jsx",
        "json" | "webmanifest" | "lock" => "json",
        "py" => "python",
        "rb" => "ruby",
        "php" => "php",
        "java" => "java",
        "c" => "c",
        "cpp" | "h" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" | "rlib" => "rust",
        "swift" => "swift",
        "kt" => "kotlin",
        "dart" => "dart",
        "sh" | "bash" | "zsh" | "fish" | "env" | "ksh" | "csh" | "tcsh" | "conf" | "npmrc" => "bash",
        "pl" => "perl",
        "r" => "r",
        "scala" => "scala",
        "lua" => "lua",
        "el" => "lisp",
        "clj" => "clojure",
        "hs" => "haskell",
        "ml" => "ocaml",
        "erl" => "erlang",
        "ex" | "exs" => "elixir",
        "fs" => "fsharp",
        "d" => "d",
        "yaml" | "yml" => "yaml",
        "ini" => "ini",
        "toml" => "toml",
        "makefile" => "makefile",
        "cmake" => "cmake",
        "gradle" => "gradle",
        "groovy" | "jenkinsfile" => "groovy",
        "md" | "markdown" => "markdown",
        "tex" => "latex",
        "csv" | "tsv" => "csv",
        "ps1" | "psm1" | "psd1" => "powershell",
        "dockerfile" => "docker",
        "tf" | "hcl" => "hcl",
        "graphql" | "gql" => "graphql",
        "sql" | "psql" | "pgsql" | "mysql" | "sqlite" => "sql",
        "pls" => "plsql",
        "asm" | "s" => "arm-asm",
        "nasm" => "nasm",
        "sv" | "v" => "verilog",
        "vhd" | "vhdl" => "vhdl",
        "ino" | "pde" => "arduino",
        "m" | "matlab" => "matlab",
        "sol" => "solidity",
        "glsl" => "glsl",
        "bat" | "cmd" => "batch",
        _ => return None,
    };
    Some(lang)
}

/// Grammars that must be loaded before `lang`.
pub fn dependencies(lang: &str) -> &'static [&'static str] {
    match lang {
        "javascript" => &["clike"],
        "typescript" => &["javascript"],
        "jsx" => &["markup", "javascript"],
        "tsx" => &["jsx", "typescript"],
        "c" | "csharp" | "d" | "dart" | "fsharp" | "go" | "gradle" | "groovy" | "java"
        | "kotlin" | "ruby" | "solidity" => &["clike"],
        "cpp" | "glsl" => &["c"],
        "arduino" => &["cpp"],
        "scala" => &["java"],
        "scss" | "sass" | "less" => &["css"],
        "markdown" => &["markup"],
        "php" => &["markup-templating"],
        "markup-templating" => &["markup"],
        "plsql" => &["sql"],
        _ => &[],
    }
}

/// Every grammar needed for `lang`, dependencies first, each listed once.
pub fn load_order(lang: &str) -> Vec<&str> {
    fn visit<'a>(lang: &'a str, out: &mut Vec<&'a str>) {
        if out.contains(&lang) {
            return;
        }
        for dep in dependencies(lang) {
            visit(dep, out);
        }
        out.push(lang);
    }
    let mut out = Vec::new();
    visit(lang, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_text_after_last_dot() {
        assert_eq!(extract_extension("archive.tar.gz"), "gz");
        assert_eq!(extract_extension("Makefile"), "Makefile");
    }

    #[test]
    fn tsx_loads_its_whole_dependency_chain_first() {
        assert_eq!(
            load_order("tsx"),
            ["markup", "clike", "javascript", "jsx", "typescript", "tsx"]
        );
    }

    #[test]
    fn unknown_extension_has_no_language() {
        assert_eq!(language_for("notes.zzz"), None);
        assert_eq!(language_for("main.py"), Some("python"));
    }
}
