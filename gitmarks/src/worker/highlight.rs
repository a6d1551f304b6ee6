//! Syntax highlighting thread.
//!
//! Highlighting a large file takes long enough to drop frames, so it runs on
//! its own thread. Requests arrive over crossbeam; finished files go back to
//! the UI as [`AppEvent::Highlighted`]. A language is highlighted only when
//! every grammar in its load order is available; otherwise the file is shown
//! as plain text.

use std::sync::LazyLock;

use crossbeam_channel::{Receiver, Sender};
use gitmarks_core::lang;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

#[derive(Debug, Clone)]
pub struct HighlightRequest {
    pub work: i64,
    pub sha: String,
    pub path: String,
    pub text: String,
    /// syntect theme name.
    pub syntax_theme: &'static str,
}

#[derive(Debug)]
pub struct HighlightResult {
    pub work: i64,
    pub sha: String,
    /// Grammar used, `None` for plain text.
    pub language: Option<&'static str>,
    pub lines: Vec<Line<'static>>,
}

/// Starts the thread and returns its request queue. The thread exits when
/// the sender is dropped.
pub fn spawn(event_tx: UnboundedSender<AppEvent>) -> Sender<HighlightRequest> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("highlight".into())
        .spawn(move || highlight_loop(rx, event_tx))
        .map_err(|err| tracing::error!(error = %err, "could not start highlight thread"))
        .ok();
    tx
}

fn highlight_loop(rx: Receiver<HighlightRequest>, event_tx: UnboundedSender<AppEvent>) {
    let _ = &*PS;
    let _ = &*TS;

    for mut request in &rx {
        // Only the newest queued request matters.
        while let Ok(newer) = rx.try_recv() {
            request = newer;
        }
        let result = highlight(&request);
        if event_tx.send(AppEvent::Highlighted(Box::new(result))).is_err() {
            break;
        }
    }
}

/// syntect lookup token for a grammar id. Grammars that only exist to be
/// extended count as available.
fn grammar_token(grammar: &str) -> Option<&'static str> {
    let token = match grammar {
        "markup" => "html",
        "css" => "css",
        "javascript" => "js",
        "json" => "json",
        "python" => "py",
        "ruby" => "rb",
        "php" => "php",
        "java" => "java",
        "c" => "c",
        "cpp" => "cpp",
        "csharp" => "cs",
        "go" => "go",
        "rust" => "rs",
        "bash" => "sh",
        "perl" => "pl",
        "r" => "r",
        "scala" => "scala",
        "lua" => "lua",
        "lisp" => "lisp",
        "clojure" => "clj",
        "haskell" => "hs",
        "ocaml" => "ml",
        "erlang" => "erl",
        "d" => "d",
        "yaml" => "yaml",
        "makefile" => "makefile",
        "groovy" => "groovy",
        "markdown" => "md",
        "latex" => "tex",
        "sql" => "sql",
        "matlab" => "matlab",
        "batch" => "bat",
        _ => return None,
    };
    Some(token)
}

fn is_abstract(grammar: &str) -> bool {
    matches!(grammar, "clike" | "markup-templating")
}

/// Resolves the syntax for `path`, requiring its whole load order.
fn resolve(path: &str) -> Option<(&'static str, &'static SyntaxReference)> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let language = lang::language_for(file_name)?;
    let mut syntax = None;
    for grammar in lang::load_order(language) {
        if is_abstract(grammar) {
            continue;
        }
        let found = grammar_token(grammar).and_then(|t| PS.find_syntax_by_token(t));
        match found {
            Some(s) => syntax = Some(s),
            None => {
                tracing::debug!(language, grammar, "grammar unavailable, using plain text");
                return None;
            }
        }
    }
    syntax.map(|s| (language, s))
}

fn highlight(request: &HighlightRequest) -> HighlightResult {
    let theme = TS
        .themes
        .get(request.syntax_theme)
        .or_else(|| TS.themes.values().next());

    let (language, lines) = match (resolve(&request.path), theme) {
        (Some((language, syntax)), Some(theme)) => {
            let mut h = HighlightLines::new(syntax, theme);
            let lines = LinesWithEndings::from(&request.text)
                .map(|line| highlight_line(line, &mut h))
                .collect();
            (Some(language), lines)
        }
        _ => (None, plain_lines(&request.text)),
    };

    HighlightResult {
        work: request.work,
        sha: request.sha.clone(),
        language,
        lines,
    }
}

fn plain_lines(text: &str) -> Vec<Line<'static>> {
    text.lines().map(|l| Line::raw(l.to_owned())).collect()
}

fn highlight_line(line: &str, h: &mut HighlightLines) -> Line<'static> {
    match h.highlight_line(line, &PS) {
        Ok(ranges) => Line::from(
            ranges
                .into_iter()
                .map(|(style, text)| syntect_to_span(style, text.trim_end_matches(['\n', '\r'])))
                .collect::<Vec<_>>(),
        ),
        Err(err) => {
            tracing::trace!(error = %err, "highlight failed for line");
            Line::raw(line.trim_end_matches(['\n', '\r']).to_owned())
        }
    }
}

/// Converts a syntect style run into an owned ratatui span. Backgrounds are
/// dropped so the panel's own background shows through.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    let fg = style.foreground;
    let mut out = Style::default();
    if fg.a > 0 {
        out = out.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(content.to_owned(), out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, text: &str) -> HighlightRequest {
        HighlightRequest {
            work: 1,
            sha: "abc".into(),
            path: path.into(),
            text: text.into(),
            syntax_theme: "base16-ocean.dark",
        }
    }

    #[test]
    fn known_language_is_highlighted_line_for_line() {
        let result = highlight(&request("src/main.rs", "fn main() {\n    let x = 1;\n}\n"));
        assert_eq!(result.language, Some("rust"));
        assert_eq!(result.lines.len(), 3);
        assert!(result.lines[0].spans.len() > 1);
    }

    #[test]
    fn missing_dependency_grammar_falls_back_to_plain() {
        // typescript has no bundled grammar, so tsx cannot load.
        let result = highlight(&request("App.tsx", "const a = <div/>;\nexport default a;"));
        assert_eq!(result.language, None);
        assert_eq!(result.lines.len(), 2);
    }

    #[test]
    fn thread_serves_queued_requests_until_sender_drops() {
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let tx = spawn(event_tx);
        tx.send(request("a.rs", "let a = 1;")).unwrap();
        let Some(AppEvent::Highlighted(first)) = event_rx.blocking_recv() else {
            panic!("expected a highlight result");
        };
        assert_eq!(first.language, Some("rust"));

        // The receiver is reused after the first request.
        tx.send(HighlightRequest { sha: "def".into(), ..request("b.txt", "plain") }).unwrap();
        let Some(AppEvent::Highlighted(second)) = event_rx.blocking_recv() else {
            panic!("expected a second highlight result");
        };
        assert_eq!(second.sha, "def");

        drop(tx);
        assert!(event_rx.blocking_recv().is_none());
    }

    #[test]
    fn unknown_extension_is_plain() {
        let result = highlight(&request("notes.zzz", "hello"));
        assert_eq!(result.language, None);
        assert_eq!(result.lines[0].to_string(), "hello");
    }
}
