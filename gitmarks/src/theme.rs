//! Color themes.
//!
//! Two built-ins: `dark` sticks to ANSI 16 colors so it works over SSH and on
//! 256-color terminals; `catppuccin-mocha` is the Mocha palette in RGB and
//! needs truecolor. Each theme also names the syntect theme used by the
//! highlight worker.

use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub border_active: Color,
    pub border_inactive: Color,

    // File tree badges
    pub file_added: Color,
    pub file_removed: Color,
    pub file_modified: Color,
    pub file_renamed: Color,

    // Code browser
    pub line_number: Color,
    /// Gutter marker on lines the student changed.
    pub diff_marker: Color,
    pub cursor_line_bg: Color,
    pub plain_text: Color,

    // Feedback
    pub feedback_confirmed: Color,
    pub feedback_pending: Color,
    pub points_addition: Color,
    pub points_deduction: Color,
    pub points_neutral: Color,
    /// Removed words in feedback history.
    pub history_removed: Color,
    /// Added words in feedback history.
    pub history_added: Color,
    pub history_context: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_mode_normal: Color,
    pub status_mode_insert: Color,
    pub toast_success: Color,
    pub toast_error: Color,

    /// syntect theme name from `ThemeSet::load_defaults`.
    pub syntax_theme: &'static str,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            file_added: Color::Green,
            file_removed: Color::Red,
            file_modified: Color::Yellow,
            file_renamed: Color::Cyan,

            line_number: Color::DarkGray,
            diff_marker: Color::Green,
            cursor_line_bg: Color::Black,
            plain_text: Color::Reset,

            feedback_confirmed: Color::Blue,
            feedback_pending: Color::Yellow,
            points_addition: Color::Green,
            points_deduction: Color::Red,
            points_neutral: Color::DarkGray,
            history_removed: Color::Red,
            history_added: Color::Green,
            history_context: Color::DarkGray,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,
            toast_success: Color::Green,
            toast_error: Color::Red,

            syntax_theme: "base16-ocean.dark",
        }
    }

    /// Catppuccin Mocha, <https://github.com/catppuccin/catppuccin>.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68); // #313244
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            file_added: green,
            file_removed: red,
            file_modified: yellow,
            file_renamed: teal,

            line_number: overlay1,
            diff_marker: green,
            cursor_line_bg: surface0,
            plain_text: text,

            feedback_confirmed: blue,
            feedback_pending: peach,
            points_addition: green,
            points_deduction: red,
            points_neutral: overlay1,
            history_removed: red,
            history_added: green,
            history_context: overlay1,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,
            toast_success: green,
            toast_error: red,

            syntax_theme: "base16-eighties.dark",
        }
    }

    /// Resolves a configured name. Unknown names fall back to `dark` with a
    /// warning so a typo never prevents startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to dark");
                Self::dark()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_falls_back_to_dark() {
        assert_eq!(Theme::from_name("solarized").syntax_theme, Theme::dark().syntax_theme);
        assert_eq!(Theme::from_name("catppuccin-mocha").border_active, Color::Rgb(180, 190, 254));
    }
}
