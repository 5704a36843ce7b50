use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();
static STDERR_THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
}

impl Theme {
    /// Colors when `term` is a terminal, plain text when redirected.
    pub fn detect(term: &console::Term) -> Self {
        if !term.is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
        }
    }
}

/// Styles for output written to stdout.
pub fn theme() -> &'static Theme {
    THEME.get_or_init(|| Theme::detect(&console::Term::stdout()))
}

/// Styles for diagnostics written to stderr.
pub fn stderr_theme() -> &'static Theme {
    STDERR_THEME.get_or_init(|| Theme::detect(&console::Term::stderr()))
}
