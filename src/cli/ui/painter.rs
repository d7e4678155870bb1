use owo_colors::{OwoColorize, Style as OwoStyle};

/// Applies colour and style to terminal text.
///
/// A painter built with colour disabled returns text unchanged, which keeps
/// piped output and snapshots free of escape codes.
#[derive(Debug)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().green())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    /// Device paths and directory names.
    pub(crate) fn path<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().blue())
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }
}
