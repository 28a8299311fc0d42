//! Output panel state and terminal-safe text.

use crate::error::ClientResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    Idle,
    Loading,
    Shown(String),
    Errored(String),
}

/// Identifies one open/load cycle of the panel. A result carrying a stale
/// ticket arrived after the panel was closed or reused and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// The single modal output panel.
#[derive(Debug)]
pub struct OutputPanel {
    title: String,
    state: PanelState,
    generation: u64,
}

impl OutputPanel {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            state: PanelState::Idle,
            generation: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != PanelState::Idle
    }

    /// Opens the panel in `Loading` and returns the ticket the in-flight
    /// dispatch must present when it resolves.
    pub fn open_loading(&mut self, title: impl Into<String>) -> Ticket {
        self.generation += 1;
        self.title = sanitize(&title.into());
        self.state = PanelState::Loading;
        Ticket(self.generation)
    }

    /// Applies a dispatch result. Returns `false` when the ticket is stale.
    pub fn resolve(&mut self, ticket: Ticket, result: ClientResult<String>) -> bool {
        if ticket.0 != self.generation || self.state != PanelState::Loading {
            return false;
        }

        self.state = match result {
            Ok(text) => PanelState::Shown(sanitize(&text)),
            Err(err) => PanelState::Errored(sanitize(&err.to_string())),
        };
        true
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.state = PanelState::Idle;
    }
}

impl Default for OutputPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Makes backend text safe to put on a terminal.
///
/// Escape sequences (CSI, OSC and two-byte forms) and every control character
/// except newline and tab are removed; everything printable, including `<`,
/// `>` and `&`, is kept literally. The result contains no ESC, so applying
/// this twice is the same as applying it once.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // CSI: parameters then one final byte in 0x40..=0x7e.
                    for c in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    // OSC: terminated by BEL or ST (ESC \).
                    while let Some(c) = chars.next() {
                        if c == '\u{7}' {
                            break;
                        }
                        if c == '\u{1b}' {
                            if chars.peek() == Some(&'\\') {
                                chars.next();
                            }
                            break;
                        }
                    }
                }
                Some(_) => {
                    chars.next();
                }
                None => {}
            },
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn markup_characters_render_literally() {
        let text = "<b>A & B</b> > C";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn escape_sequences_are_removed() {
        let text = "\u{1b}[31mred\u{1b}[0m \u{1b}]0;title\u{7}done\r\n";
        assert_eq!(sanitize(text), "red done\n");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for text in [
            "plain",
            "\u{1b}[2J<script>&amp;",
            "\u{1b}\u{1b}[[m",
            "tab\tnew\nline\u{7}bell",
            "\u{9b}c1 csi",
        ] {
            let once = sanitize(text);
            assert_eq!(sanitize(&once), once, "input {:?}", text);
            assert!(!once.chars().any(|c| c == '\u{1b}'));
        }
    }

    #[test]
    fn loading_resolves_to_shown_text() {
        let mut panel = OutputPanel::new();
        let ticket = panel.open_loading("CGPA");
        assert_eq!(panel.state(), &PanelState::Loading);

        assert!(panel.resolve(ticket, Ok("CGPA: 8.5".to_string())));
        assert_eq!(panel.state(), &PanelState::Shown("CGPA: 8.5".to_string()));
    }

    #[test]
    fn failure_resolves_to_error_message() {
        let mut panel = OutputPanel::new();
        let ticket = panel.open_loading("Chat");
        panel.resolve(ticket, Err(ClientError::Export("quota exceeded".to_string())));
        assert_eq!(
            panel.state(),
            &PanelState::Errored("quota exceeded".to_string())
        );
    }

    #[test]
    fn late_result_after_close_is_dropped() {
        let mut panel = OutputPanel::new();
        let ticket = panel.open_loading("Marks");
        panel.close();

        assert!(!panel.resolve(ticket, Ok("late".to_string())));
        assert_eq!(panel.state(), &PanelState::Idle);
        assert!(!panel.is_open());
    }

    #[test]
    fn result_for_previous_open_is_dropped() {
        let mut panel = OutputPanel::new();
        let first = panel.open_loading("Marks");
        panel.close();
        let second = panel.open_loading("Grades");

        assert!(!panel.resolve(first, Ok("marks".to_string())));
        assert!(panel.resolve(second, Ok("grades".to_string())));
        assert_eq!(panel.state(), &PanelState::Shown("grades".to_string()));
    }
}
