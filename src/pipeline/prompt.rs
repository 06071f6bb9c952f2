//! Chat prompt template rendering.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal braces.
//! Unknown placeholders and unbalanced braces are errors so a broken template
//! fails the chat phase instead of leaking braces into a message.

use crate::error::{RekindleError, Result};

/// Values substituted into the chat template.
#[derive(Debug, Clone, Copy)]
pub struct ChatPromptVars<'a> {
    /// `{inactive_hours}`
    pub inactive_hours: u64,
    /// `{todays_event}`
    pub todays_event: &'a str,
    /// `{history_text}`
    pub history_text: &'a str,
}

/// Render `template` with `vars`.
///
/// # Errors
///
/// Returns [`RekindleError::Template`] on an unknown placeholder or an
/// unbalanced brace.
pub fn render_chat_prompt(template: &str, vars: &ChatPromptVars<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len() + vars.todays_event.len() + vars.history_text.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(RekindleError::Template(
                        "unclosed `{` in chat prompt".to_owned(),
                    ));
                }
                match name.trim() {
                    "inactive_hours" => out.push_str(&vars.inactive_hours.to_string()),
                    "todays_event" => out.push_str(vars.todays_event),
                    "history_text" => out.push_str(vars.history_text),
                    other => {
                        return Err(RekindleError::Template(format!(
                            "unknown placeholder `{{{other}}}` in chat prompt"
                        )));
                    }
                }
            }
            '}' => {
                return Err(RekindleError::Template(
                    "single `}` in chat prompt".to_owned(),
                ));
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
