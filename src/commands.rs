//! Chat commands understood by the scheduler.

/// Manual trigger command name, without the leading slash.
pub const TALK_COMMAND: &str = "rekindle_talk";

/// Sent to non-admins who try a command.
pub const DENIED_REPLY: &str = "Sorry, only admins can use this command.";

/// First reply to an accepted manual trigger, sent before generation starts.
pub const ACK_REPLY: &str = "Okay, give me a moment to think of something to say...";

/// Sent when the pipeline produced nothing.
pub const NOTHING_TO_SAY_REPLY: &str = "Hmm, I couldn't come up with anything to say.";

/// A recognised command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Generate a proactive message for the sender's session right now.
    Talk,
}

impl Command {
    /// Parse a message as a command.
    ///
    /// Accepts `/rekindle_talk` or `rekindle_talk`, optionally followed by
    /// arguments, which are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text.strip_prefix('/').unwrap_or(text);
        let name = text.split_whitespace().next()?;
        match name {
            TALK_COMMAND => Some(Self::Talk),
            _ => None,
        }
    }
}

/// Lines to send back to the command's sender, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReply {
    pub lines: Vec<String>,
}

impl CommandReply {
    pub fn denied() -> Self {
        Self {
            lines: vec![DENIED_REPLY.to_owned()],
        }
    }

    pub fn acknowledged() -> Self {
        Self {
            lines: vec![ACK_REPLY.to_owned()],
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Append the failure line for an error.
    pub fn push_problem(&mut self, error: &impl std::fmt::Display) {
        self.lines.push(format!("Sorry, I ran into a problem: {error}"));
    }

    /// Last line, i.e. the generated text or failure description.
    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }
}
