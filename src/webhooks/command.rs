//! Recognizes the merge command in comment text.
//!
//! The command is a line consisting of exactly `@<bot> merge` after trimming.
//! Text inside HTML comments and fenced code blocks is dropped first, so a
//! quoted command never triggers a merge.

use regex::Regex;

use crate::webhooks::event::IssueEvent;

const ACCEPTED_ACTIONS: [&str; 3] = ["created", "edited", "submitted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    IgnoreBot,
    IgnoreNotPr,
    IgnoreAction,
    NoCommand,
    Merge,
}

impl CommandOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandOutcome::IgnoreBot => "ignore-bot",
            CommandOutcome::IgnoreNotPr => "ignore-not-pr",
            CommandOutcome::IgnoreAction => "ignore-action",
            CommandOutcome::NoCommand => "no-command",
            CommandOutcome::Merge => "merge",
        }
    }
}

pub struct CommandRecognizer {
    command: Regex,
}

impl CommandRecognizer {
    pub fn new(bot_name: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            command: Regex::new(&format!("^@{} merge$", regex::escape(bot_name)))?,
        })
    }

    pub fn recognize(&self, event: &IssueEvent) -> CommandOutcome {
        // Our own comments and those of other bots are never commands.
        if event.is_bot {
            return CommandOutcome::IgnoreBot;
        }
        if !event.is_pull_request {
            return CommandOutcome::IgnoreNotPr;
        }
        if !ACCEPTED_ACTIONS.contains(&event.action.as_str()) {
            return CommandOutcome::IgnoreAction;
        }

        if self.has_command(&event.comment_text) {
            CommandOutcome::Merge
        } else {
            CommandOutcome::NoCommand
        }
    }

    pub fn has_command(&self, text: &str) -> bool {
        self.strip_quoted(text)
            .lines()
            .any(|line| self.command.is_match(line.trim()))
    }

    /// Removes HTML comments and fenced code blocks in one pass, so neither
    /// is recognized inside the other. An unterminated fence or comment
    /// swallows the rest of the text.
    pub fn strip_quoted(&self, text: &str) -> String {
        let mut fence: Option<Fence> = None;
        let mut in_comment = false;
        let mut kept = Vec::new();

        for line in text.lines() {
            if let Some(open) = fence {
                if open.is_closed_by(line) {
                    fence = None;
                }
                continue;
            }

            let mut rest = line;
            if in_comment {
                match rest.find(COMMENT_END) {
                    Some(end) => {
                        rest = &rest[end + COMMENT_END.len()..];
                        in_comment = false;
                    }
                    None => continue,
                }
            } else if let Some(open) = Fence::open(line) {
                fence = Some(open);
                continue;
            }

            let mut visible = String::new();
            while let Some(start) = rest.find(COMMENT_START) {
                visible.push_str(&rest[..start]);
                let body = &rest[start + COMMENT_START.len()..];
                match body.find(COMMENT_END) {
                    Some(end) => rest = &body[end + COMMENT_END.len()..],
                    None => {
                        in_comment = true;
                        rest = "";
                    }
                }
            }
            visible.push_str(rest);
            kept.push(visible);
        }
        kept.join("\n")
    }
}

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// An open CommonMark code fence: a run of at least three backticks or
/// tildes, indented by at most three spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let rest = strip_fence_indent(line)?;
        let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = rest.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        // a backtick fence's info string may not contain backticks
        if marker == '`' && rest[len..].contains('`') {
            return None;
        }
        Some(Self { marker, len })
    }

    /// Same marker, at least as long as the opener, nothing but whitespace after.
    fn is_closed_by(&self, line: &str) -> bool {
        let Some(rest) = strip_fence_indent(line) else {
            return false;
        };
        let len = rest.chars().take_while(|c| *c == self.marker).count();
        len >= self.len && rest[len..].trim().is_empty()
    }
}

fn strip_fence_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}
