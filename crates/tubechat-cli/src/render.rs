use std::fmt::Write;
use tubechat_session::SessionState;
use tubechat_types::{Channel, Message, MessageRole, MessageStatus};

/// ANSI clear-screen and cursor-home
pub const CLEAR: &str = "\x1b[2J\x1b[H";

pub const HELP: &str = "\
Commands:
  /channels          list channels
  /search <text>     filter the channel list (/search alone clears it)
  /open <n|id>       open the n-th listed channel, or a channel id
  /reset             start a fresh conversation
  /help              show this help
  /quit              exit
Anything else is sent as a message.";

/// Channels whose title contains `filter` (case-insensitive), numbered
/// from 1 in list order
pub fn filtered_channels<'a>(
    channels: &'a [Channel],
    filter: Option<&str>,
) -> Vec<(usize, &'a Channel)> {
    let needle = filter.map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty());
    channels
        .iter()
        .enumerate()
        .filter(|(_, c)| match &needle {
            Some(needle) => c.title.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .map(|(i, c)| (i + 1, c))
        .collect()
}

pub fn render_channels(channels: &[Channel], filter: Option<&str>) -> String {
    let mut out = String::new();
    let listed = filtered_channels(channels, filter);

    match filter {
        Some(filter) => {
            let _ = writeln!(out, "Channels matching \"{}\":", filter.trim());
        }
        None => out.push_str("Channels:\n"),
    }
    if listed.is_empty() {
        out.push_str("  (none)\n");
    }
    for (n, channel) in listed {
        let marker = if channel.is_active() { "" } else { " [inactive]" };
        let _ = writeln!(out, "  {:>2}. {}{}", n, channel.title, marker);
    }
    out
}

pub fn render_header(channel: Option<&Channel>, state: SessionState) -> String {
    let title = channel.map(|c| c.title.as_str()).unwrap_or("(no channel)");
    let status = match state {
        SessionState::Sending => "generating your response...",
        SessionState::Loading => "getting your conversation ready...",
        SessionState::Resetting => "starting a new conversation...",
        SessionState::Failed => "unavailable",
        SessionState::Ready | SessionState::Uninitialized => "",
    };
    if status.is_empty() {
        format!("== {} ==\n", title)
    } else {
        format!("== {} == {}\n", title, status)
    }
}

pub fn render_message(message: &Message, show_timestamps: bool) -> String {
    let speaker = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };
    let suffix = match message.status {
        MessageStatus::Failed => " [failed]",
        MessageStatus::Rejected => " [rejected]",
        MessageStatus::Regenerated => " [regenerated]",
        MessageStatus::InProgress | MessageStatus::Completed => "",
    };

    let mut out = String::new();
    if show_timestamps {
        let local = message.created_at.with_timezone(&chrono::Local);
        let _ = write!(out, "[{}] ", local.format("%H:%M"));
    }
    let _ = writeln!(out, "{}>{}", speaker, suffix);
    for line in message.content.lines() {
        let _ = writeln!(out, "  {}", line);
    }
    out
}

pub fn render_transcript(messages: &[Message], show_timestamps: bool) -> String {
    if messages.is_empty() {
        return "  Start typing your question...\n".to_string();
    }
    messages
        .iter()
        .map(|m| render_message(m, show_timestamps))
        .collect::<Vec<_>>()
        .join("\n")
}
