use anyhow::Context;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tubechat_client::ConversationGateway;
use tubechat_session::{SessionCoordinator, SessionError, SessionEvent};
use tubechat_types::Channel;

use crate::config::UiConfig;
use crate::render;

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Channels,
    /// `None` closes the search
    Search(Option<String>),
    Open(String),
    Reset,
    Help,
    Quit,
    Send(String),
    Unknown(String),
}

impl Command {
    /// `None` for blank input
    pub fn parse(line: &str) -> Option<Command> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed.starts_with('/') {
            return Some(Command::Send(trimmed.to_string()));
        }

        let (name, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (trimmed, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());

        let command = match (name, arg) {
            ("/channels", _) => Command::Channels,
            ("/search", query) => Command::Search(query),
            ("/open", Some(channel)) => Command::Open(channel),
            ("/reset", _) => Command::Reset,
            ("/help", _) => Command::Help,
            ("/quit" | "/exit", _) => Command::Quit,
            (other, _) => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

enum Input {
    Line(Option<String>),
    Event(Option<SessionEvent>),
    Interrupt,
}

/// Terminal front end. Owns every piece of UI state: the channel list,
/// the channel search, and the open session.
pub struct App {
    gateway: Arc<dyn ConversationGateway>,
    ui: UiConfig,
    channels: Vec<Channel>,
    /// Channel search dialog; `Some` while open
    search: Option<String>,
    session: Option<SessionCoordinator>,
}

impl App {
    pub fn new(gateway: Arc<dyn ConversationGateway>, ui: UiConfig) -> Self {
        Self {
            gateway,
            ui,
            channels: Vec::new(),
            search: None,
            session: None,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn session(&self) -> Option<&SessionCoordinator> {
        self.session.as_ref()
    }

    pub async fn refresh_channels(&mut self) -> tubechat_client::Result<()> {
        self.channels = self.gateway.list_channels().await?;
        tracing::debug!(count = self.channels.len(), "Channels loaded");
        Ok(())
    }

    /// A 1-based position in the channel list, or a raw channel id
    pub fn resolve_channel(&self, arg: &str) -> String {
        match arg.parse::<usize>() {
            Ok(n) if (1..=self.channels.len()).contains(&n) => self.channels[n - 1].id.clone(),
            _ => arg.to_string(),
        }
    }

    /// Replace the current session with one for `channel_id`
    pub async fn open_channel(&mut self, channel_id: &str) -> Result<(), SessionError> {
        if let Some(previous) = self.session.take() {
            previous.close();
        }
        self.search = None;

        let session = SessionCoordinator::new(Arc::clone(&self.gateway));
        let result = session.start(channel_id).await;
        self.session = Some(session);
        result
    }

    pub async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Channels => {
                self.search = None;
                if let Err(e) = self.refresh_channels().await {
                    println!("Could not load channels: {}", e);
                }
                print!("{}", render::render_channels(&self.channels, None));
            }
            Command::Search(query) => {
                self.search = query;
                print!("{}", render::render_channels(&self.channels, self.search()));
            }
            Command::Open(arg) => {
                let channel_id = self.resolve_channel(&arg);
                match self.open_channel(&channel_id).await {
                    Ok(()) => self.redraw(),
                    Err(e) => println!("Could not open channel {}: {}", channel_id, e),
                }
            }
            Command::Reset => match &self.session {
                Some(session) => match session.reset().await {
                    Ok(_) => self.redraw(),
                    Err(SessionError::SendInFlight) => {
                        println!("Wait for the current reply to finish.")
                    }
                    Err(e) => println!("Could not reset the conversation: {}", e),
                },
                None => println!("Open a channel first (/open)."),
            },
            Command::Send(text) => match &self.session {
                Some(session) => {
                    if session.submit(&text) {
                        self.redraw();
                    } else if session.is_sending() {
                        println!("Still generating the previous response.");
                    } else {
                        println!("Session is {}.", session.state());
                    }
                }
                None => println!("Open a channel first (/open)."),
            },
            Command::Help => println!("{}", render::HELP),
            Command::Quit => return Flow::Quit,
            Command::Unknown(name) => println!("Unknown command {}.\n{}", name, render::HELP),
        }
        Flow::Continue
    }

    fn on_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::ProtocolError { detail } => {
                tracing::debug!(%detail, "Skipped malformed update");
            }
            SessionEvent::TransportError { detail } => {
                self.redraw();
                println!("Connection lost: {}", detail);
            }
            SessionEvent::MessagesChanged
            | SessionEvent::SendingStarted
            | SessionEvent::SendingEnded { .. }
            | SessionEvent::ConversationReset { .. } => self.redraw(),
        }
    }

    /// Full-screen render of the open conversation
    pub fn screen(&self) -> String {
        let Some(session) = &self.session else {
            return render::render_channels(&self.channels, self.search());
        };
        let channel = session.channel();
        format!(
            "{}{}\n{}\n> ",
            render::CLEAR,
            render::render_header(channel.as_ref(), session.state()),
            render::render_transcript(&session.messages(), self.ui.show_timestamps),
        )
    }

    fn redraw(&self) {
        print!("{}", self.screen());
        let _ = std::io::stdout().flush();
    }

    /// Read commands from stdin until `/quit`, EOF or Ctrl-C, re-rendering
    /// on every session change.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        if self.session.is_none() {
            if let Err(e) = self.refresh_channels().await {
                tracing::warn!(error = %e, "Failed to load channels");
                println!("Could not load channels: {}", e);
            }
            print!("{}", render::render_channels(&self.channels, None));
            println!("{}", render::HELP);
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut events = self.session.as_ref().map(SessionCoordinator::subscribe);

        loop {
            let input = tokio::select! {
                line = lines.next_line() => Input::Line(line.context("Failed to read input")?),
                event = next_event(&mut events) => Input::Event(event),
                _ = tokio::signal::ctrl_c() => Input::Interrupt,
            };

            match input {
                Input::Line(None) | Input::Interrupt => break,
                Input::Line(Some(line)) => {
                    let Some(command) = Command::parse(&line) else {
                        continue;
                    };
                    let opens_session = matches!(command, Command::Open(_));
                    if self.handle(command).await == Flow::Quit {
                        break;
                    }
                    if opens_session {
                        events = self.session.as_ref().map(SessionCoordinator::subscribe);
                    }
                }
                Input::Event(Some(event)) => self.on_event(event),
                Input::Event(None) => events = None,
            }
        }

        if let Some(session) = self.session.take() {
            session.close();
        }
        Ok(())
    }
}

/// Next session event; pends forever without a session
async fn next_event(events: &mut Option<broadcast::Receiver<SessionEvent>>) -> Option<SessionEvent> {
    let Some(rx) = events else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(event) => Some(event),
        // Missed updates only mean a stale screen
        Err(broadcast::error::RecvError::Lagged(_)) => Some(SessionEvent::MessagesChanged),
        Err(broadcast::error::RecvError::Closed) => None,
    }
}
