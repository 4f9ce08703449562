//! Line-delimited JSON bridge to the chat gateway process.
//!
//! Inbound, one object per line:
//!   {"type":"ready","user_id":"..."}
//!   {"type":"message","id":..,"channel_id":..,"author":{"id","mention"},"content":..,"attachments":[{"filename","url"}]}
//!
//! Outbound, one object per line:
//!   {"op":"identify","token":"..."}
//!   {"op":"delete","message_id":"..."}
//!   {"op":"send","channel_id":"...","content":"..."}

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use optic::moderation::{
    execute, Action, Attachment, AttachmentSource, ChatPlatform, InboundMessage, Moderator,
    PlatformError,
};
use optic::ModerationError;

/// How many deleted message ids `LinePlatform` remembers.
const RECENT_DELETES: usize = 1024;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    Ready { user_id: String },
    Message(InboundMessage),
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Control<'a> {
    Identify { token: &'a str },
}

/// Writes platform operations as JSON lines.
///
/// Remembers the last `RECENT_DELETES` messages it asked to delete and
/// answers a second delete of one of them with `NotFound`, the way the live
/// platform does.
pub struct LinePlatform<W: Write> {
    out: W,
    deleted: VecDeque<String>,
}

impl<W: Write> LinePlatform<W> {
    pub fn new(out: W) -> Self {
        LinePlatform { out, deleted: VecDeque::new() }
    }

    pub fn identify(&mut self, token: &str) -> std::io::Result<()> {
        self.write_line(&Control::Identify { token })
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChatPlatform for LinePlatform<W> {
    fn delete_message(&mut self, message_id: &str) -> Result<(), PlatformError> {
        if self.deleted.iter().any(|id| id == message_id) {
            return Err(PlatformError::NotFound(message_id.to_owned()));
        }
        self.write_line(&Action::Delete { message_id: message_id.to_owned() })
            .map_err(|e| PlatformError::Transport(e.to_string()))?;
        if self.deleted.len() == RECENT_DELETES {
            self.deleted.pop_front();
        }
        self.deleted.push_back(message_id.to_owned());
        Ok(())
    }

    fn send_message(&mut self, channel_id: &str, content: &str) -> Result<(), PlatformError> {
        self.write_line(&Action::Send { channel_id: channel_id.to_owned(), content: content.to_owned() })
            .map_err(|e| PlatformError::Transport(e.to_string()))
    }
}

/// Downloads attachments from their CDN URL.
pub struct HttpAttachments {
    client: reqwest::blocking::Client,
}

impl HttpAttachments {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(HttpAttachments { client })
    }
}

impl AttachmentSource for HttpAttachments {
    fn fetch(&self, attachment: &Attachment) -> Result<Vec<u8>, ModerationError> {
        let to_io = |e: reqwest::Error| {
            ModerationError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        };
        let response = self.client.get(&attachment.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(to_io)?;
        Ok(response.bytes().map_err(to_io)?.to_vec())
    }
}

/// Processes gateway events until `input` closes.
pub fn run<R: BufRead>(input: R, moderator: &mut Moderator, platform: &mut dyn ChatPlatform) {
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("Gateway input closed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<GatewayEvent>(&line) {
            Ok(GatewayEvent::Ready { user_id }) => {
                log::info!("Bot {} is running", user_id);
                moderator.set_self_id(user_id);
            }
            Ok(GatewayEvent::Message(msg)) => {
                let actions = moderator.moderate(&msg);
                execute(&actions, platform);
            }
            Err(e) => log::warn!("Skipping malformed gateway line: {}", e),
        }
    }
}
