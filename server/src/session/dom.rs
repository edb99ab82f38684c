//! Document operations a session performs on its client page.
//!
//! Writes are fire-and-forget onto the outbox. Reads send a request and then take
//! the next inbound packet as the answer, so they suspend the read loop.

use super::Session;
use crate::error::ProtocolError;
use crate::proto::packet::{Packet, MSG_LIST};

impl Session {
    /// Queue a packet for the writer task.
    pub fn send(&self, packet: Packet) -> Result<(), ProtocolError> {
        self.outbox.send(packet).map_err(|_| ProtocolError::Closed)
    }

    pub fn append_msg(&self, selector: &str, text: &str) -> Result<(), ProtocolError> {
        self.send(Packet::append_msg(selector, text))
    }

    pub fn append_link(&self, selector: &str, href: &str, text: &str) -> Result<(), ProtocolError> {
        self.send(Packet::append_link(selector, href, text))
    }

    pub fn append_break(&self, selector: &str) -> Result<(), ProtocolError> {
        self.send(Packet::append_break(selector))
    }

    pub fn set_attribute(&self, selector: &str, attribute: &str, value: &str) -> Result<(), ProtocolError> {
        self.send(Packet::set_attribute(selector, attribute, value))
    }

    pub async fn get_attribute(&mut self, selector: &str, attribute: &str) -> Result<String, ProtocolError> {
        self.request(Packet::get_attribute(selector, attribute)).await
    }

    pub fn set_property(&self, selector: &str, property: &str, value: &str) -> Result<(), ProtocolError> {
        self.send(Packet::set_property(selector, property, value))
    }

    pub async fn get_property(&mut self, selector: &str, property: &str) -> Result<String, ProtocolError> {
        self.request(Packet::get_property(selector, property)).await
    }

    pub fn inner_html(&self, selector: &str, value: &str) -> Result<(), ProtocolError> {
        self.send(Packet::inner_html(selector, value))
    }

    pub async fn get_html(&mut self, selector: &str) -> Result<String, ProtocolError> {
        self.request(Packet::get_html(selector)).await
    }

    pub fn focus(&self, selector: &str, value: bool) -> Result<(), ProtocolError> {
        self.send(Packet::focus(selector, value))
    }

    pub fn editable(&self, selector: &str, value: bool) -> Result<(), ProtocolError> {
        self.send(Packet::editable(selector, value))
    }

    pub async fn exists(&mut self, selector: &str) -> Result<bool, ProtocolError> {
        Ok(self.request(Packet::exists(selector)).await? == "true")
    }

    /// Show `text` and return the next line the user enters.
    pub async fn prompt(&mut self, text: &str) -> Result<String, ProtocolError> {
        let text = if text.is_empty() { "Enter some input:" } else { text };
        self.append_msg(MSG_LIST, text)?;
        let answer = self.next_packet().await?;
        Ok(answer.line())
    }

    /// Like `prompt`, with `selector` switched to a password input while waiting.
    /// The original input type is restored whether or not the prompt succeeds.
    pub async fn prompt_secure(&mut self, selector: &str, text: &str) -> Result<String, ProtocolError> {
        let original = self.get_attribute(selector, "type").await?;
        let original = if original.is_empty() { "text".to_string() } else { original };

        self.set_attribute(selector, "type", "password")?;
        let answer = self.prompt(text).await;
        let restored = self.set_attribute(selector, "type", &original);

        let answer = answer?;
        restored?;
        Ok(answer)
    }

    /// Send a read request and wait for its `Response`.
    async fn request(&mut self, packet: Packet) -> Result<String, ProtocolError> {
        self.send(packet)?;
        let reply = self.next_packet().await?;
        Ok(reply.response().unwrap_or_default().to_string())
    }
}
