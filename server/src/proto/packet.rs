use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProtocolError;

/// Selector of the scrolling message list in the terminal page.
pub const MSG_LIST: &str = "#msg-list";
/// Selector of the input box the user types into.
pub const INPUT_BOX: &str = "#msg-txt";
/// Selector of the status area showing the current display name.
pub const STATUS_BOX: &str = "#status-box";

/// The atomic message exchanged over a terminal connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "Type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(rename = "Args", default, deserialize_with = "nullable")]
    pub args: Vec<String>,
    #[serde(rename = "Map", default, deserialize_with = "nullable")]
    pub map: BTreeMap<String, String>,
}

/// Browsers and older clients send `null` for empty collections.
fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Serialize a packet for a text frame.
pub fn encode(packet: &Packet) -> Result<String, ProtocolError> {
    serde_json::to_string(packet).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Parse a packet received from a client.
pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

impl Packet {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// An `input` packet as the client sends it, carrying one typed line.
    #[cfg(test)]
    pub fn input(line: &str) -> Self {
        let mut p = Self::new("input");
        p.args.push(line.to_string());
        p
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// The command line typed by the user: `Map["Line"]` when the client sends the
    /// raw text, otherwise the arguments joined by single spaces.
    pub fn line(&self) -> String {
        match self.get("Line") {
            Some(line) => line.to_string(),
            None => self.args.join(" "),
        }
    }

    /// Answer to a `get*` or `exists` request.
    pub fn response(&self) -> Option<&str> {
        self.get("Response")
    }

    // --- client-bound document operations ---

    /// A `div.msg` holding `text`, scrolled into view.
    pub fn append_msg(selector: &str, text: &str) -> Self {
        Self::new("appendElement")
            .with("Element", "div")
            .with("Selector", selector)
            .with("Class", "msg")
            .with("Text", text)
            .with("Scroll", "true")
    }

    /// An anchor opening `href` in a new tab.
    pub fn append_link(selector: &str, href: &str, text: &str) -> Self {
        Self::new("appendElement")
            .with("Element", "a")
            .with("Selector", selector)
            .with("Id", text)
            .with("Class", "ip-link")
            .with("Href", href)
            .with("Text", text)
            .with("Target", "_blank")
            .with("Scroll", "true")
            .with("OnClick", "removeDecoration")
    }

    pub fn append_break(selector: &str) -> Self {
        Self::new("appendElement")
            .with("Element", "br")
            .with("Selector", selector)
            .with("Scroll", "true")
    }

    pub fn set_attribute(selector: &str, attribute: &str, value: &str) -> Self {
        Self::new("setAttribute")
            .with("Selector", selector)
            .with("Attribute", attribute)
            .with("Value", value)
    }

    pub fn get_attribute(selector: &str, attribute: &str) -> Self {
        Self::new("getAttribute")
            .with("Selector", selector)
            .with("Attribute", attribute)
    }

    pub fn set_property(selector: &str, property: &str, value: &str) -> Self {
        Self::new("setProperty")
            .with("Selector", selector)
            .with("Property", property)
            .with("Value", value)
    }

    pub fn get_property(selector: &str, property: &str) -> Self {
        Self::new("getProperty")
            .with("Selector", selector)
            .with("Property", property)
    }

    pub fn inner_html(selector: &str, value: &str) -> Self {
        Self::new("innerHTML")
            .with("Selector", selector)
            .with("Value", value)
    }

    pub fn get_html(selector: &str) -> Self {
        Self::new("getHTML").with("Selector", selector)
    }

    pub fn focus(selector: &str, value: bool) -> Self {
        Self::new("focus")
            .with("Selector", selector)
            .with("Value", value.to_string())
    }

    pub fn editable(selector: &str, value: bool) -> Self {
        Self::new("editable")
            .with("Selector", selector)
            .with("Value", value.to_string())
    }

    pub fn exists(selector: &str) -> Self {
        Self::new("exists").with("Selector", selector)
    }
}
