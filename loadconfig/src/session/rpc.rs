//! Junos NETCONF RPC encoding and reply decoding.
//!
//! Only the handful of RPCs the load workflow needs are modelled. Replies are
//! parsed into a small owned element tree, which is plenty for `rpc-reply`
//! documents and keeps lookups simple.

use log::warn;
use quick_xml::escape::{escape, resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::payload::{ConfigPayload, LoadAction, LoadFormat};
use crate::error::NetconfError;

/// NETCONF base namespace.
pub const BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// The only capability we advertise; it selects end-of-message framing.
pub const BASE_CAPABILITY: &str = "urn:ietf:params:netconf:base:1.0";

/// Client `<hello>` message.
pub fn hello() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{BASE_NS}"><capabilities><capability>{BASE_CAPABILITY}</capability></capabilities></hello>"#
    )
}

/// RPCs issued by a load session.
#[derive(Debug, Clone, Copy)]
pub enum Rpc<'a> {
    GetSoftwareInformation,
    Lock,
    Unlock,
    LoadConfiguration(&'a ConfigPayload),
    LoadRollback(u32),
    CommitCheck,
    CompareRollback(u32),
    CommitConfirmed(u32),
    Commit,
    CloseSession,
}

impl Rpc<'_> {
    /// Short operation name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Rpc::GetSoftwareInformation => "get-software-information",
            Rpc::Lock => "lock",
            Rpc::Unlock => "unlock",
            Rpc::LoadConfiguration(_) => "load-configuration",
            Rpc::LoadRollback(_) => "rollback",
            Rpc::CommitCheck => "commit check",
            Rpc::CompareRollback(_) => "configuration compare",
            Rpc::CommitConfirmed(_) => "commit confirmed",
            Rpc::Commit => "commit",
            Rpc::CloseSession => "close-session",
        }
    }

    /// Operation element placed inside `<rpc>`.
    pub fn body(&self) -> String {
        match self {
            Rpc::GetSoftwareInformation => "<get-software-information/>".to_string(),
            Rpc::Lock => "<lock><target><candidate/></target></lock>".to_string(),
            Rpc::Unlock => "<unlock><target><candidate/></target></unlock>".to_string(),
            Rpc::LoadConfiguration(payload) => load_configuration(payload),
            Rpc::LoadRollback(n) => format!(r#"<load-configuration rollback="{n}"/>"#),
            Rpc::CommitCheck => "<commit-configuration><check/></commit-configuration>".to_string(),
            Rpc::CompareRollback(n) => {
                format!(r#"<get-configuration compare="rollback" rollback="{n}" format="text"/>"#)
            }
            Rpc::CommitConfirmed(minutes) => format!(
                "<commit-configuration><confirmed/><confirm-timeout>{minutes}</confirm-timeout></commit-configuration>"
            ),
            Rpc::Commit => "<commit-configuration/>".to_string(),
            Rpc::CloseSession => "<close-session/>".to_string(),
        }
    }

    /// Complete `<rpc>` document with the given message-id.
    pub fn to_xml(&self, message_id: u64) -> String {
        format!(
            r#"<rpc xmlns="{BASE_NS}" message-id="{message_id}">{}</rpc>"#,
            self.body()
        )
    }
}

fn load_configuration(payload: &ConfigPayload) -> String {
    // Junos only accepts set-style commands with action="set".
    let text = payload.text();
    match payload.format() {
        LoadFormat::Set => format!(
            r#"<load-configuration action="set" format="text"><configuration-set>{}</configuration-set></load-configuration>"#,
            escape(text)
        ),
        LoadFormat::Text => format!(
            r#"<load-configuration action="{}" format="text"><configuration-text>{}</configuration-text></load-configuration>"#,
            action_attr(payload.action()),
            escape(text)
        ),
        LoadFormat::Xml => format!(
            r#"<load-configuration action="{}" format="xml">{}</load-configuration>"#,
            action_attr(payload.action()),
            text.trim()
        ),
    }
}

fn action_attr(action: LoadAction) -> &'static str {
    match action {
        LoadAction::Merge => "merge",
        LoadAction::Replace => "replace",
    }
}

// =============================================================================
// Element tree
// =============================================================================

/// Owned XML element. Namespace prefixes are dropped from names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Concatenated character data directly inside this element.
    pub text: String,
}

impl XmlNode {
    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<XmlNode, NetconfError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| NetconfError::Xml(e.to_string()))?;
            match event {
                Event::Start(start) => stack.push(Self::open(&start)?),
                Event::Empty(start) => {
                    let node = Self::open(&start)?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| NetconfError::Xml("unbalanced end tag".to_string()))?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&text));
                    }
                }
                Event::CData(data) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::GeneralRef(reference) => {
                    if let Some(top) = stack.last_mut() {
                        push_reference(&mut top.text, &String::from_utf8_lossy(&reference));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(NetconfError::Xml("unexpected end of document".to_string()));
        }
        root.ok_or_else(|| NetconfError::Xml("empty document".to_string()))
    }

    fn open(start: &BytesStart<'_>) -> Result<XmlNode, NetconfError> {
        let mut node = XmlNode {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            ..Default::default()
        };
        for attr in start.attributes() {
            let attr = attr.map_err(|e| NetconfError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw)
                .map_err(|e| NetconfError::Xml(e.to_string()))?
                .into_owned();
            node.attributes.push((key, value));
        }
        Ok(node)
    }

    fn attach(
        stack: &mut [XmlNode],
        root: &mut Option<XmlNode>,
        node: XmlNode,
    ) -> Result<(), NetconfError> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None if root.is_none() => *root = Some(node),
            None => return Err(NetconfError::Xml("multiple root elements".to_string())),
        }
        Ok(())
    }

    /// Value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(XmlNode::text)
    }

    /// Trimmed character data.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// First descendant (depth-first, excluding self) with the given name.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        self.children
            .iter()
            .find_map(|c| if c.name == name { Some(c) } else { c.find(name) })
    }

    /// All descendants with the given name, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect(name, found);
        }
    }
}

fn push_reference(out: &mut String, name: &str) {
    let resolved = match name.strip_prefix('#') {
        Some(code) => {
            let parsed = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            parsed.and_then(char::from_u32).map(|c| c.to_string())
        }
        None => resolve_predefined_entity(name).map(str::to_string),
    };
    match resolved {
        Some(s) => out.push_str(&s),
        None => {
            out.push('&');
            out.push_str(name);
            out.push(';');
        }
    }
}

// =============================================================================
// Replies
// =============================================================================

/// Peer `<hello>` contents.
#[derive(Debug, Clone)]
pub struct Hello {
    pub session_id: Option<u64>,
    pub capabilities: Vec<String>,
}

impl Hello {
    pub fn parse(message: &[u8]) -> Result<Self, NetconfError> {
        let root = XmlNode::parse(&String::from_utf8_lossy(message))?;
        if root.name != "hello" {
            return Err(NetconfError::Protocol {
                message: format!("expected <hello>, got <{}>", root.name),
            });
        }
        let capabilities = root
            .find_all("capability")
            .into_iter()
            .map(|c| c.text().to_string())
            .collect();
        let session_id = root.child_text("session-id").and_then(|s| s.parse().ok());
        Ok(Self {
            session_id,
            capabilities,
        })
    }

    pub fn supports_base_1_0(&self) -> bool {
        self.capabilities.iter().any(|c| c == BASE_CAPABILITY)
    }
}

/// One `<rpc-error>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub severity: String,
    pub message: String,
    pub path: Option<String>,
    pub bad_element: Option<String>,
}

impl RpcError {
    fn from_node(node: &XmlNode) -> Self {
        let info = node.child("error-info");
        Self {
            severity: node.child_text("error-severity").unwrap_or("error").to_string(),
            message: node
                .child_text("error-message")
                .filter(|m| !m.is_empty())
                .unwrap_or("unspecified error")
                .to_string(),
            path: node.child_text("error-path").map(str::to_string),
            bad_element: info
                .and_then(|i| i.child_text("bad-element"))
                .map(str::to_string),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity != "warning"
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref element) = self.bad_element {
            write!(f, " ({})", element)?;
        }
        Ok(())
    }
}

/// Decoded `<rpc-reply>`.
#[derive(Debug, Clone)]
pub struct RpcReply {
    pub message_id: Option<String>,
    root: XmlNode,
}

impl RpcReply {
    pub fn parse(message: &[u8]) -> Result<Self, NetconfError> {
        let root = XmlNode::parse(&String::from_utf8_lossy(message))?;
        if root.name != "rpc-reply" {
            return Err(NetconfError::Protocol {
                message: format!("expected <rpc-reply>, got <{}>", root.name),
            });
        }
        Ok(Self {
            message_id: root.attr("message-id").map(str::to_string),
            root,
        })
    }

    /// The `<rpc-reply>` element.
    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    /// Every `<rpc-error>` in the reply, at any depth.
    pub fn errors(&self) -> Vec<RpcError> {
        self.root
            .find_all("rpc-error")
            .into_iter()
            .map(RpcError::from_node)
            .collect()
    }

    /// Fail on error-severity rpc-errors; log warnings.
    pub fn check(self, operation: &str) -> Result<Self, NetconfError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.errors().into_iter().partition(RpcError::is_error);

        for warning in &warnings {
            warn!("{} warning: {}", operation, warning);
        }

        if errors.is_empty() {
            return Ok(self);
        }
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(NetconfError::Rpc {
            operation: operation.to_string(),
            message,
        })
    }
}
