//! System facts gathered when a session opens.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use super::rpc::XmlNode;

/// Key used for single routing-engine devices.
pub const LOCAL_RE: &str = "local";

/// Model and software version of one routing engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlatformInfo {
    pub model: String,
    pub version: String,
}

/// Hostname and per-routing-engine platform descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceFacts {
    pub hostname: String,
    /// Keyed by routing-engine name, in the order the device reported them.
    pub platforms: IndexMap<String, PlatformInfo>,
}

impl DeviceFacts {
    /// Extract facts from a `get-software-information` reply.
    ///
    /// Handles both the single routing-engine form and the
    /// `multi-routing-engine-results` form of dual-RE chassis.
    pub fn from_software_information(reply: &XmlNode) -> Self {
        let mut facts = DeviceFacts::default();

        let items = reply.find_all("multi-routing-engine-item");
        if items.is_empty() {
            if let Some(info) = reply.find("software-information") {
                facts.absorb(LOCAL_RE, info);
            }
        } else {
            for item in items {
                let re_name = item.child_text("re-name").unwrap_or(LOCAL_RE);
                if let Some(info) = item.find("software-information") {
                    facts.absorb(re_name, info);
                }
            }
        }

        facts
    }

    fn absorb(&mut self, re_name: &str, info: &XmlNode) {
        if self.hostname.is_empty() {
            if let Some(host) = info.child_text("host-name") {
                self.hostname = host.to_string();
            }
        }
        let model = info
            .child_text("product-model")
            .or_else(|| info.child_text("product-name"))
            .unwrap_or_default()
            .to_string();
        let version = info
            .child_text("junos-version")
            .map(str::to_string)
            .or_else(|| legacy_version(info))
            .unwrap_or_default();

        self.platforms
            .insert(re_name.to_string(), PlatformInfo { model, version });
    }
}

/// Pre-15.1 releases only report the version inside a package comment such as
/// `JUNOS Base OS boot [12.3R6.6]`.
fn legacy_version(info: &XmlNode) -> Option<String> {
    static BRACKETED: OnceLock<Regex> = OnceLock::new();
    let pattern =
        BRACKETED.get_or_init(|| Regex::new(r"\[([^\]]+)\]").expect("valid version pattern"));

    info.find_all("package-information")
        .into_iter()
        .filter_map(|pkg| pkg.child_text("comment"))
        .find_map(|comment| pattern.captures(comment))
        .map(|caps| caps[1].to_string())
}
