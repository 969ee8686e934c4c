//! AndroidManifest.xml mutation
//!
//! The manifest is handled as parse → transform → serialize. Parsing keeps
//! the raw events of the root element so untouched markup is written back
//! exactly as read; only the root and `<application>` start tags are rebuilt.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::{PatchError, Result};

pub const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";
pub const ANDROID_PREFIX: &str = "android";
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";
pub const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>"#;

const NETWORK_CONFIG_ATTR: &str = "networkSecurityConfig";
const NETWORK_CONFIG_VALUE: &str = "@xml/network_security_config";
// Matched by its literal name, not by resolved namespace.
const DEBUGGABLE_ATTR: &str = "android:debuggable";
const DEBUGGABLE_VALUE: &str = "true";

type RawAttributes = Vec<(String, String)>;

/// A parsed manifest: the events of the root element, start to end.
///
/// Anything outside the root (declaration, doctype, comments) is dropped;
/// serialization writes a fixed prolog instead.
#[derive(Clone, Debug)]
pub struct ManifestDocument {
    events: Vec<Event<'static>>,
}

impl ManifestDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        let mut events = Vec::new();
        let mut depth = 0usize;
        let mut seen_root = false;

        loop {
            let event = reader.read_event()?;
            match &event {
                Event::Eof => break,
                Event::Start(_) | Event::Empty(_) if depth == 0 => {
                    if seen_root {
                        return Err(PatchError::MalformedManifest(
                            "more than one root element".to_string(),
                        ));
                    }
                    seen_root = true;
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                _ if depth == 0 => continue,
                _ => {}
            }
            events.push(event.into_owned());
        }

        if !seen_root {
            return Err(PatchError::MalformedManifest("no root element".to_string()));
        }
        if depth != 0 {
            return Err(PatchError::MalformedManifest(
                "root element is not closed".to_string(),
            ));
        }
        Ok(Self { events })
    }

    /// Serialize with the fixed prolog. No trailing newline is added.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer
                .write_event(event.clone())
                .map_err(|err| PatchError::MalformedManifest(format!("serialize: {err}")))?;
        }
        let mut out = XML_PROLOG.as_bytes().to_vec();
        out.extend(writer.into_inner());
        Ok(out)
    }

    /// Index of the first `<application>` that is a direct child of the root.
    fn application_index(&self) -> Option<usize> {
        let mut depth = 0usize;
        for (idx, event) in self.events.iter().enumerate() {
            match event {
                Event::Start(start) => {
                    if depth == 1 && start.name().as_ref() == b"application" {
                        return Some(idx);
                    }
                    depth += 1;
                }
                Event::Empty(start) => {
                    if depth == 1 && start.name().as_ref() == b"application" {
                        return Some(idx);
                    }
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        None
    }

    fn start_tag(&self, idx: usize) -> Option<&BytesStart<'static>> {
        match &self.events[idx] {
            Event::Start(start) | Event::Empty(start) => Some(start),
            _ => None,
        }
    }

    fn replace_start_tag(&mut self, idx: usize, tag: BytesStart<'static>) {
        let event = match self.events[idx] {
            Event::Empty(_) => Event::Empty(tag),
            _ => Event::Start(tag),
        };
        self.events[idx] = event;
    }
}

/// Point `<application>` at the injected network config and mark it debuggable.
///
/// Re-applying to already patched output leaves exactly one of each attribute.
pub fn apply_proxy_attributes(doc: &mut ManifestDocument) -> Result<()> {
    let app_idx = doc
        .application_index()
        .ok_or(PatchError::ApplicationElementMissing)?;

    let root_tag = doc
        .start_tag(0)
        .ok_or_else(|| PatchError::MalformedManifest("missing root tag".to_string()))?;
    let mut root_attrs = read_attributes(root_tag)?;
    let app_tag = doc
        .start_tag(app_idx)
        .ok_or(PatchError::ApplicationElementMissing)?;
    let mut app_attrs = read_attributes(app_tag)?;

    // Declarations on <application> shadow those on the root.
    let mut scope = namespace_declarations(&root_attrs);
    for (prefix, uri) in namespace_declarations(&app_attrs) {
        scope.retain(|(p, _)| *p != prefix);
        scope.push((prefix, uri));
    }
    let mut android_prefixes: Vec<String> = scope
        .iter()
        .filter(|(_, uri)| uri == ANDROID_NAMESPACE)
        .map(|(prefix, _)| prefix.clone())
        .collect();

    let prefix = if android_prefixes.iter().any(|p| p == ANDROID_PREFIX) {
        ANDROID_PREFIX.to_string()
    } else {
        // `android:debuggable` is written literally, so `android` must be
        // declared even when the document uses another alias.
        if scope.iter().any(|(p, _)| p == ANDROID_PREFIX) {
            return Err(PatchError::MalformedManifest(format!(
                "prefix '{ANDROID_PREFIX}' is bound to a namespace other than {ANDROID_NAMESPACE}"
            )));
        }
        debug!("declaring xmlns:{ANDROID_PREFIX} on the manifest root");
        root_attrs.push((
            format!("xmlns:{ANDROID_PREFIX}"),
            ANDROID_NAMESPACE.to_string(),
        ));
        let rebuilt = rebuild_start_tag(root_tag, &root_attrs);
        doc.replace_start_tag(0, rebuilt);

        let alias = android_prefixes
            .first()
            .cloned()
            .unwrap_or_else(|| ANDROID_PREFIX.to_string());
        android_prefixes.push(ANDROID_PREFIX.to_string());
        alias
    };

    let network_key = app_attrs
        .iter()
        .map(|(key, _)| key)
        .find(|key| {
            split_qname(key).is_some_and(|(p, local)| {
                local == NETWORK_CONFIG_ATTR && android_prefixes.iter().any(|ap| ap == p)
            })
        })
        .cloned()
        .unwrap_or_else(|| format!("{prefix}:{NETWORK_CONFIG_ATTR}"));
    set_attribute(&mut app_attrs, &network_key, NETWORK_CONFIG_VALUE);
    set_attribute(&mut app_attrs, DEBUGGABLE_ATTR, DEBUGGABLE_VALUE);

    let app_tag = doc
        .start_tag(app_idx)
        .ok_or(PatchError::ApplicationElementMissing)?;
    let rebuilt = rebuild_start_tag(app_tag, &app_attrs);
    doc.replace_start_tag(app_idx, rebuilt);
    Ok(())
}

/// Patch the manifest at `path` in place.
///
/// Returns `Ok(false)` without touching anything when the file is absent.
pub fn update_manifest(path: &Path) -> Result<bool> {
    println!("[*]  Updating manifest at {}", path.display());
    if !path.is_file() {
        return Ok(false);
    }

    let text = fs::read_to_string(path).map_err(|err| PatchError::from_io_error(path, err))?;
    let mut doc = ManifestDocument::parse(&text)?;
    apply_proxy_attributes(&mut doc)?;
    let bytes = doc.to_bytes()?;
    fs::write(path, bytes).map_err(|err| PatchError::from_io_error(path, err))?;
    Ok(true)
}

fn read_attributes(start: &BytesStart<'_>) -> Result<RawAttributes> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| PatchError::MalformedManifest(err.to_string()))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|err| PatchError::MalformedManifest(err.to_string()))?;
        attrs.push((key.to_string(), value.to_string()));
    }
    Ok(attrs)
}

/// Values are kept in their escaped form, so they are pushed back raw.
fn rebuild_start_tag(original: &BytesStart<'_>, attrs: &[(String, String)]) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(original.name().as_ref()).into_owned();
    let mut tag = BytesStart::new(name);
    for (key, value) in attrs {
        // Values read from single-quoted attributes may hold a bare `"`.
        let value = if value.contains('"') {
            Cow::Owned(value.replace('"', "&quot;"))
        } else {
            Cow::Borrowed(value.as_str())
        };
        tag.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Borrowed(value.as_bytes()),
        });
    }
    tag
}

fn namespace_declarations(attrs: &[(String, String)]) -> Vec<(String, String)> {
    attrs
        .iter()
        .filter_map(|(key, uri)| {
            key.strip_prefix("xmlns:")
                .map(|prefix| (prefix.to_string(), uri.clone()))
        })
        .collect()
}

fn split_qname(key: &str) -> Option<(&str, &str)> {
    key.split_once(':')
}

fn set_attribute(attrs: &mut RawAttributes, key: &str, value: &str) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(existing) => existing.1 = value.to_string(),
        None => attrs.push((key.to_string(), value.to_string())),
    }
}
