//! Renders directory listings as WebDAV multistatus documents.

use crate::{models::object::ObjectRecord, services::path_resolver::display_name};
use chrono::{DateTime, Utc};

pub const LISTING_CONTENT_TYPE: &str = "application/xml";

/// Build the multistatus document for the directory at `prefix`.
///
/// The first response is the directory itself, with `request_path` echoed
/// as its href; `entries` (from `render_entries`) follow unchanged.
pub fn render_multistatus(request_path: &str, prefix: &str, entries: &str) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(r#"<D:multistatus xmlns:D="DAV:">"#);
    xml.push_str("<D:response>");
    xml.push_str(&format!("<D:href>{}</D:href>", xml_escape(request_path)));
    xml.push_str("<D:propstat><D:prop>");
    xml.push_str("<D:resourcetype><D:collection/></D:resourcetype>");
    xml.push_str(&format!(
        "<D:displayname>{}</D:displayname>",
        xml_escape(display_name(prefix))
    ));
    xml.push_str("</D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat>");
    xml.push_str("</D:response>");
    xml.push_str(entries);
    xml.push_str("</D:multistatus>");
    xml
}

/// One `<D:response>` per record, in the order given.
pub fn render_entries(records: &[ObjectRecord]) -> String {
    let mut xml = String::new();
    for record in records {
        push_record(&mut xml, record);
    }
    xml
}

fn push_record(xml: &mut String, record: &ObjectRecord) {
    xml.push_str("<D:response>");
    xml.push_str(&format!(
        "<D:href>{}</D:href>",
        xml_escape(&object_href(&record.key))
    ));
    xml.push_str("<D:propstat><D:prop>");
    xml.push_str("<D:resourcetype/>");
    xml.push_str(&format!(
        "<D:displayname>{}</D:displayname>",
        xml_escape(record.file_name())
    ));
    xml.push_str(&format!(
        "<D:getcontentlength>{}</D:getcontentlength>",
        record.size_bytes.max(0)
    ));
    xml.push_str(&format!(
        "<D:getcontenttype>{}</D:getcontenttype>",
        xml_escape(&record.content_type)
    ));
    xml.push_str(&format!(
        "<D:getetag>\"{}\"</D:getetag>",
        xml_escape(&record.etag)
    ));
    xml.push_str(&format!(
        "<D:getlastmodified>{}</D:getlastmodified>",
        http_date(&record.last_modified)
    ));
    xml.push_str("</D:prop><D:status>HTTP/1.1 200 OK</D:status></D:propstat>");
    xml.push_str("</D:response>");
}

/// Absolute href of an object: each key segment percent-encoded.
pub fn object_href(key: &str) -> String {
    let encoded: Vec<_> = key.split('/').map(urlencoding::encode).collect();
    format!("/{}", encoded.join("/"))
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
