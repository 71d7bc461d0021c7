use super::{FeedDocument, FeedEntry, FeedError};
use crate::util::strip_control_chars;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const GENERATOR: &str = "ytdlpod";

/// Serialize `doc` as an Atom 1.0 document with the iTunes podcast namespace.
///
/// The feed's `updated` is the newest entry's publish time, or
/// `generated_at` when there are no entries. Enclosures carry `length="0"`
/// because sizes are only known once the audio has been produced.
pub fn render_atom(doc: &FeedDocument, generated_at: DateTime<Utc>) -> Result<String, FeedError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut feed = BytesStart::new("feed");
    feed.push_attribute(("xmlns", ATOM_NS));
    feed.push_attribute(("xmlns:itunes", ITUNES_NS));
    write(&mut writer, Event::Start(feed))?;

    let updated = doc
        .entries
        .iter()
        .map(|e| e.published)
        .max()
        .unwrap_or(generated_at);

    text_element(&mut writer, "id", &doc.id)?;
    text_element(&mut writer, "title", &doc.title)?;
    text_element(&mut writer, "updated", &timestamp(updated))?;
    link(&mut writer, "self", &doc.self_link, Some("application/atom+xml"))?;
    link(&mut writer, "alternate", &doc.alternate_link, None)?;
    text_element(&mut writer, "subtitle", &doc.description)?;
    text_element(&mut writer, "itunes:summary", &doc.description)?;
    text_element(&mut writer, "generator", GENERATOR)?;

    for entry in &doc.entries {
        write_entry(&mut writer, entry)?;
    }

    write(&mut writer, Event::End(BytesEnd::new("feed")))?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| FeedError::Render(e.to_string()))
}

fn write_entry<W: Write>(writer: &mut Writer<W>, entry: &FeedEntry) -> Result<(), FeedError> {
    write(writer, Event::Start(BytesStart::new("entry")))?;

    let published = timestamp(entry.published);
    text_element(writer, "id", &entry.id)?;
    text_element(writer, "title", &entry.title)?;
    text_element(writer, "updated", &published)?;
    text_element(writer, "published", &published)?;
    text_element(writer, "summary", &entry.description)?;

    let mut enclosure = BytesStart::new("link");
    enclosure.push_attribute(("rel", "enclosure"));
    enclosure.push_attribute(("href", entry.enclosure_url.as_str()));
    enclosure.push_attribute(("type", entry.media_type));
    enclosure.push_attribute(("length", "0"));
    write(writer, Event::Empty(enclosure))?;

    if let Some(secs) = entry.duration_secs {
        text_element(writer, "itunes:duration", &clock_duration(secs))?;
    }

    write(writer, Event::End(BytesEnd::new("entry")))
}

fn link<W: Write>(
    writer: &mut Writer<W>,
    rel: &str,
    href: &str,
    media_type: Option<&str>,
) -> Result<(), FeedError> {
    let href = strip_control_chars(href);
    let mut link = BytesStart::new("link");
    link.push_attribute(("rel", rel));
    link.push_attribute(("href", href.as_ref()));
    if let Some(media_type) = media_type {
        link.push_attribute(("type", media_type));
    }
    write(writer, Event::Empty(link))
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), FeedError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(&strip_control_chars(text))))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), FeedError> {
    writer
        .write_event(event)
        .map_err(|e| FeedError::Render(e.to_string()))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `HH:MM:SS`, the form podcast clients parse most reliably.
fn clock_duration(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
