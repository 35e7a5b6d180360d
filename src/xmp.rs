//! Minimal XMP tag
//!
//! An [`XmpTag`] holds one XMP packet. It parses just enough of the packet to
//! validate it and to read or edit simple key/value properties.
//!
//! XMP Structure:
//! - XMP packets are XML-based RDF metadata
//! - Properties can be attributes on rdf:Description or child elements

use crate::error::{Error, Result};
use quick_xml::{
    events::{BytesStart, Event},
    name::QName,
    Reader, Writer,
};
use std::io::Cursor;

const RDF_DESCRIPTION: &[u8] = b"rdf:Description";

/// Packet written for a freshly created tag
const EMPTY_PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""/>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

/// An XMP metadata packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpTag {
    packet: String,
}

impl Default for XmpTag {
    fn default() -> Self {
        Self::new()
    }
}

impl XmpTag {
    /// A packet with a single empty `rdf:Description`
    pub fn new() -> Self {
        Self {
            packet: EMPTY_PACKET.to_string(),
        }
    }

    /// Parse a packet, rejecting malformed XML
    pub fn decode(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        while !matches!(reader.read_event()?, Event::Eof) {}
        Ok(Self {
            packet: text.to_string(),
        })
    }

    /// Parse a packet from raw segment bytes
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::InvalidXmp(format!("packet is not UTF-8: {}", e)))?;
        Self::decode(text)
    }

    /// The packet text as it will be written
    pub fn encode(&self) -> &str {
        &self.packet
    }

    /// Extract a value using a key.
    ///
    /// Searches for the key as an attribute on `rdf:Description` or as a child element.
    ///
    /// # Example
    ///
    /// ```
    /// use jpeg_tag_io::XmpTag;
    ///
    /// let xmp = XmpTag::decode(r#"<rdf:Description dc:title="My Photo" />"#).unwrap();
    /// assert_eq!(xmp.get("dc:title"), Some("My Photo".to_string()));
    /// ```
    pub fn get(&self, key: &str) -> Option<String> {
        let mut reader = Reader::from_str(&self.packet);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.name() == QName(RDF_DESCRIPTION) {
                        for attr in e.attributes().flatten() {
                            if attr.key == QName(key.as_bytes()) {
                                if let Ok(s) = String::from_utf8(attr.value.to_vec()) {
                                    return Some(s);
                                }
                            }
                        }
                    } else if e.name() == QName(key.as_bytes()) {
                        if let Ok(s) = reader.read_text(e.name()) {
                            return Some(s.to_string());
                        }
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }
        None
    }

    /// Add or replace a key/value pair.
    ///
    /// If the key exists as an attribute on `rdf:Description`, it is replaced.
    /// Otherwise, it is added as a new attribute on the first description.
    /// A child element with the same name is dropped, so the property is
    /// never stored twice.
    ///
    /// # Example
    ///
    /// ```
    /// use jpeg_tag_io::XmpTag;
    ///
    /// let mut xmp = XmpTag::new();
    /// xmp.set("dc:title", "My Photo").unwrap();
    /// assert!(xmp.encode().contains(r#"dc:title="My Photo""#));
    /// ```
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let stripped = strip_elements(&self.packet, key)?;
        let mut added = false;
        self.packet = rewrite_descriptions(&stripped, |elem, attr| {
            let matched = attr.as_ref().is_some_and(|a| a.key == QName(key.as_bytes()));
            match attr {
                Some(attr) if !matched => elem.push_attribute(attr),
                Some(_) if !added => {
                    elem.push_attribute((key, value));
                    added = true;
                }
                Some(_) => {}
                None if !added => {
                    elem.push_attribute((key, value));
                    added = true;
                }
                None => {}
            }
        })?;
        Ok(())
    }

    /// Remove a key from every `rdf:Description`, as attribute or child element.
    ///
    /// # Example
    ///
    /// ```
    /// use jpeg_tag_io::XmpTag;
    ///
    /// let mut xmp = XmpTag::decode(r#"<rdf:Description dc:title="My Photo" dc:creator="John" />"#).unwrap();
    /// xmp.remove("dc:title").unwrap();
    /// assert_eq!(xmp.get("dc:title"), None);
    /// assert_eq!(xmp.get("dc:creator"), Some("John".to_string()));
    /// ```
    pub fn remove(&mut self, key: &str) -> Result<()> {
        let stripped = strip_elements(&self.packet, key)?;
        self.packet = rewrite_descriptions(&stripped, |elem, attr| {
            if let Some(attr) = attr {
                if attr.key != QName(key.as_bytes()) {
                    elem.push_attribute(attr);
                }
            }
        })?;
        Ok(())
    }
}

/// Copy a packet without any element named `key` (and its children)
fn strip_elements(xmp: &str, key: &str) -> Result<String> {
    let mut reader = Reader::from_str(xmp);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = false;

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let name = QName(key.as_bytes());

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name() == name => {
                reader.read_to_end(name)?;
            }
            Event::Empty(e) if e.name() == name => {}
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(|e| Error::InvalidXmp(e.to_string()))
}

/// Copy a packet, rebuilding each `rdf:Description` start tag through `edit`
///
/// `edit` is called once per existing attribute and then once with `None`
/// so it can append new attributes.
fn rewrite_descriptions<F>(xmp: &str, mut edit: F) -> Result<String>
where
    F: FnMut(&mut BytesStart<'static>, Option<quick_xml::events::attributes::Attribute<'_>>),
{
    let mut reader = Reader::from_str(xmp);
    reader.config_mut().trim_text(false);
    reader.config_mut().expand_empty_elements = false;

    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) if e.name() == QName(RDF_DESCRIPTION) => {
                let mut elem = BytesStart::new("rdf:Description");

                for attr_result in e.attributes() {
                    let attr = attr_result
                        .map_err(|e| Error::InvalidXmp(format!("XMP attribute error: {}", e)))?;
                    edit(&mut elem, Some(attr));
                }
                edit(&mut elem, None);

                if matches!(event, Event::Empty(_)) {
                    writer.write_event(Event::Empty(elem))?;
                } else {
                    writer.write_event(Event::Start(elem))?;
                }
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(|e| Error::InvalidXmp(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_XMP: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
    <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
        <rdf:Description rdf:about=""
            xmlns:dc="http://purl.org/dc/elements/1.1/"
            xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/"
            dc:format="image/jpeg"
            xmpMM:DocumentID="xmp.did:1234">
            <dc:rights>All rights reserved</dc:rights>
        </rdf:Description>
    </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    fn tag() -> XmpTag {
        XmpTag::decode(TEST_XMP).unwrap()
    }

    #[test]
    fn test_get() {
        let xmp = tag();
        assert_eq!(xmp.get("dc:format"), Some("image/jpeg".to_string()));
        assert_eq!(xmp.get("xmpMM:DocumentID"), Some("xmp.did:1234".to_string()));
        assert_eq!(xmp.get("dc:rights"), Some("All rights reserved".to_string()));
        assert_eq!(xmp.get("nonexistent"), None);
    }

    #[test]
    fn test_set_adds_key() {
        let mut xmp = tag();
        xmp.set("dc:title", "My Photo").unwrap();
        assert_eq!(xmp.get("dc:title"), Some("My Photo".to_string()));
        // Original keys should still be there
        assert_eq!(xmp.get("dc:format"), Some("image/jpeg".to_string()));
        assert_eq!(xmp.get("dc:rights"), Some("All rights reserved".to_string()));
    }

    #[test]
    fn test_set_replaces_key() {
        let mut xmp = tag();
        xmp.set("dc:format", "image/png").unwrap();
        assert_eq!(xmp.get("dc:format"), Some("image/png".to_string()));
        assert_eq!(xmp.encode().matches("dc:format=").count(), 1);
    }

    #[test]
    fn test_set_replaces_child_element() {
        let mut xmp = tag();
        xmp.set("dc:rights", "CC BY 4.0").unwrap();

        assert_eq!(xmp.get("dc:rights"), Some("CC BY 4.0".to_string()));
        assert_eq!(xmp.encode().matches("dc:rights").count(), 1);
        assert!(!xmp.encode().contains("All rights reserved"));
        assert!(XmpTag::decode(xmp.encode()).is_ok());
    }

    #[test]
    fn test_remove_child_element() {
        let mut xmp = tag();
        xmp.remove("dc:rights").unwrap();
        assert_eq!(xmp.get("dc:rights"), None);
        assert_eq!(xmp.get("dc:format"), Some("image/jpeg".to_string()));
    }

    #[test]
    fn test_remove() {
        let mut xmp = tag();
        xmp.remove("dc:format").unwrap();
        assert_eq!(xmp.get("dc:format"), None);
        assert_eq!(xmp.get("xmpMM:DocumentID"), Some("xmp.did:1234".to_string()));

        // Removing a missing key leaves the packet usable
        xmp.remove("nonexistent").unwrap();
        assert_eq!(xmp.get("xmpMM:DocumentID"), Some("xmp.did:1234".to_string()));
    }

    #[test]
    fn test_new_packet_is_editable() {
        let mut xmp = XmpTag::new();
        assert_eq!(XmpTag::decode(xmp.encode()).unwrap(), xmp);
        xmp.set("xmp:Rating", "5").unwrap();
        assert_eq!(xmp.get("xmp:Rating"), Some("5".to_string()));
    }

    #[test]
    fn test_decode_rejects_malformed_packets() {
        assert!(XmpTag::decode("<rdf:Description></rdf:Other>").is_err());
        assert!(matches!(
            XmpTag::decode_bytes(&[0x3C, 0xFF, 0xFE]),
            Err(Error::InvalidXmp(_))
        ));
    }
}
