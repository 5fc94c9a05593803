//! Package-level XML: relationships, content types and the slide list.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::deck::DeckError;

pub const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_SLIDE_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const REL_SLIDE_MASTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn xml_err(part: &str, e: impl std::fmt::Display) -> DeckError {
    DeckError::Xml {
        part: part.to_string(),
        message: e.to_string(),
    }
}

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rel {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Rel {
    pub fn internal(id: impl Into<String>, rel_type: &str, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            external: false,
        }
    }

    pub fn is(&self, rel_type: &str) -> bool {
        self.rel_type == rel_type
    }
}

pub fn parse_rels(part: &str, xml: &[u8]) -> Result<Vec<Rel>, DeckError> {
    let mut rels = Vec::new();
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let (mut id, mut rel_type, mut target, mut external) = (None, None, None, false);
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| xml_err(part, e))?;
                        let value = attr.unescape_value().map_err(|e| xml_err(part, e))?.to_string();
                        match attr.key.as_ref() {
                            b"Id" => id = Some(value),
                            b"Type" => rel_type = Some(value),
                            b"Target" => target = Some(value),
                            b"TargetMode" => external = value == "External",
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(rel_type), Some(target)) = (id, rel_type, target) {
                        rels.push(Rel {
                            id,
                            rel_type,
                            target,
                            external,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

pub fn write_rels(rels: &[Rel]) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    xml.push_str(&format!(r#"<Relationships xmlns="{NS_RELS}">"#));
    for rel in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
            escape(&rel.id),
            escape(&rel.rel_type),
            escape(&rel.target),
            if rel.external { r#" TargetMode="External""# } else { "" }
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// The next free `rIdN` after every id in `rels`.
pub fn next_rel_id(rels: &[Rel]) -> usize {
    rels.iter()
        .filter_map(|r| r.id.strip_prefix("rId").and_then(|n| n.parse::<usize>().ok()))
        .max()
        .unwrap_or(0)
        + 1
}

/// `[Content_Types].xml` as defaults (by extension) and overrides (by part).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    pub defaults: Vec<(String, String)>,
    pub overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn parse(xml: &[u8]) -> Result<Self, DeckError> {
        const PART: &str = "[Content_Types].xml";
        let mut types = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let kind = e.local_name().as_ref().to_vec();
                    let (mut key, mut content_type) = (None, None);
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| xml_err(PART, e))?;
                        let value = attr.unescape_value().map_err(|e| xml_err(PART, e))?.to_string();
                        match attr.key.as_ref() {
                            b"Extension" | b"PartName" => key = Some(value),
                            b"ContentType" => content_type = Some(value),
                            _ => {}
                        }
                    }
                    if let (Some(k), Some(ct)) = (key, content_type) {
                        match kind.as_slice() {
                            b"Default" => types.defaults.push((k, ct)),
                            b"Override" => types.overrides.push((k, ct)),
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml_err(PART, e)),
                _ => {}
            }
            buf.clear();
        }
        Ok(types)
    }

    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        if !self.defaults.iter().any(|(e, _)| e.eq_ignore_ascii_case(extension)) {
            self.defaults.push((extension.to_string(), content_type.to_string()));
        }
    }

    /// Drop overrides for parts under any of `prefixes`.
    pub fn remove_parts_under(&mut self, prefixes: &[&str]) {
        self.overrides.retain(|(part, _)| !prefixes.iter().any(|p| part.starts_with(p)));
    }

    pub fn add_override(&mut self, part_name: impl Into<String>, content_type: &str) {
        self.overrides.push((part_name.into(), content_type.to_string()));
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(XML_DECL);
        xml.push_str(&format!(r#"<Types xmlns="{NS_TYPES}">"#));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(r#"<Default Extension="{}" ContentType="{}"/>"#, escape(ext), escape(ct)));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(r#"<Override PartName="{}" ContentType="{}"/>"#, escape(part), escape(ct)));
        }
        xml.push_str("</Types>");
        xml
    }
}

/// Replace (or insert) `<p:sldIdLst>` in `presentation.xml` and drop any
/// section list that names the template's own slides.
pub fn rewrite_slide_list(presentation: &str, entries: &[(u32, String)]) -> Result<String, DeckError> {
    let mut list = String::from("<p:sldIdLst>");
    for (id, rel_id) in entries {
        list.push_str(&format!(r#"<p:sldId id="{id}" r:id="{}"/>"#, escape(rel_id)));
    }
    list.push_str("</p:sldIdLst>");

    let xml = strip_element(presentation, "p14:sectionLst");
    if let Some((start, end)) = element_span(&xml, "p:sldIdLst") {
        return Ok(format!("{}{}{}", &xml[..start], list, &xml[end..]));
    }
    let anchor = xml
        .find("<p:sldSz")
        .or_else(|| xml.find("<p:notesSz"))
        .ok_or_else(|| xml_err("ppt/presentation.xml", "no <p:sldSz> or <p:notesSz> element"))?;
    Ok(format!("{}{}{}", &xml[..anchor], list, &xml[anchor..]))
}

/// Byte span of the first `<tag …/>` or `<tag …>…</tag>` in `xml`.
fn element_span(xml: &str, tag: &str) -> Option<(usize, usize)> {
    let open = format!("<{tag}");
    let mut from = 0;
    let start = loop {
        let at = from + xml[from..].find(&open)?;
        let next = xml[at + open.len()..].chars().next()?;
        if next == '>' || next == '/' || next.is_whitespace() {
            break at;
        }
        from = at + open.len();
    };
    let head_end = start + xml[start..].find('>')?;
    if xml[..head_end].ends_with('/') {
        return Some((start, head_end + 1));
    }
    let close = format!("</{tag}>");
    let end = head_end + xml[head_end..].find(&close)? + close.len();
    Some((start, end))
}

fn strip_element(xml: &str, tag: &str) -> String {
    match element_span(xml, tag) {
        Some((start, end)) => format!("{}{}", &xml[..start], &xml[end..]),
        None => xml.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rels_parse_and_write_back() {
        let xml = br#"<?xml version="1.0"?><Relationships xmlns="x">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
            <Relationship Id="rId7" Type="t" Target="https://example.com" TargetMode="External"/>
        </Relationships>"#;
        let rels = parse_rels("test", xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels[0].is(REL_SLIDE_MASTER));
        assert!(rels[1].external);
        assert_eq!(next_rel_id(&rels), 8);

        let again = parse_rels("test", write_rels(&rels).as_bytes()).unwrap();
        assert_eq!(again, rels);
    }

    #[test]
    fn content_types_filter_and_extend() {
        let xml = br#"<Types xmlns="x"><Default Extension="xml" ContentType="application/xml"/>
            <Override PartName="/ppt/slides/slide1.xml" ContentType="s"/>
            <Override PartName="/ppt/presentation.xml" ContentType="p"/></Types>"#;
        let mut types = ContentTypes::parse(xml).unwrap();
        types.remove_parts_under(&["/ppt/slides/"]);
        types.ensure_default("png", "image/png");
        types.ensure_default("PNG", "image/png");
        types.add_override("/ppt/slides/slide1.xml", CT_SLIDE);

        assert_eq!(types.defaults.len(), 2);
        assert_eq!(types.overrides.len(), 2);
        assert_eq!(types.overrides[0].0, "/ppt/presentation.xml");
        assert!(types.to_xml().contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
    }

    #[test]
    fn slide_list_is_replaced_or_inserted() {
        let with_list = r#"<p:presentation><p:sldMasterIdLst/><p:sldIdLst><p:sldId id="256" r:id="rId5"/></p:sldIdLst><p:sldSz cx="1" cy="1"/></p:presentation>"#;
        let out = rewrite_slide_list(with_list, &[(256, "rId9".into()), (257, "rId10".into())]).unwrap();
        assert!(out.contains(r#"<p:sldIdLst><p:sldId id="256" r:id="rId9"/><p:sldId id="257" r:id="rId10"/></p:sldIdLst><p:sldSz"#));
        assert!(!out.contains("rId5"));

        let without = r#"<p:presentation><p:sldMasterIdLst/><p:sldSz cx="1" cy="1"/></p:presentation>"#;
        let out = rewrite_slide_list(without, &[(256, "rId2".into())]).unwrap();
        assert!(out.contains(r#"<p:sldMasterIdLst/><p:sldIdLst>"#));

        let self_closing = r#"<p:presentation><p:sldIdLst/><p:sldSz/></p:presentation>"#;
        let out = rewrite_slide_list(self_closing, &[]).unwrap();
        assert_eq!(out, r#"<p:presentation><p:sldIdLst></p:sldIdLst><p:sldSz/></p:presentation>"#);
    }

    #[test]
    fn element_span_ignores_longer_tag_names() {
        let xml = "<p:sldIdLstX/><p:sldIdLst/>";
        assert_eq!(element_span(xml, "p:sldIdLst"), Some((14, 27)));
    }

    #[test]
    fn escape_covers_markup() {
        assert_eq!(escape(r#"a & <b> "c""#), "a &amp; &lt;b&gt; &quot;c&quot;");
    }
}
