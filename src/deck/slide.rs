//! Slide drafts and their `p:sld` XML.

use crate::deck::template::{Layout, Placeholder};
use crate::deck::xml::escape;

pub const EMU_PER_INCH: i64 = 914_400;

pub fn inches(v: f64) -> i64 {
    (v * EMU_PER_INCH as f64).round() as i64
}

/// Which layout placeholder a text fill targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderRef {
    Title,
    Idx(u32),
}

impl PlaceholderRef {
    fn matches(self, ph: &Placeholder) -> bool {
        match self {
            PlaceholderRef::Title => ph.is_title(),
            PlaceholderRef::Idx(i) => !ph.is_title() && ph.idx == i,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFill {
    pub text: String,
    /// Applied to every paragraph.
    pub size_pt: f64,
}

/// A placed image, in EMU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    /// Index into the deck's media list.
    pub media: usize,
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    pub descr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlideDraft {
    pub layout: usize,
    fills: Vec<(PlaceholderRef, TextFill)>,
    pictures: Vec<Picture>,
}

impl SlideDraft {
    pub fn new(layout: usize) -> Self {
        Self {
            layout,
            fills: Vec::new(),
            pictures: Vec::new(),
        }
    }

    /// Set (or replace) the text of one placeholder.
    pub fn set_text(&mut self, target: PlaceholderRef, fill: TextFill) {
        match self.fills.iter_mut().find(|(t, _)| *t == target) {
            Some((_, existing)) => *existing = fill,
            None => self.fills.push((target, fill)),
        }
    }

    pub fn text(&self, target: PlaceholderRef) -> Option<&TextFill> {
        self.fills.iter().find(|(t, _)| *t == target).map(|(_, f)| f)
    }

    pub fn add_picture(&mut self, picture: Picture) {
        self.pictures.push(picture);
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    /// Slide XML. Every content placeholder of the layout is emitted (filled
    /// or empty); `image_rel` maps a picture's media index to its `r:embed` id.
    pub fn to_xml(&self, layout: &Layout, image_rel: impl Fn(usize) -> String) -> String {
        let mut xml = String::with_capacity(2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(concat!(
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
            r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#
        ));
        xml.push_str("<p:cSld><p:spTree>");
        xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
        xml.push_str(concat!(
            "<p:grpSpPr><a:xfrm>",
            r#"<a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/>"#,
            "</a:xfrm></p:grpSpPr>"
        ));

        let mut shape_id = 2u32;
        for ph in &layout.placeholders {
            let fill = self
                .fills
                .iter()
                .find(|(target, _)| target.matches(ph))
                .map(|(_, f)| f);
            write_placeholder(&mut xml, shape_id, ph, fill);
            shape_id += 1;
        }
        for pic in &self.pictures {
            write_picture(&mut xml, shape_id, pic, &image_rel(pic.media));
            shape_id += 1;
        }

        xml.push_str("</p:spTree></p:cSld>");
        xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
        xml.push_str("</p:sld>");
        xml
    }
}

fn write_placeholder(xml: &mut String, id: u32, ph: &Placeholder, fill: Option<&TextFill>) {
    let name = if ph.name.is_empty() { format!("Placeholder {id}") } else { ph.name.clone() };
    xml.push_str("<p:sp><p:nvSpPr>");
    xml.push_str(&format!(r#"<p:cNvPr id="{id}" name="{}"/>"#, escape(&name)));
    xml.push_str(r#"<p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>"#);
    xml.push_str("<p:nvPr><p:ph");
    if ph.kind != "body" {
        xml.push_str(&format!(r#" type="{}""#, escape(&ph.kind)));
    }
    if ph.idx != 0 {
        xml.push_str(&format!(r#" idx="{}""#, ph.idx));
    }
    xml.push_str("/></p:nvPr></p:nvSpPr>");
    xml.push_str("<p:spPr/>");

    xml.push_str("<p:txBody><a:bodyPr/><a:lstStyle/>");
    match fill {
        Some(fill) => {
            let sz = (fill.size_pt * 100.0).round() as u32;
            for line in fill.text.split('\n') {
                xml.push_str("<a:p><a:r>");
                xml.push_str(&format!(r#"<a:rPr lang="en-US" sz="{sz}" dirty="0"/>"#));
                xml.push_str(&format!("<a:t>{}</a:t>", escape(line.trim_end_matches('\r'))));
                xml.push_str("</a:r></a:p>");
            }
        }
        None => xml.push_str("<a:p/>"),
    }
    xml.push_str("</p:txBody></p:sp>");
}

fn write_picture(xml: &mut String, id: u32, pic: &Picture, rel_id: &str) {
    xml.push_str("<p:pic><p:nvPicPr>");
    xml.push_str(&format!(
        r#"<p:cNvPr id="{id}" name="Picture {id}" descr="{}"/>"#,
        escape(&pic.descr)
    ));
    xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/>"#);
    xml.push_str("</p:nvPicPr>");

    xml.push_str("<p:blipFill>");
    xml.push_str(&format!(r#"<a:blip r:embed="{}"/>"#, escape(rel_id)));
    xml.push_str("<a:stretch><a:fillRect/></a:stretch></p:blipFill>");

    xml.push_str("<p:spPr><a:xfrm>");
    xml.push_str(&format!(r#"<a:off x="{}" y="{}"/>"#, pic.x, pic.y));
    xml.push_str(&format!(r#"<a:ext cx="{}" cy="{}"/>"#, pic.cx, pic.cy));
    xml.push_str("</a:xfrm>");
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
    xml.push_str("</p:spPr></p:pic>");
}
