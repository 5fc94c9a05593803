//! Reading a `.pptx` template: package entries, the first slide master and
//! its layouts with their placeholders.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::deck::DeckError;
use crate::deck::xml::{REL_SLIDE_LAYOUT, REL_SLIDE_MASTER, Rel, parse_rels, xml_err};

pub const PRESENTATION: &str = "ppt/presentation.xml";

/// A layout placeholder (`<p:ph>`), with the attribute defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// `type` attribute; `body` when absent.
    pub kind: String,
    /// `idx` attribute; `0` when absent.
    pub idx: u32,
    pub name: String,
}

impl Placeholder {
    pub fn is_title(&self) -> bool {
        self.kind == "title" || self.kind == "ctrTitle"
    }

    /// Date, footer and slide-number placeholders are not copied onto slides.
    fn is_chrome(&self) -> bool {
        matches!(self.kind.as_str(), "dt" | "ftr" | "sldNum")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Part name inside the package, e.g. `ppt/slideLayouts/slideLayout2.xml`.
    pub part: String,
    pub name: String,
    pub placeholders: Vec<Placeholder>,
}

impl Layout {
    pub fn title(&self) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| p.is_title())
    }

    pub fn by_idx(&self, idx: u32) -> Option<&Placeholder> {
        self.placeholders.iter().find(|p| !p.is_title() && p.idx == idx)
    }
}

/// Every entry of the template package plus its resolved layouts.
#[derive(Debug, Clone)]
pub struct Template {
    entries: Vec<(String, Vec<u8>)>,
    layouts: Vec<Layout>,
}

impl Template {
    pub fn open(path: &Path) -> Result<Self, DeckError> {
        let file = File::open(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes).map_err(|source| DeckError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            entries.push((entry.name().to_string(), bytes));
        }

        let mut template = Self {
            entries,
            layouts: Vec::new(),
        };
        template.layouts = template.resolve_layouts()?;
        log::debug!(
            "template {}: {} entries, {} layouts",
            path.display(),
            template.entries.len(),
            template.layouts.len()
        );
        Ok(template)
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    fn require(&self, name: &str) -> Result<&[u8], DeckError> {
        self.part(name)
            .ok_or_else(|| DeckError::Package(format!("missing part `{name}`")))
    }

    pub fn rels_of(&self, part: &str) -> Result<Vec<Rel>, DeckError> {
        let rels_part = rels_path(part);
        match self.part(&rels_part) {
            Some(xml) => parse_rels(&rels_part, xml),
            None => Ok(Vec::new()),
        }
    }

    /// Layouts of the first slide master, in `p:sldLayoutIdLst` order.
    fn resolve_layouts(&self) -> Result<Vec<Layout>, DeckError> {
        let pres_rels = self.rels_of(PRESENTATION)?;
        let master_ids = relationship_ids(PRESENTATION, self.require(PRESENTATION)?, b"sldMasterId")?;
        let master_rel = master_ids
            .first()
            .and_then(|id| pres_rels.iter().find(|r| &r.id == id))
            .or_else(|| pres_rels.iter().find(|r| r.is(REL_SLIDE_MASTER)))
            .ok_or_else(|| DeckError::Package("presentation has no slide master".to_string()))?;
        let master = resolve_target(PRESENTATION, &master_rel.target);

        let master_rels = self.rels_of(&master)?;
        let layout_ids = relationship_ids(&master, self.require(&master)?, b"sldLayoutId")?;

        let mut layouts = Vec::with_capacity(layout_ids.len());
        for id in &layout_ids {
            let Some(rel) = master_rels.iter().find(|r| &r.id == id && r.is(REL_SLIDE_LAYOUT)) else {
                return Err(DeckError::Package(format!("{master}: layout relationship `{id}` is missing")));
            };
            let part = resolve_target(&master, &rel.target);
            let (name, placeholders) = parse_layout(&part, self.require(&part)?)?;
            layouts.push(Layout {
                part,
                name,
                placeholders,
            });
        }
        Ok(layouts)
    }
}

/// `dir/_rels/file.rels` for `dir/file`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns it.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Relative target from a part in `from_dir` to `part`, e.g. `../media/image1.png`.
pub fn relative_target(from_dir: &str, part: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = part.split('/').collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut out: Vec<&str> = vec![".."; from.len() - common];
    out.extend(&to[common..]);
    out.join("/")
}

/// The relationship id (`r:id`) of every `element` (local name), in
/// document order. The unprefixed numeric `id` on the same element is skipped.
fn relationship_ids(part: &str, xml: &[u8], element: &[u8]) -> Result<Vec<String>, DeckError> {
    let mut values = Vec::new();
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.local_name().as_ref() == element => {
                if let Some(v) = find_attr(part, e, b"id", true)? {
                    values.push(v);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(values)
}

/// Unprefixed attribute `name`.
fn local_attr(part: &str, e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, DeckError> {
    find_attr(part, e, name, false)
}

fn find_attr(part: &str, e: &BytesStart<'_>, name: &[u8], prefixed: bool) -> Result<Option<String>, DeckError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_err(part, err))?;
        if attr.key.local_name().as_ref() == name && attr.key.prefix().is_some() == prefixed {
            return Ok(Some(attr.unescape_value().map_err(|err| xml_err(part, err))?.to_string()));
        }
    }
    Ok(None)
}

/// Layout display name (`p:cSld/@name`) and its content placeholders.
fn parse_layout(part: &str, xml: &[u8]) -> Result<(String, Vec<Placeholder>), DeckError> {
    let mut name = String::new();
    let mut placeholders = Vec::new();
    let mut shape_name = String::new();
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"cSld" => name = local_attr(part, e, b"name")?.unwrap_or_default(),
                b"cNvPr" => shape_name = local_attr(part, e, b"name")?.unwrap_or_default(),
                b"ph" => {
                    let kind = local_attr(part, e, b"type")?.unwrap_or_else(|| "body".to_string());
                    let idx = match local_attr(part, e, b"idx")? {
                        Some(v) => v
                            .parse()
                            .map_err(|_| xml_err(part, format!("placeholder idx `{v}` is not a number")))?,
                        None => 0,
                    };
                    let ph = Placeholder {
                        kind,
                        idx,
                        name: shape_name.clone(),
                    };
                    if !ph.is_chrome() {
                        placeholders.push(ph);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_err(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok((name, placeholders))
}
