//! Slide composer.
//!
//! A `Deck` opens a `.pptx` template, collects typed slides built on the
//! template's layouts and writes a new package once, on `save`. Slides that
//! already exist in the template are not carried over.
//!
//! - layout lookup by name (`layout_index`)
//! - typed slide handles (`SlideHandle<'_, K>`)
//! - package rewrite (`Deck::save`)

use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::{SimpleFileOptions, ZipWriter};

pub mod slide;
pub mod template;
pub mod xml;

use slide::{EMU_PER_INCH, Picture, PlaceholderRef, SlideDraft, TextFill, inches};
use template::{PRESENTATION, Template, relative_target, rels_path};
use xml::{
    CT_SLIDE, ContentTypes, REL_IMAGE, REL_SLIDE, REL_SLIDE_LAYOUT, Rel, next_rel_id, rewrite_slide_list, write_rels,
    xml_err,
};

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error("Invalid presentation package: {0}")]
    Package(String),
    #[error("Malformed XML in {part}: {message}")]
    Xml { part: String, message: String },
    #[error("Unknown slide layout `{0}`. Expected one of: title, blank, text, two_columns.")]
    UnknownLayout(String),
    #[error("Layout `{name}` maps to index {index}, but the template only has {available} layouts.")]
    MissingLayout {
        name: String,
        index: usize,
        available: usize,
    },
    #[error("Layout `{layout}` has no {placeholder} placeholder.")]
    MissingPlaceholder { layout: String, placeholder: String },
    #[error("A data-table slide holds at most {0} sections.")]
    SectionLimit(usize),
    #[error("A {kind} slide holds at most {max} images.")]
    ImageLimit { kind: &'static str, max: usize },
    #[error("Unsupported image type '{}'; expected PNG or JPEG.", path.display())]
    UnsupportedImage { path: PathBuf },
    #[error("Failed to read image '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Refusing to write a presentation with no slides.")]
    NoSlides,
}

/// Template layout index for a layout name.
pub fn layout_index(name: &str) -> Result<usize, DeckError> {
    match name {
        "title" => Ok(0),
        "blank" | "text" => Ok(1),
        "two_columns" => Ok(4),
        other => Err(DeckError::UnknownLayout(other.to_string())),
    }
}

pub const TITLE_PT: f64 = 30.0;
pub const SUBTITLE_PT: f64 = 20.0;
pub const BODY_PT: f64 = 14.0;
/// Top-left of chart and table images, in inches.
pub const IMAGE_ORIGIN: (f64, f64) = (1.5, 2.0);
/// Default logo positions on the title slide, in inches.
pub const LOGO_POSITIONS: [(f64, f64); 2] = [(10.0, 2.0), (8.0, 2.0)];
/// Extra offset for the box-plot chart slide, in inches.
pub const BOXPLOT_OFFSET: (f64, f64) = (1.25, 0.25);
pub const MAX_TABLE_SECTIONS: usize = 2;

mod sealed {
    pub trait Sealed {}
}

/// Marker for the kind of slide a handle builds.
pub trait SlideKind: sealed::Sealed {
    const NAME: &'static str;
}

macro_rules! slide_kind {
    ($($ty:ident => $name:literal),* $(,)?) => {
        $(
            #[derive(Debug)]
            pub enum $ty {}
            impl sealed::Sealed for $ty {}
            impl SlideKind for $ty {
                const NAME: &'static str = $name;
            }
        )*
    };
}

slide_kind! {
    TitleSlide => "title",
    SummarySlide => "summary",
    ChartSlide => "chart",
    DataTableSlide => "data-table",
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckState {
    Empty,
    Populated,
}

#[derive(Debug, Clone)]
struct Media {
    part: String,
    extension: &'static str,
    bytes: Vec<u8>,
}

/// One half of a data-table slide.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSection {
    pub subtitle: String,
    /// Layout placeholder `idx` that receives the subtitle.
    pub placeholder: u32,
    pub image: PathBuf,
    /// Offset from `IMAGE_ORIGIN`, in inches.
    pub offset: (f64, f64),
    /// Subtracted from the placed image width, in EMU.
    pub width_trim_emu: i64,
}

pub struct Deck {
    out_path: PathBuf,
    template: Template,
    image_dpi: u32,
    slides: Vec<SlideDraft>,
    media: Vec<Media>,
}

impl Deck {
    pub fn open(out_path: impl Into<PathBuf>, template_path: &Path) -> Result<Self, DeckError> {
        Ok(Self {
            out_path: out_path.into(),
            template: Template::open(template_path)?,
            image_dpi: 100,
            slides: Vec::new(),
            media: Vec::new(),
        })
    }

    /// Resolution used to size placed images. Default 100.
    pub fn with_image_dpi(mut self, dpi: u32) -> Self {
        self.image_dpi = dpi.max(1);
        self
    }

    pub fn state(&self) -> DeckState {
        if self.slides.is_empty() { DeckState::Empty } else { DeckState::Populated }
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Append a slide on the named layout.
    pub fn create_slide<K: SlideKind>(&mut self, layout: &str) -> Result<SlideHandle<'_, K>, DeckError> {
        let index = layout_index(layout)?;
        let available = self.template.layouts().len();
        if index >= available {
            return Err(DeckError::MissingLayout {
                name: layout.to_string(),
                index,
                available,
            });
        }
        self.slides.push(SlideDraft::new(index));
        log::debug!("slide {}: {} on layout `{layout}`", self.slides.len(), K::NAME);
        Ok(SlideHandle {
            slide: self.slides.len() - 1,
            deck: self,
            _kind: PhantomData,
        })
    }

    fn add_media(&mut self, bytes: Vec<u8>, extension: &'static str) -> usize {
        let mut n = self.media.len() + 1;
        let part = loop {
            let candidate = format!("ppt/media/report_image{n}.{extension}");
            if self.template.part(&candidate).is_none() && self.media.iter().all(|m| m.part != candidate) {
                break candidate;
            }
            n += 1;
        };
        self.media.push(Media { part, extension, bytes });
        self.media.len() - 1
    }

    /// Write the package to the output path. Consumes the deck.
    pub fn save(self) -> Result<PathBuf, DeckError> {
        if self.slides.is_empty() {
            return Err(DeckError::NoSlides);
        }

        let pres_rels_part = rels_path(PRESENTATION);
        let mut pres_rels: Vec<Rel> = self
            .template
            .rels_of(PRESENTATION)?
            .into_iter()
            .filter(|r| !r.is(REL_SLIDE))
            .collect();
        let mut next_id = next_rel_id(&pres_rels);

        let types_xml = self
            .template
            .part("[Content_Types].xml")
            .ok_or_else(|| DeckError::Package("missing [Content_Types].xml".to_string()))?;
        let mut types = ContentTypes::parse(types_xml)?;
        types.remove_parts_under(&["/ppt/slides/", "/ppt/notesSlides/"]);
        for m in &self.media {
            let ct = if m.extension == "png" { "image/png" } else { "image/jpeg" };
            types.ensure_default(m.extension, ct);
        }

        let mut slide_list = Vec::with_capacity(self.slides.len());
        let mut new_parts: Vec<(String, Vec<u8>)> = Vec::new();
        for (i, draft) in self.slides.iter().enumerate() {
            let part = format!("ppt/slides/slide{}.xml", i + 1);
            let layout = &self.template.layouts()[draft.layout];

            let mut rels = vec![Rel::internal(
                "rId1",
                REL_SLIDE_LAYOUT,
                relative_target("ppt/slides", &layout.part),
            )];
            let mut embeds: Vec<(usize, String)> = Vec::new();
            for pic in draft.pictures() {
                if embeds.iter().any(|(m, _)| *m == pic.media) {
                    continue;
                }
                let id = format!("rId{}", rels.len() + 1);
                rels.push(Rel::internal(
                    id.clone(),
                    REL_IMAGE,
                    relative_target("ppt/slides", &self.media[pic.media].part),
                ));
                embeds.push((pic.media, id));
            }

            let xml = draft.to_xml(layout, |media| {
                embeds
                    .iter()
                    .find(|(m, _)| *m == media)
                    .map(|(_, id)| id.clone())
                    .unwrap_or_default()
            });
            new_parts.push((rels_path(&part), write_rels(&rels).into_bytes()));
            new_parts.push((part.clone(), xml.into_bytes()));
            types.add_override(format!("/{part}"), CT_SLIDE);

            let rel_id = format!("rId{next_id}");
            next_id += 1;
            pres_rels.push(Rel::internal(rel_id.clone(), REL_SLIDE, format!("slides/slide{}.xml", i + 1)));
            slide_list.push((256 + i as u32, rel_id));
        }

        let presentation = self
            .template
            .part(PRESENTATION)
            .ok_or_else(|| DeckError::Package(format!("missing `{PRESENTATION}`")))?;
        let presentation = std::str::from_utf8(presentation).map_err(|e| xml_err(PRESENTATION, e))?;
        let presentation = rewrite_slide_list(presentation, &slide_list)?;

        if let Some(parent) = self.out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DeckError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let io_err = |source| DeckError::Io {
            path: self.out_path.clone(),
            source,
        };
        let file = File::create(&self.out_path).map_err(io_err)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let types_xml = types.to_xml();
        let pres_rels_xml = write_rels(&pres_rels);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(types_xml.as_bytes()).map_err(io_err)?;
        for (name, bytes) in self.template.entries() {
            if name == "[Content_Types].xml" || name.starts_with("ppt/slides/") || name.starts_with("ppt/notesSlides/") {
                continue;
            }
            let bytes: &[u8] = if name == PRESENTATION {
                presentation.as_bytes()
            } else if *name == pres_rels_part {
                pres_rels_xml.as_bytes()
            } else {
                bytes
            };
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes).map_err(io_err)?;
        }
        let added = new_parts
            .iter()
            .map(|(name, bytes)| (name, bytes))
            .chain(self.media.iter().map(|m| (&m.part, &m.bytes)));
        for (name, bytes) in added {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes).map_err(io_err)?;
        }
        zip.finish()?;

        log::info!(
            "wrote {} ({} slides, {} images)",
            self.out_path.display(),
            self.slides.len(),
            self.media.len()
        );
        Ok(self.out_path)
    }
}

/// A slide being filled. Borrowing the deck mutably keeps one slide open at a
/// time; what the slide accepts depends on `K`.
pub struct SlideHandle<'d, K: SlideKind> {
    deck: &'d mut Deck,
    slide: usize,
    _kind: PhantomData<K>,
}

impl<K: SlideKind> SlideHandle<'_, K> {
    /// Zero-based position of this slide in the deck.
    pub fn index(&self) -> usize {
        self.slide
    }

    /// Title placeholder text at 30 pt.
    pub fn title(&mut self, text: &str) -> Result<&mut Self, DeckError> {
        self.fill(PlaceholderRef::Title, text, TITLE_PT)?;
        Ok(self)
    }

    fn draft(&self) -> &SlideDraft {
        &self.deck.slides[self.slide]
    }

    fn fill(&mut self, target: PlaceholderRef, text: &str, size_pt: f64) -> Result<(), DeckError> {
        let layout = &self.deck.template.layouts()[self.draft().layout];
        let found = match target {
            PlaceholderRef::Title => layout.title().is_some(),
            PlaceholderRef::Idx(i) => layout.by_idx(i).is_some(),
        };
        if !found {
            return Err(DeckError::MissingPlaceholder {
                layout: layout.name.clone(),
                placeholder: match target {
                    PlaceholderRef::Title => "title".to_string(),
                    PlaceholderRef::Idx(i) => format!("idx {i}"),
                },
            });
        }
        self.deck.slides[self.slide].set_text(
            target,
            TextFill {
                text: text.to_string(),
                size_pt,
            },
        );
        Ok(())
    }

    /// Place an image with its top-left at `(x, y)` inches, at natural size
    /// minus `width_trim_emu`.
    fn place_image(&mut self, path: &Path, at: (f64, f64), width_trim_emu: i64) -> Result<(), DeckError> {
        let extension = image_extension(path)?;
        let (w, h) = image::image_dimensions(path).map_err(|source| DeckError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let bytes = fs::read(path).map_err(|source| DeckError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let dpi = i64::from(self.deck.image_dpi);
        let cx = (i64::from(w) * EMU_PER_INCH / dpi - width_trim_emu).max(1);
        let cy = i64::from(h) * EMU_PER_INCH / dpi;
        let media = self.deck.add_media(bytes, extension);
        let descr = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.deck.slides[self.slide].add_picture(Picture {
            media,
            x: inches(at.0),
            y: inches(at.1),
            cx,
            cy,
            descr,
        });
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.draft().pictures().len()
    }
}

impl SlideHandle<'_, TitleSlide> {
    /// Subtitle at 20 pt in placeholder `idx` (usually 1).
    pub fn subtitle(&mut self, text: &str, placeholder: u32) -> Result<&mut Self, DeckError> {
        self.fill(PlaceholderRef::Idx(placeholder), text, SUBTITLE_PT)?;
        Ok(self)
    }

    /// Add one of up to two logos; `None` uses the default position for its slot.
    pub fn logo(&mut self, path: &Path, position: Option<(f64, f64)>) -> Result<&mut Self, DeckError> {
        let slot = self.image_count();
        if slot >= LOGO_POSITIONS.len() {
            return Err(DeckError::ImageLimit {
                kind: TitleSlide::NAME,
                max: LOGO_POSITIONS.len(),
            });
        }
        self.place_image(path, position.unwrap_or(LOGO_POSITIONS[slot]), 0)?;
        Ok(self)
    }
}

impl SlideHandle<'_, SummarySlide> {
    /// Body text at 14 pt in placeholder `idx` (usually 1).
    pub fn body(&mut self, text: &str, placeholder: u32) -> Result<&mut Self, DeckError> {
        self.fill(PlaceholderRef::Idx(placeholder), text, BODY_PT)?;
        Ok(self)
    }
}

impl SlideHandle<'_, ChartSlide> {
    /// The slide's single chart image, at `IMAGE_ORIGIN + offset` inches.
    pub fn chart(&mut self, path: &Path, offset: (f64, f64)) -> Result<&mut Self, DeckError> {
        if self.image_count() >= 1 {
            return Err(DeckError::ImageLimit {
                kind: ChartSlide::NAME,
                max: 1,
            });
        }
        let at = (IMAGE_ORIGIN.0 + offset.0, IMAGE_ORIGIN.1 + offset.1);
        self.place_image(path, at, 0)?;
        Ok(self)
    }
}

impl SlideHandle<'_, DataTableSlide> {
    /// Subtitle plus table image. At most two sections per slide.
    pub fn section(&mut self, section: &TableSection) -> Result<&mut Self, DeckError> {
        if self.image_count() >= MAX_TABLE_SECTIONS {
            return Err(DeckError::SectionLimit(MAX_TABLE_SECTIONS));
        }
        self.fill(PlaceholderRef::Idx(section.placeholder), &section.subtitle, SUBTITLE_PT)?;
        let at = (IMAGE_ORIGIN.0 + section.offset.0, IMAGE_ORIGIN.1 + section.offset.1);
        self.place_image(&section.image, at, section.width_trim_emu)?;
        Ok(self)
    }
}

fn image_extension(path: &Path) -> Result<&'static str, DeckError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("png"),
        "jpg" | "jpeg" => Ok("jpeg"),
        _ => Err(DeckError::UnsupportedImage {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use zip::write::{SimpleFileOptions, ZipWriter};

    const NS: &str = concat!(
        r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
        r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
    );
    const RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    const OFFICE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    fn placeholder(id: usize, name: &str, kind: Option<&str>, idx: Option<u32>) -> String {
        let kind = kind.map(|k| format!(r#" type="{k}""#)).unwrap_or_default();
        let idx = idx.map(|i| format!(r#" idx="{i}""#)).unwrap_or_default();
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr><p:ph{kind}{idx}/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#
        )
    }

    fn layout_xml(n: usize) -> String {
        let shapes = match n {
            1 => [
                placeholder(2, "Title 1", Some("ctrTitle"), None),
                placeholder(3, "Subtitle 2", Some("subTitle"), Some(1)),
                placeholder(4, "Date 3", Some("dt"), Some(10)),
            ]
            .concat(),
            5 => [
                placeholder(2, "Title 1", Some("title"), None),
                placeholder(3, "Text 2", Some("body"), Some(1)),
                placeholder(4, "Content 3", None, Some(2)),
                placeholder(5, "Text 4", Some("body"), Some(3)),
                placeholder(6, "Content 5", None, Some(4)),
            ]
            .concat(),
            _ => [
                placeholder(2, "Title 1", Some("title"), None),
                placeholder(3, "Content 2", None, Some(1)),
                placeholder(4, "Date 3", Some("dt"), Some(10)),
                placeholder(5, "Footer 4", Some("ftr"), Some(11)),
                placeholder(6, "Slide Number 5", Some("sldNum"), Some(12)),
            ]
            .concat(),
        };
        format!(r#"<p:sldLayout {NS}><p:cSld name="Layout {n}"><p:spTree>{shapes}</p:spTree></p:cSld></p:sldLayout>"#)
    }

    /// A minimal `.pptx` with one master, `layouts` layouts and one existing
    /// slide (with notes) whose text is `TEMPLATE SLIDE`.
    ///
    /// Master rel ids run backwards so layout order has to come from
    /// `p:sldLayoutIdLst`.
    pub fn write_template(dir: &Path, layouts: usize) -> PathBuf {
        let mut parts: Vec<(String, String)> = Vec::new();

        let mut types = String::from(concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
            r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#,
            r#"<Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
            r#"<Override PartName="/ppt/notesSlides/notesSlide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml"/>"#,
        ));
        for n in 1..=layouts {
            types.push_str(&format!(
                r#"<Override PartName="/ppt/slideLayouts/slideLayout{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#
            ));
        }
        types.push_str("</Types>");
        parts.push(("[Content_Types].xml".into(), types));

        parts.push((
            "_rels/.rels".into(),
            format!(
                r#"<Relationships xmlns="{RELS}"><Relationship Id="rId1" Type="{OFFICE}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
            ),
        ));
        parts.push((
            "ppt/presentation.xml".into(),
            format!(
                concat!(
                    r#"<p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
                    r#"<p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst>"#,
                    r#"<p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
                ),
                NS
            ),
        ));
        parts.push((
            "ppt/_rels/presentation.xml.rels".into(),
            format!(
                concat!(
                    r#"<Relationships xmlns="{rels}">"#,
                    r#"<Relationship Id="rId1" Type="{office}/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
                    r#"<Relationship Id="rId2" Type="{office}/slide" Target="slides/slide1.xml"/>"#,
                    r#"</Relationships>"#
                ),
                rels = RELS,
                office = OFFICE
            ),
        ));

        let ids: String = (1..=layouts)
            .map(|n| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2147483648usize + n, layouts + 1 - n))
            .collect();
        parts.push((
            "ppt/slideMasters/slideMaster1.xml".into(),
            format!(r#"<p:sldMaster {NS}><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst>{ids}</p:sldLayoutIdLst></p:sldMaster>"#),
        ));
        let master_rels: String = (1..=layouts)
            .map(|n| {
                format!(
                    r#"<Relationship Id="rId{}" Type="{OFFICE}/slideLayout" Target="../slideLayouts/slideLayout{n}.xml"/>"#,
                    layouts + 1 - n
                )
            })
            .collect();
        parts.push((
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            format!(r#"<Relationships xmlns="{RELS}">{master_rels}</Relationships>"#),
        ));
        for n in 1..=layouts {
            parts.push((format!("ppt/slideLayouts/slideLayout{n}.xml"), layout_xml(n)));
        }

        parts.push((
            "ppt/slides/slide1.xml".into(),
            format!(
                r#"<p:sld {NS}><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>TEMPLATE SLIDE</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
            ),
        ));
        parts.push((
            "ppt/slides/_rels/slide1.xml.rels".into(),
            format!(
                concat!(
                    r#"<Relationships xmlns="{rels}">"#,
                    r#"<Relationship Id="rId1" Type="{office}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#,
                    r#"<Relationship Id="rId2" Type="{office}/notesSlide" Target="../notesSlides/notesSlide1.xml"/>"#,
                    r#"</Relationships>"#
                ),
                rels = RELS,
                office = OFFICE
            ),
        ));
        parts.push((
            "ppt/notesSlides/notesSlide1.xml".into(),
            format!(r#"<p:notes {NS}><p:cSld><p:spTree/></p:cSld></p:notes>"#),
        ));

        let path = dir.join("template.pptx");
        let mut zip = ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, xml) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    pub fn write_png(path: &Path, width: u32, height: u32) -> PathBuf {
        image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]))
            .save(path)
            .unwrap();
        path.to_path_buf()
    }
}
