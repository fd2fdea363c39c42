//! Tags the phase diagrams extracted from a plan with the timing type and
//! phase they illustrate.
//!
//! Plans print one diagram per phase, captioned with the phase marker
//! ("分相：01", "分相：02", ...). The first caption of a program follows its
//! type code ("36 分相：01"). Diagrams come out of the page in reading order,
//! so the k-th caption on a page is taken to describe the k-th diagram. This
//! is a layout assumption, the image content is never inspected.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::config::ParserConfig;
use super::records::TypeCode;
use super::rows::page_tokens;

static MARKER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[:：]?([0-9]{1,2})?$").unwrap());

/// A raster image as decoded from the document. The bytes are never inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graphic {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bytes: Vec<u8>,
}

impl Graphic {
    pub fn opaque(bytes: Vec<u8>) -> Self {
        Graphic {
            width: None,
            height: None,
            bytes,
        }
    }
}

/// The timing type and 1-based phase occurrence read for one caption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseTag {
    pub type_code: Option<TypeCode>,
    pub occurrence_index: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedGraphic {
    /// 1-based page number.
    pub page: usize,
    /// "{page}-{index}", index counting the page's graphics from 0.
    pub sequence_key: String,
    #[serde(skip)]
    pub graphic: Graphic,
    pub type_code: Option<TypeCode>,
    pub occurrence_index: Option<u32>,
}

impl TaggedGraphic {
    pub fn is_tagged(&self) -> bool {
        self.type_code.is_some()
    }
}

pub fn is_phase_marker(token: &str, marker: &str) -> bool {
    token
        .strip_prefix(marker)
        .is_some_and(|rest| MARKER_SUFFIX.is_match(rest))
}

/// One tag per phase marker in the token stream, in stream order.
pub fn scan_phase_markers(tokens: &[String], marker: &str) -> Vec<PhaseTag> {
    let mut tags = Vec::new();
    let mut current_type: Option<TypeCode> = None;
    let mut occurrences: u32 = 0;

    for (index, token) in tokens.iter().enumerate() {
        if !is_phase_marker(token, marker) {
            continue;
        }
        // A type code right before a marker opens that program's run of phases
        if let Some(type_code) = index
            .checked_sub(1)
            .and_then(|previous| TypeCode::parse(&tokens[previous]))
        {
            current_type = Some(type_code);
            occurrences = 0;
        }
        match &current_type {
            Some(type_code) => {
                occurrences += 1;
                tags.push(PhaseTag {
                    type_code: Some(type_code.clone()),
                    occurrence_index: Some(occurrences),
                });
            }
            None => tags.push(PhaseTag::default()),
        }
    }
    tags
}

pub fn correlate_graphics<S: AsRef<str> + Sync>(
    pages: &[S],
    graphics_by_page: Vec<Vec<Graphic>>,
) -> Vec<TaggedGraphic> {
    correlate_graphics_with(pages, graphics_by_page, &ParserConfig::default())
}

/// Tags every page's graphics from that page's text. Pages are independent:
/// the current type and the counter start over on each page. Graphics on
/// pages without text stay untagged.
pub fn correlate_graphics_with<S: AsRef<str> + Sync>(
    pages: &[S],
    graphics_by_page: Vec<Vec<Graphic>>,
    config: &ParserConfig,
) -> Vec<TaggedGraphic> {
    let tagged: Vec<TaggedGraphic> = graphics_by_page
        .into_par_iter()
        .enumerate()
        .map(|(index, graphics)| {
            let text = pages.get(index).map(|page| page.as_ref()).unwrap_or("");
            let tags = scan_phase_markers(&page_tokens(text), &config.phase_marker);
            tag_page(index + 1, graphics, &tags)
        })
        .collect::<Vec<Vec<TaggedGraphic>>>()
        .into_iter()
        .flatten()
        .collect();

    debug!(
        graphics = tagged.len(),
        tagged = tagged.iter().filter(|graphic| graphic.is_tagged()).count(),
        "Correlated graphics with phase markers"
    );
    tagged
}

fn tag_page(page: usize, graphics: Vec<Graphic>, tags: &[PhaseTag]) -> Vec<TaggedGraphic> {
    if graphics.len() != tags.len() {
        debug!(
            page,
            graphics = graphics.len(),
            markers = tags.len(),
            "Phase marker count differs from graphic count"
        );
    }
    graphics
        .into_iter()
        .enumerate()
        .map(|(index, graphic)| {
            let tag = tags.get(index).cloned().unwrap_or_default();
            TaggedGraphic {
                page,
                sequence_key: format!("{page}-{index}"),
                graphic,
                type_code: tag.type_code,
                occurrence_index: tag.occurrence_index,
            }
        })
        .collect()
}
