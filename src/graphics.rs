use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::correlator::TaggedGraphic;
use super::records::PhaseDescriptor;

/// Bucket for graphics no phase marker could be matched to.
pub const UNTAGGED_KEY: &str = "unknown";

/// Tagged graphics grouped by type code, each group in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GraphicsByType(BTreeMap<String, Vec<TaggedGraphic>>);

/// A graphic of the active program, flagged when it shows the active phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseGraphic<'a> {
    pub graphic: &'a TaggedGraphic,
    pub is_current: bool,
}

impl GraphicsByType {
    pub fn from_tagged(graphics: Vec<TaggedGraphic>) -> Self {
        let mut groups: BTreeMap<String, Vec<TaggedGraphic>> = BTreeMap::new();
        for graphic in graphics {
            let key = graphic
                .type_code
                .as_ref()
                .map(|type_code| type_code.to_string())
                .unwrap_or_else(|| UNTAGGED_KEY.to_string());
            groups.entry(key).or_default().push(graphic);
        }
        debug!(types = groups.len(), "Grouped graphics by type code");
        GraphicsByType(groups)
    }

    /// Flattens back to extraction order: by page, then by position on the page.
    pub fn into_tagged(self) -> Vec<TaggedGraphic> {
        let mut graphics: Vec<TaggedGraphic> = self.0.into_values().flatten().collect();
        graphics.sort_by_key(|graphic| (graphic.page, position_on_page(graphic)));
        graphics
    }

    pub fn for_type(&self, type_code: &str) -> &[TaggedGraphic] {
        self.0.get(type_code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn untagged(&self) -> &[TaggedGraphic] {
        self.for_type(UNTAGGED_KEY)
    }

    pub fn find(&self, type_code: &str, occurrence_index: u32) -> Option<&TaggedGraphic> {
        self.for_type(type_code)
            .iter()
            .find(|graphic| graphic.occurrence_index == Some(occurrence_index))
    }

    /// The active program's graphics with the active phase flagged.
    ///
    /// Phase `i` (zero-based) is pictured by the graphic captioned with
    /// occurrence `i + 1`. When no graphic carries that occurrence, the
    /// phase index is clamped into the group instead.
    pub fn select_for_phase(&self, phase: &PhaseDescriptor) -> Vec<PhaseGraphic<'_>> {
        let Some(type_code) = &phase.type_code else {
            return Vec::new();
        };
        let group = self.for_type(type_code.as_str());
        if group.is_empty() {
            return Vec::new();
        }

        let wanted = u32::try_from(phase.phase_index + 1).ok();
        let current = group
            .iter()
            .position(|graphic| wanted.is_some() && graphic.occurrence_index == wanted)
            .unwrap_or_else(|| {
                let clamped = usize::try_from(phase.phase_index.max(0)).unwrap_or(0);
                clamped.min(group.len() - 1)
            });

        group
            .iter()
            .enumerate()
            .map(|(index, graphic)| PhaseGraphic {
                graphic,
                is_current: index == current,
            })
            .collect()
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn position_on_page(graphic: &TaggedGraphic) -> usize {
    graphic
        .sequence_key
        .rsplit('-')
        .next()
        .and_then(|index| index.parse().ok())
        .unwrap_or(usize::MAX)
}
