//! Layout inference: turn positioned legacy fragments into an ordered list
//! of modern sections.
//!
//! [`infer_sections`] is a pure function of its inputs. Rows without open
//! fragments are skipped, so section order counts emitted rows only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pagemorph_core::{Emphasis, SectionEmphasis};

use crate::error::LayoutError;

/// Widest row a section can represent.
pub const MAX_COLUMNS: u32 = 3;

/// Type tag of image fragments.
pub const IMAGE_KIND: &str = "image";

/// One positioned piece of legacy content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFragment {
    pub row: u32,
    pub column: u32,
    /// Type tag such as `image` or `text`.
    pub kind: String,
    /// Suppressed fragments are ignored by inference.
    #[serde(default)]
    pub closed: bool,
}

impl ContentFragment {
    pub fn new(row: u32, column: u32, kind: impl Into<String>) -> Self {
        ContentFragment {
            row,
            column,
            kind: kind.into(),
            closed: false,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind.eq_ignore_ascii_case(IMAGE_KIND)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnLayout {
    OneColumn,
    TwoColumn,
    /// Narrow left column, wide right column.
    TwoColumnNarrowLeft,
    /// Wide left column, narrow right column.
    TwoColumnNarrowRight,
    ThreeColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionTemplate {
    pub columns: ColumnLayout,
    /// Whether the section carries the persistent vertical column.
    #[serde(default)]
    pub vertical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// 1-based position among emitted sections.
    pub order: u32,
    /// Legacy row the section was inferred from.
    pub row: u32,
    pub template: SectionTemplate,
    pub emphasis: Emphasis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_emphasis: Option<Emphasis>,
}

/// What a single column holds, for the two-column heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnContent {
    Empty,
    ImagesOnly,
    Mixed,
    NoImages,
}

impl ColumnContent {
    fn classify<'a>(fragments: impl Iterator<Item = &'a ContentFragment>) -> Self {
        let (mut images, mut others) = (0usize, 0usize);
        for f in fragments {
            if f.is_image() {
                images += 1;
            } else {
                others += 1;
            }
        }
        match (images, others) {
            (0, 0) => ColumnContent::Empty,
            (_, 0) => ColumnContent::ImagesOnly,
            (0, _) => ColumnContent::NoImages,
            _ => ColumnContent::Mixed,
        }
    }

    fn has_non_image(self) -> bool {
        matches!(self, ColumnContent::NoImages | ColumnContent::Mixed)
    }
}

/// Pick the two-column variant from the contents of columns 1 and 2.
///
/// An image-only column next to a column with other content becomes the
/// narrow side. Every other distribution gets the equal split.
fn two_column_layout(left: ColumnContent, right: ColumnContent) -> ColumnLayout {
    use ColumnContent::ImagesOnly;
    match (left, right) {
        (ImagesOnly, r) if r.has_non_image() => ColumnLayout::TwoColumnNarrowLeft,
        (l, ImagesOnly) if l.has_non_image() => ColumnLayout::TwoColumnNarrowRight,
        _ => ColumnLayout::TwoColumn,
    }
}

fn column_layout(max_columns: u32, row: &[&ContentFragment]) -> ColumnLayout {
    match max_columns {
        0 | 1 => ColumnLayout::OneColumn,
        2 => {
            let in_column = |c: u32| row.iter().copied().filter(move |f| f.column == c);
            two_column_layout(
                ColumnContent::classify(in_column(1)),
                ColumnContent::classify(in_column(2)),
            )
        }
        _ => ColumnLayout::ThreeColumn,
    }
}

/// Infer the section list for a page.
///
/// When `vertical` is set the first emitted row's highest column is the
/// vertical column and does not count toward its width.
pub fn infer_sections(
    fragments: &[ContentFragment],
    vertical: bool,
    emphasis: &SectionEmphasis,
) -> Result<Vec<Section>, LayoutError> {
    let mut rows: BTreeMap<u32, Vec<&ContentFragment>> = BTreeMap::new();
    for fragment in fragments.iter().filter(|f| !f.closed) {
        rows.entry(fragment.row).or_default().push(fragment);
    }

    let vertical_emphasis = vertical.then(|| emphasis.vertical());

    let Some(&first_row) = rows.keys().next() else {
        return Ok(vec![Section {
            order: 1,
            row: 1,
            template: SectionTemplate {
                columns: ColumnLayout::OneColumn,
                vertical,
            },
            emphasis: emphasis.for_row(1),
            vertical_emphasis,
        }]);
    };

    let mut sections = Vec::with_capacity(rows.len());
    for (row, row_fragments) in &rows {
        let is_vertical_row = vertical && *row == first_row;
        let mut max_columns = row_fragments.iter().map(|f| f.column).max().unwrap_or(0);
        if is_vertical_row {
            max_columns = max_columns.saturating_sub(1);
        }
        if max_columns > MAX_COLUMNS {
            return Err(LayoutError::LayoutComplexity {
                row: *row,
                columns: max_columns,
            });
        }

        sections.push(Section {
            order: sections.len() as u32 + 1,
            row: *row,
            template: SectionTemplate {
                columns: column_layout(max_columns, row_fragments),
                vertical: is_vertical_row,
            },
            emphasis: emphasis.for_row(*row),
            vertical_emphasis: if is_vertical_row { vertical_emphasis } else { None },
        });
    }

    tracing::debug!(sections = sections.len(), vertical, "inferred page layout");
    Ok(sections)
}
