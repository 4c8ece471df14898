//! Generated index (table of contents) pages.
//!
//! The index is laid out in two passes. [`IndexPageBuilder::paginate`] first
//! decides which line lands on which page; only then are entry page numbers
//! computed, so they already account for the number of index pages that
//! precede the content.

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use super::numbering::PageNumberer;
use super::request::{DocumentDescriptor, IndexOptions};
use super::text::{Font, dot_leader, show_text, truncate_name};
use crate::config::{IndexLayout, NumberingLayout};
use crate::error::PageError;
use crate::pages;

const TITLE_ADVANCE: f32 = 40.0;
const BID_NUMBER_ADVANCE: f32 = 30.0;
const LEADER_GAP: f32 = 4.0;

/// One line of the index pointing at a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Name as printed (possibly truncated).
    pub display_name: String,
    /// Output page number of the document's first page.
    pub page_number: u32,
    /// Zero-based index page the entry is printed on.
    pub index_page: usize,
}

/// Rendered index pages.
#[derive(Debug)]
pub struct IndexDocument {
    /// Document holding only the index pages, already numbered.
    pub document: Document,
    /// Number of index pages.
    pub page_count: usize,
    /// One entry per listed document, in listing order.
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Line {
    BidNumber,
    Title,
    Introduction,
    Entry(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PlacedLine {
    line: Line,
    y: f32,
}

/// Builds index pages for a compilation.
#[derive(Debug, Clone, Default)]
pub struct IndexPageBuilder {
    layout: IndexLayout,
    numbering: NumberingLayout,
}

impl IndexPageBuilder {
    /// Create a builder with the given layouts.
    pub fn new(layout: IndexLayout, numbering: NumberingLayout) -> Self {
        Self { layout, numbering }
    }

    /// Number of index pages needed for `entry_count` documents.
    pub fn page_count_for(&self, entry_count: usize, has_bid_number: bool) -> usize {
        self.paginate(entry_count, has_bid_number).len()
    }

    /// Assign every line of the index to a page and a baseline.
    fn paginate(&self, entry_count: usize, has_bid_number: bool) -> Vec<Vec<PlacedLine>> {
        let top = self.layout.page_height - self.layout.top_margin;
        let mut pages = vec![Vec::new()];
        let mut y = top;

        if has_bid_number {
            pages[0].push(PlacedLine {
                line: Line::BidNumber,
                y,
            });
            y -= BID_NUMBER_ADVANCE;
        }

        pages[0].push(PlacedLine {
            line: Line::Title,
            y,
        });
        y -= TITLE_ADVANCE;

        pages[0].push(PlacedLine {
            line: Line::Introduction,
            y,
        });
        y -= self.layout.line_height;

        for i in 0..entry_count {
            if y < self.layout.bottom_limit {
                pages.push(Vec::new());
                y = top;
            }
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    line: Line::Entry(i),
                    y,
                });
            }
            y -= self.layout.line_height;
        }

        pages
    }

    /// Build the index for `documents`.
    ///
    /// `page_counts[i]` is the page count of `documents[i]`; missing or zero
    /// counts advance the running page number by one.
    ///
    /// # Arguments
    ///
    /// * `documents` - Documents in output order
    /// * `options` - Title and first page number
    /// * `page_counts` - Page count per document
    /// * `bid_number_label` - Optional line printed above the title
    ///
    /// # Errors
    ///
    /// Returns an error if the generated page tree cannot be assembled.
    pub fn build(
        &self,
        documents: &[DocumentDescriptor],
        options: &IndexOptions,
        page_counts: &[usize],
        bid_number_label: Option<&str>,
    ) -> Result<IndexDocument, PageError> {
        let plan = self.paginate(documents.len(), bid_number_label.is_some());
        let page_count = plan.len();

        let mut entries = Vec::with_capacity(documents.len());
        let mut running = options.start_from + page_count as u32;
        for (i, document) in documents.iter().enumerate() {
            let index_page = plan
                .iter()
                .position(|page| page.iter().any(|placed| placed.line == Line::Entry(i)))
                .unwrap_or(0);
            entries.push(IndexEntry {
                display_name: truncate_name(&document.display_name, self.layout.max_name_length),
                page_number: running,
                index_page,
            });
            let advance = page_counts.get(i).copied().filter(|&c| c > 0).unwrap_or(1);
            running += advance as u32;
        }

        let mut doc = pages::new_document();
        let regular_id = doc.add_object(Font::Helvetica.dictionary());
        let bold_id = doc.add_object(Font::HelveticaBold.dictionary());
        let resources = dictionary! {
            "Font" => dictionary! {
                Font::Helvetica.resource_name() => regular_id,
                Font::HelveticaBold.resource_name() => bold_id,
            },
        };

        let mut page_ids: Vec<ObjectId> = Vec::with_capacity(page_count);
        for lines in &plan {
            let content = self.render_page(lines, &entries, &options.title, bid_number_label)?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = pages::push_page(
                &mut doc,
                dictionary! {
                    "MediaBox" => vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(self.layout.page_width),
                        Object::Real(self.layout.page_height),
                    ],
                    "Resources" => resources.clone(),
                    "Contents" => content_id,
                },
            )?;
            page_ids.push(page_id);
        }

        PageNumberer::new(self.numbering.clone()).number_pages(
            &mut doc,
            &page_ids,
            options.start_from,
        )?;

        tracing::debug!(
            index_pages = page_count,
            entries = entries.len(),
            start_from = options.start_from,
            "built index"
        );

        Ok(IndexDocument {
            document: doc,
            page_count,
            entries,
        })
    }

    fn render_page(
        &self,
        lines: &[PlacedLine],
        entries: &[IndexEntry],
        title: &str,
        bid_number_label: Option<&str>,
    ) -> Result<Vec<u8>, PageError> {
        let layout = &self.layout;
        let mut operations = Vec::new();

        for placed in lines {
            match placed.line {
                Line::BidNumber => {
                    let label = bid_number_label.unwrap_or_default();
                    operations.extend(self.centered(
                        Font::HelveticaBold,
                        layout.bid_font_size,
                        placed.y,
                        label,
                    ));
                }
                Line::Title => {
                    operations.extend(self.centered(
                        Font::HelveticaBold,
                        layout.title_font_size,
                        placed.y,
                        title,
                    ));
                }
                Line::Introduction => {
                    operations.extend(show_text(
                        Font::Helvetica,
                        layout.font_size,
                        layout.side_margin,
                        placed.y,
                        "Introduction",
                    ));
                }
                Line::Entry(i) => {
                    let Some(entry) = entries.get(i) else {
                        continue;
                    };
                    operations.extend(self.entry_line(entry, placed.y));
                }
            }
        }

        pages::encode_operations(operations)
    }

    fn centered(
        &self,
        font: Font,
        font_size: f32,
        y: f32,
        text: &str,
    ) -> Vec<lopdf::content::Operation> {
        let x = (self.layout.page_width - font.text_width(text, font_size)) / 2.0;
        show_text(font, font_size, x, y, text)
    }

    fn entry_line(&self, entry: &IndexEntry, y: f32) -> Vec<lopdf::content::Operation> {
        let layout = &self.layout;
        let font = Font::Helvetica;
        let number = entry.page_number.to_string();

        let name_end = layout.side_margin + font.text_width(&entry.display_name, layout.font_size);
        let number_x =
            layout.page_width - layout.side_margin - font.text_width(&number, layout.font_size);
        let leader_x = name_end + LEADER_GAP;
        let dots = dot_leader(font, number_x - LEADER_GAP - leader_x, layout.font_size);

        let mut operations = show_text(
            font,
            layout.font_size,
            layout.side_margin,
            y,
            &entry.display_name,
        );
        if !dots.is_empty() {
            operations.extend(show_text(font, layout.font_size, leader_x, y, &dots));
        }
        operations.extend(show_text(font, layout.font_size, number_x, y, &number));
        operations
    }
}
