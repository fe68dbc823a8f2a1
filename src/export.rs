//! Export adapter - renders the session summary as a tabular PDF.
//!
//! Produces a single document with an items table (name, price, assignees),
//! a balances table (paid, share, net per roommate), and the combined total.
//! Also provides the plain-text dump of recognized lines used for
//! copy/paste.

use crate::core::balance::{BalanceSheet, format_net};
use crate::core::session::SplitSession;
use crate::errors::{Error, Result};
use crate::models::ReceiptLine;
use chrono::Utc;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_LEFT_MM: f32 = 14.0;
const MARGIN_BOTTOM_MM: f32 = 20.0;
const ROW_STEP_MM: f32 = 6.5;

/// Renders the summary PDF into a byte buffer.
pub fn render_pdf(
    session: &SplitSession,
    sheet: &BalanceSheet,
    title: &str,
    currency: &str,
) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        "Receipt Splitter Summary",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(export_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(export_error)?;

    let mut writer = PageWriter {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT_MM - 20.0,
        regular: &regular,
        bold: &bold,
    };

    writer.text_row(&[(0.0, "Receipt Splitter Summary")], 18.0, true);
    writer.advance(4.0);
    writer.text_row(&[(0.0, &format!("Receipt: {title}"))], 12.0, false);
    writer.text_row(
        &[(0.0, &format!("Date: {}", Utc::now().format("%Y-%m-%d")))],
        12.0,
        false,
    );
    writer.advance(6.0);

    // Items table
    writer.text_row(&[(0.0, "Item"), (96.0, "Price"), (126.0, "Assigned To")], 10.0, true);
    for item in session.items() {
        let assignees = assignee_names(session, item);
        writer.text_row(
            &[
                (0.0, item.name.as_str()),
                (96.0, &format!("{currency} {:.2}", item.current_price)),
                (126.0, &assignees),
            ],
            10.0,
            false,
        );
    }
    writer.advance(8.0);

    // Balances table
    writer.text_row(
        &[(0.0, "Roommate"), (56.0, "Paid"), (96.0, "Contribution"), (136.0, "Net")],
        10.0,
        true,
    );
    for roommate in session.roommates() {
        let (paid, share, net) = sheet
            .balance_for(roommate.id)
            .map_or((0.0, 0.0, 0.0), |b| (b.paid, b.share, b.net()));
        writer.text_row(
            &[
                (0.0, roommate.name.as_str()),
                (56.0, &format!("{currency} {paid:.2}")),
                (96.0, &format!("{currency} {share:.2}")),
                (136.0, &format_net(net, currency)),
            ],
            10.0,
            false,
        );
    }
    writer.advance(8.0);

    // Totals
    writer.text_row(&[(0.0, "Totals")], 12.0, true);
    let combined: f64 = session.items().iter().map(|i| i.current_price).sum();
    writer.text_row(
        &[(0.0, &format!("Combined receipts: {currency} {combined:.2}"))],
        10.0,
        false,
    );

    let mut buffer = Vec::new();
    {
        let mut buf_writer = BufWriter::new(&mut buffer);
        doc.save(&mut buf_writer).map_err(export_error)?;
    }
    Ok(buffer)
}

/// Renders the summary PDF and writes it to `path`.
pub fn export_pdf(
    path: &Path,
    session: &SplitSession,
    sheet: &BalanceSheet,
    title: &str,
    currency: &str,
) -> Result<()> {
    let bytes = render_pdf(session, sheet, title, currency)?;
    std::io::Write::write_all(&mut File::create(path)?, &bytes)?;
    Ok(())
}

/// Joins recognized line texts with newlines, the same dump the original
/// "copy all text" action produced.
#[must_use]
pub fn lines_as_text(lines: &[ReceiptLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn assignee_names(session: &SplitSession, item: &crate::models::ReceiptItem) -> String {
    let mut names: Vec<&str> = session
        .roommates()
        .iter()
        .filter(|r| item.assigned_to.contains(&r.id))
        .map(|r| r.name.as_str())
        .collect();
    if names.len() < item.assigned_to.len() {
        // Assignment sets are kept consistent by the session; anything else
        // renders visibly rather than being dropped.
        names.push("Unknown");
    }
    names.join(", ")
}

fn export_error(e: printpdf::Error) -> Error {
    Error::Export {
        message: e.to_string(),
    }
}

/// Tracks the vertical cursor on the current page and starts a new page when
/// the cursor reaches the bottom margin.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
}

impl PageWriter<'_> {
    fn text_row(&mut self, cells: &[(f32, &str)], size: f32, bold: bool) {
        self.ensure_space();
        let font = if bold { self.bold } else { self.regular };
        for (offset, text) in cells {
            self.layer.use_text(
                (*text).to_string(),
                size,
                Mm(MARGIN_LEFT_MM + offset),
                Mm(self.y),
                font,
            );
        }
        self.y -= ROW_STEP_MM;
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    fn ensure_space(&mut self) {
        if self.y < MARGIN_BOTTOM_MM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - 20.0;
        }
    }
}
