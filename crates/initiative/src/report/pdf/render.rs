//! Drawing of a [`ReportLayout`] with `printpdf`.

use super::layout::{CellLayout, ReportLayout, RowLayout, ViewLayout};
use crate::errors::ViewerError;
use crate::report::table::{truncate, CardColor, EpicCard, RowKind};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rect, Rgb,
};

const MM_PER_INCH: f32 = 25.4;
const MM_PER_PT: f32 = 0.3528;
const MARGIN_TOP: f32 = 12.0;
const MARGIN_BOTTOM: f32 = 20.0;
const CELL_PAD: f32 = 1.5;
const CARD_GAP: f32 = 1.2;
const CARD_FONT: f32 = 6.5;

type Rgb3 = (f32, f32, f32);

const ACCENT: Rgb3 = (0.4, 0.494, 0.918);
const TEXT: Rgb3 = (0.176, 0.216, 0.282);
const MUTED: Rgb3 = (0.443, 0.502, 0.588);
const GRID: Rgb3 = (0.886, 0.910, 0.941);
const FEATURE_BG: Rgb3 = (0.839, 0.894, 1.0);
const SUB_BG: Rgb3 = (0.969, 0.980, 0.988);
const WHITE: Rgb3 = (1.0, 1.0, 1.0);
const MARKED: Rgb3 = (0.184, 0.522, 0.353);

fn color(rgb: Rgb3) -> Color {
    Color::Rgb(Rgb::new(rgb.0, rgb.1, rgb.2, None))
}

fn line_height(font_pt: f32) -> f32 {
    font_pt * MM_PER_PT * 1.3
}

/// Greedy word wrap using an average Helvetica glyph width.
pub(crate) fn wrap(text: &str, width_mm: f32, font_pt: f32) -> Vec<String> {
    let max_chars = ((width_mm / (font_pt * MM_PER_PT * 0.5)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn render_error<E: std::fmt::Debug>(e: E) -> ViewerError {
    ViewerError::render("PDF export", format!("{:?}", e))
}

/// Page-by-page drawing state
struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    width: f32,
    height: f32,
    /// Cursor, millimetres from the bottom edge
    y: f32,
    pages: usize,
}

impl Canvas {
    fn new(layout: &ReportLayout) -> Result<Self, ViewerError> {
        let (width, height) = layout.format.size_mm();
        let title = format!("{} - {}", layout.title, layout.release);
        let (doc, page, layer) = PdfDocument::new(title, Mm(width), Mm(height), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?;
        let italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(render_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        let canvas = Self {
            doc,
            layer,
            regular,
            bold,
            italic,
            width,
            height,
            y: height - MARGIN_TOP,
            pages: 1,
        };
        canvas.footer();
        Ok(canvas)
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(self.width), Mm(self.height), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.pages += 1;
        self.y = self.height - MARGIN_TOP;
        self.footer();
    }

    /// Start a new page unless `needed` millimetres fit above the footer.
    fn ensure_space(&mut self, needed: f32) -> bool {
        if self.y - needed < MARGIN_BOTTOM {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn footer(&self) {
        let left = 10.0;
        let right = self.width - 10.0;
        self.hline(left, right, 12.0, GRID, 0.5);
        self.text("Initiative Hierarchy Report", 8.0, left, 7.0, MUTED, &self.regular);
        let page = format!("Page {}", self.pages);
        let page_width = page.chars().count() as f32 * 8.0 * MM_PER_PT * 0.5;
        self.text(&page, 8.0, right - page_width, 7.0, MUTED, &self.regular);
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, rgb: Rgb3, font: &IndirectFontRef) {
        self.layer.set_fill_color(color(rgb));
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn rect(&self, x: f32, top: f32, w: f32, h: f32, fill: Rgb3, outline: Option<Rgb3>) {
        self.layer.set_fill_color(color(fill));
        let mode = match outline {
            Some(stroke) => {
                self.layer.set_outline_color(color(stroke));
                self.layer.set_outline_thickness(0.5);
                PaintMode::FillStroke
            }
            None => PaintMode::Fill,
        };
        self.layer
            .add_rect(Rect::new(Mm(x), Mm(top - h), Mm(x + w), Mm(top)).with_mode(mode));
    }

    fn hline(&self, x1: f32, x2: f32, y: f32, rgb: Rgb3, thickness: f32) {
        self.layer.set_outline_color(color(rgb));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y)), false),
                (Point::new(Mm(x2), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    /// Write wrapped lines from the cursor down, moving the cursor.
    fn paragraph(&mut self, text: &str, size: f32, x: f32, width: f32, rgb: Rgb3, bold: bool) {
        let lh = line_height(size);
        for line in wrap(text, width, size) {
            self.ensure_space(lh);
            self.y -= lh;
            let font = if bold { &self.bold } else { &self.regular };
            self.text(&line, size, x, self.y, rgb, font);
        }
    }
}

/// First-column lines of a row: (text, size, bold, colour)
fn row_lines(row: &RowLayout, width: f32) -> Vec<(String, f32, bool, Rgb3)> {
    let (prefix, size) = match row.kind {
        RowKind::Feature => ("FEATURE:", 8.0),
        RowKind::SubFeature => ("Sub:", 7.0),
    };
    let mut lines = vec![(format!("{} {}", prefix, row.key), size, true, TEXT)];
    for line in wrap(&row.text, width, size) {
        lines.push((line, size, false, TEXT));
    }
    if let Some(release) = &row.marked_release {
        lines.push((format!("Mark with {}", release), size - 1.0, true, MARKED));
    }
    lines
}

fn card_lines(card: &EpicCard, width: f32) -> Vec<String> {
    let mut head = card.key.clone();
    if card.completed {
        head.push_str(" (done)");
    }
    if let Some(risk) = card.risk {
        head.push_str(&format!(" R{}", risk));
    }
    let mut lines = vec![head];
    lines.extend(wrap(&card.label, width, CARD_FONT));
    lines.extend(wrap(&card.status, width, CARD_FONT - 0.5));
    lines
}

fn card_height(lines: usize) -> f32 {
    lines as f32 * line_height(CARD_FONT) + 2.0 * CELL_PAD
}

fn cell_height(cell: &CellLayout, width: f32) -> f32 {
    let inner = width - 2.0 * CELL_PAD;
    let cards: f32 = cell
        .cards
        .iter()
        .map(|c| card_height(card_lines(c, inner - 2.0 * CELL_PAD).len()) + CARD_GAP)
        .sum();
    let more = if cell.more > 0 { line_height(CARD_FONT) } else { 0.0 };
    cards + more
}

struct TableGeometry {
    left: f32,
    widths: Vec<f32>,
}

impl TableGeometry {
    fn new(canvas: &Canvas, view: &ViewLayout) -> Self {
        let widths: Vec<f32> = view.column_widths_in.iter().map(|w| w * MM_PER_INCH).collect();
        let total: f32 = widths.iter().sum();
        Self {
            left: ((canvas.width - total) / 2.0).max(5.0),
            widths,
        }
    }

    fn total(&self) -> f32 {
        self.widths.iter().sum()
    }

    fn x(&self, column: usize) -> f32 {
        self.left + self.widths[..column].iter().sum::<f32>()
    }
}

fn draw_header(canvas: &mut Canvas, view: &ViewLayout, geo: &TableGeometry) {
    let h = line_height(9.0) + 2.0 * CELL_PAD + 1.0;
    canvas.rect(geo.left, canvas.y, geo.total(), h, ACCENT, None);
    let baseline = canvas.y - CELL_PAD - line_height(9.0) + 0.5;
    canvas.text("Feature / Sub-Feature", 9.0, geo.x(0) + CELL_PAD, baseline, WHITE, &canvas.bold);
    for (i, area) in view.areas.iter().enumerate() {
        canvas.text(area, 9.0, geo.x(i + 1) + CELL_PAD, baseline, WHITE, &canvas.bold);
    }
    canvas.y -= h;
}

fn draw_row(canvas: &mut Canvas, row: &RowLayout, geo: &TableGeometry) {
    let first = row_lines(row, geo.widths[0] - 2.0 * CELL_PAD);
    let first_height: f32 = first.iter().map(|(_, size, _, _)| line_height(*size)).sum();
    let cells_height = row
        .cells
        .iter()
        .enumerate()
        .map(|(i, cell)| cell_height(cell, geo.widths[i + 1]))
        .fold(0.0_f32, f32::max);
    let height = first_height.max(cells_height) + 2.0 * CELL_PAD;

    let top = canvas.y;
    match row.kind {
        RowKind::Feature => canvas.rect(geo.left, top, geo.total(), height, FEATURE_BG, Some(GRID)),
        RowKind::SubFeature => {
            canvas.rect(geo.left, top, geo.widths[0], height, SUB_BG, Some(GRID));
            for i in 1..geo.widths.len() {
                canvas.rect(geo.x(i), top, geo.widths[i], height, WHITE, Some(GRID));
            }
        }
    }

    let mut y = top - CELL_PAD;
    for (text, size, bold, rgb) in &first {
        y -= line_height(*size);
        let font = if *bold { &canvas.bold } else { &canvas.regular };
        canvas.text(text, *size, geo.x(0) + CELL_PAD, y, *rgb, font);
    }

    for (i, cell) in row.cells.iter().enumerate() {
        let x = geo.x(i + 1) + CELL_PAD;
        let width = geo.widths[i + 1] - 2.0 * CELL_PAD;
        let mut y = top - CELL_PAD;
        for card in &cell.cards {
            let lines = card_lines(card, width - 2.0 * CELL_PAD);
            let h = card_height(lines.len());
            let fill = card.color.rgb();
            canvas.rect(x, y, width, h, fill, Some(TEXT));
            let mut ly = y - CELL_PAD;
            for (n, line) in lines.iter().enumerate() {
                ly -= line_height(CARD_FONT);
                let font = if n == 0 { &canvas.bold } else { &canvas.regular };
                canvas.text(line, CARD_FONT, x + CELL_PAD, ly, TEXT, font);
            }
            y -= h + CARD_GAP;
        }
        if let Some(more) = cell.more_label() {
            y -= line_height(CARD_FONT);
            canvas.text(&more, CARD_FONT, x, y, MUTED, &canvas.italic);
        }
    }

    canvas.y = top - height;
}

fn row_height_estimate(row: &RowLayout, geo: &TableGeometry) -> f32 {
    let first: f32 = row_lines(row, geo.widths[0] - 2.0 * CELL_PAD)
        .iter()
        .map(|(_, size, _, _)| line_height(*size))
        .sum();
    let cells = row
        .cells
        .iter()
        .enumerate()
        .map(|(i, cell)| cell_height(cell, geo.widths[i + 1]))
        .fold(0.0_f32, f32::max);
    first.max(cells) + 2.0 * CELL_PAD
}

fn draw_title_page(canvas: &mut Canvas, layout: &ReportLayout) {
    let left = 25.0;
    canvas.y -= 12.0;
    canvas.text(&layout.title, 24.0, left, canvas.y, ACCENT, &canvas.bold);
    canvas.y -= 9.0;
    canvas.text(
        "Business Initiative > Feature > Sub-Feature > Epic",
        12.0,
        left,
        canvas.y,
        TEXT,
        &canvas.regular,
    );
    canvas.y -= 10.0;

    let value_x = left + 65.0;
    let value_width = canvas.width - value_x - 25.0;
    for (label, value) in &layout.metadata {
        canvas.ensure_space(line_height(11.0));
        canvas.y -= line_height(11.0);
        let label_y = canvas.y;
        canvas.text(label, 11.0, left, label_y, MUTED, &canvas.regular);
        canvas.y += line_height(11.0);
        canvas.paragraph(value, 11.0, value_x, value_width, TEXT, true);
        canvas.y -= 1.5;
    }

    canvas.y -= 8.0;
    canvas.ensure_space(30.0);
    canvas.y -= line_height(11.0);
    canvas.text("Risk Probability Legend:", 11.0, left, canvas.y, TEXT, &canvas.bold);
    canvas.y -= 4.0;
    let box_w = 36.0;
    for (i, entry) in CardColor::legend().into_iter().enumerate() {
        let x = left + (i % 5) as f32 * (box_w + 6.0);
        let top = canvas.y - (i / 5) as f32 * 10.0;
        canvas.rect(x, top, box_w, 7.0, entry.rgb(), Some(TEXT));
        canvas.text(entry.label(), 7.5, x + 1.5, top - 4.8, TEXT, &canvas.regular);
    }
}

fn draw_initiatives(canvas: &mut Canvas, layout: &ReportLayout) {
    if layout.pages.is_empty() {
        canvas.new_page();
        canvas.y -= line_height(11.0);
        canvas.text(
            "No initiatives with features found.",
            11.0,
            25.0,
            canvas.y,
            MUTED,
            &canvas.italic,
        );
        return;
    }

    for page in &layout.pages {
        canvas.new_page();
        canvas.y -= line_height(14.0);
        canvas.text(&page.title, 14.0, 15.0, canvas.y, ACCENT, &canvas.bold);
        canvas.y -= 4.0;

        for view in &page.views {
            let geo = TableGeometry::new(canvas, view);
            if let Some(label) = &view.label {
                canvas.ensure_space(30.0);
                canvas.y -= line_height(9.0) + 2.0;
                canvas.text(label, 9.0, geo.left, canvas.y, TEXT, &canvas.italic);
                canvas.y -= 2.0;
            }
            canvas.ensure_space(30.0);
            draw_header(canvas, view, &geo);

            for row in &view.rows {
                if canvas.ensure_space(row_height_estimate(row, &geo)) {
                    draw_header(canvas, view, &geo);
                }
                draw_row(canvas, row, &geo);
            }
            canvas.y -= 6.0;
        }
    }
}

fn draw_statistics(canvas: &mut Canvas, layout: &ReportLayout) {
    canvas.new_page();
    let left = 15.0;
    canvas.y -= line_height(16.0);
    canvas.text("Statistics", 16.0, left, canvas.y, ACCENT, &canvas.bold);
    canvas.y -= 4.0;

    let columns = [
        ("Initiative", 120.0),
        ("Features", 25.0),
        ("Sub-Features", 28.0),
        ("Epics", 20.0),
        ("Completion", 25.0),
        ("Avg. Risk", 22.0),
    ];
    let total: f32 = columns.iter().map(|(_, w)| w).sum();
    let lh = line_height(9.0) + 2.0;

    let header = |canvas: &mut Canvas| {
        canvas.rect(left, canvas.y, total, lh, ACCENT, None);
        let mut x = left;
        for (title, w) in columns {
            canvas.text(title, 9.0, x + CELL_PAD, canvas.y - lh + 1.5, WHITE, &canvas.bold);
            x += w;
        }
        canvas.y -= lh;
    };
    header(canvas);

    for stats in &layout.stats.per_initiative {
        if canvas.ensure_space(lh) {
            header(canvas);
        }
        let name = truncate(&format!("{} {}", stats.key, stats.summary), Some(70));
        let cells = [
            name,
            stats.features.to_string(),
            stats.sub_features.to_string(),
            stats.epics.to_string(),
            format!("{:.1}%", stats.completion_percent),
            stats
                .average_risk
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "-".to_string()),
        ];
        canvas.hline(left, left + total, canvas.y - lh, GRID, 0.5);
        let mut x = left;
        for ((_, w), value) in columns.iter().zip(cells.iter()) {
            canvas.text(value, 8.5, x + CELL_PAD, canvas.y - lh + 1.5, TEXT, &canvas.regular);
            x += w;
        }
        canvas.y -= lh;
    }

    canvas.y -= 8.0;
    canvas.ensure_space(lh * 3.0);
    canvas.y -= line_height(12.0);
    canvas.text("Epic Status Distribution", 12.0, left, canvas.y, TEXT, &canvas.bold);
    canvas.y -= 2.0;
    if layout.stats.status_distribution.is_empty() {
        canvas.y -= lh;
        canvas.text("No epics.", 9.0, left, canvas.y, MUTED, &canvas.italic);
    }
    for share in &layout.stats.status_distribution {
        canvas.ensure_space(lh);
        canvas.y -= lh;
        canvas.text(&share.status, 9.0, left, canvas.y + 1.5, TEXT, &canvas.regular);
        canvas.text(&share.count.to_string(), 9.0, left + 70.0, canvas.y + 1.5, TEXT, &canvas.regular);
        canvas.text(
            &format!("{:.1}%", share.percent),
            9.0,
            left + 90.0,
            canvas.y + 1.5,
            TEXT,
            &canvas.regular,
        );
        canvas.hline(left, left + 115.0, canvas.y, GRID, 0.5);
    }
}

/// Draw the title page, one page run per initiative and the statistics page.
pub fn render_pdf(layout: &ReportLayout) -> Result<Vec<u8>, ViewerError> {
    let mut canvas = Canvas::new(layout)?;
    draw_title_page(&mut canvas, layout);
    draw_initiatives(&mut canvas, layout);
    draw_statistics(&mut canvas, layout);
    canvas.doc.save_to_bytes().map_err(render_error)
}
