//! PDF exports: a pure layout stage and a drawing stage.

pub mod layout;
mod render;

pub use layout::{layout_report, LayoutOptions, PageFormat, ReportLayout, A3_MAX_AREAS};
pub use render::render_pdf;
