mod render;

pub use render::{render_report, RenderOptions};
