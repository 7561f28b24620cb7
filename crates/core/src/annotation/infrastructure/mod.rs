pub mod bitmap_font;
pub mod overlay_compositor;
pub mod raster;
