pub mod image_row_source;
pub mod raster_row_source;
