pub mod converter_factory;
pub mod software_planar_converter;
pub mod sws_planar_converter;
