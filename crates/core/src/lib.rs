//! Single-stream ProRes writer: pulls float RGB rows from a renderer,
//! converts them to 10-bit 4:2:2, encodes with libavcodec and muxes into a
//! QuickTime or Matroska file.

pub mod conversion {
    pub mod domain {
        pub mod planar_converter;
        pub mod quantizer;
        pub mod raster_converter;
        pub mod rgb24_image;
    }
    pub mod infrastructure;
}

pub mod encode {
    pub mod domain {
        pub mod frame_packager;
        pub mod packaged_frame;
        pub mod video_codec;
    }
    pub mod infrastructure;
}

pub mod mux {
    pub mod domain {
        pub mod container_kind;
        pub mod container_muxer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod encode_session;
    pub mod session_logger;
    pub mod writer_settings;
}

pub mod render {
    pub mod domain {
        pub mod row_source;
    }
    pub mod infrastructure;
}

pub mod shared {
    pub mod codec_config;
    pub mod constants;
    pub mod error;
    pub mod media_runtime;
    pub mod raster_frame;
    pub mod rational;
}
