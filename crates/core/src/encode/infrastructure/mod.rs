pub mod prores_codec;
