pub mod compression;
pub mod compressor;
pub mod storage;
