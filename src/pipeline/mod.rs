pub mod enrich;
pub mod ingest;
pub mod parse;
pub mod process;
pub mod rasterize;
pub mod render;
