// Library root: color model, remote sources, the fallback aggregator, and
// favorites persistence. The front end lives in the chroma-app crate.

pub mod aggregator;
pub mod color;
pub mod config;
pub mod db;
pub mod sources;
pub mod theme;
