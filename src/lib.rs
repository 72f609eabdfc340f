//! Local image relay.
//!
//! - `rewrite`: prefix image sources as they are inserted into a document,
//!   natively and as a browser observer script
//! - `report` / `convert`: fetch a page's images and re-encode them into
//!   PNG, WebP and JPEG to compare sizes
//! - `server`: the HTTP front end for both

pub mod codec;
pub mod config;
pub mod convert;
pub mod fetch;
pub mod page;
pub mod render;
pub mod report;
pub mod rewrite;
pub mod server;

pub type Result<T> = anyhow::Result<T>;
