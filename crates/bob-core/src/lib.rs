//! Bob core
//!
//! Bobfile のモデル定義、タグ解決、パーサーパイプラインを提供します。

pub mod error;
pub mod model;
pub mod parser;
pub mod tag;

pub use error::{ManifestError, Result};
pub use model::*;
pub use parser::{ParseOptions, Parser};
pub use tag::{GitRef, TagContext, TagSpec};
