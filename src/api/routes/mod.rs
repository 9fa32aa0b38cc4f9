//! Route handlers for the REST API
//!
//! - `convert` - Conversion runs
//! - `system` - Health, OpenAPI

use crate::types::OutputItem;
use serde::{Deserialize, Serialize};

mod convert;
mod system;

pub use convert::*;
pub use system::*;

/// Response for POST /convert
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConvertResponse {
    /// Number of emitted items
    pub count: usize,
    /// Emitted items, in export order
    pub items: Vec<OutputItem>,
}
