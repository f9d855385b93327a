//! Config source protocol.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::SourceError;

/// External key/value store holding the dynamic schedule values.
///
/// The scheduler polls it; no push capability is assumed.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Fetch the complete current key/value set.
    async fn fetch_all(&self) -> Result<HashMap<String, String>, SourceError>;
}
