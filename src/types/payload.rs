use crate::types::gridded::GriddedResult;
use crate::types::tabular::TabularResult;

/// A decoded response, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultPayload {
    Gridded(GriddedResult),
    Tabular(TabularResult),
    /// A response in a format neither query path produces (e.g. an HTML error page
    /// served with status 200).
    Unsupported { content_type: String },
}

impl ResultPayload {
    pub fn kind(&self) -> &str {
        match self {
            ResultPayload::Gridded(_) => "gridded",
            ResultPayload::Tabular(_) => "tabular",
            ResultPayload::Unsupported { content_type } => content_type,
        }
    }
}
