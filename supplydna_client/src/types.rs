use serde::{Deserialize, Serialize};

/// A component as stored in the on-chain registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Registry key
    pub id: String,
    pub name: String,
    pub supplier: String,
    pub batch: String,
    /// Manufacturing date as entered at registration
    pub date: String,
}

impl ComponentRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        supplier: impl Into<String>,
        batch: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supplier: supplier.into(),
            batch: batch.into(),
            date: date.into(),
        }
    }

    /// Build a record from the registry's `components(id)` return tuple
    pub fn from_tuple(tuple: (String, String, String, String, String)) -> Self {
        let (id, name, supplier, batch, date) = tuple;
        Self {
            id,
            name,
            supplier,
            batch,
            date,
        }
    }

    /// The registry answers unknown keys with a zero-valued record, so a blank
    /// id means the component does not exist.
    pub fn is_blank(&self) -> bool {
        self.id.trim().is_empty()
    }
}
