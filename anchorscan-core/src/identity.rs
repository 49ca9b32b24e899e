use anchorscan_model::AnchorId;
use tracing::info;

use crate::error::Result;
use crate::ports::IdentityStore;

/// Reads the persisted anchor id, minting and persisting a new one when the
/// stored value is missing or in a legacy format.
pub fn resolve_anchor_id(store: &dyn IdentityStore) -> Result<AnchorId> {
    match store.load()? {
        Some(raw) => match AnchorId::parse(&raw) {
            Ok(id) => return Ok(id),
            Err(err) => info!(%err, "replacing legacy anchor identifier"),
        },
        None => info!("no anchor identifier stored yet"),
    }

    let id = AnchorId::generate();
    store.store(id.as_str())?;
    info!(anchor_id = %id, "generated anchor identifier");
    Ok(id)
}
