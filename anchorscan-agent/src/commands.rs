use std::path::Path;

use anchorscan_core::beacon::{Namespace, decode_instance, describe};
use anchorscan_core::identity::resolve_anchor_id;
use anchorscan_model::{AnchorId, RadioObservation};
use anyhow::Context;

use crate::infra::identity_file::FileIdentityStore;

/// Reads the persisted anchor id, creating one if needed.
pub fn ensure_identity(path: &Path) -> anyhow::Result<AnchorId> {
    let store = FileIdentityStore::new(path);
    resolve_anchor_id(&store)
        .with_context(|| format!("failed to resolve anchor id at {}", path.display()))
}

/// Offline decode of a service-data frame given as hex.
///
/// Separators (`:`, `-`, spaces) are ignored.
pub fn decode_frame(raw: &str, namespace: &Namespace) -> anyhow::Result<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | ' '))
        .collect();
    let bytes = hex::decode(&cleaned).context("frame is not valid hex")?;

    let observation = RadioObservation {
        device_id: "offline".to_string(),
        service_data: Some(bytes),
        ..Default::default()
    };
    let description = describe(&observation, namespace);
    Ok(match decode_instance(observation.service_data.as_deref(), namespace) {
        Some(instance) => format!("{description}\ntag instance: {instance}"),
        None => description,
    })
}
