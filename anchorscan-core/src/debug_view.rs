//! Operator visibility into everything the radio hears during a debug scan.
//! Not part of job correctness.

use std::collections::HashMap;

use anchorscan_model::{GenericObservation, RadioObservation};
use chrono::{DateTime, Utc};

use crate::beacon::{Namespace, describe};

#[derive(Debug, Default)]
pub struct GenericObservationSet {
    devices: HashMap<String, GenericObservation>,
}

impl GenericObservationSet {
    pub fn record(
        &mut self,
        observation: &RadioObservation,
        namespace: &Namespace,
        at: DateTime<Utc>,
    ) {
        let name = observation
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let entry = GenericObservation {
            device_id: observation.device_id.clone(),
            name,
            rssi: observation.rssi,
            description: describe(observation, namespace),
            last_seen: at,
        };
        self.devices.insert(observation.device_id.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    /// Devices ordered strongest first, ties by device id.
    pub fn snapshot(&self) -> Vec<GenericObservation> {
        let mut out: Vec<_> = self.devices.values().cloned().collect();
        out.sort_by(|a, b| b.rssi.cmp(&a.rssi).then_with(|| a.device_id.cmp(&b.device_id)));
        out
    }
}
