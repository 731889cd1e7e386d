use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use shadelink_core::{
    CoveringController, CoveringSnapshot, DeviceProfile, MemoryStore, PendingCommand, RadioLink,
};

use crate::error::PlatformError;
use crate::radio::DryRunRadio;
use crate::settings::{Bridge, Settings};

/// A registered covering: its controller plus the context that outlives it.
pub struct Accessory {
    pub controller: CoveringController,
    pub store: Arc<MemoryStore>,
    radio: Arc<dyn RadioLink>,
}

/// Registry of configured coverings, keyed by device name.
pub struct Platform {
    accessories: BTreeMap<String, Accessory>,
}

impl Platform {
    /// Builds every configured device against dry-run bridges.
    pub fn new(settings: &Settings) -> Result<Self, PlatformError> {
        Self::with_bridges(settings, |bridge| {
            Arc::new(DryRunRadio::new(bridge.host.clone(), bridge.latency()))
        })
    }

    /// Builds every configured device, opening one radio link per bridge.
    pub fn with_bridges<F>(settings: &Settings, mut connect: F) -> Result<Self, PlatformError>
    where
        F: FnMut(&Bridge) -> Arc<dyn RadioLink>,
    {
        let mut radios: HashMap<&str, Arc<dyn RadioLink>> = HashMap::new();
        let mut accessories = BTreeMap::new();

        for device in &settings.devices {
            let name = device.name.trim();
            if name.is_empty() {
                return Err(PlatformError::UnnamedDevice);
            }

            let bridge = settings
                .bridge(&device.host)
                .ok_or_else(|| PlatformError::UnknownBridge {
                    device: device.name.clone(),
                    host: device.host.clone(),
                })?;

            let mut profile = device.profile()?;
            profile.name = name.to_string();

            let radio = radios
                .entry(bridge.host.as_str())
                .or_insert_with(|| connect(bridge))
                .clone();

            let Entry::Vacant(entry) = accessories.entry(name.to_string()) else {
                return Err(PlatformError::DuplicateDevice(name.to_string()));
            };

            let store = Arc::new(MemoryStore::new());
            let controller = CoveringController::new(profile, radio.clone(), store.clone())?;

            tracing::info!("Registered covering {} on bridge {}", name, bridge.host);

            entry.insert(Accessory {
                controller,
                store,
                radio,
            });
        }

        Ok(Self { accessories })
    }

    pub fn get(&self, name: &str) -> Option<&CoveringController> {
        self.accessories.get(name).map(|accessory| &accessory.controller)
    }

    pub fn names(&self) -> Vec<&str> {
        self.accessories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    pub fn snapshot(&self) -> Vec<CoveringSnapshot> {
        self.accessories
            .values()
            .map(|accessory| accessory.controller.snapshot())
            .collect()
    }

    pub fn set_target(&self, name: &str, position: u8) -> Result<PendingCommand, PlatformError> {
        let controller = self
            .get(name)
            .ok_or_else(|| PlatformError::DeviceNotFound(name.to_string()))?;

        Ok(controller.set_target(position))
    }

    /// Replaces a covering's controller, keeping its position context.
    ///
    /// Any simulation running on the old controller ends with it.
    pub fn rebuild(&mut self, name: &str) -> Result<(), PlatformError> {
        let accessory = self
            .accessories
            .get_mut(name)
            .ok_or_else(|| PlatformError::DeviceNotFound(name.to_string()))?;

        let profile: DeviceProfile = accessory.controller.profile().clone();
        accessory.controller =
            CoveringController::new(profile, accessory.radio.clone(), accessory.store.clone())?;

        tracing::info!(
            "Rebuilt covering {} at position {}",
            name,
            accessory.controller.current_position()
        );

        Ok(())
    }
}
