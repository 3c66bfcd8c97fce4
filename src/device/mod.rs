//! Simulated peripherals
//!
//! The device set is closed: Keyboard, Mouse and Printer, each with a fixed
//! priority. [`device_actor`] drives one background task per device that
//! raises interrupt requests at random intervals.
//!
//! ```text
//! DeviceActor ──request_interrupt──► InterruptController
//! ```

pub mod device_actor;

pub use device_actor::{DeviceActor, DeviceHandle, DeviceSettings};

use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Interrupt sources known to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    Printer,
}

impl DeviceKind {
    /// Number of devices in the closed set
    pub const COUNT: usize = 3;

    /// Scan order for the controller, highest priority first
    pub const DESCENDING_PRIORITY: [DeviceKind; DeviceKind::COUNT] =
        [DeviceKind::Keyboard, DeviceKind::Mouse, DeviceKind::Printer];

    /// Fixed dispatch priority, higher wins
    pub const fn priority(self) -> u8 {
        match self {
            DeviceKind::Keyboard => 2,
            DeviceKind::Mouse => 1,
            DeviceKind::Printer => 0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DeviceKind::Keyboard => "Keyboard",
            DeviceKind::Mouse => "Mouse",
            DeviceKind::Printer => "Printer",
        }
    }

    /// Maps a control panel index (1=Keyboard, 2=Mouse, 3=Printer) to a device
    pub fn from_index(index: u8) -> Result<Self, SimulationError> {
        match index {
            1 => Ok(DeviceKind::Keyboard),
            2 => Ok(DeviceKind::Mouse),
            3 => Ok(DeviceKind::Printer),
            other => Err(SimulationError::InvalidDeviceIndex(other)),
        }
    }

    // Storage slot inside a DeviceTable
    const fn slot(self) -> usize {
        match self {
            DeviceKind::Keyboard => 0,
            DeviceKind::Mouse => 1,
            DeviceKind::Printer => 2,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-size per-device storage, one value for every [`DeviceKind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceTable<T> {
    slots: [T; DeviceKind::COUNT],
}

impl<T: Copy> DeviceTable<T> {
    pub fn filled(value: T) -> Self {
        Self {
            slots: [value; DeviceKind::COUNT],
        }
    }

    /// Iterates entries in descending priority order
    pub fn iter(&self) -> impl Iterator<Item = (DeviceKind, T)> + '_ {
        DeviceKind::DESCENDING_PRIORITY
            .into_iter()
            .map(move |kind| (kind, self[kind]))
    }
}

impl<T> Index<DeviceKind> for DeviceTable<T> {
    type Output = T;

    fn index(&self, kind: DeviceKind) -> &T {
        &self.slots[kind.slot()]
    }
}

impl<T> IndexMut<DeviceKind> for DeviceTable<T> {
    fn index_mut(&mut self, kind: DeviceKind) -> &mut T {
        &mut self.slots[kind.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_order_is_strictly_descending() {
        let priorities: Vec<u8> = DeviceKind::DESCENDING_PRIORITY
            .iter()
            .map(|kind| kind.priority())
            .collect();
        assert_eq!(priorities, vec![2, 1, 0]);
    }

    #[test]
    fn control_panel_indices_map_to_devices() {
        assert_eq!(DeviceKind::from_index(1).unwrap(), DeviceKind::Keyboard);
        assert_eq!(DeviceKind::from_index(2).unwrap(), DeviceKind::Mouse);
        assert_eq!(DeviceKind::from_index(3).unwrap(), DeviceKind::Printer);
        assert!(matches!(
            DeviceKind::from_index(4),
            Err(SimulationError::InvalidDeviceIndex(4))
        ));
        assert!(DeviceKind::from_index(0).is_err());
    }

    #[test]
    fn table_slots_are_independent() {
        let mut table = DeviceTable::filled(false);
        table[DeviceKind::Mouse] = true;

        assert!(!table[DeviceKind::Keyboard]);
        assert!(table[DeviceKind::Mouse]);
        assert!(!table[DeviceKind::Printer]);

        let order: Vec<DeviceKind> = table.iter().map(|(kind, _)| kind).collect();
        assert_eq!(order, DeviceKind::DESCENDING_PRIORITY.to_vec());
    }
}
