//! Queue family resolution.

use ash::vk;
use std::collections::BTreeSet;

use crate::capabilities::DeviceProbe;
use crate::error::Result;

/// Graphics and present queue family indices of one device.
///
/// The two indices are resolved independently and may be equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Resolve indices from `families`, asking `supports_present` about each
    /// candidate family.
    ///
    /// The present query is only issued for families that have queues, and
    /// only while no present family has been found. If the present family can
    /// also do graphics it serves both, even when an earlier family was already
    /// graphics-capable. Scanning stops once both indices are known.
    pub fn resolve<F>(families: &[vk::QueueFamilyProperties], mut supports_present: F) -> Result<Self>
    where
        F: FnMut(u32) -> Result<bool>,
    {
        let mut indices = Self::default();

        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family.queue_count == 0 {
                continue;
            }

            let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            if indices.graphics.is_none() && graphics {
                indices.graphics = Some(i);
            }

            if indices.present.is_none() && supports_present(i)? {
                indices.present = Some(i);
                // Earlier graphics families cannot present; share this one.
                if graphics {
                    indices.graphics = Some(i);
                }
            }

            if indices.is_complete() {
                break;
            }
        }

        tracing::debug!(
            "Queue families: graphics = {:?}, present = {:?}",
            indices.graphics,
            indices.present
        );
        Ok(indices)
    }

    /// Resolve indices for `device` through a probe.
    pub fn find<P: DeviceProbe + ?Sized>(probe: &P, device: vk::PhysicalDevice) -> Result<Self> {
        let families = probe.queue_families(device);
        Self::resolve(&families, |family| probe.supports_present(device, family))
    }

    /// Both a graphics and a present family were found.
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }
}

/// Resolved indices of a complete [`QueueFamilyIndices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// `None` unless both indices are present.
    pub fn from_indices(indices: QueueFamilyIndices) -> Option<Self> {
        Some(Self {
            graphics: indices.graphics?,
            present: indices.present?,
        })
    }

    /// Distinct family indices, ascending. One queue is requested per entry.
    pub fn unique(&self) -> BTreeSet<u32> {
        BTreeSet::from([self.graphics, self.present])
    }

    /// Whether graphics and present use different families.
    pub fn is_split(&self) -> bool {
        self.graphics != self.present
    }

    /// Image sharing mode and the family list to pass with it.
    ///
    /// Split families share swapchain images concurrently; a single family
    /// owns them exclusively and passes no list.
    pub fn sharing(&self) -> (vk::SharingMode, Vec<u32>) {
        if self.is_split() {
            (vk::SharingMode::CONCURRENT, vec![self.graphics, self.present])
        } else {
            (vk::SharingMode::EXCLUSIVE, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::mock::{family, MockDevice, MockProbe};
    use crate::error::GpuError;

    fn resolve_with(families: &[vk::QueueFamilyProperties], present: &[u32]) -> QueueFamilyIndices {
        QueueFamilyIndices::resolve(families, |i| Ok(present.contains(&i))).unwrap()
    }

    #[test]
    fn single_family_serves_both() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 4)];
        let indices = resolve_with(&families, &[0]);
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, Some(0));
        assert!(indices.is_complete());
        let families = QueueFamilies::from_indices(indices).unwrap();
        assert_eq!(families.unique().len(), 1);
    }

    #[test]
    fn graphics_and_present_tracked_independently() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
        ];
        let indices = resolve_with(&families, &[1]);
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, Some(1));
        let families = QueueFamilies::from_indices(indices).unwrap();
        assert!(families.is_split());
        assert_eq!(families.unique().into_iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn first_matching_family_wins() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        let indices = resolve_with(&families, &[1, 2]);
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(1));
    }

    #[test]
    fn present_family_with_graphics_serves_both() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        let indices = resolve_with(&families, &[1]);
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(1));

        let families = QueueFamilies::from_indices(indices).unwrap();
        assert!(!families.is_split());
        assert_eq!(families.sharing(), (vk::SharingMode::EXCLUSIVE, vec![]));
    }

    #[test]
    fn graphics_stays_put_when_present_family_lacks_it() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        let indices = resolve_with(&families, &[1, 2]);
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, Some(1));
    }

    #[test]
    fn empty_families_are_skipped() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 0),
            family(vk::QueueFlags::GRAPHICS, 2),
        ];
        let indices = resolve_with(&families, &[0, 1]);
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(1));
    }

    #[test]
    fn missing_present_is_incomplete() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];
        let indices = resolve_with(&families, &[]);
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, None);
        assert!(!indices.is_complete());
        assert!(QueueFamilies::from_indices(indices).is_none());
    }

    #[test]
    fn indices_stay_in_range() {
        let layouts: [&[vk::QueueFamilyProperties]; 3] = [
            &[],
            &[family(vk::QueueFlags::COMPUTE, 1)],
            &[
                family(vk::QueueFlags::COMPUTE, 1),
                family(vk::QueueFlags::GRAPHICS, 1),
                family(vk::QueueFlags::TRANSFER, 1),
            ],
        ];
        for families in layouts {
            let indices = resolve_with(families, &[0, 2]);
            for index in [indices.graphics, indices.present].into_iter().flatten() {
                assert!((index as usize) < families.len());
            }
        }
    }

    #[test]
    fn scanning_stops_once_complete() {
        let mut device = MockDevice::suitable("gpu");
        device.families = vec![
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::GRAPHICS, 1),
        ];
        device.present_families = vec![0, 1, 2];
        let probe = MockProbe::new(vec![device]);
        let handle = probe.handles()[0];

        let indices = QueueFamilyIndices::find(&probe, handle).unwrap();
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(probe.present_queries.borrow().len(), 1);
    }

    #[test]
    fn present_query_failure_propagates() {
        let mut device = MockDevice::suitable("gpu");
        device.fail_present_query = true;
        let probe = MockProbe::new(vec![device]);
        let handle = probe.handles()[0];

        let err = QueueFamilyIndices::find(&probe, handle).unwrap_err();
        assert!(matches!(err, GpuError::Query { .. }));
    }

    #[test]
    fn sharing_mode_follows_family_split() {
        let same = QueueFamilies {
            graphics: 0,
            present: 0,
        };
        assert_eq!(same.sharing(), (vk::SharingMode::EXCLUSIVE, vec![]));

        let split = QueueFamilies {
            graphics: 0,
            present: 2,
        };
        assert_eq!(split.sharing(), (vk::SharingMode::CONCURRENT, vec![0, 2]));
    }
}
