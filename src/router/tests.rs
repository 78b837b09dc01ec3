#[cfg(test)]
mod test_router {
    use std::net::IpAddr;
    use std::str::FromStr;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::defs::MappingRangeDef;
    use crate::dmx::{ColorComponent, ColorSample, UbKey};
    use crate::ehub::{EntityUpdate, UpdateMessage};
    use crate::mapping::MappingSnapshot;
    use crate::patch::PatchSnapshot;
    use crate::router::RouterManager;
    use crate::state::SharedState;

    fn controller() -> IpAddr {
        IpAddr::from_str("10.0.0.1").unwrap()
    }

    fn rgb_range(from: u32, to: u32, universe: u16, channel_start: u16) -> MappingRangeDef {
        MappingRangeDef {
            from,
            to,
            controller_ip: controller(),
            universe,
            channel_start,
            channels: vec![ColorComponent::R, ColorComponent::G, ColorComponent::B],
        }
    }

    fn state_with(defs: &[MappingRangeDef]) -> Arc<SharedState> {
        let mapping = MappingSnapshot::validate(defs).unwrap();
        let patch = PatchSnapshot::validate(&[], false).unwrap();
        Arc::new(SharedState::new(mapping, patch))
    }

    fn update(universe: Option<u16>, entities: Vec<EntityUpdate>) -> UpdateMessage {
        UpdateMessage { universe, entities }
    }

    fn entity(id: u32, r: u8, g: u8, b: u8) -> EntityUpdate {
        EntityUpdate {
            id,
            color: ColorSample { r, g, b, w: 0 },
        }
    }

    #[test]
    fn test_single_entity_rgb() {
        let shared = state_with(&[rgb_range(1, 1, 0, 1)]);
        let mut router = RouterManager::new(shared.clone());

        router.apply_update(&update(Some(0), vec![entity(1, 255, 128, 64)]));

        let key = UbKey { controller: controller(), universe: 0 };
        let buffer = shared.universes.get(&key).unwrap();
        let guard = buffer.lock().unwrap();

        assert!(guard.dirty);
        assert_eq!(&guard.dmx[0..3], &[255, 128, 64]);
        // Nothing outside the resolved span is touched.
        assert!(guard.dmx[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_rgbw_with_offset() {
        let defs = [MappingRangeDef {
            from: 10,
            to: 10,
            controller_ip: controller(),
            universe: 0,
            channel_start: 5,
            channels: vec![
                ColorComponent::R,
                ColorComponent::G,
                ColorComponent::B,
                ColorComponent::W,
            ],
        }];
        let shared = state_with(&defs);
        let mut router = RouterManager::new(shared.clone());

        router.apply_update(&update(
            Some(0),
            vec![EntityUpdate {
                id: 10,
                color: ColorSample { r: 1, g: 2, b: 3, w: 4 },
            }],
        ));

        let key = UbKey { controller: controller(), universe: 0 };
        let buffer = shared.universes.get(&key).unwrap();
        let guard = buffer.lock().unwrap();

        assert_eq!(&guard.dmx[0..4], &[0, 0, 0, 0]);
        assert_eq!(&guard.dmx[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_unmapped_entity_counted() {
        let shared = state_with(&[rgb_range(1, 1, 0, 1)]);
        let mut router = RouterManager::new(shared.clone());

        router.apply_update(&update(Some(0), vec![entity(2, 1, 1, 1)]));

        assert_eq!(shared.counters.unmapped_entities.load(Ordering::Relaxed), 1);
        // Nothing resolved, so no buffer was created and nothing is dirty.
        assert!(shared.universes.is_empty());
    }

    #[test]
    fn test_buffers_created_lazily() {
        let shared = state_with(&[rgb_range(1, 10, 0, 1), rgb_range(11, 20, 1, 1)]);
        let mut router = RouterManager::new(shared.clone());

        assert!(shared.universes.is_empty());

        router.apply_update(&update(Some(0), vec![entity(1, 9, 9, 9)]));
        assert_eq!(shared.universes.len(), 1);

        router.apply_update(&update(Some(0), vec![entity(11, 9, 9, 9)]));
        assert_eq!(shared.universes.len(), 2);
    }

    #[test]
    fn test_last_write_wins_within_update() {
        let shared = state_with(&[rgb_range(1, 1, 0, 1)]);
        let mut router = RouterManager::new(shared.clone());

        router.apply_update(&update(
            Some(0),
            vec![entity(1, 255, 0, 0), entity(1, 0, 255, 0)],
        ));

        let key = UbKey { controller: controller(), universe: 0 };
        let buffer = shared.universes.get(&key).unwrap();
        assert_eq!(&buffer.lock().unwrap().dmx[0..3], &[0, 255, 0]);
    }

    #[test]
    fn test_update_spanning_universes() {
        let shared = state_with(&[rgb_range(1, 10, 0, 1), rgb_range(11, 20, 7, 101)]);
        let mut router = RouterManager::new(shared.clone());

        router.apply_update(&update(
            None,
            vec![entity(2, 10, 20, 30), entity(11, 40, 50, 60)],
        ));

        let buffer = shared
            .universes
            .get(&UbKey { controller: controller(), universe: 0 })
            .unwrap();
        assert_eq!(&buffer.lock().unwrap().dmx[3..6], &[10, 20, 30]);

        let buffer = shared
            .universes
            .get(&UbKey { controller: controller(), universe: 7 })
            .unwrap();
        let guard = buffer.lock().unwrap();
        assert_eq!(&guard.dmx[100..103], &[40, 50, 60]);
        assert!(guard.dirty);
    }

    #[test]
    fn test_mapping_swap_between_updates() {
        let shared = state_with(&[rgb_range(1, 1, 0, 1)]);
        let mut router = RouterManager::new(shared.clone());

        router.apply_update(&update(Some(0), vec![entity(1, 1, 2, 3)]));

        // Re-home entity 1 to universe 5; the old buffer is pruned at swap.
        let mapping = MappingSnapshot::validate(&[rgb_range(1, 1, 5, 1)]).unwrap();
        shared.publish_mapping(mapping);
        assert!(shared
            .universes
            .get(&UbKey { controller: controller(), universe: 0 })
            .is_none());

        router.apply_update(&update(Some(0), vec![entity(1, 4, 5, 6)]));

        let buffer = shared
            .universes
            .get(&UbKey { controller: controller(), universe: 5 })
            .unwrap();
        assert_eq!(&buffer.lock().unwrap().dmx[0..3], &[4, 5, 6]);
    }
}
