//! Integration tests for sub-level arbitration with an asynchronous host

use std::collections::HashSet;

use georef::prelude::*;

/// A streaming host that applies visibility changes only when the test
/// calls `settle`, simulating loads that take multiple ticks.
#[derive(Default)]
struct DeferredLevelStreaming {
    shown: HashSet<SubLevelId>,
    pending: Vec<(SubLevelId, bool)>,
}

impl DeferredLevelStreaming {
    fn settle(&mut self) {
        for (id, visible) in self.pending.drain(..) {
            if visible {
                self.shown.insert(id);
            } else {
                self.shown.remove(&id);
            }
        }
    }
}

impl LevelStreaming for DeferredLevelStreaming {
    fn set_level_visible(&mut self, id: SubLevelId, visible: bool) {
        self.pending.push((id, visible));
    }

    fn is_level_shown(&self, id: SubLevelId) -> bool {
        self.shown.contains(&id)
    }
}

fn level(id: u32, longitude: f64, latitude: f64, radius: f64) -> SubLevel {
    SubLevel {
        id: SubLevelId(id),
        name: format!("region-{id}"),
        origin: Cartographic::from_degrees(longitude, latitude, 0.0),
        load_radius: radius,
        enabled: true,
    }
}

#[test]
fn switch_completes_over_multiple_ticks() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let mut georeference = Georeference::new();
    let mut host = DeferredLevelStreaming::default();
    let mut switcher = SubLevelSwitcher::new();

    switcher.register_sub_level(level(1, 10.0, 20.0, 1_000.0), &host);
    switcher.register_sub_level(level(2, -25.0, 15.0, 1_000.0), &host);

    // Activation of region 1 takes a tick to load.
    switcher.set_target_sub_level(Some(SubLevelId(1)), &mut georeference, &mut host);
    assert_eq!(switcher.current(), None);
    assert_eq!(switcher.state_of(SubLevelId(1)), SubLevelState::Target);

    host.settle();
    switcher.tick(&mut georeference, &mut host);
    assert_eq!(switcher.current(), Some(SubLevelId(1)));

    // Switching to region 2: region 1's unload must be observed complete
    // before region 2 claims the origin.
    switcher.clear_transition_log();
    switcher.set_target_sub_level(Some(SubLevelId(2)), &mut georeference, &mut host);
    assert_eq!(switcher.current(), Some(SubLevelId(1))); // unload in flight
    assert_eq!(
        georeference.origin().longitude_degrees().round() as i64,
        10
    ); // origin still region 1's

    host.settle();
    switcher.tick(&mut georeference, &mut host);
    assert_eq!(switcher.current(), None); // hidden, activation pending

    host.settle();
    switcher.tick(&mut georeference, &mut host);
    assert_eq!(switcher.current(), Some(SubLevelId(2)));

    // Deactivate strictly precedes the new region's origin claim.
    let log = switcher.transition_log();
    let deactivate_index = log
        .iter()
        .position(|s| *s == TransitionStep::Deactivate(SubLevelId(1)))
        .unwrap();
    let set_origin_index = log
        .iter()
        .position(|s| *s == TransitionStep::SetOrigin(SubLevelId(2)))
        .unwrap();
    let activate_index = log
        .iter()
        .position(|s| *s == TransitionStep::Activate(SubLevelId(2)))
        .unwrap();
    assert!(deactivate_index < set_origin_index);
    assert!(set_origin_index < activate_index);
}

#[test]
fn stale_in_flight_load_is_deactivated_on_completion() {
    let mut georeference = Georeference::new();
    let mut host = DeferredLevelStreaming::default();
    let mut switcher = SubLevelSwitcher::new();

    switcher.register_sub_level(level(1, 0.0, 0.0, 1_000.0), &host);
    switcher.register_sub_level(level(2, 90.0, 0.0, 1_000.0), &host);

    // Start loading region 1, then retarget before the load completes.
    switcher.set_target_sub_level(Some(SubLevelId(1)), &mut georeference, &mut host);
    switcher.set_target_sub_level(Some(SubLevelId(2)), &mut georeference, &mut host);

    // Both loads now complete; region 1's is stale.
    host.settle();
    switcher.tick(&mut georeference, &mut host);

    assert_eq!(switcher.current(), Some(SubLevelId(2)));
    assert_ne!(switcher.current(), Some(SubLevelId(1)));

    // The defensive sweep issued a hide for the stale region; once the host
    // applies it, only the current region remains shown.
    host.settle();
    assert!(!host.is_level_shown(SubLevelId(1)));
    assert!(host.is_level_shown(SubLevelId(2)));
}

#[test]
fn at_most_one_current_with_async_host() {
    let mut georeference = Georeference::new();
    let mut host = DeferredLevelStreaming::default();
    let mut switcher = SubLevelSwitcher::new();

    for id in 1..=4 {
        switcher.register_sub_level(level(id, f64::from(id) * 10.0, 0.0, 1_000.0), &host);
    }

    let targets = [
        Some(SubLevelId(1)),
        Some(SubLevelId(3)),
        None,
        Some(SubLevelId(2)),
        Some(SubLevelId(4)),
    ];

    for target in targets {
        switcher.set_target_sub_level(target, &mut georeference, &mut host);
        for _ in 0..3 {
            let current_count = switcher
                .levels()
                .iter()
                .filter(|l| switcher.state_of(l.id) == SubLevelState::Current)
                .count();
            assert!(current_count <= 1);

            host.settle();
            switcher.tick(&mut georeference, &mut host);
        }
    }

    assert_eq!(switcher.current(), Some(SubLevelId(4)));
}

#[test]
fn rapid_retarget_back_to_current_keeps_it() {
    let mut georeference = Georeference::new();
    let mut host = DeferredLevelStreaming::default();
    let mut switcher = SubLevelSwitcher::new();

    switcher.register_sub_level(level(1, 5.0, 5.0, 1_000.0), &host);
    switcher.register_sub_level(level(2, 15.0, 5.0, 1_000.0), &host);

    switcher.set_target_sub_level(Some(SubLevelId(1)), &mut georeference, &mut host);
    host.settle();
    switcher.tick(&mut georeference, &mut host);
    assert_eq!(switcher.current(), Some(SubLevelId(1)));

    // Retarget away and immediately back before the unload is observed.
    switcher.set_target_sub_level(Some(SubLevelId(2)), &mut georeference, &mut host);
    switcher.set_target_sub_level(Some(SubLevelId(1)), &mut georeference, &mut host);

    // The issued hide for region 1 eventually completes; arbitration must
    // re-activate it rather than leave nothing current.
    for _ in 0..4 {
        host.settle();
        switcher.tick(&mut georeference, &mut host);
    }

    assert_eq!(switcher.current(), Some(SubLevelId(1)));
    assert!(host.is_level_shown(SubLevelId(1)));
    assert!(!host.is_level_shown(SubLevelId(2)));
}
