//! Screen-space proximity between the pointer and the pick candidates.

use bevy::prelude::*;

use crate::{
    PickerSettings,
    candidate::Candidate,
    candidate_index::still_matches,
    pick_field::PickTarget,
};

/// Maps world positions into the view the pointer moves over.
pub trait ScreenProjection {
    /// Viewport position in `x`/`y` and view depth in `z`, or `None` if the
    /// point is behind the camera.
    fn world_to_screen(&self, position: Vec3) -> Option<Vec3>;
}

pub struct CameraProjection<'a> {
    pub camera: &'a Camera,
    pub transform: &'a GlobalTransform,
}

impl ScreenProjection for CameraProjection<'_> {
    fn world_to_screen(&self, position: Vec3) -> Option<Vec3> {
        self.camera
            .world_to_viewport_with_depth(self.transform, position)
            .ok()
            .filter(|screen| screen.z > 0.0)
    }
}

/// A candidate in front of the camera, with its positions for this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projected {
    /// Index into the candidate list.
    pub index: usize,
    pub screen: Vec3,
    pub world: Vec3,
}

impl Projected {
    fn weighted(&self, depth_weight: f32) -> Vec3 {
        self.screen.truncate().extend(self.screen.z * depth_weight)
    }
}

/// Project every candidate that is still valid and in front of the camera.
pub fn project_candidates(
    world: &World,
    candidates: &[Candidate],
    target: &PickTarget,
    projection: &impl ScreenProjection,
) -> Vec<Projected> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, candidate)| still_matches(world, candidate, target))
        .filter_map(|(index, candidate)| {
            let position = candidate.world_position(world)?;
            let screen = projection.world_to_screen(position)?;
            Some(Projected {
                index,
                screen,
                world: position,
            })
        })
        .collect()
}

/// The candidate closest to `pointer`. The pointer sits at depth zero, so a
/// candidate's depth adds `depth * depth_weight` to its distance. On ties the
/// first candidate wins.
pub fn find_best(projected: &[Projected], pointer: Vec2, depth_weight: f32) -> Option<Projected> {
    let pointer = pointer.extend(0.0);
    let mut best: Option<(f32, Projected)> = None;
    for candidate in projected {
        let distance = candidate.weighted(depth_weight).distance(pointer);
        if best.is_none_or(|(min, _)| distance < min) {
            best = Some((distance, *candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Every candidate strictly within `group_distance` of `best` on screen,
/// `best` included.
pub fn find_nearby(
    projected: &[Projected],
    best: &Projected,
    group_distance: f32,
    depth_weight: f32,
) -> Vec<Projected> {
    let anchor = best.weighted(depth_weight);
    projected
        .iter()
        .filter(|candidate| {
            candidate.index == best.index
                || candidate.weighted(depth_weight).distance(anchor) < group_distance
        })
        .copied()
        .collect()
}

/// Order nearby candidates by world distance to `best`, then hierarchy order.
/// Candidates on the same entity share a hierarchy order and fall back to
/// their label. The sort is stable, so full ties keep enumeration order.
pub fn sort_nearby(nearby: &mut [Projected], best: &Projected, candidates: &[Candidate]) {
    nearby.sort_by(|a, b| {
        let distance_a = a.world.distance(best.world);
        let distance_b = b.world.distance(best.world);
        let (ca, cb) = (&candidates[a.index], &candidates[b.index]);
        distance_a
            .total_cmp(&distance_b)
            .then_with(|| ca.hierarchy_order.cmp(&cb.hierarchy_order))
            .then_with(|| ca.display_label.cmp(&cb.display_label))
    });
}

/// Best candidate and its sorted neighbourhood, as candidate indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Proximity {
    pub best: Option<usize>,
    pub nearby: Vec<usize>,
}

pub fn refresh_proximity(
    world: &World,
    candidates: &[Candidate],
    target: &PickTarget,
    projection: &impl ScreenProjection,
    pointer: Vec2,
    settings: &PickerSettings,
) -> Proximity {
    let projected = project_candidates(world, candidates, target, projection);
    let Some(best) = find_best(&projected, pointer, settings.depth_weight) else {
        return Proximity::default();
    };
    let mut nearby = find_nearby(&projected, &best, settings.group_distance, settings.depth_weight);
    sort_nearby(&mut nearby, &best, candidates);
    Proximity {
        best: Some(best.index),
        nearby: nearby.into_iter().map(|candidate| candidate.index).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pick_field::PickedObject;
    use bevy::ecs::reflect::AppTypeRegistry;

    /// Screen position equals world `x`/`y`, depth equals world `z`.
    struct Flat;

    impl ScreenProjection for Flat {
        fn world_to_screen(&self, position: Vec3) -> Option<Vec3> {
            (position.z >= 0.0).then_some(position)
        }
    }

    fn scene(positions: &[(Vec3, u32)]) -> (World, Vec<Candidate>) {
        let mut world = World::new();
        world.init_resource::<AppTypeRegistry>();
        let candidates = positions
            .iter()
            .enumerate()
            .map(|(i, &(position, order))| {
                let entity = world.spawn(GlobalTransform::from_translation(position)).id();
                Candidate::from_parts(
                    PickedObject::node(entity),
                    entity,
                    order,
                    format!("c{i}"),
                    format!("c{i}"),
                )
            })
            .collect();
        (world, candidates)
    }

    fn orders(candidates: &[Candidate], indices: &[usize]) -> Vec<u32> {
        indices
            .iter()
            .map(|&i| u32::try_from(&candidates[i].hierarchy_order).unwrap())
            .collect()
    }

    #[test]
    fn best_is_closest_and_nearby_groups_around_it() {
        // Pointer distances 30, 3 and ~24; only the last is within reach of the best.
        let (world, candidates) = scene(&[
            (Vec3::new(-30.0, 0.0, 0.0), 5),
            (Vec3::new(3.0, 0.0, 0.0), 12),
            (Vec3::new(3.0, 24.0, 0.0), 40),
        ]);
        let proximity = refresh_proximity(
            &world,
            &candidates,
            &PickTarget::Node,
            &Flat,
            Vec2::ZERO,
            &PickerSettings::default(),
        );
        assert_eq!(proximity.best.map(|i| orders(&candidates, &[i])[0]), Some(12));
        assert_eq!(orders(&candidates, &proximity.nearby), vec![12, 40]);
    }

    #[test]
    fn candidates_behind_the_camera_are_ignored() {
        let (world, candidates) = scene(&[
            (Vec3::new(0.0, 0.0, -1.0), 1),
            (Vec3::new(10.0, 0.0, 0.0), 2),
        ]);
        let proximity = refresh_proximity(
            &world,
            &candidates,
            &PickTarget::Node,
            &Flat,
            Vec2::ZERO,
            &PickerSettings::default(),
        );
        assert_eq!(proximity.best, Some(1));
        assert_eq!(proximity.nearby, vec![1]);
    }

    #[test]
    fn depth_counts_a_tenth() {
        let (world, candidates) = scene(&[
            (Vec3::new(5.0, 0.0, 100.0), 1),
            (Vec3::new(8.0, 0.0, 0.0), 2),
        ]);
        let projected = project_candidates(&world, &candidates, &PickTarget::Node, &Flat);
        // 5 laterally + 10 from depth is farther than 8 laterally.
        assert_eq!(find_best(&projected, Vec2::ZERO, 0.1).map(|p| p.index), Some(1));
        assert_eq!(find_best(&projected, Vec2::ZERO, 0.0).map(|p| p.index), Some(0));
    }

    #[test]
    fn first_minimum_wins_ties() {
        let (world, candidates) = scene(&[
            (Vec3::new(-4.0, 0.0, 0.0), 9),
            (Vec3::new(4.0, 0.0, 0.0), 1),
        ]);
        let projected = project_candidates(&world, &candidates, &PickTarget::Node, &Flat);
        assert_eq!(find_best(&projected, Vec2::ZERO, 0.1).map(|p| p.index), Some(0));
    }

    #[test]
    fn nearby_is_sorted_by_distance_then_hierarchy() {
        let (world, candidates) = scene(&[
            (Vec3::new(0.0, 0.0, 0.0), 7),
            (Vec3::new(10.0, 0.0, 0.0), 30),
            (Vec3::new(-10.0, 0.0, 0.0), 20),
            (Vec3::new(0.0, 5.0, 0.0), 50),
        ]);
        let proximity = refresh_proximity(
            &world,
            &candidates,
            &PickTarget::Node,
            &Flat,
            Vec2::ZERO,
            &PickerSettings::default(),
        );
        assert_eq!(orders(&candidates, &proximity.nearby), vec![7, 50, 20, 30]);
        assert_eq!(proximity.nearby[0], proximity.best.unwrap());
    }

    #[test]
    fn stale_candidates_are_skipped() {
        let (mut world, candidates) = scene(&[
            (Vec3::new(0.0, 0.0, 0.0), 1),
            (Vec3::new(1.0, 0.0, 0.0), 2),
        ]);
        world.despawn(candidates[0].anchor);
        let proximity = refresh_proximity(
            &world,
            &candidates,
            &PickTarget::Node,
            &Flat,
            Vec2::ZERO,
            &PickerSettings::default(),
        );
        assert_eq!(proximity.best, Some(1));
        assert_eq!(proximity.nearby, vec![1]);
    }

    #[test]
    fn no_candidates_no_best() {
        let (world, candidates) = scene(&[]);
        let proximity = refresh_proximity(
            &world,
            &candidates,
            &PickTarget::Node,
            &Flat,
            Vec2::ZERO,
            &PickerSettings::default(),
        );
        assert_eq!(proximity, Proximity::default());
    }
}
