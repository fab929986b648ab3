//! Axis-aligned collision parts and edge-triggered overlap events.
//!
//! `Collider::test` is the level-triggered AABB check. `OverlapTracker` turns
//! repeated tests of a (sender, target) pair into begin/end edges: at most one
//! begin per unbroken overlap, and every begin is followed by exactly one end
//! before the next begin.

use std::collections::HashSet;

use crate::arena::Handle;
use crate::math::{Color, Rect, Vec2};
use crate::object::ObjectId;

pub type ColliderId = Handle<Collider>;

/// Tag carried by the transform gizmo.
pub const GIZMO_TAG: i32 = -50;
/// Tag carried by the mouse collider.
pub const MOUSE_TAG: i32 = -60;

/// How a collider reacts to movers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CollisionKind {
    /// Stops movement components.
    #[default]
    Block,
    /// Only reports overlaps.
    Overlap,
}

/// AABB collision part.
#[derive(Clone, Debug, PartialEq)]
pub struct Collider {
    pub location: Vec2,
    pub size: Vec2,
    pub tag: i32,
    pub ignore: Vec<i32>,
    pub disabled: bool,
    pub kind: CollisionKind,
    pub render_debug: bool,
    pub debug_color: Color,
    /// Non-owning back reference used to deliver overlap callbacks.
    pub owner: Option<ObjectId>,
    /// Installed only because the editor is active; disabled while playing.
    pub edit_only: bool,
}

impl Collider {
    pub fn new(size: Vec2, tag: i32) -> Self {
        Self {
            location: Vec2::ZERO,
            size,
            tag,
            ignore: Vec::new(),
            disabled: false,
            kind: CollisionKind::Block,
            render_debug: false,
            debug_color: Color::RED,
            owner: None,
            edit_only: false,
        }
    }

    #[must_use]
    pub fn at(mut self, location: Vec2) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: CollisionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn ignoring(mut self, tags: impl IntoIterator<Item = i32>) -> Self {
        self.ignore.extend(tags);
        self
    }

    #[must_use]
    pub fn owned_by(mut self, owner: ObjectId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.location, self.size)
    }

    /// AABB test from this collider (the sender) against `target`.
    ///
    /// Identity of the two colliders is the caller's concern; the world checks
    /// it with handles before calling this.
    pub fn test(&self, target: &Collider) -> bool {
        !self.disabled
            && !target.disabled
            && !self.ignore.contains(&target.tag)
            && self.rect().overlaps(&target.rect())
    }

    /// Level-triggered hit test against a point-sized probe.
    pub fn contains(&self, point: Vec2) -> bool {
        !self.disabled && self.rect().contains(point)
    }
}

/// An overlap edge produced by a broadcast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlapEvent {
    Begin {
        sender_tag: i32,
        target_tag: i32,
        target_owner: Option<ObjectId>,
    },
    End {
        sender_tag: i32,
        target_tag: i32,
    },
}

/// Per-pair overlap latches.
#[derive(Debug, Default)]
pub struct OverlapTracker {
    overlapping: HashSet<(ColliderId, ColliderId)>,
}

impl OverlapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one broadcast step for the `(sender, target)` pair.
    pub fn broadcast(
        &mut self,
        sender_id: ColliderId,
        sender: &Collider,
        target_id: ColliderId,
        target: &Collider,
    ) -> Option<OverlapEvent> {
        let key = (sender_id, target_id);
        let hit = sender_id != target_id && sender.test(target);
        let latched = self.overlapping.contains(&key);

        match (latched, hit) {
            (false, true) => {
                self.overlapping.insert(key);
                Some(OverlapEvent::Begin {
                    sender_tag: sender.tag,
                    target_tag: target.tag,
                    target_owner: target.owner,
                })
            }
            (true, false) => {
                self.overlapping.remove(&key);
                Some(OverlapEvent::End {
                    sender_tag: sender.tag,
                    target_tag: target.tag,
                })
            }
            _ => None,
        }
    }

    pub fn is_overlapping(&self, sender: ColliderId, target: ColliderId) -> bool {
        self.overlapping.contains(&(sender, target))
    }

    /// True when `sender` currently overlaps any target.
    pub fn sender_overlaps_any(&self, sender: ColliderId) -> bool {
        self.overlapping.iter().any(|(s, _)| *s == sender)
    }

    /// Drop every latch involving `collider` without emitting events.
    pub fn forget(&mut self, collider: ColliderId) {
        self.overlapping
            .retain(|(sender, target)| *sender != collider && *target != collider);
    }

    pub fn clear(&mut self) {
        self.overlapping.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn pair() -> (Arena<Collider>, ColliderId, ColliderId) {
        let mut arena = Arena::new();
        let a = arena.insert(Collider::new(Vec2::new(10.0, 10.0), 1));
        let b = arena.insert(Collider::new(Vec2::new(10.0, 10.0), 2).at(Vec2::new(5.0, 0.0)));
        (arena, a, b)
    }

    fn step(
        tracker: &mut OverlapTracker,
        arena: &Arena<Collider>,
        s: ColliderId,
        t: ColliderId,
    ) -> Option<OverlapEvent> {
        tracker.broadcast(s, arena.get(s).unwrap(), t, arena.get(t).unwrap())
    }

    #[test]
    fn test_is_symmetric_without_ignore_relations() {
        let (arena, a, b) = pair();
        let (ca, cb) = (arena.get(a).unwrap(), arena.get(b).unwrap());
        assert!(ca.test(cb));
        assert_eq!(ca.test(cb), cb.test(ca));

        let far = cb.clone().at(Vec2::new(10.0, 0.0));
        assert!(!ca.test(&far));
        assert_eq!(ca.test(&far), far.test(ca));
    }

    #[test]
    fn begin_and_end_fire_once_per_transition() {
        let (mut arena, a, b) = pair();
        let mut tracker = OverlapTracker::new();

        assert_eq!(
            step(&mut tracker, &arena, a, b),
            Some(OverlapEvent::Begin {
                sender_tag: 1,
                target_tag: 2,
                target_owner: None
            })
        );
        assert_eq!(step(&mut tracker, &arena, a, b), None);

        arena.get_mut(b).unwrap().location = Vec2::new(20.0, 0.0);
        assert_eq!(
            step(&mut tracker, &arena, a, b),
            Some(OverlapEvent::End {
                sender_tag: 1,
                target_tag: 2
            })
        );
        assert_eq!(step(&mut tracker, &arena, a, b), None);
        assert_eq!(step(&mut tracker, &arena, a, b), None);
    }

    #[test]
    fn begin_and_end_alternate_strictly() {
        let (mut arena, a, b) = pair();
        let mut tracker = OverlapTracker::new();
        let mut begins = 0;
        let mut ends = 0;
        let mut last_was_begin = false;

        for tick in 0..40 {
            let x = if (tick / 3) % 2 == 0 { 5.0 } else { 30.0 };
            arena.get_mut(b).unwrap().location = Vec2::new(x, 0.0);
            match step(&mut tracker, &arena, a, b) {
                Some(OverlapEvent::Begin { .. }) => {
                    assert!(!last_was_begin);
                    last_was_begin = true;
                    begins += 1;
                }
                Some(OverlapEvent::End { .. }) => {
                    assert!(last_was_begin);
                    last_was_begin = false;
                    ends += 1;
                }
                None => {}
            }
        }
        arena.get_mut(b).unwrap().location = Vec2::new(30.0, 0.0);
        if step(&mut tracker, &arena, a, b).is_some() {
            ends += 1;
        }
        assert!(begins > 0);
        assert_eq!(begins, ends);
    }

    #[test]
    fn ignored_tags_never_produce_events() {
        let (mut arena, a, b) = pair();
        arena.get_mut(a).unwrap().ignore.push(2);
        let mut tracker = OverlapTracker::new();
        for x in [5.0, 20.0, 0.0, 3.0] {
            arena.get_mut(b).unwrap().location = Vec2::new(x, 0.0);
            assert_eq!(step(&mut tracker, &arena, a, b), None);
        }
    }

    #[test]
    fn a_collider_never_overlaps_itself() {
        let (arena, a, _) = pair();
        let mut tracker = OverlapTracker::new();
        assert_eq!(step(&mut tracker, &arena, a, a), None);
    }

    #[test]
    fn disabling_either_side_ends_the_overlap() {
        let (mut arena, a, b) = pair();
        let mut tracker = OverlapTracker::new();
        assert!(step(&mut tracker, &arena, a, b).is_some());
        arena.get_mut(b).unwrap().disabled = true;
        assert!(matches!(
            step(&mut tracker, &arena, a, b),
            Some(OverlapEvent::End { .. })
        ));
    }

    #[test]
    fn one_sender_tracks_many_targets_independently() {
        let mut arena = Arena::new();
        let s = arena.insert(Collider::new(Vec2::new(10.0, 10.0), 1));
        let t1 = arena.insert(Collider::new(Vec2::new(10.0, 10.0), 2).at(Vec2::new(5.0, 0.0)));
        let t2 = arena.insert(Collider::new(Vec2::new(10.0, 10.0), 3).at(Vec2::new(0.0, 5.0)));
        let mut tracker = OverlapTracker::new();

        assert!(step(&mut tracker, &arena, s, t1).is_some());
        assert!(step(&mut tracker, &arena, s, t2).is_some());
        assert!(tracker.is_overlapping(s, t1));
        assert!(tracker.is_overlapping(s, t2));

        tracker.forget(t1);
        assert!(!tracker.is_overlapping(s, t1));
        assert!(tracker.sender_overlaps_any(s));
    }
}
