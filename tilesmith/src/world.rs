//! The world model: arenas of parts plus the ordered sequences that drive
//! rendering, ticking and collision broadcasts.
//!
//! Insertion order is render and tick order. Removing a part keeps the order
//! of everything else. Deleting an object unregisters every part it owns, so
//! stale handles resolve to `None` instead of dangling.

use crate::arena::Arena;
use crate::assets::{AssetEntry, AssetId};
use crate::collision::{Collider, ColliderId, OverlapEvent, OverlapTracker};
use crate::math::Vec2;
use crate::object::{BitmapId, Capabilities, GameObject, ObjectBehavior, ObjectId, Transform};
use crate::render::{AtlasHandle, Bitmap};

/// What a registered relation tests its sender against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationTarget {
    Collider(ColliderId),
    /// Every collider in the collision sequence not owned by the sender's owner.
    AllObjects,
}

/// A `(owner, sender, target)` triple broadcast once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation {
    /// Receives the overlap callbacks, if any.
    pub owner: Option<ObjectId>,
    pub sender: ColliderId,
    pub target: RelationTarget,
}

/// Which default collision an object gets at spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultCollision {
    None,
    /// Kept while playing.
    Runtime,
    /// Installed for the editor only; disabled while playing.
    EditOnly,
}

/// Listener sequence selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listener {
    Update,
    Input,
    Render,
    GameState,
}

/// Structural change requested from inside a hook.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WorldCommand {
    Spawn { asset_id: AssetId, location: Vec2 },
    Delete(ObjectId),
}

#[derive(Default)]
struct Listeners {
    update: Vec<ObjectId>,
    input: Vec<ObjectId>,
    render: Vec<ObjectId>,
    game_state: Vec<ObjectId>,
}

impl Listeners {
    fn register(&mut self, id: ObjectId, caps: Capabilities) {
        if caps.update {
            self.update.push(id);
        }
        if caps.input {
            self.input.push(id);
        }
        if caps.render {
            self.render.push(id);
        }
        if caps.game_state {
            self.game_state.push(id);
        }
    }

    fn unregister(&mut self, id: ObjectId) {
        for list in [
            &mut self.update,
            &mut self.input,
            &mut self.render,
            &mut self.game_state,
        ] {
            list.retain(|other| *other != id);
        }
    }

    fn get(&self, kind: Listener) -> &[ObjectId] {
        match kind {
            Listener::Update => &self.update,
            Listener::Input => &self.input,
            Listener::Render => &self.render,
            Listener::GameState => &self.game_state,
        }
    }
}

/// Owner of every game object and part.
#[derive(Default)]
pub struct World {
    objects: Arena<GameObject>,
    bitmaps: Arena<Bitmap>,
    colliders: Arena<Collider>,

    object_order: Vec<ObjectId>,
    bitmap_order: Vec<BitmapId>,
    collider_order: Vec<ColliderId>,
    editor_bitmaps: Vec<BitmapId>,
    editor_colliders: Vec<ColliderId>,

    listeners: Listeners,
    relations: Vec<Relation>,
    tracker: OverlapTracker,

    commands: Vec<WorldCommand>,
    overlap_events: Vec<(ObjectId, OverlapEvent)>,
    debug_colliders: bool,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // Bitmaps.

    pub fn add_bitmap(&mut self, bitmap: Bitmap) -> BitmapId {
        let id = self.bitmaps.insert(bitmap);
        self.bitmap_order.push(id);
        id
    }

    /// Add a bitmap drawn with the editor overlays instead of the world layers.
    pub fn add_editor_bitmap(&mut self, bitmap: Bitmap) -> BitmapId {
        let id = self.bitmaps.insert(bitmap);
        self.editor_bitmaps.push(id);
        id
    }

    pub fn remove_bitmap(&mut self, id: BitmapId) -> Option<Bitmap> {
        self.bitmap_order.retain(|other| *other != id);
        self.editor_bitmaps.retain(|other| *other != id);
        self.bitmaps.remove(id)
    }

    pub fn bitmap(&self, id: BitmapId) -> Option<&Bitmap> {
        self.bitmaps.get(id)
    }

    pub fn bitmap_mut(&mut self, id: BitmapId) -> Option<&mut Bitmap> {
        self.bitmaps.get_mut(id)
    }

    /// World bitmaps in insertion order.
    pub fn bitmaps(&self) -> impl Iterator<Item = &Bitmap> {
        self.bitmap_order.iter().filter_map(|id| self.bitmaps.get(*id))
    }

    pub fn editor_bitmaps(&self) -> impl Iterator<Item = &Bitmap> {
        self.editor_bitmaps.iter().filter_map(|id| self.bitmaps.get(*id))
    }

    // Colliders.

    pub fn add_collider(&mut self, mut collider: Collider) -> ColliderId {
        collider.render_debug |= self.debug_colliders;
        let id = self.colliders.insert(collider);
        self.collider_order.push(id);
        id
    }

    /// Add a collider used by editor widgets; it is not part of the
    /// collision sequence game relations test against.
    pub fn add_editor_collider(&mut self, collider: Collider) -> ColliderId {
        let id = self.colliders.insert(collider);
        self.editor_colliders.push(id);
        id
    }

    /// Remove a collider, its relations and its overlap latches.
    pub fn remove_collider(&mut self, id: ColliderId) -> Option<Collider> {
        self.collider_order.retain(|other| *other != id);
        self.editor_colliders.retain(|other| *other != id);
        self.relations.retain(|relation| {
            relation.sender != id && relation.target != RelationTarget::Collider(id)
        });
        self.tracker.forget(id);
        self.colliders.remove(id)
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.get(id)
    }

    pub fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.colliders.get_mut(id)
    }

    /// The collision sequence in insertion order.
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.collider_order
            .iter()
            .filter_map(|id| self.colliders.get(*id).map(|collider| (*id, collider)))
    }

    pub fn editor_colliders(&self) -> impl Iterator<Item = &Collider> {
        self.editor_colliders
            .iter()
            .filter_map(|id| self.colliders.get(*id))
    }

    /// Mark every game collider, present and future, for debug outlines.
    pub fn set_debug_colliders(&mut self, enabled: bool) {
        self.debug_colliders = enabled;
        for id in &self.collider_order {
            if let Some(collider) = self.colliders.get_mut(*id) {
                collider.render_debug = enabled;
            }
        }
    }

    // Objects.

    /// Build an object from its registry entry and append its parts to the
    /// world sequences. Hooks are not run here.
    pub(crate) fn insert_object(
        &mut self,
        asset_id: AssetId,
        entry: &AssetEntry,
        atlas: Option<AtlasHandle>,
        location: Vec2,
        collision: DefaultCollision,
        behavior: Option<Box<dyn ObjectBehavior>>,
    ) -> ObjectId {
        let bitmap = self.add_bitmap(
            Bitmap::from_slot(atlas, entry.slot, entry.column, entry.row)
                .at(location)
                .on_layer(entry.render_layer),
        );
        let capabilities = behavior
            .as_ref()
            .map(|behavior| behavior.capabilities())
            .unwrap_or_default();

        let id = self.objects.insert(GameObject {
            asset_id,
            transform: Transform { location },
            size: entry.slot,
            bitmap,
            collision: None,
            player_start: entry.player_start,
            capabilities,
            behavior,
        });

        if collision != DefaultCollision::None {
            let tag = i32::try_from(asset_id).unwrap_or(i32::MAX);
            let mut collider = Collider::new(entry.slot, tag)
                .at(location)
                .with_kind(entry.collision_kind)
                .owned_by(id);
            collider.edit_only = collision == DefaultCollision::EditOnly;
            let collider = self.add_collider(collider);
            if let Some(object) = self.objects.get_mut(id) {
                object.collision = Some(collider);
            }
        }

        self.object_order.push(id);
        self.listeners.register(id, capabilities);
        log::debug!("object {id:?} created from asset {asset_id} at {location:?}");
        id
    }

    /// Unregister every part of an object and hand back the object.
    pub(crate) fn remove_object(&mut self, id: ObjectId) -> Option<GameObject> {
        let object = self.objects.remove(id)?;
        self.object_order.retain(|other| *other != id);
        self.listeners.unregister(id);
        self.relations.retain(|relation| relation.owner != Some(id));
        self.overlap_events.retain(|(owner, _)| *owner != id);
        self.remove_bitmap(object.bitmap);

        let owned: Vec<ColliderId> = self
            .collider_order
            .iter()
            .chain(&self.editor_colliders)
            .copied()
            .filter(|collider| {
                self.colliders
                    .get(*collider)
                    .is_some_and(|collider| collider.owner == Some(id))
            })
            .collect();
        for collider in owned {
            self.remove_collider(collider);
        }

        log::debug!("object {id:?} (asset {}) removed", object.asset_id);
        Some(object)
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(id)
    }

    pub fn contains_object(&self, id: ObjectId) -> bool {
        self.objects.contains(id)
    }

    /// Game objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &GameObject)> {
        self.object_order
            .iter()
            .filter_map(|id| self.objects.get(*id).map(|object| (*id, object)))
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.object_order.clone()
    }

    pub fn object_count(&self) -> usize {
        self.object_order.len()
    }

    pub fn object_location(&self, id: ObjectId) -> Option<Vec2> {
        self.objects.get(id).map(GameObject::location)
    }

    /// Move an object together with its bitmap and default collision.
    pub fn set_object_location(&mut self, id: ObjectId, location: Vec2) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        object.transform.location = location;
        let (bitmap, collision) = (object.bitmap, object.collision);

        if let Some(bitmap) = self.bitmaps.get_mut(bitmap) {
            bitmap.location = location;
        }
        if let Some(collider) = collision.and_then(|c| self.colliders.get_mut(c)) {
            collider.location = location;
        }
        true
    }

    /// Location of the first player-start marker.
    pub fn player_start(&self) -> Option<Vec2> {
        self.objects()
            .find(|(_, object)| object.player_start)
            .map(|(_, object)| object.location())
    }

    pub(crate) fn listeners(&self, kind: Listener) -> Vec<ObjectId> {
        self.listeners.get(kind).to_vec()
    }

    pub(crate) fn take_behavior(&mut self, id: ObjectId) -> Option<Box<dyn ObjectBehavior>> {
        self.objects.get_mut(id)?.behavior.take()
    }

    pub(crate) fn restore_behavior(&mut self, id: ObjectId, behavior: Box<dyn ObjectBehavior>) {
        if let Some(object) = self.objects.get_mut(id) {
            object.behavior = Some(behavior);
        }
    }

    pub(crate) fn behavior(&self, id: ObjectId) -> Option<&dyn ObjectBehavior> {
        self.objects.get(id)?.behavior.as_deref()
    }

    // Relations and broadcasts.

    pub fn register_relation(
        &mut self,
        owner: Option<ObjectId>,
        sender: ColliderId,
        target: RelationTarget,
    ) {
        let relation = Relation {
            owner,
            sender,
            target,
        };
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// One edge-triggered broadcast step for `sender` against `target`.
    pub fn broadcast(&mut self, sender: ColliderId, target: ColliderId) -> Option<OverlapEvent> {
        let sender_collider = self.colliders.get(sender)?;
        let target_collider = self.colliders.get(target)?;
        self.tracker
            .broadcast(sender, sender_collider, target, target_collider)
    }

    /// Broadcast `sender` against every collider in the collision sequence
    /// that `owner` does not own, queueing the resulting events for `owner`.
    pub fn broadcast_against_all(&mut self, owner: Option<ObjectId>, sender: ColliderId) {
        let targets: Vec<ColliderId> = self
            .collider_order
            .iter()
            .copied()
            .filter(|target| {
                owner.is_none()
                    || self
                        .colliders
                        .get(*target)
                        .is_some_and(|collider| collider.owner != owner)
            })
            .collect();
        for target in targets {
            self.broadcast_for(owner, sender, target);
        }
    }

    pub fn is_overlapping(&self, sender: ColliderId, target: ColliderId) -> bool {
        self.tracker.is_overlapping(sender, target)
    }

    /// Run every registered relation in registration order.
    pub(crate) fn broadcast_relations(&mut self) {
        let relations = self.relations.clone();
        for relation in relations {
            match relation.target {
                RelationTarget::Collider(target) => {
                    self.broadcast_for(relation.owner, relation.sender, target);
                }
                RelationTarget::AllObjects => {
                    let owner = relation
                        .owner
                        .or_else(|| self.colliders.get(relation.sender).and_then(|c| c.owner));
                    self.broadcast_against_all(owner, relation.sender);
                }
            }
        }
    }

    fn broadcast_for(&mut self, owner: Option<ObjectId>, sender: ColliderId, target: ColliderId) {
        if let (Some(event), Some(owner)) = (self.broadcast(sender, target), owner) {
            self.overlap_events.push((owner, event));
        }
    }

    pub fn queue_overlap(&mut self, owner: ObjectId, event: OverlapEvent) {
        self.overlap_events.push((owner, event));
    }

    pub(crate) fn take_overlap_events(&mut self) -> Vec<(ObjectId, OverlapEvent)> {
        std::mem::take(&mut self.overlap_events)
    }

    // Deferred structural changes.

    pub fn queue_spawn(&mut self, asset_id: AssetId, location: Vec2) {
        self.commands.push(WorldCommand::Spawn { asset_id, location });
    }

    pub fn queue_delete(&mut self, id: ObjectId) {
        if !self.commands.contains(&WorldCommand::Delete(id)) {
            self.commands.push(WorldCommand::Delete(id));
        }
    }

    pub(crate) fn take_commands(&mut self) -> Vec<WorldCommand> {
        std::mem::take(&mut self.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionKind;

    fn entry(layer: u8) -> AssetEntry {
        AssetEntry::new("Game/tiles.png", Vec2::new(32.0, 32.0)).with_render_layer(layer)
    }

    fn insert(world: &mut World, asset_id: AssetId, location: Vec2) -> ObjectId {
        world.insert_object(
            asset_id,
            &entry(0),
            Some(AtlasHandle(1)),
            location,
            DefaultCollision::EditOnly,
            None,
        )
    }

    #[test]
    fn parts_follow_the_object_location() {
        let mut world = World::new();
        let id = insert(&mut world, 3, Vec2::new(10.0, 20.0));
        world.set_object_location(id, Vec2::new(64.0, 96.0));

        let object = world.object(id).unwrap();
        let collider = world.collider(object.collision.unwrap()).unwrap();
        assert_eq!(collider.location, Vec2::new(64.0, 96.0));
        assert_eq!(collider.tag, 3);
        assert!(collider.edit_only);
        assert_eq!(
            world.bitmap(object.bitmap).unwrap().location,
            Vec2::new(64.0, 96.0)
        );
    }

    #[test]
    fn removal_keeps_remaining_order_and_drops_owned_parts() {
        let mut world = World::new();
        let a = insert(&mut world, 1, Vec2::new(0.0, 0.0));
        let b = insert(&mut world, 2, Vec2::new(32.0, 0.0));
        let c = insert(&mut world, 3, Vec2::new(64.0, 0.0));

        let extra = world.add_collider(Collider::new(Vec2::ONE, 99).owned_by(b));
        let removed = world.remove_object(b).unwrap();

        assert_eq!(world.object_ids(), vec![a, c]);
        assert!(world.bitmap(removed.bitmap).is_none());
        assert!(world.collider(removed.collision.unwrap()).is_none());
        assert!(world.collider(extra).is_none());
        assert_eq!(world.colliders().count(), 2);
        assert_eq!(world.bitmaps().count(), 2);
        assert!(world.object(b).is_none());
    }

    #[test]
    fn relations_queue_edges_for_their_owner() {
        let mut world = World::new();
        let owner = insert(&mut world, 1, Vec2::ZERO);
        let other = insert(&mut world, 2, Vec2::new(16.0, 0.0));
        let sender = world.object(owner).unwrap().collision.unwrap();
        world.register_relation(Some(owner), sender, RelationTarget::AllObjects);

        world.broadcast_relations();
        let events = world.take_overlap_events();
        assert_eq!(
            events,
            vec![(
                owner,
                OverlapEvent::Begin {
                    sender_tag: 1,
                    target_tag: 2,
                    target_owner: Some(other)
                }
            )]
        );

        world.broadcast_relations();
        assert!(world.take_overlap_events().is_empty());

        world.set_object_location(other, Vec2::new(100.0, 0.0));
        world.broadcast_relations();
        assert!(matches!(
            world.take_overlap_events().as_slice(),
            [(_, OverlapEvent::End { sender_tag: 1, target_tag: 2 })]
        ));
    }

    #[test]
    fn deleting_a_sender_drops_its_relations() {
        let mut world = World::new();
        let owner = insert(&mut world, 1, Vec2::ZERO);
        let sender = world.object(owner).unwrap().collision.unwrap();
        world.register_relation(Some(owner), sender, RelationTarget::AllObjects);
        world.register_relation(Some(owner), sender, RelationTarget::AllObjects);
        assert_eq!(world.relations().len(), 1);

        world.remove_object(owner);
        assert!(world.relations().is_empty());
    }

    #[test]
    fn player_start_is_the_first_marker() {
        let mut world = World::new();
        insert(&mut world, 1, Vec2::ZERO);
        let marker = AssetEntry::new("EngineContent/PlayerStart.png", Vec2::new(32.0, 64.0))
            .as_player_start()
            .with_collision_kind(CollisionKind::Overlap);
        world.insert_object(
            7,
            &marker,
            None,
            Vec2::new(40.0, 80.0),
            DefaultCollision::EditOnly,
            None,
        );
        assert_eq!(world.player_start(), Some(Vec2::new(40.0, 80.0)));
    }

    #[test]
    fn queued_deletes_are_deduplicated() {
        let mut world = World::new();
        let id = insert(&mut world, 1, Vec2::ZERO);
        world.queue_delete(id);
        world.queue_delete(id);
        world.queue_spawn(4, Vec2::new(1.0, 2.0));
        assert_eq!(
            world.take_commands(),
            vec![
                WorldCommand::Delete(id),
                WorldCommand::Spawn {
                    asset_id: 4,
                    location: Vec2::new(1.0, 2.0)
                }
            ]
        );
        assert!(world.take_commands().is_empty());
    }
}
