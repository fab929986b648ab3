use crate::collision::{Collider, ColliderId, GIZMO_TAG};
use crate::math::{Rect, Vec2};
use crate::object::{BitmapId, ObjectId};
use crate::render::{AtlasHandle, Bitmap};
use crate::world::World;

pub const GIZMO_SIZE: Vec2 = Vec2 { x: 32.0, y: 32.0 };

/// Pick-and-drag handle that moves the selected object on a snap grid.
#[derive(Debug)]
pub struct Gizmo {
    bitmap: BitmapId,
    collider: ColliderId,
    mouse: ColliderId,
    snap: f32,
    selected: Option<ObjectId>,
    click_offset: Vec2,
    can_drag: bool,
    hovering_gizmo: bool,
    hovered: Vec<ObjectId>,
}

impl Gizmo {
    pub fn new(
        world: &mut World,
        atlas: Option<AtlasHandle>,
        mouse: ColliderId,
        snap: f32,
    ) -> Self {
        let mut bitmap = Bitmap::new(atlas, Rect::new(Vec2::ZERO, GIZMO_SIZE));
        bitmap.suppressed = true;
        let mut collider = Collider::new(GIZMO_SIZE, GIZMO_TAG);
        collider.disabled = true;

        Self {
            bitmap: world.add_editor_bitmap(bitmap),
            collider: world.add_editor_collider(collider),
            mouse,
            snap,
            selected: None,
            click_offset: Vec2::ZERO,
            can_drag: false,
            hovering_gizmo: false,
            hovered: Vec::new(),
        }
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn is_dragging(&self) -> bool {
        self.can_drag
    }

    pub fn is_visible(&self, world: &World) -> bool {
        world.bitmap(self.bitmap).is_some_and(|bitmap| !bitmap.suppressed)
    }

    pub fn location(&self, world: &World) -> Vec2 {
        world
            .bitmap(self.bitmap)
            .map(|bitmap| bitmap.location)
            .unwrap_or_default()
    }

    /// Objects currently under the cursor, in world order.
    pub fn hovered(&self) -> &[ObjectId] {
        &self.hovered
    }

    /// Per-tick editor update. Returns true when the selection moved.
    pub fn update(&mut self, world: &mut World, mouse: Vec2, left_down: bool) -> bool {
        if self.selected.is_some_and(|id| !world.contains_object(id)) {
            self.reset(world);
        }
        self.refresh_hover(world);

        let Some(selected) = self.selected else {
            return false;
        };
        if !(left_down && self.can_drag) {
            return false;
        }

        let target = (mouse + self.click_offset).snapped(self.snap);
        if target == self.location(world) {
            return false;
        }
        self.place(world, target);
        let offset = self.object_offset(world, selected);
        world.set_object_location(selected, target - offset)
    }

    pub fn on_mouse_down(&mut self, world: &mut World, mouse: Vec2) {
        self.refresh_hover(world);
        self.click_offset = self.location(world) - mouse;

        if !self.hovering_gizmo && self.hovered.is_empty() {
            self.reset(world);
            return;
        }
        if self.hovering_gizmo {
            self.can_drag = true;
        }

        if let Some(pick) = self.pick(world) {
            if self.selected != Some(pick) {
                self.select(world, pick, mouse);
            }
        }
    }

    pub fn on_mouse_up(&mut self) {
        self.can_drag = false;
    }

    /// Select `id`, show the gizmo over it and re-test the cursor against the
    /// new gizmo location so a drag can start right away.
    pub fn select(&mut self, world: &mut World, id: ObjectId, mouse: Vec2) {
        let Some(location) = world.object_location(id) else {
            return;
        };
        self.selected = Some(id);
        let gizmo_location = location + self.object_offset(world, id);
        self.place(world, gizmo_location);
        self.set_visible(world, true);

        self.click_offset = gizmo_location - mouse;
        self.can_drag = Rect::new(gizmo_location, GIZMO_SIZE).contains(mouse);
        self.refresh_hover(world);
    }

    /// Hide the gizmo and drop the selection.
    pub fn reset(&mut self, world: &mut World) {
        self.selected = None;
        self.can_drag = false;
        self.hovering_gizmo = false;
        self.set_visible(world, false);
    }

    fn refresh_hover(&mut self, world: &mut World) {
        world.broadcast(self.mouse, self.collider);
        self.hovering_gizmo = world.is_overlapping(self.mouse, self.collider);

        let candidates: Vec<(ObjectId, _)> = world
            .objects()
            .filter_map(|(id, object)| object.collision.map(|collision| (id, collision)))
            .collect();
        self.hovered.clear();
        for (id, collision) in candidates {
            world.broadcast(self.mouse, collision);
            if world.is_overlapping(self.mouse, collision) {
                self.hovered.push(id);
            }
        }
    }

    // Highest render layer wins; later insertion breaks ties.
    fn pick(&self, world: &World) -> Option<ObjectId> {
        let mut best: Option<(u8, ObjectId)> = None;
        for id in &self.hovered {
            let Some(layer) = world
                .object(*id)
                .and_then(|object| world.bitmap(object.bitmap))
                .map(|bitmap| bitmap.render_layer)
            else {
                continue;
            };
            if best.map_or(true, |(top, _)| layer >= top) {
                best = Some((layer, *id));
            }
        }
        best.map(|(_, id)| id)
    }

    // Gizmo location minus object location when centered over the object.
    fn object_offset(&self, world: &World, id: ObjectId) -> Vec2 {
        world
            .object(id)
            .map(|object| (object.size - GIZMO_SIZE) / 2.0)
            .unwrap_or_default()
    }

    fn place(&self, world: &mut World, location: Vec2) {
        if let Some(bitmap) = world.bitmap_mut(self.bitmap) {
            bitmap.location = location;
        }
        if let Some(collider) = world.collider_mut(self.collider) {
            collider.location = location;
        }
    }

    fn set_visible(&self, world: &mut World, visible: bool) {
        if let Some(bitmap) = world.bitmap_mut(self.bitmap) {
            bitmap.suppressed = !visible;
        }
        if let Some(collider) = world.collider_mut(self.collider) {
            collider.disabled = !visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetEntry;
    use crate::collision::MOUSE_TAG;
    use crate::world::DefaultCollision;

    struct Rig {
        world: World,
        mouse: ColliderId,
        gizmo: Gizmo,
    }

    impl Rig {
        fn new(snap: f32) -> Self {
            let mut world = World::new();
            let mouse = world.add_editor_collider(Collider::new(Vec2::ONE, MOUSE_TAG));
            let gizmo = Gizmo::new(&mut world, None, mouse, snap);
            Self { world, mouse, gizmo }
        }

        fn object(&mut self, asset_id: u32, location: Vec2, layer: u8) -> ObjectId {
            let entry =
                AssetEntry::new("Game/tiles.png", Vec2::new(32.0, 32.0)).with_render_layer(layer);
            self.world
                .insert_object(asset_id, &entry, None, location, DefaultCollision::EditOnly, None)
        }

        fn cursor(&mut self, at: Vec2) {
            self.world.collider_mut(self.mouse).unwrap().location = at;
        }

        fn click(&mut self, at: Vec2) {
            self.cursor(at);
            self.gizmo.on_mouse_down(&mut self.world, at);
        }

        fn drag_to(&mut self, at: Vec2) -> bool {
            self.cursor(at);
            self.gizmo.update(&mut self.world, at, true)
        }
    }

    #[test]
    fn drag_snaps_selection_to_grid() {
        let mut rig = Rig::new(10.0);
        let id = rig.object(5, Vec2::new(100.0, 100.0), 0);

        rig.click(Vec2::new(100.0, 100.0));
        assert_eq!(rig.gizmo.selected(), Some(id));
        assert!(rig.gizmo.is_dragging());

        assert!(rig.drag_to(Vec2::new(127.0, 143.0)));
        assert_eq!(rig.world.object_location(id), Some(Vec2::new(120.0, 140.0)));
        assert!(!rig.drag_to(Vec2::new(128.0, 149.0)));

        for (x, y) in [(133.0, 171.0), (201.5, 99.0), (7.0, 13.0)] {
            rig.drag_to(Vec2::new(x, y));
            let at = rig.gizmo.location(&rig.world);
            assert_eq!(at.x % 10.0, 0.0);
            assert_eq!(at.y % 10.0, 0.0);
        }
    }

    #[test]
    fn releasing_the_mouse_stops_dragging() {
        let mut rig = Rig::new(10.0);
        let id = rig.object(5, Vec2::new(100.0, 100.0), 0);
        rig.click(Vec2::new(100.0, 100.0));
        rig.gizmo.on_mouse_up();
        assert!(!rig.drag_to(Vec2::new(150.0, 150.0)));
        assert_eq!(rig.world.object_location(id), Some(Vec2::new(100.0, 100.0)));
    }

    #[test]
    fn clicking_empty_space_resets_the_gizmo() {
        let mut rig = Rig::new(10.0);
        rig.object(5, Vec2::new(100.0, 100.0), 0);
        rig.click(Vec2::new(110.0, 110.0));
        assert!(rig.gizmo.is_visible(&rig.world));

        rig.click(Vec2::new(500.0, 500.0));
        assert_eq!(rig.gizmo.selected(), None);
        assert!(!rig.gizmo.is_visible(&rig.world));
    }

    #[test]
    fn pick_prefers_higher_layers_then_later_objects() {
        let mut rig = Rig::new(10.0);
        let high = rig.object(1, Vec2::new(0.0, 0.0), 4);
        let _low = rig.object(2, Vec2::new(8.0, 8.0), 1);
        rig.click(Vec2::new(16.0, 16.0));
        assert_eq!(rig.gizmo.selected(), Some(high));

        let mut rig = Rig::new(10.0);
        let _first = rig.object(1, Vec2::new(0.0, 0.0), 2);
        let second = rig.object(2, Vec2::new(8.0, 8.0), 2);
        rig.click(Vec2::new(16.0, 16.0));
        assert_eq!(rig.gizmo.selected(), Some(second));
    }

    #[test]
    fn larger_objects_keep_the_gizmo_centered() {
        let mut rig = Rig::new(8.0);
        let entry = AssetEntry::new("Game/big.png", Vec2::new(64.0, 64.0));
        let id = rig
            .world
            .insert_object(
                3,
                &entry,
                None,
                Vec2::new(64.0, 64.0),
                DefaultCollision::EditOnly,
                None,
            );

        rig.click(Vec2::new(100.0, 100.0));
        assert_eq!(rig.gizmo.location(&rig.world), Vec2::new(80.0, 80.0));
        assert!(rig.gizmo.is_dragging());

        rig.drag_to(Vec2::new(116.0, 100.0));
        assert_eq!(rig.gizmo.location(&rig.world), Vec2::new(96.0, 80.0));
        assert_eq!(rig.world.object_location(id), Some(Vec2::new(80.0, 64.0)));
    }

    #[test]
    fn deleted_selection_hides_the_gizmo() {
        let mut rig = Rig::new(10.0);
        let id = rig.object(5, Vec2::new(100.0, 100.0), 0);
        rig.click(Vec2::new(100.0, 100.0));
        rig.world.remove_object(id);
        assert!(!rig.gizmo.update(&mut rig.world, Vec2::new(140.0, 140.0), true));
        assert_eq!(rig.gizmo.selected(), None);
    }
}
