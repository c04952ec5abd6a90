use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{color::Color, CoupleId};

pub type ItemId = i64;

pub const POSITION_MIN: f64 = 0.0;
pub const POSITION_MAX: f64 = 100.0;
pub const DEFAULT_POSITION: f64 = 50.0;
pub const HEIGHT_MAX: i32 = 20;
pub const SCALE_MIN: f64 = 0.25;
pub const SCALE_MAX: f64 = 2.0;
pub const DEFAULT_SCALE: f64 = 1.0;
pub const LAYER_LIMIT: i64 = 1000;
pub const TILT_LIMIT: f64 = 60.0;

/// One decorative element placed on a couple's corner canvas
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CanvasItem {
    pub id: ItemId,
    pub couple_id: CoupleId,
    pub item_key: String,
    /// Horizontal position, percent of canvas width
    pub x: f64,
    /// Vertical position, percent of canvas height
    pub y: f64,
    /// Height tier
    pub z: i32,
    pub rotation: i32,
    pub scale: f64,
    /// Stacking key; items render by ascending layer, then id
    pub layer: i64,
    pub tilt_x: f64,
    pub tilt_y: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub color: Option<Color>,
    pub created_at: DateTime<Utc>,
}

impl CanvasItem {
    /// Render order key
    pub fn stacking_key(&self) -> (i64, ItemId) {
        (self.layer, self.id)
    }
}

/// A normalized item ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewCanvasItem {
    pub item_key: String,
    pub x: f64,
    pub y: f64,
    pub z: i32,
    pub rotation: i32,
    pub scale: f64,
}

impl NewCanvasItem {
    /// Builds an item at identity transform. Placement values follow the same
    /// rules as the matching setters.
    pub fn new(
        item_key: String,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        rotation: Option<f64>,
        scale: Option<f64>,
    ) -> Self {
        Self {
            item_key,
            x: clamp_position(x.unwrap_or(DEFAULT_POSITION)),
            y: clamp_position(y.unwrap_or(DEFAULT_POSITION)),
            z: clamp_height(z.unwrap_or(0.0).round() as i64),
            rotation: normalize_rotation(rotation.unwrap_or(0.0)),
            scale: clamp_scale(scale),
        }
    }

    pub fn into_item(self, id: ItemId, couple_id: CoupleId, created_at: DateTime<Utc>) -> CanvasItem {
        CanvasItem {
            id,
            couple_id,
            item_key: self.item_key,
            x: self.x,
            y: self.y,
            z: self.z,
            rotation: self.rotation,
            scale: self.scale,
            layer: 0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            flip_x: false,
            flip_y: false,
            color: None,
            created_at,
        }
    }
}

/// A single transform applied to an existing item.
///
/// Values arrive already reduced to `Option<f64>` (absent or non-finite is
/// `None`); each variant applies its own fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemEdit {
    Nudge {
        dx: Option<f64>,
        dy: Option<f64>,
        drot: Option<f64>,
    },
    Height {
        dz: Option<f64>,
    },
    Position {
        x: Option<f64>,
        y: Option<f64>,
    },
    Scale(Option<f64>),
    Layer(Option<f64>),
    Restack(Option<f64>),
    Tilt {
        tilt_x: Option<f64>,
        tilt_y: Option<f64>,
    },
    Flip {
        flip_x: bool,
        flip_y: bool,
    },
    Color(Option<Color>),
}

impl ItemEdit {
    pub fn name(&self) -> &'static str {
        match self {
            ItemEdit::Nudge { .. } => "nudge",
            ItemEdit::Height { .. } => "height",
            ItemEdit::Position { .. } => "position",
            ItemEdit::Scale(_) => "scale",
            ItemEdit::Layer(_) => "layer",
            ItemEdit::Restack(_) => "stack",
            ItemEdit::Tilt { .. } => "tilt",
            ItemEdit::Flip { .. } => "flip",
            ItemEdit::Color(_) => "color",
        }
    }

    pub fn apply(&self, item: &mut CanvasItem) {
        match *self {
            ItemEdit::Nudge { dx, dy, drot } => {
                item.x = clamp_position(item.x + dx.unwrap_or(0.0));
                item.y = clamp_position(item.y + dy.unwrap_or(0.0));
                item.rotation = normalize_rotation(f64::from(item.rotation) + drot.unwrap_or(0.0));
            }
            ItemEdit::Height { dz } => {
                let dz = dz.unwrap_or(0.0).round() as i64;
                item.z = clamp_height(i64::from(item.z).saturating_add(dz));
            }
            ItemEdit::Position { x, y } => {
                item.x = clamp_position(x.unwrap_or(0.0));
                item.y = clamp_position(y.unwrap_or(0.0));
            }
            ItemEdit::Scale(scale) => item.scale = clamp_scale(scale),
            ItemEdit::Layer(layer) => item.layer = clamp_layer(layer),
            ItemEdit::Restack(direction) => {
                item.layer = item.layer.saturating_add(restack_step(direction));
            }
            ItemEdit::Tilt { tilt_x, tilt_y } => {
                item.tilt_x = clamp_tilt(tilt_x);
                item.tilt_y = clamp_tilt(tilt_y);
            }
            ItemEdit::Flip { flip_x, flip_y } => {
                item.flip_x = flip_x;
                item.flip_y = flip_y;
            }
            ItemEdit::Color(color) => item.color = color,
        }
    }
}

pub fn clamp_position(value: f64) -> f64 {
    if value.is_nan() {
        return POSITION_MIN;
    }
    value.clamp(POSITION_MIN, POSITION_MAX)
}

/// Rounds to whole degrees and wraps into `[0, 360)`
pub fn normalize_rotation(degrees: f64) -> i32 {
    if !degrees.is_finite() {
        return 0;
    }
    (degrees.round() % 360.0).rem_euclid(360.0) as i32
}

pub fn clamp_height(z: i64) -> i32 {
    z.clamp(0, i64::from(HEIGHT_MAX)) as i32
}

pub fn clamp_scale(scale: Option<f64>) -> f64 {
    scale
        .filter(|s| s.is_finite())
        .unwrap_or(DEFAULT_SCALE)
        .clamp(SCALE_MIN, SCALE_MAX)
}

pub fn clamp_layer(layer: Option<f64>) -> i64 {
    let limit = LAYER_LIMIT as f64;
    layer
        .filter(|l| l.is_finite())
        .unwrap_or(0.0)
        .clamp(-limit, limit)
        .round() as i64
}

/// Sign of the requested direction: -1, 0 or +1
pub fn restack_step(direction: Option<f64>) -> i64 {
    match direction {
        Some(d) if d > 0.0 => 1,
        Some(d) if d < 0.0 => -1,
        _ => 0,
    }
}

pub fn clamp_tilt(tilt: Option<f64>) -> f64 {
    tilt.filter(|t| t.is_finite())
        .unwrap_or(0.0)
        .clamp(-TILT_LIMIT, TILT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lamp() -> CanvasItem {
        NewCanvasItem::new("lamp".to_string(), None, None, None, None, None).into_item(1, 1, Utc::now())
    }

    #[test]
    fn test_placement_defaults() {
        let item = lamp();
        assert_eq!(item.x, 50.0);
        assert_eq!(item.y, 50.0);
        assert_eq!(item.z, 0);
        assert_eq!(item.rotation, 0);
        assert_eq!(item.scale, 1.0);
        assert_eq!(item.layer, 0);
        assert_eq!((item.tilt_x, item.tilt_y), (0.0, 0.0));
        assert!(!item.flip_x && !item.flip_y);
        assert_eq!(item.color, None);
    }

    #[test]
    fn test_placement_normalizes_values() {
        let item = NewCanvasItem::new(
            "rug".to_string(),
            Some(-20.0),
            Some(140.5),
            Some(33.0),
            Some(-90.0),
            Some(9.0),
        );
        assert_eq!(item.x, 0.0);
        assert_eq!(item.y, 100.0);
        assert_eq!(item.z, 20);
        assert_eq!(item.rotation, 270);
        assert_eq!(item.scale, 2.0);
    }

    #[test]
    fn test_scenario_nudge_height_tilt() {
        let mut item = lamp();
        ItemEdit::Nudge { dx: Some(10.0), dy: Some(-5.0), drot: Some(370.0) }.apply(&mut item);
        assert_eq!((item.x, item.y, item.rotation), (60.0, 45.0, 10));

        ItemEdit::Height { dz: Some(25.0) }.apply(&mut item);
        assert_eq!(item.z, 20);

        ItemEdit::Tilt { tilt_x: Some(90.0), tilt_y: Some(-90.0) }.apply(&mut item);
        assert_eq!((item.tilt_x, item.tilt_y), (60.0, -60.0));
    }

    #[test]
    fn test_nudge_clamps_position() {
        let mut item = lamp();
        ItemEdit::Nudge { dx: Some(80.0), dy: Some(-80.0), drot: None }.apply(&mut item);
        assert_eq!((item.x, item.y), (100.0, 0.0));
    }

    #[test]
    fn test_height_clamps_both_ends() {
        let mut item = lamp();
        ItemEdit::Height { dz: Some(-3.0) }.apply(&mut item);
        assert_eq!(item.z, 0);
        ItemEdit::Height { dz: Some(4.0) }.apply(&mut item);
        assert_eq!(item.z, 4);
        ItemEdit::Height { dz: None }.apply(&mut item);
        assert_eq!(item.z, 4);
    }

    #[test]
    fn test_scale_fallback_and_clamp() {
        assert_eq!(clamp_scale(None), 1.0);
        assert_eq!(clamp_scale(Some(f64::NAN)), 1.0);
        assert_eq!(clamp_scale(Some(f64::INFINITY)), 1.0);
        assert_eq!(clamp_scale(Some(0.1)), 0.25);
        assert_eq!(clamp_scale(Some(3.0)), 2.0);
        assert_eq!(clamp_scale(Some(1.5)), 1.5);
    }

    #[test]
    fn test_layer_absolute_clamps() {
        assert_eq!(clamp_layer(Some(5000.0)), 1000);
        assert_eq!(clamp_layer(Some(-5000.0)), -1000);
        assert_eq!(clamp_layer(Some(7.4)), 7);
        assert_eq!(clamp_layer(None), 0);
    }

    #[test]
    fn test_restack_round_trip_and_no_clamp() {
        let mut item = lamp();
        item.layer = 1000;
        ItemEdit::Restack(Some(1.0)).apply(&mut item);
        assert_eq!(item.layer, 1001);
        ItemEdit::Restack(Some(-1.0)).apply(&mut item);
        assert_eq!(item.layer, 1000);
        ItemEdit::Restack(Some(-42.0)).apply(&mut item);
        assert_eq!(item.layer, 999);
        ItemEdit::Restack(None).apply(&mut item);
        assert_eq!(item.layer, 999);
    }

    #[test]
    fn test_tilt_non_finite_is_zero() {
        assert_eq!(clamp_tilt(Some(f64::NAN)), 0.0);
        assert_eq!(clamp_tilt(None), 0.0);
        assert_eq!(clamp_tilt(Some(-12.5)), -12.5);
    }

    #[test]
    fn test_color_edit_sets_and_clears() {
        let mut item = lamp();
        ItemEdit::Color(Color::new(0xFF00AA)).apply(&mut item);
        assert_eq!(item.color, Color::new(0xFF00AA));
        ItemEdit::Color(None).apply(&mut item);
        assert_eq!(item.color, None);
    }

    #[test]
    fn test_stacking_key_orders_by_layer_then_id() {
        let mut a = lamp();
        let mut b = lamp();
        let mut c = lamp();
        a.id = 1;
        b.id = 2;
        c.id = 3;
        a.layer = 2;
        b.layer = -1;
        c.layer = 2;
        let mut items = vec![a, b, c];
        items.sort_by_key(CanvasItem::stacking_key);
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    proptest! {
        #[test]
        fn prop_position_stays_on_canvas(
            start_x in 0.0f64..=100.0,
            start_y in 0.0f64..=100.0,
            x in any::<f64>(),
            y in any::<f64>(),
        ) {
            let mut item = lamp();
            item.x = start_x;
            item.y = start_y;

            ItemEdit::Nudge { dx: Some(x), dy: Some(y), drot: None }.apply(&mut item);
            prop_assert!((POSITION_MIN..=POSITION_MAX).contains(&item.x));
            prop_assert!((POSITION_MIN..=POSITION_MAX).contains(&item.y));

            ItemEdit::Position { x: Some(x), y: Some(y) }.apply(&mut item);
            prop_assert!((POSITION_MIN..=POSITION_MAX).contains(&item.x));
            prop_assert!((POSITION_MIN..=POSITION_MAX).contains(&item.y));

            let placed = NewCanvasItem::new("lamp".to_string(), Some(x), Some(y), None, None, None);
            prop_assert!((POSITION_MIN..=POSITION_MAX).contains(&placed.x));
            prop_assert!((POSITION_MIN..=POSITION_MAX).contains(&placed.y));
        }

        #[test]
        fn prop_nudged_rotation_wraps_congruently(
            start in 0i32..360,
            delta in -1_000_000i32..1_000_000,
        ) {
            let mut item = lamp();
            item.rotation = start;
            ItemEdit::Nudge { dx: None, dy: None, drot: Some(f64::from(delta)) }.apply(&mut item);

            prop_assert!((0..360).contains(&item.rotation));
            prop_assert_eq!(item.rotation, (start + delta).rem_euclid(360));
        }

        #[test]
        fn prop_rotation_in_range_for_any_input(degrees in any::<f64>()) {
            prop_assert!((0..360).contains(&normalize_rotation(degrees)));
        }

        #[test]
        fn prop_scale_stays_in_bounds(scale in any::<f64>()) {
            let mut item = lamp();
            ItemEdit::Scale(Some(scale)).apply(&mut item);
            prop_assert!((SCALE_MIN..=SCALE_MAX).contains(&item.scale));

            let placed = NewCanvasItem::new("lamp".to_string(), None, None, None, None, Some(scale));
            prop_assert!((SCALE_MIN..=SCALE_MAX).contains(&placed.scale));
        }
    }
}
