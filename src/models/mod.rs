use serde::Serialize;

pub mod canvas_item;
pub mod color;
pub mod couple;
pub mod input;
pub mod invite;

pub use canvas_item::{CanvasItem, ItemEdit, ItemId, NewCanvasItem};
pub use color::{Color, ColorInput};
pub use couple::{ColorUpdate, CornerColors, Couple, CoupleId, CoupleView, PartnerSlot, UserId};
pub use input::{Lenient, LenientFlag};
pub use invite::{Invite, JoinPlan, JoinRejection, NewInvite};

/// Everything needed to draw a couple's corner
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CornerView {
    pub couple_id: CoupleId,
    pub colors: CornerColors,
    /// Items in render order
    pub items: Vec<CanvasItem>,
}
