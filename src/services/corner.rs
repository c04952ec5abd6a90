use std::sync::Arc;

use crate::{
    db::{
        redis::{CornerEvent, Notifier},
        CanvasRepository, CoupleRepository,
    },
    error::{AppError, AppResult},
    models::{
        CanvasItem, Color, ColorUpdate, CornerColors, CornerView, Couple, ItemEdit, ItemId,
        NewCanvasItem, UserId,
    },
};

/// Placement values for a new item, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub item_key: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub rotation: Option<f64>,
    pub scale: Option<f64>,
}

/// Canvas operations of one couple.
///
/// Every call resolves the caller's couple first; callers without one get
/// [`AppError::NotPaired`]. Items of other couples are reported as missing.
#[derive(Clone)]
pub struct CornerService {
    couples: Arc<dyn CoupleRepository>,
    canvas: Arc<dyn CanvasRepository>,
    notifier: Notifier,
}

impl CornerService {
    pub fn new(
        couples: Arc<dyn CoupleRepository>,
        canvas: Arc<dyn CanvasRepository>,
        notifier: Notifier,
    ) -> Self {
        Self {
            couples,
            canvas,
            notifier,
        }
    }

    async fn couple_of(&self, user_id: UserId) -> AppResult<Couple> {
        self.couples
            .find_couple_for_user(user_id)
            .await?
            .ok_or(AppError::NotPaired)
    }

    /// Colors and items of the caller's corner
    pub async fn view(&self, user_id: UserId) -> AppResult<CornerView> {
        let couple = self.couple_of(user_id).await?;
        let items = self.canvas.list_items(couple.id).await?;

        tracing::debug!(couple_id = couple.id, items = items.len(), "Corner loaded");

        Ok(CornerView {
            couple_id: couple.id,
            colors: couple.colors,
            items,
        })
    }

    pub async fn place(&self, user_id: UserId, placement: Placement) -> AppResult<CanvasItem> {
        let couple = self.couple_of(user_id).await?;

        let item_key = placement
            .item_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::InvalidInput("item_key required".to_string()))?;

        let new_item = NewCanvasItem::new(
            item_key,
            placement.x,
            placement.y,
            placement.z,
            placement.rotation,
            placement.scale,
        );
        let item = self.canvas.insert_item(couple.id, new_item).await?;

        tracing::info!(
            couple_id = couple.id,
            item_id = item.id,
            item_key = %item.item_key,
            "Item placed"
        );
        self.notifier.publish(CornerEvent::ItemPlaced {
            couple_id: couple.id,
            item_id: item.id,
        });

        Ok(item)
    }

    pub async fn delete(&self, user_id: UserId, item_id: ItemId) -> AppResult<()> {
        let couple = self.couple_of(user_id).await?;

        if !self.canvas.delete_item(couple.id, item_id).await? {
            return Err(item_not_found(item_id));
        }

        tracing::info!(couple_id = couple.id, item_id, "Item removed");
        self.notifier.publish(CornerEvent::ItemRemoved {
            couple_id: couple.id,
            item_id,
        });

        Ok(())
    }

    /// Applies one transform to an item of the caller's couple
    pub async fn edit(
        &self,
        user_id: UserId,
        item_id: ItemId,
        edit: ItemEdit,
    ) -> AppResult<CanvasItem> {
        let couple = self.couple_of(user_id).await?;

        let item = self
            .canvas
            .update_item(couple.id, item_id, edit)
            .await?
            .ok_or_else(|| item_not_found(item_id))?;

        tracing::info!(
            couple_id = couple.id,
            item_id,
            operation = edit.name(),
            "Item updated"
        );
        self.notifier.publish(CornerEvent::ItemUpdated {
            couple_id: couple.id,
            item_id,
            operation: edit.name(),
        });

        Ok(item)
    }

    pub async fn nudge(
        &self,
        user_id: UserId,
        item_id: ItemId,
        dx: Option<f64>,
        dy: Option<f64>,
        drot: Option<f64>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Nudge { dx, dy, drot })
            .await
    }

    pub async fn set_height(
        &self,
        user_id: UserId,
        item_id: ItemId,
        dz: Option<f64>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Height { dz }).await
    }

    pub async fn set_position(
        &self,
        user_id: UserId,
        item_id: ItemId,
        x: Option<f64>,
        y: Option<f64>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Position { x, y }).await
    }

    pub async fn set_scale(
        &self,
        user_id: UserId,
        item_id: ItemId,
        scale: Option<f64>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Scale(scale)).await
    }

    pub async fn set_layer(
        &self,
        user_id: UserId,
        item_id: ItemId,
        layer: Option<f64>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Layer(layer)).await
    }

    pub async fn restack(
        &self,
        user_id: UserId,
        item_id: ItemId,
        direction: Option<f64>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Restack(direction))
            .await
    }

    pub async fn set_tilt(
        &self,
        user_id: UserId,
        item_id: ItemId,
        tilt_x: Option<f64>,
        tilt_y: Option<f64>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Tilt { tilt_x, tilt_y })
            .await
    }

    pub async fn set_flip(
        &self,
        user_id: UserId,
        item_id: ItemId,
        flip_x: bool,
        flip_y: bool,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Flip { flip_x, flip_y })
            .await
    }

    pub async fn set_color(
        &self,
        user_id: UserId,
        item_id: ItemId,
        color: Option<Color>,
    ) -> AppResult<CanvasItem> {
        self.edit(user_id, item_id, ItemEdit::Color(color)).await
    }

    /// Partial update of the couple's canvas, floor and wall colors
    pub async fn set_couple_colors(
        &self,
        user_id: UserId,
        update: ColorUpdate,
    ) -> AppResult<CornerColors> {
        let couple = self.couple_of(user_id).await?;
        let colors = self.couples.update_colors(couple.id, update).await?;

        tracing::info!(couple_id = couple.id, "Corner colors updated");
        self.notifier
            .publish(CornerEvent::ColorsChanged { couple_id: couple.id });

        Ok(colors)
    }
}

fn item_not_found(item_id: ItemId) -> AppError {
    AppError::NotFound(format!("item {} not found", item_id))
}
