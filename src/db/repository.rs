//! Storage seams for couples and canvas items.
//!
//! Both traits are implemented by the PostgreSQL store and the in-memory
//! store. Every item operation is scoped by couple id: an item that exists
//! under another couple behaves exactly like a missing one.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    error::AppResult,
    models::{
        CanvasItem, ColorUpdate, CornerColors, Couple, CoupleId, Invite, ItemEdit, ItemId,
        NewCanvasItem, NewInvite, UserId,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CoupleRepository: Send + Sync {
    /// The couple the user belongs to, if any
    async fn find_couple_for_user(&self, user_id: UserId) -> AppResult<Option<Couple>>;

    /// Coalescing update of the corner colors; returns the stored result
    async fn update_colors(
        &self,
        couple_id: CoupleId,
        update: ColorUpdate,
    ) -> AppResult<CornerColors>;

    async fn set_start_date(
        &self,
        couple_id: CoupleId,
        date: Option<NaiveDate>,
    ) -> AppResult<Couple>;

    async fn create_invite(&self, invite: NewInvite) -> AppResult<Invite>;

    /// Unused, unexpired invites of the issuer, newest first
    async fn active_invites(
        &self,
        issuer_user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Invite>>;

    async fn find_invite(&self, issuer_user_id: UserId, code: &str) -> AppResult<Option<Invite>>;

    /// Redeems `code` for `joiner` atomically and returns the resulting couple
    async fn redeem_invite(
        &self,
        code: &str,
        joiner: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Couple>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CanvasRepository: Send + Sync {
    /// All items of the couple in render order
    async fn list_items(&self, couple_id: CoupleId) -> AppResult<Vec<CanvasItem>>;

    async fn insert_item(&self, couple_id: CoupleId, item: NewCanvasItem) -> AppResult<CanvasItem>;

    /// Returns false when the couple owns no such item
    async fn delete_item(&self, couple_id: CoupleId, item_id: ItemId) -> AppResult<bool>;

    /// Applies `edit` under a row lock; `None` when the couple owns no such item
    async fn update_item(
        &self,
        couple_id: CoupleId,
        item_id: ItemId,
        edit: ItemEdit,
    ) -> AppResult<Option<CanvasItem>>;
}
