use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::{
    db::repository::{CanvasRepository, CoupleRepository},
    error::{AppError, AppResult},
    models::{
        invite::plan_join, CanvasItem, ColorUpdate, CornerColors, Couple, CoupleId, Invite,
        ItemEdit, ItemId, JoinPlan, NewCanvasItem, NewInvite, UserId,
    },
};

/// Process-local store used when no database is configured, and by tests.
///
/// A single lock guards all tables, so every operation is atomic with respect
/// to every other one.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    couples: BTreeMap<CoupleId, Couple>,
    items: BTreeMap<ItemId, CanvasItem>,
    invites: Vec<Invite>,
    next_couple_id: i64,
    next_item_id: i64,
    next_invite_id: i64,
}

impl MemoryStoreInner {
    fn couple_for_user(&self, user_id: UserId) -> Option<&Couple> {
        self.couples.values().find(|c| c.has_member(user_id))
    }

    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a couple directly, bypassing the invite flow
    pub async fn seed_couple(&self, partner1: UserId, partner2: Option<UserId>) -> Couple {
        let mut inner = self.inner.write().await;
        let id = MemoryStoreInner::next_id(&mut inner.next_couple_id);
        let couple = Couple {
            id,
            partner1_id: Some(partner1),
            partner2_id: partner2,
            colors: CornerColors::default(),
            relationship_start_date: None,
            created_at: Utc::now(),
        };
        inner.couples.insert(id, couple.clone());
        couple
    }
}

#[async_trait::async_trait]
impl CoupleRepository for MemoryStore {
    async fn find_couple_for_user(&self, user_id: UserId) -> AppResult<Option<Couple>> {
        let inner = self.inner.read().await;
        Ok(inner.couple_for_user(user_id).cloned())
    }

    async fn update_colors(
        &self,
        couple_id: CoupleId,
        update: ColorUpdate,
    ) -> AppResult<CornerColors> {
        let mut inner = self.inner.write().await;
        let couple = inner
            .couples
            .get_mut(&couple_id)
            .ok_or_else(|| AppError::NotFound(format!("couple {} not found", couple_id)))?;
        update.apply(&mut couple.colors);
        Ok(couple.colors)
    }

    async fn set_start_date(
        &self,
        couple_id: CoupleId,
        date: Option<NaiveDate>,
    ) -> AppResult<Couple> {
        let mut inner = self.inner.write().await;
        let couple = inner
            .couples
            .get_mut(&couple_id)
            .ok_or_else(|| AppError::NotFound(format!("couple {} not found", couple_id)))?;
        couple.relationship_start_date = date;
        Ok(couple.clone())
    }

    async fn create_invite(&self, invite: NewInvite) -> AppResult<Invite> {
        let mut inner = self.inner.write().await;
        if inner.invites.iter().any(|i| i.code == invite.code) {
            return Err(AppError::Internal("invite code collision".to_string()));
        }
        let id = MemoryStoreInner::next_id(&mut inner.next_invite_id);
        let stored = Invite {
            id,
            code: invite.code,
            issuer_user_id: invite.issuer_user_id,
            expires_at: invite.expires_at,
            used_at: None,
            used_by_user_id: None,
            created_couple_id: None,
            created_at: Utc::now(),
        };
        inner.invites.push(stored.clone());
        Ok(stored)
    }

    async fn active_invites(
        &self,
        issuer_user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Invite>> {
        let inner = self.inner.read().await;
        let mut invites: Vec<Invite> = inner
            .invites
            .iter()
            .filter(|i| i.issuer_user_id == issuer_user_id && i.is_active(now))
            .cloned()
            .collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(invites)
    }

    async fn find_invite(&self, issuer_user_id: UserId, code: &str) -> AppResult<Option<Invite>> {
        let inner = self.inner.read().await;
        Ok(inner
            .invites
            .iter()
            .find(|i| i.code == code && i.issuer_user_id == issuer_user_id)
            .cloned())
    }

    async fn redeem_invite(
        &self,
        code: &str,
        joiner: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Couple> {
        let mut inner = self.inner.write().await;
        let invite = inner.invites.iter().find(|i| i.code == code).cloned();
        let issuer_couple = invite
            .as_ref()
            .and_then(|i| inner.couple_for_user(i.issuer_user_id))
            .cloned();
        let plan = plan_join(
            invite.as_ref(),
            joiner,
            inner.couple_for_user(joiner),
            issuer_couple.as_ref(),
            now,
        )
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let couple_id = match plan {
            JoinPlan::NewCouple { partner1, partner2 } => {
                let id = MemoryStoreInner::next_id(&mut inner.next_couple_id);
                inner.couples.insert(
                    id,
                    Couple {
                        id,
                        partner1_id: Some(partner1),
                        partner2_id: Some(partner2),
                        colors: CornerColors::default(),
                        relationship_start_date: None,
                        created_at: now,
                    },
                );
                id
            }
            JoinPlan::FillSlot { couple_id, slot } => {
                let couple = inner
                    .couples
                    .get_mut(&couple_id)
                    .ok_or_else(|| AppError::Internal(format!("couple {} vanished", couple_id)))?;
                couple.fill(slot, joiner);
                couple_id
            }
        };

        if let Some(stored) = inner.invites.iter_mut().find(|i| i.code == code) {
            stored.used_at = Some(now);
            stored.used_by_user_id = Some(joiner);
            stored.created_couple_id = Some(couple_id);
        }

        inner
            .couples
            .get(&couple_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("couple {} vanished", couple_id)))
    }
}

#[async_trait::async_trait]
impl CanvasRepository for MemoryStore {
    async fn list_items(&self, couple_id: CoupleId) -> AppResult<Vec<CanvasItem>> {
        let inner = self.inner.read().await;
        let mut items: Vec<CanvasItem> = inner
            .items
            .values()
            .filter(|item| item.couple_id == couple_id)
            .cloned()
            .collect();
        items.sort_by_key(CanvasItem::stacking_key);
        Ok(items)
    }

    async fn insert_item(&self, couple_id: CoupleId, item: NewCanvasItem) -> AppResult<CanvasItem> {
        let mut inner = self.inner.write().await;
        if !inner.couples.contains_key(&couple_id) {
            return Err(AppError::NotFound(format!("couple {} not found", couple_id)));
        }
        let id = MemoryStoreInner::next_id(&mut inner.next_item_id);
        let stored = item.into_item(id, couple_id, Utc::now());
        inner.items.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_item(&self, couple_id: CoupleId, item_id: ItemId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let owned = inner
            .items
            .get(&item_id)
            .is_some_and(|item| item.couple_id == couple_id);
        if owned {
            inner.items.remove(&item_id);
        }
        Ok(owned)
    }

    async fn update_item(
        &self,
        couple_id: CoupleId,
        item_id: ItemId,
        edit: ItemEdit,
    ) -> AppResult<Option<CanvasItem>> {
        let mut inner = self.inner.write().await;
        match inner.items.get_mut(&item_id) {
            Some(item) if item.couple_id == couple_id => {
                edit.apply(item);
                Ok(Some(item.clone()))
            }
            _ => Ok(None),
        }
    }
}
