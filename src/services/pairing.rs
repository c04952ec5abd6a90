use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    db::CoupleRepository,
    error::{AppError, AppResult},
    models::{
        couple::parse_start_date,
        invite::normalize_code,
        CoupleView, Invite, NewInvite, UserId,
    },
};

/// Invite-based pairing and the couple's own settings
#[derive(Clone)]
pub struct PairingService {
    couples: Arc<dyn CoupleRepository>,
    invite_ttl: Duration,
}

impl PairingService {
    pub fn new(couples: Arc<dyn CoupleRepository>, invite_ttl: Duration) -> Self {
        Self {
            couples,
            invite_ttl,
        }
    }

    /// Issues a fresh invite; users already in a couple may not invite
    pub async fn create_invite(&self, user_id: UserId) -> AppResult<Invite> {
        if self.couples.find_couple_for_user(user_id).await?.is_some() {
            return Err(AppError::InvalidInput(
                "you are already in a couple".to_string(),
            ));
        }

        let new_invite = NewInvite::issue(user_id, Utc::now(), self.invite_ttl)?;
        let invite = self.couples.create_invite(new_invite).await?;

        tracing::info!(
            user_id,
            invite_id = invite.id,
            expires_at = %invite.expires_at,
            "Invite created"
        );

        Ok(invite)
    }

    pub async fn list_invites(&self, user_id: UserId) -> AppResult<Vec<Invite>> {
        self.couples.active_invites(user_id, Utc::now()).await
    }

    pub async fn get_invite(&self, user_id: UserId, code: &str) -> AppResult<Invite> {
        let code = normalize_code(code);
        self.couples
            .find_invite(user_id, &code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("invite {} not found", code)))
    }

    /// Redeems an invite code and returns the joined couple
    pub async fn join(&self, user_id: UserId, raw_code: &str) -> AppResult<CoupleView> {
        let code = normalize_code(raw_code);
        if code.is_empty() {
            return Err(AppError::InvalidInput("invalid code".to_string()));
        }

        let couple = self
            .couples
            .redeem_invite(&code, user_id, Utc::now())
            .await
            .inspect_err(|e| tracing::warn!(user_id, error = %e, "Join rejected"))?;

        tracing::info!(user_id, couple_id = couple.id, "Couple joined");

        Ok(CoupleView::for_member(&couple, user_id))
    }

    pub async fn get_couple(&self, user_id: UserId) -> AppResult<CoupleView> {
        let couple = self
            .couples
            .find_couple_for_user(user_id)
            .await?
            .ok_or(AppError::NotPaired)?;
        Ok(CoupleView::for_member(&couple, user_id))
    }

    /// Sets or clears the relationship start date
    pub async fn set_start_date(&self, user_id: UserId, raw: &str) -> AppResult<CoupleView> {
        let couple = self
            .couples
            .find_couple_for_user(user_id)
            .await?
            .ok_or(AppError::NotPaired)?;
        let date = parse_start_date(raw)
            .map_err(|_| AppError::InvalidInput("invalid_date".to_string()))?;

        let couple = self.couples.set_start_date(couple.id, date).await?;
        tracing::info!(couple_id = couple.id, start_date = ?date, "Start date updated");

        Ok(CoupleView::for_member(&couple, user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::MockCoupleRepository;
    use crate::db::MemoryStore;
    use chrono::NaiveDate;
    use tokio_test::{assert_err, assert_ok};

    fn service(store: &MemoryStore) -> PairingService {
        PairingService::new(Arc::new(store.clone()), Duration::hours(24))
    }

    #[tokio::test]
    async fn test_invite_and_join() {
        let store = MemoryStore::new();
        let pairing = service(&store);

        let invite = assert_ok!(pairing.create_invite(1).await);
        assert_eq!(pairing.list_invites(1).await.unwrap(), vec![invite.clone()]);

        let lower = invite.code.to_lowercase();
        let view = assert_ok!(pairing.join(2, &format!(" {} ", lower)).await);
        assert_eq!(view.partner_id, Some(1));

        let issuer_view = pairing.get_couple(1).await.unwrap();
        assert_eq!(issuer_view.id, view.id);
        assert_eq!(issuer_view.partner_id, Some(2));

        assert!(pairing.list_invites(1).await.unwrap().is_empty());
        let used = pairing.get_invite(1, &invite.code).await.unwrap();
        assert_eq!(used.created_couple_id, Some(view.id));
    }

    #[tokio::test]
    async fn test_join_rejections() {
        let store = MemoryStore::new();
        let pairing = service(&store);
        let invite = pairing.create_invite(1).await.unwrap();

        let err = assert_err!(pairing.join(1, &invite.code).await);
        assert!(matches!(err, AppError::InvalidInput(msg) if msg == "you cannot use your own code"));

        let err = assert_err!(pairing.join(2, "NOPE2345").await);
        assert!(matches!(err, AppError::InvalidInput(msg) if msg == "invalid code"));

        pairing.join(2, &invite.code).await.unwrap();
        let err = assert_err!(pairing.join(3, &invite.code).await);
        assert!(matches!(err, AppError::InvalidInput(msg) if msg == "code already used"));
    }

    #[tokio::test]
    async fn test_paired_user_cannot_invite() {
        let store = MemoryStore::new();
        store.seed_couple(1, Some(2)).await;
        let pairing = service(&store);

        let err = assert_err!(pairing.create_invite(1).await);
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_overflowing_ttl_stores_nothing() {
        let mut couples = MockCoupleRepository::new();
        couples
            .expect_find_couple_for_user()
            .returning(|_| Ok(None));
        couples.expect_create_invite().never();
        let ttl = Duration::try_hours(i64::from(u32::MAX)).unwrap();
        let pairing = PairingService::new(Arc::new(couples), ttl);

        let err = assert_err!(pairing.create_invite(1).await);
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_start_date_formats() {
        let store = MemoryStore::new();
        store.seed_couple(1, Some(2)).await;
        let pairing = service(&store);

        let view = pairing.set_start_date(1, "2021-02-14").await.unwrap();
        let expected = NaiveDate::from_ymd_opt(2021, 2, 14);
        assert_eq!(view.relationship_start_date, expected);

        let view = pairing.set_start_date(2, "14/02/2021").await.unwrap();
        assert_eq!(view.relationship_start_date, expected);

        let err = assert_err!(pairing.set_start_date(1, "2021-02-30").await);
        assert!(matches!(err, AppError::InvalidInput(msg) if msg == "invalid_date"));
        let view = pairing.get_couple(1).await.unwrap();
        assert_eq!(view.relationship_start_date, expected);

        let view = pairing.set_start_date(1, "").await.unwrap();
        assert_eq!(view.relationship_start_date, None);
    }

    #[tokio::test]
    async fn test_unknown_invite_is_not_found() {
        let mut couples = MockCoupleRepository::new();
        couples.expect_find_invite().returning(|_, _| Ok(None));
        let pairing = PairingService::new(Arc::new(couples), Duration::hours(1));

        let err = assert_err!(pairing.get_invite(1, "abcd2345").await);
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("ABCD2345")));
    }

    #[tokio::test]
    async fn test_unpaired_couple_lookup() {
        let mut couples = MockCoupleRepository::new();
        couples
            .expect_find_couple_for_user()
            .returning(|_| Ok(None));
        couples.expect_set_start_date().never();
        let pairing = PairingService::new(Arc::new(couples), Duration::hours(1));

        assert!(matches!(pairing.get_couple(4).await, Err(AppError::NotPaired)));
        assert!(matches!(
            pairing.set_start_date(4, "2020-01-01").await,
            Err(AppError::NotPaired)
        ));
    }
}
