use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;

use super::{Couple, CoupleId, PartnerSlot, UserId};
use crate::error::{AppError, AppResult};

/// Characters used in invite codes; omits look-alikes (0/O, 1/I)
pub const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LEN: usize = 8;

/// A single-use, time-limited pairing token
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Invite {
    pub id: i64,
    pub code: String,
    pub issuer_user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by_user_id: Option<UserId>,
    pub created_couple_id: Option<CoupleId>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && !self.is_expired(now)
    }
}

/// An invite about to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvite {
    pub code: String,
    pub issuer_user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl NewInvite {
    /// Fails when `now + ttl` falls outside the representable date range
    pub fn issue(issuer_user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> AppResult<Self> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal(format!("invite expiry overflows: ttl {ttl}")))?;

        Ok(Self {
            code: generate_code(),
            issuer_user_id,
            expires_at,
        })
    }
}

/// Random code drawn from [`INVITE_ALPHABET`]
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Upper-cased, trimmed form of a user-typed code
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Why an invite cannot be redeemed
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    #[error("you are already in a couple")]
    AlreadyPaired,
    #[error("invalid code")]
    UnknownCode,
    #[error("code already used")]
    AlreadyUsed,
    #[error("code expired")]
    Expired,
    #[error("you cannot use your own code")]
    OwnCode,
    #[error("invalid invite: issuer is already paired")]
    IssuerPaired,
    #[error("could not complete the pairing")]
    NoOpenSlot,
}

/// What redeeming an invite will write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPlan {
    /// The issuer has no couple yet
    NewCouple { partner1: UserId, partner2: UserId },
    /// The issuer's couple has an empty slot
    FillSlot { couple_id: CoupleId, slot: PartnerSlot },
}

/// Decides whether `joiner` may redeem `invite`.
///
/// Stores call this while holding the invite row, so the checks and the
/// writes that follow see the same state.
pub fn plan_join(
    invite: Option<&Invite>,
    joiner: UserId,
    joiner_couple: Option<&Couple>,
    issuer_couple: Option<&Couple>,
    now: DateTime<Utc>,
) -> Result<JoinPlan, JoinRejection> {
    if joiner_couple.is_some() {
        return Err(JoinRejection::AlreadyPaired);
    }
    let invite = invite.ok_or(JoinRejection::UnknownCode)?;
    if invite.used_at.is_some() {
        return Err(JoinRejection::AlreadyUsed);
    }
    if invite.is_expired(now) {
        return Err(JoinRejection::Expired);
    }
    if invite.issuer_user_id == joiner {
        return Err(JoinRejection::OwnCode);
    }
    match issuer_couple {
        None => Ok(JoinPlan::NewCouple {
            partner1: invite.issuer_user_id,
            partner2: joiner,
        }),
        Some(couple) if couple.is_complete() => Err(JoinRejection::IssuerPaired),
        Some(couple) => couple
            .open_slot_for(joiner)
            .map(|slot| JoinPlan::FillSlot {
                couple_id: couple.id,
                slot,
            })
            .ok_or(JoinRejection::NoOpenSlot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CornerColors;

    fn invite(issuer: UserId, now: DateTime<Utc>) -> Invite {
        Invite {
            id: 1,
            code: "ABCDEFGH".to_string(),
            issuer_user_id: issuer,
            expires_at: now + Duration::hours(1),
            used_at: None,
            used_by_user_id: None,
            created_couple_id: None,
            created_at: now,
        }
    }

    fn couple(id: CoupleId, p1: Option<UserId>, p2: Option<UserId>) -> Couple {
        Couple {
            id,
            partner1_id: p1,
            partner2_id: p2,
            colors: CornerColors::default(),
            relationship_start_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_new_couple() {
        let now = Utc::now();
        let inv = invite(1, now);
        assert_eq!(
            plan_join(Some(&inv), 2, None, None, now),
            Ok(JoinPlan::NewCouple { partner1: 1, partner2: 2 })
        );
    }

    #[test]
    fn test_plan_fill_slot() {
        let now = Utc::now();
        let inv = invite(1, now);
        let half = couple(9, Some(1), None);
        assert_eq!(
            plan_join(Some(&inv), 2, None, Some(&half), now),
            Ok(JoinPlan::FillSlot { couple_id: 9, slot: PartnerSlot::Second })
        );
    }

    #[test]
    fn test_plan_rejections() {
        let now = Utc::now();
        let inv = invite(1, now);
        let full = couple(9, Some(1), Some(3));

        assert_eq!(
            plan_join(Some(&inv), 2, Some(&full), None, now),
            Err(JoinRejection::AlreadyPaired)
        );
        assert_eq!(plan_join(None, 2, None, None, now), Err(JoinRejection::UnknownCode));
        assert_eq!(
            plan_join(Some(&inv), 1, None, None, now),
            Err(JoinRejection::OwnCode)
        );
        assert_eq!(
            plan_join(Some(&inv), 2, None, None, now + Duration::hours(2)),
            Err(JoinRejection::Expired)
        );
        assert_eq!(
            plan_join(Some(&inv), 2, None, Some(&full), now),
            Err(JoinRejection::IssuerPaired)
        );

        let mut used = invite(1, now);
        used.used_at = Some(now);
        assert_eq!(
            plan_join(Some(&used), 2, None, None, now),
            Err(JoinRejection::AlreadyUsed)
        );
    }

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generated_codes_cover_alphabet() {
        let codes: Vec<String> = (0..500).map(|_| generate_code()).collect();

        let distinct: std::collections::HashSet<&String> = codes.iter().collect();
        assert!(distinct.len() > 495);
        for symbol in INVITE_ALPHABET {
            assert!(
                codes.iter().any(|c| c.as_bytes().contains(symbol)),
                "symbol {} never drawn",
                *symbol as char
            );
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  abcd2345 "), "ABCD2345");
    }

    #[test]
    fn test_issue_sets_expiry() {
        let now = Utc::now();
        let invite = NewInvite::issue(7, now, Duration::hours(24)).unwrap();
        assert_eq!(invite.issuer_user_id, 7);
        assert_eq!(invite.expires_at - now, Duration::hours(24));
    }

    #[test]
    fn test_issue_rejects_expiry_past_date_range() {
        let now = Utc::now();
        let ttl = Duration::try_hours(i64::from(u32::MAX)).unwrap();
        let result = NewInvite::issue(7, now, ttl);
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_activity() {
        let now = Utc::now();
        let mut invite = Invite {
            id: 1,
            code: "ABCDEFGH".to_string(),
            issuer_user_id: 1,
            expires_at: now + Duration::hours(1),
            used_at: None,
            used_by_user_id: None,
            created_couple_id: None,
            created_at: now,
        };
        assert!(invite.is_active(now));
        assert!(!invite.is_active(now + Duration::hours(2)));
        invite.used_at = Some(now);
        assert!(!invite.is_active(now));
    }
}
