use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    db::repository::{CanvasRepository, CoupleRepository},
    error::{AppError, AppResult},
    models::{
        invite::plan_join, CanvasItem, Color, ColorUpdate, CornerColors, Couple, CoupleId, Invite,
        ItemEdit, ItemId, JoinPlan, NewCanvasItem, NewInvite, PartnerSlot, UserId,
    },
};

/// PostgreSQL-backed store for couples, invites and canvas items
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CoupleRow {
    id: i64,
    partner1_id: Option<i64>,
    partner2_id: Option<i64>,
    canvas_color: Option<i32>,
    floor_color: Option<i32>,
    wall_color: Option<i32>,
    relationship_start_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl From<CoupleRow> for Couple {
    fn from(row: CoupleRow) -> Self {
        Couple {
            id: row.id,
            partner1_id: row.partner1_id,
            partner2_id: row.partner2_id,
            colors: CornerColors {
                canvas: Color::from_column(row.canvas_color),
                floor: Color::from_column(row.floor_color),
                wall: Color::from_column(row.wall_color),
            },
            relationship_start_date: row.relationship_start_date,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    couple_id: i64,
    item_key: String,
    x: f64,
    y: f64,
    z: i32,
    rotation: i32,
    scale: f64,
    layer: i64,
    tilt_x: f64,
    tilt_y: f64,
    flip_x: bool,
    flip_y: bool,
    color: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for CanvasItem {
    fn from(row: ItemRow) -> Self {
        CanvasItem {
            id: row.id,
            couple_id: row.couple_id,
            item_key: row.item_key,
            x: row.x,
            y: row.y,
            z: row.z,
            rotation: row.rotation,
            scale: row.scale,
            layer: row.layer,
            tilt_x: row.tilt_x,
            tilt_y: row.tilt_y,
            flip_x: row.flip_x,
            flip_y: row.flip_y,
            color: Color::from_column(row.color),
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InviteRow {
    id: i64,
    code: String,
    issuer_user_id: i64,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    used_by_user_id: Option<i64>,
    created_couple_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<InviteRow> for Invite {
    fn from(row: InviteRow) -> Self {
        Invite {
            id: row.id,
            code: row.code,
            issuer_user_id: row.issuer_user_id,
            expires_at: row.expires_at,
            used_at: row.used_at,
            used_by_user_id: row.used_by_user_id,
            created_couple_id: row.created_couple_id,
            created_at: row.created_at,
        }
    }
}

/// Statement that claims an empty partner slot. The `IS NULL` guard makes a
/// concurrently filled slot update zero rows.
fn fill_slot_statement(slot: PartnerSlot) -> &'static str {
    match slot {
        PartnerSlot::First => {
            "UPDATE couples SET partner1_id = $1 WHERE id = $2 AND partner1_id IS NULL"
        }
        PartnerSlot::Second => {
            "UPDATE couples SET partner2_id = $1 WHERE id = $2 AND partner2_id IS NULL"
        }
    }
}

/// Takes transaction-scoped advisory locks on the given users, lowest id
/// first. Serializes joins that touch the same user even when no couple row
/// exists yet to lock.
async fn lock_users(tx: &mut Transaction<'_, Postgres>, users: &[UserId]) -> AppResult<()> {
    let mut users = users.to_vec();
    users.sort_unstable();
    users.dedup();

    for user_id in users {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

async fn couple_for_user_locked(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
) -> AppResult<Option<Couple>> {
    let row = sqlx::query_as::<_, CoupleRow>(
        r#"
        SELECT id, partner1_id, partner2_id, canvas_color, floor_color, wall_color,
               relationship_start_date, created_at
        FROM couples
        WHERE partner1_id = $1 OR partner2_id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row.map(Couple::from))
}

#[async_trait::async_trait]
impl CoupleRepository for PgStore {
    async fn find_couple_for_user(&self, user_id: UserId) -> AppResult<Option<Couple>> {
        let row = sqlx::query_as::<_, CoupleRow>(
            r#"
            SELECT id, partner1_id, partner2_id, canvas_color, floor_color, wall_color,
                   relationship_start_date, created_at
            FROM couples
            WHERE partner1_id = $1 OR partner2_id = $1
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Couple::from))
    }

    async fn update_colors(
        &self,
        couple_id: CoupleId,
        update: ColorUpdate,
    ) -> AppResult<CornerColors> {
        let row = sqlx::query_as::<_, CoupleRow>(
            r#"
            UPDATE couples
            SET canvas_color = COALESCE($2, canvas_color),
                floor_color = COALESCE($3, floor_color),
                wall_color = COALESCE($4, wall_color)
            WHERE id = $1
            RETURNING id, partner1_id, partner2_id, canvas_color, floor_color, wall_color,
                      relationship_start_date, created_at
            "#,
        )
        .bind(couple_id)
        .bind(Color::to_column(update.canvas()))
        .bind(Color::to_column(update.floor()))
        .bind(Color::to_column(update.wall()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("couple {} not found", couple_id)))?;

        Ok(Couple::from(row).colors)
    }

    async fn set_start_date(
        &self,
        couple_id: CoupleId,
        date: Option<NaiveDate>,
    ) -> AppResult<Couple> {
        let row = sqlx::query_as::<_, CoupleRow>(
            r#"
            UPDATE couples
            SET relationship_start_date = $2
            WHERE id = $1
            RETURNING id, partner1_id, partner2_id, canvas_color, floor_color, wall_color,
                      relationship_start_date, created_at
            "#,
        )
        .bind(couple_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("couple {} not found", couple_id)))?;

        Ok(row.into())
    }

    async fn create_invite(&self, invite: NewInvite) -> AppResult<Invite> {
        let row = sqlx::query_as::<_, InviteRow>(
            r#"
            INSERT INTO invites (code, issuer_user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, code, issuer_user_id, expires_at, used_at, used_by_user_id,
                      created_couple_id, created_at
            "#,
        )
        .bind(&invite.code)
        .bind(invite.issuer_user_id)
        .bind(invite.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn active_invites(
        &self,
        issuer_user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(
            r#"
            SELECT id, code, issuer_user_id, expires_at, used_at, used_by_user_id,
                   created_couple_id, created_at
            FROM invites
            WHERE issuer_user_id = $1 AND used_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(issuer_user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Invite::from).collect())
    }

    async fn find_invite(&self, issuer_user_id: UserId, code: &str) -> AppResult<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(
            r#"
            SELECT id, code, issuer_user_id, expires_at, used_at, used_by_user_id,
                   created_couple_id, created_at
            FROM invites
            WHERE code = $1 AND issuer_user_id = $2
            "#,
        )
        .bind(code)
        .bind(issuer_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Invite::from))
    }

    async fn redeem_invite(
        &self,
        code: &str,
        joiner: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Couple> {
        let mut tx = self.pool.begin().await?;

        let invite: Option<Invite> = sqlx::query_as::<_, InviteRow>(
            r#"
            SELECT id, code, issuer_user_id, expires_at, used_at, used_by_user_id,
                   created_couple_id, created_at
            FROM invites
            WHERE code = $1
            FOR UPDATE
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?
        .map(Invite::from);

        match &invite {
            Some(invite) => lock_users(&mut tx, &[joiner, invite.issuer_user_id]).await?,
            None => lock_users(&mut tx, &[joiner]).await?,
        }

        let joiner_couple = couple_for_user_locked(&mut tx, joiner).await?;
        let issuer_couple = match &invite {
            Some(invite) => couple_for_user_locked(&mut tx, invite.issuer_user_id).await?,
            None => None,
        };

        let plan = plan_join(
            invite.as_ref(),
            joiner,
            joiner_couple.as_ref(),
            issuer_couple.as_ref(),
            now,
        )
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let couple_id: i64 = match plan {
            JoinPlan::NewCouple { partner1, partner2 } => {
                sqlx::query_scalar::<_, i64>(
                    "INSERT INTO couples (partner1_id, partner2_id) VALUES ($1, $2) RETURNING id",
                )
                .bind(partner1)
                .bind(partner2)
                .fetch_one(&mut *tx)
                .await?
            }
            JoinPlan::FillSlot { couple_id, slot } => {
                let updated = sqlx::query(fill_slot_statement(slot))
                    .bind(joiner)
                    .bind(couple_id)
                    .execute(&mut *tx)
                    .await?;
                if updated.rows_affected() == 0 {
                    return Err(AppError::InvalidInput(
                        "could not complete the pairing".to_string(),
                    ));
                }
                couple_id
            }
        };

        let invite_id = invite
            .map(|i| i.id)
            .ok_or_else(|| AppError::Internal("invite missing after planning".to_string()))?;
        sqlx::query(
            r#"
            UPDATE invites
            SET used_at = $1, used_by_user_id = $2, created_couple_id = $3
            WHERE id = $4
            "#,
        )
        .bind(now)
        .bind(joiner)
        .bind(couple_id)
        .bind(invite_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, CoupleRow>(
            r#"
            SELECT id, partner1_id, partner2_id, canvas_color, floor_color, wall_color,
                   relationship_start_date, created_at
            FROM couples
            WHERE id = $1
            "#,
        )
        .bind(couple_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(couple_id, joiner, "Invite redeemed");
        Ok(row.into())
    }
}

#[async_trait::async_trait]
impl CanvasRepository for PgStore {
    async fn list_items(&self, couple_id: CoupleId) -> AppResult<Vec<CanvasItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, couple_id, item_key, x, y, z, rotation, scale, layer,
                   tilt_x, tilt_y, flip_x, flip_y, color, created_at
            FROM canvas_items
            WHERE couple_id = $1
            ORDER BY layer ASC, id ASC
            "#,
        )
        .bind(couple_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CanvasItem::from).collect())
    }

    async fn insert_item(&self, couple_id: CoupleId, item: NewCanvasItem) -> AppResult<CanvasItem> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO canvas_items (couple_id, item_key, x, y, z, rotation, scale, layer)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
            RETURNING id, couple_id, item_key, x, y, z, rotation, scale, layer,
                      tilt_x, tilt_y, flip_x, flip_y, color, created_at
            "#,
        )
        .bind(couple_id)
        .bind(&item.item_key)
        .bind(item.x)
        .bind(item.y)
        .bind(item.z)
        .bind(item.rotation)
        .bind(item.scale)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete_item(&self, couple_id: CoupleId, item_id: ItemId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM canvas_items WHERE id = $1 AND couple_id = $2")
            .bind(item_id)
            .bind(couple_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_item(
        &self,
        couple_id: CoupleId,
        item_id: ItemId,
        edit: ItemEdit,
    ) -> AppResult<Option<CanvasItem>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, couple_id, item_key, x, y, z, rotation, scale, layer,
                   tilt_x, tilt_y, flip_x, flip_y, color, created_at
            FROM canvas_items
            WHERE id = $1 AND couple_id = $2
            FOR UPDATE
            "#,
        )
        .bind(item_id)
        .bind(couple_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = current else {
            return Ok(None);
        };

        let mut item = CanvasItem::from(row);
        edit.apply(&mut item);

        sqlx::query(
            r#"
            UPDATE canvas_items
            SET x = $2, y = $3, z = $4, rotation = $5, scale = $6, layer = $7,
                tilt_x = $8, tilt_y = $9, flip_x = $10, flip_y = $11, color = $12
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.x)
        .bind(item.y)
        .bind(item.z)
        .bind(item.rotation)
        .bind(item.scale)
        .bind(item.layer)
        .bind(item.tilt_x)
        .bind(item.tilt_y)
        .bind(item.flip_x)
        .bind(item.flip_y)
        .bind(Color::to_column(item.color))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(item))
    }
}
