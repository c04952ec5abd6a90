use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::color::{Color, ColorInput};

pub type UserId = i64;
pub type CoupleId = i64;

/// Two partner slots sharing one corner
#[derive(Debug, Clone, PartialEq)]
pub struct Couple {
    pub id: CoupleId,
    pub partner1_id: Option<UserId>,
    pub partner2_id: Option<UserId>,
    pub colors: CornerColors,
    pub relationship_start_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Couple {
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.partner1_id == Some(user_id) || self.partner2_id == Some(user_id)
    }

    pub fn is_complete(&self) -> bool {
        self.partner1_id.is_some() && self.partner2_id.is_some()
    }

    /// The other member of the couple, if the slot is filled
    pub fn partner_of(&self, user_id: UserId) -> Option<UserId> {
        if self.partner1_id == Some(user_id) {
            self.partner2_id
        } else {
            self.partner1_id
        }
    }

    /// The first empty slot the given user could take
    pub fn open_slot_for(&self, user_id: UserId) -> Option<PartnerSlot> {
        if self.partner2_id.is_none() && self.partner1_id != Some(user_id) {
            Some(PartnerSlot::Second)
        } else if self.partner1_id.is_none() && self.partner2_id != Some(user_id) {
            Some(PartnerSlot::First)
        } else {
            None
        }
    }

    pub fn fill(&mut self, slot: PartnerSlot, user_id: UserId) {
        match slot {
            PartnerSlot::First => self.partner1_id = Some(user_id),
            PartnerSlot::Second => self.partner2_id = Some(user_id),
        }
    }
}

/// One of the two partner columns of a couple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerSlot {
    First,
    Second,
}

/// Couple-wide corner colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CornerColors {
    pub canvas: Option<Color>,
    pub floor: Option<Color>,
    pub wall: Option<Color>,
}

/// Partial color update. Omitted, `null` and unparseable fields leave the
/// stored value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ColorUpdate {
    #[serde(default)]
    pub canvas: Option<ColorInput>,
    #[serde(default)]
    pub floor: Option<ColorInput>,
    #[serde(default)]
    pub wall: Option<ColorInput>,
}

impl ColorUpdate {
    pub fn canvas(&self) -> Option<Color> {
        self.canvas.and_then(|c| c.0)
    }

    pub fn floor(&self) -> Option<Color> {
        self.floor.and_then(|c| c.0)
    }

    pub fn wall(&self) -> Option<Color> {
        self.wall.and_then(|c| c.0)
    }

    pub fn apply(&self, colors: &mut CornerColors) {
        colors.canvas = self.canvas().or(colors.canvas);
        colors.floor = self.floor().or(colors.floor);
        colors.wall = self.wall().or(colors.wall);
    }
}

/// Couple as seen by one of its members
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoupleView {
    pub id: CoupleId,
    pub partner_id: Option<UserId>,
    pub relationship_start_date: Option<NaiveDate>,
    pub colors: CornerColors,
}

impl CoupleView {
    pub fn for_member(couple: &Couple, user_id: UserId) -> Self {
        Self {
            id: couple.id,
            partner_id: couple.partner_of(user_id),
            relationship_start_date: couple.relationship_start_date,
            colors: couple.colors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDate;

/// Parses a relationship start date.
///
/// Accepts `YYYY-MM-DD` and `DD/MM/YYYY`; an empty string clears the date.
/// Anything else is rejected, including impossible calendar dates.
pub fn parse_start_date(raw: &str) -> Result<Option<NaiveDate>, InvalidDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let iso_shape = raw.len() == 10 && raw.as_bytes()[4] == b'-' && raw.as_bytes()[7] == b'-';
    let br_shape = raw.len() == 10 && raw.as_bytes()[2] == b'/' && raw.as_bytes()[5] == b'/';
    let format = if iso_shape {
        "%Y-%m-%d"
    } else if br_shape {
        "%d/%m/%Y"
    } else {
        return Err(InvalidDate);
    };
    NaiveDate::parse_from_str(raw, format).map(Some).map_err(|_| InvalidDate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn couple(p1: Option<UserId>, p2: Option<UserId>) -> Couple {
        Couple {
            id: 1,
            partner1_id: p1,
            partner2_id: p2,
            colors: CornerColors::default(),
            relationship_start_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_membership() {
        let c = couple(Some(10), Some(20));
        assert!(c.has_member(10));
        assert!(c.has_member(20));
        assert!(!c.has_member(30));
        assert!(c.is_complete());
        assert_eq!(c.partner_of(10), Some(20));
        assert_eq!(c.partner_of(20), Some(10));
    }

    #[test]
    fn test_open_slot() {
        assert_eq!(couple(Some(10), None).open_slot_for(20), Some(PartnerSlot::Second));
        assert_eq!(couple(None, Some(10)).open_slot_for(20), Some(PartnerSlot::First));
        assert_eq!(couple(Some(10), None).open_slot_for(10), None);
        assert_eq!(couple(Some(10), Some(20)).open_slot_for(30), None);
    }

    #[test]
    fn test_color_update_coalesces() {
        let mut colors = CornerColors::default();
        let first: ColorUpdate = serde_json::from_str(r##"{"canvas": "#112233"}"##).unwrap();
        first.apply(&mut colors);
        let second: ColorUpdate = serde_json::from_str(r##"{"floor": "#445566"}"##).unwrap();
        second.apply(&mut colors);
        assert_eq!(colors.canvas, Color::new(0x112233));
        assert_eq!(colors.floor, Color::new(0x445566));
        assert_eq!(colors.wall, None);
    }

    #[test]
    fn test_color_update_ignores_null_and_garbage() {
        let mut colors = CornerColors {
            canvas: Color::new(1),
            floor: Color::new(2),
            wall: Color::new(3),
        };
        let update: ColorUpdate =
            serde_json::from_str(r#"{"canvas": null, "floor": "nope", "wall": 255}"#).unwrap();
        update.apply(&mut colors);
        assert_eq!(colors.canvas, Color::new(1));
        assert_eq!(colors.floor, Color::new(2));
        assert_eq!(colors.wall, Color::new(255));
    }

    #[test]
    fn test_parse_start_date() {
        let expected = NaiveDate::from_ymd_opt(2021, 2, 14).unwrap();
        assert_eq!(parse_start_date("2021-02-14"), Ok(Some(expected)));
        assert_eq!(parse_start_date("14/02/2021"), Ok(Some(expected)));
        assert_eq!(parse_start_date("  "), Ok(None));
        assert_eq!(parse_start_date("2021-02-30"), Err(InvalidDate));
        assert_eq!(parse_start_date("Feb 14 2021"), Err(InvalidDate));
        assert_eq!(parse_start_date("2021/02/14"), Err(InvalidDate));
    }
}
