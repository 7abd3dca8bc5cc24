//! Game record
//!
//! One row of the games dataset, plus its TSV encoding and sort key.
//!
//! ## TSV Row
//! ```text
//! GAME_DATE_EST  TEAM_ID_home  PTS_home  FG_PCT_home  FT_PCT_home  FG3_PCT_home  AST_home  REB_home  HOME_TEAM_WINS
//! 22/12/2022     1610612740    126       0.484        0.926        0.382         25        46        1
//! ```
//!
//! Empty fields load as the field type's maximum value (`true` for the win flag).

use crate::block::{Key, KEY_MAX};
use crate::error::{DbError, Result};

/// Header line of the games TSV
pub const TSV_HEADER: &str = "GAME_DATE_EST\tTEAM_ID_home\tPTS_home\tFG_PCT_home\t\
FT_PCT_home\tFG3_PCT_home\tAST_home\tREB_home\tHOME_TEAM_WINS";

/// Number of fields in a TSV row
const TSV_FIELDS: usize = 9;

const SECONDS_PER_DAY: i64 = 86_400;

/// Fixed-point scale applied to the sort column
const KEY_SCALE: f32 = 1000.0;

/// A game's home team statistics
#[derive(Debug, Clone, Copy)]
pub struct Record {
    /// Game date as unix seconds, midnight UTC
    pub game_date_est: i64,
    pub team_id_home: u32,
    /// Field goal percentage; the sort column
    pub fg_pct_home: f32,
    pub ft_pct_home: f32,
    pub fg3_pct_home: f32,
    pub pts_home: u8,
    pub ast_home: u8,
    pub reb_home: u8,
    pub home_team_wins: bool,
}

impl Record {
    /// Encoded size of one record: the unpadded sum of its field widths
    pub const SIZE: usize = 8 + 4 + 4 + 4 + 4 + 1 + 1 + 1 + 1;

    /// Map a sort column value to its key
    ///
    /// Values carry three decimal places, so scaling by 1000 and rounding makes
    /// equal column values produce equal keys. NaN and out of range values map
    /// to `KEY_MAX`; negatives clamp to 0.
    pub fn to_key(value: f32) -> Key {
        let scaled = (value * KEY_SCALE).round();
        if scaled.is_nan() || scaled > KEY_MAX as f32 {
            return KEY_MAX;
        }
        scaled.max(0.0) as Key
    }

    /// Sort key of this record
    pub fn key(&self) -> Key {
        Self::to_key(self.fg_pct_home)
    }

    /// Parse one TSV row in `TSV_HEADER` column order
    pub fn from_tsv(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() != TSV_FIELDS {
            return Err(DbError::Parse(format!(
                "expected {} tab separated fields, got {}",
                TSV_FIELDS,
                fields.len()
            )));
        }

        Ok(Self {
            game_date_est: if fields[0].is_empty() {
                i64::MAX
            } else {
                parse_date(fields[0])?
            },
            team_id_home: parse_field("TEAM_ID_home", fields[1], u32::MAX)?,
            pts_home: parse_field("PTS_home", fields[2], u8::MAX)?,
            fg_pct_home: parse_field("FG_PCT_home", fields[3], f32::MAX)?,
            ft_pct_home: parse_field("FT_PCT_home", fields[4], f32::MAX)?,
            fg3_pct_home: parse_field("FG3_PCT_home", fields[5], f32::MAX)?,
            ast_home: parse_field("AST_home", fields[6], u8::MAX)?,
            reb_home: parse_field("REB_home", fields[7], u8::MAX)?,
            home_team_wins: fields[8].is_empty() || fields[8].trim() == "1",
        })
    }

    /// Render as a TSV row, floats at three decimals
    pub fn to_tsv(&self) -> String {
        let date = if self.game_date_est == i64::MAX {
            String::new()
        } else {
            format_date(self.game_date_est)
        };
        format!(
            "{}\t{}\t{}\t{:.3}\t{:.3}\t{:.3}\t{}\t{}\t{}",
            date,
            self.team_id_home,
            self.pts_home,
            self.fg_pct_home,
            self.ft_pct_home,
            self.fg3_pct_home,
            self.ast_home,
            self.reb_home,
            if self.home_team_wins { 1 } else { 0 },
        )
    }
}

impl PartialEq for Record {
    /// Float columns compare by key, not bit pattern
    fn eq(&self, other: &Self) -> bool {
        self.game_date_est == other.game_date_est
            && self.team_id_home == other.team_id_home
            && Self::to_key(self.fg_pct_home) == Self::to_key(other.fg_pct_home)
            && Self::to_key(self.ft_pct_home) == Self::to_key(other.ft_pct_home)
            && Self::to_key(self.fg3_pct_home) == Self::to_key(other.fg3_pct_home)
            && self.pts_home == other.pts_home
            && self.ast_home == other.ast_home
            && self.reb_home == other.reb_home
            && self.home_team_wins == other.home_team_wins
    }
}

// =============================================================================
// Field Parsing
// =============================================================================

fn parse_field<T: std::str::FromStr>(name: &str, field: &str, empty: T) -> Result<T> {
    if field.is_empty() {
        return Ok(empty);
    }
    field
        .trim()
        .parse()
        .map_err(|_| DbError::Parse(format!("invalid {}: {:?}", name, field)))
}

/// Parse a `D/M/YYYY` date as unix seconds at midnight UTC
pub fn parse_date(field: &str) -> Result<i64> {
    let invalid = || DbError::Parse(format!("invalid date: {:?}", field));

    let mut parts = field.trim().split('/');
    let mut next = || -> Result<i64> {
        parts
            .next()
            .and_then(|part| part.parse().ok())
            .ok_or_else(invalid)
    };
    let (day, month, year) = (next()?, next()?, next()?);
    if parts.next().is_some() || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }

    let days = days_from_civil(year, month, day);
    // reject days past the end of the month, e.g. 31/2
    if civil_from_days(days) != (year, month, day) {
        return Err(invalid());
    }
    Ok(days * SECONDS_PER_DAY)
}

/// Render unix seconds as a `D/M/YYYY` UTC date
pub fn format_date(timestamp: i64) -> String {
    let (year, month, day) = civil_from_days(timestamp.div_euclid(SECONDS_PER_DAY));
    format!("{}/{}/{}", day, month, year)
}

/// Days since 1970-01-01 of a proleptic Gregorian date
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month_from_march = (month + 9) % 12;
    let day_of_year = (153 * month_from_march + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Proleptic Gregorian (year, month, day) of a day count since 1970-01-01
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let days = days + 719_468;
    let era = days.div_euclid(146_097);
    let day_of_era = days - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_from_march = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_from_march + 2) / 5 + 1;
    let month = if month_from_march < 10 {
        month_from_march + 3
    } else {
        month_from_march - 9
    };
    let year = year_of_era + era * 400;
    (if month <= 2 { year + 1 } else { year }, month, day)
}
