//! Weather Interpolation
//!
//! Turns month-indexed weather means into a per-day estimate. Each month's
//! stored average is treated as the value on the 15th; any other day blends
//! linearly toward the neighbouring month:
//!
//! - day > 15: toward next month (December wraps to January), weight (day - 15) / 30
//! - day <= 15: toward previous month (January wraps to December), weight (15 - day) / 30
//!
//! The curve is piecewise-linear with breakpoints at each 15th. No clamping:
//! both endpoints are historical means, so overshoot is bounded.

use crate::lookup_tables::{Fallback, LookupTables, WeatherProfile};
use crate::utils::normalize_province;
use chrono::{Datelike, NaiveDate};

/// Day of month at which the stored monthly mean applies
pub const ANCHOR_DAY: u32 = 15;

/// Days over which a full blend between adjacent months would occur
pub const BLEND_SPAN_DAYS: f64 = 30.0;

/// Which neighbour a date blends toward, and by how much
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendPlan {
    pub current_month: u32,
    pub target_month: u32,
    pub weight: f64,
}

/// Interpolated weather plus how the current month's profile was found
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedWeather {
    pub profile: WeatherProfile,
    pub fallback: Fallback,
}

/// Compute the neighbour month and blend weight for a date
pub fn blend_plan(date: NaiveDate) -> BlendPlan {
    let month = date.month();
    let day = date.day();

    if day > ANCHOR_DAY {
        BlendPlan {
            current_month: month,
            target_month: if month < 12 { month + 1 } else { 1 },
            weight: (day - ANCHOR_DAY) as f64 / BLEND_SPAN_DAYS,
        }
    } else {
        BlendPlan {
            current_month: month,
            target_month: if month > 1 { month - 1 } else { 12 },
            weight: (ANCHOR_DAY - day) as f64 / BLEND_SPAN_DAYS,
        }
    }
}

/// Interpolated weather for a province on a specific day
///
/// The current month resolves through the full fallback list of
/// [`LookupTables::weather`]. A missing neighbour month blends toward the
/// resolved current profile, i.e. contributes no change.
pub fn interpolate(tables: &LookupTables, province: &str, date: NaiveDate) -> InterpolatedWeather {
    let key = normalize_province(province);
    let plan = blend_plan(date);

    let (current, fallback) = tables.weather(&key, plan.current_month);
    let target = tables
        .weather_exact(&key, plan.target_month)
        .unwrap_or(current);

    InterpolatedWeather {
        profile: current.blend(&target, plan.weight),
        fallback,
    }
}
