use std::env;

use chrono::{FixedOffset, NaiveTime};
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Working hours (local time at the configured offset)
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    pub late_grace_minutes: i64,
    pub half_day_hours: i64,

    // QR policy
    pub qr_expiry_hours: i64,
    pub qr_requires_location: bool,

    // Reconciliation
    pub reconcile_hour: u32,
    pub utc_offset_hours: i32,
    pub max_session_hours: i64,

    // Rate limiting
    pub rate_checkin_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            work_start: parse_time(
                &env::var("WORK_START_TIME").unwrap_or_else(|_| "08:00".to_string()),
            ),
            work_end: parse_time(
                &env::var("WORK_END_TIME").unwrap_or_else(|_| "17:00".to_string()),
            ),
            late_grace_minutes: env::var("LATE_GRACE_MINUTES")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap(),
            half_day_hours: env::var("HALF_DAY_HOURS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap(),

            qr_expiry_hours: env::var("QR_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap(),
            qr_requires_location: env::var("QR_REQUIRES_LOCATION")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap(),

            reconcile_hour: env::var("RECONCILE_HOUR")
                .unwrap_or_else(|_| "18".to_string()) // end of business day
                .parse()
                .unwrap(),
            utc_offset_hours: env::var("UTC_OFFSET_HOURS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap(),
            max_session_hours: env::var("MAX_SESSION_HOURS")
                .unwrap_or_else(|_| "16".to_string())
                .parse()
                .unwrap(),

            rate_checkin_per_min: env::var("RATE_CHECKIN_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }

    /// Office-local timezone as a fixed UTC offset.
    pub fn tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).expect("UTC_OFFSET_HOURS out of range")
    }
}

fn parse_time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").expect("work time must be HH:MM")
}
