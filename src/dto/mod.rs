use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod auth;
pub mod common;
pub mod discussion;
pub mod health;
pub mod message;
pub mod sse;
pub mod validation;
pub mod vote;

fn format_system_time(time: SystemTime) -> String {
    match OffsetDateTime::from(time).format(&Rfc3339) {
        Ok(stamp) => stamp,
        Err(_) => "invalid-timestamp".into(),
    }
}
