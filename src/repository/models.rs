//! Diesel records for database tables.
//!
//! Records mirror the stored columns; conversion into domain models
//! happens here so repositories only deal with domain types.

use diesel::prelude::*;

use super::{parse_datetime, parse_datetime_opt};
use crate::models::{
    Browser, Claim, ColorDepth, DomainPriority, Factory, Request, RequestGroup, ScreenSize,
};
use crate::schema;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::factories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FactoryRecord {
    pub id: i32,
    pub name: String,
    pub operating_system: String,
    pub password_hash: Option<String>,
    pub ip: Option<String>,
    pub last_poll: Option<String>,
    pub last_upload: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::factories)]
pub struct NewFactoryRecord<'a> {
    pub name: &'a str,
    pub operating_system: &'a str,
    pub password_hash: Option<&'a str>,
    pub created_at: &'a str,
}

impl From<FactoryRecord> for Factory {
    fn from(r: FactoryRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            operating_system: r.operating_system,
            password_hash: r.password_hash,
            ip: r.ip,
            last_poll: parse_datetime_opt(r.last_poll),
            last_upload: parse_datetime_opt(r.last_upload),
            created_at: parse_datetime(&r.created_at),
        }
    }
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::factory_screen_sizes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScreenSizeRecord {
    pub id: i32,
    pub factory_id: i32,
    pub width: i32,
    pub height: i32,
}

impl From<ScreenSizeRecord> for ScreenSize {
    fn from(r: ScreenSizeRecord) -> Self {
        Self {
            width: r.width,
            height: r.height,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::factory_screen_sizes)]
pub struct NewScreenSizeRecord {
    pub factory_id: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::factory_color_depths)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ColorDepthRecord {
    pub id: i32,
    pub factory_id: i32,
    pub bits_per_pixel: i32,
}

impl From<ColorDepthRecord> for ColorDepth {
    fn from(r: ColorDepthRecord) -> Self {
        Self {
            bits_per_pixel: r.bits_per_pixel,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::factory_color_depths)]
pub struct NewColorDepthRecord {
    pub factory_id: i32,
    pub bits_per_pixel: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::factory_browsers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BrowserRecord {
    pub id: i32,
    pub factory_id: i32,
    pub browser_group: String,
    pub version: String,
    pub major: i32,
    pub minor: i32,
    pub command: String,
    pub javascript: i32,
    pub java: i32,
    pub flash: i32,
    pub active: i32,
}

impl From<BrowserRecord> for Browser {
    fn from(r: BrowserRecord) -> Self {
        Self {
            id: r.id,
            browser_group: r.browser_group,
            version: r.version,
            major: r.major,
            minor: r.minor,
            command: r.command,
            javascript: r.javascript,
            java: r.java,
            flash: r.flash,
            active: r.active != 0,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::factory_browsers)]
pub struct NewBrowserRecord<'a> {
    pub factory_id: i32,
    pub browser_group: &'a str,
    pub version: &'a str,
    pub major: i32,
    pub minor: i32,
    pub command: &'a str,
    pub javascript: i32,
    pub java: i32,
    pub flash: i32,
    pub active: i32,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::request_groups)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RequestGroupRecord {
    pub id: i32,
    pub website: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bits_per_pixel: Option<i32>,
    pub javascript: Option<i32>,
    pub java: Option<i32>,
    pub flash: Option<i32>,
    pub submitted: String,
    pub expire: String,
}

impl From<RequestGroupRecord> for RequestGroup {
    fn from(r: RequestGroupRecord) -> Self {
        Self {
            id: r.id,
            website: r.website,
            width: r.width,
            height: r.height,
            bits_per_pixel: r.bits_per_pixel,
            javascript: r.javascript,
            java: r.java,
            flash: r.flash,
            submitted: parse_datetime(&r.submitted),
            expire: parse_datetime(&r.expire),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::request_groups)]
pub struct NewRequestGroupRecord<'a> {
    pub website: &'a str,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bits_per_pixel: Option<i32>,
    pub javascript: Option<i32>,
    pub java: Option<i32>,
    pub flash: Option<i32>,
    pub submitted: &'a str,
    pub expire: &'a str,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::requests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RequestRecord {
    pub id: i32,
    pub request_group_id: i32,
    pub platform: Option<String>,
    pub browser_group: String,
    pub major: Option<i32>,
    pub minor: Option<i32>,
    pub priority: i32,
    pub factory_id: Option<i32>,
    pub locked_at: Option<String>,
    pub fulfilled_at: Option<String>,
}

impl From<RequestRecord> for Request {
    fn from(r: RequestRecord) -> Self {
        // Holder and timestamp are written together; a half-set pair is no claim.
        let claim = match (r.factory_id, parse_datetime_opt(r.locked_at)) {
            (Some(factory_id), Some(locked_at)) => Some(Claim {
                factory_id,
                locked_at,
            }),
            _ => None,
        };
        Self {
            id: r.id,
            request_group_id: r.request_group_id,
            platform: r.platform,
            browser_group: r.browser_group,
            major: r.major,
            minor: r.minor,
            priority: r.priority,
            claim,
            fulfilled_at: parse_datetime_opt(r.fulfilled_at),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::requests)]
pub struct NewRequestRecord<'a> {
    pub request_group_id: i32,
    pub platform: Option<&'a str>,
    pub browser_group: &'a str,
    pub major: Option<i32>,
    pub minor: Option<i32>,
    pub priority: i32,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::domain_priorities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DomainPriorityRecord {
    pub id: i32,
    pub domain: String,
    pub priority: i32,
    pub expire: String,
}

impl From<DomainPriorityRecord> for DomainPriority {
    fn from(r: DomainPriorityRecord) -> Self {
        Self {
            id: r.id,
            domain: r.domain,
            priority: r.priority,
            expire: parse_datetime(&r.expire),
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::domain_priorities)]
pub struct NewDomainPriorityRecord<'a> {
    pub domain: &'a str,
    pub priority: i32,
    pub expire: &'a str,
}
