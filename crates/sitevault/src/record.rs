//! Wire shapes for the configuration collections.
//!
//! Each struct here is the portable serialization of one record in an
//! in-scope collection. These shapes are what lands in an archive's
//! manifest, so they use stable `camelCase` field names and carry the
//! natural keys that cross-collection references depend on: a page body
//! names its owning navigation entry, a catalog item names its categories.
//! Ids are opaque strings assigned by the backing document store and are
//! preserved across export/import so references never have to be re-linked.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the site navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    /// Natural key, referenced by [`PageBody::navigation_id`].
    pub id: String,
    /// Display text.
    pub text: String,
    /// Link target; `None` for entries that only own a page body.
    #[serde(default)]
    pub url: Option<String>,
    /// Ordering within the menu, ascending.
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The rich-text body of a site page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBody {
    pub id: String,
    /// Id of the owning [`NavigationEntry`].
    pub navigation_id: String,
    /// Serialized page content (HTML or editor JSON, opaque here).
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single key/value site setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub key: String,
    pub value: SettingValue,
}

/// A setting value: plain text, or a media reference for settings backed
/// by an uploaded file (logo, hero image, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Plain string value.
    Text(String),
    /// Media-backed value pointing at an uploaded asset.
    Media {
        /// Public URL of the stored asset (e.g. `/uploads/logo.png`).
        url: String,
        /// Free-form metadata recorded at upload time.
        #[serde(default)]
        metadata: serde_json::Value,
    },
}

/// A social-network link shown in the site footer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Network identifier (`facebook`, `instagram`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub label: String,
    pub enabled: bool,
}

/// An item in the product catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    /// Public URL of the item image; may point at a stored asset.
    #[serde(default)]
    pub image_url: Option<String>,
    pub display_order: i32,
    /// Ids of the [`CatalogCategory`] records this item belongs to.
    #[serde(default)]
    pub category_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category grouping catalog items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bookable appointment activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_minutes: u32,
    /// Calendar display color (`#rrggbb`).
    pub color: String,
    pub price: f64,
    pub required_fields: RequiredFields,
    pub reminder_settings: ReminderSettings,
    /// Minimum lead time a customer must give when booking.
    pub minimum_booking_notice_hours: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which booking-form fields an activity requires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredFields {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_label: Option<String>,
}

/// Reminder-email settings for an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_before: Option<u32>,
}

/// Weekly appointment availability plus dated exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentAvailability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub weekly_slots: Vec<WeeklySlot>,
    #[serde(default)]
    pub exceptions: Vec<AvailabilityException>,
    pub updated_at: DateTime<Utc>,
}

/// A recurring weekly opening window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySlot {
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    /// Opening time, `HH:MM`.
    pub start_time: String,
    /// Closing time, `HH:MM`.
    pub end_time: String,
}

/// A dated closure or override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityException {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
