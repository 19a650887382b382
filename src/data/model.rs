use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use crate::ai::advisor::Category;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Changes to a stored user once the new password has been hashed.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
}

impl User {
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(hashed_password) = changes.hashed_password {
            self.hashed_password = hashed_password;
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// `Some(None)` is an explicit null; a missing key stays `None`.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Profile payload for both create and update.
///
/// Absent fields are left alone; a field sent as `null` is cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileFields {
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub state: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub country: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub postal_code: Option<Option<String>>,
}

impl Profile {
    pub fn apply(&mut self, fields: ProfileFields) {
        fn patch(slot: &mut Option<String>, value: Option<Option<String>>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        patch(&mut self.full_name, fields.full_name);
        patch(&mut self.bio, fields.bio);
        patch(&mut self.avatar, fields.avatar);
        patch(&mut self.phone, fields.phone);
        patch(&mut self.address, fields.address);
        patch(&mut self.city, fields.city);
        patch(&mut self.state, fields.state);
        patch(&mut self.country, fields.country);
        patch(&mut self.postal_code, fields.postal_code);
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LegalQuery {
    pub id: i64,
    pub user_id: i64,
    pub query: String,
    pub response: Option<String>,
    pub category: Category,
    pub is_saved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LegalQueryCreate {
    pub query: String,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LegalQueryUpdate {
    pub query: Option<String>,
    pub category: Option<String>,
    pub is_saved: Option<bool>,
}

/// Resolved changes to a legal query, with any regenerated answer filled in.
#[derive(Debug, Default, PartialEq)]
pub struct LegalQueryChanges {
    pub query: Option<String>,
    pub response: Option<String>,
    pub category: Option<Category>,
    pub is_saved: Option<bool>,
}

impl LegalQuery {
    pub fn apply(&mut self, changes: LegalQueryChanges) {
        if let Some(query) = changes.query {
            self.query = query;
        }
        if let Some(response) = changes.response {
            self.response = Some(response);
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(is_saved) = changes.is_saved {
            self.is_saved = is_saved;
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    pub limit: Option<u32>,
}

impl Pagination {
    pub fn limit_or(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            id: 1,
            user_id: 1,
            full_name: Some("Alice Doe".into()),
            bio: Some("tenant".into()),
            avatar: None,
            phone: None,
            address: None,
            city: Some("Pune".into()),
            state: None,
            country: None,
            postal_code: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn profile_patch_keeps_absent_fields() {
        let mut p = profile();
        p.apply(ProfileFields {
            bio: Some(Some("landlord".into())),
            phone: Some(Some("555-0100".into())),
            ..Default::default()
        });
        assert_eq!(p.full_name.as_deref(), Some("Alice Doe"));
        assert_eq!(p.bio.as_deref(), Some("landlord"));
        assert_eq!(p.phone.as_deref(), Some("555-0100"));
        assert_eq!(p.city.as_deref(), Some("Pune"));
    }

    #[test]
    fn profile_null_clears_and_missing_key_keeps() {
        let fields: ProfileFields =
            serde_json::from_value(serde_json::json!({ "bio": null, "phone": "555-0100" }))
                .unwrap();
        assert_eq!(fields.bio, Some(None));
        assert_eq!(fields.city, None);

        let mut p = profile();
        p.apply(fields);
        assert_eq!(p.bio, None);
        assert_eq!(p.phone.as_deref(), Some("555-0100"));
        assert_eq!(p.city.as_deref(), Some("Pune"));
        assert_eq!(p.full_name.as_deref(), Some("Alice Doe"));
    }

    #[test]
    fn legal_query_patch_only_touches_supplied_fields() {
        let mut q = LegalQuery {
            id: 1,
            user_id: 1,
            query: "visa question".into(),
            response: Some("old".into()),
            category: Category::Immigration,
            is_saved: false,
            created_at: Utc::now(),
            updated_at: None,
        };
        q.apply(LegalQueryChanges {
            is_saved: Some(true),
            ..Default::default()
        });
        assert!(q.is_saved);
        assert_eq!(q.query, "visa question");
        assert_eq!(q.response.as_deref(), Some("old"));
        assert_eq!(q.category, Category::Immigration);
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            id: 3,
            username: "alice".into(),
            email: "alice@x.com".into(),
            hashed_password: "$2b$04$secret".into(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["username"], "alice");
    }
}
