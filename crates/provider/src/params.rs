//! Typed view over the decoded parameters of a launch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// LTI launch fields. Consumers send a loose, mostly optional set of keys,
/// so every field is optional and anything unrecognised lands in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParameters {
    pub user_id: Option<String>,
    pub lis_person_name_full: Option<String>,
    pub lis_person_contact_email_primary: Option<String>,
    /// Comma separated role list, e.g. `Instructor,Staff`.
    pub roles: Option<String>,
    pub oauth_consumer_key: Option<String>,
    pub custom_course_context: Option<String>,
    pub context_id: Option<String>,
    pub context_title: Option<String>,
    pub lti_message_type: Option<String>,
    pub lti_version: Option<String>,
    pub resource_link_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl LaunchParameters {
    /// Builds the record from decoded `key=value` pairs. The last value wins
    /// when a key repeats.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = LaunchParameters::default();
        for (key, value) in pairs {
            params.set(key.into(), value.into());
        }
        params
    }

    pub fn set(&mut self, key: String, value: String) {
        let slot = match key.as_str() {
            "user_id" => &mut self.user_id,
            "lis_person_name_full" => &mut self.lis_person_name_full,
            "lis_person_contact_email_primary" => &mut self.lis_person_contact_email_primary,
            "roles" => &mut self.roles,
            "oauth_consumer_key" => &mut self.oauth_consumer_key,
            "custom_course_context" => &mut self.custom_course_context,
            "context_id" => &mut self.context_id,
            "context_title" => &mut self.context_title,
            "lti_message_type" => &mut self.lti_message_type,
            "lti_version" => &mut self.lti_version,
            "resource_link_id" => &mut self.resource_link_id,
            _ => {
                self.extra.insert(key, value);
                return;
            }
        };
        *slot = Some(value);
    }

    /// Looks up any field by its wire name.
    pub fn get(&self, key: &str) -> Option<&str> {
        let field = match key {
            "user_id" => &self.user_id,
            "lis_person_name_full" => &self.lis_person_name_full,
            "lis_person_contact_email_primary" => &self.lis_person_contact_email_primary,
            "roles" => &self.roles,
            "oauth_consumer_key" => &self.oauth_consumer_key,
            "custom_course_context" => &self.custom_course_context,
            "context_id" => &self.context_id,
            "context_title" => &self.context_title,
            "lti_message_type" => &self.lti_message_type,
            "lti_version" => &self.lti_version,
            "resource_link_id" => &self.resource_link_id,
            _ => return self.extra.get(key).map(String::as_str),
        };
        field.as_deref()
    }

    /// Role list split on commas, order preserved, blanks dropped.
    pub fn role_list(&self) -> Vec<String> {
        self.roles
            .as_deref()
            .map(|roles| {
                roles
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_extra_keys() {
        let params = LaunchParameters::from_pairs([
            ("user_id", "student_one"),
            ("roles", "Instructor,Staff"),
            ("custom_theme", "dark"),
        ]);
        assert_eq!(params.user_id.as_deref(), Some("student_one"));
        assert_eq!(params.get("roles"), Some("Instructor,Staff"));
        assert_eq!(params.get("custom_theme"), Some("dark"));
        assert_eq!(params.get("lis_person_name_full"), None);
    }

    #[test]
    fn role_list_preserves_order() {
        let params = LaunchParameters::from_pairs([("roles", "Learner, Instructor,,Staff")]);
        assert_eq!(params.role_list(), vec!["Learner", "Instructor", "Staff"]);
        assert!(LaunchParameters::default().role_list().is_empty());
    }
}
