//! Patient profile row and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoError, FieldCodec};

/// Columns selected for a profile, in table order
pub const PROFILE_COLUMNS: &str =
    "user_id, age, gender, medical_history, contact_number, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

/// Profile as stored: sensitive columns hold tokens or legacy plaintext
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub user_id: i64,
    pub age: i32,
    pub gender: Option<String>,
    pub medical_history: Option<String>,
    pub contact_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Decrypted patient profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub user_id: i64,
    pub age: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// Decrypt sensitive columns
    pub fn decode(self, codec: &FieldCodec) -> Result<PatientProfile, CryptoError> {
        let gender = self.gender.as_deref().and_then(|g| {
            g.parse::<Gender>()
                .map_err(|e| tracing::warn!(user_id = self.user_id, error = %e, "Ignoring stored gender"))
                .ok()
        });

        Ok(PatientProfile {
            user_id: self.user_id,
            age: self.age,
            gender,
            medical_history: codec.decode(self.medical_history.as_deref())?,
            contact_number: codec.decode(self.contact_number.as_deref())?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_codec;

    fn row(medical_history: Option<String>, contact_number: Option<String>) -> ProfileRow {
        ProfileRow {
            user_id: 1,
            age: 40,
            gender: Some("female".to_string()),
            medical_history,
            contact_number,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_decode_encrypted_row() {
        let codec = test_codec();
        let stored = codec.encode(Some("Asthma since 2010")).unwrap();

        let profile = row(stored, None).decode(&codec).unwrap();
        assert_eq!(profile.medical_history.as_deref(), Some("Asthma since 2010"));
        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(profile.contact_number, None);
    }

    #[test]
    fn test_decode_legacy_row() {
        let codec = test_codec();
        let profile = row(Some("No known allergies".into()), Some("555-1234".into()))
            .decode(&codec)
            .unwrap();

        assert_eq!(profile.medical_history.as_deref(), Some("No known allergies"));
        assert_eq!(profile.contact_number.as_deref(), Some("555-1234"));
    }

    #[test]
    fn test_gender_parsing() {
        assert_eq!("other".parse::<Gender>(), Ok(Gender::Other));
        assert!("unknown".parse::<Gender>().is_err());
        assert_eq!(serde_json::to_string(&Gender::Male).unwrap(), r#""male""#);
    }
}
