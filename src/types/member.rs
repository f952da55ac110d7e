use serde::{Deserialize, Serialize};

/// Member preferences as stored in the `preferences` JSON column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub music: Vec<String>,
    pub sports: Vec<String>,
    pub interests: Vec<String>,
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self.music.is_empty() && self.sports.is_empty() && self.interests.is_empty()
    }

    /// Human-readable summary fed to the notification model.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.music.is_empty() {
            parts.push(format!("Gêneros musicais: {}", self.music.join(", ")));
        }
        if !self.sports.is_empty() {
            parts.push(format!("Times/esportes: {}", self.sports.join(", ")));
        }
        if !self.interests.is_empty() {
            parts.push(format!("Interesses: {}", self.interests.join(", ")));
        }
        parts.join(". ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_skips_empty_sections() {
        let prefs = Preferences {
            music: vec!["Rock".into(), "MPB".into()],
            sports: vec![],
            interests: vec!["Games".into()],
        };
        assert_eq!(prefs.describe(), "Gêneros musicais: Rock, MPB. Interesses: Games");
    }

    #[test]
    fn missing_keys_deserialize_as_empty() {
        let prefs: Preferences = serde_json::from_str(r#"{"sports":["Flamengo"]}"#).unwrap();
        assert_eq!(prefs.sports, vec!["Flamengo"]);
        assert!(prefs.music.is_empty());
        assert!(!prefs.is_empty());
    }
}
