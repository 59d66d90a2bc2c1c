//! Patient profile collaborator
//!
//! A read/write data source the coordinator mutates only through
//! `log_activity` and `record_outcome`. The profile is constructed once and
//! injected (`SharedProfile`) — never a module-level singleton. Replacing a
//! profile mid-session means reconstructing the coordinator, which is the
//! surrounding application's concern.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::Tier;

/// Shared handle to the patient profile. Lock scopes stay short and never
/// cross an await point.
pub type SharedProfile = Arc<Mutex<PatientProfile>>;

/// One entry in today's activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub tier: Option<Tier>,
    pub scenarios: Vec<String>,
    pub success: bool,
}

/// Record of an intervention technique that worked, fed back into the
/// long-term pattern memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub timestamp: DateTime<Utc>,
    pub situation: String,
    pub technique: String,
    pub effectiveness: f64,
    pub learning_note: String,
}

/// Emergency contact passed along with critical notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
    pub priority: u8,
}

/// A photo set keyed by the scenario it is most effective for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSet {
    pub scenario: String,
    pub photos: Vec<String>,
}

/// Mutable per-day state mirrored from the care environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CurrentState {
    pub last_meal_time: Option<DateTime<Utc>>,
    pub last_meal_type: Option<String>,
    pub todays_activities: Vec<ActivityEntry>,
}

/// The patient profile record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub preferred_name: String,
    pub calming_songs: Vec<String>,
    pub default_photos: Vec<String>,
    pub photo_sets: Vec<PhotoSet>,
    pub emergency_contacts: Vec<EmergencyContact>,
    pub current_state: CurrentState,
    pub outcomes: Vec<OutcomeEntry>,
}

impl PatientProfile {
    /// A minimal profile for tests and the demo binary.
    pub fn demo_default() -> Self {
        Self {
            preferred_name: "Margaret".to_string(),
            calming_songs: vec![
                "Fly Me to the Moon".to_string(),
                "The Way You Look Tonight".to_string(),
            ],
            default_photos: vec!["emma-soccer.jpg".to_string(), "lucas-playing.jpg".to_string()],
            photo_sets: vec![PhotoSet {
                scenario: "agitation".to_string(),
                photos: vec!["hawaii-1.jpg".to_string(), "hawaii-2.jpg".to_string()],
            }],
            emergency_contacts: vec![EmergencyContact {
                name: "Sarah Johnson".to_string(),
                relationship: "daughter".to_string(),
                phone: "555-0123".to_string(),
                priority: 1,
            }],
            current_state: CurrentState::default(),
            outcomes: Vec::new(),
        }
    }

    /// Wrap in the shared handle the coordinator expects.
    pub fn shared(self) -> SharedProfile {
        Arc::new(Mutex::new(self))
    }

    /// Append to today's activity log.
    pub fn log_activity(&mut self, entry: ActivityEntry) {
        self.current_state.todays_activities.push(entry);
    }

    /// Record a successful intervention outcome.
    pub fn record_outcome(&mut self, entry: OutcomeEntry) {
        self.outcomes.push(entry);
    }

    /// Photos most relevant for the given scenario tags; falls back to the
    /// default set. First matching set wins — deterministic on purpose.
    pub fn photos_for(&self, scenario_kinds: &[String]) -> Vec<String> {
        for set in &self.photo_sets {
            if scenario_kinds.iter().any(|k| k == &set.scenario) {
                return set.photos.clone();
            }
        }
        self.default_photos.clone()
    }

    /// Calming song selected by rotation index (no RNG — reproducible runs).
    pub fn calming_song(&self, rotation: usize) -> Option<&str> {
        if self.calming_songs.is_empty() {
            return None;
        }
        Some(self.calming_songs[rotation % self.calming_songs.len()].as_str())
    }

    /// Contact block attached to emergency notices.
    pub fn emergency_info(&self) -> serde_json::Value {
        serde_json::json!({
            "patient": self.preferred_name,
            "contacts": self.emergency_contacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photos_for_scenario_match() {
        let profile = PatientProfile::demo_default();
        let photos = profile.photos_for(&["agitation".to_string()]);
        assert_eq!(photos, vec!["hawaii-1.jpg", "hawaii-2.jpg"]);
    }

    #[test]
    fn test_photos_fall_back_to_default() {
        let profile = PatientProfile::demo_default();
        let photos = profile.photos_for(&["wandering".to_string()]);
        assert_eq!(photos, profile.default_photos);
    }

    #[test]
    fn test_calming_song_rotation() {
        let profile = PatientProfile::demo_default();
        assert_eq!(profile.calming_song(0), Some("Fly Me to the Moon"));
        assert_eq!(profile.calming_song(1), Some("The Way You Look Tonight"));
        assert_eq!(profile.calming_song(2), Some("Fly Me to the Moon"));
    }

    #[test]
    fn test_log_activity_appends() {
        let mut profile = PatientProfile::demo_default();
        profile.log_activity(ActivityEntry {
            timestamp: Utc::now(),
            kind: "intervention".to_string(),
            tier: Some(Tier::AiOnly),
            scenarios: vec!["meal_confusion".to_string()],
            success: true,
        });
        assert_eq!(profile.current_state.todays_activities.len(), 1);
    }
}
