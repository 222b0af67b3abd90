use crate::db::{paths, RemoteStore, StoreError};
use crate::models::alert::{AlertRecord, AlertStatus, Location, ALERT_DETAILS, DEVICE_TYPE};
use crate::models::user::{SimulatedUser, SIMULATED_USERS};
use rand::Rng;
use tracing::info;

/// Bangalore city centre.
pub const CENTER: Location = Location {
    lat: 12.9716,
    lng: 77.5946,
};

pub const JITTER_DEGREES: f64 = 0.025;

pub fn pick_user<R: Rng + ?Sized>(rng: &mut R) -> &'static SimulatedUser {
    &SIMULATED_USERS[rng.gen_range(0..SIMULATED_USERS.len())]
}

pub fn jittered_location<R: Rng + ?Sized>(rng: &mut R) -> Location {
    Location {
        lat: CENTER.lat + rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES),
        lng: CENTER.lng + rng.gen_range(-JITTER_DEGREES..=JITTER_DEGREES),
    }
}

pub fn build_record<R: Rng + ?Sized>(rng: &mut R, now_ms: i64) -> AlertRecord {
    let user = pick_user(rng);
    AlertRecord {
        user_id: user.id.to_string(),
        user_name: user.name.to_string(),
        user_email: user.email.to_string(),
        status: AlertStatus::Active,
        timestamp: now_ms,
        location: jittered_location(rng),
        device_type: DEVICE_TYPE.to_string(),
        details: ALERT_DETAILS.to_string(),
    }
}

/// Appends the record, then bumps the active and total counters.
///
/// Each write starts only after the previous one returned; a failed append
/// skips the counters. Nothing is retried and the three writes are not
/// transactional.
pub async fn emit(store: &dyn RemoteStore, record: &AlertRecord) -> Result<String, StoreError> {
    let value = serde_json::to_value(record)
        .map_err(|e| StoreError::Decode(format!("alert record: {}", e)))?;

    let key = store.push(paths::EMERGENCIES, &value).await?;
    let active = store.increment(paths::ACTIVE_EMERGENCIES).await?;
    let total = store.increment(paths::TOTAL_EMERGENCIES).await?;

    info!(
        key = %key,
        user_id = %record.user_id,
        active,
        total,
        "Alert sent to {} store and stats updated",
        store.backend()
    );
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryStore, StoreOp};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_location_stays_within_jitter() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let location = jittered_location(&mut rng);
            assert!(location.lat >= 12.9716 - 0.025 && location.lat <= 12.9716 + 0.025);
            assert!(location.lng >= 77.5946 - 0.025 && location.lng <= 77.5946 + 0.025);
        }
    }

    #[test]
    fn test_users_are_sampled_uniformly() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for _ in 0..3000 {
            let user = pick_user(&mut rng);
            assert!(SIMULATED_USERS.contains(user));
            *counts.entry(user.id).or_default() += 1;
        }

        assert_eq!(counts.len(), SIMULATED_USERS.len());
        for (id, count) in counts {
            assert!((850..=1150).contains(&count), "{} picked {} times", id, count);
        }
    }

    #[test]
    fn test_build_record_fields() {
        let mut rng = StdRng::seed_from_u64(1);
        let record = build_record(&mut rng, 1_764_398_681_921);

        let user = SIMULATED_USERS
            .iter()
            .find(|u| u.id == record.user_id)
            .unwrap();
        assert_eq!(record.user_name, user.name);
        assert_eq!(record.user_email, user.email);
        assert_eq!(record.status, AlertStatus::Active);
        assert_eq!(record.timestamp, 1_764_398_681_921);
        assert_eq!(record.device_type, "LoRa Keychain (Simulated)");
        assert_eq!(record.details, "Panic Button Pressed (Long Range)");
    }

    #[test]
    fn test_same_seed_same_record() {
        let a = build_record(&mut StdRng::seed_from_u64(9), 0);
        let b = build_record(&mut StdRng::seed_from_u64(9), 0);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_emit_pushes_then_increments() {
        let store = MemoryStore::new();
        let record = build_record(&mut StdRng::seed_from_u64(3), 1000);

        let key = emit(&store, &record).await.unwrap();

        assert!(!key.is_empty());
        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Push("emergencies".to_string()),
                StoreOp::Increment("stats/activeEmergencies".to_string()),
                StoreOp::Increment("stats/totalEmergencies".to_string()),
            ]
        );
        let stored = store.records("emergencies");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["userId"], record.user_id.as_str());
        assert_eq!(store.counter("stats/activeEmergencies"), 1);
        assert_eq!(store.counter("stats/totalEmergencies"), 1);
    }

    #[tokio::test]
    async fn test_failed_push_skips_counters() {
        let store = MemoryStore::new();
        store.set_failing(true);
        let record = build_record(&mut StdRng::seed_from_u64(3), 1000);

        assert!(emit(&store, &record).await.is_err());
        assert_eq!(store.ops(), vec![StoreOp::Push("emergencies".to_string())]);
    }
}
