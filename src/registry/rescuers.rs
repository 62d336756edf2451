use chrono::Utc;
use dashmap::DashMap;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::ids;
use crate::models::rescuer::{
    GeoPoint, RegistrationStatus, Rescuer, RescuerRegistration, RescuerStatus,
};

/// A rescuer within search range, paired with the straight-line distance to
/// the ticket location.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub rescuer: Rescuer,
    pub distance_km: f64,
}

/// Owns every rescuer record. Each mutation is a checked transition performed
/// while holding the per-entry write guard, so concurrent writers serialize
/// per rescuer and the loser of a race observes Conflict, never a torn state.
#[derive(Default)]
pub struct RescuerRegistry {
    inner: DashMap<String, Rescuer>,
}

impl RescuerRegistry {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn register(&self, registration: RescuerRegistration) -> Rescuer {
        let now = Utc::now();
        let rescuer = Rescuer {
            id: ids::new_id(ids::RESCUER_TAG),
            name: registration.name,
            phone: registration.phone,
            status: RescuerStatus::Online,
            location: registration.location,
            vehicle: registration.vehicle,
            capacity: registration.capacity,
            payout_address: registration.payout_address,
            rating: 5.0,
            completed_missions: 0,
            telegram_chat_id: registration.telegram_chat_id,
            registration: registration.registration,
            registered_at: now,
            updated_at: now,
        };

        self.inner.insert(rescuer.id.clone(), rescuer.clone());
        rescuer
    }

    /// Stores a fully built record, keeping whatever id and counters it
    /// carries.
    pub fn insert(&self, rescuer: Rescuer) {
        self.inner.insert(rescuer.id.clone(), rescuer);
    }

    pub fn get(&self, id: &str) -> Result<Rescuer, AppError> {
        self.inner
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("rescuer {id} not found")))
    }

    pub fn list(&self) -> Vec<Rescuer> {
        self.inner.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Dispatch-eligible rescuers within `radius_km` of `center` that can
    /// carry at least `min_capacity` people. Never fails; no match is an
    /// empty list. Ordered by distance ascending, ties by id ascending, so
    /// equal inputs always produce the same candidate order.
    pub fn find_candidates(
        &self,
        center: &GeoPoint,
        radius_km: f64,
        min_capacity: u32,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .inner
            .iter()
            .filter_map(|entry| {
                let rescuer = entry.value();
                if !rescuer.is_candidate() || rescuer.capacity < min_capacity {
                    return None;
                }

                let distance_km = haversine_km(&rescuer.location, center);
                if distance_km > radius_km {
                    return None;
                }

                Some(Candidate {
                    rescuer: rescuer.clone(),
                    distance_km,
                })
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.rescuer.id.cmp(&b.rescuer.id))
        });

        candidates
    }

    /// Claims the rescuer for a mission. Exactly one of any number of
    /// concurrent callers wins; the rest observe Conflict.
    pub fn transition_to_mission(&self, id: &str) -> Result<Rescuer, AppError> {
        let mut rescuer = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("rescuer {id} not found")))?;

        if !rescuer.status.is_dispatchable() {
            return Err(AppError::Conflict(format!(
                "rescuer {id} is {:?} and cannot take a mission",
                rescuer.status
            )));
        }

        rescuer.status = RescuerStatus::OnMission;
        rescuer.updated_at = Utc::now();
        Ok(rescuer.clone())
    }

    /// Returns the rescuer to the idle pool. The mission counter moves only
    /// on the OnMission -> Idle edge, so re-driving a release can never
    /// double-count; releasing an already idle rescuer is a no-op.
    pub fn release(&self, id: &str, completed: bool) -> Result<Rescuer, AppError> {
        let mut rescuer = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("rescuer {id} not found")))?;

        if rescuer.status == RescuerStatus::OnMission {
            rescuer.status = RescuerStatus::Idle;
            if completed {
                rescuer.completed_missions += 1;
            }
            rescuer.updated_at = Utc::now();
        }

        Ok(rescuer.clone())
    }

    /// Availability updates from the rescuer. Mission state is owned by the
    /// claim/release pair and cannot be entered or left here.
    pub fn set_status(&self, id: &str, status: RescuerStatus) -> Result<Rescuer, AppError> {
        let mut rescuer = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("rescuer {id} not found")))?;

        if rescuer.status == status {
            return Ok(rescuer.clone());
        }
        if rescuer.status == RescuerStatus::OnMission || status == RescuerStatus::OnMission {
            return Err(AppError::InvalidState(format!(
                "rescuer {id}: mission status is managed by dispatch"
            )));
        }

        rescuer.status = status;
        rescuer.updated_at = Utc::now();
        Ok(rescuer.clone())
    }

    pub fn update_location(&self, id: &str, location: GeoPoint) -> Result<Rescuer, AppError> {
        let mut rescuer = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("rescuer {id} not found")))?;

        rescuer.location = location;
        rescuer.updated_at = Utc::now();
        Ok(rescuer.clone())
    }

    pub fn set_registration(
        &self,
        id: &str,
        registration: RegistrationStatus,
    ) -> Result<Rescuer, AppError> {
        let mut rescuer = self
            .inner
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("rescuer {id} not found")))?;

        rescuer.registration = registration;
        rescuer.updated_at = Utc::now();
        Ok(rescuer.clone())
    }
}
