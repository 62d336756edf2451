use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub ticket_queue_size: usize,
    pub event_buffer_size: usize,
    pub dispatch: DispatchConfig,
}

/// Matching and payout policy. Everything here is deployment data; the engine
/// never hardcodes these numbers.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Search radii tried in order; the first entry is the base radius.
    pub radius_ladder_km: Vec<f64>,
    pub scoring: ScoringWeights,
    pub min_verification_confidence: f64,
    pub reward: RewardPolicy,
}

#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub distance_base: f64,
    pub distance_slope_per_km: f64,
    pub priority_cano_bonus: f64,
    pub cano_bonus: f64,
    pub boat_bonus: f64,
    pub capacity_points_per_seat: f64,
    pub capacity_cap: f64,
    pub rating_multiplier: f64,
    pub experience_cap: f64,
    /// Tickets at or above this priority prefer the high-priority vehicle.
    pub priority_vehicle_min_priority: u8,
}

#[derive(Debug, Clone)]
pub struct RewardPolicy {
    pub base: u64,
    pub priority_bonus: u64,
    pub per_extra_person: u64,
    pub extra_person_threshold: u32,
}

impl RewardPolicy {
    pub fn amount_for(&self, priority: u8, people_count: u32) -> u64 {
        let mut amount = self.base;
        if priority == 5 {
            amount += self.priority_bonus;
        }
        let extra = people_count.saturating_sub(self.extra_person_threshold) as u64;
        amount + extra * self.per_extra_person
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            ticket_queue_size: 1024,
            event_buffer_size: 1024,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            radius_ladder_km: vec![5.0, 10.0, 15.0],
            scoring: ScoringWeights::default(),
            min_verification_confidence: 0.65,
            reward: RewardPolicy::default(),
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            distance_base: 40.0,
            distance_slope_per_km: 8.0,
            priority_cano_bonus: 30.0,
            cano_bonus: 20.0,
            boat_bonus: 15.0,
            capacity_points_per_seat: 2.0,
            capacity_cap: 15.0,
            rating_multiplier: 3.0,
            experience_cap: 10.0,
            priority_vehicle_min_priority: 4,
        }
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            base: 20,
            priority_bonus: 5,
            per_extra_person: 2,
            extra_person_threshold: 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Config::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            ticket_queue_size: parse_or_default("TICKET_QUEUE_SIZE", defaults.ticket_queue_size)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            dispatch: DispatchConfig::from_env(defaults.dispatch)?,
        })
    }
}

impl DispatchConfig {
    fn from_env(defaults: DispatchConfig) -> Result<Self, AppError> {
        Ok(Self {
            radius_ladder_km: parse_ladder("RADIUS_LADDER_KM", defaults.radius_ladder_km)?,
            scoring: ScoringWeights::from_env(defaults.scoring)?,
            min_verification_confidence: parse_or_default(
                "MIN_VERIFICATION_CONFIDENCE",
                defaults.min_verification_confidence,
            )?,
            reward: RewardPolicy::from_env(defaults.reward)?,
        })
    }
}

impl ScoringWeights {
    fn from_env(defaults: ScoringWeights) -> Result<Self, AppError> {
        Ok(Self {
            distance_base: parse_or_default("DISTANCE_BASE_SCORE", defaults.distance_base)?,
            distance_slope_per_km: parse_or_default(
                "DISTANCE_SLOPE_PER_KM",
                defaults.distance_slope_per_km,
            )?,
            priority_cano_bonus: parse_or_default(
                "VEHICLE_BONUS_PRIORITY_CANO",
                defaults.priority_cano_bonus,
            )?,
            cano_bonus: parse_or_default("VEHICLE_BONUS_CANO", defaults.cano_bonus)?,
            boat_bonus: parse_or_default("VEHICLE_BONUS_BOAT", defaults.boat_bonus)?,
            capacity_points_per_seat: parse_or_default(
                "CAPACITY_POINTS_PER_SEAT",
                defaults.capacity_points_per_seat,
            )?,
            capacity_cap: parse_or_default("CAPACITY_SCORE_CAP", defaults.capacity_cap)?,
            rating_multiplier: parse_or_default("RATING_MULTIPLIER", defaults.rating_multiplier)?,
            experience_cap: parse_or_default("EXPERIENCE_SCORE_CAP", defaults.experience_cap)?,
            priority_vehicle_min_priority: parse_or_default(
                "PRIORITY_VEHICLE_MIN_PRIORITY",
                defaults.priority_vehicle_min_priority,
            )?,
        })
    }
}

impl RewardPolicy {
    fn from_env(defaults: RewardPolicy) -> Result<Self, AppError> {
        Ok(Self {
            base: parse_or_default("REWARD_BASE", defaults.base)?,
            priority_bonus: parse_or_default("REWARD_PRIORITY_BONUS", defaults.priority_bonus)?,
            per_extra_person: parse_or_default(
                "REWARD_PER_EXTRA_PERSON",
                defaults.per_extra_person,
            )?,
            extra_person_threshold: parse_or_default(
                "REWARD_EXTRA_PERSON_THRESHOLD",
                defaults.extra_person_threshold,
            )?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_ladder(key: &str, default: Vec<f64>) -> Result<Vec<f64>, AppError> {
    match env::var(key) {
        Ok(raw) => build_ladder(&raw).map_err(|err| AppError::Internal(format!("{key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn build_ladder(raw: &str) -> Result<Vec<f64>, String> {
    let mut ladder = Vec::new();
    for part in raw.split(',') {
        let radius: f64 = part
            .trim()
            .parse()
            .map_err(|err| format!("invalid radius {part:?}: {err}"))?;
        ladder.push(radius);
    }

    if ladder.is_empty() || ladder.iter().any(|r| *r <= 0.0) {
        return Err("radius ladder must be a non-empty list of positive km values".to_string());
    }
    if ladder.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err("radius ladder must be strictly ascending".to_string());
    }

    Ok(ladder)
}
