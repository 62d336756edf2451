use crate::config::ScoringWeights;
use crate::models::dispatch::ScoreBreakdown;
use crate::models::rescuer::VehicleType;
use crate::models::ticket::Ticket;
use crate::registry::rescuers::Candidate;

/// A candidate with its computed rank, ready for claim attempts in order.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub score: i64,
    pub breakdown: ScoreBreakdown,
}

pub fn compute_score(
    candidate: &Candidate,
    ticket: &Ticket,
    weights: &ScoringWeights,
) -> (i64, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        distance_score: distance_score(candidate.distance_km, weights),
        vehicle_score: vehicle_score(candidate.rescuer.vehicle, ticket.priority, weights),
        capacity_score: capacity_score(candidate.rescuer.capacity, weights),
        rating_score: candidate.rescuer.rating * weights.rating_multiplier,
        experience_score: (candidate.rescuer.completed_missions as f64).min(weights.experience_cap),
    };

    let total = breakdown.distance_score
        + breakdown.vehicle_score
        + breakdown.capacity_score
        + breakdown.rating_score
        + breakdown.experience_score;

    (total.round() as i64, breakdown)
}

/// Scores every candidate and orders them best first: score descending,
/// ties by distance ascending, then by id ascending.
pub fn rank_candidates(
    candidates: Vec<Candidate>,
    ticket: &Ticket,
    weights: &ScoringWeights,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let (score, breakdown) = compute_score(&candidate, ticket, weights);
            RankedCandidate {
                candidate,
                score,
                breakdown,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.candidate.distance_km.total_cmp(&b.candidate.distance_km))
            .then_with(|| a.candidate.rescuer.id.cmp(&b.candidate.rescuer.id))
    });

    ranked
}

fn distance_score(distance_km: f64, weights: &ScoringWeights) -> f64 {
    (weights.distance_base - distance_km * weights.distance_slope_per_km).max(0.0)
}

fn vehicle_score(vehicle: VehicleType, priority: u8, weights: &ScoringWeights) -> f64 {
    match vehicle {
        VehicleType::Cano if priority >= weights.priority_vehicle_min_priority => {
            weights.priority_cano_bonus
        }
        VehicleType::Cano => weights.cano_bonus,
        VehicleType::Boat => weights.boat_bonus,
        _ => 0.0,
    }
}

fn capacity_score(capacity: u32, weights: &ScoringWeights) -> f64 {
    (capacity as f64 * weights.capacity_points_per_seat).min(weights.capacity_cap)
}
