//! Score allocation
//!
//! Distributes a fixed exam total across cases (one per slide) so that the
//! advertised per-case scores add up to exactly the total.

pub mod exam;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::annotation::RegionSet;
use crate::error::ScoringError;

pub use exam::{ExamPlan, ExamSlide, ExamStatus};

/// Scoring view of one image's region set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    /// Number of regions
    pub point_count: u32,
    /// Sum of region score weights
    pub weight: u32,
}

impl Case {
    pub fn new(point_count: u32, weight: u32) -> Self {
        Self { point_count, weight }
    }

    pub fn from_regions(regions: &RegionSet) -> Self {
        Self {
            point_count: regions.len() as u32,
            weight: regions.total_weight(),
        }
    }
}

/// How the total is split between cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationPolicy {
    /// Proportional to case weight; the last case absorbs rounding slack
    #[default]
    Weighted,
    /// Equal share per point; the earliest points absorb the remainder
    Average,
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationPolicy::Weighted => write!(f, "weighted"),
            AllocationPolicy::Average => write!(f, "average"),
        }
    }
}

impl FromStr for AllocationPolicy {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" => Ok(AllocationPolicy::Weighted),
            "average" => Ok(AllocationPolicy::Average),
            other => Err(ScoringError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Report inputs the policy cannot distribute over.
///
/// `allocate` still returns an all-zero vector for these; this lets an
/// assembly screen warn before publishing.
pub fn check_allocation(cases: &[Case], policy: AllocationPolicy) -> Result<(), ScoringError> {
    match policy {
        AllocationPolicy::Weighted if total_weight(cases) == 0 => {
            Err(ScoringError::DegenerateInput("total case weight is zero"))
        }
        AllocationPolicy::Average if total_points(cases) == 0 => {
            Err(ScoringError::DegenerateInput("total point count is zero"))
        }
        _ => Ok(()),
    }
}

/// Split `total` across `cases` under `policy`.
///
/// The result has one entry per case, in order, and sums to `total` unless
/// the input is degenerate (no weight or no points), in which case every
/// case scores zero.
pub fn allocate(cases: &[Case], total: u32, policy: AllocationPolicy) -> Vec<u32> {
    if cases.is_empty() {
        return Vec::new();
    }
    if let Err(e) = check_allocation(cases, policy) {
        warn!("Allocating {} over {} cases: {}", total, cases.len(), e);
        return vec![0; cases.len()];
    }

    match policy {
        AllocationPolicy::Weighted => allocate_weighted(cases, total),
        AllocationPolicy::Average => allocate_average(cases, total),
    }
}

fn total_weight(cases: &[Case]) -> u64 {
    cases.iter().map(|c| u64::from(c.weight)).sum()
}

fn total_points(cases: &[Case]) -> u64 {
    cases.iter().map(|c| u64::from(c.point_count)).sum()
}

fn allocate_weighted(cases: &[Case], total: u32) -> Vec<u32> {
    let weight_sum = total_weight(cases);
    let total = u64::from(total);
    let Some((_, head)) = cases.split_last() else {
        return Vec::new();
    };

    let mut scores = Vec::with_capacity(cases.len());
    let mut assigned = 0u64;
    for case in head {
        let share = total * u64::from(case.weight) / weight_sum;
        assigned += share;
        scores.push(share as u32);
    }
    // last case takes whatever floor division left over
    scores.push((total - assigned) as u32);
    scores
}

fn allocate_average(cases: &[Case], total: u32) -> Vec<u32> {
    let points = total_points(cases);
    let total = u64::from(total);
    let base = total / points;
    let mut remainder = total % points;

    // Same as walking every point in exam order and handing out base + 1
    // while the remainder lasts: a case takes as many bonus units as it has
    // points, until the remainder runs out.
    cases
        .iter()
        .map(|case| {
            let count = u64::from(case.point_count);
            let bonus = remainder.min(count);
            remainder -= bonus;
            (base * count + bonus) as u32
        })
        .collect()
}
