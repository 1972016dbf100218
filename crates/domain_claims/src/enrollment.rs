//! Patient insurance enrollment
//!
//! Links a patient to a plan with a membership number and coverage window.
//! A claim can only be raised against an enrollment that is active on the
//! date of attendance.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{EffectiveWindow, EnrollmentId, PatientId, PlanId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Expired,
    Suspended,
}

/// A patient's membership in an insurance plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInsurance {
    pub id: EnrollmentId,
    pub patient_id: PatientId,
    pub plan_id: PlanId,
    /// Card / membership number printed on the patient's insurance card
    pub membership_id: String,
    pub status: EnrollmentStatus,
    pub coverage_window: EffectiveWindow,
}

impl PatientInsurance {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.status == EnrollmentStatus::Active && self.coverage_window.contains(date)
    }
}

/// Picks the enrollment to bill against for a patient on a given date
///
/// When overlapping active enrollments exist, the one with the latest
/// coverage start wins.
pub fn active_enrollment<'a>(
    enrollments: &'a [PatientInsurance],
    patient_id: PatientId,
    date: NaiveDate,
) -> Option<&'a PatientInsurance> {
    enrollments
        .iter()
        .filter(|e| e.patient_id == patient_id && e.is_active_on(date))
        .max_by_key(|e| e.coverage_window.from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(
        patient_id: PatientId,
        status: EnrollmentStatus,
        from: NaiveDate,
    ) -> PatientInsurance {
        PatientInsurance {
            id: EnrollmentId::new(),
            patient_id,
            plan_id: PlanId::new(),
            membership_id: "NHIS-0001".into(),
            status,
            coverage_window: EffectiveWindow::starting(from),
        }
    }

    #[test]
    fn test_suspended_enrollment_never_active() {
        let patient = PatientId::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let pool = vec![enrollment(
            patient,
            EnrollmentStatus::Suspended,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )];
        assert!(active_enrollment(&pool, patient, date).is_none());
    }

    #[test]
    fn test_latest_start_wins_when_overlapping() {
        let patient = PatientId::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let older = enrollment(
            patient,
            EnrollmentStatus::Active,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        );
        let newer = enrollment(
            patient,
            EnrollmentStatus::Active,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        let pool = vec![older, newer.clone()];
        assert_eq!(active_enrollment(&pool, patient, date).unwrap().id, newer.id);
    }

    #[test]
    fn test_other_patients_are_ignored() {
        let patient = PatientId::new();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let pool = vec![enrollment(
            PatientId::new(),
            EnrollmentStatus::Active,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )];
        assert!(active_enrollment(&pool, patient, date).is_none());
    }
}
