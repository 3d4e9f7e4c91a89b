use shared::domain::Role;

use crate::status::Phase;

// Rows follow `Phase::index`, columns follow `Role::index` (admin, instructor, student).
const LABELS: [[&str; 3]; 7] = [
    ["Scheduled", "Scheduled", "Upcoming"],
    ["Starting soon", "Starting soon, open the room", "Starting soon, join now"],
    ["Live", "Live, you are teaching", "Live now"],
    ["Completed (attended)", "Completed", "Attended"],
    ["Completed (absent)", "Completed", "Missed"],
    ["Ended", "Ended", "Ended"],
    ["Cancelled", "Cancelled", "Cancelled"],
];

pub fn label(phase: Phase, role: Role) -> &'static str {
    LABELS[phase.index()][role.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phase_and_role_has_a_label() {
        for phase in Phase::ALL {
            for role in Role::ALL {
                assert!(
                    !label(phase, role).trim().is_empty(),
                    "missing label for {phase:?} as {role:?}"
                );
            }
        }
    }

    #[test]
    fn table_shape_matches_enums() {
        assert_eq!(LABELS.len(), Phase::ALL.len());
        assert!(LABELS.iter().all(|row| row.len() == Role::ALL.len()));
    }

    #[test]
    fn student_sees_missed_for_absent() {
        assert_eq!(label(Phase::EndedAbsent, Role::Student), "Missed");
        assert_eq!(label(Phase::EndedAbsent, Role::Admin), "Completed (absent)");
    }
}
