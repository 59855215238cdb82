use std::collections::HashSet;

use common_store::MovieSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatAction {
    Reserve,
    Release,
}

/// Flips the `reserved` flag of every chair in `chair_ids` and returns how many
/// chairs matched. Unknown ids are ignored and no availability check is made,
/// so reserving an already reserved chair succeeds.
pub fn apply(session: &mut MovieSession, chair_ids: &[String], action: SeatAction) -> usize {
    let wanted: HashSet<&str> = chair_ids.iter().map(String::as_str).collect();
    let reserved = action == SeatAction::Reserve;
    let mut matched = 0;
    for chair in session.chairs.iter_mut().filter(|c| wanted.contains(c.id.as_str())) {
        chair.reserved = reserved;
        matched += 1;
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_money::Money;
    use common_store::Chair;

    fn session() -> MovieSession {
        MovieSession {
            id: "M1".into(),
            title: "Arrival".into(),
            session: "20:00".into(),
            price: Money::from_cents(800),
            category: None,
            poster: None,
            language: None,
            chairs: vec![Chair::available("A1"), Chair::available("A2"), Chair { id: "A3".into(), reserved: true }],
        }
    }

    #[test]
    fn reserve_touches_only_requested_chairs() {
        let mut s = session();
        let n = apply(&mut s, &["A1".into(), "Z9".into()], SeatAction::Reserve);
        assert_eq!(n, 1);
        assert!(s.chair("A1").unwrap().reserved);
        assert!(!s.chair("A2").unwrap().reserved);
        assert!(s.chair("A3").unwrap().reserved);
    }

    #[test]
    fn release_frees_chairs() {
        let mut s = session();
        apply(&mut s, &["A3".into()], SeatAction::Release);
        assert!(s.chairs.iter().all(|c| !c.reserved));
    }

    #[test]
    fn reserving_a_taken_chair_is_not_rejected() {
        let mut s = session();
        assert_eq!(apply(&mut s, &["A3".into()], SeatAction::Reserve), 1);
        assert!(s.chair("A3").unwrap().reserved);
    }
}
