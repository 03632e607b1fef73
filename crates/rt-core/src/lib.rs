//! rusty-tickets/crates/rt-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Tickets.

pub mod defects;
pub mod error;
pub mod models;
pub mod normalize;
pub mod report;
pub mod rotation;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_ticket_wire_names() {
        let ticket: Ticket = serde_json::from_value(serde_json::json!({
            "number": "TCK-9",
            "abstract": "disk full",
            "lastmodifiedby": "bob",
            "parent": { "number": "P-1", "created": "2017-01-01 00:00:00" },
            "logs": [{ "date": "2017-01-01 10:00:00", "info": "hello" }]
        }))
        .unwrap();
        assert_eq!(ticket.abstract_text, "disk full");
        assert_eq!(ticket.last_modified_by, "bob");
        assert_eq!(ticket.parent.number, "P-1");
        assert_eq!(ticket.logs[0].info, "hello");
        assert!(ticket.iso_opened.is_none());
        assert!(ticket.is_active());

        let back = serde_json::to_value(&ticket).unwrap();
        assert_eq!(back["abstract"], "disk full");
        assert!(back.get("isocreted").is_none());
        assert!(back["parent"].get("isocreted").is_some());
    }

    #[test]
    fn test_user_current_is_tri_state() {
        let user: User = serde_json::from_value(serde_json::json!({ "id": "a", "engineer": true })).unwrap();
        assert_eq!(user.current, None);
        assert!(!user.is_current());
        assert!(serde_json::to_value(&user).unwrap().get("current").is_none());

        let user: User = serde_json::from_value(serde_json::json!({ "id": "a", "current": false })).unwrap();
        assert_eq!(user.current, Some(false));
    }

    #[test]
    fn test_closed_states_are_inactive() {
        for state in [STATE_CLOSED, STATE_CANCEL] {
            let ticket = Ticket { state: state.into(), ..Default::default() };
            assert!(!ticket.is_active());
        }
    }
}
