use chrono::{DateTime, Utc};
use evdisc_core::{Event, EventFormat, PublishState};

pub(crate) fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

pub(crate) fn event(id: &str, starts_at: &str) -> Event {
    Event {
        id: id.to_string(),
        title: format!("Event {id}"),
        starts_at: at(starts_at),
        ends_at: None,
        location: "Somewhere".to_string(),
        time: "18:00".to_string(),
        format: EventFormat::InPerson,
        categories: vec!["music".to_string()],
        price: "Free".to_string(),
        description: String::new(),
        publish_state: PublishState::Published,
        city: None,
        country: None,
        latitude: None,
        longitude: None,
    }
}

pub(crate) fn ids(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.id.as_str()).collect()
}
